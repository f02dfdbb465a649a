use rand::RngCore;

/// A `multipart/form-data` body holding a single file field.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn single_file(field: &str, data: &[u8]) -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::with_boundary(format!("ainvr-{}", hex::encode(bytes)), field, data)
    }

    fn with_boundary(boundary: String, field: &str, data: &[u8]) -> Self {
        let (filename, mime) = sniff_image(data);
        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Self { boundary, body }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn sniff_image(data: &[u8]) -> (&'static str, &'static str) {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ("image.jpg", "image/jpeg")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        ("image.png", "image/png")
    } else {
        ("image.bin", "application/octet-stream")
    }
}
