//! AINVR REST API client.
//!
//! All authorized calls go through one request helper, which
//! attaches the session token, applies the configured [`RetryPolicy`] and
//! turns HTTP failures into errors carrying the server's reply.

mod multipart;
mod retry;
mod types;

use anyhow::{anyhow, Context, Result};
use std::io::Read;

use crate::config::AinvrConfig;
use crate::detect::{filter_by_type, parse_detected_objects, parse_target_objects, DetectedObject};

pub use multipart::MultipartForm;
pub use retry::RetryPolicy;
pub use types::{
    parse_snapshot_reply, CameraInfo, FaceDetection, FaceKeyMatch, FaceTarget, RegionField,
    RoiInfo, RoiRegion,
};

pub const AUTH_HEADER: &str = "X-Auth-Token";
pub const MAX_SNAPSHOT_BYTES: u64 = 10 * 1024 * 1024;

const AUTH_PATH: &str = "/ainvr/api/auth";
const CREATE_SNAPSHOT_PATH: &str = "/ainvr/api/cameras/snapshot";
const DETECT_OBJECTS_PATH: &str = "/ainvr/api/detection/objects";
const DETECT_PLATES_PATH: &str = "/ainvr/api/detection/plates";
const DETECT_FACES_PATH: &str = "/ainvr/api/face";
const FACE_KEYS_PATH: &str = "/ainvr/api/face/keys";

fn camera_detail_path(camera_id: u64) -> String {
    format!("/ainvr/api/cameras/{}", camera_id)
}

fn roi_detail_path(roi_id: u64) -> String {
    format!("/ainvr/api/rois/{}", roi_id)
}

/// Operations the ROI check needs from the video-management system.
pub trait VmsApi {
    fn camera(&mut self, camera_id: u64) -> Result<CameraInfo>;

    /// Asks the server to grab a frame from `stream_url`; returns the URL of
    /// the stored snapshot.
    fn create_snapshot(&mut self, stream_url: &str) -> Result<String>;

    /// Downloads snapshot image bytes.
    fn fetch_snapshot(&mut self, snapshot_url: &str) -> Result<Vec<u8>>;

    fn detect_objects(&mut self, image: &[u8]) -> Result<Vec<DetectedObject>>;

    /// Detection restricted to `targets`. Entries of other types are dropped
    /// before their geometry is validated.
    fn detect_objects_of_type(
        &mut self,
        image: &[u8],
        targets: &[String],
    ) -> Result<Vec<DetectedObject>> {
        let objects = self.detect_objects(image)?;
        Ok(filter_by_type(&objects, targets))
    }

    fn roi(&mut self, roi_id: u64) -> Result<RoiInfo>;
}

/// Face and licence plate endpoints.
pub trait RecognitionApi {
    fn detect_faces(&mut self, image: &[u8]) -> Result<Vec<FaceDetection>>;

    fn find_face_targets(&mut self, descriptor: &str, limit: u32) -> Result<Vec<FaceKeyMatch>>;

    /// Plate results are returned verbatim.
    fn detect_plates(&mut self, image: &[u8]) -> Result<serde_json::Value>;
}

pub struct AinvrClient {
    agent: ureq::Agent,
    address: String,
    username: String,
    password: String,
    retry: RetryPolicy,
    token: Option<String>,
}

impl AinvrClient {
    /// Builds the client and authenticates immediately.
    pub fn connect(cfg: &AinvrConfig) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().timeout(cfg.timeout).build();
        let mut client = Self {
            agent,
            address: cfg.address.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            retry: cfg.retry,
            token: None,
        };
        client.authenticate()?;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Fetches a fresh session token and stores it.
    pub fn authenticate(&mut self) -> Result<String> {
        let url = self.url(AUTH_PATH);
        log::debug!("issuing POST request to {}", url);
        let response = self
            .agent
            .post(&url)
            .send_json(serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .map_err(|err| request_error("authenticate", &url, err))?;
        let reply: types::AuthReply = response.into_json().context("parse auth reply")?;
        self.token = Some(reply.token.clone());
        Ok(reply.token)
    }

    fn authorized<F>(&mut self, what: &str, url: &str, send: F) -> Result<ureq::Response>
    where
        F: Fn(&ureq::Agent, &str) -> Result<ureq::Response, ureq::Error>,
    {
        let token = match &self.token {
            Some(token) => token.clone(),
            None => self.authenticate()?,
        };
        log::debug!("issuing {} request to {}", what, url);
        match send(&self.agent, &token) {
            Ok(response) => Ok(response),
            Err(err) if self.retry.should_retry(&err) => {
                log::warn!("{} failed ({}); refreshing token and retrying once", what, err);
                let token = self.authenticate()?;
                send(&self.agent, &token).map_err(|err| request_error(what, url, err))
            }
            Err(err) => Err(request_error(what, url, err)),
        }
    }

    fn upload(&mut self, what: &str, path: &str, image: &[u8]) -> Result<ureq::Response> {
        let url = self.url(path);
        let form = MultipartForm::single_file("file", image);
        let content_type = form.content_type();
        self.authorized(what, &url, |agent, token| {
            agent
                .post(&url)
                .set(AUTH_HEADER, token)
                .set("Content-Type", &content_type)
                .send_bytes(form.body())
        })
    }

    fn resolve_snapshot_url(&self, snapshot_url: &str) -> Result<url::Url> {
        match url::Url::parse(snapshot_url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = url::Url::parse(&self.address)?;
                base.join(snapshot_url)
                    .with_context(|| format!("resolve snapshot url '{}'", snapshot_url))
            }
            Err(err) => Err(anyhow!("invalid snapshot url '{}': {}", snapshot_url, err)),
        }
    }
}

impl VmsApi for AinvrClient {
    fn camera(&mut self, camera_id: u64) -> Result<CameraInfo> {
        let url = self.url(&camera_detail_path(camera_id));
        let response = self.authorized("get camera detail", &url, |agent, token| {
            agent.get(&url).set(AUTH_HEADER, token).call()
        })?;
        response.into_json().context("parse camera detail")
    }

    fn create_snapshot(&mut self, stream_url: &str) -> Result<String> {
        let url = self.url(CREATE_SNAPSHOT_PATH);
        let payload = serde_json::json!({ "streamUrl": stream_url });
        let response = self.authorized("create snapshot", &url, |agent, token| {
            agent.post(&url).set(AUTH_HEADER, token).send_json(&payload)
        })?;
        let text = response.into_string().context("read snapshot reply")?;
        parse_snapshot_reply(&text)
    }

    fn fetch_snapshot(&mut self, snapshot_url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_snapshot_url(snapshot_url)?;
        log::debug!("downloading snapshot from {}", url);
        let response = self
            .agent
            .request_url("GET", &url)
            .call()
            .map_err(|err| request_error("download snapshot", url.as_str(), err))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_SNAPSHOT_BYTES + 1)
            .read_to_end(&mut bytes)
            .context("read snapshot body")?;
        if bytes.len() as u64 > MAX_SNAPSHOT_BYTES {
            return Err(anyhow!("snapshot exceeds {} bytes", MAX_SNAPSHOT_BYTES));
        }
        if bytes.is_empty() {
            return Err(anyhow!("snapshot download returned no data"));
        }
        Ok(bytes)
    }

    fn detect_objects(&mut self, image: &[u8]) -> Result<Vec<DetectedObject>> {
        let response = self.upload("detect objects", DETECT_OBJECTS_PATH, image)?;
        let body = response.into_string().context("read detection reply")?;
        parse_detected_objects(body.as_bytes())
    }

    fn detect_objects_of_type(
        &mut self,
        image: &[u8],
        targets: &[String],
    ) -> Result<Vec<DetectedObject>> {
        let response = self.upload("detect objects", DETECT_OBJECTS_PATH, image)?;
        let body = response.into_string().context("read detection reply")?;
        log::debug!("objects: {}", body);
        parse_target_objects(body.as_bytes(), targets)
    }

    fn roi(&mut self, roi_id: u64) -> Result<RoiInfo> {
        let url = self.url(&roi_detail_path(roi_id));
        let response = self.authorized("get roi detail", &url, |agent, token| {
            agent.get(&url).set(AUTH_HEADER, token).call()
        })?;
        response.into_json().context("parse roi detail")
    }
}

impl RecognitionApi for AinvrClient {
    fn detect_faces(&mut self, image: &[u8]) -> Result<Vec<FaceDetection>> {
        let response = self.upload("detect faces", DETECT_FACES_PATH, image)?;
        response.into_json().context("parse face detection reply")
    }

    fn find_face_targets(&mut self, descriptor: &str, limit: u32) -> Result<Vec<FaceKeyMatch>> {
        let url = self.url(FACE_KEYS_PATH);
        let limit = limit.to_string();
        let response = self.authorized("find face targets", &url, |agent, token| {
            agent
                .get(&url)
                .set(AUTH_HEADER, token)
                .query("descriptor", descriptor)
                .query("limit", &limit)
                .call()
        })?;
        response.into_json().context("parse face key reply")
    }

    fn detect_plates(&mut self, image: &[u8]) -> Result<serde_json::Value> {
        let response = self.upload("detect plates", DETECT_PLATES_PATH, image)?;
        response.into_json().context("parse plate detection reply")
    }
}

fn request_error(what: &str, url: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            log::error!("exception while accessing {}: HTTP {}", url, code);
            if !body.is_empty() {
                log::error!("reply from server: {}", body);
                anyhow!("{} failed: HTTP {}: {}", what, code, body)
            } else {
                anyhow!("{} failed: HTTP {}", what, code)
            }
        }
        ureq::Error::Transport(transport) => {
            log::error!("exception while accessing {}: {}", url, transport);
            anyhow!("{} failed: {}", what, transport)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(camera_detail_path(12), "/ainvr/api/cameras/12");
        assert_eq!(roi_detail_path(4), "/ainvr/api/rois/4");
    }
}
