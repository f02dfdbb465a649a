//! Still-image face identification and licence plate recognition.

use anyhow::Result;
use serde::Serialize;

use crate::client::RecognitionApi;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceIdentity {
    /// Best matching enrolled face target, if any.
    pub name: Option<String>,
    pub confidence: f64,
    pub age: serde_json::Value,
    pub gender: serde_json::Value,
}

/// Identifies the first face found in `image`. `None` if no face was
/// detected.
pub fn identify_face<A: RecognitionApi + ?Sized>(
    api: &mut A,
    image: &[u8],
) -> Result<Option<FaceIdentity>> {
    let faces = api.detect_faces(image)?;
    let Some(face) = faces.into_iter().next() else {
        log::info!("no face detected");
        return Ok(None);
    };
    let matches = api.find_face_targets(&face.descriptor, 1)?;
    let name = matches.into_iter().next().map(|m| m.face_target.name);
    if name.is_none() {
        log::info!("face detected but no enrolled target matched");
    }
    Ok(Some(FaceIdentity {
        name,
        confidence: face.confidence,
        age: face.age,
        gender: face.gender,
    }))
}

pub fn recognize_plates<A: RecognitionApi + ?Sized>(
    api: &mut A,
    image: &[u8],
) -> Result<serde_json::Value> {
    api.detect_plates(image)
}
