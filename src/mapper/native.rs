use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DecodeError;
use crate::model::NativeContent;

#[derive(Deserialize)]
struct Envelope {
    uuid: String,
    #[serde(rename = "type", default)]
    kind: String,
    value: String,
    #[serde(default)]
    attributes: String,
}

/// Decode the outer JSON envelope of a native CMS message.
pub fn decode(source: &[u8]) -> Result<NativeContent, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(source).map_err(|err| {
        DecodeError::MalformedEnvelope(format!("couldn't decode native content as JSON: {err}"))
    })?;
    if Uuid::parse_str(&envelope.uuid).is_err() {
        return Err(DecodeError::MalformedEnvelope(format!(
            "uuid {:?} is not a valid UUID",
            envelope.uuid
        )));
    }
    Ok(NativeContent {
        source_id: envelope.uuid,
        kind: envelope.kind,
        value: envelope.value,
        attributes: envelope.attributes,
    })
}

impl NativeContent {
    /// Base64-decoded article XML. Line breaks and other ASCII whitespace in
    /// the payload are ignored.
    pub fn body(&self) -> Result<Vec<u8>, DecodeError> {
        let compact: String = self
            .value
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD.decode(compact).map_err(|err| {
            DecodeError::MalformedEnvelope(format!("couldn't decode value as base64: {err}"))
        })
    }
}
