//! JSON messages exchanged with viewers over the session channel.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use caption_core::{CaptionResult, Decision, DecisionKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::file_name_of;

/// Controller -> viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewerEvent {
    Image {
        path: String,
        filename: String,
        /// Base64 of the raw file bytes.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Caption {
        description: String,
        tags: Vec<String>,
    },
    Error {
        message: String,
    },
    Complete,
}

impl ViewerEvent {
    pub fn image(path: &str, bytes: &[u8], mime_type: &str) -> Self {
        Self::Image {
            path: path.to_string(),
            filename: file_name_of(path).to_string(),
            data: BASE64.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn caption(result: CaptionResult) -> Self {
        Self::Caption {
            description: result.description,
            tags: result.tags,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid viewer message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Payload of accept, reject and regenerate; decoded only once the type is known.
#[derive(Debug, Deserialize)]
struct DecisionFields {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    tags: Option<TagsField>,
}

/// The bundled page sends tags as one comma-joined string; other clients
/// may send an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsField {
    List(Vec<String>),
    Text(String),
}

impl TagsField {
    fn into_tags(self) -> Vec<String> {
        let raw = match self {
            TagsField::List(items) => items,
            TagsField::Text(text) => text.split(',').map(ToOwned::to_owned).collect(),
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

/// Parses one inbound frame. `Ok(None)` means a well-formed message with a
/// `type` this controller does not handle.
pub fn parse_viewer_message(text: &str) -> Result<Option<Decision>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let envelope = Envelope::deserialize(&value)?;
    let kind = match envelope.kind.as_str() {
        "accept" => DecisionKind::Accept,
        "reject" => DecisionKind::Reject,
        "regenerate" => DecisionKind::Regenerate,
        _ => return Ok(None),
    };
    let raw = DecisionFields::deserialize(value)?;
    Ok(Some(Decision {
        kind,
        path: raw.path.filter(|path| !path.is_empty()),
        caption: raw.caption,
        tags: raw.tags.map(TagsField::into_tags).unwrap_or_default(),
    }))
}
