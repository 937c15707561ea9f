use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{FixtureError, FixtureResult};

/// A bitmap tag payload as described by a fixture's `tag.json`.
///
/// The payload is opaque to this crate: `data` holds the (possibly
/// compressed) image bytes exactly as the container format carries them.
/// Immutable once read; [`with_id`](Self::with_id) returns a re-tagged copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitmapPayload {
    pub id: u16,
    pub width: u16,
    pub height: u16,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl BitmapPayload {
    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagJson {
    #[serde(rename = "type")]
    kind: String,
    id: u16,
    width: u16,
    height: u16,
    media_type: String,
    /// Base64-encoded payload bytes.
    data: String,
}

const TAG_KIND: &str = "define-bitmap";

/// Parses a textual bitmap tag description.
pub fn read_tag_json(text: &str) -> FixtureResult<BitmapPayload> {
    let raw: TagJson = serde_json::from_str(text)
        .map_err(|e| FixtureError::codec(format!("parse tag description: {e}")))?;
    if raw.kind != TAG_KIND {
        return Err(FixtureError::codec(format!(
            "tag description has type '{}', expected '{TAG_KIND}'",
            raw.kind
        )));
    }
    let data = BASE64
        .decode(raw.data.as_bytes())
        .map_err(|e| FixtureError::codec(format!("decode tag description data: {e}")))?;
    Ok(BitmapPayload {
        id: raw.id,
        width: raw.width,
        height: raw.height,
        media_type: raw.media_type,
        data,
    })
}

/// Serializes a bitmap tag description as pretty-printed JSON with a
/// trailing newline, the normalized on-disk form.
pub fn write_tag_json(payload: &BitmapPayload) -> FixtureResult<String> {
    let raw = TagJson {
        kind: TAG_KIND.to_string(),
        id: payload.id,
        width: payload.width,
        height: payload.height,
        media_type: payload.media_type.clone(),
        data: BASE64.encode(&payload.data),
    };
    let mut text = serde_json::to_string_pretty(&raw)
        .map_err(|e| FixtureError::codec(format!("serialize tag description: {e}")))?;
    text.push('\n');
    Ok(text)
}
