use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationParams {
    pub width: u32,
    pub quality: u8,
}

impl Default for PresentationParams {
    fn default() -> Self {
        Self {
            width: 800,
            quality: 80,
        }
    }
}

impl PresentationParams {
    pub fn query(&self) -> String {
        format!("auto=format&fit=crop&w={}&q={}", self.width, self.quality)
    }
}

pub fn strip_query(locator: &str) -> &str {
    let end = locator.find(['?', '#']).unwrap_or(locator.len());
    &locator[..end]
}

/// Drops any existing query and fragment from a remote locator and appends the
/// presentation parameters.
pub fn display_url(locator: &str, params: &PresentationParams) -> String {
    match Url::parse(locator) {
        Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
            url.set_fragment(None);
            url.set_query(Some(&params.query()));
            url.into()
        }
        _ => format!("{}?{}", strip_query(locator), params.query()),
    }
}

pub fn is_data_url(locator: &str) -> bool {
    locator.starts_with(DATA_URL_PREFIX)
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("{DATA_URL_PREFIX}{mime}{BASE64_MARKER},{payload}")
}

/// Returns the media type and payload of a base64 `data:` URL.
pub fn decode_data_url(locator: &str) -> Option<(String, Vec<u8>)> {
    let rest = locator.strip_prefix(DATA_URL_PREFIX)?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(BASE64_MARKER)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    Some((mime.to_string(), bytes))
}
