//! Self-contained `data:` URLs for embedded images.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::DataUrlError;

/// A base64 `data:` URL such as `data:image/webp;base64,UklGR...`.
///
/// Constructed either by encoding bytes or by parsing a stored string, so a
/// value of this type always has the `data:<mime>;base64,` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(try_from = "String", into = "String")]
pub struct DataUrl(String);

impl DataUrl {
    /// Encodes raw bytes under the given MIME type.
    pub fn encode(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Validates a stored string.
    pub fn parse(url: impl Into<String>) -> Result<Self, DataUrlError> {
        let url = url.into();
        split(&url).ok_or(DataUrlError::Malformed)?;
        Ok(Self(url))
    }

    /// The MIME type, e.g. `image/jpeg`.
    pub fn mime(&self) -> &str {
        split(&self.0).map(|(mime, _)| mime).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the base64 payload.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, DataUrlError> {
        let (_, payload) = split(&self.0).ok_or(DataUrlError::Malformed)?;
        Ok(STANDARD.decode(payload)?)
    }

    /// Decodes the payload as an image.
    pub fn decode_image(&self) -> Result<RgbaImage, DataUrlError> {
        let bytes = self.decode_bytes()?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Splits `data:<mime>;base64,<payload>` into (mime, payload).
fn split(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

impl TryFrom<String> for DataUrl {
    type Error = DataUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DataUrl> for String {
    fn from(url: DataUrl) -> Self {
        url.0
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_inspect() {
        let url = DataUrl::encode("image/jpeg", b"hello");
        assert_eq!(url.as_str(), "data:image/jpeg;base64,aGVsbG8=");
        assert_eq!(url.mime(), "image/jpeg");
        assert_eq!(url.decode_bytes().unwrap(), b"hello");
    }

    #[test]
    fn parse_rejects_non_data_urls() {
        assert!(DataUrl::parse("/images/background.webp").is_err());
        assert!(DataUrl::parse("data:image/png,rawpayload").is_err());
        assert!(DataUrl::parse("data:image/png;base64,AAAA").is_ok());
    }

    #[test]
    fn decode_image_reports_garbage() {
        let url = DataUrl::encode("image/png", b"not a png");
        assert!(matches!(url.decode_image(), Err(DataUrlError::Image(_))));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<DataUrl, _> = serde_json::from_str("\"data:image/webp;base64,AA==\"");
        assert!(ok.is_ok());
        let bad: Result<DataUrl, _> = serde_json::from_str("\"https://example.com/a.png\"");
        assert!(bad.is_err());
    }
}
