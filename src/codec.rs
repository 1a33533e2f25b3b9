/// Binary/text codec for images
///
/// The remote service only speaks base64 text tagged with a MIME type, while
/// the window wants something it can render. This module converts between
/// the two and understands `data:<type>;base64,<payload>` strings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use iced::widget::image::Handle;
use std::path::Path;

use crate::error::DecodeError;

/// A transportable image: base64 content plus its declared format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 text of the image bytes
    pub content: String,
    /// MIME type, e.g. "image/png"
    pub format_tag: String,
}

impl EncodedImage {
    /// Decode the base64 content back into raw bytes
    pub fn bytes(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(BASE64.decode(self.content.as_bytes())?)
    }

    /// Size of the payload once decoded, for log lines
    pub fn approx_byte_len(&self) -> usize {
        self.content.len() / 4 * 3
    }
}

/// An image held by the editor: renderable handle plus its encoded form
///
/// Created by an upload or by a successful edit, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Handle the `image` widget renders
    pub display: Handle,
    /// Transportable representation sent to the service
    pub encoded: EncodedImage,
}

impl ImageAsset {
    pub fn content(&self) -> &str {
        &self.encoded.content
    }

    pub fn format_tag(&self) -> &str {
        &self.encoded.format_tag
    }
}

/// Read a local file and encode it for transport.
///
/// The read goes through tokio so the UI thread never blocks; several
/// uploads can be in flight at once since nothing here is shared.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<ImageAsset, DecodeError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| DecodeError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let encoded = encode_bytes(&bytes, mime_for_path(path))?;
    tracing::info!(
        "📥 Encoded {} ({}, {} bytes)",
        path.display(),
        encoded.format_tag,
        bytes.len()
    );

    decode(&encoded.content, &encoded.format_tag)
}

/// Encode raw bytes, taking the type from `declared_mime` or, when the bytes
/// are themselves a data URL, from its header.
pub fn encode_bytes(bytes: &[u8], declared_mime: Option<&str>) -> Result<EncodedImage, DecodeError> {
    // A file may already hold a data URL (e.g. pasted from a browser)
    if bytes.starts_with(b"data:") {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| DecodeError::MalformedDataUrl("not valid UTF-8".to_string()))?;
        let (header_mime, payload) = split_data_url(text.trim())?;

        let format_tag = declared_mime
            .map(str::to_string)
            .or(header_mime)
            .ok_or(DecodeError::UnknownFormat)?;

        return Ok(EncodedImage {
            content: payload.to_string(),
            format_tag,
        });
    }

    let format_tag = declared_mime.ok_or(DecodeError::UnknownFormat)?;
    Ok(encode_tagged(bytes, format_tag))
}

/// Parse a stored `data:<type>;base64,<payload>` string
pub fn parse_data_url(url: &str) -> Result<EncodedImage, DecodeError> {
    let (mime, payload) = split_data_url(url.trim())?;
    Ok(EncodedImage {
        content: payload.to_string(),
        format_tag: mime.ok_or(DecodeError::UnknownFormat)?,
    })
}

/// Rebuild the data URL for a payload. Never fails.
pub fn to_data_url(content: &str, format_tag: &str) -> String {
    format!("data:{};base64,{}", format_tag, content)
}

/// Turn transportable text back into a displayable asset
pub fn decode(content: &str, format_tag: &str) -> Result<ImageAsset, DecodeError> {
    let bytes = BASE64.decode(content.as_bytes())?;
    Ok(ImageAsset {
        display: Handle::from_bytes(bytes),
        encoded: EncodedImage {
            content: content.to_string(),
            format_tag: format_tag.to_string(),
        },
    })
}

/// Encode bytes whose type is already known
pub fn encode_tagged(bytes: &[u8], format_tag: &str) -> EncodedImage {
    EncodedImage {
        content: BASE64.encode(bytes),
        format_tag: format_tag.to_string(),
    }
}

/// Build an asset from bytes the service returned
pub fn from_bytes(bytes: Vec<u8>, format_tag: &str) -> ImageAsset {
    let encoded = encode_tagged(&bytes, format_tag);
    ImageAsset {
        display: Handle::from_bytes(bytes),
        encoded,
    }
}

/// Split "scheme:type;encoding,payload" into (type, payload).
///
/// Exactly one comma is allowed; base64 never contains one.
fn split_data_url(url: &str) -> Result<(Option<String>, &str), DecodeError> {
    let mut segments = url.split(',');
    let (header, payload) = match (segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), None) => (header, payload),
        _ => {
            return Err(DecodeError::MalformedDataUrl(
                "expected exactly one header and one payload".to_string(),
            ))
        }
    };

    let mime = header
        .strip_prefix("data:")
        .ok_or_else(|| DecodeError::MalformedDataUrl("missing data: scheme".to_string()))?
        .split(';')
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_string);

    Ok((mime, payload))
}

/// MIME type implied by a file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
