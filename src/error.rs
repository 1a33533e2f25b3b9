/// Error types shared across the editor core
///
/// Every failure that can reach the user ends up as an `EditError` at the
/// controller boundary, where it is turned into a short message for the
/// status line and a detailed record for the log.

use thiserror::Error;

/// Failure turning an upload or a stored data URL into transportable text
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read from disk
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A `data:` string that does not split into exactly header + payload
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// Neither the declared metadata nor a data-URL header named a type
    #[error("could not determine the image type")]
    UnknownFormat,

    /// The payload is not valid base64
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Failure producing a mask raster
#[derive(Debug, Error)]
pub enum RasterizationError {
    /// The base image could not be decoded to discover its dimensions
    #[error("failed to load base image: {0}")]
    BaseImage(String),

    /// No drawing surface of the requested size is available
    #[error("cannot acquire a {width}x{height} raster surface")]
    Surface { width: u32, height: u32 },

    /// The region covers no whole or partial pixel of the base image
    #[error("the selected region covers no pixels")]
    EmptyRegion,

    /// The finished mask could not be encoded as PNG
    #[error("failed to encode mask: {0}")]
    Encode(#[from] image::ImageError),

    /// The blocking worker running the rasterizer died
    #[error("mask worker failed: {0}")]
    Worker(String),
}

/// Transport-level failure raised by an `ImageService` implementation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

/// Everything that can go wrong between "submit" and "edited image shown"
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Rasterization(#[from] RasterizationError),

    /// The service answered but produced no image (usually a policy refusal)
    #[error("the service returned no image{}", text_suffix(.text))]
    NoImageInResponse { text: Option<String> },

    /// Any transport or service failure; `message` is safe to show
    #[error("{message}")]
    Service {
        message: String,
        #[source]
        source: ServiceError,
    },
}

fn text_suffix(text: &Option<String>) -> String {
    text.as_deref().map(|t| format!(": {t}")).unwrap_or_default()
}

impl EditError {
    /// Wrap a transport failure behind a message fit for the status line
    pub fn service(source: ServiceError) -> Self {
        let message = match &source {
            ServiceError::MissingApiKey => {
                "No API key configured. Set GEMINI_API_KEY and restart.".to_string()
            }
            _ => "The image service could not complete the edit. Please try again.".to_string(),
        };
        EditError::Service { message, source }
    }

    /// Message shown to the user. Never includes raw transport details.
    pub fn user_message(&self) -> String {
        match self {
            EditError::Decode(_) => "That file could not be read as an image.".to_string(),
            EditError::Rasterization(_) => {
                "Could not build a mask for the selected region.".to_string()
            }
            EditError::NoImageInResponse { .. } => {
                "The service did not return an image. Try rephrasing your instruction.".to_string()
            }
            EditError::Service { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_hides_cause() {
        let err = EditError::service(ServiceError::Status {
            status: 500,
            body: "internal stack trace".to_string(),
        });

        let message = err.user_message();
        assert!(!message.contains("stack trace"));
        assert!(!message.contains("500"));
    }

    #[test]
    fn test_missing_key_message() {
        let err = EditError::service(ServiceError::MissingApiKey);
        assert!(err.user_message().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_no_image_display_includes_text() {
        let err = EditError::NoImageInResponse {
            text: Some("I can't help with that".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "the service returned no image: I can't help with that"
        );

        let bare = EditError::NoImageInResponse { text: None };
        assert_eq!(bare.to_string(), "the service returned no image");
    }
}
