/// Remote image-editing service
///
/// The pipeline only sees the `ImageService` trait: an ordered list of
/// content units goes in, a list of candidate answers comes out. The real
/// implementation talks to Gemini over HTTP (`gemini.rs`); tests use the
/// recording fake in `fake.rs`.

pub mod gemini;

#[cfg(test)]
pub mod fake;

use std::future::Future;
use std::pin::Pin;

use crate::codec::EncodedImage;
use crate::error::ServiceError;

pub use gemini::GeminiService;

/// One item of a request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUnit {
    /// Binary payload (base64) with its MIME type
    Inline { mime_type: String, data: String },
    /// Plain text
    Text(String),
}

impl ContentUnit {
    pub fn image(encoded: &EncodedImage) -> Self {
        ContentUnit::Inline {
            mime_type: encoded.format_tag.clone(),
            data: encoded.content.clone(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentUnit::Text(text.into())
    }

    /// True for inline payloads whose type is an image
    pub fn is_image(&self) -> bool {
        matches!(self, ContentUnit::Inline { mime_type, .. } if mime_type.starts_with("image/"))
    }
}

/// Kinds of output the service may be asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Image,
}

/// Restrictions sent alongside the content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConstraints {
    pub modalities: Vec<Modality>,
}

impl OutputConstraints {
    /// Ask for image output and nothing else
    pub fn image_only() -> Self {
        Self {
            modalities: vec![Modality::Image],
        }
    }
}

/// One candidate answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub units: Vec<ContentUnit>,
}

/// Boxed future returned by [`ImageService::call`]
pub type CallFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Candidate>, ServiceError>> + Send + 'a>>;

/// A generative service that can edit images
pub trait ImageService: Send + Sync {
    /// Send the content units and return every candidate answer
    fn call<'a>(&'a self, units: &'a [ContentUnit], constraints: &'a OutputConstraints) -> CallFuture<'a>;
}
