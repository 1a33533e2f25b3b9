/// Shared data structures for the application state
/// 
/// These types describe what the controller holds and reports back to
/// the window: which image slot an upload targets, how far the current
/// operation has got, and why a request was refused.

use std::sync::Arc;

use crate::codec::ImageAsset;
use crate::error::EditError;

/// Result of an upload or an edit as it travels back through a message.
/// The error is shared so messages stay cheap to clone.
pub type Outcome = Result<ImageAsset, Arc<EditError>>;

/// The image slots the controller owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The product photo being edited
    Original,
    /// Optional style/reference photo sent alongside the original
    Reference,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Original => "product image",
            Slot::Reference => "reference image",
        }
    }
}

/// Progress of the most recent submission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingOperation {
    /// Nothing submitted yet (or state was reset)
    #[default]
    Idle,
    /// A request is on its way to the service
    InFlight,
    /// Last request failed with a user-facing message
    Failed(String),
    /// Last request produced an image
    Succeeded,
}

impl PendingOperation {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, PendingOperation::InFlight)
    }
}

/// Why the controller refused an action
///
/// Refusals happen before anything is dispatched; nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("An edit is already in progress.")]
    Busy,
    #[error("An upload is already in progress.")]
    Uploading,
    #[error("Upload a product image first.")]
    NoPrimaryImage,
    #[error("Generate an edited image first.")]
    NoEditedImage,
    #[error("Enter an instruction first.")]
    EmptyPrompt,
    #[error("Draw a region on the image first.")]
    NoRegion,
}
