/// Edit request pipeline
///
/// Turns stored images, an optional mask and the prompt into one call to
/// the image service, then pulls the first image out of the answer.
///
/// Whole-image edits and region edits are separate entry points: the first
/// never carries a mask, the second always does.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::sync::Arc;

use crate::codec::{self, ImageAsset};
use crate::error::{EditError, RasterizationError, ServiceError};
use crate::mask::{self, GrayscaleSurfaces, SurfaceProvider};
use crate::selection::NormalizedRegion;
use crate::service::{Candidate, ContentUnit, ImageService, OutputConstraints};

/// Image bytes extracted from a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    pub bytes: Vec<u8>,
    pub format_tag: String,
}

impl EditedImage {
    pub fn into_asset(self) -> ImageAsset {
        codec::from_bytes(self.bytes, &self.format_tag)
    }
}

/// Which workflow a submission belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Edit the whole product photo
    Whole,
    /// Inpaint a region of the previous result
    Region,
}

/// One submission, built fresh by the controller and consumed by `run`
#[derive(Debug, Clone)]
pub enum EditJob {
    Whole {
        primary: ImageAsset,
        reference: Option<ImageAsset>,
        prompt: String,
    },
    Region {
        base: ImageAsset,
        region: NormalizedRegion,
        prompt: String,
    },
}

impl EditJob {
    pub fn kind(&self) -> EditKind {
        match self {
            EditJob::Whole { .. } => EditKind::Whole,
            EditJob::Region { .. } => EditKind::Region,
        }
    }
}

/// Shared handle to the service plus the raster surfaces used for masks
#[derive(Clone)]
pub struct EditPipeline {
    service: Arc<dyn ImageService>,
    surfaces: Arc<dyn SurfaceProvider>,
}

impl std::fmt::Debug for EditPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditPipeline").finish_non_exhaustive()
    }
}

impl EditPipeline {
    pub fn new(service: Arc<dyn ImageService>) -> Self {
        Self::with_surfaces(service, Arc::new(GrayscaleSurfaces))
    }

    pub fn with_surfaces(service: Arc<dyn ImageService>, surfaces: Arc<dyn SurfaceProvider>) -> Self {
        Self { service, surfaces }
    }

    /// Edit the whole frame. Content order: primary, reference, prompt.
    ///
    /// The caller has already checked that the prompt is non-empty.
    pub async fn edit_with_prompt(
        &self,
        primary: &ImageAsset,
        prompt: &str,
        reference: Option<&ImageAsset>,
    ) -> Result<EditedImage, EditError> {
        let mut units = vec![ContentUnit::image(&primary.encoded)];
        if let Some(reference) = reference {
            units.push(ContentUnit::image(&reference.encoded));
        }
        units.push(ContentUnit::text(prompt));

        tracing::info!(
            "✏️  Whole-image edit ({} KB{})",
            primary.encoded.approx_byte_len() / 1024,
            if reference.is_some() { ", with reference" } else { "" }
        );

        self.dispatch(&units).await
    }

    /// Edit only the selected region. Content order: base, mask, prompt.
    pub async fn edit_with_selection(
        &self,
        base: &ImageAsset,
        prompt: &str,
        region: NormalizedRegion,
    ) -> Result<EditedImage, EditError> {
        // Decoding the base and drawing the mask is CPU work; keep it off
        // the async executor
        let worker_base = base.clone();
        let surfaces = Arc::clone(&self.surfaces);
        let mask = tokio::task::spawn_blocking(move || {
            mask::mask_for(&worker_base, &region, surfaces.as_ref())
        })
        .await
        .map_err(|e| RasterizationError::Worker(e.to_string()))??;

        tracing::info!(
            "🎯 Region edit at {:.1}%,{:.1}% size {:.1}%x{:.1}%",
            region.x,
            region.y,
            region.width,
            region.height
        );

        let units = vec![
            ContentUnit::image(&base.encoded),
            ContentUnit::image(&mask),
            ContentUnit::text(prompt),
        ];

        self.dispatch(&units).await
    }

    /// Run a submission to completion and return the new asset
    pub async fn run(self, job: EditJob) -> Result<ImageAsset, EditError> {
        let edited = match job {
            EditJob::Whole {
                primary,
                reference,
                prompt,
            } => self.edit_with_prompt(&primary, &prompt, reference.as_ref()).await?,
            EditJob::Region {
                base,
                region,
                prompt,
            } => self.edit_with_selection(&base, &prompt, region).await?,
        };

        Ok(edited.into_asset())
    }

    async fn dispatch(&self, units: &[ContentUnit]) -> Result<EditedImage, EditError> {
        let constraints = OutputConstraints::image_only();

        let candidates = self.service.call(units, &constraints).await.map_err(|source| {
            // Full detail goes to the log only
            tracing::error!("❌ Image service call failed: {}", source);
            EditError::service(source)
        })?;

        extract_image(&candidates)
    }
}

/// Return the first image-typed unit, scanning candidates in order
pub fn extract_image(candidates: &[Candidate]) -> Result<EditedImage, EditError> {
    let found = candidates
        .iter()
        .flat_map(|candidate| candidate.units.iter())
        .find(|unit| unit.is_image());

    match found {
        Some(ContentUnit::Inline { mime_type, data }) => {
            // A bad payload here is the service's fault, not an unreadable upload
            let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
                tracing::error!("❌ Response image is not valid base64: {}", e);
                EditError::service(ServiceError::Malformed(format!("image payload: {}", e)))
            })?;
            tracing::info!("🖼️  Received {} ({} bytes)", mime_type, bytes.len());
            Ok(EditedImage {
                bytes,
                format_tag: mime_type.clone(),
            })
        }
        _ => {
            let text: Vec<&str> = candidates
                .iter()
                .flat_map(|candidate| candidate.units.iter())
                .filter_map(|unit| match unit {
                    ContentUnit::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect();

            let text = if text.is_empty() { None } else { Some(text.join(" ")) };
            tracing::warn!("⚠️  Response contained no image: {:?}", text);
            Err(EditError::NoImageInResponse { text })
        }
    }
}
