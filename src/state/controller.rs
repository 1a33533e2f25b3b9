use crate::codec::ImageAsset;
use crate::error::EditError;
use crate::pipeline::{EditJob, EditKind};
use crate::selection::{NormalizedRegion, RegionSelector, ScreenPoint, SurfaceBounds};
use super::data::{Outcome, PendingOperation, Rejection, Slot};

/// The Controller owns everything the user has uploaded, typed or drawn.
///
/// It decides whether an action is allowed, builds the job for the pipeline
/// and folds the result back in. All mutation happens here, on the UI
/// thread, between suspension points, so nothing needs a lock.
#[derive(Debug, Default)]
pub struct Controller {
    /// Product photo (the "original" slot)
    original: Option<ImageAsset>,
    /// Optional reference photo
    reference: Option<ImageAsset>,
    /// Latest successful edit; base for region edits
    edited: Option<ImageAsset>,
    /// Drag selection over the edited image
    selector: RegionSelector,
    /// Instruction for whole-image edits
    prompt: String,
    /// Instruction for region edits
    region_prompt: String,
    /// State of the most recent submission
    operation: PendingOperation,
    /// Slot currently being uploaded, if any
    uploading: Option<Slot>,
    /// Message shown until the next success or the next error
    last_error: Option<String>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Read access ==========

    pub fn original(&self) -> Option<&ImageAsset> {
        self.original.as_ref()
    }

    pub fn reference(&self) -> Option<&ImageAsset> {
        self.reference.as_ref()
    }

    pub fn edited(&self) -> Option<&ImageAsset> {
        self.edited.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn region_prompt(&self) -> &str {
        &self.region_prompt
    }

    pub fn operation(&self) -> &PendingOperation {
        &self.operation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.operation.is_in_flight() || self.uploading.is_some()
    }

    pub fn is_selecting(&self) -> bool {
        self.selector.is_active()
    }

    pub fn region(&self) -> Option<NormalizedRegion> {
        self.selector.region()
    }

    /// Whole-image submit button state
    pub fn can_submit(&self) -> bool {
        !self.is_busy() && self.original.is_some() && !self.prompt.trim().is_empty()
    }

    /// Region submit button state
    pub fn can_submit_region(&self) -> bool {
        !self.is_busy()
            && self.edited.is_some()
            && self.selector.usable_region().is_some()
            && !self.region_prompt.trim().is_empty()
    }

    /// One-line summary for the status bar
    pub fn status_text(&self) -> String {
        if let Some(slot) = self.uploading {
            return format!("Loading {}...", slot.label());
        }
        if self.selector.is_dragging() {
            return "Release to set the region.".to_string();
        }
        match &self.operation {
            PendingOperation::InFlight => "Generating...".to_string(),
            PendingOperation::Failed(message) => message.clone(),
            PendingOperation::Succeeded if self.selector.is_active() => {
                "Drag over the image to select a region.".to_string()
            }
            PendingOperation::Succeeded => "Edit complete.".to_string(),
            PendingOperation::Idle if self.original.is_none() => {
                "Upload a product image to begin.".to_string()
            }
            PendingOperation::Idle => "Ready.".to_string(),
        }
    }

    // ========== Text input ==========

    pub fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    pub fn set_region_prompt(&mut self, prompt: String) {
        self.region_prompt = prompt;
    }

    // ========== Uploads ==========

    /// Mark an upload as started. Refused while anything else is running.
    pub fn begin_upload(&mut self, slot: Slot) -> Result<(), Rejection> {
        self.ensure_idle()?;
        self.uploading = Some(slot);
        Ok(())
    }

    /// The file dialog was dismissed
    pub fn cancel_upload(&mut self) {
        self.uploading = None;
    }

    /// Store an uploaded image, or record why it failed.
    ///
    /// A new product photo invalidates the previous result and any
    /// selection made over it.
    pub fn finish_upload(&mut self, slot: Slot, result: Outcome) {
        self.uploading = None;

        match result {
            Ok(asset) => {
                tracing::info!("✅ Loaded {} ({})", slot.label(), asset.format_tag());
                match slot {
                    Slot::Original => {
                        self.original = Some(asset);
                        self.edited = None;
                        self.selector.set_active(false);
                        self.region_prompt.clear();
                        self.operation = PendingOperation::Idle;
                    }
                    Slot::Reference => self.reference = Some(asset),
                }
                self.last_error = None;
            }
            Err(e) => self.record_error(&e),
        }
    }

    pub fn remove_reference(&mut self) -> Result<(), Rejection> {
        self.ensure_idle()?;
        self.reference = None;
        Ok(())
    }

    // ========== Selection ==========

    /// Switch between whole-image actions and region selection.
    ///
    /// Leaving selection mode discards the region and its prompt text.
    /// Returns the new mode.
    pub fn toggle_selection(&mut self) -> Result<bool, Rejection> {
        self.ensure_idle()?;
        if self.edited.is_none() {
            return Err(Rejection::NoEditedImage);
        }

        let active = !self.selector.is_active();
        self.selector.set_active(active);
        if !active {
            self.region_prompt.clear();
        }
        Ok(active)
    }

    pub fn drag_started(&mut self, point: ScreenPoint, bounds: SurfaceBounds) {
        if !self.operation.is_in_flight() {
            self.selector.begin_drag(point, bounds);
        }
    }

    pub fn drag_moved(&mut self, point: ScreenPoint, bounds: SurfaceBounds) {
        self.selector.update_drag(point, bounds);
    }

    pub fn drag_ended(&mut self) {
        self.selector.end_drag();
    }

    // ========== Submissions ==========

    /// Build a whole-image edit. Any selection is dropped.
    pub fn submit_edit(&mut self) -> Result<EditJob, Rejection> {
        self.ensure_idle()?;
        let primary = self.original.clone().ok_or(Rejection::NoPrimaryImage)?;
        let prompt = non_empty(&self.prompt)?;

        self.selector.set_active(false);
        self.region_prompt.clear();
        self.start_operation();

        Ok(EditJob::Whole {
            primary,
            reference: self.reference.clone(),
            prompt,
        })
    }

    /// Build a region edit against the current result.
    ///
    /// A degenerate region is never submitted.
    pub fn submit_region_edit(&mut self) -> Result<EditJob, Rejection> {
        self.ensure_idle()?;
        let base = self.edited.clone().ok_or(Rejection::NoEditedImage)?;
        let region = self.selector.usable_region().ok_or(Rejection::NoRegion)?;
        let prompt = non_empty(&self.region_prompt)?;

        self.start_operation();

        Ok(EditJob::Region { base, region, prompt })
    }

    /// Fold a finished job back into state. Always leaves `InFlight`.
    pub fn finish_edit(&mut self, kind: EditKind, result: Outcome) {
        match result {
            Ok(asset) => {
                tracing::info!("✅ {:?} edit complete", kind);
                self.edited = Some(asset);
                self.operation = PendingOperation::Succeeded;
                self.last_error = None;

                if kind == EditKind::Region {
                    self.selector.set_active(false);
                    self.region_prompt.clear();
                }
            }
            Err(e) => self.record_error(&e),
        }
    }

    /// Show why an action was refused without touching the operation state
    pub fn show_rejection(&mut self, rejection: Rejection) {
        tracing::debug!("Refused: {}", rejection);
        self.last_error = Some(rejection.to_string());
    }

    /// Start over with nothing loaded
    pub fn reset(&mut self) -> Result<(), Rejection> {
        self.ensure_idle()?;
        *self = Self::default();
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.operation.is_in_flight() {
            return Err(Rejection::Busy);
        }
        if self.uploading.is_some() {
            return Err(Rejection::Uploading);
        }
        Ok(())
    }

    fn start_operation(&mut self) {
        self.operation = PendingOperation::InFlight;
        self.last_error = None;
    }

    fn record_error(&mut self, error: &EditError) {
        // Full chain for diagnostics; the user only sees the short message
        tracing::error!("❌ {} ({:?})", error, error);
        let message = error.user_message();
        self.operation = PendingOperation::Failed(message.clone());
        self.last_error = Some(message);
    }
}

fn non_empty(prompt: &str) -> Result<String, Rejection> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        Err(Rejection::EmptyPrompt)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::error::{DecodeError, ServiceError};
    use crate::pipeline::EditPipeline;
    use crate::service::fake::FakeService;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;
    use std::sync::Arc;

    const BOUNDS: SurfaceBounds = SurfaceBounds {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
    };

    fn png_asset() -> ImageAsset {
        let mut png = Vec::new();
        RgbaImage::new(8, 8)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        codec::from_bytes(png, "image/png")
    }

    fn with_original() -> Controller {
        let mut controller = Controller::new();
        controller.begin_upload(Slot::Original).unwrap();
        controller.finish_upload(Slot::Original, Ok(png_asset()));
        controller
    }

    /// Controller holding an edited result with selection mode on
    fn with_edit_selecting() -> Controller {
        let mut controller = with_original();
        controller.set_prompt("white background".to_string());
        let job = controller.submit_edit().unwrap();
        controller.finish_edit(job.kind(), Ok(png_asset()));
        assert!(controller.toggle_selection().unwrap());
        controller
    }

    fn drag(controller: &mut Controller, from: (f32, f32), to: (f32, f32)) {
        controller.drag_started(ScreenPoint { x: from.0, y: from.1 }, BOUNDS);
        controller.drag_moved(ScreenPoint { x: to.0, y: to.1 }, BOUNDS);
        controller.drag_ended();
    }

    #[test]
    fn test_submit_requires_image_and_prompt() {
        let mut controller = Controller::new();
        assert_eq!(controller.submit_edit().unwrap_err(), Rejection::NoPrimaryImage);

        let mut controller = with_original();
        controller.set_prompt("   ".to_string());
        assert_eq!(controller.submit_edit().unwrap_err(), Rejection::EmptyPrompt);
        assert_eq!(*controller.operation(), PendingOperation::Idle);
    }

    #[test]
    fn test_submit_includes_reference_and_trims_prompt() {
        let mut controller = with_original();
        controller.begin_upload(Slot::Reference).unwrap();
        controller.finish_upload(Slot::Reference, Ok(png_asset()));
        controller.set_prompt("  on marble  ".to_string());

        match controller.submit_edit().unwrap() {
            EditJob::Whole { reference, prompt, .. } => {
                assert!(reference.is_some());
                assert_eq!(prompt, "on marble");
            }
            other => panic!("expected whole-image job, got {:?}", other),
        }
        assert!(controller.operation().is_in_flight());
    }

    #[tokio::test]
    async fn test_second_submit_rejected_while_in_flight() {
        let fake = FakeService::returning_image("QUJD");
        let pipeline = EditPipeline::new(Arc::new(fake.clone()));

        let mut controller = with_original();
        controller.set_prompt("add shadow".to_string());
        let job = controller.submit_edit().unwrap();

        // Second click while the first request is still out
        assert_eq!(controller.submit_edit().unwrap_err(), Rejection::Busy);
        assert_eq!(controller.begin_upload(Slot::Original).unwrap_err(), Rejection::Busy);

        let kind = job.kind();
        let result = pipeline.run(job).await.map_err(Arc::new);
        controller.finish_edit(kind, result);

        assert_eq!(fake.call_count(), 1);
        assert_eq!(*controller.operation(), PendingOperation::Succeeded);
        assert!(controller.edited().is_some());
    }

    #[tokio::test]
    async fn test_degenerate_region_never_dispatched() {
        let fake = FakeService::returning_image("QUJD");
        let pipeline = EditPipeline::new(Arc::new(fake.clone()));

        let mut controller = with_edit_selecting();
        controller.set_region_prompt("remove scratch".to_string());

        // Horizontal line: width > 0, height = 0
        drag(&mut controller, (10.0, 40.0), (60.0, 40.0));
        assert!(!controller.can_submit_region());

        match controller.submit_region_edit() {
            Ok(job) => {
                let _ = pipeline.run(job).await;
                panic!("degenerate region was submitted");
            }
            Err(rejection) => assert_eq!(rejection, Rejection::NoRegion),
        }
        assert_eq!(fake.call_count(), 0);
        assert!(!controller.operation().is_in_flight());
    }

    #[test]
    fn test_region_submit_uses_edited_image_and_region() {
        let mut controller = with_edit_selecting();
        controller.set_region_prompt("make the label red".to_string());
        drag(&mut controller, (80.0, 90.0), (20.0, 30.0));

        match controller.submit_region_edit().unwrap() {
            EditJob::Region { region, prompt, .. } => {
                assert_eq!(
                    region,
                    NormalizedRegion {
                        x: 20.0,
                        y: 30.0,
                        width: 60.0,
                        height: 60.0,
                    }
                );
                assert_eq!(prompt, "make the label red");
            }
            other => panic!("expected region job, got {:?}", other),
        }
    }

    #[test]
    fn test_region_success_clears_selection() {
        let mut controller = with_edit_selecting();
        controller.set_region_prompt("blur background".to_string());
        drag(&mut controller, (10.0, 10.0), (50.0, 50.0));

        let job = controller.submit_region_edit().unwrap();
        controller.finish_edit(job.kind(), Ok(png_asset()));

        assert!(!controller.is_selecting());
        assert_eq!(controller.region(), None);
        assert_eq!(controller.region_prompt(), "");
    }

    #[test]
    fn test_new_upload_clears_result_and_selection() {
        let mut controller = with_edit_selecting();
        controller.set_region_prompt("half typed".to_string());
        drag(&mut controller, (10.0, 10.0), (50.0, 50.0));

        controller.begin_upload(Slot::Original).unwrap();
        controller.finish_upload(Slot::Original, Ok(png_asset()));

        assert!(controller.edited().is_none());
        assert!(!controller.is_selecting());
        assert_eq!(controller.region(), None);
        assert_eq!(controller.region_prompt(), "");
    }

    #[test]
    fn test_reference_upload_keeps_result() {
        let mut controller = with_edit_selecting();
        controller.begin_upload(Slot::Reference).unwrap();
        controller.finish_upload(Slot::Reference, Ok(png_asset()));

        assert!(controller.edited().is_some());
        assert!(controller.is_selecting());
    }

    #[test]
    fn test_toggle_off_discards_region_and_prompt() {
        let mut controller = with_edit_selecting();
        controller.set_region_prompt("partial".to_string());
        drag(&mut controller, (10.0, 10.0), (50.0, 50.0));

        assert!(!controller.toggle_selection().unwrap());
        assert_eq!(controller.region(), None);
        assert_eq!(controller.region_prompt(), "");
    }

    #[test]
    fn test_status_follows_drag() {
        let mut controller = with_edit_selecting();
        assert_eq!(controller.status_text(), "Drag over the image to select a region.");

        controller.drag_started(ScreenPoint { x: 10.0, y: 10.0 }, BOUNDS);
        assert_eq!(controller.status_text(), "Release to set the region.");

        controller.drag_ended();
        assert_eq!(controller.status_text(), "Drag over the image to select a region.");
    }

    #[test]
    fn test_toggle_requires_edited_image() {
        let mut controller = with_original();
        assert_eq!(controller.toggle_selection().unwrap_err(), Rejection::NoEditedImage);
    }

    #[test]
    fn test_whole_submit_drops_selection() {
        let mut controller = with_edit_selecting();
        drag(&mut controller, (10.0, 10.0), (50.0, 50.0));
        controller.set_prompt("brighter".to_string());

        controller.submit_edit().unwrap();
        assert!(!controller.is_selecting());
        assert_eq!(controller.region(), None);
    }

    #[test]
    fn test_failure_returns_to_idle_with_message() {
        let mut controller = with_original();
        controller.set_prompt("anything".to_string());
        let job = controller.submit_edit().unwrap();

        controller.finish_edit(
            job.kind(),
            Err(Arc::new(EditError::service(ServiceError::Status {
                status: 500,
                body: "secret detail".to_string(),
            }))),
        );

        assert!(matches!(controller.operation(), PendingOperation::Failed(_)));
        let message = controller.last_error().unwrap();
        assert!(!message.contains("secret detail"));

        // The next submission is accepted and clears the error
        controller.submit_edit().unwrap();
        assert_eq!(controller.last_error(), None);
    }

    #[test]
    fn test_upload_failure_keeps_previous_image() {
        let mut controller = with_original();
        controller.begin_upload(Slot::Original).unwrap();
        controller.finish_upload(
            Slot::Original,
            Err(Arc::new(EditError::Decode(DecodeError::UnknownFormat))),
        );

        assert!(controller.original().is_some());
        assert!(controller.last_error().is_some());
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_reset() {
        let mut controller = with_edit_selecting();
        controller.reset().unwrap();

        assert!(controller.original().is_none());
        assert!(controller.edited().is_none());
        assert_eq!(*controller.operation(), PendingOperation::Idle);
    }
}
