use iced::widget::{button, canvas, column, container, image, row, stack, text, text_input, Column};
use iced::{Alignment, ContentFit, Element, Length, Task, Theme};
use rfd::AsyncFileDialog;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

// Declare the application modules
mod cli;
mod codec;
mod error;
mod export;
mod logging;
mod mask;
mod pipeline;
mod selection;
mod service;
mod state;
mod ui;

use error::EditError;
use pipeline::{EditKind, EditPipeline};
use selection::{ScreenPoint, SurfaceBounds};
use service::GeminiService;
use state::controller::Controller;
use state::data::{Outcome, PendingOperation, Rejection, Slot};
use state::settings::Settings;
use ui::overlay::SelectionOverlay;

/// Image types offered by the upload dialog
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Height of the image cards
const CARD_HEIGHT: f32 = 420.0;

/// Main application state
struct ProductEditor {
    /// Owns images, prompts, selection and the pending operation
    controller: Controller,
    /// Sends jobs to the image service
    pipeline: EditPipeline,
    /// Native size of the edited image (for mapping drags onto it)
    edited_size: Option<(u32, u32)>,
    /// Informational message (e.g. where a download went)
    notice: Option<String>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked an upload button
    PickImage(Slot),
    /// File dialog closed; `None` if it was dismissed
    ImageLoaded(Slot, Option<Outcome>),
    /// User removed the reference photo
    RemoveReference,
    /// Whole-image instruction edited
    PromptChanged(String),
    /// Region instruction edited
    RegionPromptChanged(String),
    /// User clicked "Generate"
    Submit,
    /// User clicked "Apply to region"
    SubmitRegion,
    /// Background edit finished
    EditFinished(EditKind, Outcome),
    /// User switched region selection on/off
    ToggleSelection,
    /// Left button pressed over the edited image
    DragStarted(ScreenPoint, SurfaceBounds),
    /// Pointer moved while dragging
    DragMoved(ScreenPoint, SurfaceBounds),
    /// Left button released
    DragEnded,
    /// User clicked "Download"
    Download,
    /// Save finished; `None` if the dialog was dismissed
    Downloaded(Option<Result<PathBuf, String>>),
    /// User clicked "Start over"
    Reset,
}

impl ProductEditor {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let api_key = Settings::api_key();
        if api_key.is_none() {
            tracing::warn!("⚠️  GEMINI_API_KEY is not set; edits will fail until it is");
        }

        // If this fails, we panic because the app cannot function without an HTTP client
        let service = GeminiService::new(&settings, api_key)
            .expect("Failed to initialize HTTP client. Check TLS configuration.");

        tracing::info!("🎨 Product Editor using {}", service.endpoint());

        (
            ProductEditor {
                controller: Controller::new(),
                pipeline: EditPipeline::new(Arc::new(service)),
                edited_size: None,
                notice: None,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickImage(slot) => {
                if let Err(rejection) = self.controller.begin_upload(slot) {
                    self.controller.show_rejection(rejection);
                    return Task::none();
                }

                self.notice = None;
                Task::perform(pick_and_encode(slot), move |outcome| {
                    Message::ImageLoaded(slot, outcome)
                })
            }
            Message::ImageLoaded(slot, outcome) => {
                match outcome {
                    Some(outcome) => {
                        self.controller.finish_upload(slot, outcome);
                        if slot == Slot::Original && self.controller.edited().is_none() {
                            self.edited_size = None;
                        }
                    }
                    None => self.controller.cancel_upload(),
                }
                Task::none()
            }
            Message::RemoveReference => {
                if let Err(rejection) = self.controller.remove_reference() {
                    self.controller.show_rejection(rejection);
                }
                Task::none()
            }
            Message::PromptChanged(prompt) => {
                self.controller.set_prompt(prompt);
                Task::none()
            }
            Message::RegionPromptChanged(prompt) => {
                self.controller.set_region_prompt(prompt);
                Task::none()
            }
            Message::Submit => self.dispatch(Controller::submit_edit),
            Message::SubmitRegion => self.dispatch(Controller::submit_region_edit),
            Message::EditFinished(kind, outcome) => {
                if let Ok(asset) = &outcome {
                    self.edited_size = mask::image_dimensions(asset).ok();
                }
                self.controller.finish_edit(kind, outcome);
                Task::none()
            }
            Message::ToggleSelection => {
                if let Err(rejection) = self.controller.toggle_selection() {
                    self.controller.show_rejection(rejection);
                }
                Task::none()
            }
            Message::DragStarted(point, bounds) => {
                self.controller.drag_started(point, bounds);
                Task::none()
            }
            Message::DragMoved(point, bounds) => {
                self.controller.drag_moved(point, bounds);
                Task::none()
            }
            Message::DragEnded => {
                self.controller.drag_ended();
                Task::none()
            }
            Message::Download => match self.controller.edited() {
                Some(asset) => Task::perform(pick_and_save(asset.clone()), Message::Downloaded),
                None => {
                    self.controller.show_rejection(Rejection::NoEditedImage);
                    Task::none()
                }
            },
            Message::Downloaded(result) => {
                match result {
                    Some(Ok(path)) => self.notice = Some(format!("Saved to {}", path.display())),
                    Some(Err(e)) => {
                        tracing::error!("❌ Download failed: {}", e);
                        self.notice = Some("Could not save the image.".to_string());
                    }
                    None => {}
                }
                Task::none()
            }
            Message::Reset => {
                match self.controller.reset() {
                    Ok(()) => {
                        self.edited_size = None;
                        self.notice = None;
                    }
                    Err(rejection) => self.controller.show_rejection(rejection),
                }
                Task::none()
            }
        }
    }

    /// Ask the controller for a job and run it in the background
    fn dispatch(
        &mut self,
        submit: fn(&mut Controller) -> Result<pipeline::EditJob, Rejection>,
    ) -> Task<Message> {
        match submit(&mut self.controller) {
            Ok(job) => {
                self.notice = None;
                let kind = job.kind();
                let pipeline = self.pipeline.clone();
                Task::perform(pipeline.run(job), move |result| {
                    Message::EditFinished(kind, result.map_err(Arc::new))
                })
            }
            Err(rejection) => {
                self.controller.show_rejection(rejection);
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let busy = self.controller.is_busy();

        let content = column![
            text("Product Editor").size(32),
            row![self.source_panel(busy), self.result_panel(busy)].spacing(24),
            self.status_bar(),
        ]
        .spacing(20)
        .padding(24);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Left column: uploads and the whole-image instruction
    fn source_panel(&self, busy: bool) -> Element<Message> {
        let original: Element<Message> = match self.controller.original() {
            Some(asset) => image(asset.display.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fixed(CARD_HEIGHT * 0.6))
                .into(),
            None => placeholder("No product image yet", CARD_HEIGHT * 0.6),
        };

        let reference: Element<Message> = match self.controller.reference() {
            Some(asset) => row![
                image(asset.display.clone())
                    .content_fit(ContentFit::Contain)
                    .width(Length::Fixed(96.0))
                    .height(Length::Fixed(96.0)),
                button("Remove").on_press_maybe((!busy).then_some(Message::RemoveReference)),
            ]
            .spacing(10)
            .align_y(Alignment::Center)
            .into(),
            None => text("No reference image").size(14).into(),
        };

        let submit = (!busy && self.controller.can_submit()).then_some(Message::Submit);

        column![
            row![
                button("Upload product image")
                    .on_press_maybe((!busy).then_some(Message::PickImage(Slot::Original))),
                button("Upload reference")
                    .on_press_maybe((!busy).then_some(Message::PickImage(Slot::Reference))),
            ]
            .spacing(10),
            original,
            reference,
            text_input("Describe the edit, e.g. \"place on a marble counter\"", self.controller.prompt())
                .on_input(Message::PromptChanged)
                .on_submit(Message::Submit)
                .padding(10),
            button("Generate").on_press_maybe(submit).padding(10),
        ]
        .spacing(12)
        .width(Length::FillPortion(1))
        .into()
    }

    /// Right column: the edited image with region tools
    fn result_panel(&self, busy: bool) -> Element<Message> {
        let Some(edited) = self.controller.edited() else {
            return column![placeholder("The edited image will appear here", CARD_HEIGHT)]
                .width(Length::FillPortion(1))
                .into();
        };

        let selecting = self.controller.is_selecting();
        let overlay = SelectionOverlay {
            region: self.controller.region(),
            image_size: self.edited_size,
            enabled: selecting && !busy,
        };

        let card = stack![
            image(edited.display.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fixed(CARD_HEIGHT)),
            canvas(overlay)
                .width(Length::Fill)
                .height(Length::Fixed(CARD_HEIGHT)),
        ];

        let toggle_label = if selecting { "Cancel selection" } else { "Select region" };
        let mut panel: Column<Message> = column![
            card,
            row![
                button(toggle_label).on_press_maybe((!busy).then_some(Message::ToggleSelection)),
                button("Download").on_press_maybe((!busy).then_some(Message::Download)),
                button("Start over").on_press_maybe((!busy).then_some(Message::Reset)),
            ]
            .spacing(10),
        ]
        .spacing(12)
        .width(Length::FillPortion(1));

        if selecting {
            let apply = self.controller.can_submit_region().then_some(Message::SubmitRegion);
            panel = panel.push(
                text_input("What should change inside the region?", self.controller.region_prompt())
                    .on_input(Message::RegionPromptChanged)
                    .on_submit(Message::SubmitRegion)
                    .padding(10),
            );
            panel = panel.push(button("Apply to region").on_press_maybe(apply).padding(10));
        }

        panel.into()
    }

    fn status_bar(&self) -> Element<Message> {
        let mut bar = column![text(self.controller.status_text()).size(16)].spacing(4);

        // Failures already show in the status line; only rejections need a second one
        let failed = matches!(self.controller.operation(), PendingOperation::Failed(_));
        if let Some(error) = self.controller.last_error().filter(|_| !failed) {
            bar = bar.push(text(error.to_string()).size(14).style(text::danger));
        }
        if let Some(notice) = &self.notice {
            bar = bar.push(text(notice.clone()).size(14));
        }

        bar.into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Empty card with a caption
fn placeholder(caption: &str, height: f32) -> Element<'static, Message> {
    container(text(caption.to_string()).size(16))
        .width(Length::Fill)
        .height(Length::Fixed(height))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(height))
        .style(container::bordered_box)
        .into()
}

fn main() -> ExitCode {
    logging::init();

    let args = cli::Cli::parse();
    if let Some(command) = args.command {
        return cli::run(command);
    }

    let result = iced::application("Product Editor", ProductEditor::update, ProductEditor::view)
        .theme(ProductEditor::theme)
        .window_size(iced::Size::new(1200.0, 800.0))
        .centered()
        .run_with(ProductEditor::new);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ Window failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Show the open dialog and encode the chosen file.
/// Runs in the background so the UI stays responsive.
async fn pick_and_encode(slot: Slot) -> Option<Outcome> {
    let file = AsyncFileDialog::new()
        .set_title(format!("Select {}", slot.label()))
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file()
        .await?;

    Some(
        codec::encode_file(file.path())
            .await
            .map_err(|e| Arc::new(EditError::Decode(e))),
    )
}

/// Show the save dialog and write the edited image as PNG
async fn pick_and_save(asset: codec::ImageAsset) -> Option<Result<PathBuf, String>> {
    let file = AsyncFileDialog::new()
        .set_title("Save edited image")
        .set_directory(export::default_directory())
        .set_file_name(export::timestamped_file_name(chrono::Utc::now()))
        .add_filter("PNG image", &["png"])
        .save_file()
        .await?;

    Some(
        export::save_png_async(asset, file.path().to_path_buf())
            .await
            .map_err(|e| e.to_string()),
    )
}
