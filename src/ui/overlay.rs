use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::selection::{NormalizedRegion, ScreenPoint, SurfaceBounds};
use crate::Message;

/// Region-selection layer stacked on top of the edited image.
///
/// Turns left-button drags into `Drag*` messages and draws the current
/// region. The image underneath uses `ContentFit::Contain`, so the overlay
/// works out where inside its bounds the picture actually sits.
pub struct SelectionOverlay {
    /// Region to draw, in percent of the image
    pub region: Option<NormalizedRegion>,
    /// Native size of the image being drawn underneath
    pub image_size: Option<(u32, u32)>,
    /// Selection mode is on
    pub enabled: bool,
}

impl Program<Message> for SelectionOverlay {
    type State = DragState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let Some(region) = self.region else {
            return vec![frame.into_geometry()];
        };

        // Frame coordinates are relative to the canvas origin
        let fit = fitted_rect(Rectangle::with_size(bounds.size()), self.image_size);
        let top_left = Point::new(
            fit.x + region.x / 100.0 * fit.width,
            fit.y + region.y / 100.0 * fit.height,
        );
        let size = Size::new(
            region.width / 100.0 * fit.width,
            region.height / 100.0 * fit.height,
        );

        frame.fill_rectangle(top_left, size, Color::from_rgba(0.25, 0.55, 1.0, 0.25));
        frame.stroke(
            &Path::rectangle(top_left, size),
            Stroke::default()
                .with_color(Color::from_rgb(0.25, 0.55, 1.0))
                .with_width(2.0),
        );

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        if !self.enabled {
            state.is_dragging = false;
            return (canvas::event::Status::Ignored, None);
        }

        let surface = to_surface(fitted_rect(bounds, self.image_size));

        match event {
            // Mouse button press over the picture - start a new region
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_over(fitted_rect(bounds, self.image_size)) {
                    state.is_dragging = true;
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::DragStarted(to_point(pos), surface)),
                    );
                }
            }

            // Mouse move - stretch the region, even outside the picture
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if state.is_dragging {
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::DragMoved(to_point(position), surface)),
                    );
                }
            }

            // Mouse button release - freeze the region
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.is_dragging {
                    state.is_dragging = false;
                    return (canvas::event::Status::Captured, Some(Message::DragEnded));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.enabled && cursor.is_over(fitted_rect(bounds, self.image_size)) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

/// State for drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub is_dragging: bool,
}

/// Where an image of `image_size` lands inside `bounds` when scaled to fit
/// and centred. Without a known size the whole bounds are used.
pub fn fitted_rect(bounds: Rectangle, image_size: Option<(u32, u32)>) -> Rectangle {
    let Some((width, height)) = image_size.filter(|(w, h)| *w > 0 && *h > 0) else {
        return bounds;
    };

    let scale = (bounds.width / width as f32).min(bounds.height / height as f32);
    let fitted = Size::new(width as f32 * scale, height as f32 * scale);

    Rectangle {
        x: bounds.x + (bounds.width - fitted.width) / 2.0,
        y: bounds.y + (bounds.height - fitted.height) / 2.0,
        width: fitted.width,
        height: fitted.height,
    }
}

fn to_point(point: Point) -> ScreenPoint {
    ScreenPoint {
        x: point.x,
        y: point.y,
    }
}

fn to_surface(rect: Rectangle) -> SurfaceBounds {
    SurfaceBounds {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
    }
}
