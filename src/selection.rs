/// Region selection over a displayed image
///
/// Screen positions are converted into percentages of the displayed
/// surface so a region stays valid whatever size the image is drawn at.
/// The conversion and rectangle math are free functions; `RegionSelector`
/// only tracks the drag state around them.

/// A pointer position in window coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// Where the image is drawn on screen, in window coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A point as a percentage (0-100) of the surface width/height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentPoint {
    pub x: f32,
    pub y: f32,
}

/// A rectangle in percent of image width/height, anchored top-left
///
/// Always satisfies `x + width <= 100` and `y + height <= 100` because both
/// corners are clamped before the extents are computed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRegion {
    /// Zero-area region at a point (the state right after a press)
    pub fn at(point: PercentPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            width: 0.0,
            height: 0.0,
        }
    }

    /// A region with no area can't be used as a mask
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Convert a window position to percent of the surface, clamped to [0, 100]
pub fn to_percent(point: ScreenPoint, bounds: SurfaceBounds) -> PercentPoint {
    PercentPoint {
        x: axis_percent(point.x - bounds.x, bounds.width),
        y: axis_percent(point.y - bounds.y, bounds.height),
    }
}

fn axis_percent(offset: f32, extent: f32) -> f32 {
    // A collapsed surface has no meaningful position
    if extent <= 0.0 || !offset.is_finite() {
        return 0.0;
    }
    (offset / extent * 100.0).clamp(0.0, 100.0)
}

/// Rectangle spanned by two corners, whatever the drag direction
pub fn span(anchor: PercentPoint, current: PercentPoint) -> NormalizedRegion {
    NormalizedRegion {
        x: anchor.x.min(current.x),
        y: anchor.y.min(current.y),
        width: (anchor.x - current.x).abs(),
        height: (anchor.y - current.y).abs(),
    }
}

/// Drag-selection state for the edited image
#[derive(Debug, Clone, Default)]
pub struct RegionSelector {
    /// Selection mode is on (the overlay accepts drags)
    active: bool,
    /// Corner where the current drag started; `None` when not dragging
    anchor: Option<PercentPoint>,
    /// Most recent region (in progress or frozen)
    region: Option<NormalizedRegion>,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn region(&self) -> Option<NormalizedRegion> {
        self.region
    }

    /// Turn selection mode on or off. Turning it off discards the region.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.clear();
        }
    }

    /// Drop the region and any drag in progress
    pub fn clear(&mut self) {
        self.anchor = None;
        self.region = None;
    }

    /// Start a drag. Without selection mode this leaves everything as-is.
    pub fn begin_drag(&mut self, point: ScreenPoint, bounds: SurfaceBounds) -> Option<NormalizedRegion> {
        if !self.active {
            return self.region;
        }

        let anchor = to_percent(point, bounds);
        self.anchor = Some(anchor);
        self.region = Some(NormalizedRegion::at(anchor));
        self.region
    }

    /// Stretch the region to the current pointer position
    pub fn update_drag(&mut self, point: ScreenPoint, bounds: SurfaceBounds) -> Option<NormalizedRegion> {
        if let Some(anchor) = self.anchor {
            self.region = Some(span(anchor, to_percent(point, bounds)));
        }
        self.region
    }

    /// Freeze the region; further moves are ignored until the next press
    pub fn end_drag(&mut self) {
        self.anchor = None;
    }

    /// The region if it can be submitted as a mask
    pub fn usable_region(&self) -> Option<NormalizedRegion> {
        self.region.filter(|region| !region.is_degenerate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SurfaceBounds {
        SurfaceBounds {
            x: 100.0,
            y: 50.0,
            width: 200.0,
            height: 400.0,
        }
    }

    fn active_selector() -> RegionSelector {
        let mut selector = RegionSelector::new();
        selector.set_active(true);
        selector
    }

    #[test]
    fn test_to_percent() {
        let p = to_percent(ScreenPoint { x: 150.0, y: 150.0 }, bounds());
        assert_eq!(p, PercentPoint { x: 25.0, y: 25.0 });
    }

    #[test]
    fn test_to_percent_clamps_outside_surface() {
        let before = to_percent(ScreenPoint { x: 0.0, y: 0.0 }, bounds());
        assert_eq!(before, PercentPoint { x: 0.0, y: 0.0 });

        let after = to_percent(ScreenPoint { x: 1000.0, y: 1000.0 }, bounds());
        assert_eq!(after, PercentPoint { x: 100.0, y: 100.0 });
    }

    #[test]
    fn test_to_percent_zero_sized_surface() {
        let collapsed = SurfaceBounds {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
        let p = to_percent(ScreenPoint { x: 10.0, y: 10.0 }, collapsed);
        assert_eq!(p, PercentPoint { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_drag_all_four_directions() {
        // Anchor at the centre (50%, 50%), drag to each diagonal corner
        let centre = ScreenPoint { x: 200.0, y: 250.0 };
        let corners = [
            (ScreenPoint { x: 250.0, y: 350.0 }, (50.0, 50.0)), // down-right
            (ScreenPoint { x: 150.0, y: 350.0 }, (25.0, 50.0)), // down-left
            (ScreenPoint { x: 250.0, y: 150.0 }, (50.0, 25.0)), // up-right
            (ScreenPoint { x: 150.0, y: 150.0 }, (25.0, 25.0)), // up-left
        ];

        for (corner, (expected_x, expected_y)) in corners {
            let mut selector = active_selector();
            selector.begin_drag(centre, bounds());
            selector.update_drag(corner, bounds());
            selector.end_drag();

            let region = selector.region().unwrap();
            assert!(region.width >= 0.0 && region.height >= 0.0);
            assert_eq!(region.x, expected_x);
            assert_eq!(region.y, expected_y);
            assert_eq!(region.width, 25.0);
            assert_eq!(region.height, 25.0);
        }
    }

    #[test]
    fn test_region_stays_inside_image() {
        let mut selector = active_selector();
        selector.begin_drag(ScreenPoint { x: 280.0, y: 420.0 }, bounds());
        let region = selector
            .update_drag(ScreenPoint { x: 900.0, y: 900.0 }, bounds())
            .unwrap();

        assert!(region.x + region.width <= 100.0);
        assert!(region.y + region.height <= 100.0);
    }

    #[test]
    fn test_begin_drag_inactive_is_noop() {
        let mut selector = RegionSelector::new();
        let region = selector.begin_drag(ScreenPoint { x: 150.0, y: 150.0 }, bounds());

        assert_eq!(region, None);
        assert!(!selector.is_dragging());
    }

    #[test]
    fn test_end_drag_freezes_region() {
        let mut selector = active_selector();
        selector.begin_drag(ScreenPoint { x: 100.0, y: 50.0 }, bounds());
        selector.update_drag(ScreenPoint { x: 200.0, y: 250.0 }, bounds());
        selector.end_drag();

        let frozen = selector.region();
        selector.update_drag(ScreenPoint { x: 300.0, y: 450.0 }, bounds());
        assert_eq!(selector.region(), frozen);
    }

    #[test]
    fn test_click_without_move_is_degenerate() {
        let mut selector = active_selector();
        selector.begin_drag(ScreenPoint { x: 150.0, y: 150.0 }, bounds());
        selector.end_drag();

        assert!(selector.region().unwrap().is_degenerate());
        assert_eq!(selector.usable_region(), None);
    }

    #[test]
    fn test_deactivate_discards_region() {
        let mut selector = active_selector();
        selector.begin_drag(ScreenPoint { x: 100.0, y: 50.0 }, bounds());
        selector.update_drag(ScreenPoint { x: 200.0, y: 250.0 }, bounds());
        selector.end_drag();

        selector.set_active(false);
        assert_eq!(selector.region(), None);
    }
}
