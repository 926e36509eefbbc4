//! Detail popup composition and hit testing.
//!
//! The card is a fixed-size box centered in the viewport. Its left part holds the
//! image, inscribed to keep the photo's native aspect; the right column holds the
//! descriptive text with a close button on top and previous/next at the bottom.

use glam::Vec2;

use crate::config::PopupOptions;
use crate::layout::contain;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment so adjacent rects never both claim an edge.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Containment with a small tolerance for rounding at the edges.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        const TOLERANCE: f32 = 1e-3;
        other.x >= self.x - TOLERANCE
            && other.y >= self.y - TOLERANCE
            && other.right() <= self.right() + TOLERANCE
            && other.bottom() <= self.bottom() + TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupRegion {
    Image,
    /// Inside the card but on no control; clicks here do nothing.
    Card,
    Previous,
    Next,
    Close,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupLayout {
    pub viewport: Vec2,
    pub card: Rect,
    /// Area reserved for the image; `image` is inscribed in it.
    pub image_region: Rect,
    pub image: Rect,
    pub side_panel: Rect,
    pub close: Rect,
    pub previous: Rect,
    pub next: Rect,
}

pub fn layout_popup(viewport: Vec2, image_aspect: f32, opts: &PopupOptions) -> PopupLayout {
    let card = Rect::new(
        (viewport.x - opts.card_width) * 0.5,
        (viewport.y - opts.card_height) * 0.5,
        opts.card_width,
        opts.card_height,
    );
    let pad = opts.padding;

    let image_region = Rect::new(
        card.x + pad,
        card.y + pad,
        (opts.card_width - opts.side_panel_width - 2.0 * pad).max(0.0),
        (opts.card_height - 2.0 * pad).max(0.0),
    );

    let side_panel = Rect::new(
        card.right() - opts.side_panel_width,
        card.y,
        opts.side_panel_width,
        opts.card_height,
    );
    let close = Rect::new(
        side_panel.x + pad,
        side_panel.y + pad,
        side_panel.width - 2.0 * pad,
        opts.button_height,
    );
    let nav_w = (side_panel.width - 3.0 * pad) * 0.5;
    let nav_y = side_panel.bottom() - pad - opts.button_height;
    let previous = Rect::new(side_panel.x + pad, nav_y, nav_w, opts.button_height);
    let next = Rect::new(previous.right() + pad, nav_y, nav_w, opts.button_height);

    PopupLayout {
        viewport,
        card,
        image_region,
        image: inscribe(&image_region, image_aspect),
        side_panel,
        close,
        previous,
        next,
    }
}

fn inscribe(region: &Rect, aspect: f32) -> Rect {
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let (w, h) = contain(region.width, region.height, aspect);
    Rect::new(
        region.x + (region.width - w) * 0.5,
        region.y + (region.height - h) * 0.5,
        w,
        h,
    )
}

impl PopupLayout {
    /// Same layout with the image box refit to a new aspect; every other region is kept.
    pub fn with_aspect(&self, image_aspect: f32) -> PopupLayout {
        PopupLayout {
            image: inscribe(&self.image_region, image_aspect),
            ..self.clone()
        }
    }

    pub fn hit_test(&self, p: Vec2) -> PopupRegion {
        if self.close.contains(p) {
            PopupRegion::Close
        } else if self.previous.contains(p) {
            PopupRegion::Previous
        } else if self.next.contains(p) {
            PopupRegion::Next
        } else if self.image.contains(p) {
            PopupRegion::Image
        } else if self.card.contains(p) {
            PopupRegion::Card
        } else {
            PopupRegion::Background
        }
    }

    /// Every clickable control, for renderers that draw hover states.
    pub fn controls(&self) -> [(PopupRegion, Rect); 4] {
        [
            (PopupRegion::Image, self.image),
            (PopupRegion::Close, self.close),
            (PopupRegion::Previous, self.previous),
            (PopupRegion::Next, self.next),
        ]
    }
}
