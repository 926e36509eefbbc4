use std::str::FromStr;

use glam::Vec2;
use thiserror::Error;
use tracing::trace;

use super::model::{GalleryModel, Selection, Transition};
use crate::catalog::ImageId;
use crate::popup::{PopupLayout, PopupRegion};

/// User input as reported by the rendering side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    ClickPlane(ImageId),
    Next,
    Previous,
    Close,
    Background,
    /// Text typed into the open popup.
    Annotate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized gesture: {0:?}")]
pub struct ParseGestureError(String);

impl ParseGestureError {
    pub(crate) fn new(input: &str) -> Self {
        Self(input.trim().to_string())
    }
}

impl FromStr for Gesture {
    type Err = ParseGestureError;

    /// Accepts `select <id>`, `next`, `prev`, `close`, `background` and `note <text>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let rest = rest.trim();
        match verb.to_ascii_lowercase().as_str() {
            "select" | "click" => rest
                .parse::<u64>()
                .map(|id| Gesture::ClickPlane(ImageId(id)))
                .map_err(|_| ParseGestureError::new(s)),
            "next" | "n" => Ok(Gesture::Next),
            "prev" | "previous" | "p" => Ok(Gesture::Previous),
            "close" | "c" => Ok(Gesture::Close),
            "background" | "bg" => Ok(Gesture::Background),
            "note" => Ok(Gesture::Annotate(rest.to_string())),
            _ => Err(ParseGestureError::new(s)),
        }
    }
}

/// The only writer of [`GalleryModel`] selection state.
///
/// Gestures are applied one at a time, in arrival order, and each returns only
/// after the model is fully updated.
#[derive(Debug)]
pub struct InteractionController {
    model: GalleryModel,
}

impl InteractionController {
    pub fn new(model: GalleryModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &GalleryModel {
        &self.model
    }

    pub fn selection(&self) -> Selection {
        self.model.selection()
    }

    pub fn handle(&mut self, gesture: Gesture) -> Option<Transition> {
        trace!(?gesture, "gesture");
        match gesture {
            Gesture::ClickPlane(id) => self.model.select(id),
            Gesture::Next => self.model.next(),
            Gesture::Previous => self.model.previous(),
            Gesture::Close | Gesture::Background => self.model.close(),
            Gesture::Annotate(text) => {
                self.model.annotate(&text);
                None
            }
        }
    }

    /// Apply a batch in order and report the transitions that happened.
    pub fn handle_all<I>(&mut self, gestures: I) -> Vec<Transition>
    where
        I: IntoIterator<Item = Gesture>,
    {
        gestures
            .into_iter()
            .filter_map(|g| self.handle(g))
            .collect()
    }

    /// Resolve a click on the popup overlay. Ignored while browsing.
    pub fn click_popup(&mut self, point: Vec2, layout: &PopupLayout) -> Option<Transition> {
        if !self.model.selection().popup_open() {
            return None;
        }
        let gesture = match layout.hit_test(point) {
            PopupRegion::Next => Gesture::Next,
            PopupRegion::Previous => Gesture::Previous,
            PopupRegion::Close => Gesture::Close,
            PopupRegion::Background => Gesture::Background,
            PopupRegion::Image | PopupRegion::Card => return None,
        };
        self.handle(gesture)
    }
}
