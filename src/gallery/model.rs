use tracing::debug;

use crate::catalog::{Catalog, ImageId, ImageRecord};

/// Popup state. `Viewing` always carries an index, so an open popup without an
/// active image cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Browsing,
    Viewing(usize),
}

impl Selection {
    pub fn active_index(&self) -> Option<usize> {
        match *self {
            Selection::Browsing => None,
            Selection::Viewing(i) => Some(i),
        }
    }

    pub fn popup_open(&self) -> bool {
        matches!(self, Selection::Viewing(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Selection,
    pub to: Selection,
}

/// Catalog plus the selection over it. Mutated only by `InteractionController`.
#[derive(Debug, Clone)]
pub struct GalleryModel {
    catalog: Catalog,
    selection: Selection,
    /// Free text typed into the open popup; scoped to the image being viewed.
    annotation: String,
}

impl GalleryModel {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            selection: Selection::Browsing,
            annotation: String::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn active(&self) -> Option<&ImageRecord> {
        self.selection
            .active_index()
            .and_then(|i| self.catalog.get(i))
    }

    pub(crate) fn select(&mut self, id: ImageId) -> Option<Transition> {
        if self.selection.popup_open() {
            return None;
        }
        let Some(index) = self.catalog.index_of(id) else {
            debug!(%id, "select ignored: id not in catalog");
            return None;
        };
        self.goto(Selection::Viewing(index))
    }

    pub(crate) fn close(&mut self) -> Option<Transition> {
        self.goto(Selection::Browsing)
    }

    pub(crate) fn next(&mut self) -> Option<Transition> {
        let n = self.catalog.len();
        match self.selection {
            Selection::Viewing(i) if n > 0 => self.goto(Selection::Viewing((i + 1) % n)),
            _ => None,
        }
    }

    pub(crate) fn previous(&mut self) -> Option<Transition> {
        let n = self.catalog.len();
        match self.selection {
            Selection::Viewing(i) if n > 0 => self.goto(Selection::Viewing((i + n - 1) % n)),
            _ => None,
        }
    }

    pub(crate) fn annotate(&mut self, text: &str) -> bool {
        if !self.selection.popup_open() {
            return false;
        }
        self.annotation.push_str(text);
        true
    }

    fn goto(&mut self, to: Selection) -> Option<Transition> {
        // Navigation on a single image lands on itself; the buffer still resets.
        self.annotation.clear();
        let from = self.selection;
        if from == to && !matches!(to, Selection::Viewing(_)) {
            return None;
        }
        self.selection = to;
        debug!(?from, ?to, "selection transition");
        Some(Transition { from, to })
    }
}
