mod controller;
mod model;

pub use controller::{Gesture, InteractionController, ParseGestureError};
pub use model::{GalleryModel, Selection, Transition};
