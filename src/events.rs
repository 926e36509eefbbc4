use std::path::PathBuf;
use std::str::FromStr;

use glam::Vec2;
use thiserror::Error;

use crate::catalog::ImageId;
use crate::gallery::{Gesture, ParseGestureError};

/// Identifies one texture request. A plane only accepts the outcome of its latest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone)]
pub struct LoadTexture {
    pub request: RequestId,
    pub id: ImageId,
    pub path: PathBuf,
}

/// Decoded texture ready for upload, already in display orientation.
#[derive(Debug, Clone)]
pub struct NativeImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureFailure {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("decode timed out")]
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct TextureOutcome {
    pub request: RequestId,
    pub id: ImageId,
    pub result: Result<NativeImage, TextureFailure>,
}

/// Input delivered to the session task, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Gesture(Gesture),
    /// Pointer click in viewport coordinates while the popup is open.
    PopupClick(Vec2),
    /// Re-request the texture of one plane.
    Retry(ImageId),
    /// Drop a plane; any outstanding texture result for it is discarded.
    Unmount(ImageId),
    Resize(Vec2),
}

impl FromStr for UserInput {
    type Err = ParseGestureError;

    /// Gesture commands plus `click <x> <y>`, `retry <id>`, `unmount <id>` and `resize <w> <h>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let parsed = match words.as_slice() {
            [verb, x, y] if verb.eq_ignore_ascii_case("click") => {
                parse_point(x, y).map(UserInput::PopupClick)
            }
            [verb, w, h] if verb.eq_ignore_ascii_case("resize") => {
                parse_point(w, h).map(UserInput::Resize)
            }
            [verb, id] if verb.eq_ignore_ascii_case("retry") => {
                id.parse().ok().map(|id| UserInput::Retry(ImageId(id)))
            }
            [verb, id] if verb.eq_ignore_ascii_case("unmount") => {
                id.parse().ok().map(|id| UserInput::Unmount(ImageId(id)))
            }
            _ => return s.parse().map(UserInput::Gesture),
        };
        parsed.ok_or_else(|| ParseGestureError::new(s))
    }
}

fn parse_point(x: &str, y: &str) -> Option<Vec2> {
    Some(Vec2::new(x.parse().ok()?, y.parse().ok()?))
}
