//! Per-plane texture status and stale-outcome filtering.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::catalog::{ImageId, ImageRecord};
use crate::events::{LoadTexture, NativeImage, RequestId, TextureFailure, TextureOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureStatus {
    Pending,
    Loaded { width: u32, height: u32 },
    /// Terminal for this mount; only a remount issues a new request.
    Failed(TextureFailure),
}

impl TextureStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TextureStatus::Loaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TextureStatus::Failed(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TextureStatus::Pending)
    }

    pub fn native_size(&self) -> Option<(u32, u32)> {
        match *self {
            TextureStatus::Loaded { width, height } => Some((width, height)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Texture still loading.
    Placeholder,
    Texture(PathBuf),
    FallbackTint([u8; 3]),
}

#[derive(Debug)]
pub enum Resolution {
    /// Outcome accepted; the decoded image is handed on for upload.
    Loaded(NativeImage),
    Failed(TextureFailure),
    /// Outcome for an unmounted plane or a superseded request.
    Discarded,
}

#[derive(Debug)]
struct PlaneTexture {
    request: RequestId,
    path: PathBuf,
    status: TextureStatus,
}

#[derive(Debug, Default)]
pub struct TextureBoard {
    planes: HashMap<ImageId, PlaneTexture>,
    next_request: u64,
}

impl TextureBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a plane. Returns `None` if it is already mounted.
    pub fn mount(&mut self, record: &ImageRecord) -> Option<LoadTexture> {
        if self.planes.contains_key(&record.id) {
            return None;
        }
        Some(self.issue(record))
    }

    /// Drop the current status and request a fresh load.
    pub fn remount(&mut self, record: &ImageRecord) -> LoadTexture {
        self.planes.remove(&record.id);
        self.issue(record)
    }

    pub fn unmount(&mut self, id: ImageId) -> bool {
        self.planes.remove(&id).is_some()
    }

    pub fn is_mounted(&self, id: ImageId) -> bool {
        self.planes.contains_key(&id)
    }

    pub fn status(&self, id: ImageId) -> Option<&TextureStatus> {
        self.planes.get(&id).map(|p| &p.status)
    }

    pub fn native_size(&self, id: ImageId) -> Option<(u32, u32)> {
        self.status(id).and_then(TextureStatus::native_size)
    }

    pub fn material(&self, id: ImageId, fallback_tint: [u8; 3]) -> Material {
        match self.planes.get(&id) {
            Some(PlaneTexture {
                status: TextureStatus::Loaded { .. },
                path,
                ..
            }) => Material::Texture(path.clone()),
            Some(PlaneTexture {
                status: TextureStatus::Failed(_),
                ..
            }) => Material::FallbackTint(fallback_tint),
            _ => Material::Placeholder,
        }
    }

    pub fn resolve(&mut self, outcome: TextureOutcome) -> Resolution {
        let TextureOutcome {
            request,
            id,
            result,
        } = outcome;
        let Some(plane) = self.planes.get_mut(&id) else {
            debug!(%id, request = request.0, "discarding outcome for unmounted plane");
            return Resolution::Discarded;
        };
        if plane.request != request || !plane.status.is_pending() {
            debug!(%id, request = request.0, current = plane.request.0, "discarding stale outcome");
            return Resolution::Discarded;
        }

        let result = result.and_then(|image| {
            if image.width == 0 || image.height == 0 {
                Err(TextureFailure::InvalidDimensions {
                    width: image.width,
                    height: image.height,
                })
            } else {
                Ok(image)
            }
        });

        match result {
            Ok(image) => {
                debug!(%id, width = image.width, height = image.height, "texture loaded");
                plane.status = TextureStatus::Loaded {
                    width: image.width,
                    height: image.height,
                };
                Resolution::Loaded(image)
            }
            Err(failure) => {
                warn!(%id, path = %plane.path.display(), %failure, "texture failed; using fallback tint");
                plane.status = TextureStatus::Failed(failure.clone());
                Resolution::Failed(failure)
            }
        }
    }

    fn issue(&mut self, record: &ImageRecord) -> LoadTexture {
        self.next_request += 1;
        let request = RequestId(self.next_request);
        self.planes.insert(
            record.id,
            PlaneTexture {
                request,
                path: record.path.clone(),
                status: TextureStatus::Pending,
            },
        );
        LoadTexture {
            request,
            id: record.id,
            path: record.path.clone(),
        }
    }
}
