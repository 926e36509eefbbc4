use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::{Catalog, ImageId, ImageRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSize {
    pub width: f32,
    pub height: f32,
}

impl PlaneSize {
    /// Square used while a texture is pending or after it failed.
    pub const UNIT: PlaneSize = PlaneSize {
        width: 1.0,
        height: 1.0,
    };

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// A record with its resolved transform for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub record: ImageRecord,
    pub position: Vec3,
    pub size: PlaneSize,
}

/// Fit a plane to the native aspect ratio so its longer side is at most `max_dimension`.
///
/// Returns `None` for non-positive or non-finite native dimensions.
pub fn fit_plane(native_w: f32, native_h: f32, max_dimension: f32) -> Option<PlaneSize> {
    if !(native_w.is_finite() && native_h.is_finite()) || native_w <= 0.0 || native_h <= 0.0 {
        return None;
    }
    let aspect = native_w / native_h;
    if !aspect.is_finite() || aspect <= 0.0 {
        return None;
    }
    let size = if aspect >= 1.0 {
        let width = max_dimension.min(aspect);
        PlaneSize {
            width,
            height: width / aspect,
        }
    } else {
        let height = max_dimension.min(1.0 / aspect);
        PlaneSize {
            width: height * aspect,
            height,
        }
    };
    Some(size)
}

/// Largest `(w, h)` with the given aspect that fits inside `region_w x region_h`.
pub fn contain(region_w: f32, region_h: f32, aspect: f32) -> (f32, f32) {
    let rw = region_w.max(0.0);
    let rh = region_h.max(0.0);
    if rh <= 0.0 || rw <= 0.0 {
        return (0.0, 0.0);
    }
    if aspect >= rw / rh {
        (rw, rw / aspect)
    } else {
        (rh * aspect, rh)
    }
}

/// Scatter one position per record uniformly inside a cube of edge `bounding_range`.
///
/// Overlap between planes is accepted; no avoidance pass is run. A non-finite range
/// collapses every plane onto the origin.
pub fn place<R: Rng>(records: &[ImageRecord], bounding_range: f32, rng: &mut R) -> Vec<Vec3> {
    let half = if bounding_range.is_finite() {
        (bounding_range * 0.5).abs()
    } else {
        0.0
    };
    records
        .iter()
        .map(|_| {
            Vec3::new(
                rng.random_range(-half..=half),
                rng.random_range(-half..=half),
                rng.random_range(-half..=half),
            )
        })
        .collect()
}

/// Memoizing front for [`place`]. Positions are computed once per catalog and then reused.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    bounding_range: f32,
    max_dimension: f32,
    seed: u64,
    memo: Option<(Vec<ImageId>, Vec<Vec3>)>,
}

impl LayoutEngine {
    /// `seed: None` draws one seed from the OS; it is then fixed for this engine's lifetime.
    pub fn new(bounding_range: f32, max_dimension: f32, seed: Option<u64>) -> Self {
        Self {
            bounding_range,
            max_dimension,
            seed: seed.unwrap_or_else(rand::random),
            memo: None,
        }
    }

    pub fn bounding_range(&self) -> f32 {
        self.bounding_range
    }

    pub fn max_dimension(&self) -> f32 {
        self.max_dimension
    }

    pub fn placements(&mut self, catalog: &Catalog) -> &[Vec3] {
        let ids = catalog.ids();
        let stale = self.memo.as_ref().is_none_or(|(known, _)| *known != ids);
        if stale {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let positions = place(catalog.records(), self.bounding_range, &mut rng);
            debug!(count = positions.len(), range = self.bounding_range, "placed image planes");
            self.memo = Some((ids, positions));
        }
        self.memo
            .as_ref()
            .map(|(_, positions)| positions.as_slice())
            .unwrap_or_default()
    }

    /// Size for a plane given its resolved native dimensions, or the unit square.
    pub fn size_for(&self, native: Option<(u32, u32)>) -> PlaneSize {
        native
            .and_then(|(w, h)| fit_plane(w as f32, h as f32, self.max_dimension))
            .unwrap_or(PlaneSize::UNIT)
    }
}
