use glam::{Vec2, Vec3};

use crate::catalog::{ImageId, ImageRecord};
use crate::config::{Configuration, PopupOptions};
use crate::gallery::GalleryModel;
use crate::layout::{LayoutEngine, PlacedImage};
use crate::popup::{PopupLayout, layout_popup};
use crate::texture::{Material, TextureBoard};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSetup {
    pub camera_fov_degrees: f32,
    pub camera_position: Vec3,
    pub ambient_intensity: f32,
    pub directional_position: Vec3,
    pub directional_intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneDraw {
    pub placed: PlacedImage,
    pub material: Material,
}

impl PlaneDraw {
    pub fn id(&self) -> ImageId {
        self.placed.record.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupDraw {
    pub index: usize,
    pub record: ImageRecord,
    pub layout: PopupLayout,
    pub material: Material,
    pub annotation: String,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub setup: SceneSetup,
    pub planes: Vec<PlaneDraw>,
    pub popup: Option<PopupDraw>,
}

impl Frame {
    pub fn plane(&self, id: ImageId) -> Option<&PlaneDraw> {
        self.planes.iter().find(|p| p.id() == id)
    }
}

/// Turns model, layout and texture state into a [`Frame`]. Holds the placement memo
/// for the lifetime of a mount.
#[derive(Debug)]
pub struct SceneComposer {
    layout: LayoutEngine,
    setup: SceneSetup,
    popup: PopupOptions,
    fallback_tint: [u8; 3],
}

impl SceneComposer {
    pub fn new(cfg: &Configuration) -> Self {
        Self {
            layout: LayoutEngine::new(
                cfg.bounding_range,
                cfg.max_plane_dimension,
                cfg.placement_seed,
            ),
            setup: SceneSetup {
                camera_fov_degrees: cfg.camera.fov_degrees,
                camera_position: Vec3::from_array(cfg.camera.position),
                ambient_intensity: cfg.lighting.ambient_intensity,
                directional_position: Vec3::from_array(cfg.lighting.directional_position),
                directional_intensity: cfg.lighting.directional_intensity,
            },
            popup: cfg.popup.clone(),
            fallback_tint: cfg.fallback_tint,
        }
    }

    pub fn popup_layout(&self, viewport: Vec2, aspect: f32) -> PopupLayout {
        layout_popup(viewport, aspect, &self.popup)
    }

    pub fn compose(&mut self, model: &GalleryModel, textures: &TextureBoard, viewport: Vec2) -> Frame {
        let catalog = model.catalog();
        let tint = self.fallback_tint;
        let positions = self.layout.placements(catalog).to_vec();

        let planes = catalog
            .iter()
            .zip(positions)
            .map(|(record, position)| PlaneDraw {
                placed: PlacedImage {
                    record: record.clone(),
                    position,
                    size: self.layout.size_for(textures.native_size(record.id)),
                },
                material: textures.material(record.id, tint),
            })
            .collect();

        let popup = model
            .selection()
            .active_index()
            .and_then(|index| catalog.get(index).map(|record| (index, record)))
            .map(|(index, record)| {
                let aspect = textures
                    .native_size(record.id)
                    .map(|(w, h)| w as f32 / h as f32)
                    .unwrap_or(1.0);
                PopupDraw {
                    index,
                    record: record.clone(),
                    layout: self.popup_layout(viewport, aspect),
                    material: textures.material(record.id, tint),
                    annotation: model.annotation().to_string(),
                }
            });

        Frame {
            setup: self.setup.clone(),
            planes,
            popup,
        }
    }
}
