use std::collections::VecDeque;

use anyhow::Result;
use glam::Vec2;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ImageId};
use crate::config::Configuration;
use crate::events::{LoadTexture, TextureOutcome, UserInput};
use crate::gallery::{GalleryModel, InteractionController, Transition};
use crate::popup::PopupLayout;
use crate::scene::{Frame, SceneComposer};
use crate::texture::{Resolution, TextureBoard};

/// All mutable gallery state for one mount, owned by a single task.
#[derive(Debug)]
pub struct Session {
    controller: InteractionController,
    textures: TextureBoard,
    composer: SceneComposer,
    viewport: Vec2,
}

impl Session {
    pub fn new(cfg: &Configuration, catalog: Catalog, viewport: Vec2) -> Self {
        Self {
            controller: InteractionController::new(GalleryModel::new(catalog)),
            textures: TextureBoard::new(),
            composer: SceneComposer::new(cfg),
            viewport,
        }
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn textures(&self) -> &TextureBoard {
        &self.textures
    }

    /// Mount every catalog plane and return the texture requests to issue.
    pub fn mount_all(&mut self) -> Vec<LoadTexture> {
        let catalog = self.controller.model().catalog().clone();
        catalog
            .iter()
            .filter_map(|record| self.textures.mount(record))
            .collect()
    }

    pub fn unmount(&mut self, id: ImageId) -> bool {
        self.textures.unmount(id)
    }

    pub fn retry(&mut self, id: ImageId) -> Option<LoadTexture> {
        let record = self.controller.model().catalog().find(id)?;
        Some(self.textures.remount(record))
    }

    /// Popup layout for the current selection, if the popup is open.
    pub fn popup_layout(&self) -> Option<PopupLayout> {
        let record = self.controller.model().active()?;
        let aspect = self
            .textures
            .native_size(record.id)
            .map(|(w, h)| w as f32 / h as f32)
            .unwrap_or(1.0);
        Some(self.composer.popup_layout(self.viewport, aspect))
    }

    /// Apply one input completely. Returns new texture requests, if any.
    pub fn apply_input(&mut self, input: UserInput) -> Option<LoadTexture> {
        match input {
            UserInput::Gesture(gesture) => {
                log_transition(self.controller.handle(gesture));
                None
            }
            UserInput::PopupClick(point) => {
                if let Some(layout) = self.popup_layout() {
                    log_transition(self.controller.click_popup(point, &layout));
                }
                None
            }
            UserInput::Retry(id) => self.retry(id),
            UserInput::Unmount(id) => {
                if self.unmount(id) {
                    debug!(%id, "plane unmounted");
                }
                None
            }
            UserInput::Resize(viewport) => {
                self.viewport = viewport;
                None
            }
        }
    }

    /// Returns `true` if the outcome changed a live plane.
    pub fn apply_outcome(&mut self, outcome: TextureOutcome) -> bool {
        !matches!(self.textures.resolve(outcome), Resolution::Discarded)
    }

    pub fn frame(&mut self) -> Frame {
        self.composer
            .compose(self.controller.model(), &self.textures, self.viewport)
    }
}

fn log_transition(transition: Option<Transition>) {
    if let Some(Transition { from, to }) = transition {
        info!(?from, ?to, "selection changed");
    }
}

/// Gallery UI loop.
///
/// Inputs are applied one at a time in arrival order; texture outcomes are applied
/// as they arrive. A frame is emitted after each applied event, never mid-update.
/// Ends when the input channel closes or `cancel` fires.
pub async fn run(
    mut session: Session,
    mut input_rx: Receiver<UserInput>,
    mut outcome_rx: Receiver<TextureOutcome>,
    to_loader: Sender<LoadTexture>,
    frames: Sender<Frame>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut pending: VecDeque<LoadTexture> = session.mount_all().into();
    info!(planes = pending.len(), "session mounted");
    if frames.send(session.frame()).await.is_err() {
        return Ok(());
    }

    loop {
        // Queued load requests go ahead of inputs so a gesture stream cannot starve them.
        let changed = select! {
            biased;

            _ = cancel.cancelled() => break,

            permit = to_loader.reserve(), if !pending.is_empty() => {
                match permit {
                    Ok(permit) => {
                        if let Some(req) = pending.pop_front() {
                            permit.send(req);
                        }
                    }
                    Err(_) => {
                        warn!("loader channel closed; textures stay pending");
                        pending.clear();
                    }
                }
                false
            }

            maybe_input = input_rx.recv() => match maybe_input {
                Some(input) => {
                    if let Some(req) = session.apply_input(input) {
                        pending.push_back(req);
                    }
                    true
                }
                None => {
                    debug!("input closed; ending session");
                    break;
                }
            },

            Some(outcome) = outcome_rx.recv() => session.apply_outcome(outcome),
        };

        if changed && frames.send(session.frame()).await.is_err() {
            debug!("frame consumer gone; ending session");
            break;
        }
    }

    info!("session stopped");
    Ok(())
}
