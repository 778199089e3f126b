//! GPU texture cache for stills and the live preview
//!
//! Stills are immutable, so each is decoded and uploaded once per image id.
//! The preview reuses a single texture that is overwritten with each new
//! frame.

use crate::camera::{RgbFrame, StillImage};
use egui::{ColorImage, TextureHandle, TextureOptions};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct TextureCache {
    /// `None` marks a still that failed to decode, so it is not retried
    stills: HashMap<Uuid, Option<TextureHandle>>,
    preview: Option<TextureHandle>,
    preview_frames: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture for a still, uploading it on first use
    pub fn still(&mut self, ctx: &egui::Context, image: &StillImage) -> Option<TextureHandle> {
        self.stills
            .entry(image.id())
            .or_insert_with(|| match image.decode_rgba() {
                Ok(rgba) => {
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let color = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                    debug!("[UI] Uploaded still {} ({}x{})", image.id(), size[0], size[1]);
                    Some(ctx.load_texture(
                        format!("still-{}", image.id()),
                        color,
                        TextureOptions::LINEAR,
                    ))
                }
                Err(e) => {
                    warn!("[UI] Could not decode still {}: {}", image.id(), e);
                    None
                }
            })
            .clone()
    }

    /// Preview texture, refreshed when `frame_count` moved since the last call
    pub fn preview(
        &mut self,
        ctx: &egui::Context,
        frame: &RgbFrame,
        frame_count: u64,
    ) -> TextureHandle {
        let size = [frame.width as usize, frame.height as usize];
        match &mut self.preview {
            Some(handle) => {
                if frame_count != self.preview_frames {
                    handle.set(ColorImage::from_rgb(size, &frame.pixels), TextureOptions::LINEAR);
                    self.preview_frames = frame_count;
                }
                handle.clone()
            }
            None => {
                let handle = ctx.load_texture(
                    "camera-preview",
                    ColorImage::from_rgb(size, &frame.pixels),
                    TextureOptions::LINEAR,
                );
                self.preview_frames = frame_count;
                self.preview = Some(handle.clone());
                handle
            }
        }
    }

    /// Free the preview texture
    pub fn clear_preview(&mut self) {
        self.preview = None;
        self.preview_frames = 0;
    }

    /// Drop every still not listed in `keep`
    pub fn retain(&mut self, keep: &[Uuid]) {
        self.stills.retain(|id, _| keep.contains(id));
    }

    /// Number of cached stills
    pub fn len(&self) -> usize {
        self.stills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stills.is_empty()
    }
}
