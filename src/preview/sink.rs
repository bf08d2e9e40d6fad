use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::preview::texture::{ConvertedTexture, PreviewLayout, UvMultipliers};

/// Renderer-side receiver of converted frames and display parameters.
pub trait TextureSink: Send {
    /// Publish a freshly converted texture.
    fn upload(&mut self, texture: &ConvertedTexture);

    fn set_uv_multipliers(&mut self, uv: UvMultipliers);

    fn set_layout(&mut self, layout: PreviewLayout);
}

/// Thread-safe handoff of the latest texture to a renderer on another thread.
///
/// Cloning is cheap and every clone sees the same state. Textures are kept
/// behind an `Arc` so readers never copy pixel data.
#[derive(Clone, Default)]
pub struct SharedTexture {
    inner: Arc<SharedState>,
}

#[derive(Default)]
struct SharedState {
    latest: Mutex<Option<Arc<ConvertedTexture>>>,
    uv: Mutex<Option<UvMultipliers>>,
    layout: Mutex<Option<PreviewLayout>>,
    /// Incremented on every upload, so readers can tell when to refresh.
    sequence: AtomicU64,
}

impl SharedTexture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently uploaded texture.
    pub fn latest(&self) -> Option<Arc<ConvertedTexture>> {
        self.inner.latest.lock().clone()
    }

    /// Number of uploads so far.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::Relaxed)
    }

    pub fn uv_multipliers(&self) -> Option<UvMultipliers> {
        *self.inner.uv.lock()
    }

    pub fn layout(&self) -> Option<PreviewLayout> {
        *self.inner.layout.lock()
    }
}

impl TextureSink for SharedTexture {
    fn upload(&mut self, texture: &ConvertedTexture) {
        let mut latest = self.inner.latest.lock();
        match latest.as_mut().and_then(Arc::get_mut) {
            // No reader holds the previous texture: overwrite in place
            Some(slot) if slot.width == texture.width && slot.height == texture.height => {
                slot.data.copy_from_slice(&texture.data);
                slot.timestamp_us = texture.timestamp_us;
            }
            _ => *latest = Some(Arc::new(texture.clone())),
        }
        self.inner.sequence.fetch_add(1, Ordering::Relaxed);
    }

    fn set_uv_multipliers(&mut self, uv: UvMultipliers) {
        *self.inner.uv.lock() = Some(uv);
    }

    fn set_layout(&mut self, layout: PreviewLayout) {
        *self.inner.layout.lock() = Some(layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::{Orientation, Resolution};

    fn texture(fill: u8) -> ConvertedTexture {
        ConvertedTexture {
            width: 2,
            height: 1,
            data: vec![fill; 8],
            timestamp_us: u64::from(fill),
        }
    }

    #[test]
    fn empty_sink_has_nothing() {
        let sink = SharedTexture::new();
        assert!(sink.latest().is_none());
        assert_eq!(sink.sequence(), 0);
        assert!(sink.uv_multipliers().is_none());
        assert!(sink.layout().is_none());
    }

    #[test]
    fn upload_publishes_latest_to_all_clones() {
        let mut sink = SharedTexture::new();
        let reader = sink.clone();

        sink.upload(&texture(1));
        sink.upload(&texture(2));

        assert_eq!(reader.sequence(), 2);
        assert_eq!(reader.latest().unwrap().data, vec![2; 8]);
    }

    #[test]
    fn held_texture_is_not_overwritten() {
        let mut sink = SharedTexture::new();
        sink.upload(&texture(1));
        let held = sink.latest().unwrap();

        sink.upload(&texture(7));
        assert_eq!(held.data, vec![1; 8]);
        assert_eq!(sink.latest().unwrap().data, vec![7; 8]);
    }

    #[test]
    fn size_change_replaces_texture() {
        let mut sink = SharedTexture::new();
        sink.upload(&texture(1));
        sink.upload(&ConvertedTexture::new(3, 3));
        let latest = sink.latest().unwrap();
        assert_eq!((latest.width, latest.height), (3, 3));
        assert_eq!(latest.data.len(), 36);
    }

    #[test]
    fn stores_display_parameters() {
        let mut sink = SharedTexture::new();
        let uv = UvMultipliers::for_texture(Resolution::new(1080, 1920), 640, 480);
        let layout = PreviewLayout::for_orientation(Orientation::Portrait, 640, 480);
        sink.set_uv_multipliers(uv);
        sink.set_layout(layout);
        assert_eq!(sink.uv_multipliers(), Some(uv));
        assert_eq!(sink.layout(), Some(layout));
    }
}
