use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::camera::source::FrameSource;
use crate::device::probe::DisplayProbe;
use crate::device::types::{DeviceChange, Orientation, Resolution};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::preview::converter::FrameConverter;
use crate::preview::error::ConversionError;
use crate::preview::sink::TextureSink;
use crate::preview::texture::{PreviewLayout, UvMultipliers};

/// Drives the preview: pulls frames from the camera, converts them and
/// publishes the result together with the display parameters.
///
/// All preview state lives here and is mutated from whichever task calls
/// [`PreviewSession::on_frame_available`]. Display changes arrive through a
/// channel and are applied between frames.
pub struct PreviewSession {
    source: Arc<dyn FrameSource>,
    probe: Arc<dyn DisplayProbe>,
    sink: Box<dyn TextureSink>,
    converter: FrameConverter,
    changes: Option<mpsc::UnboundedReceiver<DeviceChange>>,
    screen: Resolution,
    orientation: Orientation,
    /// Texture size the sink last received UV and layout for.
    published_size: Option<(u32, u32)>,
    stats: DiagnosticStats,
}

impl PreviewSession {
    pub fn new(
        source: Arc<dyn FrameSource>,
        probe: Arc<dyn DisplayProbe>,
        sink: Box<dyn TextureSink>,
    ) -> Self {
        let state = probe.sample();
        Self {
            source,
            probe,
            sink,
            converter: FrameConverter::new(),
            changes: None,
            screen: state.resolution,
            orientation: state.orientation,
            published_size: None,
            stats: DiagnosticStats::new(),
        }
    }

    /// Apply display changes from `changes` before each frame.
    pub fn with_changes(mut self, changes: mpsc::UnboundedReceiver<DeviceChange>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Handle a "frame available" notification.
    ///
    /// Returns `true` when a texture was published. A missing image or a
    /// failed conversion skips this frame; the next notification retries.
    pub fn on_frame_available(&mut self) -> bool {
        self.drain_changes();

        let orientation = self.probe.orientation();
        let texture = match self.converter.convert_latest(self.source.as_ref(), orientation) {
            Ok(texture) => texture,
            Err(ConversionError::NoImageAvailable) => {
                debug!("frame notification without an image, skipping");
                self.stats.record_skip();
                return false;
            }
            Err(e) => {
                warn!("{e}, skipping frame");
                self.stats.record_failure();
                return false;
            }
        };

        let (width, height) = (texture.width, texture.height);
        self.sink.upload(texture);
        self.stats.record_converted(texture.byte_len());

        // New size for the sink, even if a failed frame allocated it
        if self.published_size != Some((width, height)) {
            self.stats.record_reallocation();
            info!("camera texture is now {width}x{height}");
            self.published_size = Some((width, height));
            self.publish_uv(width, height);
            self.publish_layout(width, height);
        }
        true
    }

    /// React to a display change reported by the orientation watcher.
    pub fn handle_device_change(&mut self, change: DeviceChange) {
        let size = self.published_size;
        match change {
            DeviceChange::ResolutionChanged(resolution) => {
                self.screen = resolution;
                if let Some((width, height)) = size {
                    self.publish_uv(width, height);
                }
            }
            DeviceChange::OrientationChanged(orientation) => {
                self.orientation = orientation;
                if let Some((width, height)) = size {
                    self.publish_layout(width, height);
                }
            }
        }
    }

    /// Snapshot of conversion statistics.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.snapshot()
    }

    pub fn screen(&self) -> Resolution {
        self.screen
    }

    /// Orientation used for the layout: the last one reported by the
    /// watcher, or the probe's current value while that is still a flat or
    /// unknown state from start-up.
    pub fn orientation(&self) -> Orientation {
        if self.orientation.is_ignored() {
            self.probe.orientation()
        } else {
            self.orientation
        }
    }

    fn drain_changes(&mut self) {
        let Some(rx) = self.changes.as_mut() else {
            return;
        };
        let mut pending = Vec::new();
        while let Ok(change) = rx.try_recv() {
            pending.push(change);
        }
        for change in pending {
            self.handle_device_change(change);
        }
    }

    fn publish_uv(&mut self, width: u32, height: u32) {
        let uv = UvMultipliers::for_texture(self.screen, width, height);
        debug!(
            "uv multipliers for {} screen: landscape {:.3}, portrait {:.3}",
            self.screen, uv.landscape, uv.portrait
        );
        self.sink.set_uv_multipliers(uv);
    }

    fn publish_layout(&mut self, width: u32, height: u32) {
        let orientation = self.orientation();
        let layout = PreviewLayout::for_orientation(orientation, width, height);
        debug!(
            "screen {} orientation {orientation} texture {width}x{height} plane scale y {:.3} rotate {}",
            self.screen, layout.plane_scale_y, layout.needs_rotate
        );
        self.sink.set_layout(layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::source::{FrameCallback, NullFrameSource};
    use crate::camera::types::{CameraFrame, PixelFormat, Plane};
    use crate::device::probe::SimulatedDisplay;
    use crate::preview::sink::SharedTexture;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that hands out queued frames and counts releases.
    #[derive(Default)]
    struct QueuedSource {
        frames: Mutex<VecDeque<CameraFrame>>,
        released: Arc<AtomicUsize>,
    }

    impl QueuedSource {
        fn push(&self, frame: CameraFrame) {
            let released = Arc::clone(&self.released);
            self.frames.lock().push_back(frame.with_release(move || {
                released.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
    }

    impl FrameSource for QueuedSource {
        fn try_latest_frame(&self) -> Option<CameraFrame> {
            self.frames.lock().pop_front()
        }

        fn watch_frames(&self, _callback: FrameCallback) -> crate::camera::error::Result<()> {
            Ok(())
        }
    }

    fn rgba(width: u32, height: u32, fill: u8) -> CameraFrame {
        let len = (width * height * 4) as usize;
        CameraFrame::new(
            width,
            height,
            PixelFormat::Rgba32,
            vec![Plane::new(vec![fill; len], width as usize * 4)],
            0,
        )
    }

    fn setup(orientation: Orientation) -> (Arc<QueuedSource>, Arc<SimulatedDisplay>, SharedTexture, PreviewSession) {
        let source = Arc::new(QueuedSource::default());
        let display = Arc::new(SimulatedDisplay::new(Resolution::new(1080, 1920), orientation));
        let sink = SharedTexture::new();
        let session = PreviewSession::new(
            Arc::clone(&source) as Arc<dyn FrameSource>,
            Arc::clone(&display) as Arc<dyn DisplayProbe>,
            Box::new(sink.clone()),
        );
        (source, display, sink, session)
    }

    #[test]
    fn converts_and_publishes_frames() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(rgba(4, 2, 7));

        assert!(session.on_frame_available());
        let texture = sink.latest().unwrap();
        assert_eq!(texture.data.len(), 32);
        assert_eq!(sink.sequence(), 1);
        assert_eq!(source.released.load(Ordering::SeqCst), 1);
        assert_eq!(session.diagnostics().converted_count, 1);
    }

    #[test]
    fn first_frame_publishes_uv_and_layout() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(rgba(640, 480, 0));
        session.on_frame_available();

        let uv = sink.uv_multipliers().unwrap();
        assert_eq!(uv, UvMultipliers::for_texture(Resolution::new(1080, 1920), 640, 480));
        let layout = sink.layout().unwrap();
        assert!(layout.needs_rotate);
        assert_eq!(session.diagnostics().reallocation_count, 1);
    }

    #[test]
    fn missing_image_is_skipped() {
        let (_source, _display, sink, mut session) = setup(Orientation::Portrait);
        assert!(!session.on_frame_available());
        assert!(sink.latest().is_none());
        assert_eq!(session.diagnostics().skipped_count, 1);
    }

    #[test]
    fn failed_conversion_is_skipped_and_released() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(CameraFrame::new(
            4,
            4,
            PixelFormat::Rgba32,
            vec![Plane::new(vec![0; 4], 16)],
            0,
        ));
        source.push(rgba(1, 1, 3));

        assert!(!session.on_frame_available());
        assert_eq!(session.diagnostics().failed_count, 1);
        assert_eq!(source.released.load(Ordering::SeqCst), 1);

        // The next frame goes through normally
        assert!(session.on_frame_available());
        assert_eq!(sink.latest().unwrap().data, vec![3; 4]);
    }

    #[test]
    fn mirror_follows_current_display_orientation() {
        let (source, display, sink, mut session) = setup(Orientation::LandscapeRight);
        // 1x2 image: top row 10, bottom row 20
        let frame = CameraFrame::new(1, 2, PixelFormat::Gray8, vec![Plane::new(vec![10, 20], 1)], 0);
        source.push(frame);
        session.on_frame_available();
        // Mirrored along Y
        assert_eq!(sink.latest().unwrap().data[0], 20);

        display.set_orientation(Orientation::Portrait);
        source.push(CameraFrame::new(1, 2, PixelFormat::Gray8, vec![Plane::new(vec![10, 20], 1)], 0));
        session.on_frame_available();
        assert_eq!(sink.latest().unwrap().data[0], 10);
    }

    #[test]
    fn failed_frame_does_not_hide_display_parameters() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        // Same size as the next frame, but the plane is far too short
        source.push(CameraFrame::new(
            4,
            4,
            PixelFormat::Rgba32,
            vec![Plane::new(vec![0; 4], 16)],
            0,
        ));
        source.push(rgba(4, 4, 1));

        assert!(!session.on_frame_available());
        assert!(session.on_frame_available());

        assert_eq!(sink.sequence(), 1);
        assert_eq!(
            sink.uv_multipliers(),
            Some(UvMultipliers::for_texture(Resolution::new(1080, 1920), 4, 4))
        );
        assert!(sink.layout().unwrap().needs_rotate);
        assert_eq!(session.diagnostics().reallocation_count, 1);
    }

    #[test]
    fn same_size_frames_publish_parameters_once() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(rgba(4, 4, 1));
        session.on_frame_available();
        sink.clone().set_layout(PreviewLayout {
            plane_scale_y: 0.0,
            needs_rotate: false,
        });

        source.push(rgba(4, 4, 2));
        session.on_frame_available();
        assert_eq!(sink.layout().unwrap().plane_scale_y, 0.0);
        assert_eq!(session.diagnostics().reallocation_count, 1);
    }

    #[test]
    fn flat_start_uses_live_display_orientation_for_layout() {
        let (source, display, sink, mut session) = setup(Orientation::FaceUp);
        display.set_orientation(Orientation::Portrait);
        source.push(rgba(640, 480, 0));
        session.on_frame_available();

        let layout = sink.layout().unwrap();
        assert!(layout.needs_rotate);
        assert!((layout.plane_scale_y - 640.0 / 480.0).abs() < 1e-6);
        assert_eq!(session.orientation(), Orientation::Portrait);
    }

    #[test]
    fn watcher_orientation_wins_once_known() {
        let (source, display, sink, mut session) = setup(Orientation::Portrait);
        session.handle_device_change(DeviceChange::OrientationChanged(Orientation::LandscapeLeft));
        // Lying flat after the rotation keeps the landscape layout
        display.set_orientation(Orientation::FaceUp);
        source.push(rgba(640, 480, 0));
        session.on_frame_available();
        assert!(!sink.layout().unwrap().needs_rotate);
    }

    #[test]
    fn orientation_change_updates_layout() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(rgba(640, 480, 0));
        session.on_frame_available();

        session.handle_device_change(DeviceChange::OrientationChanged(Orientation::LandscapeLeft));
        let layout = sink.layout().unwrap();
        assert!(!layout.needs_rotate);
        assert!((layout.plane_scale_y - 480.0 / 640.0).abs() < 1e-6);
        assert_eq!(session.orientation(), Orientation::LandscapeLeft);
    }

    #[test]
    fn resolution_change_recomputes_uv() {
        let (source, _display, sink, mut session) = setup(Orientation::Portrait);
        source.push(rgba(640, 480, 0));
        session.on_frame_available();

        let rotated = Resolution::new(1920, 1080);
        session.handle_device_change(DeviceChange::ResolutionChanged(rotated));
        assert_eq!(sink.uv_multipliers(), Some(UvMultipliers::for_texture(rotated, 640, 480)));
        assert_eq!(session.screen(), rotated);
    }

    #[test]
    fn changes_before_first_frame_only_update_state() {
        let (_source, _display, sink, mut session) = setup(Orientation::Portrait);
        session.handle_device_change(DeviceChange::OrientationChanged(Orientation::UpsideDown));
        assert!(sink.layout().is_none());
        assert_eq!(session.orientation(), Orientation::UpsideDown);
    }

    #[test]
    fn queued_changes_are_applied_before_the_frame() {
        let (source, _display, sink, session) = setup(Orientation::Portrait);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = session.with_changes(rx);

        tx.send(DeviceChange::OrientationChanged(Orientation::LandscapeLeft)).unwrap();
        source.push(rgba(640, 480, 0));
        session.on_frame_available();

        // The first texture's layout already reflects the queued change
        assert!(!sink.layout().unwrap().needs_rotate);
    }

    #[test]
    fn null_source_never_publishes() {
        let display = Arc::new(SimulatedDisplay::new(Resolution::new(10, 10), Orientation::Portrait));
        let sink = SharedTexture::new();
        let mut session = PreviewSession::new(Arc::new(NullFrameSource), display, Box::new(sink.clone()));
        assert!(!session.on_frame_available());
        assert_eq!(sink.sequence(), 0);
    }
}
