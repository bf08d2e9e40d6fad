pub mod camera;
pub mod device;
pub mod diagnostics;
pub mod preview;
pub mod settings;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use camera::dummy::DummyFrameSource;
use camera::source::{FrameSource, NullFrameSource};
use device::probe::{DisplayProbe, SimulatedDisplay};
use device::watcher::OrientationWatcher;
use preview::session::PreviewSession;
use preview::sink::SharedTexture;
use settings::types::PreviewConfig;

/// Interval between diagnostics log lines while running.
const DIAGNOSTICS_INTERVAL: Duration = Duration::from_secs(10);

/// Create the frame source for this run.
///
/// When `DUMMY_CAMERA=1` is set or the config asks for it, a synthetic
/// camera is used instead.
pub fn create_frame_source(config: &PreviewConfig) -> Arc<dyn FrameSource> {
    if config.use_dummy_camera() {
        info!(
            "using dummy camera: {}x{} {} @ {} fps",
            config.dummy_frame.width,
            config.dummy_frame.height,
            config.dummy_frame.format,
            config.dummy_frame.fps
        );
        return Arc::new(DummyFrameSource::new(&config.dummy_frame));
    }
    warn!("no camera backend available, preview will stay empty");
    Arc::new(NullFrameSource)
}

/// Install the `log` sink. `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
    if result.is_err() {
        warn!("logger already initialised");
    }
}

/// Load configuration, then run the preview until Ctrl-C.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = settings::config::config_path();
    let config = settings::config::load(&path)?;
    init_logging(&config.log_level);
    info!("configuration loaded from {}", path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: PreviewConfig) -> Result<(), Box<dyn std::error::Error>> {
    let display = Arc::new(SimulatedDisplay::new(config.screen, config.orientation));
    let source = create_frame_source(&config);

    let mut watcher = OrientationWatcher::new(
        Arc::clone(&display) as Arc<dyn DisplayProbe>,
        config.check_delay(),
    );
    let changes = watcher.subscribe_channel();
    watcher.start();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<()>();
    source.watch_frames(Box::new(move || {
        let _ = frame_tx.send(());
    }))?;

    let sink = SharedTexture::new();
    let mut session = PreviewSession::new(
        Arc::clone(&source),
        display as Arc<dyn DisplayProbe>,
        Box::new(sink.clone()),
    )
    .with_changes(changes);

    let mut diagnostics = tokio::time::interval(DIAGNOSTICS_INTERVAL);
    diagnostics.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut frames_open = true;

    info!("preview running, press Ctrl-C to stop");
    loop {
        tokio::select! {
            frame = frame_rx.recv(), if frames_open => match frame {
                Some(()) => {
                    let stale = coalesce_notifications(&mut frame_rx);
                    if stale > 0 {
                        debug!("dropped {stale} stale frame notifications");
                    }
                    session.on_frame_available();
                }
                None => frames_open = false,
            },
            _ = diagnostics.tick() => {
                log_diagnostics(&session, &sink);
            }
            _ = &mut shutdown => {
                info!("received Ctrl-C, shutting down");
                break;
            }
        }
    }

    watcher.stop();
    watcher.join().await;
    log_diagnostics(&session, &sink);
    Ok(())
}

/// Discard notifications queued behind the one being handled; one
/// conversion serves them all. Returns how many were discarded.
fn coalesce_notifications(rx: &mut mpsc::UnboundedReceiver<()>) -> usize {
    let mut stale = 0;
    while rx.try_recv().is_ok() {
        stale += 1;
    }
    stale
}

fn log_diagnostics(session: &PreviewSession, sink: &SharedTexture) {
    match serde_json::to_string(&session.diagnostics()) {
        Ok(json) => info!("diagnostics (published {}): {json}", sink.sequence()),
        Err(e) => warn!("failed to serialise diagnostics: {e}"),
    }
}
