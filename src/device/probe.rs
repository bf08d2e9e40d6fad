use parking_lot::Mutex;

use crate::device::types::{Orientation, OrientationState, Resolution};

/// Platform query for the current screen resolution and device orientation.
///
/// Polled rather than pushed: the platform offers no change notification
/// for either property.
pub trait DisplayProbe: Send + Sync {
    fn resolution(&self) -> Resolution;

    fn orientation(&self) -> Orientation;

    /// Read both properties at once.
    fn sample(&self) -> OrientationState {
        OrientationState {
            resolution: self.resolution(),
            orientation: self.orientation(),
        }
    }
}

/// Display whose state is set programmatically.
///
/// Stands in for the platform on desktop runs and in tests.
pub struct SimulatedDisplay {
    state: Mutex<OrientationState>,
}

impl SimulatedDisplay {
    pub fn new(resolution: Resolution, orientation: Orientation) -> Self {
        Self {
            state: Mutex::new(OrientationState {
                resolution,
                orientation,
            }),
        }
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        self.state.lock().resolution = resolution;
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.state.lock().orientation = orientation;
    }

    /// Rotate the device, swapping the screen axes when it crosses between
    /// portrait and landscape.
    pub fn rotate(&self, orientation: Orientation) {
        let mut state = self.state.lock();
        let screen_is_portrait = state.resolution.height >= state.resolution.width;
        if !orientation.is_ignored() && screen_is_portrait != is_portrait_like(orientation) {
            state.resolution = Resolution::new(state.resolution.height, state.resolution.width);
        }
        state.orientation = orientation;
    }
}

fn is_portrait_like(orientation: Orientation) -> bool {
    matches!(orientation, Orientation::Portrait | Orientation::UpsideDown)
}

impl DisplayProbe for SimulatedDisplay {
    fn resolution(&self) -> Resolution {
        self.state.lock().resolution
    }

    fn orientation(&self) -> Orientation {
        self.state.lock().orientation
    }

    fn sample(&self) -> OrientationState {
        *self.state.lock()
    }
}
