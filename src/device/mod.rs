// Device domain: display probing and orientation/resolution change detection.

pub mod probe;
pub mod types;
pub mod watcher;
