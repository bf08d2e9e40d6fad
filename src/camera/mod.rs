// Camera domain: frame sources and native frame handles.

pub mod dummy;
pub mod error;
pub mod source;
pub mod types;
