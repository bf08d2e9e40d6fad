// Preview pipeline: frame conversion, texture parameters, and publishing.

pub mod convert;
pub mod converter;
pub mod error;
pub mod session;
pub mod sink;
pub mod texture;
