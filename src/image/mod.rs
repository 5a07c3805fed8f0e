//! Per-image backing store: texture, pixel cache, base color, and draw history.

pub(crate) mod history;
pub(crate) mod pixels;
pub mod store;
