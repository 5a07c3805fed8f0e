pub mod graphics;
pub mod handle;

pub use graphics::Graphics;
pub use handle::{DrawImageOptions, Image};
