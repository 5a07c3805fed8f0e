pub mod coordinator;
pub mod opts;

pub use coordinator::{ImageRegistry, RestoreStats};
pub use opts::{GraphicsOpts, RestoreOpts};
