//! Region selection and quad computation for composite draws.

pub mod parts;
pub mod quads;
