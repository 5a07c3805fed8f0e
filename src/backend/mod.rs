pub mod composite;
pub mod software;
pub mod texture;
