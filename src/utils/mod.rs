pub mod media;
pub mod paths;
