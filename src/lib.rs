pub mod config;
pub mod fetch;
pub mod normalize;
pub mod upload;
