pub mod config;
pub mod denoise;
pub mod info;
