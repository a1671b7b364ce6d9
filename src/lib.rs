pub mod config;
pub mod flame;
pub mod image;
pub mod math;
pub mod rand;
pub mod render;
pub mod variations;
