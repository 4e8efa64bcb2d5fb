pub mod collector;
pub mod sampler;
pub mod screen;
