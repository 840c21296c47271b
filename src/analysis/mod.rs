pub mod aggregate;
pub mod listener;
pub mod sampler;
