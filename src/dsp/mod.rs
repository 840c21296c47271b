pub mod spectrum;
pub mod windowing;
