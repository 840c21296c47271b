pub mod capture;
pub mod devices;
pub mod file_source;
pub mod wav;
