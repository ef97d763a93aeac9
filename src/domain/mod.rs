pub mod catalog;
pub mod detection;
pub mod errors;
