pub mod detector;
pub mod model_catalog;
pub mod ssd_engine;
