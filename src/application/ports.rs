use async_trait::async_trait;
use chrono::NaiveTime;
use image::RgbImage;
use std::collections::HashMap;

use crate::domain::{catalog::StockSnapshot, detection::RawDetection, errors::DomainResult};

#[async_trait]
pub trait DetectorPort: Send + Sync {
    /// Runs the detector over a decoded image. Detections come back in model order.
    async fn detect(&self, image: RgbImage) -> DomainResult<Vec<RawDetection>>;
}

#[async_trait]
pub trait DiscountModelPort: Send + Sync {
    /// Predicted discount for every category in the snapshot.
    async fn predict(&self, snapshot: &StockSnapshot) -> DomainResult<HashMap<String, f64>>;
}

pub trait ClockPort: Send + Sync {
    fn time_of_day(&self) -> NaiveTime;
}
