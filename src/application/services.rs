use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    application::{
        dto::{PredictRequest, PredictResponse},
        ports::{ClockPort, DetectorPort, DiscountModelPort},
    },
    domain::{
        catalog::{self, StockSnapshot},
        detection::{Detection, RawDetection},
        errors::{DomainError, DomainResult},
    },
};

const WARMUP_SIZE: u32 = 320;

/// Standard alphabet that tolerates non-zero trailing bits, like MIME decoders do.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Limits applied when turning raw detector output into priced detections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleaningParams {
    pub max_boxes: usize,
    pub score_threshold: f32,
}

impl Default for CleaningParams {
    fn default() -> Self {
        Self { max_boxes: 10, score_threshold: 0.15 }
    }
}

/// Decodes a base64 payload, ignoring embedded whitespace and line breaks.
pub fn decode_base64(payload: &str) -> DomainResult<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(DomainError::InvalidInput("image payload is empty".into()));
    }
    LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| DomainError::InvalidInput(format!("malformed base64 image: {e}")))
}

pub fn decode_image(bytes: &[u8]) -> DomainResult<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DomainError::InvalidInput(format!("undecodable image: {e}")))
}

/// Keeps the first `max_boxes` raw detections that belong to a tracked category
/// and reach the score threshold.
pub fn clean_detections(raw: Vec<RawDetection>, params: &CleaningParams) -> Vec<Detection> {
    raw.into_iter()
        .take(params.max_boxes)
        .filter(|d| catalog::is_tracked(&d.entity) && d.score >= params.score_threshold)
        .map(Detection::from_raw)
        .collect()
}

/// Detect -> clean -> price.
#[derive(Clone)]
pub struct PredictionService {
    detector: Arc<dyn DetectorPort>,
    discounts: Arc<dyn DiscountModelPort>,
    clock: Arc<dyn ClockPort>,
    params: CleaningParams,
}

impl PredictionService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        discounts: Arc<dyn DiscountModelPort>,
        clock: Arc<dyn ClockPort>,
        params: CleaningParams,
    ) -> Self {
        Self { detector, discounts, clock, params }
    }

    pub async fn predict(&self, request: PredictRequest) -> DomainResult<PredictResponse> {
        let payload = request
            .image
            .ok_or_else(|| DomainError::InvalidInput("missing field `image`".into()))?;
        let bytes = decode_base64(&payload)?;
        let image = decode_image(&bytes)?;
        let (width, height) = image.dimensions();

        let started = Instant::now();
        let raw = self.detector.detect(image).await?;
        let num_raw = raw.len();
        let cleaned = clean_detections(raw, &self.params);
        let detections = self.predict_discounts(cleaned).await?;

        info!(
            width,
            height,
            raw = num_raw,
            kept = detections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prediction served"
        );
        Ok(PredictResponse { detections })
    }

    /// Prices each detection with the discount predicted for its category
    /// at the current synthetic stock level.
    pub async fn predict_discounts(&self, mut cleaned: Vec<Detection>) -> DomainResult<Vec<Detection>> {
        let snapshot = self.stock_snapshot();
        let predictions = self.discounts.predict(&snapshot).await?;
        debug!(?predictions, "discount predictions");

        for detection in cleaned.iter_mut() {
            let discount = predictions
                .get(&detection.class)
                .copied()
                .ok_or_else(|| DomainError::UnknownCategory(detection.class.clone()))?;
            detection.discount = Some(discount);
        }
        Ok(cleaned)
    }

    pub fn stock_snapshot(&self) -> StockSnapshot {
        StockSnapshot::at(self.clock.time_of_day())
    }

    /// Runs one throwaway inference so the first real request does not pay for session setup.
    pub async fn warm_up(&self, image: Option<RgbImage>) -> DomainResult<()> {
        let image = image
            .unwrap_or_else(|| RgbImage::from_pixel(WARMUP_SIZE, WARMUP_SIZE, Rgb([255, 255, 255])));
        let started = Instant::now();
        let raw = self.detector.detect(image).await?;
        info!(
            detections = raw.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detector warmed up"
        );
        Ok(())
    }
}
