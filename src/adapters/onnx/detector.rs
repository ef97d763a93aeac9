use async_trait::async_trait;
use image::RgbImage;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::adapters::onnx::{
    model_catalog::validate_artifact,
    ssd_engine::{OnnxSsdEngine, SsdOptions},
};
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::RawDetection,
    errors::{DomainError, DomainResult},
};

/// Detector port backed by an ONNX Runtime session.
///
/// A run needs exclusive access to the session, so requests take turns on the
/// mutex from the blocking pool.
#[derive(Clone)]
pub struct OnnxDetector {
    engine: Arc<Mutex<OnnxSsdEngine>>,
}

impl OnnxDetector {
    pub fn load(model_path: &Path, labels_path: &Path, opts: SsdOptions) -> DomainResult<Self> {
        validate_artifact("detector model", model_path)?;
        validate_artifact("label map", labels_path)?;
        let engine = OnnxSsdEngine::load(model_path, labels_path, opts)
            .map_err(|e| DomainError::OperationFailed(format!("{e:#}")))?;
        Ok(Self { engine: Arc::new(Mutex::new(engine)) })
    }
}

#[async_trait]
impl DetectorPort for OnnxDetector {
    async fn detect(&self, image: RgbImage) -> DomainResult<Vec<RawDetection>> {
        let engine = self.engine.clone();
        let detections = tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| DomainError::OperationFailed("detector lock poisoned".into()))?;
            engine.infer(&image).map_err(|e| {
                error!("SSD inference failed: {e:#}");
                DomainError::Inference(format!("{e:#}"))
            })
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("inference task failed: {e}")))??;

        debug!(count = detections.len(), "raw detections");
        Ok(detections)
    }
}
