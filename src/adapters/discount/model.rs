use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::adapters::discount::knn::DiscountArtifact;
use crate::adapters::onnx::model_catalog::validate_artifact;
use crate::application::ports::DiscountModelPort;
use crate::domain::{
    catalog::{StockSnapshot, CATEGORIES},
    errors::{DomainError, DomainResult},
};

/// Discount regressor loaded once from its JSON artifact.
#[derive(Debug, Clone)]
pub struct KnnDiscountModel {
    artifact: DiscountArtifact,
}

impl KnnDiscountModel {
    pub fn load(path: &Path) -> DomainResult<Self> {
        validate_artifact("discount model", path)?;
        let text = fs::read_to_string(path)
            .map_err(|e| DomainError::OperationFailed(format!("reading {}: {e}", path.display())))?;
        let artifact: DiscountArtifact = serde_json::from_str(&text)
            .map_err(|e| DomainError::InvalidInput(format!("discount model {}: {e}", path.display())))?;
        let model = Self::from_artifact(artifact)?;
        info!(
            model = %path.display(),
            samples = model.artifact.regressor.fit_x.len(),
            k = model.artifact.regressor.n_neighbors,
            "discount model loaded"
        );
        Ok(model)
    }

    /// Rejects artifacts that cannot price every tracked category.
    pub fn from_artifact(artifact: DiscountArtifact) -> DomainResult<Self> {
        artifact
            .validate()
            .map_err(|e| DomainError::InvalidInput(format!("discount model: {e}")))?;
        if let Some(missing) = CATEGORIES
            .iter()
            .find(|c| artifact.label_encoder.transform(c.name).is_none())
        {
            return Err(DomainError::InvalidInput(format!(
                "discount model cannot encode category {}",
                missing.name
            )));
        }
        Ok(Self { artifact })
    }
}

#[async_trait]
impl DiscountModelPort for KnnDiscountModel {
    async fn predict(&self, snapshot: &StockSnapshot) -> DomainResult<HashMap<String, f64>> {
        snapshot
            .stock
            .iter()
            .map(|level| {
                self.artifact
                    .predict(level.category, level.current as f64)
                    .map(|d| (level.category.to_string(), d))
                    .ok_or_else(|| DomainError::UnknownCategory(level.category.to_string()))
            })
            .collect()
    }
}
