//! Label encoding, standard scaling and k-nearest-neighbours regression,
//! evaluated from parameters exported out of a fitted pipeline.

use serde::Deserialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    /// Sorted class names; a label encodes to its index.
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    fn is_sorted(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&v, (&m, &s))| (v - m) / if s == 0.0 { 1.0 } else { s })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weights {
    #[default]
    Uniform,
    Distance,
}

fn default_p() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnnRegressor {
    pub n_neighbors: usize,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default = "default_p")]
    pub p: f64,
    pub fit_x: Vec<Vec<f64>>,
    pub fit_y: Vec<f64>,
}

impl KnnRegressor {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b).map(|(x, y)| (x - y).abs());
        if self.p == 1.0 {
            diffs.sum()
        } else if self.p == 2.0 {
            diffs.map(|d| d * d).sum::<f64>().sqrt()
        } else {
            diffs.map(|d| d.powf(self.p)).sum::<f64>().powf(1.0 / self.p)
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut neighbours: Vec<(f64, usize)> = self
            .fit_x
            .iter()
            .enumerate()
            .map(|(i, row)| (self.distance(x, row), i))
            .collect();
        // stable: equal distances keep sample order
        neighbours.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        neighbours.truncate(self.n_neighbors);

        match self.weights {
            Weights::Uniform => mean(neighbours.iter().map(|&(_, i)| self.fit_y[i])),
            Weights::Distance => {
                if neighbours.iter().any(|&(d, _)| d == 0.0) {
                    return mean(
                        neighbours
                            .iter()
                            .filter(|&&(d, _)| d == 0.0)
                            .map(|&(_, i)| self.fit_y[i]),
                    );
                }
                let (num, den) = neighbours.iter().fold((0.0, 0.0), |(num, den), &(d, i)| {
                    let w = 1.0 / d;
                    (num + w * self.fit_y[i], den + w)
                });
                num / den
            }
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

/// Everything needed to go from `(category, stock)` to a discount.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountArtifact {
    pub label_encoder: LabelEncoder,
    pub scaler: StandardScaler,
    pub regressor: KnnRegressor,
}

impl DiscountArtifact {
    pub const FEATURES: usize = 2;

    /// Checks shapes and parameters; returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.label_encoder.classes.is_empty() {
            return Err("label encoder has no classes".into());
        }
        if !self.label_encoder.is_sorted() {
            return Err("label encoder classes must be sorted and unique".into());
        }
        if self.scaler.mean.len() != Self::FEATURES || self.scaler.scale.len() != Self::FEATURES {
            return Err(format!("scaler must have {} features", Self::FEATURES));
        }
        let reg = &self.regressor;
        if reg.fit_x.is_empty() {
            return Err("regressor has no fitted samples".into());
        }
        if reg.fit_x.len() != reg.fit_y.len() {
            return Err(format!(
                "regressor has {} samples but {} targets",
                reg.fit_x.len(),
                reg.fit_y.len()
            ));
        }
        if let Some(row) = reg.fit_x.iter().position(|r| r.len() != Self::FEATURES) {
            return Err(format!("sample {row} does not have {} features", Self::FEATURES));
        }
        if reg.n_neighbors == 0 || reg.n_neighbors > reg.fit_x.len() {
            return Err(format!(
                "n_neighbors must be within 1..={}, got {}",
                reg.fit_x.len(),
                reg.n_neighbors
            ));
        }
        if !(reg.p >= 1.0 && reg.p.is_finite()) {
            return Err(format!("minkowski p must be a finite value >= 1, got {}", reg.p));
        }
        Ok(())
    }

    pub fn predict(&self, label: &str, stock: f64) -> Option<f64> {
        let encoded = self.label_encoder.transform(label)? as f64;
        let scaled = self.scaler.transform(&[encoded, stock]);
        Some(self.regressor.predict(&scaled))
    }
}
