use serde::{Deserialize, Serialize};

/// Display label attached to every priced detection.
pub const COUPON_LABEL: &str = "15% off";

/// Box corners as fractions of the image height/width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub y_min: f32,
    pub x_min: f32,
    pub y_max: f32,
    pub x_max: f32,
}

/// Detector output before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub entity: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    #[serde(rename = "class")]
    pub class: String,
    #[serde(rename = "cValue")]
    pub coupon: String,
    pub label: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discount: Option<f64>,
}

impl Detection {
    pub fn from_raw(raw: RawDetection) -> Self {
        Self {
            bbox: raw.bbox,
            label: raw.entity.clone(),
            class: raw.entity,
            coupon: COUPON_LABEL.to_string(),
            score: raw.score,
            discount: None,
        }
    }
}
