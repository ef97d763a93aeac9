use anyhow::{bail, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::ArrayView2;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use std::path::Path;

use crate::domain::detection::{BoundingBox, RawDetection};

const UNKNOWN_ENTITY: &str = "unknown";

/// How to feed the graph and where to read its results.
#[derive(Debug, Clone, PartialEq)]
pub struct SsdOptions {
    /// `None` feeds the first graph input positionally.
    pub input_name: Option<String>,
    pub boxes_output: String,
    pub scores_output: String,
    pub labels_output: String,
    /// Square side to resize to before inference; `None` keeps native size.
    pub input_size: Option<u32>,
    pub intra_threads: usize,
}

impl Default for SsdOptions {
    fn default() -> Self {
        Self {
            input_name: None,
            boxes_output: "detection_boxes".into(),
            scores_output: "detection_scores".into(),
            labels_output: "detection_class_labels".into(),
            input_size: None,
            intra_threads: 4,
        }
    }
}

/// SSD MobileNet (Open Images) graph exported to ONNX.
pub struct OnnxSsdEngine {
    session: Session,
    labels: Vec<String>,
    opts: SsdOptions,
}

impl OnnxSsdEngine {
    pub fn load(model_path: &Path, labels_path: &Path, opts: SsdOptions) -> Result<Self> {
        let labels_text = fs::read_to_string(labels_path)
            .with_context(|| format!("reading label map {}", labels_path.display()))?;
        let labels = parse_label_map(&labels_text);
        if labels.is_empty() {
            bail!("label map {} is empty", labels_path.display());
        }

        let session = Session::builder()?
            .with_intra_threads(opts.intra_threads.max(1))?
            .commit_from_file(model_path)
            .with_context(|| format!("loading ONNX model {}", model_path.display()))?;

        tracing::info!(
            model = %model_path.display(),
            classes = labels.len(),
            "SSD detector loaded"
        );
        Ok(Self { session, labels, opts })
    }

    pub fn infer(&mut self, rgb: &RgbImage) -> Result<Vec<RawDetection>> {
        let resized;
        let img = match self.opts.input_size {
            Some(side) if rgb.dimensions() != (side, side) => {
                resized = image::imageops::resize(rgb, side, side, FilterType::Triangle);
                &resized
            }
            _ => rgb,
        };

        let (w, h) = img.dimensions();
        let input_shape = vec![1_i64, h as i64, w as i64, 3];
        let input_tensor = Tensor::from_array((input_shape, to_unit_floats(img)))?;

        let outputs = match self.opts.input_name.as_deref() {
            Some(name) => self.session.run(ort::inputs![name => input_tensor])?,
            None => self.session.run(ort::inputs![input_tensor])?,
        };

        let boxes_name = self.opts.boxes_output.as_str();
        let (_, boxes) = named_output(outputs.get(boxes_name), boxes_name)?
            .try_extract_tensor::<f32>()
            .with_context(|| format!("extracting `{}`", self.opts.boxes_output))?;
        let scores_name = self.opts.scores_output.as_str();
        let (_, scores) = named_output(outputs.get(scores_name), scores_name)?
            .try_extract_tensor::<f32>()
            .with_context(|| format!("extracting `{}`", self.opts.scores_output))?;

        let labels_name = self.opts.labels_output.as_str();
        let label_value = named_output(outputs.get(labels_name), labels_name)?;
        let class_ids: Vec<i64> = if let Ok((_, ids)) = label_value.try_extract_tensor::<i64>() {
            ids.to_vec()
        } else {
            let (_, ids) = label_value
                .try_extract_tensor::<f32>()
                .with_context(|| format!("extracting `{}`", self.opts.labels_output))?;
            ids.iter().map(|&v| v as i64).collect()
        };

        decode_outputs(boxes, scores, &class_ids, &self.labels)
    }
}

/// A misconfigured output name is an error, not a panic inside the engine lock.
fn named_output<T>(value: Option<T>, name: &str) -> Result<T> {
    value.with_context(|| format!("model has no output named `{name}`"))
}

/// One entity per line; line `i` names class label `i`.
pub fn parse_label_map(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    labels
}

/// HWC interleaved RGB scaled to `[0, 1]`.
fn to_unit_floats(img: &RgbImage) -> Vec<f32> {
    img.as_raw().iter().map(|&v| v as f32 / 255.0).collect()
}

/// Zips the flat detector outputs into detections, keeping model order.
/// Leading batch dimensions are tolerated since only the flat data is read.
pub fn decode_outputs(
    boxes: &[f32],
    scores: &[f32],
    class_ids: &[i64],
    labels: &[String],
) -> Result<Vec<RawDetection>> {
    let n = scores.len();
    if boxes.len() != n * 4 {
        bail!("expected {} box coordinates for {n} scores, got {}", n * 4, boxes.len());
    }
    if class_ids.len() != n {
        bail!("expected {n} class labels, got {}", class_ids.len());
    }

    let boxes = ArrayView2::from_shape((n, 4), boxes)?;
    let detections = boxes
        .rows()
        .into_iter()
        .zip(scores.iter().zip(class_ids))
        .map(|(b, (&score, &class_id))| RawDetection {
            bbox: BoundingBox { y_min: b[0], x_min: b[1], y_max: b[2], x_max: b[3] },
            entity: usize::try_from(class_id)
                .ok()
                .and_then(|i| labels.get(i))
                .filter(|l| !l.is_empty())
                .map_or_else(|| UNKNOWN_ENTITY.to_string(), Clone::clone),
            score,
        })
        .collect();
    Ok(detections)
}
