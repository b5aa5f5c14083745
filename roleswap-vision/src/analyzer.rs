use std::path::Path;

use anyhow::Result;
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array2, Array4};
use ort::{session::Session, value::Value};

use crate::error::VisionError;
use crate::face::{self, Detection, Embedding, Face, FaceLocator};
use crate::{detector, model};

/// Square canvas side the detector runs on.
pub const DETECTION_SIZE: u32 = 640;
/// Recognition crop side.
const ALIGN_SIZE: u32 = 112;
const NMS_THRESHOLD: f32 = 0.3;

/// Face analysis engine: one detector session plus one recognizer session,
/// created once and reused for the life of the process.
pub struct OnnxFaceAnalyzer {
    detector: Session,
    recognizer: Session,
    score_threshold: f32,
}

impl OnnxFaceAnalyzer {
    pub fn new(model_dir: &Path, score_threshold: f32) -> Result<Self> {
        Ok(Self {
            detector: model::detector_session(model_dir)?,
            recognizer: model::recognizer_session(model_dir)?,
            score_threshold,
        })
    }

    /// Run the detector over a letterboxed 640x640 canvas and map the
    /// results back into original-image pixel coordinates.
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>, VisionError> {
        let (orig_w, orig_h) = img.dimensions();
        let max_dim = orig_w.max(orig_h).max(1);
        let scale = DETECTION_SIZE as f32 / max_dim as f32;
        let new_w = ((orig_w as f32 * scale) as u32).max(1);
        let new_h = ((orig_h as f32 * scale) as u32).max(1);

        let resized = img.resize_exact(new_w, new_h, FilterType::Triangle);
        let mut canvas = DynamicImage::new_rgb8(DETECTION_SIZE, DETECTION_SIZE);
        let offset_x = (DETECTION_SIZE - new_w) / 2;
        let offset_y = (DETECTION_SIZE - new_h) / 2;
        imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

        let data = face::bgr_chw(&canvas.to_rgb8());
        let input = Array4::from_shape_vec(
            (1, 3, DETECTION_SIZE as usize, DETECTION_SIZE as usize),
            data,
        )?;
        let input_tensor = Value::from_array(input)?;

        let outputs = self.detector.run(ort::inputs![input_tensor])?;

        let mut raw: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
        for (_name, output) in outputs.iter() {
            let (shape, data) = output.try_extract_tensor::<f32>()?;
            raw.push((shape.iter().copied().collect(), data.to_vec()));
        }

        let decoded =
            detector::decode_outputs(&raw, DETECTION_SIZE as usize, self.score_threshold)?;

        // Undo normalization and the letterbox offset.
        let size = DETECTION_SIZE as f32;
        let mapped: Vec<Detection> = decoded
            .into_iter()
            .map(|d| {
                let mut landmarks = [0.0f32; 10];
                for k in 0..5 {
                    landmarks[k * 2] =
                        (d.landmarks[k * 2] * size - offset_x as f32) / scale;
                    landmarks[k * 2 + 1] =
                        (d.landmarks[k * 2 + 1] * size - offset_y as f32) / scale;
                }
                Detection {
                    bbox: [
                        (d.bbox[0] * size - offset_x as f32) / scale,
                        (d.bbox[1] * size - offset_y as f32) / scale,
                        d.bbox[2] * size / scale,
                        d.bbox[3] * size / scale,
                    ],
                    score: d.score,
                    landmarks,
                }
            })
            .collect();

        Ok(face::nms(&mapped, NMS_THRESHOLD))
    }

    /// Compute an L2-normalized identity embedding from an aligned crop.
    fn embed(&mut self, face_img: &DynamicImage) -> Result<Embedding, VisionError> {
        let resized = face_img.resize_exact(ALIGN_SIZE, ALIGN_SIZE, FilterType::Triangle);
        let data = face::bgr_chw(&resized.to_rgb8());
        let input =
            Array4::from_shape_vec((1, 3, ALIGN_SIZE as usize, ALIGN_SIZE as usize), data)?;
        let input_tensor = Value::from_array(input)?;

        let outputs = self.recognizer.run(ort::inputs![input_tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        let dim = if shape.len() == 2 {
            shape[1] as usize
        } else {
            data.len()
        };
        let mut vector: Vec<f32> = data[..dim].to_vec();

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(Embedding {
            vector: Array2::from_shape_vec((1, dim), vector)?,
        })
    }
}

impl FaceLocator for OnnxFaceAnalyzer {
    fn locate(&mut self, img: &DynamicImage) -> Result<Vec<Face>, VisionError> {
        let detections = self.detect(img)?;
        log::debug!(
            "detector returned {} face(s) on {}x{} input",
            detections.len(),
            img.width(),
            img.height()
        );

        let mut faces = Vec::with_capacity(detections.len());
        for detection in detections {
            let aligned = face::align_face(img, &detection.landmarks, ALIGN_SIZE);
            let embedding = self.embed(&aligned)?;
            faces.push(Face::from_detection(detection, embedding));
        }
        Ok(faces)
    }
}
