use std::path::Path;

use anyhow::Result;
use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::error::VisionError;
use crate::face::{Face, FaceSwapper};
use crate::model;

/// Side of the swap model's square input.
pub const SWAP_INPUT_SIZE: u32 = 128;
/// The crop around the target face includes some context beyond the bbox.
const CROP_MARGIN: f32 = 1.25;

/// Identity-swap engine backed by an inswapper-style ONNX model taking a
/// `target` face crop and a `source` identity embedding.
pub struct OnnxFaceSwapper {
    session: Session,
}

impl OnnxFaceSwapper {
    pub fn new(model_dir: &Path) -> Result<Self> {
        Ok(Self {
            session: model::swapper_session(model_dir)?,
        })
    }
}

impl FaceSwapper for OnnxFaceSwapper {
    fn apply(
        &mut self,
        target: &DynamicImage,
        target_face: &Face,
        source_face: &Face,
    ) -> Result<Option<DynamicImage>, VisionError> {
        let region = crop_region(target_face.bbox, target.width(), target.height());
        let crop = target.crop_imm(region.x, region.y, region.w, region.h);
        let resized = crop.resize_exact(SWAP_INPUT_SIZE, SWAP_INPUT_SIZE, FilterType::Lanczos3);

        // RGB CHW scaled to [0, 1].
        let rgb = resized.to_rgb8();
        let plane = (SWAP_INPUT_SIZE * SWAP_INPUT_SIZE) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (i, px) in rgb.pixels().enumerate() {
            data[i] = px[0] as f32 / 255.0;
            data[plane + i] = px[1] as f32 / 255.0;
            data[2 * plane + i] = px[2] as f32 / 255.0;
        }

        let target_tensor = Value::from_array(Array4::from_shape_vec(
            (1, 3, SWAP_INPUT_SIZE as usize, SWAP_INPUT_SIZE as usize),
            data,
        )?)?;
        let source_tensor = Value::from_array(source_face.embedding.vector.clone())?;

        let outputs = self
            .session
            .run(ort::inputs!["target" => target_tensor, "source" => source_tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        if data.is_empty() {
            return Ok(None);
        }
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
            return Err(VisionError::ModelOutput(format!(
                "swap output has shape {shape:?}, expected [1, 3, h, w]"
            )));
        }

        let out_h = shape[2] as usize;
        let out_w = shape[3] as usize;
        let out_plane = out_h * out_w;

        let mut swapped = RgbImage::new(out_w as u32, out_h as u32);
        for y in 0..out_h {
            for x in 0..out_w {
                let idx = y * out_w + x;
                let r = (data[idx] * 255.0).round().clamp(0.0, 255.0) as u8;
                let g = (data[out_plane + idx] * 255.0).round().clamp(0.0, 255.0) as u8;
                let b = (data[2 * out_plane + idx] * 255.0).round().clamp(0.0, 255.0) as u8;
                swapped.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
            }
        }

        // Paste the swapped face back over the crop region.
        let restored = imageops::resize(&swapped, region.w, region.h, FilterType::Lanczos3);
        let mut result = target.to_rgb8();
        imageops::overlay(&mut result, &restored, region.x as i64, region.y as i64);

        Ok(Some(DynamicImage::ImageRgb8(result)))
    }
}

struct CropRegion {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Square crop around the face center, expanded by [`CROP_MARGIN`] and
/// clamped to the image bounds.
fn crop_region(bbox: [f32; 4], img_w: u32, img_h: u32) -> CropRegion {
    let side = (bbox[2].max(bbox[3]) * CROP_MARGIN).max(1.0);
    let cx = bbox[0] + bbox[2] / 2.0;
    let cy = bbox[1] + bbox[3] / 2.0;

    let x = (cx - side / 2.0).max(0.0) as u32;
    let y = (cy - side / 2.0).max(0.0) as u32;
    let x = x.min(img_w.saturating_sub(1));
    let y = y.min(img_h.saturating_sub(1));

    let w = (side as u32).clamp(1, img_w - x);
    let h = (side as u32).clamp(1, img_h - y);

    CropRegion { x, y, w, h }
}
