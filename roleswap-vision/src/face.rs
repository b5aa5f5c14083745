use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array2;

use crate::error::VisionError;

/// Raw detector output for one face.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h in source-image pixels
    pub score: f32,
    pub landmarks: [f32; 10], // 5 points: x1,y1,...,x5,y5
}

/// Identity embedding computed from an aligned face crop.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Array2<f32>,
}

/// A detected face together with its identity embedding.
#[derive(Debug, Clone)]
pub struct Face {
    pub bbox: [f32; 4],
    pub score: f32,
    pub landmarks: [f32; 10],
    pub embedding: Embedding,
}

impl Face {
    pub fn from_detection(detection: Detection, embedding: Embedding) -> Self {
        Self {
            bbox: detection.bbox,
            score: detection.score,
            landmarks: detection.landmarks,
            embedding,
        }
    }
}

/// Face detection capability. Implementations return faces ordered by
/// descending detector score; the first entry is the primary face.
pub trait FaceLocator {
    fn locate(&mut self, img: &DynamicImage) -> Result<Vec<Face>, VisionError>;
}

/// Identity-swap capability. `Ok(None)` means the model produced an empty
/// result for this input.
pub trait FaceSwapper {
    fn apply(
        &mut self,
        target: &DynamicImage,
        target_face: &Face,
        source_face: &Face,
    ) -> Result<Option<DynamicImage>, VisionError>;
}

/// Suppress overlapping detections, keeping the highest-scoring box of each
/// cluster. Output is ordered by descending score.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return vec![];
    }

    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; sorted.len()];

    for i in 0..sorted.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(sorted[i].clone());

        for j in (i + 1)..sorted.len() {
            if !suppressed[j] && compute_iou(&sorted[i].bbox, &sorted[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a[2] * a[3];
    let area_b = b[2] * b[3];
    inter / (area_a + area_b - inter)
}

// Reference eye positions for a 112x112 recognition crop (ArcFace standard).
const REF_LEFT_EYE: (f32, f32) = (38.3, 51.7);
const REF_RIGHT_EYE: (f32, f32) = (73.5, 51.5);

/// Align a face to an upright `size`x`size` crop using an eye-based affine
/// transform: rotate by the eye angle, scale to the reference eye distance,
/// translate the eye midpoint onto the reference midpoint. Pixels that map
/// outside the source stay black.
pub fn align_face(img: &DynamicImage, landmarks: &[f32; 10], size: u32) -> DynamicImage {
    let left_eye = (landmarks[0], landmarks[1]);
    let right_eye = (landmarks[2], landmarks[3]);

    let eye_dx = right_eye.0 - left_eye.0;
    let eye_dy = right_eye.1 - left_eye.1;
    let angle = eye_dy.atan2(eye_dx);

    let ref_dist = ((REF_RIGHT_EYE.0 - REF_LEFT_EYE.0).powi(2)
        + (REF_RIGHT_EYE.1 - REF_LEFT_EYE.1).powi(2))
    .sqrt();
    let eye_dist = (eye_dx * eye_dx + eye_dy * eye_dy).sqrt().max(f32::EPSILON);
    let scale = (size as f32 / 112.0) * (ref_dist / eye_dist);

    let eye_center = (
        (left_eye.0 + right_eye.0) / 2.0,
        (left_eye.1 + right_eye.1) / 2.0,
    );
    let ref_center = (
        (REF_LEFT_EYE.0 + REF_RIGHT_EYE.0) / 2.0 * size as f32 / 112.0,
        (REF_LEFT_EYE.1 + REF_RIGHT_EYE.1) / 2.0 * size as f32 / 112.0,
    );

    // Affine matrix [a b; c d] plus translation (tx, ty).
    let (sin, cos) = angle.sin_cos();
    let (a, b) = (scale * cos, scale * sin);
    let (c, d) = (-scale * sin, scale * cos);
    let tx = ref_center.0 - (a * eye_center.0 + b * eye_center.1);
    let ty = ref_center.1 - (c * eye_center.0 + d * eye_center.1);
    let det = a * d - b * c;

    let (img_w, img_h) = img.dimensions();
    let mut out = RgbImage::new(size, size);

    for oy in 0..size {
        for ox in 0..size {
            // Invert the map to find where this output pixel samples from.
            let ux = ox as f32 - tx;
            let uy = oy as f32 - ty;
            let sx = (d * ux - b * uy) / det;
            let sy = (-c * ux + a * uy) / det;

            if sx >= 0.0 && sy >= 0.0 && sx < img_w as f32 && sy < img_h as f32 {
                out.put_pixel(ox, oy, sample_bilinear(img, sx, sy));
            }
        }
    }

    DynamicImage::ImageRgb8(out)
}

fn sample_bilinear(img: &DynamicImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let mut px = [0u8; 3];
    for ch in 0..3 {
        px[ch] = (p00[ch] as f32 * w00
            + p10[ch] as f32 * w10
            + p01[ch] as f32 * w01
            + p11[ch] as f32 * w11) as u8;
    }
    Rgb(px)
}

/// Flatten an RGB image into a CHW float buffer in BGR channel order with
/// values in [0, 255] — the layout the detector and recognizer expect.
pub(crate) fn bgr_chw(img: &RgbImage) -> Vec<f32> {
    let pixel_count = (img.width() * img.height()) as usize;
    let mut data = vec![0f32; 3 * pixel_count];

    let (blue, rest) = data.split_at_mut(pixel_count);
    let (green, red) = rest.split_at_mut(pixel_count);

    for (i, px) in img.pixels().enumerate() {
        red[i] = px[0] as f32;
        green[i] = px[1] as f32;
        blue[i] = px[2] as f32;
    }

    data
}
