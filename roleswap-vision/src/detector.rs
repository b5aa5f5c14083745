//! Anchor-free grid decoding for the YuNet face detector.
//!
//! The model predicts directly from grid locations at three strides
//! (8, 16, 32) and emits 12 tensors: cls, obj, bbox and kps for each
//! stride, in that order. Decoding maps grid-relative deltas to image
//! coordinates:
//!
//! cx = (grid_x + dx) * stride / input_size
//! cy = (grid_y + dy) * stride / input_size
//! w  = dw * stride / input_size
//! h  = dh * stride / input_size

use crate::error::VisionError;
use crate::face::Detection;

const STRIDES: [usize; 3] = [8, 16, 32];

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Decode the detector's raw output tensors into score-filtered detections
/// with normalized [0,1] coordinates. `outputs` holds (shape, data) pairs in
/// the model's emission order: cls_8..32, obj_8..32, bbox_8..32, kps_8..32.
pub fn decode_outputs(
    outputs: &[(Vec<i64>, Vec<f32>)],
    input_size: usize,
    score_threshold: f32,
) -> Result<Vec<Detection>, VisionError> {
    if outputs.len() < 12 {
        return Err(VisionError::ModelOutput(format!(
            "detector emitted {} tensors, expected 12",
            outputs.len()
        )));
    }

    let mut detections = Vec::new();

    for (scale, &stride) in STRIDES.iter().enumerate() {
        let grid = input_size / stride;
        let locations = grid * grid;

        let cls = plane(&outputs[scale], locations, 1)?;
        let obj = plane(&outputs[scale + 3], locations, 1)?;
        let bbox = plane(&outputs[scale + 6], locations, 4)?;
        let kps = plane(&outputs[scale + 9], locations, 10)?;

        for i in 0..grid {
            for j in 0..grid {
                let idx = i * grid + j;
                let score = sigmoid(cls[idx] * obj[idx]);
                if score < score_threshold {
                    continue;
                }

                let dx = bbox[idx * 4];
                let dy = bbox[idx * 4 + 1];
                let dw = bbox[idx * 4 + 2];
                let dh = bbox[idx * 4 + 3];

                let unit = stride as f32 / input_size as f32;
                let cx = (j as f32 + dx) * unit;
                let cy = (i as f32 + dy) * unit;
                let w = dw * unit;
                let h = dh * unit;

                let mut landmarks = [0.0f32; 10];
                for k in 0..5 {
                    landmarks[k * 2] = (j as f32 + kps[idx * 10 + k * 2]) * unit;
                    landmarks[k * 2 + 1] = (i as f32 + kps[idx * 10 + k * 2 + 1]) * unit;
                }

                detections.push(Detection {
                    bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                    score,
                    landmarks,
                });
            }
        }
    }

    Ok(detections)
}

/// Validate one output tensor as [1, locations, width] and return its data.
fn plane<'a>(
    output: &'a (Vec<i64>, Vec<f32>),
    locations: usize,
    width: usize,
) -> Result<&'a [f32], VisionError> {
    let (shape, data) = output;
    let expected = [1, locations as i64, width as i64];
    if shape.as_slice() != expected.as_slice() {
        return Err(VisionError::ModelOutput(format!(
            "expected tensor shape {expected:?}, got {shape:?}"
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_plane(locations: usize, width: usize) -> (Vec<i64>, Vec<f32>) {
        // All-zero raw scores decode to sigmoid(0) = 0.5, below our test
        // threshold of 0.6.
        (
            vec![1, locations as i64, width as i64],
            vec![0.0; locations * width],
        )
    }

    #[test]
    fn sigmoid_midpoint_and_saturation() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn decode_single_detection_at_stride_32() {
        let input_size = 640;
        let grids = [80usize, 40, 20];

        let mut cls: Vec<_> = grids.iter().map(|g| empty_plane(g * g, 1)).collect();
        let mut obj: Vec<_> = grids.iter().map(|g| empty_plane(g * g, 1)).collect();
        let mut bbox: Vec<_> = grids.iter().map(|g| empty_plane(g * g, 4)).collect();
        let kps: Vec<_> = grids.iter().map(|g| empty_plane(g * g, 10)).collect();

        // One confident face at grid position (10, 10) of the 20x20 scale.
        // The combined score is sigmoid(cls * obj), so both must be set.
        let grid = 20;
        let idx = 10 * grid + 10;
        cls[2].1[idx] = 8.0;
        obj[2].1[idx] = 1.0;

        // Deltas: dx=0.5, dy=0.3, dw=dh=4 stride units (128 px).
        bbox[2].1[idx * 4] = 0.5;
        bbox[2].1[idx * 4 + 1] = 0.3;
        bbox[2].1[idx * 4 + 2] = 4.0;
        bbox[2].1[idx * 4 + 3] = 4.0;

        let outputs: Vec<_> = cls
            .into_iter()
            .chain(obj)
            .chain(bbox)
            .chain(kps)
            .collect();

        let detections = decode_outputs(&outputs, input_size, 0.6).unwrap();
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        // score = sigmoid(8.0 * 1.0)
        assert!((det.score - sigmoid(8.0)).abs() < 1e-5);

        // Center: (10 + 0.5) * 32 / 640 = 0.525, (10 + 0.3) * 32 / 640 = 0.515
        // Size: 4 * 32 / 640 = 0.2 → corner at (0.425, 0.415).
        assert!((det.bbox[0] - 0.425).abs() < 1e-5);
        assert!((det.bbox[1] - 0.415).abs() < 1e-5);
        assert!((det.bbox[2] - 0.2).abs() < 1e-5);
        assert!((det.bbox[3] - 0.2).abs() < 1e-5);

        // Landmark deltas of zero decode to the grid cell itself: 10*32/640.
        assert!((det.landmarks[0] - 0.5).abs() < 1e-5);
        assert!((det.landmarks[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn decode_rejects_truncated_output_list() {
        let outputs = vec![empty_plane(6400, 1); 5];
        assert!(matches!(
            decode_outputs(&outputs, 640, 0.5),
            Err(VisionError::ModelOutput(_))
        ));
    }

    #[test]
    fn decode_rejects_wrong_tensor_shape() {
        let grids = [80usize, 40, 20];
        let mut outputs: Vec<_> = grids
            .iter()
            .map(|g| empty_plane(g * g, 1))
            .chain(grids.iter().map(|g| empty_plane(g * g, 1)))
            .chain(grids.iter().map(|g| empty_plane(g * g, 4)))
            .chain(grids.iter().map(|g| empty_plane(g * g, 10)))
            .collect();
        // Corrupt the stride-8 bbox tensor.
        outputs[6] = empty_plane(100, 4);

        assert!(matches!(
            decode_outputs(&outputs, 640, 0.5),
            Err(VisionError::ModelOutput(_))
        ));
    }
}
