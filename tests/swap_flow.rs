//! Drives the orchestrator end to end through stub capabilities, covering
//! the error taxonomy, the debug dump side effect and request isolation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use ndarray::Array2;

use roleswap::orchestrator::{Orchestrator, SourcePayload};
use roleswap::{FaceRole, SwapError};
use roleswap_vision::{codec, Embedding, Face, FaceLocator, FaceSwapper, VisionError};

fn face_with_identity(value: f32) -> Face {
    Face {
        bbox: [40.0, 40.0, 120.0, 120.0],
        score: 0.9,
        landmarks: [0.0; 10],
        embedding: Embedding {
            vector: Array2::from_elem((1, 4), value),
        },
    }
}

/// Returns a fixed number of faces regardless of input.
struct CountLocator {
    faces: usize,
}

impl FaceLocator for CountLocator {
    fn locate(&mut self, _img: &DynamicImage) -> Result<Vec<Face>, VisionError> {
        Ok((0..self.faces).map(|_| face_with_identity(0.5)).collect())
    }
}

/// One face on the first call, none afterwards: the source passes detection
/// and the target fails it.
struct VanishingLocator {
    calls: usize,
}

impl FaceLocator for VanishingLocator {
    fn locate(&mut self, _img: &DynamicImage) -> Result<Vec<Face>, VisionError> {
        self.calls += 1;
        if self.calls == 1 {
            Ok(vec![face_with_identity(0.5)])
        } else {
            Ok(vec![])
        }
    }
}

/// Derives the face identity from the image's first pixel, so distinct
/// uploads produce distinct identities.
struct PixelLocator;

impl FaceLocator for PixelLocator {
    fn locate(&mut self, img: &DynamicImage) -> Result<Vec<Face>, VisionError> {
        let px = img.to_rgb8().get_pixel(0, 0).0;
        Ok(vec![face_with_identity(px[0] as f32)])
    }
}

/// Paints the whole target in a shade derived from the source identity,
/// making any cross-request leakage visible in the output.
struct PaintSwapper;

impl FaceSwapper for PaintSwapper {
    fn apply(
        &mut self,
        target: &DynamicImage,
        _target_face: &Face,
        source_face: &Face,
    ) -> Result<Option<DynamicImage>, VisionError> {
        let shade = source_face.embedding.vector[[0, 0]] as u8;
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            target.width(),
            target.height(),
            Rgb([shade; 3]),
        ))))
    }
}

/// Models the black box returning an empty result.
struct EmptySwapper;

impl FaceSwapper for EmptySwapper {
    fn apply(
        &mut self,
        _target: &DynamicImage,
        _target_face: &Face,
        _source_face: &Face,
    ) -> Result<Option<DynamicImage>, VisionError> {
        Ok(None)
    }
}

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("roleswap-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([shade; 3]));
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

fn write_target(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("target.png");
    fs::write(&path, png_bytes(width, height, 200)).unwrap();
    path
}

/// The linear correction the pipeline applies, mirrored for expectations.
fn corrected(value: f32, alpha: f32, beta: f32) -> f32 {
    (alpha * value + beta).clamp(0.0, 255.0)
}

#[test]
fn invalid_source_bytes_fail_with_invalid_input() {
    let dir = test_dir("invalid-bytes");
    let target = write_target(&dir, 100, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, PaintSwapper, dir.clone());
    let err = orch
        .swap(SourcePayload::Bytes(b"definitely not an image"), &target)
        .unwrap_err();
    assert!(matches!(err, SwapError::InvalidInput(_)));
}

#[test]
fn malformed_base64_fails_with_invalid_input() {
    let dir = test_dir("invalid-base64");
    let target = write_target(&dir, 100, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, PaintSwapper, dir.clone());
    let err = orch
        .swap(SourcePayload::Base64("data:image/png;base64,@@@"), &target)
        .unwrap_err();
    assert!(matches!(err, SwapError::InvalidInput(_)));
}

#[test]
fn missing_target_fails_before_detection() {
    let dir = test_dir("missing-target");
    let source = png_bytes(900, 900, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, PaintSwapper, dir.clone());
    let err = orch
        .swap(SourcePayload::Bytes(&source), &dir.join("nope.png"))
        .unwrap_err();
    assert!(matches!(err, SwapError::TargetNotFound(_)));
}

#[test]
fn undetectable_source_fails_and_dumps_debug_image() {
    let dir = test_dir("noface-source");
    let debug_dir = dir.join("debug");
    fs::create_dir_all(&debug_dir).unwrap();
    let target = write_target(&dir, 300, 400);
    let source = png_bytes(900, 900, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 0 }, PaintSwapper, debug_dir.clone());
    let err = orch.swap(SourcePayload::Bytes(&source), &target).unwrap_err();

    match err {
        SwapError::NoFaceDetected { role } => assert_eq!(role, FaceRole::Source),
        other => panic!("expected NoFaceDetected, got {other}"),
    }

    let dumps: Vec<_> = fs::read_dir(&debug_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("noface-") && name.ends_with(".jpg"))
        .collect();
    assert_eq!(dumps.len(), 1, "expected exactly one debug dump: {dumps:?}");
}

#[test]
fn undetectable_target_fails_without_debug_dump() {
    let dir = test_dir("noface-target");
    let debug_dir = dir.join("debug");
    fs::create_dir_all(&debug_dir).unwrap();
    let target = write_target(&dir, 300, 400);
    let source = png_bytes(900, 900, 100);

    let mut orch =
        Orchestrator::new(VanishingLocator { calls: 0 }, PaintSwapper, debug_dir.clone());
    let err = orch.swap(SourcePayload::Bytes(&source), &target).unwrap_err();

    match err {
        SwapError::NoFaceDetected { role } => assert_eq!(role, FaceRole::Target),
        other => panic!("expected NoFaceDetected, got {other}"),
    }
    assert_eq!(fs::read_dir(&debug_dir).unwrap().count(), 0);
}

#[test]
fn empty_swap_output_fails_with_swap_failed() {
    let dir = test_dir("swap-failed");
    let target = write_target(&dir, 300, 400);
    let source = png_bytes(900, 900, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, EmptySwapper, dir.clone());
    let err = orch.swap(SourcePayload::Bytes(&source), &target).unwrap_err();
    assert!(matches!(err, SwapError::SwapFailed));
}

#[test]
fn successful_swap_returns_target_sized_image() {
    let dir = test_dir("success");
    let target = write_target(&dir, 300, 400);
    let source = png_bytes(900, 900, 100);

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, PaintSwapper, dir.clone());
    let encoded = orch.swap(SourcePayload::Bytes(&source), &target).unwrap();

    assert!(!encoded.is_empty());
    let img = codec::decode_base64(&encoded).unwrap();
    assert_eq!((img.width(), img.height()), (300, 400));
}

#[test]
fn data_uri_source_is_accepted() {
    let dir = test_dir("data-uri");
    let target = write_target(&dir, 120, 160);
    let payload = format!(
        "data:image/png;base64,{}",
        codec::to_base64(&png_bytes(900, 900, 100))
    );

    let mut orch = Orchestrator::new(CountLocator { faces: 1 }, PaintSwapper, dir.clone());
    let encoded = orch.swap(SourcePayload::Base64(&payload), &target).unwrap();

    let img = codec::decode_base64(&encoded).unwrap();
    assert_eq!((img.width(), img.height()), (120, 160));
}

#[test]
fn concurrent_swaps_do_not_cross_contaminate() {
    let dir = test_dir("concurrent");
    let target = write_target(&dir, 64, 64);

    let orch = Arc::new(Mutex::new(Orchestrator::new(
        PixelLocator,
        PaintSwapper,
        dir.clone(),
    )));

    let mut handles = Vec::new();
    for shade in [40u8, 160u8] {
        let orch = Arc::clone(&orch);
        let target = target.clone();
        handles.push(thread::spawn(move || {
            let source = png_bytes(900, 900, shade);
            let encoded = orch
                .lock()
                .unwrap()
                .swap(SourcePayload::Bytes(&source), &target)
                .unwrap();
            (shade, encoded)
        }));
    }

    for handle in handles {
        let (shade, encoded) = handle.join().unwrap();
        let img = codec::decode_base64(&encoded).unwrap().to_rgb8();

        // The upload passes through the source correction, the stub swapper
        // paints its identity, then the result correction applies.
        let painted = corrected(shade as f32, 1.1, 10.0).floor();
        let expected = corrected(painted, 1.05, 3.0).floor() as i16;
        let actual = img.get_pixel(32, 32).0[0] as i16;
        assert!(
            (actual - expected).abs() <= 3,
            "shade {shade}: expected ~{expected}, got {actual}"
        );
    }
}
