// src/services/face_check.rs
//
// Selfie gate for clock events. Decoding and image statistics are done here;
// locating faces is delegated to a FaceDetector so the model can be swapped.

use crate::{
    config::FaceCheckConfig,
    errors::{AppError, AppResult},
    models::CaptureSource,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ─── Detector seam ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmarks {
    pub left_eye: bool,
    pub right_eye: bool,
    pub nose: bool,
    pub mouth: bool,
}

impl Landmarks {
    pub fn complete(&self) -> bool {
        self.left_eye && self.right_eye && self.nose && self.mouth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub confidence: f32,
    pub bounds: BoundingBox,
    pub landmarks: Landmarks,
}

pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Vec<FaceDetection>;
}

// ─── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FaceCheckFailure {
    NotLiveCapture,
    ImageTooSmall { width: u32, height: u32 },
    NoFace,
    MultipleFaces { count: usize },
    LowConfidence { confidence: f32 },
    MissingLandmarks,
    FaceTooSmall { ratio: f32 },
    TooDark { brightness: f64 },
    TooBright { brightness: f64 },
    TooBlurry { variance: f64 },
}

impl fmt::Display for FaceCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLiveCapture => write!(f, "selfie must come from the camera"),
            Self::ImageTooSmall { width, height } => {
                write!(f, "image is {width}x{height}, below the minimum size")
            }
            Self::NoFace => write!(f, "no face detected"),
            Self::MultipleFaces { count } => write!(f, "{count} faces detected, expected one"),
            Self::LowConfidence { confidence } => {
                write!(f, "face confidence {confidence:.2} is too low")
            }
            Self::MissingLandmarks => write!(f, "eyes, nose or mouth not visible"),
            Self::FaceTooSmall { ratio } => write!(f, "face fills only {:.0}% of the frame", ratio * 100.0),
            Self::TooDark { brightness } => write!(f, "image too dark ({brightness:.0})"),
            Self::TooBright { brightness } => write!(f, "image too bright ({brightness:.0})"),
            Self::TooBlurry { variance } => write!(f, "image too blurry ({variance:.1})"),
        }
    }
}

/// Measurements of an accepted selfie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceCheckReport {
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
    pub face_ratio: f32,
    pub brightness: f64,
    pub sharpness: f64,
}

/// How the face gate of a stored clock event was passed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FaceCheckOutcome {
    Passed(FaceCheckReport),
    /// Captured before detailed checks existed; only a boolean was stored.
    PassedLegacyCheck,
}

impl FaceCheckOutcome {
    /// Interprets a stored `face_detected_*` column. Any stored value, true or
    /// false, means the event went through the legacy gate.
    pub fn from_legacy_flag(flag: Option<bool>) -> Option<Self> {
        flag.map(|_| Self::PassedLegacyCheck)
    }
}

// ─── Checks ───────────────────────────────────────────────────────────────────

/// Accepts raw base64 or a `data:image/...;base64,` URL.
pub fn decode_selfie(selfie_b64: &str) -> AppResult<GrayImage> {
    let payload = match selfie_b64.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => selfie_b64,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Selfie is not valid base64: {e}")))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| AppError::Validation(format!("Selfie is not a readable image: {e}")))?;
    Ok(image.to_luma8())
}

pub fn mean_brightness(image: &GrayImage) -> f64 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / count as f64
}

/// Variance of the 4-neighbour Laplacian over interior pixels.
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| image.get_pixel(x, y).0[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut n = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
            n += 1.0;
        }
    }
    let mean = sum / n;
    sum_sq / n - mean * mean
}

/// Runs every rule in order and stops at the first failure.
pub fn check_selfie(
    selfie_b64: &str,
    source: CaptureSource,
    detector: &dyn FaceDetector,
    cfg: &FaceCheckConfig,
) -> AppResult<FaceCheckReport> {
    let fail = |reason: FaceCheckFailure| Err(AppError::FaceCheckFailed(reason));

    if source != CaptureSource::Camera {
        return fail(FaceCheckFailure::NotLiveCapture);
    }

    let image = decode_selfie(selfie_b64)?;
    let (width, height) = image.dimensions();
    if width < cfg.min_width || height < cfg.min_height {
        return fail(FaceCheckFailure::ImageTooSmall { width, height });
    }

    let faces = detector.detect(&image);
    let face = match faces.as_slice() {
        [] => return fail(FaceCheckFailure::NoFace),
        [face] => *face,
        many => return fail(FaceCheckFailure::MultipleFaces { count: many.len() }),
    };
    if face.confidence < cfg.min_confidence {
        return fail(FaceCheckFailure::LowConfidence {
            confidence: face.confidence,
        });
    }
    if !face.landmarks.complete() {
        return fail(FaceCheckFailure::MissingLandmarks);
    }

    let face_ratio = (face.bounds.width as f32 / width as f32)
        .min(face.bounds.height as f32 / height as f32);
    if face_ratio < cfg.min_face_ratio {
        return fail(FaceCheckFailure::FaceTooSmall { ratio: face_ratio });
    }

    let brightness = mean_brightness(&image);
    if brightness < cfg.min_brightness {
        return fail(FaceCheckFailure::TooDark { brightness });
    }
    if brightness > cfg.max_brightness {
        return fail(FaceCheckFailure::TooBright { brightness });
    }

    let sharpness = laplacian_variance(&image);
    if sharpness < cfg.min_sharpness {
        return fail(FaceCheckFailure::TooBlurry { variance: sharpness });
    }

    debug!(width, height, brightness, sharpness, "Selfie accepted");
    Ok(FaceCheckReport {
        width,
        height,
        confidence: face.confidence,
        face_ratio,
        brightness,
        sharpness,
    })
}
