//! Body-language scoring from sampled landmark observations.
//!
//! Landmark detection itself (face mesh, pose, hands) is delegated to a
//! [`LandmarkDetector`]; this module turns its per-sample signals into a
//! [`VisualSummary`].

mod sidecar;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VisionConfig;
use crate::error::ExtractionError;
use crate::types::VisualSummary;

pub use sidecar::SidecarDetector;

/// Gesture activity above this no longer improves the body-language score.
pub const GESTURE_PLATEAU: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub eye_contact: bool,
    /// Horizontal head orientation proxy (nose tip vs chin offset)
    pub direction: f64,
}

/// Signals for one sampled frame. Any part may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    #[serde(default)]
    pub frame_index: u64,
    #[serde(default)]
    pub face: Option<FaceObservation>,
    /// Mean hand landmark position in normalized image coordinates
    #[serde(default)]
    pub hand_center: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionThresholds {
    pub gesture: f64,
    pub fidget: f64,
    pub face_direction: f64,
}

impl From<&VisionConfig> for MotionThresholds {
    fn from(config: &VisionConfig) -> Self {
        Self {
            gesture: config.gesture_threshold,
            fidget: config.fidget_threshold,
            face_direction: config.face_direction_threshold,
        }
    }
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self::from(&VisionConfig::default())
    }
}

#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    /// Landmark signals for every `sample_every`-th frame of `video`.
    async fn detect(
        &self,
        video: &Path,
        sample_every: u32,
    ) -> Result<Vec<FrameSample>, ExtractionError>;
}

#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract(&self, video: &Path) -> Result<VisualSummary, ExtractionError>;
}

/// Weighted body-language score in [0, 100].
pub fn overall_body_language_score(
    eye_contact_ratio: f64,
    posture_score: f64,
    gesture_activity: f64,
) -> f64 {
    let eye = eye_contact_ratio.clamp(0.0, 100.0);
    let posture = posture_score.clamp(0.0, 100.0);
    let gesture = gesture_activity.clamp(0.0, 100.0).min(GESTURE_PLATEAU);

    0.4 * eye + 0.3 * posture + 0.3 * gesture
}

/// Posture proxy: starts at 80 and loses 5 points per fidgeting event.
pub fn posture_from_fidgeting(fidgeting_events: u32) -> f64 {
    (80.0 - 5.0 * fidgeting_events as f64).clamp(20.0, 85.0)
}

fn build_summary(
    eye_contact_ratio: f64,
    posture_score: f64,
    gesture_activity: f64,
    fidgeting_count: u32,
    face_direction_changes: u32,
) -> VisualSummary {
    let eye_contact_ratio = eye_contact_ratio.clamp(0.0, 100.0);
    let posture_score = posture_score.clamp(0.0, 100.0);
    let gesture_activity = gesture_activity.clamp(0.0, 100.0);

    VisualSummary {
        eye_contact_ratio,
        posture_score,
        gesture_activity,
        fidgeting_count,
        face_direction_changes,
        overall_body_language_score: overall_body_language_score(
            eye_contact_ratio,
            posture_score,
            gesture_activity,
        ),
    }
}

/// Neutral summary used when landmark detection is unavailable.
pub fn neutral_summary() -> VisualSummary {
    build_summary(75.0, 70.0, 60.0, 2, 5)
}

pub fn summarize_samples(samples: &[FrameSample], thresholds: &MotionThresholds) -> VisualSummary {
    let mut face_detected = 0u32;
    let mut eye_contact = 0u32;
    let mut gestures = 0u32;
    let mut fidgets = 0u32;
    let mut face_direction_changes = 0u32;

    let mut previous_direction: Option<f64> = None;
    let mut previous_hand: Option<(f64, f64)> = None;

    for sample in samples {
        if let Some(face) = sample.face {
            face_detected += 1;
            if face.eye_contact {
                eye_contact += 1;
            }
            if let Some(previous) = previous_direction
                && (face.direction - previous).abs() > thresholds.face_direction
            {
                face_direction_changes += 1;
            }
            previous_direction = Some(face.direction);
        }

        if let Some(hand) = sample.hand_center {
            if let Some(previous) = previous_hand {
                let movement = distance(hand, previous);
                if movement > thresholds.gesture {
                    gestures += 1;
                }
                if movement > thresholds.fidget {
                    fidgets += 1;
                }
            }
            previous_hand = Some(hand);
        }
    }

    let eye_contact_ratio = eye_contact as f64 / face_detected.max(1) as f64 * 100.0;
    let gesture_activity = gestures as f64 / samples.len().max(1) as f64 * 100.0;

    debug!(
        samples = samples.len(),
        face_detected, gestures, fidgets, "vision signals aggregated"
    );

    build_summary(
        eye_contact_ratio,
        posture_from_fidgeting(fidgets),
        gesture_activity,
        fidgets,
        face_direction_changes,
    )
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Vision extractor backed by a landmark detector.
pub struct LandmarkVisionExtractor {
    detector: Option<Arc<dyn LandmarkDetector>>,
    sample_every: u32,
    thresholds: MotionThresholds,
}

impl LandmarkVisionExtractor {
    pub fn new(config: &VisionConfig, detector: Option<Arc<dyn LandmarkDetector>>) -> Self {
        Self {
            detector,
            sample_every: config.sample_every_n_frames,
            thresholds: MotionThresholds::from(config),
        }
    }

    /// Build from configuration, spawning the sidecar detector when one is set.
    pub fn from_config(config: &VisionConfig) -> Self {
        let detector = config
            .detector_command
            .clone()
            .map(|command| Arc::new(SidecarDetector::new(command)) as Arc<dyn LandmarkDetector>);
        Self::new(config, detector)
    }
}

#[async_trait]
impl VisionExtractor for LandmarkVisionExtractor {
    async fn extract(&self, video: &Path) -> Result<VisualSummary, ExtractionError> {
        let detector = self
            .detector
            .as_ref()
            .ok_or_else(|| ExtractionError::Unavailable {
                what: "landmark detector".to_string(),
            })?;

        let samples = detector.detect(video, self.sample_every).await?;
        Ok(summarize_samples(&samples, &self.thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(eye_contact: bool, direction: f64) -> Option<FaceObservation> {
        Some(FaceObservation {
            eye_contact,
            direction,
        })
    }

    fn sample(face: Option<FaceObservation>, hand_center: Option<(f64, f64)>) -> FrameSample {
        FrameSample {
            frame_index: 0,
            face,
            hand_center,
        }
    }

    #[test]
    fn weighted_score_matches_reference_scenario() {
        let score = overall_body_language_score(72.5, 85.0, 65.0);
        assert!((score - 74.0).abs() < 1e-9);
    }

    #[test]
    fn gesture_activity_plateaus_at_seventy() {
        let at_plateau = overall_body_language_score(50.0, 50.0, 70.0);
        let above = overall_body_language_score(50.0, 50.0, 100.0);
        assert_eq!(at_plateau, above);
    }

    #[test]
    fn overall_score_stays_in_range_for_extreme_inputs() {
        for (eye, posture, gesture) in [
            (0.0, 0.0, 0.0),
            (100.0, 100.0, 100.0),
            (-50.0, 250.0, 1e9),
        ] {
            let score = overall_body_language_score(eye, posture, gesture);
            assert!((0.0..=100.0).contains(&score), "{score}");
        }
    }

    #[test]
    fn posture_is_bounded() {
        assert_eq!(posture_from_fidgeting(0), 80.0);
        assert_eq!(posture_from_fidgeting(3), 65.0);
        assert_eq!(posture_from_fidgeting(40), 20.0);
    }

    #[test]
    fn hand_displacements_split_into_gestures_and_fidgets() {
        let samples = vec![
            sample(face(true, 0.10), Some((0.10, 0.10))),
            // 0.2 move: gesture only
            sample(face(true, 0.12), Some((0.30, 0.10))),
            // 0.4 move: gesture and fidget
            sample(face(false, 0.50), Some((0.70, 0.10))),
            // no hand this frame
            sample(None, None),
            // 0.05 move: neither
            sample(face(true, 0.52), Some((0.70, 0.15))),
        ];

        let summary = summarize_samples(&samples, &MotionThresholds::default());

        assert_eq!(summary.fidgeting_count, 1);
        assert!((summary.gesture_activity - 40.0).abs() < 1e-9);
        assert!((summary.eye_contact_ratio - 75.0).abs() < 1e-9);
        assert_eq!(summary.face_direction_changes, 1);
        assert_eq!(summary.posture_score, 75.0);
    }

    #[test]
    fn no_samples_yields_zero_activity_not_nan() {
        let summary = summarize_samples(&[], &MotionThresholds::default());
        assert_eq!(summary.eye_contact_ratio, 0.0);
        assert_eq!(summary.gesture_activity, 0.0);
        assert!(summary.overall_body_language_score.is_finite());
    }

    #[test]
    fn neutral_summary_is_documented_constant() {
        let summary = neutral_summary();
        assert_eq!(summary.eye_contact_ratio, 75.0);
        assert_eq!(summary.fidgeting_count, 2);
        assert!((summary.overall_body_language_score - 69.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_detector_is_reported_as_unavailable() {
        let extractor = LandmarkVisionExtractor::new(&VisionConfig::default(), None);
        let err = extractor.extract(Path::new("talk.mp4")).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unavailable { .. }));
    }
}
