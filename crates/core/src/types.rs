use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SchemaError;
use crate::events::Stage;
use crate::scoring::CategoryScores;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Body-language summary, one per video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSummary {
    /// Percentage of face-detected samples with eye contact
    pub eye_contact_ratio: f64,
    pub posture_score: f64,
    pub gesture_activity: f64,
    pub fidgeting_count: u32,
    pub face_direction_changes: u32,
    pub overall_body_language_score: f64,
}

/// Vocal-delivery summary, one per video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocalSummary {
    pub transcript: String,
    pub filler_word_count: u32,
    /// Percentage of words that are fillers
    pub filler_word_ratio: f64,
    /// Words per minute
    pub speech_rate: f64,
    pub pause_count: u32,
    /// Seconds
    pub average_pause_duration: f64,
    /// Coefficient of variation of voiced pitch
    pub pitch_variation: f64,
    pub monotony_score: f64,
    pub volume_consistency: f64,
    pub overall_voice_score: f64,
}

/// One fixed-size word window of the topic heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSegment {
    pub segment_id: usize,
    pub start_word: usize,
    /// Exclusive
    pub end_word: usize,
    pub concept_scores: BTreeMap<String, f64>,
    pub dominant_concept: Option<String>,
    pub density_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub completeness_score: f64,
    pub missing_topics: Vec<String>,
    pub key_concepts: Vec<String>,
    /// Concept -> share of filtered tokens, in percent
    pub concept_density: BTreeMap<String, f64>,
    pub topic_flow_score: f64,
    pub interaction_example_count: u32,
    pub structural_score: f64,
    pub overall_content_score: f64,
    pub topic_heatmap: Vec<HeatmapSegment>,
}

/// A stage that fell back to its neutral default, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    pub reason: String,
}

/// Final, read-only output of one analysis request.
///
/// Category and total scores are kept at full precision. Result documents
/// carry them at one decimal, see [`CategoryScores::rounded`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeResult {
    pub vision_analysis: VisualSummary,
    pub audio_analysis: VocalSummary,
    pub content_analysis: ContentSummary,
    pub body_language_score: f64,
    pub voice_score: f64,
    pub content_flow_score: f64,
    pub interaction_score: f64,
    pub total_score: f64,
    /// Seconds
    pub video_duration: f64,
    pub timestamp: DateTime<Utc>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Serialized shape of [`CompositeResult`].
#[derive(Serialize)]
struct ResultDocument<'a> {
    vision_analysis: &'a VisualSummary,
    audio_analysis: &'a VocalSummary,
    content_analysis: &'a ContentSummary,
    body_language_score: f64,
    voice_score: f64,
    content_flow_score: f64,
    interaction_score: f64,
    total_score: f64,
    video_duration: f64,
    timestamp: &'a DateTime<Utc>,
    recommendations: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    degradations: &'a [Degradation],
}

impl Serialize for CompositeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let scores = self.category_scores().rounded();
        ResultDocument {
            vision_analysis: &self.vision_analysis,
            audio_analysis: &self.audio_analysis,
            content_analysis: &self.content_analysis,
            body_language_score: scores.body_language,
            voice_score: scores.voice,
            content_flow_score: scores.content_flow,
            interaction_score: scores.interaction,
            total_score: scores.total,
            video_duration: self.video_duration,
            timestamp: &self.timestamp,
            recommendations: &self.recommendations,
            degradations: &self.degradations,
        }
        .serialize(serializer)
    }
}

pub const MAX_RECOMMENDATIONS: usize = 10;
/// Largest accepted gap between the category sum and the total.
const SUM_TOLERANCE: f64 = 0.1;

impl CompositeResult {
    /// Strict boundary parser for result documents produced elsewhere.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let result: CompositeResult = serde_json::from_str(json)?;
        result.validate()?;
        Ok(result)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn category_scores(&self) -> CategoryScores {
        CategoryScores {
            body_language: self.body_language_score,
            voice: self.voice_score,
            content_flow: self.content_flow_score,
            interaction: self.interaction_score,
            total: self.total_score,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let v = &self.vision_analysis;
        in_range("vision_analysis.eye_contact_ratio", v.eye_contact_ratio, 0.0, 100.0)?;
        in_range("vision_analysis.posture_score", v.posture_score, 0.0, 100.0)?;
        in_range("vision_analysis.gesture_activity", v.gesture_activity, 0.0, 100.0)?;
        in_range(
            "vision_analysis.overall_body_language_score",
            v.overall_body_language_score,
            0.0,
            100.0,
        )?;

        let a = &self.audio_analysis;
        in_range("audio_analysis.filler_word_ratio", a.filler_word_ratio, 0.0, 100.0)?;
        in_range("audio_analysis.speech_rate", a.speech_rate, 0.0, f64::MAX)?;
        in_range(
            "audio_analysis.average_pause_duration",
            a.average_pause_duration,
            0.0,
            f64::MAX,
        )?;
        in_range("audio_analysis.pitch_variation", a.pitch_variation, 0.0, f64::MAX)?;
        in_range("audio_analysis.monotony_score", a.monotony_score, 0.0, 1.0)?;
        in_range("audio_analysis.volume_consistency", a.volume_consistency, 0.0, 1.0)?;
        in_range("audio_analysis.overall_voice_score", a.overall_voice_score, 0.0, 100.0)?;

        let c = &self.content_analysis;
        in_range("content_analysis.completeness_score", c.completeness_score, 0.0, 100.0)?;
        in_range("content_analysis.topic_flow_score", c.topic_flow_score, 0.0, 100.0)?;
        in_range("content_analysis.structural_score", c.structural_score, 0.0, 100.0)?;
        in_range(
            "content_analysis.overall_content_score",
            c.overall_content_score,
            0.0,
            100.0,
        )?;

        in_range("body_language_score", self.body_language_score, 0.0, 25.0)?;
        in_range("voice_score", self.voice_score, 0.0, 25.0)?;
        in_range("content_flow_score", self.content_flow_score, 0.0, 25.0)?;
        in_range("interaction_score", self.interaction_score, 0.0, 25.0)?;
        in_range("total_score", self.total_score, 0.0, 100.0)?;
        in_range("video_duration", self.video_duration, 0.0, f64::MAX)?;

        let sum = self.body_language_score
            + self.voice_score
            + self.content_flow_score
            + self.interaction_score;
        if (sum - self.total_score).abs() > SUM_TOLERANCE + 1e-9 {
            return Err(SchemaError::InconsistentTotal {
                sum,
                total: self.total_score,
            });
        }

        if self.recommendations.len() > MAX_RECOMMENDATIONS {
            return Err(SchemaError::TooMany {
                field: "recommendations",
                len: self.recommendations.len(),
                max: MAX_RECOMMENDATIONS,
            });
        }

        Ok(())
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SchemaError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(SchemaError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio, content, vision};

    fn result_with_categories(category: f64) -> CompositeResult {
        CompositeResult {
            vision_analysis: vision::neutral_summary(),
            audio_analysis: audio::neutral_summary(),
            content_analysis: content::neutral_summary(),
            body_language_score: category,
            voice_score: category,
            content_flow_score: category,
            interaction_score: category,
            total_score: category * 4.0,
            video_duration: 600.0,
            timestamp: Utc::now(),
            recommendations: Vec::new(),
            degradations: Vec::new(),
        }
    }

    #[test]
    fn serialized_categories_add_up_to_serialized_total() {
        let result = result_with_categories(73.8 * 0.25);
        let json = result.to_json_pretty().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let categories: f64 = [
            "body_language_score",
            "voice_score",
            "content_flow_score",
            "interaction_score",
        ]
        .iter()
        .map(|field| value[*field].as_f64().unwrap())
        .sum();
        assert_eq!(value["total_score"], 73.8);
        assert!((categories - 73.8).abs() < 1e-9, "{categories}");

        let parsed = CompositeResult::from_json(&json).unwrap();
        assert_eq!(parsed.total_score, 73.8);
    }

    #[test]
    fn independently_rounded_categories_are_rejected() {
        let mut value = serde_json::to_value(result_with_categories(18.45)).unwrap();
        for field in [
            "body_language_score",
            "voice_score",
            "content_flow_score",
            "interaction_score",
        ] {
            value[field] = serde_json::json!(18.5);
        }
        value["total_score"] = serde_json::json!(73.8);

        assert!(matches!(
            CompositeResult::from_json(&value.to_string()),
            Err(SchemaError::InconsistentTotal { .. })
        ));
    }

    #[test]
    fn round1_rounds_halves_away_from_zero() {
        assert_eq!(round1(18.75), 18.8);
        assert_eq!(round1(18.5), 18.5);
        assert_eq!(round1(20.1625), 20.2);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn in_range_rejects_nan() {
        assert!(in_range("x", f64::NAN, 0.0, 1.0).is_err());
        assert!(in_range("x", 1.0, 0.0, 1.0).is_ok());
    }
}
