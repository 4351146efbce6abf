//! Fusion of the three summaries into four 25-point categories, and the
//! rule-based recommendations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::audio::IDEAL_RATE_WPM;
use crate::types::{ContentSummary, VisualSummary, VocalSummary};

pub const CATEGORY_MAX: f64 = 25.0;

/// Prefix marking recommendations written by the language backend.
pub const AI_PREFIX: &str = "AI suggestion: ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryScores {
    pub body_language: f64,
    pub voice: f64,
    pub content_flow: f64,
    pub interaction: f64,
    pub total: f64,
}

impl CategoryScores {
    /// Categories in display order with their names.
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("Body Language", self.body_language),
            ("Voice Quality", self.voice),
            ("Content Flow", self.content_flow),
            ("Interaction", self.interaction),
        ]
    }

    /// One-decimal scores whose categories add up exactly to the rounded
    /// total. Tenths left over after flooring go to the categories with the
    /// largest remainders, earlier categories first on ties.
    pub fn rounded(&self) -> CategoryScores {
        let total_tenths = (self.total * 10.0).round();
        let scaled = [
            self.body_language,
            self.voice,
            self.content_flow,
            self.interaction,
        ]
        .map(|score| score * 10.0);
        let mut tenths = scaled.map(f64::floor);

        let mut by_remainder = [0usize, 1, 2, 3];
        by_remainder
            .sort_by(|&a, &b| (scaled[b] - tenths[b]).total_cmp(&(scaled[a] - tenths[a])));
        let missing = (total_tenths - tenths.iter().sum::<f64>()).clamp(0.0, 4.0) as usize;
        for &i in by_remainder.iter().take(missing) {
            tenths[i] += 1.0;
        }

        CategoryScores {
            body_language: tenths[0] / 10.0,
            voice: tenths[1] / 10.0,
            content_flow: tenths[2] / 10.0,
            interaction: tenths[3] / 10.0,
            total: total_tenths / 10.0,
        }
    }
}

fn to_category(score_out_of_100: f64) -> f64 {
    (score_out_of_100.clamp(0.0, 100.0) / 100.0 * CATEGORY_MAX).clamp(0.0, CATEGORY_MAX)
}

pub fn content_flow_score(content: &ContentSummary) -> f64 {
    to_category(
        0.4 * content.completeness_score
            + 0.4 * content.topic_flow_score
            + 0.2 * content.structural_score,
    )
}

/// Mean of a gesture proxy and an examples proxy, each capped at 25.
pub fn interaction_score(gesture_activity: f64, interaction_example_count: u32) -> f64 {
    let gesture = (gesture_activity.clamp(0.0, 100.0) / 100.0 * CATEGORY_MAX).min(CATEGORY_MAX);
    let examples = (interaction_example_count as f64 * 2.5).min(CATEGORY_MAX);
    (gesture + examples) / 2.0
}

/// Full-precision category scores. Rounding happens at serialization.
pub fn fuse(vision: &VisualSummary, audio: &VocalSummary, content: &ContentSummary) -> CategoryScores {
    let body_language = to_category(vision.overall_body_language_score);
    let voice = to_category(audio.overall_voice_score);
    let content_flow = content_flow_score(content);
    let interaction = interaction_score(vision.gesture_activity, content.interaction_example_count);

    CategoryScores {
        body_language,
        voice,
        content_flow,
        interaction,
        total: body_language + voice + content_flow + interaction,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_total(total_score: f64) -> Self {
        if total_score >= 85.0 {
            PerformanceLevel::Excellent
        } else if total_score >= 75.0 {
            PerformanceLevel::Good
        } else if total_score >= 65.0 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "Excellent",
            PerformanceLevel::Good => "Good",
            PerformanceLevel::Average => "Average",
            PerformanceLevel::NeedsImprovement => "Needs improvement",
        }
    }
}

/// Recommendations triggered by raw sub-metrics, in a fixed order.
pub fn rule_recommendations(
    vision: &VisualSummary,
    audio: &VocalSummary,
    content: &ContentSummary,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if vision.eye_contact_ratio < 60.0 {
        recommendations.push(format!(
            "Focus on eye contact with the camera: only {:.0}% eye contact was detected, aim for at least 60%.",
            vision.eye_contact_ratio
        ));
    }
    if vision.posture_score < 70.0 {
        recommendations.push(
            "Keep an upright posture: square your shoulders and face the audience.".to_string(),
        );
    }
    if vision.fidgeting_count > 10 {
        recommendations.push(
            "Reduce unnecessary hand movements and keep a calm, controlled stance.".to_string(),
        );
    }

    if audio.filler_word_ratio > 5.0 {
        recommendations.push(format!(
            "Cut down on filler words ({:.1}% detected); use a short silent pause instead.",
            audio.filler_word_ratio
        ));
    }
    if audio.monotony_score > 0.7 {
        recommendations
            .push("Vary your pitch and tone to avoid sounding monotonous.".to_string());
    }
    let (low, high) = IDEAL_RATE_WPM;
    if audio.speech_rate < low || audio.speech_rate > high {
        recommendations.push(format!(
            "Adjust your speaking pace ({:.0} words/min); the ideal range is {:.0}-{:.0} words/min.",
            audio.speech_rate, low, high
        ));
    }

    if content.completeness_score < 80.0 {
        if content.missing_topics.is_empty() {
            recommendations
                .push("Improve content completeness by covering the topic end to end.".to_string());
        } else {
            recommendations.push(format!(
                "Improve content completeness by covering the missing topics: {}.",
                content.missing_topics.join(", ")
            ));
        }
    }
    if content.interaction_example_count < 5 {
        recommendations.push(
            "Use more examples and analogies, and ask questions to engage the audience."
                .to_string(),
        );
    }
    if content.topic_flow_score < 75.0 {
        recommendations.push(
            "Strengthen the transitions between topics and review their logical order.".to_string(),
        );
    }

    recommendations
}

/// Rule recommendations first, then up to `max_ai` tagged backend
/// suggestions; duplicates dropped, capped at `max_total`.
pub fn compose_recommendations(
    rules: Vec<String>,
    ai_suggestions: Vec<String>,
    max_ai: usize,
    max_total: usize,
) -> Vec<String> {
    let tagged = ai_suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(max_ai)
        .map(|s| format!("{AI_PREFIX}{s}"));

    let mut seen = HashSet::new();
    rules
        .into_iter()
        .chain(tagged)
        .filter(|r| seen.insert(r.clone()))
        .take(max_total)
        .collect()
}
