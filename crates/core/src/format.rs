use serde::Serialize;

use crate::audio::{IDEAL_RATE_WPM, is_unavailable_transcript};
use crate::scoring::PerformanceLevel;
use crate::types::{CompositeResult, round1};

/// Category score (out of 25) counted as a strength
const STRENGTH_THRESHOLD: f64 = 20.0;
/// Category score (out of 25) counted as a weakness
const WEAKNESS_THRESHOLD: f64 = 15.0;

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Score at one decimal, rounded the way result documents are.
pub fn format_score(value: f64) -> String {
    format!("{:.1}", round1(value))
}

/// Presentation-level digest of a result, derived without recomputing scores.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub level: PerformanceLevel,
    pub strengths: Vec<&'static str>,
    pub weaknesses: Vec<&'static str>,
    pub key_metrics: Vec<(&'static str, String)>,
}

impl PerformanceSummary {
    pub fn from_result(result: &CompositeResult) -> Self {
        let scores = result.category_scores().rounded();
        let categories = scores.named();

        let strengths = categories
            .iter()
            .filter(|(_, score)| *score >= STRENGTH_THRESHOLD)
            .map(|(name, _)| *name)
            .collect();
        let weaknesses = categories
            .iter()
            .filter(|(_, score)| *score < WEAKNESS_THRESHOLD)
            .map(|(name, _)| *name)
            .collect();

        Self {
            level: PerformanceLevel::from_total(scores.total),
            strengths,
            weaknesses,
            key_metrics: vec![
                (
                    "Eye contact",
                    format!("{:.1}%", result.vision_analysis.eye_contact_ratio),
                ),
                (
                    "Speech rate",
                    format!("{:.0} words/min", result.audio_analysis.speech_rate),
                ),
                (
                    "Filler words",
                    format!("{:.1}%", result.audio_analysis.filler_word_ratio),
                ),
                (
                    "Content completeness",
                    format!("{:.1}%", result.content_analysis.completeness_score),
                ),
            ],
        }
    }
}

/// Qualitative label for a value where higher is better.
fn status(value: f64, good: f64, fair: f64) -> &'static str {
    if value >= good {
        "good"
    } else if value >= fair {
        "fair"
    } else {
        "needs work"
    }
}

fn rate_status(wpm: f64) -> &'static str {
    let (low, high) = IDEAL_RATE_WPM;
    if wpm < low {
        "too slow"
    } else if wpm > high {
        "too fast"
    } else {
        "good"
    }
}

pub fn format_report_readable(result: &CompositeResult) -> String {
    let summary = PerformanceSummary::from_result(result);
    let scores = result.category_scores().rounded();
    let vision = &result.vision_analysis;
    let audio = &result.audio_analysis;
    let content = &result.content_analysis;

    let mut output = String::new();
    output.push_str("# Presentation Analysis\n\n");
    output.push_str(&format!(
        "**Total:** {:.1} / 100 ({}) | **Duration:** {} | **Analyzed:** {}\n\n",
        scores.total,
        summary.level.label(),
        format_timestamp(result.video_duration),
        result.timestamp.format("%Y-%m-%d %H:%M UTC"),
    ));

    if result.is_degraded() {
        output.push_str("> Some scores use neutral defaults:\n");
        for degradation in &result.degradations {
            output.push_str(&format!(
                "> - {}: {}\n",
                degradation.stage.name(),
                degradation.reason
            ));
        }
        output.push('\n');
    }

    output.push_str("## Scores\n\n");
    output.push_str("| Category | Score |\n|---|---|\n");
    for (name, score) in scores.named() {
        output.push_str(&format!("| {} | {:.1} / 25 |\n", name, score));
    }
    output.push('\n');
    if !summary.strengths.is_empty() {
        output.push_str(&format!("**Strengths:** {}\n\n", summary.strengths.join(", ")));
    }
    if !summary.weaknesses.is_empty() {
        output.push_str(&format!("**Weaknesses:** {}\n\n", summary.weaknesses.join(", ")));
    }

    output.push_str("## Body language\n\n");
    output.push_str(&format!(
        "• Eye contact: {:.1}% ({})\n",
        vision.eye_contact_ratio,
        status(vision.eye_contact_ratio, 70.0, 60.0)
    ));
    output.push_str(&format!(
        "• Posture: {:.0}/100 ({})\n",
        vision.posture_score,
        status(vision.posture_score, 80.0, 70.0)
    ));
    output.push_str(&format!("• Gesture activity: {:.1}%\n", vision.gesture_activity));
    output.push_str(&format!("• Fidgeting events: {}\n", vision.fidgeting_count));
    output.push_str(&format!("• Head turns: {}\n\n", vision.face_direction_changes));

    output.push_str("## Voice\n\n");
    output.push_str(&format!(
        "• Speech rate: {:.0} words/min ({})\n",
        audio.speech_rate,
        rate_status(audio.speech_rate)
    ));
    output.push_str(&format!(
        "• Filler words: {} ({:.1}%)\n",
        audio.filler_word_count, audio.filler_word_ratio
    ));
    output.push_str(&format!(
        "• Pauses: {} (avg {:.1}s)\n",
        audio.pause_count, audio.average_pause_duration
    ));
    output.push_str(&format!(
        "• Monotony: {:.2} ({})\n",
        audio.monotony_score,
        status(1.0 - audio.monotony_score, 0.5, 0.3)
    ));
    output.push_str(&format!(
        "• Volume consistency: {:.2}\n\n",
        audio.volume_consistency
    ));

    output.push_str("## Content\n\n");
    output.push_str(&format!(
        "• Completeness: {:.0}/100 ({})\n",
        content.completeness_score,
        status(content.completeness_score, 80.0, 65.0)
    ));
    output.push_str(&format!(
        "• Topic flow: {:.0}/100 ({})\n",
        content.topic_flow_score,
        status(content.topic_flow_score, 75.0, 60.0)
    ));
    output.push_str(&format!("• Structure: {:.0}/100\n", content.structural_score));
    output.push_str(&format!(
        "• Examples and questions: {}\n",
        content.interaction_example_count
    ));
    if !content.key_concepts.is_empty() {
        output.push_str(&format!("• Key concepts: {}\n", content.key_concepts.join(", ")));
    }
    if !content.missing_topics.is_empty() {
        output.push_str(&format!(
            "• Missing topics: {}\n",
            content.missing_topics.join(", ")
        ));
    }
    output.push('\n');

    if !content.topic_heatmap.is_empty() {
        output.push_str("### Topic heatmap\n\n");
        output.push_str("| Words | Dominant concept | Density |\n|---|---|---|\n");
        for segment in &content.topic_heatmap {
            output.push_str(&format!(
                "| {}–{} | {} | {:.3} |\n",
                segment.start_word,
                segment.end_word,
                segment.dominant_concept.as_deref().unwrap_or("-"),
                segment.density_score
            ));
        }
        output.push('\n');
    }

    if !result.recommendations.is_empty() {
        output.push_str("## Recommendations\n\n");
        for (i, recommendation) in result.recommendations.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, recommendation));
        }
        output.push('\n');
    }

    if !is_unavailable_transcript(&audio.transcript) && !audio.transcript.is_empty() {
        output.push_str("## Transcript\n\n");
        output.push_str(audio.transcript.trim());
        output.push_str("\n\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::events::Stage;
    use crate::types::Degradation;
    use crate::{audio, content, scoring, vision};

    fn degraded_result() -> CompositeResult {
        let (v, a, c) = (
            vision::neutral_summary(),
            audio::neutral_summary(),
            content::neutral_summary(),
        );
        let scores = scoring::fuse(&v, &a, &c);
        CompositeResult {
            vision_analysis: v,
            audio_analysis: a,
            content_analysis: c,
            body_language_score: scores.body_language,
            voice_score: scores.voice,
            content_flow_score: scores.content_flow,
            interaction_score: scores.interaction,
            total_score: scores.total,
            video_duration: 754.0,
            timestamp: Utc::now(),
            recommendations: vec!["Use more examples.".to_string()],
            degradations: vec![Degradation {
                stage: Stage::ExtractingAudio,
                reason: "ffmpeg is not installed or not on PATH".to_string(),
            }],
        }
    }

    #[test]
    fn timestamps_are_minutes_and_seconds() {
        assert_eq!(format_timestamp(754.0), "12:34");
        assert_eq!(format_timestamp(0.0), "00:00");
    }

    #[test]
    fn scores_round_halves_up() {
        assert_eq!(format_score(18.25), "18.3");
        assert_eq!(format_score(68.5625), "68.6");
        assert_eq!(format_score(0.04), "0.0");
    }

    #[test]
    fn summary_classifies_categories() {
        let result = degraded_result();
        let summary = PerformanceSummary::from_result(&result);

        // body 17.25, voice 19.06, content flow 18.5, interaction 13.75
        assert!(summary.strengths.is_empty());
        assert_eq!(summary.weaknesses, vec!["Interaction"]);
        assert_eq!(summary.level, PerformanceLevel::Average);
        assert_eq!(summary.key_metrics[1], ("Speech rate", "120 words/min".to_string()));
    }

    #[test]
    fn readable_report_flags_degraded_stages() {
        let report = format_report_readable(&degraded_result());

        assert!(report.starts_with("# Presentation Analysis"));
        assert!(report.contains("**Duration:** 12:34"));
        assert!(report.contains("> - audio: ffmpeg is not installed"));
        assert!(report.contains("**Total:** 68.6 / 100 (Average)"));
        assert!(report.contains("| Content Flow | 18.5 / 25 |"));
        assert!(report.contains("1. Use more examples."));
        assert!(!report.contains("## Transcript"));
    }
}
