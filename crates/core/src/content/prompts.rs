//! Prompts sent to the language backend and parsers for its replies.
//!
//! Replies are free text; only the labelled lines below are read; anything
//! else is ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ContentSummary;

static COMPLETENESS: LazyLock<Regex> = LazyLock::new(|| score_pattern("COMPLETENESS SCORE"));
static FLOW: LazyLock<Regex> = LazyLock::new(|| score_pattern("FLOW SCORE"));
static STRUCTURE: LazyLock<Regex> = LazyLock::new(|| score_pattern("STRUCTURE SCORE"));
static MISSING_TOPICS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*#]*MISSING TOPICS\s*\**\s*:\s*(.+)$").expect("valid missing topics pattern")
});

const NO_TOPICS: [&str; 5] = ["none", "n/a", "na", "no missing topics", "nothing"];

pub const MAX_SUGGESTIONS: usize = 7;

/// Characters of transcript quoted in the suggestion prompt.
const SUGGESTION_EXCERPT_CHARS: usize = 500;

fn score_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){}\s*\**\s*:\s*\[?\s*(\d+(?:\.\d+)?)", label))
        .expect("valid score pattern")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Completeness,
    Flow,
    Structure,
}

impl ScoreKind {
    fn pattern(&self) -> &'static Regex {
        match self {
            ScoreKind::Completeness => &COMPLETENESS,
            ScoreKind::Flow => &FLOW,
            ScoreKind::Structure => &STRUCTURE,
        }
    }

    /// Value used when the backend is absent, fails, or its reply has no score.
    pub fn fallback(&self) -> f64 {
        match self {
            ScoreKind::Completeness | ScoreKind::Flow => 75.0,
            ScoreKind::Structure => 70.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreKind::Completeness => "completeness",
            ScoreKind::Flow => "flow",
            ScoreKind::Structure => "structure",
        }
    }
}

/// First labelled score in `reply`, clamped to [0, 100].
pub fn parse_score(reply: &str, kind: ScoreKind) -> Option<f64> {
    kind.pattern()
        .captures(reply)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(|score| score.clamp(0.0, 100.0))
}

pub fn parse_missing_topics(reply: &str) -> Vec<String> {
    let Some(caps) = MISSING_TOPICS.captures(reply) else {
        return Vec::new();
    };
    let list = caps[1].trim().trim_start_matches('[').trim_end_matches(']').trim();
    let normalized = list.trim_end_matches('.').to_lowercase();
    if list.is_empty() || NO_TOPICS.contains(&normalized.as_str()) {
        return Vec::new();
    }

    list.split(',')
        .map(|topic| topic.trim().trim_end_matches('.').trim())
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lines starting with `-`, `*` or `•`, at most [`MAX_SUGGESTIONS`].
pub fn parse_bullets(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix('-')
                .or_else(|| line.strip_prefix('*'))
                .or_else(|| line.strip_prefix('•'))
        })
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

pub fn completeness_prompt(transcript: &str, topic: Option<&str>) -> String {
    format!(
        r#"Analyze the following lecture transcript:

"{transcript}"

Subject: {subject}

Evaluate:
1. How complete the content is (0-100)
2. Important topics that are missing
3. Critical points that were skipped

Answer in exactly this format:
COMPLETENESS SCORE: [number between 0 and 100]
MISSING TOPICS: [comma-separated list, or "none"]"#,
        subject = topic.unwrap_or("general educational content"),
    )
}

pub fn flow_prompt(transcript: &str) -> String {
    format!(
        r#"Analyze the topic flow of this lecture:

"{transcript}"

Evaluate:
1. Logical ordering of topics
2. Smoothness of transitions
3. Introduction, development and conclusion
4. Connections between topics

Give a flow score between 0 and 100:
FLOW SCORE: [number]"#
    )
}

pub fn structure_prompt(transcript: &str) -> String {
    format!(
        r#"Analyze the pedagogical structure of this lecture:

"{transcript}"

Evaluate:
1. Clearly stated objectives
2. Systematic explanation
3. Repetition and reinforcement
4. Review questions
5. Summary and conclusion

Give a structure score between 0 and 100:
STRUCTURE SCORE: [number]"#
    )
}

pub fn suggestions_prompt(summary: &ContentSummary, transcript: &str) -> String {
    let excerpt: String = transcript.chars().take(SUGGESTION_EXCERPT_CHARS).collect();
    format!(
        r#"Suggest improvements for a lecture based on this analysis:

Content completeness: {completeness:.0}/100
Topic flow: {flow:.0}/100
Educational structure: {structure:.0}/100
Interaction examples: {interactions}
Missing topics: {missing}

Transcript excerpt: "{excerpt}..."

Give 5-7 practical suggestions. Start each one on a new line with "- "."#,
        completeness = summary.completeness_score,
        flow = summary.topic_flow_score,
        structure = summary.structural_score,
        interactions = summary.interaction_example_count,
        missing = summary.missing_topics.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_read_from_labelled_lines() {
        let reply = "Overall solid.\nCOMPLETENESS SCORE: 82\nMISSING TOPICS: recursion, big-O";
        assert_eq!(parse_score(reply, ScoreKind::Completeness), Some(82.0));
        assert_eq!(parse_score(reply, ScoreKind::Flow), None);
    }

    #[test]
    fn scores_tolerate_markdown_and_brackets() {
        assert_eq!(parse_score("**Flow Score**: [67.5]", ScoreKind::Flow), Some(67.5));
        assert_eq!(parse_score("STRUCTURE SCORE: 140", ScoreKind::Structure), Some(100.0));
    }

    #[test]
    fn missing_topics_split_on_commas() {
        let reply = "COMPLETENESS SCORE: 70\nMISSING TOPICS: recursion, big-O notation , .";
        assert_eq!(parse_missing_topics(reply), vec!["recursion", "big-O notation"]);
    }

    #[test]
    fn none_means_no_missing_topics() {
        assert!(parse_missing_topics("MISSING TOPICS: None.").is_empty());
        assert!(parse_missing_topics("MISSING TOPICS: [n/a]").is_empty());
        assert!(parse_missing_topics("no label at all").is_empty());
    }

    #[test]
    fn bullets_are_capped() {
        let reply = "Here you go:\n- one\n* two\n• three\n-\n- four\n- five\n- six\n- seven\n- eight";
        let bullets = parse_bullets(reply);
        assert_eq!(bullets.len(), MAX_SUGGESTIONS);
        assert_eq!(bullets[..3], ["one", "two", "three"]);
        assert_eq!(bullets[6], "seven");
    }

    #[test]
    fn fallbacks_match_documented_defaults() {
        assert_eq!(ScoreKind::Completeness.fallback(), 75.0);
        assert_eq!(ScoreKind::Flow.fallback(), 75.0);
        assert_eq!(ScoreKind::Structure.fallback(), 70.0);
    }
}
