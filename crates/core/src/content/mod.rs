//! Lecture content analysis: completeness, flow and structure from a language
//! backend, key concepts, interaction markers and the topic heatmap from the
//! transcript itself.

mod backend;
mod prompts;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ContentConfig;
use crate::error::ExtractionError;
use crate::lexicon::{self, PhraseMatcher};
use crate::types::{ContentSummary, HeatmapSegment};

pub use backend::{ChatCompletionsBackend, LanguageBackend};
pub use prompts::{MAX_SUGGESTIONS, ScoreKind, parse_bullets, parse_missing_topics, parse_score};

pub const HEATMAP_SEGMENT_WORDS: usize = 50;
pub const MAX_KEY_CONCEPTS: usize = 10;
/// Examples and questions assumed when the transcript could not be analyzed.
pub const NEUTRAL_INTERACTION_COUNT: u32 = 5;
/// Tokens this short or shorter never become key concepts.
const MIN_CONCEPT_CHARS: usize = 3;

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn analyze(
        &self,
        transcript: &str,
        topic: Option<&str>,
    ) -> Result<ContentSummary, ExtractionError>;

    /// Improvement suggestions from the language backend. Empty when none is
    /// configured.
    async fn suggest_improvements(
        &self,
        summary: &ContentSummary,
        transcript: &str,
    ) -> Result<Vec<String>, ExtractionError>;

    fn has_backend(&self) -> bool;
}

/// Key concepts ranked by frequency (ties by first occurrence) and each
/// concept's share of the filtered tokens, in percent.
pub fn extract_key_concepts(
    transcript: &str,
    stop_words: &HashSet<&str>,
) -> (Vec<String>, BTreeMap<String, f64>) {
    let filtered: Vec<String> = lexicon::words(transcript)
        .map(str::to_lowercase)
        .filter(|w| {
            w.chars().count() > MIN_CONCEPT_CHARS
                && w.chars().all(char::is_alphabetic)
                && !stop_words.contains(w.as_str())
        })
        .collect();

    let mut frequency: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in filtered.iter().enumerate() {
        frequency.entry(word.as_str()).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = frequency
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let concepts: Vec<(String, usize)> = ranked
        .into_iter()
        .take(MAX_KEY_CONCEPTS)
        .filter(|(_, count, _)| *count > 1)
        .map(|(word, count, _)| (word.to_string(), count))
        .collect();

    let total = filtered.len() as f64;
    let density = concepts
        .iter()
        .map(|(concept, count)| (concept.clone(), *count as f64 / total * 100.0))
        .collect();

    (concepts.into_iter().map(|(c, _)| c).collect(), density)
}

/// Split the transcript into fixed word windows and measure how densely each
/// key concept appears in each one.
pub fn topic_heatmap(transcript: &str, key_concepts: &[String]) -> Vec<HeatmapSegment> {
    let words: Vec<&str> = transcript.split_whitespace().collect();

    words
        .chunks(HEATMAP_SEGMENT_WORDS)
        .enumerate()
        .map(|(segment_id, window)| {
            let start_word = segment_id * HEATMAP_SEGMENT_WORDS;

            let mut counts: HashMap<String, usize> = HashMap::new();
            for token in window.iter().flat_map(|w| lexicon::words(w)) {
                *counts.entry(token.to_lowercase()).or_default() += 1;
            }

            let scores: Vec<(&String, f64)> = key_concepts
                .iter()
                .map(|concept| {
                    let count = counts.get(concept).copied().unwrap_or(0);
                    (concept, count as f64 / window.len() as f64)
                })
                .collect();

            let dominant_concept = scores
                .iter()
                .filter(|(_, density)| *density > 0.0)
                .fold(None::<(&String, f64)>, |best, &(concept, density)| match best {
                    Some((_, top)) if top >= density => best,
                    _ => Some((concept, density)),
                })
                .map(|(concept, _)| concept.clone());

            HeatmapSegment {
                segment_id,
                start_word,
                end_word: start_word + window.len(),
                density_score: scores.iter().map(|(_, d)| d).sum(),
                concept_scores: scores
                    .into_iter()
                    .map(|(concept, density)| (concept.clone(), density))
                    .collect(),
                dominant_concept,
            }
        })
        .collect()
}

pub fn overall_content_score(
    completeness: f64,
    flow: f64,
    structure: f64,
    interaction_count: u32,
    concept_count: usize,
) -> f64 {
    let interaction = (interaction_count as f64 * 10.0).min(100.0);
    let concepts = (concept_count as f64 * 8.0).min(100.0);

    0.3 * completeness + 0.25 * flow + 0.25 * structure + 0.1 * interaction + 0.1 * concepts
}

/// Neutral summary used when there is no transcript to analyze.
pub fn neutral_summary() -> ContentSummary {
    let completeness = ScoreKind::Completeness.fallback();
    let flow = ScoreKind::Flow.fallback();
    let structure = ScoreKind::Structure.fallback();
    ContentSummary {
        completeness_score: completeness,
        missing_topics: Vec::new(),
        key_concepts: Vec::new(),
        concept_density: BTreeMap::new(),
        topic_flow_score: flow,
        interaction_example_count: NEUTRAL_INTERACTION_COUNT,
        structural_score: structure,
        overall_content_score: overall_content_score(
            completeness,
            flow,
            structure,
            NEUTRAL_INTERACTION_COUNT,
            0,
        ),
        topic_heatmap: Vec::new(),
    }
}

pub struct ContentAnalyzer {
    backend: Option<Arc<dyn LanguageBackend>>,
    stop_words: HashSet<&'static str>,
    markers: PhraseMatcher,
}

impl ContentAnalyzer {
    pub fn new(
        language: &str,
        backend: Option<Arc<dyn LanguageBackend>>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            backend,
            stop_words: lexicon::stop_words(language),
            markers: PhraseMatcher::interaction_markers(language)?,
        })
    }

    /// Analyzer for `config`. A configured provider without an API key runs
    /// in local-heuristics mode with a warning.
    pub fn from_config(config: &ContentConfig) -> Result<Self, regex::Error> {
        let backend = config.active_provider().and_then(|provider| {
            match ChatCompletionsBackend::for_provider(provider, config) {
                Ok(backend) => {
                    info!(provider = provider.name(), "content backend configured");
                    Some(Arc::new(backend) as Arc<dyn LanguageBackend>)
                }
                Err(e) => {
                    warn!(error = %e, "content backend disabled");
                    None
                }
            }
        });
        Self::new(&config.language, backend)
    }

    async fn backend_score(
        backend: &dyn LanguageBackend,
        kind: ScoreKind,
        prompt: String,
    ) -> (f64, Option<String>) {
        match backend.generate(&prompt).await {
            Ok(reply) => {
                let score = parse_score(&reply, kind).unwrap_or_else(|| {
                    warn!(score = kind.name(), "unparsable backend reply, using default");
                    kind.fallback()
                });
                (score, Some(reply))
            }
            Err(e) => {
                warn!(score = kind.name(), error = %e, "backend request failed, using default");
                (kind.fallback(), None)
            }
        }
    }

    /// Completeness, missing topics, flow and structure.
    async fn judged_scores(
        &self,
        transcript: &str,
        topic: Option<&str>,
    ) -> (f64, Vec<String>, f64, f64) {
        let backend = match &self.backend {
            Some(backend) if !transcript.trim().is_empty() => backend.as_ref(),
            _ => {
                return (
                    ScoreKind::Completeness.fallback(),
                    Vec::new(),
                    ScoreKind::Flow.fallback(),
                    ScoreKind::Structure.fallback(),
                );
            }
        };

        let (completeness, flow, structure) = tokio::join!(
            Self::backend_score(
                backend,
                ScoreKind::Completeness,
                prompts::completeness_prompt(transcript, topic),
            ),
            Self::backend_score(backend, ScoreKind::Flow, prompts::flow_prompt(transcript)),
            Self::backend_score(
                backend,
                ScoreKind::Structure,
                prompts::structure_prompt(transcript),
            ),
        );

        let missing_topics = completeness
            .1
            .as_deref()
            .map(parse_missing_topics)
            .unwrap_or_default();

        (completeness.0, missing_topics, flow.0, structure.0)
    }
}

#[async_trait]
impl ContentExtractor for ContentAnalyzer {
    async fn analyze(
        &self,
        transcript: &str,
        topic: Option<&str>,
    ) -> Result<ContentSummary, ExtractionError> {
        let (key_concepts, concept_density) = extract_key_concepts(transcript, &self.stop_words);
        let interaction_example_count = self.markers.count(transcript) as u32;
        let topic_heatmap = topic_heatmap(transcript, &key_concepts);

        let (completeness_score, missing_topics, topic_flow_score, structural_score) =
            self.judged_scores(transcript, topic).await;

        debug!(
            concepts = key_concepts.len(),
            interactions = interaction_example_count,
            segments = topic_heatmap.len(),
            "content heuristics computed"
        );

        Ok(ContentSummary {
            overall_content_score: overall_content_score(
                completeness_score,
                topic_flow_score,
                structural_score,
                interaction_example_count,
                key_concepts.len(),
            ),
            completeness_score,
            missing_topics,
            key_concepts,
            concept_density,
            topic_flow_score,
            interaction_example_count,
            structural_score,
            topic_heatmap,
        })
    }

    async fn suggest_improvements(
        &self,
        summary: &ContentSummary,
        transcript: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let Some(backend) = &self.backend else {
            return Ok(Vec::new());
        };
        let reply = backend
            .generate(&prompts::suggestions_prompt(summary, transcript))
            .await?;
        Ok(parse_bullets(&reply))
    }

    fn has_backend(&self) -> bool {
        self.backend.is_some()
    }
}
