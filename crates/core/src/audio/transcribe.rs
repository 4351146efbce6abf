use std::path::Path;

use tracing::debug;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::ExtractionError;
use crate::types::{Segment, Transcript};

/// Blocking speech-to-text. Called from a blocking task by the audio extractor.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, samples: &[f32], language: &str) -> Result<Transcript, ExtractionError>;
}

/// Whisper model loaded once and shared across requests.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
}

impl WhisperTranscriber {
    pub fn load(model_path: &Path) -> Result<Self, ExtractionError> {
        let ctx_params = WhisperContextParameters {
            use_gpu: true,
            flash_attn: true,
            ..Default::default()
        };
        let model_path_str = model_path
            .to_str()
            .ok_or_else(|| ExtractionError::Transcription("model path is not UTF-8".to_string()))?;
        let ctx = WhisperContext::new_with_params(model_path_str, ctx_params)
            .map_err(|e| ExtractionError::Transcription(format!("failed to load model: {e}")))?;
        Ok(Self { ctx })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, samples: &[f32], language: &str) -> Result<Transcript, ExtractionError> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        params.set_language(Some(language));
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| ExtractionError::Transcription(format!("failed to create state: {e}")))?;
        state
            .full(params, samples)
            .map_err(|e| ExtractionError::Transcription(format!("failed to run model: {e}")))?;

        let mut text = String::new();
        let mut segments: Vec<Segment> = Vec::new();

        for segment in state.as_iter() {
            let seg_text = match segment.to_str() {
                Ok(s) => s,
                Err(_) => continue,
            };
            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: seg_text.to_string(),
            });
            text.push_str(seg_text);
        }

        let language_index = state.full_lang_id_from_state();
        let detected = whisper_rs::get_lang_str(language_index);
        debug!(segments = segments.len(), "transcription finished");

        Ok(Transcript {
            text: text.trim().to_string(),
            segments,
            language: detected.unwrap_or(language).to_string(),
        })
    }
}
