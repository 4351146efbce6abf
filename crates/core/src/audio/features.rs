//! Acoustic features computed from mono PCM samples in [-1, 1].

use crate::config::AudioConfig;

pub const FRAME_LENGTH: usize = 2048;
pub const HOP_LENGTH: usize = 512;

/// Voiced frames need a normalized autocorrelation peak at least this high.
const VOICING_THRESHOLD: f64 = 0.5;
/// Earliest local autocorrelation peak within this share of the best one wins,
/// which keeps period doubling from halving the estimate.
const OCTAVE_TOLERANCE: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct AcousticFeatures {
    pub duration_secs: f64,
    /// Gaps between speech intervals longer than the minimum pause (seconds)
    pub pauses: Vec<f64>,
    pub pitch_variation: f64,
    pub monotony_score: f64,
    pub volume_consistency: f64,
}

impl AcousticFeatures {
    pub fn compute(samples: &[f32], sample_rate: u32, config: &AudioConfig) -> Self {
        let rms = frame_rms(samples, FRAME_LENGTH, HOP_LENGTH);
        let intervals = non_silent_intervals(&rms, samples.len(), config.silence_top_db);
        let pauses = pauses(&intervals, sample_rate, config.min_pause_secs);

        let peak = rms.iter().copied().fold(0.0, f64::max);
        let min_rms = peak * db_to_amplitude(-config.silence_top_db);
        let pitches = pitch_track(
            samples,
            sample_rate,
            config.pitch_floor_hz,
            config.pitch_ceiling_hz,
            min_rms,
        );
        let (pitch_variation, monotony_score) =
            pitch_variation(&pitches, config.min_pitch_samples);

        Self {
            duration_secs: samples.len() as f64 / sample_rate.max(1) as f64,
            pauses,
            pitch_variation,
            monotony_score,
            volume_consistency: volume_consistency(&rms),
        }
    }

    pub fn average_pause(&self) -> f64 {
        if self.pauses.is_empty() {
            0.0
        } else {
            self.pauses.iter().sum::<f64>() / self.pauses.len() as f64
        }
    }
}

fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Root-mean-square energy of each frame. Frames start every `hop` samples;
/// the trailing ones are shorter than `frame_len`.
pub fn frame_rms(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f64> {
    (0..samples.len())
        .step_by(hop.max(1))
        .map(|start| {
            let frame = &samples[start..(start + frame_len).min(samples.len())];
            let energy: f64 = frame.iter().map(|&s| (s as f64).powi(2)).sum();
            (energy / frame.len() as f64).sqrt()
        })
        .collect()
}

/// Sample ranges `[start, end)` whose frame energy is within `top_db` of the
/// loudest frame.
pub fn non_silent_intervals(rms: &[f64], total_samples: usize, top_db: f64) -> Vec<(usize, usize)> {
    let peak = rms.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let threshold = peak * db_to_amplitude(-top_db);

    let mut intervals = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &value) in rms.iter().enumerate() {
        match (value > threshold, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                intervals.push((s * HOP_LENGTH, (i * HOP_LENGTH).min(total_samples)));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        intervals.push((s * HOP_LENGTH, total_samples));
    }
    intervals
}

/// Durations of the gaps between consecutive intervals that exceed `min_pause`.
pub fn pauses(intervals: &[(usize, usize)], sample_rate: u32, min_pause: f64) -> Vec<f64> {
    let rate = sample_rate.max(1) as f64;
    intervals
        .windows(2)
        .map(|pair| pair[1].0.saturating_sub(pair[0].1) as f64 / rate)
        .filter(|gap| *gap > min_pause)
        .collect()
}

/// Fundamental frequency per analysis frame, 0.0 for unvoiced frames.
///
/// Frames span three periods of `floor_hz` and overlap by half. Frames whose
/// RMS is at or below `min_rms` are treated as unvoiced.
pub fn pitch_track(
    samples: &[f32],
    sample_rate: u32,
    floor_hz: f64,
    ceiling_hz: f64,
    min_rms: f64,
) -> Vec<f64> {
    let rate = sample_rate as f64;
    if rate <= 0.0 || floor_hz <= 0.0 || ceiling_hz <= floor_hz {
        return Vec::new();
    }

    let min_lag = (rate / ceiling_hz).floor().max(1.0) as usize;
    let max_lag = (rate / floor_hz).ceil() as usize;
    let frame_len = (3.0 * rate / floor_hz).ceil() as usize;
    if samples.len() < frame_len || max_lag + 1 >= frame_len {
        return Vec::new();
    }
    let hop = frame_len / 2;

    let mut pitches = Vec::new();
    let mut start = 0;
    while start + frame_len <= samples.len() {
        let frame = &samples[start..start + frame_len];
        pitches.push(frame_pitch(frame, rate, min_lag, max_lag, min_rms));
        start += hop;
    }
    pitches
}

fn frame_pitch(frame: &[f32], rate: f64, min_lag: usize, max_lag: usize, min_rms: f64) -> f64 {
    let mean = frame.iter().map(|&s| s as f64).sum::<f64>() / frame.len() as f64;
    let x: Vec<f64> = frame.iter().map(|&s| s as f64 - mean).collect();

    let energy: f64 = x.iter().map(|v| v * v).sum();
    if (energy / x.len() as f64).sqrt() <= min_rms || energy <= f64::EPSILON {
        return 0.0;
    }

    // Normalized cross-correlation for lags min_lag - 1 ..= max_lag + 1 so that
    // every candidate lag has both neighbours available for the peak check.
    let first = min_lag.saturating_sub(1).max(1);
    let last = max_lag + 1;
    let nccf: Vec<f64> = (first..=last)
        .map(|lag| {
            let (head, tail) = (&x[..x.len() - lag], &x[lag..]);
            let cross: f64 = head.iter().zip(tail).map(|(a, b)| a * b).sum();
            let e1: f64 = head.iter().map(|v| v * v).sum();
            let e2: f64 = tail.iter().map(|v| v * v).sum();
            let denom = (e1 * e2).sqrt();
            if denom > 0.0 { cross / denom } else { 0.0 }
        })
        .collect();

    let at = |lag: usize| nccf[lag - first];
    let candidates = min_lag.max(first + 1)..=max_lag;

    let best = candidates.clone().map(at).fold(f64::MIN, f64::max);
    if best < VOICING_THRESHOLD {
        return 0.0;
    }

    candidates
        .into_iter()
        .find(|&lag| {
            let value = at(lag);
            value >= OCTAVE_TOLERANCE * best && value >= at(lag - 1) && value >= at(lag + 1)
        })
        .map(|lag| rate / lag as f64)
        .unwrap_or(0.0)
}

/// Coefficient of variation of voiced pitch, and the monotony score derived
/// from it. Too few voiced frames yields `(0.0, 1.0)`.
pub fn pitch_variation(pitches: &[f64], min_samples: usize) -> (f64, f64) {
    let voiced: Vec<f64> = pitches
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();
    if voiced.is_empty() || voiced.len() < min_samples {
        return (0.0, 1.0);
    }

    let n = voiced.len() as f64;
    let mean = voiced.iter().sum::<f64>() / n;
    let std = (voiced.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n).sqrt();
    let variation = std / mean;

    (variation, monotony_from_variation(variation))
}

pub fn monotony_from_variation(variation: f64) -> f64 {
    (1.0 - 2.0 * variation).clamp(0.0, 1.0)
}

/// `1 - std/mean` of frame energies, clamped to [0, 1]. Silence yields 0.
pub fn volume_consistency(rms: &[f64]) -> f64 {
    if rms.is_empty() {
        return 0.0;
    }
    let n = rms.len() as f64;
    let mean = rms.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let std = (rms.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    (1.0 - std / mean).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    const RATE: u32 = 16_000;

    fn tone(freq: f32, secs: f32, amplitude: f32) -> Vec<f32> {
        let n = (RATE as f32 * secs) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    fn silence(secs: f32) -> Vec<f32> {
        vec![0.0; (RATE as f32 * secs) as usize]
    }

    fn median(values: &mut [f64]) -> f64 {
        values.sort_by(|a, b| a.total_cmp(b));
        values[values.len() / 2]
    }

    #[test]
    fn pitch_of_pure_tone_is_recovered() {
        let samples = tone(200.0, 1.0, 0.5);
        let mut voiced: Vec<f64> = pitch_track(&samples, RATE, 75.0, 600.0, 0.0)
            .into_iter()
            .filter(|p| *p > 0.0)
            .collect();

        assert!(voiced.len() > 10);
        let f0 = median(&mut voiced);
        assert!((f0 - 200.0).abs() < 5.0, "estimated {f0}");
    }

    #[test]
    fn steady_tone_is_monotone() {
        let samples = tone(150.0, 1.0, 0.5);
        let pitches = pitch_track(&samples, RATE, 75.0, 600.0, 0.0);
        let (variation, monotony) = pitch_variation(&pitches, 10);
        assert!(variation < 0.05);
        assert!(monotony > 0.9);
    }

    #[test]
    fn alternating_tones_vary() {
        let mut samples = tone(120.0, 0.5, 0.5);
        samples.extend(tone(260.0, 0.5, 0.5));
        samples.extend(tone(120.0, 0.5, 0.5));
        let pitches = pitch_track(&samples, RATE, 75.0, 600.0, 0.0);
        let (variation, monotony) = pitch_variation(&pitches, 10);
        assert!(variation > 0.2, "variation {variation}");
        assert!(monotony < 0.6);
    }

    #[test]
    fn silence_is_unvoiced() {
        let pitches = pitch_track(&silence(0.5), RATE, 75.0, 600.0, 0.0);
        assert!(pitches.iter().all(|p| *p == 0.0));
        assert_eq!(pitch_variation(&pitches, 10), (0.0, 1.0));
    }

    #[test]
    fn too_few_pitch_samples_is_neutral() {
        assert_eq!(pitch_variation(&[100.0, 200.0, 300.0], 10), (0.0, 1.0));
    }

    #[test]
    fn monotony_is_clamped() {
        assert_eq!(monotony_from_variation(0.8), 0.0);
        assert_eq!(monotony_from_variation(0.0), 1.0);
        assert!((monotony_from_variation(0.25) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn long_gaps_become_pauses() {
        let mut samples = tone(200.0, 1.0, 0.5);
        samples.extend(silence(1.2));
        samples.extend(tone(200.0, 1.0, 0.5));
        samples.extend(silence(0.2));
        samples.extend(tone(200.0, 1.0, 0.5));

        let rms = frame_rms(&samples, FRAME_LENGTH, HOP_LENGTH);
        let intervals = non_silent_intervals(&rms, samples.len(), 20.0);
        let found = pauses(&intervals, RATE, 0.5);

        assert_eq!(found.len(), 1);
        assert!((found[0] - 1.2).abs() < 0.2, "pause {}", found[0]);
    }

    #[test]
    fn all_silent_audio_has_no_intervals() {
        let samples = silence(1.0);
        let rms = frame_rms(&samples, FRAME_LENGTH, HOP_LENGTH);
        assert!(non_silent_intervals(&rms, samples.len(), 20.0).is_empty());
        assert_eq!(volume_consistency(&rms), 0.0);
    }

    #[test]
    fn constant_level_is_fully_consistent() {
        assert_eq!(volume_consistency(&[0.2, 0.2, 0.2]), 1.0);
        assert!(volume_consistency(&[0.01, 0.5, 0.01, 0.5]) < 0.2);
    }

    #[test]
    fn features_on_empty_input_are_finite() {
        let features = AcousticFeatures::compute(&[], RATE, &AudioConfig::default());
        assert_eq!(features.duration_secs, 0.0);
        assert!(features.pauses.is_empty());
        assert_eq!(features.average_pause(), 0.0);
        assert_eq!(features.monotony_score, 1.0);
    }
}
