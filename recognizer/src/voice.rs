//! Voice modality: mono waveforms in, one utterance embedding out.
//!
//! [`Waveform`] is the only input type voice extraction accepts. Audio in
//! other shapes is converted explicitly first:
//!
//! ```text
//! PCM16 LE mono bytes      -> Waveform::from_pcm16_le
//! PCM16 LE interleaved     -> Waveform::from_pcm16_interleaved (downmix)
//! f32 samples              -> Waveform::new
//! ```
//!
//! Container formats (wav, flac, mp3) and microphone capture are decoded
//! to PCM16 by the caller.

use std::time::Duration;

use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

use crate::config::RecognizerConfig;
use crate::error::RecognizeError;
use crate::extractor::Extractor;
use crate::recognizer::Recognizer;

/// Sample rate voice encoders expect after preprocessing.
pub const SAMPLE_RATE: u32 = 16_000;

/// Loudness that quiet utterances are raised to before encoding.
pub const TARGET_DBFS: f32 = -30.0;

/// Utterances quieter than this are treated as silence.
const SILENCE_FLOOR_DBFS: f32 = -100.0;

/// Frames per rubato processing block.
const RESAMPLE_CHUNK: usize = 1024;

/// A mono waveform with samples nominally in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, RecognizeError> {
        if sample_rate == 0 {
            return Err(RecognizeError::InvalidAudio("sample rate is zero".into()));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(RecognizeError::InvalidAudio("non-finite sample".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Converts mono PCM16 signed little-endian bytes, as delivered in raw
    /// microphone chunks.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32) -> Result<Self, RecognizeError> {
        Self::from_pcm16_interleaved(bytes, sample_rate, 1)
    }

    /// Converts interleaved PCM16 signed little-endian bytes, averaging the
    /// channels down to mono.
    pub fn from_pcm16_interleaved(
        bytes: &[u8],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, RecognizeError> {
        if channels == 0 {
            return Err(RecognizeError::InvalidAudio("zero channels".into()));
        }
        let frame_bytes = 2 * channels as usize;
        if bytes.len() % frame_bytes != 0 {
            return Err(RecognizeError::InvalidAudio(format!(
                "{} bytes is not a whole number of {channels}-channel PCM16 frames",
                bytes.len()
            )));
        }

        let samples = bytes
            .chunks_exact(frame_bytes)
            .map(|frame| {
                let sum: f32 = frame
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
                    .sum();
                sum / channels as f32
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// RMS level in dB relative to full scale, or `None` for silence.
    pub fn rms_dbfs(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let mean_sq = self
            .samples
            .iter()
            .map(|&s| (s as f64) * (s as f64))
            .sum::<f64>()
            / self.samples.len() as f64;
        if mean_sq == 0.0 {
            return None;
        }
        Some((10.0 * mean_sq.log10()) as f32)
    }

    /// Converts to `target_rate` with an FFT resampler. The output holds
    /// `round(len * target_rate / sample_rate)` samples.
    pub fn resample(&self, target_rate: u32) -> Result<Waveform, RecognizeError> {
        if target_rate == 0 {
            return Err(RecognizeError::InvalidAudio("target rate is zero".into()));
        }
        if target_rate == self.sample_rate || self.samples.is_empty() {
            return Waveform::new(self.samples.clone(), target_rate);
        }

        let mut resampler = FftFixedInOut::<f32>::new(
            self.sample_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            1,
        )
        .map_err(|e| RecognizeError::InvalidAudio(e.to_string()))?;

        let delay = resampler.output_delay();
        let expected = ((self.samples.len() as u64 * target_rate as u64
            + self.sample_rate as u64 / 2)
            / self.sample_rate as u64) as usize;

        let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
        let mut pos = 0;
        // Keep feeding (zero-padded past the end) until the delayed tail is out.
        while out.len() < expected + delay {
            let need = resampler.input_frames_next();
            let mut chunk = vec![0.0f32; need];
            if pos < self.samples.len() {
                let end = (pos + need).min(self.samples.len());
                chunk[..end - pos].copy_from_slice(&self.samples[pos..end]);
            }
            pos += need;

            let input = vec![chunk];
            let processed = resampler
                .process(&input[..], None)
                .map_err(|e| RecognizeError::InvalidAudio(e.to_string()))?;
            out.extend_from_slice(&processed[0]);
        }
        out.drain(..delay);
        out.truncate(expected);

        Waveform::new(out, target_rate)
    }

    /// Applies gain so the RMS level becomes `target_dbfs`. With
    /// `increase_only`, loud audio is left untouched. Silence, and audio so
    /// quiet that the gain would overflow, is returned unchanged.
    pub fn normalize_volume(mut self, target_dbfs: f32, increase_only: bool) -> Self {
        let Some(current) = self.rms_dbfs() else {
            return self;
        };
        let change = target_dbfs - current;
        if increase_only && change < 0.0 {
            return self;
        }
        let gain = 10f32.powf(change / 20.0);
        if !gain.is_finite() {
            return self;
        }
        for s in &mut self.samples {
            *s *= gain;
        }
        self
    }

    /// Brings the waveform into the shape voice encoders expect:
    /// [`SAMPLE_RATE`] and at least [`TARGET_DBFS`] loudness.
    pub fn preprocess(&self) -> Result<Waveform, RecognizeError> {
        let wav = self.resample(SAMPLE_RATE)?;
        match wav.rms_dbfs() {
            Some(level) if level >= SILENCE_FLOOR_DBFS => {
                Ok(wav.normalize_volume(TARGET_DBFS, true))
            }
            level => Err(RecognizeError::NoFeatureDetected(format!(
                "silent audio (rms {level:?} dBFS)"
            ))),
        }
    }
}

/// Encodes one utterance into a speaker embedding.
///
/// Implemented by the speaker-encoder backend. Input is always a
/// preprocessed [`SAMPLE_RATE`] waveform.
pub trait VoiceEncoder: Send + Sync {
    fn embed_utterance(&self, wav: &Waveform) -> Result<Vec<f32>, RecognizeError>;
}

/// [`Extractor`] that preprocesses a waveform and encodes it.
pub struct VoiceExtractor<E> {
    encoder: E,
}

impl<E: VoiceEncoder> VoiceExtractor<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }
}

impl<E: VoiceEncoder> Extractor for VoiceExtractor<E> {
    type Input = Waveform;

    fn extract(&self, wav: &Waveform) -> Result<Vec<f32>, RecognizeError> {
        let prepared = wav.preprocess()?;
        debug!(
            input_rate = wav.sample_rate(),
            seconds = prepared.duration().as_secs_f32(),
            "voice: preprocessed utterance"
        );
        self.encoder.embed_utterance(&prepared)
    }
}

/// Recognizer bound to a voice encoder.
pub type VoiceRecognizer<E> = Recognizer<VoiceExtractor<E>>;

impl<E: VoiceEncoder> Recognizer<VoiceExtractor<E>> {
    /// Opens the voice store described by `cfg`.
    pub fn voice(cfg: &RecognizerConfig, encoder: E) -> Result<Self, RecognizeError> {
        Self::open(cfg, VoiceExtractor::new(encoder))
    }
}
