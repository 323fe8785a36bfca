//! Face and voice enrollment and identification over an embedding store.
//!
//! A [`Recognizer`] binds an [`Extractor`] (raw sample -> embedding) to an
//! [`EmbeddingStore`](bioid_vecstore::EmbeddingStore) and a match threshold:
//!
//! ```text
//! raw input -> Extractor -> embedding -> store upsert / query
//!                                             |
//!                        ranked (label, distance) matches
//!                                             |
//!                 distance <= threshold ? Known(label) : Unknown
//! ```
//!
//! # Modalities
//!
//! - [`FaceRecognizer`]: [`ImageFrame`] in, via a [`FaceEncoder`] backend
//! - [`VoiceRecognizer`]: [`Waveform`] in, via a [`VoiceEncoder`] backend
//! - `Recognizer<Precomputed>`: embeddings computed elsewhere
//!
//! Each modality owns its own store, so the same label may be enrolled
//! for face and voice independently.
//!
//! # Usage
//!
//! ```no_run
//! use bioid_recognizer::{FaceEncoder, FaceRecognizer, ImageFrame, RecognizeError, RecognizerConfig};
//!
//! struct MyEncoder;
//!
//! impl FaceEncoder for MyEncoder {
//!     fn face_encodings(&self, frame: &ImageFrame) -> Result<Vec<Vec<f32>>, RecognizeError> {
//!         unimplemented!()
//!     }
//! }
//!
//! # fn main() -> Result<(), RecognizeError> {
//! # let (a1, a2, b) = (ImageFrame::from_rgb8(1, 1, vec![0; 3])?, ImageFrame::from_rgb8(1, 1, vec![0; 3])?, ImageFrame::from_rgb8(1, 1, vec![0; 3])?);
//! let faces = FaceRecognizer::face(&RecognizerConfig::face(), MyEncoder)?;
//! faces.add("arnold", &a1)?;
//! faces.add("silvester", &b)?;
//! println!("{}", faces.predict(&a2)?);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod extractor;
mod face;
mod recognizer;
mod voice;

pub use bioid_vecstore::Match;
pub use config::{default_store_dir, RecognizerConfig, DEFAULT_MATCH_THRESHOLD};
pub use error::RecognizeError;
pub use extractor::{Extractor, Precomputed};
pub use face::{FaceEncoder, FaceExtractor, FaceRecognizer, ImageFrame, MultiFacePolicy};
pub use recognizer::{Prediction, Recognizer, DEFAULT_TOP_K};
pub use voice::{VoiceEncoder, VoiceExtractor, VoiceRecognizer, Waveform, SAMPLE_RATE, TARGET_DBFS};
