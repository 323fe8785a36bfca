//! Face modality: decoded image frames in, one face embedding out.

use tracing::warn;

use crate::config::RecognizerConfig;
use crate::error::RecognizeError;
use crate::extractor::Extractor;
use crate::recognizer::Recognizer;

/// A decoded RGB8 image, row-major, 3 bytes per pixel.
///
/// Decoding from files or camera buffers happens outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageFrame {
    /// Wraps an RGB8 pixel buffer. The buffer must hold exactly
    /// `width * height * 3` bytes.
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RecognizeError> {
        if width == 0 || height == 0 {
            return Err(RecognizeError::InvalidInput(format!(
                "empty frame {width}x{height}"
            )));
        }
        let want = width as usize * height as usize * 3;
        if pixels.len() != want {
            return Err(RecognizeError::InvalidInput(format!(
                "frame {width}x{height} needs {want} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGB triple at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }
}

/// Detects faces in a frame and encodes each one.
///
/// Implemented by the face-encoding backend. Encodings are returned in
/// detection order; an empty result means no face was found.
pub trait FaceEncoder: Send + Sync {
    fn face_encodings(&self, frame: &ImageFrame) -> Result<Vec<Vec<f32>>, RecognizeError>;
}

/// What to do when a frame contains more than one face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultiFacePolicy {
    /// Use the first detected face and ignore the rest.
    #[default]
    First,
    /// Fail with [`RecognizeError::MultipleFaces`].
    Reject,
}

/// [`Extractor`] that yields one face embedding per frame.
pub struct FaceExtractor<E> {
    encoder: E,
    policy: MultiFacePolicy,
}

impl<E: FaceEncoder> FaceExtractor<E> {
    pub fn new(encoder: E) -> Self {
        Self::with_policy(encoder, MultiFacePolicy::default())
    }

    pub fn with_policy(encoder: E, policy: MultiFacePolicy) -> Self {
        Self { encoder, policy }
    }

    pub fn policy(&self) -> MultiFacePolicy {
        self.policy
    }
}

impl<E: FaceEncoder> Extractor for FaceExtractor<E> {
    type Input = ImageFrame;

    fn extract(&self, frame: &ImageFrame) -> Result<Vec<f32>, RecognizeError> {
        let mut faces = self.encoder.face_encodings(frame)?;
        match faces.len() {
            0 => Err(RecognizeError::NoFeatureDetected(format!(
                "no face in {}x{} frame",
                frame.width, frame.height
            ))),
            1 => Ok(faces.swap_remove(0)),
            n => match self.policy {
                MultiFacePolicy::First => {
                    warn!(faces = n, "face: multiple faces detected, using the first");
                    Ok(faces.swap_remove(0))
                }
                MultiFacePolicy::Reject => Err(RecognizeError::MultipleFaces(n)),
            },
        }
    }
}

/// Recognizer bound to a face encoder.
pub type FaceRecognizer<E> = Recognizer<FaceExtractor<E>>;

impl<E: FaceEncoder> Recognizer<FaceExtractor<E>> {
    /// Opens the face store described by `cfg`.
    pub fn face(cfg: &RecognizerConfig, encoder: E) -> Result<Self, RecognizeError> {
        Self::open(cfg, FaceExtractor::new(encoder))
    }
}
