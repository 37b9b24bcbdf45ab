//! Face detection / embedding collaborator.
//!
//! facefind does not ship a detector or an embedding model. Anything that can find a
//! face in raw image bytes and turn it into a fixed-length vector plugs in through
//! [`FaceEmbedder`]: an MTCNN + FaceNet pipeline, a remote inference service, or a
//! test stub.

use thiserror::Error;

/// Failure reported by a [`FaceEmbedder`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct EmbedderError(pub String);

impl EmbedderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// External face detector + embedding model.
///
/// `detect_face` returning `Ok(None)` means "no face in this image". That is a normal
/// outcome, not an error: the builder skips the image and the query service answers
/// with [`QueryOutcome::NoFaceDetected`](crate::query::QueryOutcome::NoFaceDetected).
pub trait FaceEmbedder: Send + Sync {
    /// Cropped / aligned face region handed from detection to embedding.
    type Face;

    fn detect_face(&self, image: &[u8]) -> Result<Option<Self::Face>, EmbedderError>;

    fn embed(&self, face: &Self::Face) -> Result<Vec<f32>, EmbedderError>;
}
