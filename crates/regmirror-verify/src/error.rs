#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("checksum mismatch ({algorithm}): expected {expected}, got {actual}")]
    Mismatch {
        algorithm: &'static str,
        expected:  String,
        actual:    String,
    },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("malformed digest {digest:?}: {reason}")]
    Malformed { digest: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, VerificationError>;
