use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::{Hasher, Result, Sha1Hasher, Sha256Hasher, Sha512Hasher, VerificationError};

/// Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
            Algorithm::Sha512 => 64,
        }
    }

    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha1 => run(Sha1Hasher::new(), data),
            Algorithm::Sha256 => run(Sha256Hasher::new(), data),
            Algorithm::Sha512 => run(Sha512Hasher::new(), data),
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Algorithm::Sha1),
            64 => Some(Algorithm::Sha256),
            128 => Some(Algorithm::Sha512),
            _ => None,
        }
    }
}

fn run(mut hasher: impl Hasher, data: &[u8]) -> Vec<u8> {
    hasher.update(data);
    hasher.finalize()
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// A provider-declared content digest.
///
/// Two textual forms are understood:
/// - bare hex, where the length selects the algorithm (npm `shasum` is
///   40-char SHA-1 hex)
/// - Subresource Integrity, `<algo>-<base64>` (npm `integrity`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: Algorithm,
    expected:  Vec<u8>,
}

impl Digest {
    pub fn new(algorithm: Algorithm, expected: Vec<u8>) -> Self { Self { algorithm, expected } }

    pub fn algorithm(&self) -> Algorithm { self.algorithm }

    pub fn expected(&self) -> &[u8] { &self.expected }

    /// Parse a hex digest or an SRI value.
    ///
    /// An SRI value may list several space-separated hashes; the strongest
    /// supported one is kept and unsupported or malformed entries are
    /// skipped as long as one usable entry remains.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(malformed(raw, "empty digest"));
        }
        if !raw.contains('-') {
            return parse_hex(raw);
        }

        let mut strongest: Option<Self> = None;
        let mut first_error = None;
        for token in raw.split_whitespace() {
            match parse_sri(token) {
                Ok(digest) => {
                    if strongest
                        .as_ref()
                        .is_none_or(|current| digest.algorithm > current.algorithm)
                    {
                        strongest = Some(digest);
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match (strongest, first_error) {
            (Some(digest), _) => Ok(digest),
            (None, Some(e)) => Err(e),
            (None, None) => Err(malformed(raw, "empty digest")),
        }
    }

    /// Hash `data` and compare it against the declared digest.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = self.algorithm.hash(data);
        if actual == self.expected {
            Ok(())
        } else {
            Err(VerificationError::Mismatch {
                algorithm: self.algorithm.name(),
                expected:  hex::encode(&self.expected),
                actual:    hex::encode(actual),
            })
        }
    }
}

impl FromStr for Digest {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

fn parse_hex(raw: &str) -> Result<Digest> {
    let algorithm =
        Algorithm::from_hex_len(raw.len()).ok_or_else(|| malformed(raw, "unexpected hex length"))?;
    let expected = hex::decode(raw).map_err(|_| malformed(raw, "invalid hex"))?;
    Ok(Digest { algorithm, expected })
}

// `<algo>-<base64>[?options]`
fn parse_sri(token: &str) -> Result<Digest> {
    let (algo, rest) = token
        .split_once('-')
        .ok_or_else(|| malformed(token, "missing algorithm prefix"))?;
    let algorithm = match algo.to_ascii_lowercase().as_str() {
        "sha1" => Algorithm::Sha1,
        "sha256" => Algorithm::Sha256,
        "sha512" => Algorithm::Sha512,
        other => return Err(VerificationError::UnsupportedAlgorithm(other.to_string())),
    };
    let encoded = rest.split_once('?').map_or(rest, |(encoded, _)| encoded);
    let expected = STANDARD
        .decode(encoded)
        .map_err(|_| malformed(token, "invalid base64"))?;
    if expected.len() != algorithm.output_len() {
        return Err(malformed(token, "digest length does not match algorithm"));
    }
    Ok(Digest { algorithm, expected })
}

fn malformed(raw: &str, reason: &'static str) -> VerificationError {
    VerificationError::Malformed {
        digest: raw.to_string(),
        reason,
    }
}
