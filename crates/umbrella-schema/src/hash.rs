use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 content hash (64 lowercase hex characters).
///
/// Used as the identity of input archives when deciding whether a variant
/// needs to be merged again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a `ContentHash` without validation (for stored stamps).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Create a validated `ContentHash` (64 hex characters).
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not exactly 64 ASCII hex characters.
    pub fn validated(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_lowercase()))
        } else {
            Err(format!("Invalid SHA256 hash: expected 64 hex chars, got '{s}'"))
        }
    }

    /// Hash a byte slice.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Hash a file, streaming its contents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn compute_file(path: &std::path::Path) -> std::io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
