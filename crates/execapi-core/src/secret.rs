use std::fmt;

use crate::error::{ExecapiError, Result};

/// Key value shipped in `config.json.sample`; a config still carrying it is
/// refused.
pub const PLACEHOLDER_KEY: &str = "EXECAPI_KEY_HERE";

/// The bearer token every run request must present.
#[derive(Clone)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(ExecapiError::MissingKey);
        }
        if key == PLACEHOLDER_KEY {
            return Err(ExecapiError::PlaceholderKey);
        }
        Ok(Self(key))
    }

    /// Exact comparison whose running time does not depend on where the
    /// candidate first differs.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
