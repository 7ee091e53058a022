use std::collections::HashSet;

use crate::engine::PATTERN_LEN;
use crate::errors::FlowPatchError;

pub type Signature = [u8; PATTERN_LEN];

/// Status line of the responses the fs-watch handler answers.
pub const HTTP_OK_SIGNATURE: &Signature = b"HTTP/1.1 200 OK";

/// Set of fixed-length prefixes worth sending to the dispatcher.
///
/// Only a cheap gate in front of the registry lookup: a miss skips the packet,
/// a hit still needs a registration to do anything.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    signatures: HashSet<Signature>,
}

impl PatternSet {
    pub fn new() -> Self {
        PatternSet {
            signatures: HashSet::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.insert(*HTTP_OK_SIGNATURE);
        set
    }

    pub fn from_strings<I, S>(patterns: I) -> Result<Self, FlowPatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for p in patterns {
            set.insert_str(p.as_ref())?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, signature: Signature) -> bool {
        self.signatures.insert(signature)
    }

    pub fn insert_str(&mut self, pattern: &str) -> Result<bool, FlowPatchError> {
        let signature: Signature =
            pattern
                .as_bytes()
                .try_into()
                .map_err(|_| FlowPatchError::InvalidPattern {
                    pattern: pattern.to_string(),
                    expected: PATTERN_LEN,
                    actual: pattern.len(),
                })?;
        Ok(self.insert(signature))
    }

    /// True if the first `PATTERN_LEN` bytes of `window` are a known signature.
    pub fn matches(&self, window: &[u8]) -> bool {
        match window.get(..PATTERN_LEN) {
            Some(prefix) => {
                let mut sig = [0u8; PATTERN_LEN];
                sig.copy_from_slice(prefix);
                self.signatures.contains(&sig)
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
