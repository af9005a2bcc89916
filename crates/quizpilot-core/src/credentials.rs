//! Ordered API credentials with a rotating cursor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The credential currently in use.
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveCredential {
    pub key: String,
    /// Zero-based position in the ring.
    pub index: usize,
    pub total: usize,
}

impl ActiveCredential {
    /// One-based `#i/N` label for operators.
    pub fn ordinal(&self) -> String {
        format!("#{}/{}", self.index + 1, self.total)
    }
}

impl fmt::Debug for ActiveCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveCredential")
            .field("key", &"***")
            .field("index", &self.index)
            .field("total", &self.total)
            .finish()
    }
}

/// Ordered credential list plus the index of the one in use.
///
/// The cursor is always read modulo the ring length; an empty ring has no
/// active credential.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRing {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    cursor: usize,
}

impl CredentialRing {
    /// Build a ring from raw keys; blank entries are dropped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.into().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keys, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Index of the active credential, normalized into range.
    pub fn index(&self) -> usize {
        if self.keys.is_empty() {
            0
        } else {
            self.cursor % self.keys.len()
        }
    }

    pub fn current(&self) -> Option<ActiveCredential> {
        let index = self.index();
        self.keys.get(index).map(|key| ActiveCredential {
            key: key.clone(),
            index,
            total: self.keys.len(),
        })
    }

    /// Index the cursor would move to on rotation.
    pub fn next_index(&self) -> usize {
        if self.keys.is_empty() {
            0
        } else {
            (self.index() + 1) % self.keys.len()
        }
    }

    /// Move the cursor one position forward and return the new credential.
    pub fn advance(&mut self) -> Option<ActiveCredential> {
        self.cursor = self.next_index();
        self.current()
    }

    /// Replace every key and reset the cursor to the first one.
    pub fn replace<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self = Self::new(keys);
    }
}

impl fmt::Debug for CredentialRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRing")
            .field("keys", &format_args!("[{} masked]", self.keys.len()))
            .field("cursor", &self.index())
            .finish()
    }
}

/// Mask a credential for display, keeping a short prefix and suffix.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}
