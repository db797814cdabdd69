//! Tokenizer cache collaborator
//!
//! Tokenizing is a pure function of the source text, so the cache has no
//! consistency requirements: a miss re-tokenizes and racing writers store
//! equal values.

use super::Token;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

const KEY_PREFIX: &str = "filterscript-tokens:";

/// External store for tokenized rules, keyed by [`cache_key`]
pub trait TokenCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<Token>>;
    fn set(&self, key: &str, tokens: Vec<Token>);
}

/// Stable cache key for a rule's source text
pub fn cache_key(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(digest))
}

/// In-process cache, mainly for tests and single-process hosts
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: Mutex<HashMap<String, Vec<Token>>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, key: &str) -> Option<Vec<Token>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, tokens: Vec<Token>) {
        // A poisoned lock only costs us a future cache miss
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), tokens);
        }
    }
}
