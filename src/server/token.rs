//! Single-use callback authorization tokens
//!
//! Every outbound x-callback-url embeds a freshly issued token; an inbound
//! callback is only honored if it presents one that has not been consumed
//! yet. Tokens never expire on their own: one that is issued but never
//! redeemed lives until the registry is dropped with its server.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_SEED_PREFIX: &str = "CallbackServer";

pub struct TokenRegistry {
    tokens: Mutex<HashSet<String>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
        }
    }

    /// Issue a fresh token and remember it until it is consumed.
    pub fn issue(&self) -> String {
        // Random salt keeps two issuances within the same millisecond distinct.
        let salt: u64 = rand::thread_rng().gen();
        let seed = format!(
            "{}_{}_{:016x}",
            TOKEN_SEED_PREFIX,
            Utc::now().timestamp_millis(),
            salt
        );
        let token = uuid_from_seed(&seed);
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(token.clone());
        }
        token
    }

    /// Check-and-consume: returns `true` and removes the token if and only
    /// if it is currently registered. A missing or unknown token makes no
    /// mutation. The presence check and the removal are a single
    /// `HashSet::remove` under the lock, so a token can never be consumed
    /// twice even by racing requests.
    pub fn consume(&self, token: Option<&str>) -> bool {
        match token {
            Some(t) if !t.is_empty() => self
                .tokens
                .lock()
                .map(|mut tokens| tokens.remove(t))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Hash a seed string into a UUID-shaped lowercase hex value.
fn uuid_from_seed(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let hex = hex::encode(&digest[..16]);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
