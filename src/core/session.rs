//! Per-process session token

use rand::Rng;
use std::fmt;
use std::sync::OnceLock;

const SESSION_ALPHABET: &[u8] = b"0123456789abcdef";
pub const SESSION_ID_LEN: usize = 8;

static CURRENT: OnceLock<SessionId> = OnceLock::new();

/// Short random token that correlates every record emitted by one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh token.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..SESSION_ID_LEN)
            .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
            .collect();
        SessionId(token)
    }

    /// The token for this process, generated on first use.
    pub fn current() -> &'static SessionId {
        CURRENT.get_or_init(SessionId::generate)
    }

    /// Use a fixed token. Intended for tests and replay tooling.
    pub fn from_token(token: impl Into<String>) -> Self {
        SessionId(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
