//! One-time nonce challenges for federated sign-in.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;

/// Length of the raw challenge string.
pub const NONCE_LENGTH: usize = 32;

/// Alphabet the raw challenge is sampled from.
const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-._";

/// Lowercase hex SHA-256 digest of a raw nonce.
///
/// This is the value a broker token embeds; the provider recomputes it
/// from the raw nonce during the final exchange.
pub fn hash_nonce(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut hashed = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hashed, "{byte:02x}");
    }
    hashed
}

/// A single-use challenge binding one federated attempt to its broker
/// token.
///
/// The raw value stays in memory for one round-trip: only the hash is
/// shown to the broker, and consuming the challenge with
/// [`into_raw`](Self::into_raw) is the only way to read the raw value
/// back out. It never appears in the `Debug` output and must never be
/// logged or persisted.
pub struct NonceChallenge {
    raw: String,
    hashed: String,
}

impl NonceChallenge {
    /// Generate a fresh challenge.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let raw: String = (0..NONCE_LENGTH)
            .map(|_| {
                let index = rng.gen_range(0..CHARSET.len());
                CHARSET[index] as char
            })
            .collect();
        let hashed = hash_nonce(&raw);
        Self { raw, hashed }
    }

    /// The hashed challenge, safe to hand to the broker and to log.
    pub fn hashed(&self) -> &str {
        &self.hashed
    }

    /// Consume the challenge and release the raw value for the final
    /// provider exchange.
    pub fn into_raw(self) -> String {
        self.raw
    }
}

impl fmt::Debug for NonceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceChallenge")
            .field("raw", &"<redacted>")
            .field("hashed", &self.hashed)
            .finish()
    }
}
