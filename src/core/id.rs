use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::core::{Result, StoreError};

/// Length of the raw identifier in bytes.
pub const ID_RAW_LEN: usize = 12;

/// Length of the hex string encoding.
pub const ID_HEX_LEN: usize = 24;

lazy_static! {
    // Per-process entropy and insert counter for identifier generation.
    // The counter starts at a random offset so two processes started in
    // the same second still diverge.
    static ref PROCESS_ENTROPY: [u8; 5] = {
        let bytes = *uuid::Uuid::new_v4().as_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
    };
    static ref ID_COUNTER: AtomicU32 = {
        let bytes = *uuid::Uuid::new_v4().as_bytes();
        AtomicU32::new(u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]))
    };
}

/// Store-native record identifier.
///
/// 12 raw bytes: a 4-byte big-endian creation timestamp (unix seconds),
/// 5 bytes of per-process entropy, and a 3-byte monotonically increasing
/// counter. Round-trips losslessly through a 24-character lowercase hex
/// token, which is the only form callers ever see.
///
/// # Examples
///
/// ```
/// use taskstore::DocumentId;
///
/// let id = DocumentId::generate();
/// let token = id.to_hex();
/// assert_eq!(token.len(), 24);
/// assert_eq!(DocumentId::parse_str(&token).unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId([u8; ID_RAW_LEN]);

impl DocumentId {
    /// Generate a fresh identifier.
    ///
    /// Assigned by the store on insert; callers never mint identifiers
    /// for records themselves.
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp().max(0) as u32;
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let count_bytes = counter.to_be_bytes();

        let mut raw = [0u8; ID_RAW_LEN];
        raw[0..4].copy_from_slice(&seconds.to_be_bytes());
        raw[4..9].copy_from_slice(&*PROCESS_ENTROPY);
        // Low 3 bytes of the counter; wraps after 2^24 inserts per second.
        raw[9..12].copy_from_slice(&count_bytes[1..4]);

        Self(raw)
    }

    /// Parse an identifier from its hex token form.
    ///
    /// This is an explicit parse result, not control flow by exception:
    /// a malformed token yields `StoreError::InvalidIdentifier` and the
    /// caller decides whether to surface or fold it.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskstore::DocumentId;
    ///
    /// assert!(DocumentId::parse_str("000102030405060708090a0b").is_ok());
    /// assert!(DocumentId::parse_str("not-a-valid-identifier!!").is_err());
    /// assert!(DocumentId::parse_str("abc").is_err());
    /// ```
    pub fn parse_str(token: &str) -> Result<Self> {
        if token.len() != ID_HEX_LEN {
            return Err(StoreError::InvalidIdentifier(format!(
                "expected {} hex characters, got {}",
                ID_HEX_LEN,
                token.len()
            )));
        }

        let mut raw = [0u8; ID_RAW_LEN];
        for (i, chunk) in token.as_bytes().chunks(2).enumerate() {
            let hi = hex_nibble(chunk[0]);
            let lo = hex_nibble(chunk[1]);
            match (hi, lo) {
                (Some(h), Some(l)) => raw[i] = (h << 4) | l,
                _ => {
                    return Err(StoreError::InvalidIdentifier(format!(
                        "non-hex character in token '{}'",
                        token
                    )));
                }
            }
        }

        Ok(Self(raw))
    }

    /// The 24-character lowercase hex token for this identifier.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(ID_HEX_LEN);
        for byte in &self.0 {
            out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            out.push(char::from_digit((byte & 0x0f) as u32, 16).unwrap_or('0'));
        }
        out
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; ID_RAW_LEN] {
        &self.0
    }

    /// Creation time encoded in the identifier (unix seconds).
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for DocumentId {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_round_trips() {
        let id = DocumentId::generate();
        let token = id.to_hex();

        assert_eq!(token.len(), ID_HEX_LEN);
        assert_eq!(DocumentId::parse_str(&token).unwrap(), id);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(DocumentId::generate()));
        }
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(DocumentId::parse_str("").is_err());
        assert!(DocumentId::parse_str("abc123").is_err());
        assert!(DocumentId::parse_str(&"a".repeat(25)).is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert!(DocumentId::parse_str("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
        assert!(DocumentId::parse_str("0102030405060708090a0b0!").is_err());
    }

    #[test]
    fn test_parse_accepts_mixed_case() {
        let lower = DocumentId::parse_str("0a1b2c3d4e5f607182930a1b").unwrap();
        let upper = DocumentId::parse_str("0A1B2C3D4E5F607182930A1B").unwrap();
        assert_eq!(lower, upper);
        // Output is always normalized to lowercase.
        assert_eq!(upper.to_hex(), "0a1b2c3d4e5f607182930a1b");
    }

    #[test]
    fn test_timestamp_is_embedded() {
        let before = Utc::now().timestamp() as u32;
        let id = DocumentId::generate();
        let after = Utc::now().timestamp() as u32;

        assert!(id.timestamp_secs() >= before);
        assert!(id.timestamp_secs() <= after);
    }
}
