//! Login challenge parsing and solving.
//!
//! The gateway issues one of two challenge shapes on `login_sid.lua`:
//!
//! ```text
//! Legacy (MD5):        1234567z
//! Iterated (PBKDF2):   2$<iter1>$<salt1>$<iter2>$<salt2>
//! ```
//!
//! [`Challenge::parse`] classifies the raw string exactly once; callers then
//! dispatch on the variant through [`Challenge::solve`].
//!
//! # Legacy Response
//!
//! `<challenge>-<md5hex>` where the MD5 digest is computed over the UTF-16LE
//! bytes of `<challenge>-<password>`. Code points above U+00FF are replaced
//! with `.` before encoding, as FRITZ!OS does.
//!
//! # Iterated Response
//!
//! `<salt2>$<hash2>` where
//!
//! ```text
//! hash1 = H(key = password, salt1, iter1)
//! hash2 = H(key = hash1,    salt2, iter2)
//! ```
//!
//! and `H` is the iterated HMAC-SHA256 construction: the first block is
//! `HMAC(key, salt || 00000001)`, every following block is the HMAC of the
//! previous one, and all blocks are XOR-accumulated into the output.
//!
//! # Example
//!
//! ```
//! use fritz_protocol::Challenge;
//!
//! let challenge = Challenge::parse("2$10000$5A1711$2000$5A1722").unwrap();
//! assert!(challenge.is_iterated());
//!
//! let response = challenge.solve("1example!").unwrap();
//! assert_eq!(
//!     response,
//!     "5A1722$1798a1672bca7c6463d6b245f82b53703b0f50813401b03e4045a5861e689adb"
//! );
//! ```

use fritz_core::{
    Error, Result,
    constants::{
        CHALLENGE_SEPARATOR, ITERATED_CHALLENGE_FIELDS, ITERATED_CHALLENGE_PREFIX,
        LEGACY_REPLACEMENT_CHAR,
    },
};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 output size in bytes.
const HASH_LEN: usize = 32;

/// Server-issued login challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// MD5 challenge; the whole string is salt material.
    Legacy(String),

    /// Two-stage PBKDF2 challenge.
    Iterated(IteratedChallenge),
}

/// Decoded fields of a `2$...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratedChallenge {
    pub iter1: u32,
    pub salt1: Vec<u8>,
    pub iter2: u32,
    pub salt2: Vec<u8>,
    /// `salt2` exactly as sent, echoed back in the response.
    salt2_hex: String,
}

impl Challenge {
    /// Classify and decode a raw challenge string.
    ///
    /// # Errors
    /// For `2$` challenges:
    /// - `Error::InvalidFormat` on a wrong field count, a non-numeric
    ///   iteration count or a salt that is not even-length hex
    /// - `Error::OutOfRange` on an iteration count below 1
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with(ITERATED_CHALLENGE_PREFIX) {
            IteratedChallenge::parse(raw).map(Challenge::Iterated)
        } else {
            Ok(Challenge::Legacy(raw.to_string()))
        }
    }

    /// Returns `true` for PBKDF2 challenges.
    #[must_use]
    pub fn is_iterated(&self) -> bool {
        matches!(self, Challenge::Iterated(_))
    }

    /// Compute the login response for `password`.
    ///
    /// # Errors
    /// Returns an error only if the HMAC primitive rejects a key, which
    /// cannot happen for HMAC-SHA256.
    pub fn solve(&self, password: &str) -> Result<String> {
        match self {
            Challenge::Legacy(challenge) => Ok(solve_legacy(challenge, password)),
            Challenge::Iterated(challenge) => challenge.solve(password),
        }
    }
}

impl IteratedChallenge {
    fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(CHALLENGE_SEPARATOR).collect();
        if fields.len() != ITERATED_CHALLENGE_FIELDS {
            return Err(Error::InvalidFormat(format!(
                "iterated challenge must have {ITERATED_CHALLENGE_FIELDS} fields, got {}",
                fields.len()
            )));
        }

        Ok(IteratedChallenge {
            iter1: parse_iterations(fields[1])?,
            salt1: parse_salt(fields[2])?,
            iter2: parse_iterations(fields[3])?,
            salt2: parse_salt(fields[4])?,
            salt2_hex: fields[4].to_string(),
        })
    }

    fn solve(&self, password: &str) -> Result<String> {
        let hash1 = iterated_hmac(password.as_bytes(), &self.salt1, self.iter1)?;
        let hash2 = iterated_hmac(&hash1, &self.salt2, self.iter2)?;
        Ok(format!(
            "{}{CHALLENGE_SEPARATOR}{}",
            self.salt2_hex,
            hex::encode(hash2)
        ))
    }
}

fn parse_iterations(field: &str) -> Result<u32> {
    let value: i64 = field
        .parse()
        .map_err(|_| Error::InvalidFormat(format!("iteration count {field:?} is not a number")))?;

    if value < 1 {
        return Err(Error::OutOfRange(format!(
            "iteration count must be positive, got {value}"
        )));
    }

    u32::try_from(value)
        .map_err(|_| Error::OutOfRange(format!("iteration count {value} is too large")))
}

fn parse_salt(field: &str) -> Result<Vec<u8>> {
    hex::decode(field).map_err(|e| Error::InvalidFormat(format!("salt {field:?}: {e}")))
}

/// Iterated HMAC-SHA256 with per-iteration XOR accumulation.
fn iterated_hmac(key: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; HASH_LEN]> {
    let keyed = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::InvalidFormat(format!("HMAC key rejected: {e}")))?;

    let mut mac = keyed.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());

    let mut block = [0u8; HASH_LEN];
    block.copy_from_slice(&mac.finalize().into_bytes());
    let mut output = block;

    for _ in 1..iterations {
        let mut mac = keyed.clone();
        mac.update(&block);
        block.copy_from_slice(&mac.finalize().into_bytes());

        for (out, b) in output.iter_mut().zip(block.iter()) {
            *out ^= b;
        }
    }

    Ok(output)
}

/// Solve a legacy MD5 challenge.
///
/// # Examples
///
/// ```
/// use fritz_protocol::challenge::solve_legacy;
///
/// assert_eq!(
///     solve_legacy("1234567z", "äbc"),
///     "1234567z-9e224a41eeefa284df7bb0f26c2913e2"
/// );
/// ```
#[must_use]
pub fn solve_legacy(challenge: &str, password: &str) -> String {
    let text = format!("{challenge}-{password}");

    let bytes: Vec<u8> = text
        .chars()
        .map(|c| {
            if u32::from(c) > 0xFF {
                LEGACY_REPLACEMENT_CHAR
            } else {
                c
            }
        })
        // Latin-1 only from here on, so every char is one UTF-16 unit.
        .flat_map(|c| (u32::from(c) as u16).to_le_bytes())
        .collect();

    let digest = Md5::digest(&bytes);
    format!("{challenge}-{}", hex::encode(digest))
}

/// Solve a `2$...` challenge.
///
/// # Errors
/// Same as [`Challenge::parse`]; additionally `Error::InvalidFormat` if the
/// string does not start with `2$`.
pub fn solve_iterated(challenge: &str, password: &str) -> Result<String> {
    if !challenge.starts_with(ITERATED_CHALLENGE_PREFIX) {
        return Err(Error::InvalidFormat(format!(
            "iterated challenge must start with {ITERATED_CHALLENGE_PREFIX:?}"
        )));
    }
    IteratedChallenge::parse(challenge)?.solve(password)
}
