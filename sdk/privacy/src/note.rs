//! Deposit Notes
//!
//! A deposit note is the caller-held secret material behind a pool deposit:
//!
//! ```text
//! commitment     = Poseidon(secret, nullifier)   (published at deposit)
//! nullifier_hash = Poseidon(nullifier)           (published at withdraw)
//! ```
//!
//! Notes travel as a versioned ASCII string,
//! `privacy-cash-note-v1-<base64url(JSON)>`, with big integers as decimal
//! strings. Losing the string means losing the deposit; the toolkit never
//! persists notes on the caller's behalf.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use veilkit_crypto::{poseidon_hash, poseidon_hash_single, CryptoError, FieldElement, Result};

/// Version prefix of the note string format.
pub const NOTE_PREFIX: &str = "privacy-cash-note-v1-";

/// A spendable deposit note.
///
/// Serde field names and declaration order define the wire JSON:
/// `{c, n, s, nu, a, t, ts, li?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositNote {
    /// Commitment, `Poseidon(secret, nullifier)`.
    #[serde(rename = "c")]
    pub commitment: FieldElement,
    /// Nullifier hash, `Poseidon(nullifier)`.
    #[serde(rename = "n")]
    pub nullifier_hash: FieldElement,
    /// Secret half of the commitment preimage.
    #[serde(rename = "s")]
    pub secret: FieldElement,
    /// Nullifier half of the commitment preimage.
    #[serde(rename = "nu")]
    pub nullifier: FieldElement,
    /// Denominated amount (display units, not base units).
    #[serde(rename = "a")]
    pub amount: f64,
    /// Token symbol, e.g. "SOL".
    #[serde(rename = "t")]
    pub token: String,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Position in the commitment tree, once known.
    #[serde(rename = "li", skip_serializing_if = "Option::is_none", default)]
    pub leaf_index: Option<u64>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Create a fresh note for `amount` of `token`.
///
/// Secret and nullifier are drawn uniformly from the field, so the collision
/// probability across N notes is bounded by N²/2P.
pub fn generate_deposit_note(amount: f64, token: &str) -> Result<DepositNote> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CryptoError::InvalidInput(format!(
            "note amount must be positive, got {amount}"
        )));
    }

    let secret = FieldElement::random();
    let nullifier = FieldElement::random();

    Ok(DepositNote {
        commitment: poseidon_hash(secret, nullifier)?,
        nullifier_hash: poseidon_hash_single(nullifier)?,
        secret,
        nullifier,
        amount,
        token: token.to_string(),
        timestamp: now_ms(),
        leaf_index: None,
    })
}

/// Recompute the commitment for a secret/nullifier pair.
pub fn regenerate_commitment(
    secret: FieldElement,
    nullifier: FieldElement,
) -> Result<FieldElement> {
    poseidon_hash(secret, nullifier)
}

/// True iff the note's commitment and nullifier hash match its preimages.
pub fn verify_note(note: &DepositNote) -> bool {
    let commitment_ok = poseidon_hash(note.secret, note.nullifier)
        .map(|c| c == note.commitment)
        .unwrap_or(false);
    let nullifier_ok = poseidon_hash_single(note.nullifier)
        .map(|h| h == note.nullifier_hash)
        .unwrap_or(false);
    commitment_ok && nullifier_ok
}

/// Encode a note as its versioned ASCII string.
pub fn encode_note(note: &DepositNote) -> Result<String> {
    let json = serde_json::to_vec(note)
        .map_err(|e| CryptoError::InvalidFormat(format!("note encode: {e}")))?;
    Ok(format!("{NOTE_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
}

/// Decode a note string produced by [`encode_note`].
pub fn decode_note(s: &str) -> Result<DepositNote> {
    let payload = s.strip_prefix(NOTE_PREFIX).ok_or_else(|| {
        CryptoError::InvalidFormat(format!("note string missing {NOTE_PREFIX:?} prefix"))
    })?;
    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| CryptoError::InvalidFormat(format!("note base64: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| CryptoError::InvalidFormat(format!("note fields: {e}")))
}
