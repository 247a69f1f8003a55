//! Veilkit Privacy SDK
//!
//! Note-based privacy primitives for shielded pools.
//!
//! ```text
//! deposit:                           withdraw:
//!   secret, nullifier ← random         note string ─▶ DepositNote
//!   commitment = H(secret, nullifier)  nullifier_hash published on-chain
//!   commitment ─▶ Merkle tree          Merkle proof against a known root
//!   note string ─▶ caller keeps it     note removed from the unspent set
//! ```
//!
//! The tree and the note scheme share one Poseidon parameter set (see
//! `veilkit-crypto`), so commitments inserted here verify against roots
//! computed anywhere else in the workspace.

pub mod merkle;
pub mod note;

pub use merkle::{MerkleProof, MerkleTree, DEFAULT_ROOT_HISTORY, DEFAULT_TREE_DEPTH};
pub use note::{
    decode_note, encode_note, generate_deposit_note, regenerate_commitment, verify_note,
    DepositNote, NOTE_PREFIX,
};
