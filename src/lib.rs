//! Cait-ZKP provides the primitives confidential transactions are built from,
//! over the secp256k1 curve.
//!
//! This includes:
//!
//! - Pedersen commitments, along with the algebra of their blinding factors.
//! - Range proofs, showing that a committed value lies in some range,
//! in two flavors: a legacy ring based proof, which can be rewound to recover
//! the value, and the much smaller Bulletproofs.
//! - Schnorr signatures, with batch verification.
//! - MuSig, letting several signers produce a single Schnorr signature.
//! - MLSAG ring signatures, showing that a transaction balances, and that
//! the signer owns one of several keys, without revealing which.
//!
//! # Warning
//!
//! This is experimental cryptographic software, unless you're a cat with
//! a megaphone on top of a giant Moogle I would exercise caution.
//!
//! - This library has not undergone any form of audit.
//! - The byte layouts of proofs are specific to this library.
//!
//! # Commitments
//!
//! A commitment to a value `v` with a blinding factor `r` is the point:
//! ```ignore
//! v * H + r * G
//! ```
//! where `G` is the standard generator, and `H` is another generator,
//! with nobody knowing its discrete logarithm relative to `G`.
//! Commitments can be added together, and the result commits to the sum
//! of the values, with the sum of the blinding factors.
//! This is what lets a transaction prove that its inputs and outputs balance,
//! by checking [verify_commit_sum], as long as the blinding factors do too,
//! which [blind_sum] takes care of.
//!
//! Commitments are serialized in 33 bytes, with a prefix of `0x08` or `0x09`,
//! depending on whether or not the y coordinate is a square.
//!
//! # Range Proofs
//!
//! Since values live modulo the order of the curve, a negative value can
//! masquerade as a large one, so each output needs a proof that its value lies
//! in a small range. Both kinds of proofs implement the [RangeProver] trait:
//! ```ignore
//! pub trait RangeProver {
//!     fn prove(&self, request: &ProveRequest) -> Result<Proof>;
//!     fn verify(&self, commitment: &Commitment, proof: &Proof, extra_commit: &[u8], min_value: u64) -> bool;
//! }
//! ```
//!
//! # Signing Sessions
//!
//! MuSig signing involves several rounds of communication between signers.
//! A [MuSigSession] tracks which round a given signer is at, and refuses
//! to do anything out of order, aborting the session instead.
//!
//! It's important that a session id is **never** reused with the same key.
mod config;
mod constants;
mod crypto;
mod curve;
mod error;
mod keys;
mod math;
pub mod mlsag;
pub mod musig;
mod participants;
mod pedersen;
pub mod rangeproof;
pub mod schnorr;
mod serde;
#[cfg(test)]
mod test;

pub use config::{BulletProofConfig, RangeProofConfig};
pub use constants::*;
pub use crypto::Digest;
pub use error::{Error, MuSigError, Result};
pub use keys::{ecdsa_verify, KeyMaterial, PublicKey};
pub use musig::{MuSigSession, PartialSignature, SessionStage};
pub use pedersen::{
    blind_sum, blind_switch, commit, commit_bytes, commit_sum, verify_commit_sum, BlindingFactor,
    Commitment, ParsedCommitment,
};
pub use rangeproof::{
    BulletProof, BulletproofGens, Proof, ProofInfo, ProveRequest, RangeInfo, RangeProof,
    RangeProver,
};
