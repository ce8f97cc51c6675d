//! Range proofs, attesting that a committed value lies in some range.
//!
//! Two proving systems live here, behind the common [RangeProver] trait:
//!
//! - [RangeProof], the legacy Borromean ring signature construction, which
//! supports decimal exponents, embeds a large message, and can be *rewound*
//! by whoever knows the nonce, recovering the value and blinding factor.
//! - [BulletProof], which is much more compact, but can only be verified.
//!
//! In both cases, proving needs the value, blinding factor and commitment,
//! and verifying only needs the commitment, along with any extra commitment
//! bytes which were bound into the proof.
use serde::{Deserialize, Serialize};

use crate::{
    constants::MAX_PROOF_SIZE,
    error::{Error, Result},
    pedersen::{BlindingFactor, Commitment},
};

mod borromean;
mod bulletproof;
mod generators;
mod inner_product;

pub use borromean::RangeProof;
pub use bulletproof::BulletProof;
pub use generators::BulletproofGens;

/// An encoded range proof.
///
/// This is plain data: once created, a proof is never modified.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    bytes: Vec<u8>,
}

impl Proof {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Wrap proof bytes, rejecting anything longer than any proof can be.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_PROOF_SIZE {
            return Err(Error::length("proof", MAX_PROOF_SIZE, bytes.len()));
        }
        Ok(Self::new(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bytes this proof occupies.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proof").field("len", &self.len()).finish()
    }
}

/// The public parameters of a legacy range proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeInfo {
    /// The decimal exponent, or -1 for a proof of an exact value.
    pub exp: i8,
    /// The number of bits in the proven digits.
    pub mantissa: u8,
    pub min: u64,
    pub max: u64,
}

/// The information recovered by rewinding a proof.
///
/// When `success` is false, every other field is zeroed.
#[derive(Debug, Clone)]
pub struct ProofInfo {
    pub success: bool,
    pub value: u64,
    pub blind: BlindingFactor,
    pub message: Vec<u8>,
    pub min: u64,
    pub max: u64,
    pub exp: i8,
    pub mantissa: u8,
}

impl ProofInfo {
    pub(crate) fn failure() -> Self {
        Self {
            success: false,
            value: 0,
            blind: BlindingFactor::zero(),
            message: Vec::new(),
            min: 0,
            max: 0,
            exp: 0,
            mantissa: 0,
        }
    }
}

/// Everything needed to prove that a committed value is in range.
///
/// Only the value, blinding factor and commitment are required, the rest
/// of the fields have defaults, and can be set with the `with_` methods.
#[derive(Debug, Clone, Copy)]
pub struct ProveRequest<'a> {
    pub value: u64,
    pub blind: &'a BlindingFactor,
    pub commitment: &'a Commitment,
    /// The smallest value the proven range should include.
    pub min_value: u64,
    /// A message embedded into the proof.
    pub message: &'a [u8],
    /// Arbitrary bytes the proof gets bound to.
    pub extra_commit: &'a [u8],
    /// The nonce deriving the proof's randomness, defaulting to the blinding factor.
    pub nonce: Option<&'a [u8; 32]>,
    /// The nonce deriving the rewindable part of a bulletproof, defaulting to `nonce`.
    pub rewind_nonce: Option<&'a [u8; 32]>,
}

impl<'a> ProveRequest<'a> {
    pub fn new(value: u64, blind: &'a BlindingFactor, commitment: &'a Commitment) -> Self {
        Self {
            value,
            blind,
            commitment,
            min_value: 0,
            message: &[],
            extra_commit: &[],
            nonce: None,
            rewind_nonce: None,
        }
    }

    pub fn with_min_value(self, min_value: u64) -> Self {
        Self { min_value, ..self }
    }

    pub fn with_message(self, message: &'a [u8]) -> Self {
        Self { message, ..self }
    }

    pub fn with_extra_commit(self, extra_commit: &'a [u8]) -> Self {
        Self {
            extra_commit,
            ..self
        }
    }

    pub fn with_nonce(self, nonce: &'a [u8; 32]) -> Self {
        Self {
            nonce: Some(nonce),
            ..self
        }
    }

    pub fn with_rewind_nonce(self, rewind_nonce: &'a [u8; 32]) -> Self {
        Self {
            rewind_nonce: Some(rewind_nonce),
            ..self
        }
    }

    /// The nonce to use, falling back to the blinding factor.
    pub(crate) fn nonce_bytes(&self) -> zeroize::Zeroizing<[u8; 32]> {
        zeroize::Zeroizing::new(match self.nonce {
            Some(nonce) => *nonce,
            None => self.blind.to_bytes(),
        })
    }

    pub(crate) fn rewind_nonce_bytes(&self) -> zeroize::Zeroizing<[u8; 32]> {
        match self.rewind_nonce {
            Some(nonce) => zeroize::Zeroizing::new(*nonce),
            None => self.nonce_bytes(),
        }
    }
}

/// The contract shared by both range proving systems.
pub trait RangeProver {
    /// Prove that the committed value is at least `min_value`, and in range.
    ///
    /// If the commitment doesn't actually open to the value and blinding factor,
    /// this produces a proof which fails to verify, rather than an error.
    fn prove(&self, request: &ProveRequest<'_>) -> Result<Proof>;

    /// Verify a proof for a commitment.
    ///
    /// The proven range must start at or above `min_value`, and the proof must have
    /// been made with exactly the same `extra_commit` bytes.
    #[must_use]
    fn verify(
        &self,
        commitment: &Commitment,
        proof: &Proof,
        extra_commit: &[u8],
        min_value: u64,
    ) -> bool;
}
