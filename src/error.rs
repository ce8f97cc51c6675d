//! Errors surfaced by this crate.
//!
//! Only contract violations become errors. A proof that fails to verify,
//! or a commitment that fails to parse, is reported through `false` or `None`
//! instead, since probing with bad data is a routine thing to do.
use thiserror::Error;

use crate::musig::SessionStage;

/// Represents an error from one of the primitives in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("blinding factor must be 32 bytes, found {0}")]
    InvalidBlindLength(usize),
    #[error("{what} must be {expected} bytes, found {found}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("scalar is zero or not below the curve order")]
    InvalidScalar,
    #[error("bytes do not encode a valid curve point")]
    InvalidPoint,
    #[error("bad parameters: {0}")]
    BadParameters(String),
    #[error("message is {found} bytes, at most {max} are allowed")]
    MessageTooLong { max: usize, found: usize },
    #[error("proof construction failed: {0}")]
    ProofFailed(String),
    #[error("randomness source failed: {0}")]
    Randomness(String),
    #[error("musig: {0}")]
    MuSig(#[from] MuSigError),
}

impl Error {
    pub(crate) fn length(what: &'static str, expected: usize, found: usize) -> Self {
        Error::InvalidLength {
            what,
            expected,
            found,
        }
    }
}

/// Represents an error from the MuSig session state machine.
///
/// Any of these, apart from [`MuSigError::SessionAborted`] itself, move the
/// session into the aborted stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MuSigError {
    #[error("operation requires stage {expected}, but the session is at {found}")]
    InvalidState {
        expected: SessionStage,
        found: SessionStage,
    },
    #[error("nonce from signer {0} does not match its commitment")]
    NonceCommitmentMismatch(u32),
    #[error("no data for signer {0}")]
    MissingSigner(u32),
    #[error("signer {0} is not part of this session")]
    UnknownSigner(u32),
    #[error("signer {0} appears twice")]
    Duplicate(u32),
    #[error("verifier sessions hold no key and cannot sign")]
    NotASigner,
    #[error("session was aborted: {0}")]
    SessionAborted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
