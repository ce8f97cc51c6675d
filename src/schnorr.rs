//! Schnorr signatures over 32 byte message digests.
//!
//! A signature is the x coordinate of a nonce point `R`, whose y coordinate
//! is a square, along with a scalar `s` such that `s * G = R + e * P`, where
//! the challenge is `e = SHA256(R.x || P || m)`, with `P` compressed.
//! Nonces are deterministic, derived from the key and the message.
use k256::{AffinePoint, ProjectivePoint, Scalar};
use log::trace;
use magikitten::Transcript;
use zeroize::Zeroizing;

use crate::{
    constants::{MESSAGE_SIZE, SIGNATURE_SIZE},
    curve,
    error::{Error, Result},
    keys::{KeyMaterial, PublicKey},
};

const NONCE_TAG: &[u8] = b"cait-zkp v0.1.0 schnorr nonce";

const BATCH_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 schnorr batch";
const SIGNATURE_LABEL: &[u8] = b"signature";
const MESSAGE_LABEL: &[u8] = b"message";
const PUBLIC_KEY_LABEL: &[u8] = b"public key";
const WEIGHTS_LABEL: &[u8] = b"weights";

/// A Schnorr signature, `R.x || s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: Scalar,
}

impl Signature {
    pub(crate) fn new(r: [u8; 32], s: Scalar) -> Self {
        Self { r, s }
    }

    /// Parse the 64 byte form of a signature.
    ///
    /// Only the encoding is checked here: whether `R.x` is a valid coordinate
    /// is a matter for verification.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::length("signature", SIGNATURE_SIZE, bytes.len()))?;
        let mut r = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        let mut s = [0u8; 32];
        s.copy_from_slice(&bytes[32..]);
        let s = curve::scalar_from_bytes(&s).ok_or(Error::InvalidScalar)?;
        Ok(Self { r, s })
    }

    pub fn serialize(&self) -> [u8; SIGNATURE_SIZE] {
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&curve::scalar_to_bytes(&self.s));
        out
    }

    pub(crate) fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub(crate) fn s(&self) -> &Scalar {
        &self.s
    }
}

/// A signature, along with whether its nonce had to be negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOutput {
    pub signature: Signature,
    /// Whether `k * G` had a non square y, so that `-k` was used instead.
    pub nonce_is_negated: bool,
}

/// Calculate the challenge `e` for a nonce, public key, and message.
pub(crate) fn challenge(r: &[u8; 32], public: &PublicKey, msg32: &[u8]) -> Scalar {
    curve::hash_to_scalar(&[&r[..], &public.to_compressed()[..], msg32])
}

fn check_message(msg32: &[u8]) -> Result<()> {
    if msg32.len() != MESSAGE_SIZE {
        return Err(Error::length("message", MESSAGE_SIZE, msg32.len()));
    }
    Ok(())
}

/// Sign a message digest, reporting whether the nonce was negated.
pub fn sign_detailed(msg32: &[u8], key: &KeyMaterial) -> Result<SignOutput> {
    check_message(msg32)?;
    let secret = key.secret_bytes();
    let digest = Zeroizing::new(curve::sha256(&[NONCE_TAG, &secret[..], msg32]));
    let mut k = Zeroizing::new(curve::reduce_bytes(&digest));
    if bool::from(k.is_zero()) {
        return Err(Error::ProofFailed("derived a zero nonce".to_owned()));
    }

    let big_r = (ProjectivePoint::GENERATOR * *k).to_affine();
    let nonce_is_negated = !curve::has_quad_y(&big_r);
    if nonce_is_negated {
        *k = -*k;
    }
    let r = curve::x_bytes(&big_r);
    let e = challenge(&r, &key.public_key(), msg32);
    let s = *k + e * key.scalar();

    Ok(SignOutput {
        signature: Signature { r, s },
        nonce_is_negated,
    })
}

/// Sign a 32 byte message digest.
///
/// This only fails if the message has the wrong length.
pub fn sign(msg32: &[u8], key: &KeyMaterial) -> Result<Signature> {
    Ok(sign_detailed(msg32, key)?.signature)
}

/// Verify a signature on a message digest.
#[must_use]
pub fn verify(signature: &Signature, msg32: &[u8], public: &PublicKey) -> bool {
    if msg32.len() != MESSAGE_SIZE {
        return false;
    }
    let e = challenge(&signature.r, public, msg32);
    let big_r = (ProjectivePoint::GENERATOR * signature.s - public.to_projective() * e).to_affine();
    if big_r == AffinePoint::IDENTITY || !curve::has_quad_y(&big_r) {
        return false;
    }
    curve::x_bytes(&big_r) == signature.r
}

/// Verify many signatures at once.
///
/// This checks a random linear combination of the verification equations,
/// with the weights derived from all the inputs. An empty batch is valid,
/// while lists of different lengths, or any malformed element, are not.
#[must_use]
pub fn verify_batch(signatures: &[Signature], messages: &[&[u8]], publics: &[PublicKey]) -> bool {
    if signatures.len() != messages.len() || signatures.len() != publics.len() {
        return false;
    }
    if signatures.is_empty() {
        return true;
    }
    if messages.iter().any(|m| m.len() != MESSAGE_SIZE) {
        return false;
    }

    let mut transcript = Transcript::new(BATCH_PROTOCOL);
    for ((signature, message), public) in signatures.iter().zip(messages).zip(publics) {
        transcript.message(SIGNATURE_LABEL, &signature.serialize());
        transcript.message(MESSAGE_LABEL, message);
        transcript.message(PUBLIC_KEY_LABEL, &public.to_compressed());
    }
    let mut weights = transcript.challenge(WEIGHTS_LABEL);

    let mut s_sum = Scalar::ZERO;
    let mut rhs = ProjectivePoint::IDENTITY;
    for (i, ((signature, message), public)) in
        signatures.iter().zip(messages).zip(publics).enumerate()
    {
        let a = if i == 0 {
            Scalar::ONE
        } else {
            Scalar::generate_biased(&mut weights)
        };
        let Some(big_r) = curve::lift_x_quad(&signature.r) else {
            trace!("signature {i} in batch has an invalid nonce");
            return false;
        };
        let e = challenge(&signature.r, public, message);
        s_sum += a * signature.s;
        rhs += (ProjectivePoint::from(big_r) + public.to_projective() * e) * a;
    }

    ProjectivePoint::GENERATOR * s_sum == rhs
}
