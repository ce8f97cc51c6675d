//! Pedersen commitments, and the algebra of their blinding factors.
//!
//! A commitment to `value` with blinding factor `blind` is the point
//! `value * H + blind * G`. Commitments are additively homomorphic, which is
//! what lets a transaction prove that it balances: the sum of its outputs minus
//! the sum of its inputs is a commitment to zero exactly when the values cancel,
//! as long as the blinding factors were chosen to cancel as well.
use elliptic_curve::{Field, Group};
use k256::{AffinePoint, ProjectivePoint, Scalar};
use log::trace;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    constants::{BLIND_LENGTH, PEDERSEN_COMMITMENT_SIZE, PEDERSEN_COMMITMENT_SIZE_INTERNAL},
    curve,
    error::{Error, Result},
    keys::PublicKey,
};

const COMMITMENT_QUAD_TAG: u8 = 0x08;
const COMMITMENT_NON_QUAD_TAG: u8 = 0x09;

/// A secret scalar randomizing a commitment.
///
/// The scalar is wiped when this value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct BlindingFactor(Scalar);

impl BlindingFactor {
    /// The zero blinding factor, which makes for a commitment hiding nothing.
    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self(Scalar::random(rng))
    }

    /// Parse a blinding factor, which must be 32 bytes below the curve order.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; BLIND_LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::InvalidBlindLength(bytes.len()))?;
        curve::scalar_from_bytes(bytes)
            .map(Self)
            .ok_or(Error::InvalidScalar)
    }

    pub fn to_bytes(&self) -> [u8; BLIND_LENGTH] {
        curve::scalar_to_bytes(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero().into()
    }

    pub(crate) fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.0
    }
}

impl Zeroize for BlindingFactor {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for BlindingFactor {}

impl std::fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindingFactor(..)")
    }
}

/// The serialized, 33 byte form of a commitment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(
    #[serde(with = "commitment_bytes")] [u8; PEDERSEN_COMMITMENT_SIZE],
);

mod commitment_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::PEDERSEN_COMMITMENT_SIZE;

    pub fn serialize<S: Serializer>(
        bytes: &[u8; PEDERSEN_COMMITMENT_SIZE],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(bytes.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; PEDERSEN_COMMITMENT_SIZE], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("commitment must be 33 bytes"))
    }
}

impl Commitment {
    /// Wrap 33 bytes as a commitment, checking only their length.
    ///
    /// Whether the bytes actually encode a point is checked by [Commitment::parse].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| Error::length("commitment", PEDERSEN_COMMITMENT_SIZE, bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; PEDERSEN_COMMITMENT_SIZE] {
        &self.0
    }

    /// Parse this commitment into its point form.
    pub fn parse(&self) -> Option<ParsedCommitment> {
        let tag = self.0[0];
        if tag != COMMITMENT_QUAD_TAG && tag != COMMITMENT_NON_QUAD_TAG {
            return None;
        }
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.0[1..]);
        let point = curve::lift_x_quad(&x)?;
        if tag == COMMITMENT_QUAD_TAG {
            Some(ParsedCommitment(point))
        } else {
            Some(ParsedCommitment(-point))
        }
    }

    /// Reinterpret this commitment as a public key.
    ///
    /// This is a plain relabeling of the point. It only makes for a key someone
    /// can sign with when the commitment is to the value 0, in which case the
    /// blinding factor is the private key.
    pub fn to_public_key(&self) -> Option<PublicKey> {
        self.parse()?.to_public_key()
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment(")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A commitment in point form, which is what the algebra works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommitment(AffinePoint);

impl ParsedCommitment {
    /// Parse the 64 byte x || y internal form.
    pub fn from_internal(bytes: &[u8]) -> Result<Option<Self>> {
        let bytes: &[u8; PEDERSEN_COMMITMENT_SIZE_INTERNAL] = bytes.try_into().map_err(|_| {
            Error::length(
                "internal commitment",
                PEDERSEN_COMMITMENT_SIZE_INTERNAL,
                bytes.len(),
            )
        })?;
        Ok(curve::point_from_internal(bytes).map(Self))
    }

    pub fn to_internal(&self) -> [u8; PEDERSEN_COMMITMENT_SIZE_INTERNAL] {
        curve::point_to_internal(&self.0).unwrap_or([0u8; PEDERSEN_COMMITMENT_SIZE_INTERNAL])
    }

    pub(crate) fn from_point(point: &ProjectivePoint) -> Option<Self> {
        if point.is_identity().into() {
            return None;
        }
        Some(Self(point.to_affine()))
    }

    /// Serialize this commitment into its 33 byte form.
    pub fn serialize(&self) -> Option<Commitment> {
        let mut out = [0u8; PEDERSEN_COMMITMENT_SIZE];
        out[0] = if curve::has_quad_y(&self.0) {
            COMMITMENT_QUAD_TAG
        } else {
            COMMITMENT_NON_QUAD_TAG
        };
        out[1..].copy_from_slice(&curve::x_bytes(&self.0));
        Some(Commitment(out))
    }

    pub fn to_public_key(&self) -> Option<PublicKey> {
        PublicKey::from_point(&self.0.into())
    }

    pub fn to_projective(self) -> ProjectivePoint {
        self.0.into()
    }
}

/// Compute `value * H + blind * G` as a projective point.
pub(crate) fn commit_point(value: u64, blind: &Scalar) -> ProjectivePoint {
    curve::generator_h() * Scalar::from(value) + curve::generator_g() * blind
}

/// Commit to a value.
///
/// This only fails if the commitment is the identity, which means both
/// the value and the blinding factor are zero.
pub fn commit(value: u64, blind: &BlindingFactor) -> Option<Commitment> {
    ParsedCommitment::from_point(&commit_point(value, &blind.0))?.serialize()
}

/// Like [commit], but starting from raw bytes for the blinding factor.
pub fn commit_bytes(value: u64, blind: &[u8]) -> Result<Option<Commitment>> {
    let blind = BlindingFactor::from_slice(blind)?;
    Ok(commit(value, &blind))
}

/// Compute the sum of the positive blinding factors, minus the negative ones.
pub fn blind_sum<'a>(
    positives: impl IntoIterator<Item = &'a BlindingFactor>,
    negatives: impl IntoIterator<Item = &'a BlindingFactor>,
) -> BlindingFactor {
    let mut acc = Scalar::ZERO;
    for p in positives {
        acc += p.0;
    }
    for n in negatives {
        acc -= n.0;
    }
    BlindingFactor(acc)
}

/// Derive a switch commitment blinding factor.
///
/// The result is `blind + SHA256(commit(value, blind) || blind * J)`, which ties
/// the blinding factor to both the value and the auxiliary generator J.
pub fn blind_switch(value: u64, blind: &BlindingFactor) -> Option<BlindingFactor> {
    let commit = commit_point(value, &blind.0);
    let switch = curve::generator_j() * blind.0;
    let commit_bytes = curve::compress_point(&commit.to_affine())?;
    let switch_bytes = curve::compress_point(&switch.to_affine())?;
    let tweak = curve::hash_to_scalar(&[&commit_bytes[..], &switch_bytes[..]]);
    Some(BlindingFactor(blind.0 + tweak))
}

fn point_sum<'a>(commits: impl IntoIterator<Item = &'a Commitment>) -> Option<ProjectivePoint> {
    let mut acc = ProjectivePoint::IDENTITY;
    for c in commits {
        acc += c.parse()?.to_projective();
    }
    Some(acc)
}

/// Homomorphically combine commitments, positives minus negatives.
///
/// This returns None if any commitment fails to parse, or if the result is the
/// identity, which has no serialized form.
pub fn commit_sum<'a>(
    positives: impl IntoIterator<Item = &'a Commitment>,
    negatives: impl IntoIterator<Item = &'a Commitment>,
) -> Option<Commitment> {
    let total = point_sum(positives)? - point_sum(negatives)?;
    ParsedCommitment::from_point(&total)?.serialize()
}

/// Check that the positive commitments add up to the same point as the negative ones.
///
/// Nothing about the values is needed: only that the algebra cancels out.
/// In particular, two empty lists trivially balance.
#[must_use]
pub fn verify_commit_sum<'a>(
    positives: impl IntoIterator<Item = &'a Commitment>,
    negatives: impl IntoIterator<Item = &'a Commitment>,
) -> bool {
    match (point_sum(positives), point_sum(negatives)) {
        (Some(pos), Some(neg)) => pos == neg,
        _ => {
            trace!("commitment tally contains an unparseable commitment");
            false
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand_core::OsRng;

    use super::*;
    use crate::keys::{ecdsa_verify, KeyMaterial};

    fn c(value: u64, blind: &BlindingFactor) -> Commitment {
        commit(value, blind).unwrap()
    }

    #[test]
    fn test_parse_serialize_round_trip() {
        let blind = BlindingFactor::random(&mut OsRng);
        let commitment = c(5, &blind);
        let parsed = commitment.parse().unwrap();
        assert_eq!(parsed.serialize(), Some(commitment));

        let internal = parsed.to_internal();
        let reparsed = ParsedCommitment::from_internal(&internal).unwrap().unwrap();
        assert_eq!(reparsed, parsed);
    }

    #[test]
    fn test_bad_blind_lengths_are_rejected() {
        assert_eq!(
            commit_bytes(1, &[1u8; 31]).unwrap_err(),
            Error::InvalidBlindLength(31)
        );
        assert_eq!(
            commit_bytes(1, &[1u8; 33]).unwrap_err(),
            Error::InvalidBlindLength(33)
        );
        assert!(commit_bytes(1, &[1u8; 32]).unwrap().is_some());
    }

    #[test]
    fn test_bad_commitment_bytes() {
        assert!(Commitment::from_slice(&[8u8; 32]).is_err());
        let mut bytes = *c(3, &BlindingFactor::random(&mut OsRng)).as_bytes();
        bytes[0] = 0x02;
        assert!(Commitment::from_slice(&bytes).unwrap().parse().is_none());
    }

    #[test]
    fn test_commit_zero_zero_is_identity() {
        assert!(commit(0, &BlindingFactor::zero()).is_none());
    }

    #[test]
    fn test_verify_commit_sum_zero_keys() {
        let zero = BlindingFactor::zero();
        assert!(verify_commit_sum([], []));
        assert!(verify_commit_sum(&[c(5, &zero)], &[c(5, &zero)]));
        assert!(verify_commit_sum(&[c(3, &zero), c(2, &zero)], &[c(5, &zero)]));
        assert!(verify_commit_sum(
            &[c(2, &zero), c(4, &zero)],
            &[c(1, &zero), c(5, &zero)]
        ));
    }

    #[test]
    fn test_verify_commit_sum_one_key() {
        let one = BlindingFactor::random(&mut OsRng);
        assert!(verify_commit_sum(&[c(5, &one)], &[c(5, &one)]));
        // The values balance, but the blinding factors don't.
        assert!(!verify_commit_sum(&[c(3, &one), c(2, &one)], &[c(5, &one)]));

        let two = blind_sum([&one, &one], []);
        assert!(verify_commit_sum(&[c(3, &one), c(2, &one)], &[c(5, &two)]));
        assert!(!verify_commit_sum(&[c(3, &one)], &[c(5, &one)]));
    }

    #[test]
    fn test_verify_commit_sum_random_keys() {
        let pos = BlindingFactor::random(&mut OsRng);
        let neg = BlindingFactor::random(&mut OsRng);
        let sum = blind_sum([&pos], [&neg]);
        assert!(verify_commit_sum(
            &[c(101, &pos)],
            &[c(75, &neg), c(26, &sum)]
        ));
    }

    #[test]
    fn test_verify_commit_sum_switch_blinds() {
        let pos = blind_switch(101, &BlindingFactor::random(&mut OsRng)).unwrap();
        let neg = blind_switch(75, &BlindingFactor::random(&mut OsRng)).unwrap();
        let sum = blind_sum([&pos], [&neg]);
        assert!(verify_commit_sum(
            &[c(101, &pos)],
            &[c(75, &neg), c(26, &sum)]
        ));
    }

    #[test]
    fn test_blind_switch_is_deterministic() {
        let blind = BlindingFactor::random(&mut OsRng);
        let a = blind_switch(42, &blind).unwrap();
        assert_eq!(a, blind_switch(42, &blind).unwrap());
        assert_ne!(a, blind_switch(43, &blind).unwrap());
        assert_ne!(a, blind);
    }

    #[test]
    fn test_blind_sum_of_nothing_is_zero() {
        assert!(blind_sum([], []).is_zero());
    }

    #[test]
    fn test_commit_sum_matches_blind_sum() {
        let a = BlindingFactor::random(&mut OsRng);
        let b = BlindingFactor::random(&mut OsRng);

        let sum_ab = blind_sum([&a, &b], []);
        assert_eq!(
            commit_sum(&[c(3, &a), c(2, &b)], []),
            Some(c(5, &sum_ab))
        );

        let diff_ab = blind_sum([&a], [&b]);
        assert_eq!(commit_sum(&[c(3, &a)], &[c(2, &b)]), Some(c(1, &diff_ab)));
    }

    #[test]
    fn test_zero_value_commitment_is_signing_key() {
        let key = KeyMaterial::generate().unwrap();
        let blind = BlindingFactor::from_slice(&key.secret_bytes()[..]).unwrap();
        let commitment = c(0, &blind);
        let public = commitment.to_public_key().unwrap();
        assert_eq!(public, key.public_key());

        let msg = curve::sha256(&[&b"Message for signing"[..]]);
        let sig = key.ecdsa_sign(&msg).unwrap();
        assert!(ecdsa_verify(&sig, &msg, &public));

        // A commitment to a nonzero value is still a point, but not this key.
        let other = c(5, &blind).to_public_key().unwrap();
        assert!(!ecdsa_verify(&sig, &msg, &other));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_commitments_are_homomorphic(v1 in 0u64..(1 << 62), v2 in 0u64..(1 << 62)) {
            let b1 = BlindingFactor::random(&mut OsRng);
            let b2 = BlindingFactor::random(&mut OsRng);
            let sum = commit_sum(&[c(v1, &b1), c(v2, &b2)], []);
            prop_assert_eq!(sum, commit(v1 + v2, &blind_sum([&b1, &b2], [])));
        }

        #[test]
        fn prop_commitment_balances_with_itself(v in any::<u64>()) {
            let b = BlindingFactor::random(&mut OsRng);
            let commitment = c(v, &b);
            prop_assert!(verify_commit_sum(&[commitment], &[commitment]));
            prop_assert_eq!(commitment.parse().and_then(|p| p.serialize()), Some(commitment));
        }
    }
}
