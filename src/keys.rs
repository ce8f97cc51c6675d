//! Private key material and public keys.
//!
//! A [KeyMaterial] owns exactly one secret scalar, which gets wiped when the
//! value is dropped, on every exit path. Each thread should own its own key
//! material; nothing here is shared behind the scenes.
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use elliptic_curve::{Field, Group, NonZeroScalar};
use k256::{
    ecdsa::{Signature, SigningKey, VerifyingKey},
    AffinePoint, ProjectivePoint, Scalar, Secp256k1,
};
use log::trace;
use rand_core::{CryptoRngCore, OsRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    constants::{
        MESSAGE_SIZE, PUBLIC_KEY_COMPRESSED_SIZE, PUBLIC_KEY_SIZE, PUBLIC_KEY_UNCOMPRESSED_SIZE,
        SECRET_KEY_SIZE, SIGNATURE_SIZE,
    },
    curve,
    error::{Error, Result},
};

/// A public key, which is just a non-identity curve point.
///
/// These are plain values, and can be copied around freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(AffinePoint);

impl PublicKey {
    /// Wrap a point, rejecting the identity.
    pub fn from_point(point: &ProjectivePoint) -> Option<Self> {
        if point.is_identity().into() {
            return None;
        }
        Some(Self(point.to_affine()))
    }

    /// Parse a key from 33 or 65 byte SEC1 form, or from the 64 byte internal form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            PUBLIC_KEY_COMPRESSED_SIZE | PUBLIC_KEY_SIZE | PUBLIC_KEY_UNCOMPRESSED_SIZE => {
                curve::parse_point(bytes).map(Self).ok_or(Error::InvalidPoint)
            }
            found => Err(Error::length(
                "public key",
                PUBLIC_KEY_COMPRESSED_SIZE,
                found,
            )),
        }
    }

    /// Serialize this key, choosing between the 33 and 65 byte forms.
    pub fn serialize(&self, compress: bool) -> Vec<u8> {
        // A PublicKey is never the identity, so this always has an encoding.
        curve::serialize_point(&self.0, compress).unwrap_or_default()
    }

    pub fn to_compressed(&self) -> [u8; PUBLIC_KEY_COMPRESSED_SIZE] {
        curve::compress_point(&self.0).unwrap_or([0u8; PUBLIC_KEY_COMPRESSED_SIZE])
    }

    /// Return the 64 byte x || y form of this key.
    pub fn to_internal(&self) -> [u8; PUBLIC_KEY_SIZE] {
        curve::point_to_internal(&self.0).unwrap_or([0u8; PUBLIC_KEY_SIZE])
    }

    pub fn as_affine(&self) -> &AffinePoint {
        &self.0
    }

    pub fn to_projective(self) -> ProjectivePoint {
        self.0.into()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let point = AffinePoint::deserialize(deserializer)?;
        if point == AffinePoint::IDENTITY {
            return Err(serde::de::Error::custom("public key cannot be the identity"));
        }
        Ok(Self(point))
    }
}

/// Owns a private key, along with its public key.
pub struct KeyMaterial {
    secret: Scalar,
    public: PublicKey,
}

impl KeyMaterial {
    fn from_scalar(secret: Scalar) -> Result<Self> {
        if secret.is_zero().into() {
            return Err(Error::InvalidScalar);
        }
        let public = PublicKey((ProjectivePoint::GENERATOR * secret).to_affine());
        Ok(Self { secret, public })
    }

    /// Generate a fresh key from the operating system's randomness.
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a fresh key, drawing until the bytes make a valid key.
    ///
    /// A single draw fails with probability around 2^-128, so this loop
    /// essentially never repeats. A failing randomness source is not retried.
    pub fn generate_with_rng(rng: &mut impl CryptoRngCore) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        loop {
            rng.try_fill_bytes(&mut bytes[..])
                .map_err(|e| Error::Randomness(e.to_string()))?;
            if curve::is_valid_secret(&bytes) {
                break;
            }
            trace!("drew an invalid secret key, drawing again");
        }
        Self::from_bytes(&bytes[..])
    }

    /// Derive a key by hashing a seed with SHA-256.
    ///
    /// The digest is used as is: there's no retry, so a seed hashing to zero
    /// or past the curve order is an error.
    pub fn derive_from_seed(seed: &[u8]) -> Result<Self> {
        let digest = Zeroizing::new(curve::sha256(&[seed]));
        Self::from_bytes(&digest[..])
    }

    /// Import an existing 32 byte key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; SECRET_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::length("secret key", SECRET_KEY_SIZE, bytes.len()))?;
        let secret = curve::scalar_from_bytes(bytes).ok_or(Error::InvalidScalar)?;
        Self::from_scalar(secret)
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Return a copy of the secret key, which gets wiped when dropped.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_SIZE]> {
        Zeroizing::new(curve::scalar_to_bytes(&self.secret))
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.secret
    }

    /// Create a compact ECDSA signature over a 32 byte digest.
    pub fn ecdsa_sign(&self, msg32: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        if msg32.len() != MESSAGE_SIZE {
            return Err(Error::length("message", MESSAGE_SIZE, msg32.len()));
        }
        let nonzero: Option<NonZeroScalar<Secp256k1>> = NonZeroScalar::new(self.secret).into();
        let signing_key = SigningKey::from(nonzero.ok_or(Error::InvalidScalar)?);
        let sig: Signature = signing_key
            .sign_prehash(msg32)
            .map_err(|e| Error::ProofFailed(e.to_string()))?;
        let mut out = [0u8; SIGNATURE_SIZE];
        out.copy_from_slice(&sig.to_bytes());
        Ok(out)
    }
}

impl Zeroize for KeyMaterial {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for KeyMaterial {}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Verify a compact ECDSA signature over a 32 byte digest.
#[must_use]
pub fn ecdsa_verify(sig: &[u8], msg32: &[u8], public_key: &PublicKey) -> bool {
    if sig.len() != SIGNATURE_SIZE || msg32.len() != MESSAGE_SIZE {
        return false;
    }
    let Ok(sig) = Signature::from_slice(sig) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_affine(public_key.0) else {
        return false;
    };
    verifying_key.verify_prehash(msg32, &sig).is_ok()
}
