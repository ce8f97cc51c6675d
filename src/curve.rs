//! The boundary with the underlying curve arithmetic.
//!
//! Everything above this module talks about points and scalars in terms of
//! `k256` types, and about bytes in terms of the encodings defined here.
//! The encodings follow the secp256k1 conventions: 32 byte big endian scalars,
//! 33 or 65 byte SEC1 points, and a 64 byte x || y internal form.
use std::sync::OnceLock;

use digest::Digest;
use elliptic_curve::{
    ops::Reduce,
    point::AffineCoordinates,
    sec1::{FromEncodedPoint, ToEncodedPoint},
    Field, PrimeField,
};
use k256::{AffinePoint, EncodedPoint, FieldBytes, FieldElement, ProjectivePoint, Scalar, U256};
use sha2::Sha256;

use crate::constants::{GENERATOR_G, GENERATOR_H, GENERATOR_J, PUBLIC_KEY_SIZE};

fn from_coordinates(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Option<AffinePoint> {
    let encoded = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&bytes[..32]),
        FieldBytes::from_slice(&bytes[32..]),
        false,
    );
    AffinePoint::from_encoded_point(&encoded).into()
}

/// The three fixed generators, decoded once.
struct Generators {
    g: ProjectivePoint,
    h: ProjectivePoint,
    j: ProjectivePoint,
}

static GENERATORS: OnceLock<Generators> = OnceLock::new();

/// Reverse each 32 byte coordinate of a raw libsecp256k1 point.
///
/// The raw layout stores x and y little endian, while the internal form is big endian.
fn raw_to_internal(raw: &[u8; PUBLIC_KEY_SIZE]) -> [u8; PUBLIC_KEY_SIZE] {
    let mut out = *raw;
    out[..32].reverse();
    out[32..].reverse();
    out
}

fn fixed_generator(bytes: &[u8; PUBLIC_KEY_SIZE]) -> ProjectivePoint {
    from_coordinates(bytes)
        .expect("generator constant is on the curve")
        .into()
}

fn generators() -> &'static Generators {
    GENERATORS.get_or_init(|| Generators {
        g: fixed_generator(&GENERATOR_G),
        h: fixed_generator(&GENERATOR_H),
        j: fixed_generator(&raw_to_internal(&GENERATOR_J)),
    })
}

/// The blinding generator G.
pub fn generator_g() -> ProjectivePoint {
    generators().g
}

/// The value generator H.
pub fn generator_h() -> ProjectivePoint {
    generators().h
}

/// The switch commitment generator J.
pub fn generator_j() -> ProjectivePoint {
    generators().j
}

/// Parse a point from its 64 byte internal form.
pub fn point_from_internal(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Option<AffinePoint> {
    from_coordinates(bytes)
}

/// Write a point into its 64 byte internal form.
///
/// The identity has no such form.
pub fn point_to_internal(point: &AffinePoint) -> Option<[u8; PUBLIC_KEY_SIZE]> {
    let encoded = point.to_encoded_point(false);
    let (x, y) = (encoded.x()?, encoded.y()?);
    let mut out = [0u8; PUBLIC_KEY_SIZE];
    out[..32].copy_from_slice(x);
    out[32..].copy_from_slice(y);
    Some(out)
}

/// Serialize a point in SEC1 form, returning None for the identity.
pub fn serialize_point(point: &AffinePoint, compress: bool) -> Option<Vec<u8>> {
    let encoded = point.to_encoded_point(compress);
    // The identity encodes as a single zero byte.
    if encoded.len() == 1 {
        return None;
    }
    Some(encoded.as_bytes().to_vec())
}

/// Serialize a point compressed, returning None for the identity.
pub fn compress_point(point: &AffinePoint) -> Option<[u8; 33]> {
    serialize_point(point, true)?.try_into().ok()
}

/// Like [compress_point], but mapping the identity to 33 zero bytes.
///
/// This is only meant for feeding points into hashes.
pub fn compress_or_zero(point: &ProjectivePoint) -> [u8; 33] {
    compress_point(&point.to_affine()).unwrap_or([0u8; 33])
}

/// Parse a point from SEC1 bytes or from the internal form.
pub fn parse_point(bytes: &[u8]) -> Option<AffinePoint> {
    if let Ok(internal) = <&[u8; PUBLIC_KEY_SIZE]>::try_from(bytes) {
        return point_from_internal(internal);
    }
    let encoded = EncodedPoint::from_bytes(bytes).ok()?;
    if encoded.is_identity() {
        return None;
    }
    AffinePoint::from_encoded_point(&encoded).into()
}

/// Get the x coordinate of a point as bytes.
pub fn x_bytes(point: &AffinePoint) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&point.x());
    out
}

/// Check whether a field element, given as bytes, is a square mod p.
pub fn is_quad(y: &FieldBytes) -> bool {
    let fe: Option<FieldElement> = FieldElement::from_bytes(y).into();
    match fe {
        Some(fe) => fe.sqrt().is_some().into(),
        None => false,
    }
}

/// Check whether the y coordinate of a point is a square mod p.
pub fn has_quad_y(point: &AffinePoint) -> bool {
    let encoded = point.to_encoded_point(false);
    encoded.y().map(is_quad).unwrap_or(false)
}

/// Find the point with a given x coordinate whose y coordinate is a square.
///
/// Exactly one of the two candidate points has this property, since -1 is
/// not a square mod p.
pub fn lift_x_quad(x: &[u8; 32]) -> Option<AffinePoint> {
    let mut sec1 = [0u8; 33];
    sec1[0] = 0x02;
    sec1[1..].copy_from_slice(x);
    let point = parse_point(&sec1)?;
    if has_quad_y(&point) {
        Some(point)
    } else {
        Some(-point)
    }
}

/// Parse a scalar, requiring it to be below the curve order.
pub fn scalar_from_bytes(bytes: &[u8; 32]) -> Option<Scalar> {
    Scalar::from_repr(*FieldBytes::from_slice(bytes)).into()
}

/// Check that bytes make a usable secret key: nonzero, and below the order.
pub fn is_valid_secret(bytes: &[u8; 32]) -> bool {
    scalar_from_bytes(bytes)
        .map(|s| !bool::from(s.is_zero()))
        .unwrap_or(false)
}

/// Interpret 32 bytes as a scalar, reducing mod the order.
pub fn reduce_bytes(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
}

pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&scalar.to_bytes());
    out
}

/// Hash several byte strings with SHA-256.
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hash several byte strings into a scalar.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    reduce_bytes(&sha256(parts))
}

/// Hash data onto the curve, with no known discrete log relative to G.
///
/// This uses try and increment: candidate x coordinates are hashed until one
/// lands on the curve, which takes two attempts on average.
pub fn hash_to_point(label: &[u8], data: &[u8]) -> ProjectivePoint {
    let mut counter = 0u32;
    loop {
        let x = sha256(&[label, data, &counter.to_be_bytes()[..]]);
        let mut sec1 = [0u8; 33];
        sec1[0] = 0x02;
        sec1[1..].copy_from_slice(&x);
        if let Some(point) = parse_point(&sec1) {
            return point.into();
        }
        counter += 1;
    }
}
