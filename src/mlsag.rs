//! MLSAG ring signatures over a matrix of keys.
//!
//! The ring is `n_rows` by `n_cols`. Each column is one possible signer,
//! and the signer knows the secret key of every row in their column.
//! All rows but the last are spend keys, each producing a key image which
//! stays the same wherever in a ring the key is placed. The last row holds
//! the difference between input and output commitments, so that signing for
//! it proves the transaction balances.
//!
//! A signature is the chain's starting challenge `c0`, along with a response
//! for every entry of the matrix. Verification walks the chain of challenges
//! through every column, and checks that it loops back to `c0`.
use k256::{ProjectivePoint, Scalar};
use log::debug;
use magikitten::Transcript;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    constants::PUBLIC_KEY_COMPRESSED_SIZE,
    curve,
    error::{Error, Result},
    keys::{KeyMaterial, PublicKey},
    pedersen::{blind_sum, BlindingFactor, Commitment},
};

const KEY_IMAGE_LABEL: &[u8] = b"cait-zkp v0.1.0 key image";

const NONCE_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 mlsag nonces";
const NONCE_LABEL: &[u8] = b"nonce";
const SECRET_LABEL: &[u8] = b"secret";
const STREAM_LABEL: &[u8] = b"stream";

const CHALLENGE_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 mlsag";
const PREIMAGE_LABEL: &[u8] = b"preimage";
const KEY_LABEL: &[u8] = b"key";
const L_LABEL: &[u8] = b"L";
const R_LABEL: &[u8] = b"R";
const CHALLENGE_LABEL: &[u8] = b"challenge";

/// The dimensions of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingShape {
    pub n_cols: usize,
    pub n_rows: usize,
}

impl RingShape {
    pub fn new(n_cols: usize, n_rows: usize) -> Result<Self> {
        if n_cols == 0 || n_rows < 2 {
            return Err(Error::BadParameters(format!(
                "a ring needs at least one column and two rows, found {n_cols}x{n_rows}"
            )));
        }
        Ok(Self { n_cols, n_rows })
    }

    pub fn size(&self) -> usize {
        self.n_cols * self.n_rows
    }

    /// The number of rows producing a key image.
    pub fn spend_rows(&self) -> usize {
        self.n_rows - 1
    }

    /// The size of a serialized signature for this shape.
    pub fn signature_size(&self) -> usize {
        PUBLIC_KEY_COMPRESSED_SIZE * self.spend_rows() + 32 + 32 * self.size()
    }
}

/// A matrix of public keys, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingMatrix {
    shape: RingShape,
    keys: Vec<PublicKey>,
}

impl RingMatrix {
    pub fn new(shape: RingShape, keys: Vec<PublicKey>) -> Result<Self> {
        if keys.len() != shape.size() {
            return Err(Error::BadParameters(format!(
                "a {}x{} ring needs {} keys, found {}",
                shape.n_cols,
                shape.n_rows,
                shape.size(),
                keys.len()
            )));
        }
        Ok(Self { shape, keys })
    }

    pub fn shape(&self) -> RingShape {
        self.shape
    }

    pub fn key(&self, row: usize, col: usize) -> &PublicKey {
        &self.keys[row * self.shape.n_cols + col]
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }
}

/// A ring with its commitment row filled in, along with the secret for that row.
#[derive(Debug)]
pub struct PreparedRing {
    pub ring: RingMatrix,
    /// The secret key of the last row, in the signer's column.
    pub blind_sum: BlindingFactor,
}

fn parse_commitment(commitment: &Commitment) -> Result<ProjectivePoint> {
    Ok(commitment.parse().ok_or(Error::InvalidPoint)?.to_projective())
}

/// Fill in the commitment row of a ring.
///
/// `spend_keys` and `inputs` hold the first `n_rows - 1` rows, row by row:
/// one key and one input commitment per column. Each column's last row becomes
/// the sum of its input commitments minus the sum of all the outputs.
///
/// `blinds` holds the blinding factors of the first `n_blinded` outputs,
/// followed by those of the signer's inputs, one per spend row. The rest of
/// the outputs must carry a zero blinding factor, like an explicit fee.
pub fn prepare(
    shape: RingShape,
    spend_keys: &[PublicKey],
    inputs: &[Commitment],
    outputs: &[Commitment],
    n_blinded: usize,
    blinds: &[BlindingFactor],
) -> Result<PreparedRing> {
    let spend_size = shape.spend_rows() * shape.n_cols;
    if spend_keys.len() != spend_size || inputs.len() != spend_size {
        return Err(Error::BadParameters(format!(
            "expected {spend_size} spend keys and inputs, found {} and {}",
            spend_keys.len(),
            inputs.len()
        )));
    }
    if outputs.is_empty() || n_blinded > outputs.len() {
        return Err(Error::BadParameters(format!(
            "{n_blinded} blinded outputs out of {}",
            outputs.len()
        )));
    }
    if blinds.len() != n_blinded + shape.spend_rows() {
        return Err(Error::BadParameters(format!(
            "expected {} blinding factors, found {}",
            n_blinded + shape.spend_rows(),
            blinds.len()
        )));
    }

    let mut output_sum = ProjectivePoint::IDENTITY;
    for output in outputs {
        output_sum += parse_commitment(output)?;
    }

    let mut keys = spend_keys.to_vec();
    for col in 0..shape.n_cols {
        let mut sum = -output_sum;
        for row in 0..shape.spend_rows() {
            sum += parse_commitment(&inputs[row * shape.n_cols + col])?;
        }
        keys.push(PublicKey::from_point(&sum).ok_or(Error::InvalidPoint)?);
    }

    let (output_blinds, input_blinds) = blinds.split_at(n_blinded);
    let blind_sum = blind_sum(input_blinds, output_blinds);
    debug!(
        "prepared a {}x{} ring with {} outputs",
        shape.n_cols,
        shape.n_rows,
        outputs.len()
    );
    Ok(PreparedRing {
        ring: RingMatrix::new(shape, keys)?,
        blind_sum,
    })
}

/// Hash a public key onto the curve, for key images.
fn hash_key(public: &PublicKey) -> ProjectivePoint {
    curve::hash_to_point(KEY_IMAGE_LABEL, &public.to_compressed())
}

fn key_image_point(secret: &Scalar, public: &PublicKey) -> Result<PublicKey> {
    PublicKey::from_point(&(hash_key(public) * secret)).ok_or(Error::InvalidPoint)
}

/// Calculate the key image of a key pair, `x * Hp(P)`.
///
/// This depends only on the key pair, so spending the same key from two
/// different rings produces the same image.
pub fn key_image(key: &KeyMaterial, public: &PublicKey) -> Result<PublicKey> {
    key_image_point(key.scalar(), public)
}

/// A ring signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlsagSignature {
    key_images: Vec<PublicKey>,
    #[serde(with = "crate::serde::scalar_bytes")]
    c0: Scalar,
    #[serde(with = "crate::serde::scalar_vec")]
    responses: Vec<Scalar>,
}

impl MlsagSignature {
    /// The key images, one per spend row.
    pub fn key_images(&self) -> &[PublicKey] {
        &self.key_images
    }

    /// Serialize as key images, then `c0`, then the responses row by row.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            PUBLIC_KEY_COMPRESSED_SIZE * self.key_images.len() + 32 * (1 + self.responses.len()),
        );
        for image in &self.key_images {
            out.extend_from_slice(&image.to_compressed());
        }
        out.extend_from_slice(&curve::scalar_to_bytes(&self.c0));
        for response in &self.responses {
            out.extend_from_slice(&curve::scalar_to_bytes(response));
        }
        out
    }

    pub fn parse(bytes: &[u8], shape: RingShape) -> Result<Self> {
        if bytes.len() != shape.signature_size() {
            return Err(Error::length(
                "mlsag signature",
                shape.signature_size(),
                bytes.len(),
            ));
        }
        let (images, scalars) = bytes.split_at(PUBLIC_KEY_COMPRESSED_SIZE * shape.spend_rows());
        let key_images = images
            .chunks_exact(PUBLIC_KEY_COMPRESSED_SIZE)
            .map(PublicKey::from_slice)
            .collect::<Result<Vec<_>>>()?;
        let mut scalars = scalars.chunks_exact(32).map(|chunk| {
            let mut buf = [0u8; 32];
            buf.copy_from_slice(chunk);
            curve::scalar_from_bytes(&buf).ok_or(Error::InvalidScalar)
        });
        let c0 = scalars.next().ok_or(Error::InvalidScalar)??;
        let responses = scalars.collect::<Result<Vec<_>>>()?;
        Ok(Self {
            key_images,
            c0,
            responses,
        })
    }
}

/// The commitments one row of a column contributes to the next challenge.
struct RowTerms<'a> {
    key: &'a PublicKey,
    l: ProjectivePoint,
    /// Only spend rows have this, binding the key image.
    r: Option<ProjectivePoint>,
}

fn column_challenge(preimage: &[u8; 32], terms: &[RowTerms]) -> Scalar {
    let mut transcript = Transcript::new(CHALLENGE_PROTOCOL);
    transcript.message(PREIMAGE_LABEL, preimage);
    for term in terms {
        transcript.message(KEY_LABEL, &term.key.to_compressed());
        transcript.message(L_LABEL, &curve::compress_or_zero(&term.l));
        if let Some(r) = &term.r {
            transcript.message(R_LABEL, &curve::compress_or_zero(r));
        }
    }
    Scalar::generate_biased(&mut transcript.challenge(CHALLENGE_LABEL))
}

/// The terms of a column, given its responses and the incoming challenge.
fn column_terms<'a>(
    ring: &'a RingMatrix,
    col: usize,
    responses: &[Scalar],
    c: &Scalar,
    key_images: &[PublicKey],
) -> Vec<RowTerms<'a>> {
    let shape = ring.shape();
    (0..shape.n_rows)
        .map(|row| {
            let key = ring.key(row, col);
            let s = responses[row * shape.n_cols + col];
            let l = ProjectivePoint::GENERATOR * s + key.to_projective() * c;
            let r = key_images
                .get(row)
                .map(|image| hash_key(key) * s + image.to_projective() * c);
            RowTerms { key, l, r }
        })
        .collect()
}

/// Sign over a ring, as the owner of column `index`.
///
/// `secrets` holds one secret per row: the spend keys, then the blinding
/// factor sum from [prepare]. The nonce should be fresh randomness; along with
/// the secrets and the preimage, it seeds every scalar the signature uses.
pub fn generate(
    nonce: &[u8; 32],
    preimage: &[u8; 32],
    ring: &RingMatrix,
    index: usize,
    secrets: &[BlindingFactor],
) -> Result<MlsagSignature> {
    let shape = ring.shape();
    if index >= shape.n_cols {
        return Err(Error::BadParameters(format!(
            "signer column {index} is outside a ring of {} columns",
            shape.n_cols
        )));
    }
    if secrets.len() != shape.n_rows {
        return Err(Error::BadParameters(format!(
            "expected {} secrets, found {}",
            shape.n_rows,
            secrets.len()
        )));
    }
    for (row, secret) in secrets.iter().enumerate() {
        if secret.is_zero() {
            return Err(Error::InvalidScalar);
        }
        if ProjectivePoint::GENERATOR * secret.scalar() != ring.key(row, index).to_projective() {
            return Err(Error::BadParameters(format!(
                "secret for row {row} does not match the ring"
            )));
        }
    }

    let mut transcript = Transcript::new(NONCE_PROTOCOL);
    transcript.message(NONCE_LABEL, nonce);
    transcript.message(PREIMAGE_LABEL, preimage);
    for secret in secrets {
        transcript.message(SECRET_LABEL, &Zeroizing::new(secret.to_bytes())[..]);
    }
    let mut rng = transcript.challenge(STREAM_LABEL);

    let key_images = secrets[..shape.spend_rows()]
        .iter()
        .enumerate()
        .map(|(row, secret)| key_image_point(secret.scalar(), ring.key(row, index)))
        .collect::<Result<Vec<_>>>()?;

    let alphas: Zeroizing<Vec<Scalar>> = Zeroizing::new(
        (0..shape.n_rows)
            .map(|_| Scalar::generate_biased(&mut rng))
            .collect(),
    );
    let terms: Vec<_> = alphas
        .iter()
        .enumerate()
        .map(|(row, alpha)| {
            let key = ring.key(row, index);
            RowTerms {
                key,
                l: ProjectivePoint::GENERATOR * alpha,
                r: (row < shape.spend_rows()).then(|| hash_key(key) * alpha),
            }
        })
        .collect();
    let mut c = column_challenge(preimage, &terms);

    // Walk the rest of the chain, with random responses, back to our column.
    let mut responses = vec![Scalar::ZERO; shape.size()];
    let mut c0 = c;
    let mut col = (index + 1) % shape.n_cols;
    while col != index {
        if col == 0 {
            c0 = c;
        }
        for row in 0..shape.n_rows {
            responses[row * shape.n_cols + col] = Scalar::generate_biased(&mut rng);
        }
        let terms = column_terms(ring, col, &responses, &c, &key_images);
        c = column_challenge(preimage, &terms);
        col = (col + 1) % shape.n_cols;
    }
    if index == 0 {
        c0 = c;
    }

    // Close the loop.
    for (row, (alpha, secret)) in alphas.iter().zip(secrets).enumerate() {
        responses[row * shape.n_cols + index] = *alpha - c * secret.scalar();
    }

    debug!(
        "generated an mlsag signature over a {}x{} ring",
        shape.n_cols, shape.n_rows
    );
    Ok(MlsagSignature {
        key_images,
        c0,
        responses,
    })
}

/// Verify a ring signature.
#[must_use]
pub fn verify(preimage: &[u8; 32], ring: &RingMatrix, signature: &MlsagSignature) -> bool {
    let shape = ring.shape();
    if signature.key_images.len() != shape.spend_rows() || signature.responses.len() != shape.size()
    {
        return false;
    }
    let mut c = signature.c0;
    for col in 0..shape.n_cols {
        let terms = column_terms(ring, col, &signature.responses, &c, &signature.key_images);
        c = column_challenge(preimage, &terms);
    }
    c == signature.c0
}
