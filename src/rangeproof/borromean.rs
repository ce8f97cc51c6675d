//! The legacy range proof, built from Borromean ring signatures.
//!
//! The committed value, minus a public offset, is written in base 4, with
//! one commitment per digit. Each digit commitment gets a ring signature
//! proving that it commits to one of 0, 1, 2, or 3 times its place value,
//! and all of these rings are chained together through a single shared
//! challenge `e0`. The digit commitments add up to the original commitment,
//! so the last one is implicit, and doesn't need to be sent.
//!
//! Every random value in the proof is drawn from a stream derived from a
//! nonce, which defaults to the blinding factor. Whoever knows that nonce can
//! regenerate the stream, and compare it with the proof: exactly one response
//! per ring differs, which reveals the digit, and from there the blinding
//! factor.
//!
//! # Layout
//!
//! ```text
//! exp: i8 | mantissa: u8 | min: u64 | digit commitments: 33 * (rings - 1)
//! | e0: 32 | responses: 32 * members | message length: u16 | message
//! ```
//!
//! All integers are big endian. A proof of an exact value has `exp = -1`,
//! a mantissa of 0, and a single ring with one member.
use k256::{ProjectivePoint, Scalar};
use log::trace;
use magikitten::{MeowRng, Transcript};
use rand_core::RngCore;

use super::{Proof, ProofInfo, ProveRequest, RangeInfo, RangeProver};
use crate::{
    config::RangeProofConfig,
    constants::PROOF_MSG_SIZE,
    curve,
    error::{Error, Result},
    pedersen::{self, BlindingFactor, Commitment},
};

const HEADER_SIZE: usize = 10;
const POINT_SIZE: usize = 33;
const SCALAR_SIZE: usize = 32;
const LENGTH_SIZE: usize = 2;

const PROOF_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 rangeproof";
const STREAM_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 rangeproof stream";
const MESSAGE_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 rangeproof message";

const HEADER_LABEL: &[u8] = b"header";
const COMMITMENT_LABEL: &[u8] = b"commitment";
const EXTRA_COMMIT_LABEL: &[u8] = b"extra commit";
const DIGITS_LABEL: &[u8] = b"digit commitments";
const MESSAGE_LABEL: &[u8] = b"message";
const NONCE_LABEL: &[u8] = b"nonce";
const EDGE_LABEL: &[u8] = b"ring edge";
const E0_LABEL: &[u8] = b"e0";
const POINT_LABEL: &[u8] = b"point";
const CHALLENGE_LABEL: &[u8] = b"challenge";
const STREAM_LABEL: &[u8] = b"stream";

/// The public shape of a proof: what range it covers, and how it's split into rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    exp: i8,
    mantissa: u8,
    min: u64,
    scale: u64,
}

impl Layout {
    fn exact(value: u64) -> Self {
        Self {
            exp: -1,
            mantissa: 0,
            min: value,
            scale: 1,
        }
    }

    fn is_exact(&self) -> bool {
        self.exp < 0
    }

    fn rings(&self) -> usize {
        if self.is_exact() {
            1
        } else {
            (usize::from(self.mantissa) + 1) / 2
        }
    }

    fn ring_size(&self, ring: usize) -> usize {
        if self.is_exact() {
            1
        } else if ring + 1 < self.rings() || self.mantissa % 2 == 0 {
            4
        } else {
            2
        }
    }

    fn members(&self) -> usize {
        (0..self.rings()).map(|i| self.ring_size(i)).sum()
    }

    fn max(&self) -> Option<u64> {
        if self.is_exact() {
            return Some(self.min);
        }
        let span = ((1u128 << self.mantissa) - 1) * u128::from(self.scale);
        u64::try_from(u128::from(self.min) + span).ok()
    }

    /// The place value of a digit, `4^ring * scale`.
    fn place(&self, ring: usize) -> Scalar {
        Scalar::from(1u64 << (2 * ring)) * Scalar::from(self.scale)
    }

    fn header(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.exp.to_be_bytes()[0];
        out[1] = self.mantissa;
        out[2..].copy_from_slice(&self.min.to_be_bytes());
        out
    }

    fn parse_header(bytes: &[u8]) -> Option<Self> {
        let header: &[u8; HEADER_SIZE] = bytes.get(..HEADER_SIZE)?.try_into().ok()?;
        let exp = i8::from_be_bytes([header[0]]);
        let mantissa = header[1];
        let mut min = [0u8; 8];
        min.copy_from_slice(&header[2..]);
        let min = u64::from_be_bytes(min);

        let layout = match exp {
            -1 if mantissa == 0 => Self::exact(min),
            0..=18 if (1..=64).contains(&mantissa) => Self {
                exp,
                mantissa,
                min,
                scale: 10u64.pow(exp as u32),
            },
            _ => return None,
        };
        layout.max()?;
        Some(layout)
    }

    fn info(&self) -> Option<RangeInfo> {
        Some(RangeInfo {
            exp: self.exp,
            mantissa: self.mantissa,
            min: self.min,
            max: self.max()?,
        })
    }

    fn proof_size(&self, message_len: usize) -> usize {
        HEADER_SIZE
            + POINT_SIZE * (self.rings() - 1)
            + SCALAR_SIZE
            + SCALAR_SIZE * self.members()
            + LENGTH_SIZE
            + message_len
    }
}

/// Choose the layout for proving a value, returning the digits to prove as well.
fn plan(value: u64, min_value: u64, config: &RangeProofConfig) -> Result<(Layout, u64)> {
    config.validate()?;
    if value < min_value {
        return Err(Error::BadParameters(format!(
            "value {value} is below the minimum {min_value}"
        )));
    }
    if config.exp < 0 {
        return Ok((Layout::exact(value), 0));
    }

    let mut v = value - min_value;
    let max_bits = if min_value == 0 {
        64
    } else {
        min_value.leading_zeros()
    };
    let min_bits = u32::from(config.min_bits).min(max_bits);
    let mut exp = config.exp as u32;
    if min_bits > 61 || v > i64::MAX as u64 {
        exp = 0;
    }

    // Drop decimal digits, as long as min_bits worth of digits still fit after scaling.
    let mut room = if min_bits == 0 {
        0
    } else {
        u64::MAX >> (64 - min_bits)
    };
    let mut dropped = 0;
    while dropped < exp && room <= u64::MAX / 10 {
        v /= 10;
        room *= 10;
        dropped += 1;
    }
    let scale = 10u64.pow(dropped);
    let min = value - v * scale;

    let bits = if v == 0 { 1 } else { 64 - v.leading_zeros() };
    let layout = Layout {
        exp: dropped as i8,
        mantissa: bits.max(min_bits) as u8,
        min,
        scale,
    };
    if layout.max().is_none() {
        return Err(Error::BadParameters(format!(
            "a {} bit range above {} overflows 64 bits",
            layout.mantissa, layout.min
        )));
    }
    Ok((layout, v))
}

/// XOR the message with a keystream derived from the nonce.
fn apply_keystream(nonce: &[u8; 32], commitment: &Commitment, data: &[u8]) -> Vec<u8> {
    let mut transcript = Transcript::new(MESSAGE_PROTOCOL);
    transcript.message(NONCE_LABEL, nonce);
    transcript.message(COMMITMENT_LABEL, commitment.as_bytes());
    let mut pad = vec![0u8; data.len()];
    transcript.challenge(STREAM_LABEL).fill_bytes(&mut pad);
    data.iter().zip(pad).map(|(d, p)| d ^ p).collect()
}

/// The stream of random scalars a proof draws from.
///
/// Values get drawn in a fixed order: first the blinds of the explicit digit
/// commitments, then for each ring its nonce, followed by a response for
/// every member.
fn scalar_stream(
    nonce: &[u8; 32],
    commitment: &Commitment,
    header: &[u8],
    extra_commit: &[u8],
    ciphertext: &[u8],
) -> MeowRng {
    let mut transcript = Transcript::new(STREAM_PROTOCOL);
    transcript.message(NONCE_LABEL, nonce);
    transcript.message(COMMITMENT_LABEL, commitment.as_bytes());
    transcript.message(HEADER_LABEL, header);
    transcript.message(EXTRA_COMMIT_LABEL, extra_commit);
    transcript.message(MESSAGE_LABEL, ciphertext);
    transcript.challenge(STREAM_LABEL)
}

fn base_transcript(
    header: &[u8],
    commitment: &Commitment,
    extra_commit: &[u8],
    digit_commits: &[u8],
    ciphertext: &[u8],
) -> Transcript {
    let mut transcript = Transcript::new(PROOF_PROTOCOL);
    transcript.message(HEADER_LABEL, header);
    transcript.message(COMMITMENT_LABEL, commitment.as_bytes());
    transcript.message(EXTRA_COMMIT_LABEL, extra_commit);
    transcript.message(DIGITS_LABEL, digit_commits);
    transcript.message(MESSAGE_LABEL, ciphertext);
    transcript
}

fn position(ring: usize, member: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&(ring as u32).to_be_bytes());
    out[4..].copy_from_slice(&(member as u32).to_be_bytes());
    out
}

/// The challenge for a ring member, given the data preceding it in the ring.
///
/// For the first member, this data is e0, otherwise it's the previous member's point.
fn edge_challenge(base: &Transcript, ring: usize, member: usize, data: &[u8]) -> Scalar {
    let mut transcript = base.forked(EDGE_LABEL, &position(ring, member));
    transcript.message(POINT_LABEL, data);
    Scalar::generate_biased(&mut transcript.challenge(CHALLENGE_LABEL))
}

fn point_challenge(base: &Transcript, ring: usize, member: usize, point: &ProjectivePoint) -> Scalar {
    edge_challenge(base, ring, member, &curve::compress_or_zero(point))
}

fn shared_challenge(base: &Transcript, last_points: &[ProjectivePoint]) -> Scalar {
    let mut transcript = base.forked(E0_LABEL, &[]);
    for point in last_points {
        transcript.message(POINT_LABEL, &curve::compress_or_zero(point));
    }
    Scalar::generate_biased(&mut transcript.challenge(CHALLENGE_LABEL))
}

/// A public key in a ring: the digit commitment, minus a candidate digit.
fn member(layout: &Layout, digit_commit: &ProjectivePoint, ring: usize, j: usize) -> ProjectivePoint {
    *digit_commit - curve::generator_h() * (Scalar::from(j as u64) * layout.place(ring))
}

/// The parts of an encoded proof.
struct Parsed<'a> {
    layout: Layout,
    header: &'a [u8],
    digit_bytes: &'a [u8],
    digit_commits: Vec<ProjectivePoint>,
    e0: Scalar,
    responses: Vec<Vec<Scalar>>,
    ciphertext: &'a [u8],
}

impl<'a> Parsed<'a> {
    fn parse(bytes: &'a [u8]) -> Option<Self> {
        let layout = Layout::parse_header(bytes)?;
        let rings = layout.rings();
        let mut at = HEADER_SIZE;

        let digit_bytes = bytes.get(at..at + POINT_SIZE * (rings - 1))?;
        let digit_commits = digit_bytes
            .chunks_exact(POINT_SIZE)
            .map(|chunk| curve::parse_point(chunk).map(ProjectivePoint::from))
            .collect::<Option<Vec<_>>>()?;
        at += digit_bytes.len();

        let e0 = curve::scalar_from_bytes(bytes.get(at..at + SCALAR_SIZE)?.try_into().ok()?)?;
        at += SCALAR_SIZE;

        let mut responses = Vec::with_capacity(rings);
        for ring in 0..rings {
            let mut row = Vec::with_capacity(layout.ring_size(ring));
            for _ in 0..layout.ring_size(ring) {
                let s = bytes.get(at..at + SCALAR_SIZE)?.try_into().ok()?;
                row.push(curve::scalar_from_bytes(s)?);
                at += SCALAR_SIZE;
            }
            responses.push(row);
        }

        let len = bytes.get(at..at + LENGTH_SIZE)?;
        let len = usize::from(u16::from_be_bytes([len[0], len[1]]));
        at += LENGTH_SIZE;
        if len > PROOF_MSG_SIZE || bytes.len() != layout.proof_size(len) {
            return None;
        }
        let ciphertext = &bytes[at..];

        Some(Self {
            layout,
            header: &bytes[..HEADER_SIZE],
            digit_bytes,
            digit_commits,
            e0,
            responses,
            ciphertext,
        })
    }

    /// Fill in the implicit last digit commitment, given the full commitment.
    fn all_digit_commits(&self, commitment: &Commitment) -> Option<Vec<ProjectivePoint>> {
        let total = commitment.parse()?.to_projective();
        let explicit: ProjectivePoint = self.digit_commits.iter().sum();
        let last = total - curve::generator_h() * Scalar::from(self.layout.min) - explicit;
        let mut out = self.digit_commits.clone();
        out.push(last);
        Some(out)
    }

    fn base_transcript(&self, commitment: &Commitment, extra_commit: &[u8]) -> Transcript {
        base_transcript(
            self.header,
            commitment,
            extra_commit,
            self.digit_bytes,
            self.ciphertext,
        )
    }

    /// Walk every ring, returning the challenge at each member if the rings close.
    fn walk(&self, commitment: &Commitment, extra_commit: &[u8]) -> Option<Vec<Vec<Scalar>>> {
        let digit_commits = self.all_digit_commits(commitment)?;
        let base = self.base_transcript(commitment, extra_commit);
        let g = curve::generator_g();

        let mut challenges = Vec::with_capacity(self.layout.rings());
        let mut last_points = Vec::with_capacity(self.layout.rings());
        let e0_bytes = curve::scalar_to_bytes(&self.e0);
        for (ring, responses) in self.responses.iter().enumerate() {
            let mut row = Vec::with_capacity(responses.len());
            let mut e = edge_challenge(&base, ring, 0, &e0_bytes);
            let mut point = ProjectivePoint::IDENTITY;
            for (j, s) in responses.iter().enumerate() {
                if j > 0 {
                    e = point_challenge(&base, ring, j, &point);
                }
                row.push(e);
                point = g * s - member(&self.layout, &digit_commits[ring], ring, j) * e;
            }
            last_points.push(point);
            challenges.push(row);
        }

        if shared_challenge(&base, &last_points) != self.e0 {
            return None;
        }
        Some(challenges)
    }
}

/// The legacy range prover.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeProof {
    config: RangeProofConfig,
}

impl RangeProof {
    pub fn new(config: RangeProofConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RangeProofConfig {
        &self.config
    }

    /// Verify a proof, returning the proven range if it checks out.
    pub fn verify_range(
        &self,
        commitment: &Commitment,
        proof: &Proof,
        extra_commit: &[u8],
    ) -> Option<RangeInfo> {
        let parsed = Parsed::parse(proof.as_bytes())?;
        parsed.walk(commitment, extra_commit)?;
        parsed.layout.info()
    }

    /// Read the public range out of a proof, without verifying it.
    pub fn info(&self, proof: &Proof) -> Option<RangeInfo> {
        Layout::parse_header(proof.as_bytes())?.info()
    }

    /// Recover the value, blinding factor, and message from a proof.
    ///
    /// This only works with the nonce used to create the proof. With any other
    /// nonce, or if the proof fails to verify, this reports failure, with every
    /// other field zeroed.
    pub fn rewind(
        &self,
        commitment: &Commitment,
        proof: &Proof,
        nonce: &[u8; 32],
        extra_commit: &[u8],
    ) -> ProofInfo {
        match rewind(commitment, proof, nonce, extra_commit) {
            Some(info) => info,
            None => {
                trace!("rewinding a range proof failed");
                ProofInfo::failure()
            }
        }
    }
}

fn rewind(
    commitment: &Commitment,
    proof: &Proof,
    nonce: &[u8; 32],
    extra_commit: &[u8],
) -> Option<ProofInfo> {
    let parsed = Parsed::parse(proof.as_bytes())?;
    let challenges = parsed.walk(commitment, extra_commit)?;
    let layout = parsed.layout;
    let rings = layout.rings();

    let mut stream = scalar_stream(
        nonce,
        commitment,
        parsed.header,
        extra_commit,
        parsed.ciphertext,
    );
    let mut blind = Scalar::ZERO;
    for _ in 0..rings - 1 {
        blind += Scalar::generate_biased(&mut stream);
    }

    let mut digits = 0u64;
    let mut last = None;
    for (ring, responses) in parsed.responses.iter().enumerate() {
        let k = Scalar::generate_biased(&mut stream);
        let mut secret = None;
        for (j, s) in responses.iter().enumerate() {
            if Scalar::generate_biased(&mut stream) != *s {
                if secret.is_some() {
                    return None;
                }
                secret = Some(j);
            }
        }
        let secret = secret?;
        digits |= (secret as u64) << (2 * ring);
        if ring + 1 == rings {
            last = Some((k, responses[secret], challenges[ring][secret]));
        }
    }

    let (k, s, e) = last?;
    let e_inv: Option<Scalar> = e.invert().into();
    blind += (s - k) * e_inv?;

    let value = u64::try_from(
        u128::from(layout.min) + u128::from(digits) * u128::from(layout.scale),
    )
    .ok()?;
    let expected = commitment.parse()?.to_projective();
    if pedersen::commit_point(value, &blind) != expected {
        return None;
    }

    let message = apply_keystream(nonce, commitment, parsed.ciphertext);
    Some(ProofInfo {
        success: true,
        value,
        blind: BlindingFactor::from_scalar(blind),
        message,
        min: layout.min,
        max: layout.max()?,
        exp: layout.exp,
        mantissa: layout.mantissa,
    })
}

impl RangeProver for RangeProof {
    fn prove(&self, request: &ProveRequest<'_>) -> Result<Proof> {
        if request.message.len() > PROOF_MSG_SIZE {
            return Err(Error::MessageTooLong {
                max: PROOF_MSG_SIZE,
                found: request.message.len(),
            });
        }
        let (layout, digits) = plan(request.value, request.min_value, &self.config)?;
        let rings = layout.rings();
        let header = layout.header();
        let nonce = request.nonce_bytes();
        let total = request
            .commitment
            .parse()
            .ok_or(Error::InvalidPoint)?
            .to_projective();
        let g = curve::generator_g();
        let h = curve::generator_h();

        let ciphertext = apply_keystream(&nonce, request.commitment, request.message);
        let mut stream = scalar_stream(
            &nonce,
            request.commitment,
            &header,
            request.extra_commit,
            &ciphertext,
        );

        let mut blinds: Vec<Scalar> = (0..rings - 1)
            .map(|_| Scalar::generate_biased(&mut stream))
            .collect();
        let explicit_sum: Scalar = blinds.iter().sum();
        blinds.push(*request.blind.scalar() - explicit_sum);
        let secrets: Vec<usize> = (0..rings)
            .map(|ring| ((digits >> (2 * ring)) & 3) as usize)
            .collect();

        let mut digit_commits = Vec::with_capacity(rings);
        let mut digit_bytes = Vec::with_capacity(POINT_SIZE * (rings - 1));
        for ring in 0..rings - 1 {
            let c = h * (Scalar::from(secrets[ring] as u64) * layout.place(ring)) + g * blinds[ring];
            let bytes = curve::compress_point(&c.to_affine())
                .ok_or_else(|| Error::ProofFailed("digit commitment is the identity".to_owned()))?;
            digit_bytes.extend_from_slice(&bytes);
            digit_commits.push(c);
        }
        let explicit: ProjectivePoint = digit_commits.iter().sum();
        digit_commits.push(total - h * Scalar::from(layout.min) - explicit);

        let base = base_transcript(
            &header,
            request.commitment,
            request.extra_commit,
            &digit_bytes,
            &ciphertext,
        );

        let mut nonces = Vec::with_capacity(rings);
        let mut responses = Vec::with_capacity(rings);
        for ring in 0..rings {
            nonces.push(Scalar::generate_biased(&mut stream));
            responses.push(
                (0..layout.ring_size(ring))
                    .map(|_| Scalar::generate_biased(&mut stream))
                    .collect::<Vec<_>>(),
            );
        }

        // Go from each secret member to the end of its ring.
        let mut last_points = Vec::with_capacity(rings);
        for ring in 0..rings {
            let mut point = g * nonces[ring];
            for j in secrets[ring] + 1..layout.ring_size(ring) {
                let e = point_challenge(&base, ring, j, &point);
                point = g * responses[ring][j] - member(&layout, &digit_commits[ring], ring, j) * e;
            }
            last_points.push(point);
        }
        let e0 = shared_challenge(&base, &last_points);
        let e0_bytes = curve::scalar_to_bytes(&e0);

        // Then from the start of each ring back around to the secret member.
        for ring in 0..rings {
            let mut e = edge_challenge(&base, ring, 0, &e0_bytes);
            for j in 0..secrets[ring] {
                let point =
                    g * responses[ring][j] - member(&layout, &digit_commits[ring], ring, j) * e;
                e = point_challenge(&base, ring, j + 1, &point);
            }
            responses[ring][secrets[ring]] = nonces[ring] + e * blinds[ring];
        }

        let mut out = Vec::with_capacity(layout.proof_size(ciphertext.len()));
        out.extend_from_slice(&header);
        out.extend_from_slice(&digit_bytes);
        out.extend_from_slice(&e0_bytes);
        for s in responses.iter().flatten() {
            out.extend_from_slice(&curve::scalar_to_bytes(s));
        }
        out.extend_from_slice(&(ciphertext.len() as u16).to_be_bytes());
        out.extend_from_slice(&ciphertext);

        blinds.iter_mut().for_each(zeroize::Zeroize::zeroize);
        nonces.iter_mut().for_each(zeroize::Zeroize::zeroize);

        trace!(
            "created range proof: {} rings, {} bytes, range starting at {}",
            rings,
            out.len(),
            layout.min
        );
        Ok(Proof::new(out))
    }

    fn verify(
        &self,
        commitment: &Commitment,
        proof: &Proof,
        extra_commit: &[u8],
        min_value: u64,
    ) -> bool {
        match self.verify_range(commitment, proof, extra_commit) {
            Some(info) => info.min >= min_value,
            None => false,
        }
    }
}
