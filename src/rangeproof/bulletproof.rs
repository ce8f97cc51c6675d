//! Single value bulletproofs.
//!
//! This proves that `V - min * H` commits to a value in `[0, 2^n)`, by
//! committing to the bits of that value, and then using an inner product
//! argument to show that the bit vector satisfies the right relations.
//! The proof has logarithmic size: for 64 bits, it's 688 bytes.
//!
//! The randomness comes from two nonces. The rewind nonce drives the blinding
//! of the bit commitments, which also carries the embedded message, while the
//! private nonce drives the masking vectors.
//!
//! # Layout
//!
//! ```text
//! A | S | T1 | T2 : 33 each
//! tau_x | mu | t_hat : 32 each
//! (L_i | R_i) for each of the log2(n) rounds : 33 each
//! a | b : 32 each
//! ```
use k256::{ProjectivePoint, Scalar};
use log::trace;
use magikitten::{MeowRng, Transcript};

use super::{
    generators::BulletproofGens,
    inner_product::{self as ipa, InnerProductProof},
    Proof, ProveRequest, RangeProver,
};
use crate::{
    config::BulletProofConfig,
    constants::BULLETPROOF_MSG_SIZE,
    curve,
    error::{Error, Result},
    math::{inner_product, powers, random_vector, sum_of_powers, VectorPolynomial},
    pedersen::Commitment,
};

const POINT_SIZE: usize = 33;
const SCALAR_SIZE: usize = 32;

const PROOF_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 bulletproof";
const NONCE_PROTOCOL: &[u8] = b"cait-zkp v0.1.0 bulletproof nonce";

const BITS_LABEL: &[u8] = b"bits";
const MIN_VALUE_LABEL: &[u8] = b"min value";
const COMMITMENT_LABEL: &[u8] = b"commitment";
const EXTRA_COMMIT_LABEL: &[u8] = b"extra commit";
const A_LABEL: &[u8] = b"A";
const S_LABEL: &[u8] = b"S";
const Y_LABEL: &[u8] = b"y";
const Z_LABEL: &[u8] = b"z";
const T1_LABEL: &[u8] = b"T1";
const T2_LABEL: &[u8] = b"T2";
const X_LABEL: &[u8] = b"x";
const OPENING_LABEL: &[u8] = b"opening";
const W_LABEL: &[u8] = b"w";

const KIND_LABEL: &[u8] = b"kind";
const NONCE_LABEL: &[u8] = b"nonce";
const MESSAGE_LABEL: &[u8] = b"message";
const STREAM_LABEL: &[u8] = b"stream";
const REWIND_KIND: &[u8] = b"rewind";
const PRIVATE_KIND: &[u8] = b"private";

fn statement_transcript(
    bits: usize,
    min_value: u64,
    commitment: &Commitment,
    extra_commit: &[u8],
) -> Transcript {
    let mut transcript = Transcript::new(PROOF_PROTOCOL);
    transcript.message(BITS_LABEL, &(bits as u64).to_be_bytes());
    transcript.message(MIN_VALUE_LABEL, &min_value.to_be_bytes());
    transcript.message(COMMITMENT_LABEL, commitment.as_bytes());
    transcript.message(EXTRA_COMMIT_LABEL, extra_commit);
    transcript
}

fn nonce_stream(kind: &[u8], nonce: &[u8; 32], request: &ProveRequest<'_>) -> MeowRng {
    let mut transcript = Transcript::new(NONCE_PROTOCOL);
    transcript.message(KIND_LABEL, kind);
    transcript.message(NONCE_LABEL, nonce);
    transcript.message(MIN_VALUE_LABEL, &request.min_value.to_be_bytes());
    transcript.message(COMMITMENT_LABEL, request.commitment.as_bytes());
    transcript.message(EXTRA_COMMIT_LABEL, request.extra_commit);
    transcript.message(MESSAGE_LABEL, request.message);
    transcript.challenge(STREAM_LABEL)
}

fn challenge(transcript: &mut Transcript, label: &'static [u8]) -> Scalar {
    Scalar::generate_biased(&mut transcript.challenge(label))
}

/// The embedded message, as a scalar folded into the bit commitment's blind.
fn message_scalar(message: &[u8]) -> Scalar {
    let mut bytes = [0u8; 32];
    bytes[32 - BULLETPROOF_MSG_SIZE..32 - BULLETPROOF_MSG_SIZE + message.len()]
        .copy_from_slice(message);
    curve::reduce_bytes(&bytes)
}

fn multiply(scalars: &[Scalar], points: &[ProjectivePoint]) -> ProjectivePoint {
    scalars.iter().zip(points).map(|(s, p)| *p * s).sum()
}

fn write_point(out: &mut Vec<u8>, point: &ProjectivePoint) {
    out.extend_from_slice(&curve::compress_or_zero(point));
}

fn write_scalar(out: &mut Vec<u8>, scalar: &Scalar) {
    out.extend_from_slice(&curve::scalar_to_bytes(scalar));
}

/// A bulletproof, decoded from bytes.
struct BulletproofData {
    a: ProjectivePoint,
    s: ProjectivePoint,
    t1: ProjectivePoint,
    t2: ProjectivePoint,
    tau_x: Scalar,
    mu: Scalar,
    t_hat: Scalar,
    ipp: InnerProductProof,
}

impl BulletproofData {
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for point in [&self.a, &self.s, &self.t1, &self.t2] {
            write_point(&mut out, point);
        }
        for scalar in [&self.tau_x, &self.mu, &self.t_hat] {
            write_scalar(&mut out, scalar);
        }
        for (l, r) in self.ipp.l_vec.iter().zip(&self.ipp.r_vec) {
            write_point(&mut out, l);
            write_point(&mut out, r);
        }
        write_scalar(&mut out, &self.ipp.a);
        write_scalar(&mut out, &self.ipp.b);
        out
    }

    fn from_bytes(bytes: &[u8], rounds: usize) -> Option<Self> {
        if bytes.len() != proof_size(rounds) {
            return None;
        }
        let mut reader = Reader { bytes, at: 0 };
        let (a, s, t1, t2) = (
            reader.point()?,
            reader.point()?,
            reader.point()?,
            reader.point()?,
        );
        let (tau_x, mu, t_hat) = (reader.scalar()?, reader.scalar()?, reader.scalar()?);
        let mut l_vec = Vec::with_capacity(rounds);
        let mut r_vec = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            l_vec.push(reader.point()?);
            r_vec.push(reader.point()?);
        }
        let ipp = InnerProductProof {
            l_vec,
            r_vec,
            a: reader.scalar()?,
            b: reader.scalar()?,
        };

        Some(Self {
            a,
            s,
            t1,
            t2,
            tau_x,
            mu,
            t_hat,
            ipp,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let out = self.bytes.get(self.at..self.at + n)?;
        self.at += n;
        Some(out)
    }

    fn point(&mut self) -> Option<ProjectivePoint> {
        curve::parse_point(self.take(POINT_SIZE)?).map(ProjectivePoint::from)
    }

    fn scalar(&mut self) -> Option<Scalar> {
        curve::scalar_from_bytes(self.take(SCALAR_SIZE)?.try_into().ok()?)
    }
}

fn proof_size(rounds: usize) -> usize {
    4 * POINT_SIZE + 3 * SCALAR_SIZE + 2 * rounds * POINT_SIZE + 2 * SCALAR_SIZE
}

/// The bulletproof prover, holding its generators.
#[derive(Debug, Clone)]
pub struct BulletProof {
    config: BulletProofConfig,
    gens: BulletproofGens,
}

impl BulletProof {
    pub fn new(config: BulletProofConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gens: BulletproofGens::new(config.bits),
            config,
        })
    }

    /// Use an existing set of generators, which must be large enough for the config.
    pub fn with_generators(config: BulletProofConfig, gens: BulletproofGens) -> Result<Self> {
        config.validate()?;
        if gens.capacity() < config.bits {
            return Err(Error::BadParameters(format!(
                "{} generators cannot support {} bits",
                gens.capacity(),
                config.bits
            )));
        }
        Ok(Self { config, gens })
    }

    pub fn config(&self) -> &BulletProofConfig {
        &self.config
    }

    fn rounds(&self) -> usize {
        self.config.bits.trailing_zeros() as usize
    }

    /// The size of every proof this prover creates.
    pub fn proof_size(&self) -> usize {
        proof_size(self.rounds())
    }
}

impl RangeProver for BulletProof {
    fn prove(&self, request: &ProveRequest<'_>) -> Result<Proof> {
        if request.message.len() > BULLETPROOF_MSG_SIZE {
            return Err(Error::MessageTooLong {
                max: BULLETPROOF_MSG_SIZE,
                found: request.message.len(),
            });
        }
        let n = self.config.bits;
        if request.value < request.min_value {
            return Err(Error::BadParameters(format!(
                "value {} is below the minimum {}",
                request.value, request.min_value
            )));
        }
        let v = request.value - request.min_value;
        if n < 64 && v >> n != 0 {
            return Err(Error::BadParameters(format!(
                "value {v} does not fit in {n} bits"
            )));
        }
        request.commitment.parse().ok_or(Error::InvalidPoint)?;

        let g = curve::generator_g();
        let h = curve::generator_h();
        let gs = self.gens.g(n);
        let hs = self.gens.h(n);
        let gamma = *request.blind.scalar();

        let mut rewind = nonce_stream(REWIND_KIND, &request.rewind_nonce_bytes(), request);
        let alpha = Scalar::generate_biased(&mut rewind) + message_scalar(request.message);
        let rho = Scalar::generate_biased(&mut rewind);
        let tau1 = Scalar::generate_biased(&mut rewind);
        let tau2 = Scalar::generate_biased(&mut rewind);
        let mut private = nonce_stream(PRIVATE_KIND, &request.nonce_bytes(), request);
        let s_l = random_vector(&mut private, n);
        let s_r = random_vector(&mut private, n);

        let mut transcript = statement_transcript(
            n,
            request.min_value,
            request.commitment,
            request.extra_commit,
        );

        // Commit to the bits, and to the masks.
        let a_l: Vec<Scalar> = (0..n).map(|i| Scalar::from((v >> i) & 1)).collect();
        let a_r: Vec<Scalar> = a_l.iter().map(|bit| *bit - Scalar::ONE).collect();
        let big_a = g * alpha + multiply(&a_l, gs) + multiply(&a_r, hs);
        let big_s = g * rho + multiply(&s_l, gs) + multiply(&s_r, hs);
        transcript.message(A_LABEL, &curve::compress_or_zero(&big_a));
        transcript.message(S_LABEL, &curve::compress_or_zero(&big_s));
        let y = challenge(&mut transcript, Y_LABEL);
        let z = challenge(&mut transcript, Z_LABEL);

        // Commit to the coefficients of t(X) = <l(X), r(X)>.
        let y_n = powers(&y, n);
        let two_n = powers(&Scalar::from(2u64), n);
        let z2 = z.square();
        let l_poly = VectorPolynomial::new(a_l.iter().map(|bit| *bit - z).collect(), s_l);
        let r_poly = VectorPolynomial::new(
            (0..n)
                .map(|i| y_n[i] * (a_r[i] + z) + z2 * two_n[i])
                .collect(),
            (0..n).map(|i| y_n[i] * s_r[i]).collect(),
        );
        let [_, t1, t2] = l_poly.inner_product(&r_poly);
        let big_t1 = h * t1 + g * tau1;
        let big_t2 = h * t2 + g * tau2;
        transcript.message(T1_LABEL, &curve::compress_or_zero(&big_t1));
        transcript.message(T2_LABEL, &curve::compress_or_zero(&big_t2));
        let x = challenge(&mut transcript, X_LABEL);

        // Open everything at x.
        let tau_x = tau2 * x.square() + tau1 * x + z2 * gamma;
        let mu = alpha + rho * x;
        let l = l_poly.evaluate(&x);
        let r = r_poly.evaluate(&x);
        let t_hat = inner_product(&l, &r);
        let mut opening = Vec::with_capacity(3 * SCALAR_SIZE);
        for scalar in [&tau_x, &mu, &t_hat] {
            write_scalar(&mut opening, scalar);
        }
        transcript.message(OPENING_LABEL, &opening);
        let w = challenge(&mut transcript, W_LABEL);
        let q = h * w;

        let y_inv: Option<Scalar> = y.invert().into();
        let y_inv = y_inv.ok_or_else(|| Error::ProofFailed("y challenge was zero".to_owned()))?;
        let hs_prime: Vec<ProjectivePoint> = hs
            .iter()
            .zip(powers(&y_inv, n))
            .map(|(h, y_inv_i)| *h * y_inv_i)
            .collect();
        let ipp = ipa::prove(&mut transcript, &q, gs.to_vec(), hs_prime, l, r);

        let data = BulletproofData {
            a: big_a,
            s: big_s,
            t1: big_t1,
            t2: big_t2,
            tau_x,
            mu,
            t_hat,
            ipp,
        };
        let bytes = data.to_bytes();
        trace!("created {n} bit bulletproof of {} bytes", bytes.len());
        Ok(Proof::new(bytes))
    }

    fn verify(
        &self,
        commitment: &Commitment,
        proof: &Proof,
        extra_commit: &[u8],
        min_value: u64,
    ) -> bool {
        let n = self.config.bits;
        let Some(data) = BulletproofData::from_bytes(proof.as_bytes(), self.rounds()) else {
            trace!("bulletproof failed to parse");
            return false;
        };
        let Some(v) = commitment.parse() else {
            return false;
        };
        let g = curve::generator_g();
        let h = curve::generator_h();
        let gs = self.gens.g(n);
        let hs = self.gens.h(n);
        let v = v.to_projective() - h * Scalar::from(min_value);

        let mut transcript = statement_transcript(n, min_value, commitment, extra_commit);
        transcript.message(A_LABEL, &curve::compress_or_zero(&data.a));
        transcript.message(S_LABEL, &curve::compress_or_zero(&data.s));
        let y = challenge(&mut transcript, Y_LABEL);
        let z = challenge(&mut transcript, Z_LABEL);
        transcript.message(T1_LABEL, &curve::compress_or_zero(&data.t1));
        transcript.message(T2_LABEL, &curve::compress_or_zero(&data.t2));
        let x = challenge(&mut transcript, X_LABEL);
        let mut opening = Vec::with_capacity(3 * SCALAR_SIZE);
        for scalar in [&data.tau_x, &data.mu, &data.t_hat] {
            write_scalar(&mut opening, scalar);
        }
        transcript.message(OPENING_LABEL, &opening);
        let w = challenge(&mut transcript, W_LABEL);
        let q = h * w;

        // t_hat must be the evaluation of t(X), whose constant term depends on v.
        let z2 = z.square();
        let delta = (z - z2) * sum_of_powers(&y, n) - z2 * z * sum_of_powers(&Scalar::from(2u64), n);
        let lhs = h * data.t_hat + g * data.tau_x;
        let rhs = v * z2 + h * delta + data.t1 * x + data.t2 * x.square();
        if lhs != rhs {
            trace!("bulletproof polynomial check failed");
            return false;
        }

        let y_inv: Option<Scalar> = y.invert().into();
        let Some(y_inv) = y_inv else {
            return false;
        };
        let y_n = powers(&y, n);
        let two_n = powers(&Scalar::from(2u64), n);
        let hs_prime: Vec<ProjectivePoint> = hs
            .iter()
            .zip(powers(&y_inv, n))
            .map(|(h, y_inv_i)| *h * y_inv_i)
            .collect();
        let h_coeffs: Vec<Scalar> = (0..n).map(|i| z * y_n[i] + z2 * two_n[i]).collect();
        let g_sum: ProjectivePoint = gs.iter().sum();
        let p = data.a + data.s * x - g_sum * z + multiply(&h_coeffs, &hs_prime) - g * data.mu
            + q * data.t_hat;

        let ok = ipa::verify(&mut transcript, &q, gs, &hs_prime, &p, &data.ipp);
        if !ok {
            trace!("bulletproof inner product check failed");
        }
        ok
    }
}
