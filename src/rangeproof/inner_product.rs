use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;

use crate::{curve, math::inner_product};

/// The label we use for hashing the left cross term.
const L_LABEL: &[u8] = b"inner product L";
/// The label we use for hashing the right cross term.
const R_LABEL: &[u8] = b"inner product R";
/// The label we use for generating the folding challenge.
const CHALLENGE_LABEL: &[u8] = b"inner product challenge";

/// Represents a proof that `P = <a, G> + <b, H> + <a, b> Q`.
///
/// Each round halves the vectors, so this has `log2(n)` pairs of cross terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerProductProof {
    pub l_vec: Vec<ProjectivePoint>,
    pub r_vec: Vec<ProjectivePoint>,
    pub a: Scalar,
    pub b: Scalar,
}

/// Absorb a round's cross terms, returning the challenge and its inverse.
fn round_challenge(
    transcript: &mut Transcript,
    l: &ProjectivePoint,
    r: &ProjectivePoint,
) -> (Scalar, Scalar) {
    transcript.message(L_LABEL, &curve::compress_or_zero(l));
    transcript.message(R_LABEL, &curve::compress_or_zero(r));
    let mut rng = transcript.challenge(CHALLENGE_LABEL);
    loop {
        let u = Scalar::generate_biased(&mut rng);
        if let Some(u_inv) = Option::<Scalar>::from(u.invert()) {
            return (u, u_inv);
        }
    }
}

fn multiply(scalars: &[Scalar], points: &[ProjectivePoint]) -> ProjectivePoint {
    scalars.iter().zip(points).map(|(s, p)| *p * s).sum()
}

/// Prove knowledge of `a` and `b` for the point `<a, G> + <b, H> + <a, b> Q`.
///
/// All the vectors must have the same power of two length.
pub fn prove(
    transcript: &mut Transcript,
    q: &ProjectivePoint,
    mut g: Vec<ProjectivePoint>,
    mut h: Vec<ProjectivePoint>,
    mut a: Vec<Scalar>,
    mut b: Vec<Scalar>,
) -> InnerProductProof {
    let mut l_vec = Vec::new();
    let mut r_vec = Vec::new();

    let mut n = a.len();
    while n > 1 {
        n /= 2;
        let (a_lo, a_hi) = a.split_at(n);
        let (b_lo, b_hi) = b.split_at(n);
        let (g_lo, g_hi) = g.split_at(n);
        let (h_lo, h_hi) = h.split_at(n);

        let c_l = inner_product(a_lo, b_hi);
        let c_r = inner_product(a_hi, b_lo);
        let l = multiply(a_lo, g_hi) + multiply(b_hi, h_lo) + *q * c_l;
        let r = multiply(a_hi, g_lo) + multiply(b_lo, h_hi) + *q * c_r;

        let (u, u_inv) = round_challenge(transcript, &l, &r);
        l_vec.push(l);
        r_vec.push(r);

        a = (0..n).map(|i| a_lo[i] * u + a_hi[i] * u_inv).collect();
        b = (0..n).map(|i| b_lo[i] * u_inv + b_hi[i] * u).collect();
        g = (0..n).map(|i| g_lo[i] * u_inv + g_hi[i] * u).collect();
        h = (0..n).map(|i| h_lo[i] * u + h_hi[i] * u_inv).collect();
    }

    InnerProductProof {
        l_vec,
        r_vec,
        a: a[0],
        b: b[0],
    }
}

/// Verify a proof for the point `p`, relative to the generators `g`, `h`, and `q`.
#[must_use]
pub fn verify(
    transcript: &mut Transcript,
    q: &ProjectivePoint,
    g: &[ProjectivePoint],
    h: &[ProjectivePoint],
    p: &ProjectivePoint,
    proof: &InnerProductProof,
) -> bool {
    let n = g.len();
    if !n.is_power_of_two()
        || h.len() != n
        || proof.l_vec.len() != proof.r_vec.len()
        || proof.l_vec.len() != n.trailing_zeros() as usize
    {
        return false;
    }

    let mut g = g.to_vec();
    let mut h = h.to_vec();
    let mut p = *p;
    for (l, r) in proof.l_vec.iter().zip(&proof.r_vec) {
        let (u, u_inv) = round_challenge(transcript, l, r);
        let half = g.len() / 2;
        g = (0..half).map(|i| g[i] * u_inv + g[half + i] * u).collect();
        h = (0..half).map(|i| h[i] * u + h[half + i] * u_inv).collect();
        p += *l * u.square() + *r * u_inv.square();
    }

    p == g[0] * proof.a + h[0] * proof.b + *q * (proof.a * proof.b)
}
