use std::ops::Index;

use k256::Scalar;
use rand_core::CryptoRngCore;

/// Return `[1, x, x^2, ..., x^(n - 1)]`.
pub fn powers(x: &Scalar, n: usize) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(n);
    let mut acc = Scalar::ONE;
    for _ in 0..n {
        out.push(acc);
        acc *= x;
    }
    out
}

/// Calculate `1 + x + ... + x^(n - 1)`.
pub fn sum_of_powers(x: &Scalar, n: usize) -> Scalar {
    powers(x, n).iter().sum()
}

/// The inner product of two scalar vectors.
///
/// The vectors should have the same length; extra elements in either are ignored.
pub fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b).map(|(a, b)| *a * b).sum()
}

/// Generate a vector of random scalars.
pub fn random_vector(rng: &mut impl CryptoRngCore, size: usize) -> Vec<Scalar> {
    (0..size).map(|_| Scalar::generate_biased(&mut *rng)).collect()
}

/// Represents a polynomial of degree 1, whose coefficients are scalar vectors.
///
/// This is the `l(X) = l0 + l1 X` shape used in range proofs.
#[derive(Debug, Clone)]
pub struct VectorPolynomial {
    /// The coefficients, from 0..=1.
    coefficients: [Vec<Scalar>; 2],
}

impl VectorPolynomial {
    pub fn new(c0: Vec<Scalar>, c1: Vec<Scalar>) -> Self {
        Self {
            coefficients: [c0, c1],
        }
    }

    /// Evaluate this polynomial at a given point.
    pub fn evaluate(&self, x: &Scalar) -> Vec<Scalar> {
        self.coefficients[0]
            .iter()
            .zip(&self.coefficients[1])
            .map(|(c0, c1)| *c0 + *c1 * x)
            .collect()
    }

    /// Compute the coefficients of the scalar polynomial `<self(X), other(X)>`.
    ///
    /// This uses Karatsuba's trick, so only three inner products are needed.
    pub fn inner_product(&self, other: &Self) -> [Scalar; 3] {
        let t0 = inner_product(&self[0], &other[0]);
        let t2 = inner_product(&self[1], &other[1]);

        let l_sum: Vec<Scalar> = self[0].iter().zip(&self[1]).map(|(a, b)| *a + b).collect();
        let r_sum: Vec<Scalar> = other[0].iter().zip(&other[1]).map(|(a, b)| *a + b).collect();
        let t1 = inner_product(&l_sum, &r_sum) - t0 - t2;

        [t0, t1, t2]
    }
}

impl Index<usize> for VectorPolynomial {
    type Output = Vec<Scalar>;

    fn index(&self, i: usize) -> &Self::Output {
        &self.coefficients[i]
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_powers() {
        let two = Scalar::from(2u64);
        assert_eq!(
            powers(&two, 4),
            vec![1u64, 2, 4, 8].into_iter().map(Scalar::from).collect::<Vec<_>>()
        );
        assert_eq!(sum_of_powers(&two, 4), Scalar::from(15u64));
        assert!(powers(&two, 0).is_empty());
    }

    #[test]
    fn test_vector_polynomial_inner_product_matches_evaluation() {
        let l = VectorPolynomial::new(random_vector(&mut OsRng, 8), random_vector(&mut OsRng, 8));
        let r = VectorPolynomial::new(random_vector(&mut OsRng, 8), random_vector(&mut OsRng, 8));
        let [t0, t1, t2] = l.inner_product(&r);

        let x = Scalar::generate_biased(&mut OsRng);
        let expected = inner_product(&l.evaluate(&x), &r.evaluate(&x));
        assert_eq!(t0 + t1 * x + t2 * x * x, expected);
    }
}
