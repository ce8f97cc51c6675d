use k256::ProjectivePoint;

use crate::curve::hash_to_point;

const G_LABEL: &[u8] = b"cait-zkp v0.1.0 bulletproof G";
const H_LABEL: &[u8] = b"cait-zkp v0.1.0 bulletproof H";

/// The vectors of generators a bulletproof commits to its bits with.
///
/// These are hashed onto the curve, so nobody knows any relation between them,
/// or with the commitment generators.
#[derive(Debug, Clone)]
pub struct BulletproofGens {
    g: Vec<ProjectivePoint>,
    h: Vec<ProjectivePoint>,
}

impl BulletproofGens {
    /// Create `capacity` generators of each kind.
    pub fn new(capacity: usize) -> Self {
        let derive = |label: &[u8]| -> Vec<ProjectivePoint> {
            (0..capacity)
                .map(|i| hash_to_point(label, &(i as u64).to_be_bytes()))
                .collect()
        };
        Self {
            g: derive(G_LABEL),
            h: derive(H_LABEL),
        }
    }

    pub fn capacity(&self) -> usize {
        self.g.len()
    }

    /// The first `n` G generators.
    pub fn g(&self, n: usize) -> &[ProjectivePoint] {
        &self.g[..n.min(self.g.len())]
    }

    /// The first `n` H generators.
    pub fn h(&self, n: usize) -> &[ProjectivePoint] {
        &self.h[..n.min(self.h.len())]
    }
}
