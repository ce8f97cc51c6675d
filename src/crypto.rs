use std::io::Write;

use ck_meow::Meow;
use serde::{Deserialize, Serialize};

use crate::serde::encode_writer;

const HASH_LABEL: &[u8] = b"cait-zkp v0.1.0 hash";
const COMMIT_LABEL: &[u8] = b"cait-zkp v0.1.0 commitment";
const HASH_LEN: usize = 32;

struct MeowWriter<'a>(&'a mut Meow);

impl<'a> Write for MeowWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.ad(buf, true);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Represents the output of a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest([u8; HASH_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; HASH_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn meow_digest<T: Serialize + ?Sized>(label: &[u8], val: &T) -> Digest {
    let mut meow = Meow::new(label);

    meow.ad(&[], false);
    encode_writer(&mut MeowWriter(&mut meow), val);

    let mut out = [0u8; HASH_LEN];
    meow.prf(&mut out, false);

    Digest(out)
}

/// Hash an arbitrary serializable value.
pub fn hash<T: Serialize + ?Sized>(val: &T) -> Digest {
    meow_digest(HASH_LABEL, val)
}

/// Commit to an arbitrary serializable value.
///
/// Unlike [hash], this is domain separated so that a commitment can never be
/// confused with some other digest of the same value.
pub fn commit<T: Serialize + ?Sized>(val: &T) -> Digest {
    meow_digest(COMMIT_LABEL, val)
}
