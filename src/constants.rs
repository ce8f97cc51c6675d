//! Fixed generators and size contracts.
//!
//! The generator encodings are x || y, both big endian. They must not change,
//! since every commitment ever created depends on them.

/// The standard secp256k1 base point.
pub const GENERATOR_G: [u8; 64] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
    0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65, 0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08, 0xa8,
    0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19, 0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10, 0xd4, 0xb8,
];

/// The value generator for commitments, with unknown discrete log relative to G.
pub const GENERATOR_H: [u8; 64] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a, 0x5e,
    0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a, 0xc0,
    0x31, 0xd3, 0xc6, 0x86, 0x39, 0x73, 0x92, 0x6e, 0x04, 0x9e, 0x63, 0x7c, 0xb1, 0xb5, 0xf4, 0x0a,
    0x36, 0xda, 0xc2, 0x8a, 0xf1, 0x76, 0x69, 0x68, 0xc3, 0x0c, 0x23, 0x13, 0xf3, 0xa3, 0x89, 0x04,
];

/// The auxiliary generator for switch commitments.
///
/// This is the curve point whose x coordinate is sha256(sha256(uncompressed G)).
/// Unlike G and H, it is kept in the raw libsecp256k1 layout, with each
/// coordinate stored little endian.
pub const GENERATOR_J: [u8; 64] = [
    0x5f, 0x15, 0x21, 0x36, 0x93, 0x93, 0x01, 0x2a, 0x8d, 0x8b, 0x39, 0x7e, 0x9b, 0xf4, 0x54, 0x29,
    0x2f, 0x5a, 0x1b, 0x3d, 0x38, 0x85, 0x16, 0xc2, 0xf3, 0x03, 0xfc, 0x95, 0x67, 0xf5, 0x60, 0xb8,
    0x3a, 0xc4, 0xc5, 0xa6, 0xdc, 0xa2, 0x01, 0x59, 0xfc, 0x56, 0xcf, 0x74, 0x9a, 0xa6, 0xa5, 0x65,
    0x31, 0x6a, 0xa5, 0x03, 0x74, 0x42, 0x3f, 0x42, 0x53, 0x8f, 0xaa, 0x2c, 0xd3, 0x09, 0x3f, 0xa4,
];

pub const SECRET_KEY_SIZE: usize = 32;
pub const BLIND_LENGTH: usize = 32;
pub const SEED_LENGTH: usize = 32;
pub const MESSAGE_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

/// The internal form of a point, x || y.
pub const PUBLIC_KEY_SIZE: usize = 64;
pub const PUBLIC_KEY_COMPRESSED_SIZE: usize = 33;
pub const PUBLIC_KEY_UNCOMPRESSED_SIZE: usize = 65;

pub const PEDERSEN_COMMITMENT_SIZE: usize = 33;
pub const PEDERSEN_COMMITMENT_SIZE_INTERNAL: usize = 64;

/// The largest message a legacy range proof can carry.
pub const PROOF_MSG_SIZE: usize = 4096;

/// The largest message a bulletproof can carry.
pub const BULLETPROOF_MSG_SIZE: usize = 20;

/// Upper bound on the size of a legacy range proof.
///
/// This is a header, 31 explicit digit commitments, the shared challenge,
/// 4 responses for each of the 32 rings, and a length prefixed message.
pub const MAX_PROOF_SIZE: usize = 10 + 31 * 33 + 32 + 128 * 32 + 2 + PROOF_MSG_SIZE;

/// Upper bound on the size of a single 64 bit bulletproof.
pub const MAX_BULLETPROOF_SIZE: usize = 4 * 33 + 3 * 32 + 2 * 6 * 33 + 2 * 32;
