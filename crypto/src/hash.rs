//! Blake2b digests of holder payloads.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// 256-bit Blake2b digest.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

/// Short hex fingerprint of a payload, for correlating log lines without
/// logging the payload itself.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(&blake2b_256(data)[..8])
}
