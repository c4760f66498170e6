//! CSPRNG access for content keys and ephemeral material.

use rand::RngCore;
use zeroize::Zeroizing;

/// Fill a buffer with random bytes from the thread-local CSPRNG.
pub fn fill(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// A fresh random key of `len` bytes, zeroized on drop.
pub fn random_key(len: usize) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    fill(&mut buf);
    buf
}
