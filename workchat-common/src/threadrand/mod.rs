use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

/// A per-thread ChaCha20 generator seeded from the OS.
pub struct SecureRng;

impl SecureRng {
    pub fn next_u128() -> u128 {
        let mut bytes = [0u8; 16];
        SecureRng.fill_bytes(&mut bytes);
        u128::from_le_bytes(bytes)
    }

    pub fn next_bytes<const N: usize>() -> [u8; N] {
        let mut bytes = [0u8; N];
        SecureRng.fill_bytes(&mut bytes);
        bytes
    }
}

impl RngCore for SecureRng {
    fn next_u32(&mut self) -> u32 {
        // Only the owning thread touches its RNG
        RNG.with(|rng| unsafe { rand_chacha::rand_core::RngCore::next_u32(&mut *rng.get()) })
    }

    fn next_u64(&mut self) -> u64 {
        RNG.with(|rng| unsafe { rand_chacha::rand_core::RngCore::next_u64(&mut *rng.get()) })
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        RNG.with(|rng| unsafe {
            rand_chacha::rand_core::RngCore::fill_bytes(&mut *rng.get(), dest)
        })
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for SecureRng {}
