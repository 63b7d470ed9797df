//! Seeded Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. Every session owns one instance,
//! so mine placement and the opening coin flip are reproducible from the
//! session seed alone.

use sha2::{Digest, Sha256};

/// Seeded PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use mine_duel::core::rng::SessionRng;
///
/// let mut a = SessionRng::new(12345);
/// let mut b = SessionRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct SessionRng {
    state: [u64; 2],
}

impl Default for SessionRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SessionRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift never leaves the all-zero state
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a uniform integer in `[0, max)`.
    ///
    /// Draws above the largest multiple of `max` are rejected, so small
    /// ranges carry no modulo bias.
    pub fn next_index(&mut self, max: usize) -> usize {
        if max <= 1 {
            return 0;
        }
        let max = max as u64;
        let zone = u64::MAX - (u64::MAX % max);
        loop {
            let value = self.next_u64();
            if value < zone {
                return (value % max) as usize;
            }
        }
    }

    /// Fair coin flip.
    #[inline]
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a session seed from the session id and both players.
///
/// Player order matters: the pair is stored in queue order and the seed is
/// bound to that order.
pub fn derive_session_seed(session_id: &[u8; 16], players: &[[u8; 16]; 2]) -> u64 {
    let mut hasher = Sha256::new();

    hasher.update(b"MINE_DUEL_SEED_V1");
    hasher.update(session_id);
    for pid in players {
        hasher.update(pid);
    }

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = SessionRng::new(12345);
        let mut rng2 = SessionRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SessionRng::new(12345);
        let mut rng2 = SessionRng::new(54321);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_index_bounds() {
        let mut rng = SessionRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_index(25) < 25);
        }

        assert_eq!(rng.next_index(0), 0);
        assert_eq!(rng.next_index(1), 0);
    }

    #[test]
    fn test_next_index_covers_range() {
        let mut rng = SessionRng::new(77);
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[rng.next_index(5)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_coin_flip_is_roughly_fair() {
        let mut rng = SessionRng::new(2024);
        let heads = (0..10_000).filter(|_| rng.next_bool()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {}", heads);
    }

    #[test]
    fn test_derive_session_seed() {
        let session_id = [1u8; 16];
        let players = [[2u8; 16], [3u8; 16]];

        let seed1 = derive_session_seed(&session_id, &players);
        let seed2 = derive_session_seed(&session_id, &players);
        assert_eq!(seed1, seed2);

        let other_session = derive_session_seed(&[9u8; 16], &players);
        assert_ne!(seed1, other_session);

        let swapped = derive_session_seed(&session_id, &[[3u8; 16], [2u8; 16]]);
        assert_ne!(seed1, swapped);
    }
}
