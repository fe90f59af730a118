//! Deterministic state hashing for replay verification and desync checks.

use crate::state::CastleState;

/// FNV-1a (64-bit) hasher. Fast and stable across platforms; not
/// cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

impl CastleState {
    /// Hash of every field in declaration order. Equal states hash equal on
    /// every platform.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.turn);
        h.write_u64(self.gold);
        h.write_u64(self.food);
        h.write_u64(self.wood);
        h.write_u32(self.workers);
        h.write_u32(self.castle_level);
        h.write_u32(self.jobs.miners);
        h.write_u32(self.jobs.farmers);
        h.write_u32(self.jobs.lumberjacks);
        h.write_u32(self.jobs.builders);
        match &self.upgrade {
            None => h.write_u32(0),
            Some(up) => {
                h.write_u32(1);
                h.write_u32(up.target_level);
                h.write_u64(up.progress);
                h.write_u64(up.wood_required);
            }
        }
        h.finish()
    }
}
