//! Shard selection
//!
//! Picks one consumer of a shard group from the envelope's provenance. Every
//! router instance that sees the same provenance and holds the same member
//! order picks the same member, with no coordination.

use contracts::RoutableEnvelope;

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// Incremental 32-bit FNV-1a hash
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a32(u32);

impl Fnv1a32 {
    pub fn new() -> Self {
        Self(FNV32_OFFSET_BASIS)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u32::from(byte);
            self.0 = self.0.wrapping_mul(FNV32_PRIME);
        }
    }

    pub fn finish(&self) -> u32 {
        self.0
    }
}

impl Default for Fnv1a32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of origin, deployment, job, index and ip, fed in that order
pub fn provenance_hash<E: RoutableEnvelope + ?Sized>(envelope: &E) -> u32 {
    let mut hasher = Fnv1a32::new();
    hasher.write(envelope.origin().as_bytes());
    hasher.write(envelope.deployment().as_bytes());
    hasher.write(envelope.job().as_bytes());
    hasher.write(envelope.index().as_bytes());
    hasher.write(envelope.ip().as_bytes());
    hasher.finish()
}

/// Index of the group member that receives `envelope`
///
/// # Panics
/// Panics when `members` is zero. The registry never keeps an empty group, so
/// reaching this means the registry is corrupt.
pub fn select<E: RoutableEnvelope + ?Sized>(envelope: &E, members: usize) -> usize {
    assert!(members > 0, "shard selection over an empty group");
    (provenance_hash(envelope) % members as u32) as usize
}
