//! SipHash-based buffer fingerprints and trailing canaries.
//!
//! Every result buffer carries:
//! - A 16-byte header in front of the host-visible pointer:
//!   `[u64 hash | u32 generation | u32 magic]`
//! - An 8-byte canary right after the payload, derived from the hash.
//!
//! A host that writes past the end of a result (or hands back a pointer we
//! never issued that happens to collide with a stale address) is caught at
//! release time.

/// Size of the fingerprint header placed before the user pointer.
pub const FINGERPRINT_SIZE: usize = 16;

/// Size of the trailing canary placed after the payload.
pub const CANARY_SIZE: usize = 8;

/// Per-buffer bookkeeping overhead.
pub const TOTAL_OVERHEAD: usize = FINGERPRINT_SIZE + CANARY_SIZE;

/// `"TSB1"` little-endian; identifies headers written by this crate.
pub const HEADER_MAGIC: u32 = u32::from_le_bytes(*b"TSB1");

/// Fingerprint stored in the header of every result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferFingerprint {
    /// SipHash-2-4 of (user address, payload length, generation).
    pub hash: u64,
    /// Generation the buffer was issued under.
    pub generation: u32,
    /// Always [`HEADER_MAGIC`] for headers we wrote.
    pub magic: u32,
}

impl BufferFingerprint {
    /// Compute the fingerprint for a buffer.
    #[must_use]
    pub fn compute(user_addr: usize, len: usize, generation: u32) -> Self {
        Self {
            hash: sip_hash_2_4(user_addr as u64, len as u64, generation),
            generation,
            magic: HEADER_MAGIC,
        }
    }

    /// Check the fingerprint against the buffer it claims to describe.
    #[must_use]
    pub fn verify(&self, user_addr: usize, len: usize) -> bool {
        self.magic == HEADER_MAGIC
            && self.hash == sip_hash_2_4(user_addr as u64, len as u64, self.generation)
    }

    /// Serialize to header bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FINGERPRINT_SIZE] {
        let mut buf = [0u8; FINGERPRINT_SIZE];
        buf[0..8].copy_from_slice(&self.hash.to_le_bytes());
        buf[8..12].copy_from_slice(&self.generation.to_le_bytes());
        buf[12..16].copy_from_slice(&self.magic.to_le_bytes());
        buf
    }

    /// Deserialize from header bytes.
    #[must_use]
    pub fn from_bytes(buf: &[u8; FINGERPRINT_SIZE]) -> Self {
        let mut hash = [0u8; 8];
        hash.copy_from_slice(&buf[0..8]);
        let mut generation = [0u8; 4];
        generation.copy_from_slice(&buf[8..12]);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[12..16]);
        Self {
            hash: u64::from_le_bytes(hash),
            generation: u32::from_le_bytes(generation),
            magic: u32::from_le_bytes(magic),
        }
    }

    /// Canary expected after the payload.
    #[must_use]
    pub fn canary(&self) -> Canary {
        Canary::from_hash(self.hash)
    }
}

/// 8-byte trailing canary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canary {
    pub value: [u8; CANARY_SIZE],
}

impl Canary {
    /// Derive a canary from a fingerprint hash.
    #[must_use]
    pub fn from_hash(hash: u64) -> Self {
        let folded = hash ^ hash.rotate_left(29) ^ 0xC0FF_EE15_BAAD_F00Du64;
        Self {
            value: folded.to_le_bytes(),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; CANARY_SIZE] {
        self.value
    }

    #[must_use]
    pub fn verify(&self, bytes: &[u8; CANARY_SIZE]) -> bool {
        self.value == *bytes
    }
}

/// SipHash-2-4 over a fixed 128-bit message with a compile-time key.
///
/// Integrity check only, not a MAC: the key is public.
fn sip_hash_2_4(addr: u64, len: u64, generation: u32) -> u64 {
    const K0: u64 = 0x7473_6272_6964_6765;
    const K1: u64 = 0x6f75_7463_6f6d_6531;

    let mut v = [
        K0 ^ 0x736f_6d65_7073_6575,
        K1 ^ 0x646f_7261_6e64_6f6d,
        K0 ^ 0x6c79_6765_6e65_7261,
        K1 ^ 0x7465_6462_7974_6573,
    ];

    let m0 = addr;
    let m1 = len ^ (u64::from(generation) << 40) ^ u64::from(generation);

    for m in [m0, m1] {
        v[3] ^= m;
        sip_round(&mut v);
        sip_round(&mut v);
        v[0] ^= m;
    }

    v[2] ^= 0xFF;
    for _ in 0..4 {
        sip_round(&mut v);
    }

    v[0] ^ v[1] ^ v[2] ^ v[3]
}

#[inline(always)]
fn sip_round(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13);
    v[1] ^= v[0];
    v[0] = v[0].rotate_left(32);
    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16);
    v[3] ^= v[2];
    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21);
    v[3] ^= v[0];
    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17);
    v[1] ^= v[2];
    v[2] = v[2].rotate_left(32);
}
