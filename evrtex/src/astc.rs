//! ASTC payload framing, size arithmetic, and candidate tables.
//!
//! Mobile texture payloads are raw ASTC block data with no header at
//! all; width, height and block size have to be supplied from the
//! outside. The codec, however, only accepts `.astc` files with the
//! standard 16-byte header, so we fabricate one around the raw bytes
//! (and strip it again after encoding).

/// Little-endian magic of the standard `.astc` file header.
pub const ASTC_MAGIC: u32 = 0x5CA1_AB13;

/// Length of the synthetic `.astc` header.
pub const ASTC_HEADER_LEN: usize = 16;

/// Channel-role suffixes stripped (in this order) when deriving a
/// texture's base identity for mapping and cache lookups.
pub const IDENTITY_SUFFIXES: &[&str] = &["_d", "_n", "_s", "_e", "_a", "_r", "_m", "_h"];

/// Block sizes tried against a mapping hit, in priority order.
pub const COMMON_BLOCK_SIZES: &[(u8, u8)] = &[
    (4, 4),
    (8, 8),
    (6, 6),
    (5, 5),
    (10, 10),
    (12, 12),
    (5, 4),
    (6, 5),
    (8, 5),
    (8, 6),
    (10, 5),
    (10, 6),
    (10, 8),
];

/// Brute-force candidate configuration: dimensions, block size and a
/// short label used to tag decode outputs.
#[derive(Debug, Clone, Copy)]
pub struct BruteForceConfig {
    pub width: u32,
    pub height: u32,
    pub block_w: u8,
    pub block_h: u8,
    pub label: &'static str,
}

/// Configurations tried when no mapping entry matches, in priority
/// order. Candidates whose expected size is more than
/// [`SIZE_TOLERANCE`] bytes away from the blob's actual length are
/// skipped.
pub const BRUTE_FORCE_CONFIGS: &[BruteForceConfig] = &[
    BruteForceConfig { width: 2048, height: 1024, block_w: 8, block_h: 8, label: "2Kx1K_8x8" },
    BruteForceConfig { width: 2048, height: 1024, block_w: 6, block_h: 6, label: "2Kx1K_6x6" },
    BruteForceConfig { width: 2048, height: 1024, block_w: 4, block_h: 4, label: "2Kx1K_4x4" },
    BruteForceConfig { width: 1024, height: 512, block_w: 8, block_h: 8, label: "1Kx512_8x8" },
    BruteForceConfig { width: 1024, height: 512, block_w: 6, block_h: 6, label: "1Kx512_6x6" },
    BruteForceConfig { width: 1024, height: 512, block_w: 4, block_h: 4, label: "1Kx512_4x4" },
    BruteForceConfig { width: 2048, height: 2048, block_w: 8, block_h: 8, label: "2K_square_8x8" },
    BruteForceConfig { width: 1024, height: 1024, block_w: 8, block_h: 8, label: "1K_square_8x8" },
];

/// Maximum |expected - actual| byte difference for a brute-force
/// candidate to be attempted at all.
pub const SIZE_TOLERANCE: u64 = 100;

/// Minimum decode output size for a candidate to count as a real hit.
/// Anything smaller is treated as garbage the codec happened to accept.
pub const MIN_DECODE_OUTPUT: u64 = 1000;

/// Compressed payload size of a w x h image at the given block size.
/// ASTC blocks are 16 bytes regardless of footprint.
pub fn expected_size(width: u32, height: u32, block_w: u8, block_h: u8) -> u64 {
    let blocks_x = (width as u64).div_ceil(block_w as u64);
    let blocks_y = (height as u64).div_ceil(block_h as u64);
    blocks_x * blocks_y * 16
}

/// Prefix a raw ASTC payload with a synthetic 16-byte header so the
/// codec will accept it: LE u32 magic, (block_w, block_h, 1), then
/// three 3-byte little-endian dimension triples (width, height, 1).
pub fn wrap(raw: &[u8], width: u32, height: u32, block_w: u8, block_h: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(ASTC_HEADER_LEN + raw.len());
    out.extend_from_slice(&ASTC_MAGIC.to_le_bytes());
    out.extend_from_slice(&[block_w, block_h, 1]);
    out.extend_from_slice(&dim3(width));
    out.extend_from_slice(&dim3(height));
    out.extend_from_slice(&dim3(1));
    out.extend_from_slice(raw);
    out
}

/// Low 3 bytes of a dimension, little-endian.
fn dim3(value: u32) -> [u8; 3] {
    let b = value.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// Strip a synthetic `.astc` header, verifying its magic. Returns the
/// raw payload, or `None` if the buffer is too short or the magic does
/// not match.
pub fn strip_wrapper(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() <= ASTC_HEADER_LEN {
        return None;
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != ASTC_MAGIC {
        return None;
    }
    Some(&bytes[ASTC_HEADER_LEN..])
}

/// Force `data` to exactly `target` bytes: zero-pad a short payload,
/// truncate a long one, return an equal one unchanged. Container
/// slots have fixed capacity, so the final payload length must match
/// the original bit-for-bit.
pub fn pad_to_size(data: Vec<u8>, target: usize) -> Vec<u8> {
    let mut data = data;
    match data.len().cmp(&target) {
        std::cmp::Ordering::Less => {
            data.resize(target, 0);
            data
        }
        std::cmp::Ordering::Greater => {
            data.truncate(target);
            data
        }
        std::cmp::Ordering::Equal => data,
    }
}

/// Derive candidate identities for a texture name: the name itself,
/// then the name with each known channel-role suffix stripped.
pub fn identity_candidates(name: &str) -> Vec<&str> {
    let mut out = vec![name];
    for suffix in IDENTITY_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            out.push(base);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_size_exact_values() {
        assert_eq!(expected_size(4, 4, 4, 4), 16);
        assert_eq!(expected_size(5, 4, 4, 4), 32);
        assert_eq!(expected_size(2048, 1024, 8, 8), 256 * 128 * 16);
    }

    #[test]
    fn expected_size_monotonic_in_dimensions() {
        let mut prev = 0;
        for w in 1..=64 {
            let size = expected_size(w, 32, 6, 6);
            assert!(size >= prev);
            prev = size;
        }
        let mut prev = 0;
        for h in 1..=64 {
            let size = expected_size(32, h, 6, 6);
            assert!(size >= prev);
            prev = size;
        }
    }

    #[test]
    fn wrap_layout_is_sixteen_byte_header() {
        let raw = [0xAB; 32];
        let wrapped = wrap(&raw, 0x000102, 0x030405, 8, 6);
        assert_eq!(wrapped.len(), ASTC_HEADER_LEN + raw.len());
        assert_eq!(&wrapped[0..4], &[0x13, 0xAB, 0xA1, 0x5C]);
        assert_eq!(&wrapped[4..7], &[8, 6, 1]);
        assert_eq!(&wrapped[7..10], &[0x02, 0x01, 0x00]); // width LE
        assert_eq!(&wrapped[10..13], &[0x05, 0x04, 0x03]); // height LE
        assert_eq!(&wrapped[13..16], &[1, 0, 0]); // depth = 1
    }

    #[test]
    fn wrap_strip_round_trip() {
        let raw: Vec<u8> = (0..=255).collect();
        for &(w, h, bw, bh) in &[(1u32, 1u32, 1u8, 1u8), (2048, 1024, 8, 8), (65535, 65535, 255, 255)] {
            let wrapped = wrap(&raw, w, h, bw, bh);
            assert_eq!(strip_wrapper(&wrapped).unwrap(), raw.as_slice());
        }
    }

    #[test]
    fn strip_rejects_bad_magic_or_short_input() {
        assert!(strip_wrapper(&[0u8; 20]).is_none());
        assert!(strip_wrapper(&[0u8; 16]).is_none());
        let wrapped = wrap(&[1, 2, 3], 4, 4, 4, 4);
        assert!(strip_wrapper(&wrapped[1..]).is_none());
    }

    #[test]
    fn pad_to_size_laws() {
        let data = vec![1u8, 2, 3];
        let padded = pad_to_size(data.clone(), 6);
        assert_eq!(padded, vec![1, 2, 3, 0, 0, 0]);

        let truncated = pad_to_size(padded.clone(), 2);
        assert_eq!(truncated, vec![1, 2]);

        assert_eq!(pad_to_size(data.clone(), 3), data);
    }

    #[test]
    fn identity_candidates_strip_known_suffixes_in_order() {
        assert_eq!(identity_candidates("wall_01_d"), vec!["wall_01_d", "wall_01"]);
        assert_eq!(identity_candidates("plain"), vec!["plain"]);
        // `_n` comes after `_d` in the priority list
        assert_eq!(identity_candidates("rock_n"), vec!["rock_n", "rock"]);
    }

    #[test]
    fn brute_force_table_is_ordered_as_documented() {
        assert_eq!(BRUTE_FORCE_CONFIGS.len(), 8);
        assert_eq!(BRUTE_FORCE_CONFIGS[0].label, "2Kx1K_8x8");
        assert_eq!(BRUTE_FORCE_CONFIGS[7].label, "1K_square_8x8");
        assert_eq!(COMMON_BLOCK_SIZES.len(), 13);
        assert_eq!(COMMON_BLOCK_SIZES[0], (4, 4));
    }
}
