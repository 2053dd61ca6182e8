//! AES-128/192/256 key schedule (FIPS-197), used to recognize expanded
//! round-key material sitting in memory.
//!
//! A candidate at offset `o` is accepted when `expand(B[o..o+K)) ==
//! B[o..o+S)`, i.e. re-running the standard key expansion on the bytes the
//! scanner believes are the raw key reproduces the schedule bytes that
//! follow it in the buffer.

// The AES S-box is a 256-entry substitution table applied byte-by-byte during SubWord.
// It is built from the multiplicative inverse in GF(2^8) followed by a fixed affine
// transform; the affine step is what keeps the S-box from being describable as a simple
// rational function, which is what makes it resistant to interpolation attacks.
// https://en.wikipedia.org/wiki/Rijndael_S-box
const SBOX: [u8; 256] = [
    0x63, 0x7C, 0x77, 0x7B, 0xF2, 0x6B, 0x6F, 0xC5, 0x30, 0x01, 0x67, 0x2B, 0xFE, 0xD7, 0xAB, 0x76,
    0xCA, 0x82, 0xC9, 0x7D, 0xFA, 0x59, 0x47, 0xF0, 0xAD, 0xD4, 0xA2, 0xAF, 0x9C, 0xA4, 0x72, 0xC0,
    0xB7, 0xFD, 0x93, 0x26, 0x36, 0x3F, 0xF7, 0xCC, 0x34, 0xA5, 0xE5, 0xF1, 0x71, 0xD8, 0x31, 0x15,
    0x04, 0xC7, 0x23, 0xC3, 0x18, 0x96, 0x05, 0x9A, 0x07, 0x12, 0x80, 0xE2, 0xEB, 0x27, 0xB2, 0x75,
    0x09, 0x83, 0x2C, 0x1A, 0x1B, 0x6E, 0x5A, 0xA0, 0x52, 0x3B, 0xD6, 0xB3, 0x29, 0xE3, 0x2F, 0x84,
    0x53, 0xD1, 0x00, 0xED, 0x20, 0xFC, 0xB1, 0x5B, 0x6A, 0xCB, 0xBE, 0x39, 0x4A, 0x4C, 0x58, 0xCF,
    0xD0, 0xEF, 0xAA, 0xFB, 0x43, 0x4D, 0x33, 0x85, 0x45, 0xF9, 0x02, 0x7F, 0x50, 0x3C, 0x9F, 0xA8,
    0x51, 0xA3, 0x40, 0x8F, 0x92, 0x9D, 0x38, 0xF5, 0xBC, 0xB6, 0xDA, 0x21, 0x10, 0xFF, 0xF3, 0xD2,
    0xCD, 0x0C, 0x13, 0xEC, 0x5F, 0x97, 0x44, 0x17, 0xC4, 0xA7, 0x7E, 0x3D, 0x64, 0x5D, 0x19, 0x73,
    0x60, 0x81, 0x4F, 0xDC, 0x22, 0x2A, 0x90, 0x88, 0x46, 0xEE, 0xB8, 0x14, 0xDE, 0x5E, 0x0B, 0xDB,
    0xE0, 0x32, 0x3A, 0x0A, 0x49, 0x06, 0x24, 0x5C, 0xC2, 0xD3, 0xAC, 0x62, 0x91, 0x95, 0xE4, 0x79,
    0xE7, 0xC8, 0x37, 0x6D, 0x8D, 0xD5, 0x4E, 0xA9, 0x6C, 0x56, 0xF4, 0xEA, 0x65, 0x7A, 0xAE, 0x08,
    0xBA, 0x78, 0x25, 0x2E, 0x1C, 0xA6, 0xB4, 0xC6, 0xE8, 0xDD, 0x74, 0x1F, 0x4B, 0xBD, 0x8B, 0x8A,
    0x70, 0x3E, 0xB5, 0x66, 0x48, 0x03, 0xF6, 0x0E, 0x61, 0x35, 0x57, 0xB9, 0x86, 0xC1, 0x1D, 0x9E,
    0xE1, 0xF8, 0x98, 0x11, 0x69, 0xD9, 0x8E, 0x94, 0x9B, 0x1E, 0x87, 0xE9, 0xCE, 0x55, 0x28, 0xDF,
    0x8C, 0xA1, 0x89, 0x0D, 0xBF, 0xE6, 0x42, 0x68, 0x41, 0x99, 0x2D, 0x0F, 0xB0, 0x54, 0xBB, 0x16,
];

// Round constants RCON[i] = x^i in GF(2^8), i=0..13. Fourteen entries cover every Nk in {4,6,8}.
const RCON: [u8; 14] = [
    0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x1B, 0x36, 0x6C, 0xD8, 0xAB, 0x4D,
];

fn sub_word(w: [u8; 4]) -> [u8; 4] {
    [SBOX[w[0] as usize], SBOX[w[1] as usize], SBOX[w[2] as usize], SBOX[w[3] as usize]]
}

fn rot_word(w: [u8; 4]) -> [u8; 4] {
    [w[1], w[2], w[3], w[0]]
}

/// Key length in bytes for a given key size in bits (16/24/32).
pub fn key_len(key_bits: u16) -> usize {
    key_bits as usize / 8
}

/// Total schedule length in bytes (round keys concatenated, including the
/// leading round key which equals the raw user key): 176/208/240 for
/// 128/192/256-bit keys.
pub fn schedule_len(key_bits: u16) -> usize {
    let nk = key_len(key_bits) / 4;
    let nr = nk + 6;
    16 * (nr + 1)
}

/// Expand `key` (16, 24, or 32 bytes) into the full round-key schedule.
///
/// Panics if `key.len()` is not one of those three sizes - callers are
/// expected to have already validated the key size against [`crate::context::KeyKind::Aes`].
pub fn expand(key: &[u8]) -> Vec<u8> {
    let nk = key.len() / 4;
    assert!(matches!(nk, 4 | 6 | 8), "AES key must be 16, 24, or 32 bytes");
    let nr = nk + 6;
    let total_words = 4 * (nr + 1);

    let mut w: Vec<[u8; 4]> = Vec::with_capacity(total_words);
    for i in 0..nk {
        w.push([key[4 * i], key[4 * i + 1], key[4 * i + 2], key[4 * i + 3]]);
    }
    for i in nk..total_words {
        let mut temp = w[i - 1];
        if i % nk == 0 {
            temp = sub_word(rot_word(temp));
            temp[0] ^= RCON[i / nk - 1];
        } else if nk > 6 && i % nk == 4 {
            temp = sub_word(temp);
        }
        let prev = w[i - nk];
        w.push([prev[0] ^ temp[0], prev[1] ^ temp[1], prev[2] ^ temp[2], prev[3] ^ temp[3]]);
    }

    w.into_iter().flatten().collect()
}

/// Does `buf` hold a valid AES-`key_bits` schedule at its very start?
///
/// Returns `false` (rather than erroring) when `buf` is too short to hold a
/// full schedule - the caller is expected to have already bounds-checked the
/// candidate region against the buffer length.
pub fn matches_schedule(buf: &[u8], key_bits: u16) -> bool {
    let k = key_len(key_bits);
    let s = schedule_len(key_bits);
    if buf.len() < s {
        return false;
    }
    expand(&buf[..k]) == buf[..s]
}

#[cfg(test)]
mod tests {
    use super::*;

    // FIPS-197 Appendix A.1 test vector.
    #[test]
    fn aes128_schedule_matches_fips197() {
        let key = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ];
        let w = expand(&key);
        assert_eq!(w.len(), 176);
        // Round key 1 (words 4..8) from FIPS-197 A.1.
        assert_eq!(&w[16..32], &[
            0xd6, 0xaa, 0x74, 0xfd, 0xd2, 0xaf, 0x72, 0xfa, 0xda, 0xa6, 0x78, 0xf1, 0xd6, 0xab,
            0x76, 0xfe,
        ]);
    }

    #[test]
    fn schedule_lengths_are_176_208_240() {
        assert_eq!(schedule_len(128), 176);
        assert_eq!(schedule_len(192), 208);
        assert_eq!(schedule_len(256), 240);
    }

    #[test]
    fn matches_schedule_detects_planted_key() {
        let key = [0u8; 32];
        let schedule = expand(&key);
        let mut buf = vec![0xCCu8; 64];
        buf.extend_from_slice(&schedule);
        assert!(matches_schedule(&buf, 256));
    }

    #[test]
    fn matches_schedule_rejects_garbage() {
        let buf = vec![0x11u8; 512];
        assert!(!matches_schedule(&buf, 128));
    }

    #[test]
    fn matches_schedule_false_on_short_buffer() {
        assert!(!matches_schedule(&[0u8; 10], 128));
    }
}
