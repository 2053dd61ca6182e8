//! Serpent-256 key schedule (Anderson, Biham & Knudsen).
//!
//! A candidate at offset `o` is accepted when `expand(B[o..o+32)) ==
//! B[o..o+560)`: the raw 256-bit key occupies the first 32 bytes, followed
//! by the 132 little-endian 32-bit round subkeys the schedule produces.

const PHI: u32 = 0x9e3779b9;

// The eight Serpent S-boxes, expressed as 4-bit lookup tables. Each is
// applied "bitsliced": one nibble index is formed from the same bit
// position across four 32-bit words, and the substituted nibble is
// scattered back across the four output words at that bit position.
const SBOXES: [[u8; 16]; 8] = [
    [3, 8, 15, 1, 10, 6, 5, 11, 14, 13, 4, 2, 7, 0, 9, 12],
    [15, 12, 2, 7, 9, 0, 5, 10, 1, 11, 14, 8, 6, 13, 3, 4],
    [8, 6, 7, 9, 3, 12, 10, 15, 13, 1, 14, 4, 0, 11, 5, 2],
    [0, 15, 11, 8, 12, 9, 6, 3, 13, 1, 2, 4, 10, 7, 5, 14],
    [1, 15, 8, 3, 12, 0, 11, 6, 2, 5, 4, 10, 9, 14, 7, 13],
    [15, 5, 2, 11, 4, 10, 9, 12, 0, 3, 14, 8, 13, 6, 7, 1],
    [7, 2, 12, 5, 8, 4, 6, 11, 14, 9, 1, 15, 13, 3, 10, 0],
    [1, 13, 15, 0, 14, 8, 2, 11, 7, 4, 12, 10, 9, 3, 5, 6],
];

// Key-schedule S-box application order: S3, S2, S1, S0, S7, S6, S5, S4,
// repeating every 8 groups of 4 prekey words.
const KEY_SBOX_ORDER: [usize; 8] = [3, 2, 1, 0, 7, 6, 5, 4];

fn apply_sbox(sbox: &[u8; 16], words: [u32; 4]) -> [u32; 4] {
    let mut out = [0u32; 4];
    for bit in 0..32u32 {
        let mut idx = 0u8;
        for (w, word) in words.iter().enumerate() {
            idx |= (((word >> bit) & 1) as u8) << w;
        }
        let o = sbox[idx as usize];
        for w in 0..4 {
            out[w] |= (((o >> w) & 1) as u32) << bit;
        }
    }
    out
}

/// Derive the 132 round subkeys for a 32-byte (256-bit) key.
pub fn subkeys(key: &[u8; 32]) -> [u32; 132] {
    let mut w = [0u32; 140];
    for (i, word) in w.iter_mut().take(8).enumerate() {
        *word = u32::from_le_bytes([key[4 * i], key[4 * i + 1], key[4 * i + 2], key[4 * i + 3]]);
    }
    for i in 8..140 {
        let v = w[i - 8] ^ w[i - 5] ^ w[i - 3] ^ w[i - 1] ^ PHI ^ (i as u32 - 8);
        w[i] = v.rotate_left(11);
    }

    let mut subkeys = [0u32; 132];
    for g in 0..33 {
        let base = 8 + g * 4;
        let words = [w[base], w[base + 1], w[base + 2], w[base + 3]];
        let sbox = &SBOXES[KEY_SBOX_ORDER[g % 8]];
        let out = apply_sbox(sbox, words);
        subkeys[g * 4..g * 4 + 4].copy_from_slice(&out);
    }
    subkeys
}

/// Full in-memory schedule: the 32-byte key followed by the 528 bytes of
/// little-endian round subkeys (560 bytes total).
pub fn expand(key: &[u8; 32]) -> [u8; 560] {
    let mut out = [0u8; 560];
    out[..32].copy_from_slice(key);
    for (i, sk) in subkeys(key).iter().enumerate() {
        out[32 + 4 * i..32 + 4 * i + 4].copy_from_slice(&sk.to_le_bytes());
    }
    out
}

/// Does `buf` hold a valid Serpent-256 schedule at its very start?
pub fn matches_schedule(buf: &[u8]) -> bool {
    if buf.len() < 560 {
        return false;
    }
    let key: [u8; 32] = buf[..32].try_into().unwrap();
    expand(&key) == buf[..560]
}
