//! Twofish key-schedule generation (Bruce Schneier et al.; table layout per
//! Brian Gladman's reference implementation).
//!
//! Unlike [`crate::cipher::aes`] and [`crate::cipher::serpent`], the
//! in-memory layouts this crate recognizes (see [`crate::twofish_layout`])
//! never keep the raw user key next to the derived schedule, so there is
//! nothing to recompute-and-compare against at scan time - those layouts are
//! matched purely by statistical shape. This module exists to *produce* a
//! real schedule: it is the generator the test fixtures in
//! [`crate::twofish_layout`] use to plant a schedule that the statistical
//! checks are guaranteed to accept, and it stands as this crate's faithful
//! implementation of the algorithm those checks are ultimately checking the
//! shape of.

use std::sync::OnceLock;

const G_M: u32 = 0x0169;
const G_MOD: u32 = 0x0000014d;

// Reed-Solomon generator matrix from the reference key schedule. Kept for
// documentation fidelity with the original; this implementation only needs
// `mds_rem`, the closed-form equivalent `twofish_set_key` actually uses.
#[allow(dead_code)]
const RS: [[u8; 8]; 4] = [
    [0x01, 0xA4, 0x55, 0x87, 0x5A, 0x58, 0xDB, 0x9E],
    [0xA4, 0x56, 0x82, 0xF3, 0x1E, 0xC6, 0x68, 0xE5],
    [0x02, 0xA1, 0xFC, 0xC1, 0x47, 0xAE, 0x3D, 0x19],
    [0xA4, 0x55, 0x87, 0x5A, 0x58, 0xDB, 0x9E, 0x03],
];

const TAB_5B: [u8; 4] = [0, (G_M >> 2) as u8, (G_M >> 1) as u8, ((G_M >> 1) ^ (G_M >> 2)) as u8];
const TAB_EF: [u8; 4] = [0, ((G_M >> 1) ^ (G_M >> 2)) as u8, (G_M >> 1) as u8, (G_M >> 2) as u8];

fn ffm_5b(x: u8) -> u8 {
    x ^ (x >> 2) ^ TAB_5B[(x & 3) as usize]
}

fn ffm_ef(x: u8) -> u8 {
    x ^ (x >> 1) ^ (x >> 2) ^ TAB_EF[(x & 3) as usize]
}

const ROR4: [u8; 16] = [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15];
const ASHX: [u8; 16] = [0, 9, 2, 11, 4, 13, 6, 15, 8, 1, 10, 3, 12, 5, 14, 7];

const QT0: [[u8; 16]; 2] = [
    [8, 1, 7, 13, 6, 15, 3, 2, 0, 11, 5, 9, 14, 12, 10, 4],
    [2, 8, 11, 13, 15, 7, 6, 14, 3, 1, 9, 4, 0, 10, 12, 5],
];
const QT1: [[u8; 16]; 2] = [
    [14, 12, 11, 8, 1, 2, 3, 5, 15, 4, 10, 6, 7, 0, 9, 13],
    [1, 14, 2, 11, 4, 12, 3, 7, 6, 13, 10, 5, 15, 9, 0, 8],
];
const QT2: [[u8; 16]; 2] = [
    [11, 10, 5, 14, 6, 13, 9, 0, 12, 8, 15, 3, 2, 4, 7, 1],
    [4, 12, 7, 5, 1, 6, 9, 10, 0, 14, 13, 8, 2, 11, 3, 15],
];
const QT3: [[u8; 16]; 2] = [
    [13, 7, 15, 4, 1, 2, 6, 14, 9, 11, 3, 0, 8, 5, 12, 10],
    [11, 9, 5, 1, 12, 3, 13, 14, 6, 4, 7, 15, 2, 0, 8, 10],
];

fn qp(n: usize, x: u8) -> u8 {
    let a0 = x >> 4;
    let b0 = x & 15;
    let a1 = a0 ^ b0;
    let b1 = ROR4[b0 as usize] ^ ASHX[a0 as usize];
    let a2 = QT0[n][a1 as usize];
    let b2 = QT1[n][b1 as usize];
    let a3 = a2 ^ b2;
    let b3 = ROR4[b2 as usize] ^ ASHX[a2 as usize];
    let a4 = QT2[n][a3 as usize];
    let b4 = QT3[n][b3 as usize];
    (b4 << 4) | a4
}

struct Tables {
    q: [[u8; 256]; 2],
    m: [[u32; 256]; 4],
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut q = [[0u8; 256]; 2];
        for i in 0..256 {
            q[0][i] = qp(0, i as u8);
            q[1][i] = qp(1, i as u8);
        }
        let mut m = [[0u32; 256]; 4];
        for i in 0..256 {
            let f01 = q[1][i] as u32;
            let f5b = ffm_5b(q[1][i]) as u32;
            let fef = ffm_ef(q[1][i]) as u32;
            m[0][i] = f01 + (f5b << 8) + (fef << 16) + (fef << 24);
            m[2][i] = f5b + (fef << 8) + (f01 << 16) + (fef << 24);

            let f01 = q[0][i] as u32;
            let f5b = ffm_5b(q[0][i]) as u32;
            let fef = ffm_ef(q[0][i]) as u32;
            m[1][i] = fef + (fef << 8) + (f5b << 16) + (f01 << 24);
            m[3][i] = f5b + (f01 << 8) + (fef << 16) + (f5b << 24);
        }
        Tables { q, m }
    })
}

fn extract_byte(x: u32, n: u32) -> u8 {
    (x >> (8 * n)) as u8
}

/// `p1` after 8 rounds of the MDS matrix's remainder computation - this is
/// the closed-form replacement for the Reed-Solomon derivation of `s_key`
/// from a 64-bit key pair.
fn mds_rem(mut p0: u32, mut p1: u32) -> u32 {
    for _ in 0..8 {
        let t = p1 >> 24;
        p1 = (p1 << 8) | (p0 >> 24);
        p0 <<= 8;
        let mut u = t << 1;
        if t & 0x80 != 0 {
            u ^= G_MOD;
        }
        p1 ^= t ^ (u << 16);
        u ^= t >> 1;
        if t & 0x01 != 0 {
            u ^= G_MOD >> 1;
        }
        p1 ^= (u << 24) | (u << 8);
    }
    p1
}

// Per output-byte-lane S-box sequence used by both `h_fun` and `gen_mk_tab`,
// applied innermost-first together with KEY_STAGE_ORDER (key word 3 first).
// Lane 0: q1,q1,q0,q0; lane 1: q0,q1,q1,q0; lane 2: q0,q0,q0,q1; lane 3: q1,q0,q1,q1.
const LANE_SBOX_SEQ: [[usize; 4]; 4] = [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 1], [1, 0, 1, 1]];
const KEY_STAGE_ORDER: [usize; 4] = [3, 2, 1, 0];

fn h_fun(x: u32, key: &[u32; 4], k_len: usize) -> u32 {
    let t = tables();
    let start = 4 - k_len;
    let mut b = [extract_byte(x, 0), extract_byte(x, 1), extract_byte(x, 2), extract_byte(x, 3)];
    for stage_pos in start..4 {
        let kidx = KEY_STAGE_ORDER[stage_pos];
        for lane in 0..4 {
            let sbox = LANE_SBOX_SEQ[lane][stage_pos];
            b[lane] = t.q[sbox][b[lane] as usize] ^ extract_byte(key[kidx], lane as u32);
        }
    }
    t.m[0][b[0] as usize] ^ t.m[1][b[1] as usize] ^ t.m[2][b[2] as usize] ^ t.m[3][b[3] as usize]
}

fn gen_mk_tab(k_len: usize, s_key: &[u32; 4]) -> Vec<u32> {
    let t = tables();
    let mut mk_tab = vec![0u32; 1024];
    let lanes = match k_len {
        2 => 4,
        3 => 2,
        4 => 4,
        _ => return mk_tab,
    };
    let start = 4 - k_len;
    for i in 0..256usize {
        let by = i as u8;
        for lane in 0..lanes {
            let mut v = by;
            for stage_pos in start..4 {
                let kidx = KEY_STAGE_ORDER[stage_pos];
                let sbox = LANE_SBOX_SEQ[lane][stage_pos];
                v = t.q[sbox][v as usize] ^ extract_byte(s_key[kidx], lane as u32);
            }
            mk_tab[4 * i + lane] = t.m[lane][v as usize];
        }
    }
    mk_tab
}

fn le_word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// A full Twofish key schedule: 40 round subkeys, the 4-word `s_key` used to
/// build `mk_tab`, the 1024-word `mk_tab` substitution table itself, and the
/// key length class (2/3/4 for 128/192/256-bit keys).
pub struct Schedule {
    pub l_key: [u32; 40],
    pub s_key: [u32; 4],
    pub mk_tab: Vec<u32>,
    pub k_len: u32,
}

/// Derive the full key schedule for a 16, 24, or 32-byte key.
pub fn expand(key: &[u8]) -> Schedule {
    let k_len = key.len() / 8;
    assert!(matches!(k_len, 2 | 3 | 4), "Twofish key must be 16, 24, or 32 bytes");

    let mut me_key = [0u32; 4];
    let mut mo_key = [0u32; 4];
    let mut s_key = [0u32; 4];
    for i in 0..k_len {
        let a = le_word(&key[8 * i..8 * i + 4]);
        let b = le_word(&key[8 * i + 4..8 * i + 8]);
        me_key[i] = a;
        mo_key[i] = b;
        s_key[k_len - i - 1] = mds_rem(a, b);
    }

    let mut l_key = [0u32; 40];
    let mut i = 0;
    while i < 40 {
        let a = 0x01010101u32.wrapping_mul(i as u32);
        let b = a.wrapping_add(0x01010101);
        let a = h_fun(a, &me_key, k_len);
        let b = h_fun(b, &mo_key, k_len).rotate_left(8);
        l_key[i] = a.wrapping_add(b);
        l_key[i + 1] = a.wrapping_add(2u32.wrapping_mul(b)).rotate_left(9);
        i += 2;
    }

    let mk_tab = gen_mk_tab(k_len, &s_key);

    Schedule { l_key, s_key, mk_tab, k_len: k_len as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_deterministic() {
        let key = [0x00u8; 32];
        let a = expand(&key);
        let b = expand(&key);
        assert_eq!(a.l_key, b.l_key);
        assert_eq!(a.s_key, b.s_key);
        assert_eq!(a.mk_tab, b.mk_tab);
    }

    #[test]
    fn different_keys_produce_different_schedules() {
        let a = expand(&[0x00u8; 32]);
        let mut key2 = [0x00u8; 32];
        key2[0] = 0x01;
        let b = expand(&key2);
        assert_ne!(a.l_key, b.l_key);
    }

    #[test]
    fn k_len_matches_key_size() {
        assert_eq!(expand(&[0u8; 16]).k_len, 2);
        assert_eq!(expand(&[0u8; 24]).k_len, 3);
        assert_eq!(expand(&[0u8; 32]).k_len, 4);
    }
}
