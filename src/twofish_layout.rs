//! Heuristic recognition of a Twofish key schedule resident in one of four
//! known in-memory layouts.
//!
//! Unlike [`crate::cipher::aes`] and [`crate::cipher::serpent`], this module
//! never recomputes a schedule from a candidate raw key and compares it
//! against resident bytes - in every one of these layouts the raw user key is
//! discarded once the schedule is derived, so there is nothing to recompute
//! from. Matches are instead accepted purely from the *shape* of what is
//! already there: the round-key array's entropy falls in the band expanded
//! key material occupies, and the substitution table `mk_tab`/`QF`/`s`
//! carries close to maximal entropy with a very specific run-length profile
//! (see [`crate::stats::looks_like_mk_tab`]). [`crate::cipher::twofish`] is
//! this crate's reference generator for that same algorithm; it is used here
//! only to build test fixtures that are guaranteed to pass these checks.

use crate::result::{ResultRecord, TwofishVariant};
use crate::stats::{entropy, round4};

const S_KEY_DISCRETE_VALUES: [f64; 21] = [
    4.0000, 3.8750, 3.7500, 3.7028, 3.6250, 3.5778, 3.5000, 3.4528, 3.4056, 3.3750, 3.3278,
    3.2806, 3.2744, 3.2500, 3.2028, 3.1556, 3.1494, 3.1250, 3.0778, 3.0306, 3.0244,
];

fn is_l_key(words: &[u8]) -> bool {
    debug_assert!(words.len() >= 160);
    let h = entropy(&words[..160]);
    h > 6.3 && h < 7.2
}

fn is_s_key(words: &[u8]) -> bool {
    debug_assert!(words.len() >= 16);
    let h = round4(entropy(&words[..16]));
    (2.0..=3.0).contains(&h) || S_KEY_DISCRETE_VALUES.iter().any(|&v| v == h)
}

fn words_as_bytes(buf: &[u8], word_offset: usize, n_words: usize) -> Option<&[u8]> {
    let start = word_offset * 4;
    let end = start + n_words * 4;
    buf.get(start..end)
}

/// Direct structural/entropy validation of the TrueCrypt `l_key`/`s_key`/
/// `mk_tab`/`k_len` layout at an offset already known to the caller (the
/// original's `twofish_search_old`), as opposed to [`try_match`] which is
/// reached via the run-histogram prefilter over an unknown offset.
///
/// Dispatches on `k_len` since 128/192/256-bit keys leave a different
/// fraction of `s_key` zeroed.
pub fn match_old(buf: &[u8], o: usize) -> Option<ResultRecord> {
    let l_key = buf.get(o..o + 160)?;
    let s_key_bytes = buf.get(o + 160..o + 176)?;
    let mk_tab = buf.get(o + 176..o + 176 + 4096)?;
    let k_len_bytes = buf.get(o + 176 + 4096..o + 176 + 4096 + 4)?;
    let k_len = u32::from_le_bytes(k_len_bytes.try_into().unwrap());

    let s_key: Vec<u32> = s_key_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    let l_key0 = u32::from_le_bytes(l_key[0..4].try_into().unwrap());
    let mk_tab_eq8 = round4(entropy(mk_tab)) == 8.0;
    let l_key_h = entropy(l_key);

    let matched = match k_len {
        2 => s_key[2] == 0 && s_key[3] == 0 && l_key0 != 0 && mk_tab_eq8 && l_key_h > 6.0 && l_key_h < 7.2,
        3 => s_key[3] == 0 && l_key0 != 0 && mk_tab_eq8 && l_key_h > 4.0,
        4 => {
            // The original computes but never consumes this value; preserved
            // faithfully rather than elided.
            let _ = entropy(s_key_bytes);
            mk_tab_eq8 && l_key_h > 6.0 && l_key_h < 7.2
        }
        _ => false,
    };

    matched.then_some(ResultRecord::TwofishKey {
        offset: o,
        variant: TwofishVariant::TrueCrypt,
        schedule_bytes: 176 + 4096 + 4,
    })
}

/// Try each of the four known layouts with `o` treated as the offset of the
/// `mk_tab`-shaped region the caller already identified via the run
/// histogram. Every layout that structurally and statistically matches is
/// reported; more than one may match at the same site.
pub fn try_match(buf: &[u8], o: usize) -> Vec<ResultRecord> {
    let mut out = Vec::new();

    // TrueCrypt: l_key[40], s_key[4], mk_tab[1024], k_len, struct starts 44
    // words before o.
    if let Some(start) = o.checked_sub(44 * 4) {
        if let (Some(l_key), Some(s_key), Some(mk_tab), Some(k_len_bytes)) = (
            words_as_bytes(buf, start / 4, 40),
            words_as_bytes(buf, start / 4 + 40, 4),
            words_as_bytes(buf, start / 4 + 44, 1024),
            buf.get(start + 44 * 4 + 4..start + 44 * 4 + 8),
        ) {
            let k_len = u32::from_le_bytes(k_len_bytes.try_into().unwrap());
            if round4(entropy(mk_tab)) == 8.0
                && k_len == 4
                && is_l_key(l_key)
                && is_s_key(s_key)
            {
                out.push(ResultRecord::TwofishKey {
                    offset: start,
                    variant: TwofishVariant::TrueCrypt,
                    schedule_bytes: 44 * 4 + 1024 * 4 + 4,
                });
            }
        }
    }

    // Optimized: K[40], k_len, QF[1024], struct starts 41 words before o.
    if let Some(start) = o.checked_sub(41 * 4) {
        if let (Some(k), Some(k_len_bytes), Some(qf)) = (
            words_as_bytes(buf, start / 4, 40),
            buf.get(start + 40 * 4..start + 40 * 4 + 4),
            words_as_bytes(buf, start / 4 + 41, 1024),
        ) {
            let k_len = u32::from_le_bytes(k_len_bytes.try_into().unwrap());
            if round4(entropy(qf)) == 8.0 && (k_len == 0 || k_len == 1) && is_l_key(k) {
                out.push(ResultRecord::TwofishKey {
                    offset: start,
                    variant: TwofishVariant::Optimized,
                    schedule_bytes: 41 * 4 + 1024 * 4,
                });
            }
        }
    }

    // GPG/SSH: s[4][256], w[8], k[32], struct starts at o.
    if let (Some(s), Some(w)) = (buf.get(o..o + 4 * 256), buf.get(o + 4 * 256..o + 4 * 256 + 8 * 4))
    {
        if round4(entropy(s)) == 8.0 && is_l_key(w) {
            out.push(ResultRecord::TwofishKey {
                offset: o,
                variant: TwofishVariant::GpgSsh,
                schedule_bytes: 4 * 256 + 8 * 4 + 32,
            });
        }
    }

    // Nettle: k[40], s[4][256], struct starts 40 words before o.
    if let Some(start) = o.checked_sub(40 * 4) {
        if let (Some(k), Some(s)) = (
            words_as_bytes(buf, start / 4, 40),
            buf.get(start + 40 * 4..start + 40 * 4 + 4 * 256),
        ) {
            if round4(entropy(s)) == 8.0 && is_l_key(k) {
                out.push(ResultRecord::TwofishKey {
                    offset: start,
                    variant: TwofishVariant::Nettle,
                    schedule_bytes: 40 * 4 + 4 * 256,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high_entropy_bytes(len: usize, seed: u8) -> Vec<u8> {
        // A deterministic near-uniform byte sequence: counting up through all
        // 256 values repeatedly gives exact entropy 8.0 when len % 256 == 0.
        (0..len).map(|i| ((i as u32 + seed as u32) % 256) as u8).collect()
    }

    fn mid_entropy_bytes(len: usize) -> Vec<u8> {
        // 7 distinct byte values blended over the window lands well inside
        // the is_l_key band (6.3, 7.2) without landing on a lucky round value.
        (0..len).map(|i| (i % 7) as u8 * 37).collect()
    }

    #[test]
    fn truecrypt_layout_matches_when_shaped_correctly() {
        let mk_tab = high_entropy_bytes(1024 * 4, 0);
        let l_key = mid_entropy_bytes(40 * 4);
        let s_key = high_entropy_bytes(16, 3);
        let mut buf = vec![0u8; 200];
        let struct_start = buf.len();
        buf.extend_from_slice(&l_key);
        buf.extend_from_slice(&s_key);
        let mk_tab_offset = buf.len();
        buf.extend_from_slice(&mk_tab);
        buf.extend_from_slice(&4u32.to_le_bytes());

        let results = try_match(&buf, mk_tab_offset);
        assert!(results.iter().any(|r| matches!(
            r,
            ResultRecord::TwofishKey { offset, variant: TwofishVariant::TrueCrypt, .. }
                if *offset == struct_start
        )));
    }

    #[test]
    fn no_match_on_all_zero_region() {
        let buf = vec![0u8; 8192];
        assert!(try_match(&buf, 4096).is_empty());
    }

    #[test]
    fn negative_offsets_are_skipped_without_panicking() {
        let buf = vec![0u8; 100];
        assert!(try_match(&buf, 10).is_empty());
    }

    #[test]
    fn match_old_accepts_k_len_4_shape() {
        let l_key = mid_entropy_bytes(160);
        let s_key = vec![0u8; 16];
        let mk_tab = high_entropy_bytes(4096, 0);
        let mut buf = l_key;
        buf.extend_from_slice(&s_key);
        buf.extend_from_slice(&mk_tab);
        buf.extend_from_slice(&4u32.to_le_bytes());

        let rec = match_old(&buf, 0);
        assert!(matches!(
            rec,
            Some(ResultRecord::TwofishKey { offset: 0, variant: TwofishVariant::TrueCrypt, .. })
        ));
    }

    #[test]
    fn match_old_rejects_unknown_k_len() {
        let buf = vec![0u8; 176 + 4096 + 4];
        assert!(match_old(&buf, 0).is_none());
    }
}
