//! Structural recognition of DER/PKCS#8-encoded RSA private keys.
//!
//! The parser never builds a general ASN.1 tree; it only recognizes the
//! specific `SEQUENCE { version, modulus, publicExponent, ... }` shape an RSA
//! `PrivateKeyInfo`/`RSAPrivateKey` begins with, and reports the total length
//! of the blob so the caller can lift it out of the buffer whole.

use crate::result::ResultRecord;
use crate::{Error, Result};

const VERSION_AND_MODULUS_TAG: [u8; 4] = [0x02, 0x01, 0x00, 0x02];

fn parse_len_field(buf: &[u8], at: usize) -> Result<(usize, usize)> {
    let first = *buf.get(at).ok_or(Error::InvalidRange)?;
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    let n = (first & 0x7f) as usize;
    if n == 0 || n > 8 {
        return Err(Error::UnsupportedDerFeature("modulus length field > 8 bytes"));
    }
    let bytes = buf.get(at + 1..at + 1 + n).ok_or(Error::InvalidRange)?;
    let mut value: u64 = 0;
    for &b in bytes {
        value = (value << 8) | b as u64;
    }
    Ok((value as usize, 1 + n))
}

/// Attempt to parse an RSA private key candidate starting at offset `o`.
///
/// Returns `Ok(None)` for any structural mismatch (not an error - just not a
/// match), `Err` only for an unsupported DER feature.
pub fn parse_at(buf: &[u8], o: usize) -> Result<Option<ResultRecord>> {
    if buf.len() < o + 8 || buf[o] != 0x30 || buf[o + 1] != 0x82 {
        return Ok(None);
    }
    let header = match buf.get(o + 4..o + 8) {
        Some(h) => h,
        None => return Ok(None),
    };
    if header != VERSION_AND_MODULUS_TAG {
        return Ok(None);
    }

    let total_len = u16::from_be_bytes([buf[o + 2], buf[o + 3]]) as usize;
    let end = 4 + total_len;

    let (modulus_len, len_field_width) = parse_len_field(buf, o + 8)?;
    let modulus_start = o + 8 + len_field_width;
    if buf.len() < modulus_start + modulus_len {
        return Ok(None);
    }

    let pub_exp_offset = modulus_start + modulus_len;
    let tag = *buf.get(pub_exp_offset).ok_or(Error::InvalidRange)?;
    if tag != 0x02 {
        return Ok(None);
    }
    let public_exponent = match buf.get(pub_exp_offset + 1..pub_exp_offset + 3) {
        Some([0x01, 0x01]) => 1u32,
        _ => match buf.get(pub_exp_offset + 1..pub_exp_offset + 5) {
            Some([0x03, 0x01, 0x00, 0x01]) => 65537u32,
            _ => return Ok(None),
        },
    };

    Ok(Some(ResultRecord::DerKey {
        offset: o,
        modulus_bits: ((modulus_len - 1) * 8) as u32,
        public_exponent,
        length: end,
    }))
}

/// Scan `buf[from..to)` for DER/PKCS#8 RSA private keys, on even offsets
/// only, skipping past each match's full length on success.
pub fn search(buf: &[u8], from: usize, to: usize) -> Result<Vec<ResultRecord>> {
    let mut out = Vec::new();
    let mut i = from - from % 2;
    while i + 1 < to {
        let start = if buf.get(i) == Some(&0x30) && buf.get(i + 1) == Some(&0x82) {
            Some(i)
        } else if buf.get(i + 1) == Some(&0x30) && buf.get(i + 2) == Some(&0x82) {
            Some(i + 1)
        } else {
            None
        };

        if let Some(o) = start {
            match parse_at(buf, o) {
                Ok(Some(rec)) => {
                    let length = match &rec {
                        ResultRecord::DerKey { length, .. } => *length,
                        _ => unreachable!(),
                    };
                    i = o + length;
                    out.push(rec);
                    continue;
                }
                Ok(None) => {}
                Err(Error::UnsupportedDerFeature(_)) => {}
                Err(e) => return Err(e),
            }
        }
        i += 2;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> Vec<u8> {
        let mut buf = vec![
            0x30, 0x82, 0x04, 0xA3, 0x02, 0x01, 0x00, 0x02, 0x82, 0x01, 0x01, 0x00,
        ];
        // 256 bytes of modulus body (already wrote the leading 0x00 above).
        buf.extend(std::iter::repeat(0x77u8).take(256));
        // publicExponent: INTEGER, 3 bytes, value 65537.
        buf.extend([0x02, 0x03, 0x01, 0x00, 0x01]);
        buf.extend(std::iter::repeat(0xAAu8).take(900));
        buf
    }

    #[test]
    fn parses_minimal_rsa_key() {
        let buf = sample_blob();
        let rec = parse_at(&buf, 0).unwrap().unwrap();
        match rec {
            ResultRecord::DerKey { offset, modulus_bits, public_exponent, length } => {
                assert_eq!(offset, 0);
                assert_eq!(modulus_bits, 2048);
                assert_eq!(public_exponent, 65537);
                assert_eq!(length, 4 + 0x04A3);
            }
            _ => panic!("wrong record kind"),
        }
    }

    #[test]
    fn search_finds_embedded_key() {
        let mut buf = vec![0u8; 100];
        buf.extend(sample_blob());
        buf.extend(vec![0u8; 50]);
        let results = search(&buf, 0, buf.len()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offset(), 100);
    }

    #[test]
    fn rejects_wrong_version_tag() {
        let mut buf = sample_blob();
        buf[4] = 0x01;
        assert!(parse_at(&buf, 0).unwrap().is_none());
    }

    #[test]
    fn too_short_buffer_is_no_match() {
        let buf = vec![0x30, 0x82, 0x00, 0x10];
        assert!(parse_at(&buf, 0).unwrap().is_none());
    }

    #[test]
    fn oversized_length_field_is_unsupported() {
        let mut buf = vec![0x30, 0x82, 0x00, 0x10, 0x02, 0x01, 0x00, 0x02, 0x89];
        buf.extend(vec![0xffu8; 10]);
        match parse_at(&buf, 0) {
            Err(Error::UnsupportedDerFeature(_)) => {}
            other => panic!("expected UnsupportedDerFeature, got {other:?}"),
        }
    }
}
