//! Reference key-schedule implementations used purely for *recomputation and
//! comparison*, not for encrypting or decrypting real data.
//!
//! A scanner candidate is accepted when expanding the bytes it believes are
//! the raw user key reproduces, byte for byte, the schedule bytes that
//! immediately follow in the buffer. None of the code here needs to be
//! constant-time: it runs once per candidate offset over public, attacker-
//! visible memory, not over a secret being protected in real time.
//!
//! | Module | Cipher | Schedule size |
//! |--------|--------|----------------|
//! | [`aes`] | AES-128/192/256 (FIPS-197) | 176 / 208 / 240 bytes |
//! | [`serpent`] | Serpent-256 | 560 bytes |
//! | [`twofish`] | Twofish (TrueCrypt in-memory layout) | `l_key`+`s_key`+`mk_tab` |

pub mod aes;
pub mod serpent;
pub mod twofish;
