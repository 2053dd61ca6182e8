//! Result records emitted by the scanners in [`crate::dispatcher`].

/// Which of the four in-memory Twofish key-schedule layouts matched
/// ([`crate::twofish_layout`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwofishVariant {
    /// TrueCrypt's `l_key`/`s_key`/`mk_tab`/`k_len` layout.
    TrueCrypt,
    /// The "optimized" `K`/`k_len`/`QF` layout.
    Optimized,
    /// GPG/SSH's flat `s`/`w`/`k` layout.
    GpgSsh,
    /// Nettle's `k`/`s` layout.
    Nettle,
}

/// One discovery made by a scanner.
///
/// Offsets are always absolute to the buffer the scan was run against, not
/// relative to the search interval.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRecord {
    /// A DER/PKCS#8 RSA private key ([`crate::der`]).
    DerKey {
        offset: usize,
        modulus_bits: u32,
        public_exponent: u32,
        length: usize,
    },
    /// An AES round-key schedule ([`crate::cipher::aes`]).
    AesKey {
        offset: usize,
        bits: u16,
        schedule_bytes: usize,
    },
    /// A Serpent-256 key schedule ([`crate::cipher::serpent`]).
    SerpentKey { offset: usize, schedule_bytes: usize },
    /// A Twofish key schedule ([`crate::twofish_layout`] or
    /// [`crate::cipher::twofish`]).
    TwofishKey {
        offset: usize,
        variant: TwofishVariant,
        schedule_bytes: usize,
    },
    /// A high-entropy (or high-unique-byte-count) span ([`crate::entropy_scan`]).
    EntropyBlob {
        start: usize,
        end: usize,
        bytes: usize,
        windows: usize,
        mean_metric: f64,
    },
    /// A literal `"RSA2"` Windows `PRIVATEKEYBLOB` signature.
    RsaWinSignature { offset: usize },
}

impl ResultRecord {
    /// The absolute offset this record is anchored to, for sorting and for
    /// the monotonic-offset invariant the dispatcher relies on.
    pub fn offset(&self) -> usize {
        match *self {
            ResultRecord::DerKey { offset, .. }
            | ResultRecord::AesKey { offset, .. }
            | ResultRecord::SerpentKey { offset, .. }
            | ResultRecord::TwofishKey { offset, .. }
            | ResultRecord::RsaWinSignature { offset } => offset,
            ResultRecord::EntropyBlob { start, .. } => start,
        }
    }
}
