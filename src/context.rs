//! Scan configuration shared by every scanner in the engine.
//!
//! A [`Context`] is built once by the caller (typically the CLI in
//! [`crate::bin`]) and borrowed by whichever scanner [`crate::dispatcher`]
//! selects. Scanners never mutate it except through [`Context::record_hit`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Which structural pattern a scan is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// DER/PKCS#8-encoded RSA private key ([`crate::der`]).
    RsaDer,
    /// Windows `PRIVATEKEYBLOB` "RSA2" signature.
    RsaWin,
    /// AES round-key schedule ([`crate::cipher::aes`]).
    Aes,
    /// Serpent-256 key schedule ([`crate::cipher::serpent`]).
    Serpent,
    /// Twofish key schedule located via the run-histogram classifier
    /// ([`crate::twofish_layout`]).
    Twofish,
    /// Twofish key schedule in the original TrueCrypt in-memory layout
    /// ([`crate::twofish_layout::match_old`]).
    TwofishTc,
}

impl KeyKind {
    /// The key sizes (in bits) this kind accepts, or `None` if the kind has
    /// a single fixed size.
    pub fn allowed_bits(self) -> &'static [u16] {
        match self {
            KeyKind::Aes => &[128, 192, 256],
            KeyKind::Serpent | KeyKind::Twofish | KeyKind::TwofishTc => &[256],
            KeyKind::RsaDer | KeyKind::RsaWin => &[],
        }
    }
}

/// Statistical metric used by the entropy scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Shannon entropy over the window's byte distribution.
    Entropy,
    /// Count of distinct byte values present in the window.
    UniqueBytes,
}

/// Sliding vs. non-overlapping window placement for the entropy scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Advance one byte at a time ([`crate::entropy_scan::search`]).
    Sliding,
    /// Advance a full window at a time ([`crate::entropy_scan::quicksearch`]).
    Quick,
}

/// A half-open byte range `[from, to)` into the scan buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub from: usize,
    pub to: usize,
}

impl Interval {
    /// Build an interval, clamping `to` to `len` and validating `from <= to`.
    pub fn new(from: usize, to: Option<usize>, len: usize) -> Result<Self> {
        let to = to.unwrap_or(len).min(len);
        if from > to {
            return Err(Error::InvalidArgument("interval start is after its end"));
        }
        Ok(Self { from, to })
    }

    /// The whole buffer.
    pub fn whole(len: usize) -> Self {
        Self { from: 0, to: len }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Cooperative cancellation flag polled once per outer scan iteration.
///
/// Cloning shares the same underlying flag; [`CancelToken::cancel`] from any
/// clone stops every scanner holding one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for one scan invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub key_kind: Option<KeyKind>,
    pub key_size_bits: u16,
    pub window_size: usize,
    pub threshold: f64,
    pub metric: Metric,
    pub window_mode: WindowMode,
    pub cr3_offset: Option<usize>,
    pub verbose: bool,
    /// See open question 4 in the design notes: whether an all-zero (or
    /// otherwise constant) candidate key is allowed to register as a match.
    pub reject_constant_key: bool,
    hits: Arc<AtomicU64>,
    pub cancel: CancelToken,
}

impl Context {
    pub fn new(key_kind: Option<KeyKind>) -> Self {
        let window_size = if key_kind == Some(KeyKind::Twofish) {
            4096
        } else {
            256
        };
        Self {
            key_kind,
            key_size_bits: 128,
            window_size,
            threshold: 7.0,
            metric: Metric::Entropy,
            window_mode: WindowMode::Sliding,
            cr3_offset: None,
            verbose: false,
            reject_constant_key: false,
            hits: Arc::new(AtomicU64::new(0)),
            cancel: CancelToken::new(),
        }
    }

    /// Validate `key_size_bits` against `key_kind`'s allowed set.
    pub fn validate(&self) -> Result<()> {
        if let Some(kind) = self.key_kind {
            let allowed = kind.allowed_bits();
            if !allowed.is_empty() && !allowed.contains(&self.key_size_bits) {
                return Err(Error::InvalidArgument(
                    "key size is not valid for the selected key kind",
                ));
            }
        }
        Ok(())
    }

    /// Number of result records emitted so far. Monotonically increasing.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}
