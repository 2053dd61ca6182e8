//! **residua** - a forensic scanner for cryptographic key residue in raw
//! memory dumps.
//!
//! Given a byte buffer (typically a physical-memory snapshot) and a search
//! interval, the engine locates DER-encoded RSA private keys, expanded
//! AES/Serpent/Twofish key schedules in several in-memory layouts, and spans
//! of unusually high entropy that are candidate key material. It can
//! optionally reconstruct an x86 32-bit virtual address space via a
//! page-table walk before scanning it.
//!
//! # Modules
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`stats`] | Shannon entropy, unique-byte counts, incremental run histograms |
//! | [`cipher`] | Reference key-schedule implementations (AES, Serpent, Twofish) |
//! | [`der`] | DER/PKCS#8 RSA private-key structural parser |
//! | [`twofish_layout`] | Statistical recognition of resident Twofish schedules |
//! | [`entropy_scan`] | Sliding- and quick-window entropy/byte-count scanning |
//! | [`virtmem`] | x86 32-bit page-table walk and virtual-memory reconstruction |
//! | [`dispatcher`] | Scanner selection and sequencing |
//! | [`context`] | Scan configuration shared by every scanner |
//! | [`result`] | Result record types emitted by scanners |

pub mod cipher;
pub mod context;
pub mod der;
pub mod dispatcher;
pub mod entropy_scan;
pub mod error;
pub mod result;
pub mod stats;
pub mod twofish_layout;
pub mod virtmem;

pub use error::{Error, Result};
