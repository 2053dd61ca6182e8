//! Selects and runs the scanner named by a [`Context`], sequencing virtual-
//! memory reconstruction first when requested.

use tracing::{debug, info, trace};

use crate::cipher::{aes, serpent};
use crate::context::{Context, KeyKind, WindowMode};
use crate::result::ResultRecord;
use crate::stats::looks_like_mk_tab;
use crate::{der, entropy_scan, stats, twofish_layout, virtmem};
use crate::Result;

/// The largest single structure any scanner in this crate compares against a
/// buffer: the TrueCrypt Twofish layout's `l_key`+`s_key`+`mk_tab`+`k_len`.
/// A chunked reimplementation would need at least this much overlap between
/// adjacent chunks so no boundary-spanning match is missed.
pub const MAX_SCHEDULE_OVERLAP: usize = 176 + 4096 + 4;

/// Pure helper describing how a parallel reimplementation would partition
/// `[0, total_len)` into overlapping chunks. Not invoked by [`run`]; this
/// crate scans single-threaded like the tool it reproduces, and keeps this
/// function only as the documented plan a future implementation would follow.
pub fn chunk_plan(total_len: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    if chunk_size == 0 || total_len == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total_len {
        let end = (start + chunk_size + MAX_SCHEDULE_OVERLAP).min(total_len);
        chunks.push((start, end));
        if end == total_len {
            break;
        }
        start += chunk_size;
    }
    chunks
}

fn rsa_win_search(buf: &[u8], from: usize, to: usize) -> Vec<ResultRecord> {
    const SIG: &[u8; 4] = b"RSA2";
    let end = to.min(buf.len());
    let mut out = Vec::new();
    if end < from + 4 {
        return out;
    }
    for i in from..=end - 4 {
        if &buf[i..i + 4] == SIG {
            trace!(offset = i, "RSA2 signature candidate");
            out.push(ResultRecord::RsaWinSignature { offset: i });
        }
    }
    out
}

fn aes_search(buf: &[u8], ctx: &Context, from: usize, to: usize) -> Vec<ResultRecord> {
    let k = aes::key_len(ctx.key_size_bits);
    let s = aes::schedule_len(ctx.key_size_bits);
    let end = to.min(buf.len());
    if end < from + s {
        return Vec::new();
    }
    let mut out = Vec::new();
    for o in from..=end - s {
        if ctx.cancel.is_cancelled() {
            break;
        }
        if ctx.reject_constant_key && stats::unique_byte_count(&buf[o..o + k]) <= 1 {
            continue;
        }
        if aes::matches_schedule(&buf[o..], ctx.key_size_bits) {
            debug!(offset = o, bits = ctx.key_size_bits, "AES schedule match");
            out.push(ResultRecord::AesKey { offset: o, bits: ctx.key_size_bits, schedule_bytes: s });
        }
    }
    out
}

fn serpent_search(buf: &[u8], ctx: &Context, from: usize, to: usize) -> Vec<ResultRecord> {
    const S: usize = 560;
    let end = to.min(buf.len());
    if end < from + S {
        return Vec::new();
    }
    let mut out = Vec::new();
    for o in from..=end - S {
        if ctx.cancel.is_cancelled() {
            break;
        }
        if ctx.reject_constant_key && stats::unique_byte_count(&buf[o..o + 32]) <= 1 {
            continue;
        }
        if serpent::matches_schedule(&buf[o..]) {
            debug!(offset = o, "Serpent schedule match");
            out.push(ResultRecord::SerpentKey { offset: o, schedule_bytes: S });
        }
    }
    out
}

fn twofish_tc_search(buf: &[u8], ctx: &Context, from: usize, to: usize) -> Vec<ResultRecord> {
    let end = to.min(buf.len());
    let needed = MAX_SCHEDULE_OVERLAP;
    if end < from + needed {
        return Vec::new();
    }
    let mut out = Vec::new();
    for o in from..=end - needed {
        if ctx.cancel.is_cancelled() {
            break;
        }
        if let Some(rec) = twofish_layout::match_old(buf, o) {
            debug!(offset = o, "Twofish (TrueCrypt, recompute) match");
            out.push(rec);
        }
    }
    out
}

fn twofish_search(buf: &[u8], ctx: &Context, from: usize, to: usize) -> Vec<ResultRecord> {
    let w = 4096usize;
    let end = to.min(buf.len());
    if end < from + w {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut hist = stats::RunHistogram::init(&buf[from..from + w]);
    if looks_like_mk_tab(hist.bins()) {
        out.extend(twofish_layout::try_match(buf, from));
    }
    for i in from + 1..=end - w {
        if ctx.cancel.is_cancelled() {
            break;
        }
        hist.step(buf[i + w - 1]);
        if looks_like_mk_tab(hist.bins()) {
            trace!(offset = i, "mk_tab-shaped run histogram");
            out.extend(twofish_layout::try_match(buf, i));
        }
    }
    out
}

fn dispatch_scan(
    ctx: &Context,
    buf: &[u8],
    from: usize,
    to: usize,
    metric_sink: Option<&mut dyn FnMut(f64)>,
) -> Result<Vec<ResultRecord>> {
    let records = match ctx.key_kind {
        None => match ctx.window_mode {
            WindowMode::Sliding => entropy_scan::search(buf, ctx, from, to, metric_sink),
            WindowMode::Quick => entropy_scan::quicksearch(buf, ctx, from, to, metric_sink),
        },
        Some(KeyKind::RsaDer) => der::search(buf, from, to)?,
        Some(KeyKind::RsaWin) => rsa_win_search(buf, from, to),
        Some(KeyKind::Aes) => aes_search(buf, ctx, from, to),
        Some(KeyKind::Serpent) => serpent_search(buf, ctx, from, to),
        Some(KeyKind::Twofish) => twofish_search(buf, ctx, from, to),
        Some(KeyKind::TwofishTc) => twofish_tc_search(buf, ctx, from, to),
    };
    for _ in &records {
        ctx.record_hit();
    }
    Ok(records)
}

/// Run the scan described by `ctx` over `buf[from, to)`.
///
/// When `ctx.cr3_offset` is set, `[from, to)` is first interpreted as a
/// virtual-address range to reconstruct (§4.6); the chosen scanner then runs
/// over the full reconstructed buffer rather than the original interval.
pub fn run(ctx: &Context, buf: &[u8], from: usize, to: usize) -> Result<Vec<ResultRecord>> {
    run_with_metric_sink(ctx, buf, from, to, None)
}

/// As [`run`], but additionally forwards every window's raw metric value (the
/// `-p` stream) to `metric_sink` when the entropy scanner runs. Ignored by
/// every key-kind scanner, which have no per-window metric to report.
pub fn run_with_metric_sink(
    ctx: &Context,
    buf: &[u8],
    from: usize,
    to: usize,
    metric_sink: Option<&mut dyn FnMut(f64)>,
) -> Result<Vec<ResultRecord>> {
    ctx.validate()?;
    info!(key_kind = ?ctx.key_kind, from, to, "scan starting");

    let result = if let Some(cr3) = ctx.cr3_offset {
        let reconstructed = virtmem::reconstruct(buf, cr3, from as u32, to as u32)?;
        let len = reconstructed.len();
        dispatch_scan(ctx, &reconstructed, 0, len, metric_sink)
    } else {
        dispatch_scan(ctx, buf, from, to, metric_sink)
    };

    info!(hits = ctx.hit_count(), "scan finished");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::aes;
    use crate::context::Context;

    #[test]
    fn rsa_win_finds_all_signatures() {
        let mut buf = vec![0u8; 2100];
        buf[100..104].copy_from_slice(b"RSA2");
        buf[2000..2004].copy_from_slice(b"RSA2");
        let results = rsa_win_search(&buf, 0, buf.len());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].offset(), 100);
        assert_eq!(results[1].offset(), 2000);
    }

    #[test]
    fn aes_search_reports_planted_key() {
        let key = [0u8; 32];
        let schedule = aes::expand(&key);
        let mut buf = vec![0xCCu8; 4096];
        buf[4096 - 4096 / 2..4096 - 4096 / 2 + schedule.len()].copy_from_slice(&schedule);
        let mut ctx = Context::new(Some(KeyKind::Aes));
        ctx.key_size_bits = 256;
        let results = aes_search(&buf, &ctx, 0, buf.len());
        assert!(results.iter().any(|r| matches!(r, ResultRecord::AesKey { offset, bits: 256, .. } if *offset == 4096 - 4096/2)));
    }

    #[test]
    fn chunk_plan_covers_full_range_with_overlap() {
        let chunks = chunk_plan(10_000, 4_096);
        assert!(!chunks.is_empty());
        assert_eq!(chunks.last().unwrap().1, 10_000);
        for w in chunks.windows(2) {
            assert!(w[1].0 < w[0].1, "adjacent chunks must overlap");
        }
    }
}
