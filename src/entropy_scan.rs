//! Sliding- and quick-window entropy (or unique-byte-count) scanning,
//! producing contiguous "blob" result records.
//!
//! `search` slides one byte at a time and merges adjacent above-threshold
//! windows into a single blob unless at least one sub-threshold window
//! separates them - this is intentional, documented behavior, not an
//! off-by-one: a single low window inside an otherwise high-entropy region
//! genuinely ends that region's run.

use crate::context::{Context, Metric, WindowMode};
use crate::result::ResultRecord;
use crate::stats::{entropy, unique_byte_count};

fn metric_of(metric: Metric, window: &[u8]) -> f64 {
    match metric {
        Metric::Entropy => entropy(window),
        Metric::UniqueBytes => unique_byte_count(window) as f64,
    }
}

struct OpenBlob {
    start: usize,
    sum: f64,
    samples: usize,
}

/// Sliding-window scan: advance one byte at a time over `[from, to)`,
/// reporting each maximal run of windows whose metric stays `>= threshold`.
///
/// When `sink` is given, every window's raw metric value is forwarded to it
/// in scan order, independent of whether the window is part of a blob (the
/// `-p` metric stream).
pub fn search(
    buf: &[u8],
    ctx: &Context,
    from: usize,
    to: usize,
    mut sink: Option<&mut dyn FnMut(f64)>,
) -> Vec<ResultRecord> {
    let w = ctx.window_size;
    let mut out = Vec::new();
    let mut open: Option<OpenBlob> = None;

    if to < from + w {
        return out;
    }

    for i in from..=to - w {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let m = metric_of(ctx.metric, &buf[i..i + w]);
        if let Some(s) = sink.as_deref_mut() {
            s(m);
        }
        if m >= ctx.threshold {
            open = Some(match open.take() {
                Some(mut b) => {
                    b.sum += m;
                    b.samples += 1;
                    b
                }
                None => OpenBlob { start: i, sum: m, samples: 1 },
            });
        } else if let Some(b) = open.take() {
            out.push(close_blob(b, i + w - 1, w));
        }
    }

    if let Some(b) = open.take() {
        out.push(close_blob(b, to - 1, w));
    }
    out
}

fn close_blob(b: OpenBlob, end: usize, window_size: usize) -> ResultRecord {
    let bytes = end - b.start;
    ResultRecord::EntropyBlob {
        start: b.start,
        end,
        bytes,
        windows: bytes / window_size,
        mean_metric: b.sum / b.samples as f64,
    }
}

/// Non-overlapping ("quick") scan: advance a full window at a time, clamping
/// the final step to whatever remains of the interval. See [`search`] for
/// the meaning of `sink`.
pub fn quicksearch(
    buf: &[u8],
    ctx: &Context,
    from: usize,
    to: usize,
    mut sink: Option<&mut dyn FnMut(f64)>,
) -> Vec<ResultRecord> {
    let w = ctx.window_size;
    let mut out = Vec::new();
    let mut open: Option<OpenBlob> = None;
    let mut i = from;

    while i < to {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let step = w.min(to - i);
        let m = metric_of(ctx.metric, &buf[i..i + step]);
        if let Some(s) = sink.as_deref_mut() {
            s(m);
        }
        let at_eof = i + step >= to;

        if m >= ctx.threshold {
            open = Some(match open.take() {
                Some(mut b) => {
                    b.sum += m;
                    b.samples += 1;
                    b
                }
                None => OpenBlob { start: i, sum: m, samples: 1 },
            });
            if at_eof {
                let b = open.take().unwrap();
                out.push(close_blob_quick(b, i + step - 1));
            }
        } else if let Some(b) = open.take() {
            out.push(close_blob_quick(b, i + step - 1));
        }

        i += step;
    }

    out
}

fn close_blob_quick(b: OpenBlob, end: usize) -> ResultRecord {
    ResultRecord::EntropyBlob {
        start: b.start,
        end,
        bytes: end - b.start,
        windows: b.samples,
        mean_metric: b.sum / b.samples as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, KeyKind};

    fn ctx(window: usize, threshold: f64) -> Context {
        let mut c = Context::new(None::<KeyKind>);
        c.window_size = window;
        c.threshold = threshold;
        c
    }

    #[test]
    fn sliding_scan_reports_no_blob_below_threshold() {
        let buf = vec![0x41u8; 1024];
        let c = ctx(64, 7.0);
        assert!(search(&buf, &c, 0, buf.len(), None).is_empty());
    }

    #[test]
    fn sliding_scan_reports_high_entropy_region() {
        let mut buf = vec![0u8; 200];
        let blob: Vec<u8> = (0..256u32).cycle().take(256).map(|b| b as u8).collect();
        buf.extend_from_slice(&blob);
        buf.extend(vec![0u8; 200]);
        let c = ctx(256, 7.9);
        let results = search(&buf, &c, 0, buf.len(), None);
        assert_eq!(results.len(), 1);
        match &results[0] {
            ResultRecord::EntropyBlob { start, .. } => assert_eq!(*start, 200),
            _ => panic!("wrong record"),
        }
    }

    #[test]
    fn quicksearch_clamps_final_window() {
        let buf = vec![0x11u8; 100];
        let c = ctx(64, 100.0);
        assert!(quicksearch(&buf, &c, 0, buf.len(), None).is_empty());
    }

    #[test]
    fn quicksearch_reports_open_blob_at_eof() {
        let blob: Vec<u8> = (0..256u32).map(|b| b as u8).collect();
        let c = ctx(256, 7.9);
        let results = quicksearch(&blob, &c, 0, blob.len(), None);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn sink_receives_one_metric_per_window() {
        let buf = vec![0x41u8; 100];
        let c = ctx(10, 100.0);
        let mut seen = Vec::new();
        {
            let mut record = |m: f64| seen.push(m);
            search(&buf, &c, 0, buf.len(), Some(&mut record));
        }
        assert_eq!(seen.len(), buf.len() - c.window_size + 1);
    }
}
