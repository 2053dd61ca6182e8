//! Statistical primitives used by every scanner: Shannon entropy, unique-byte
//! counts, and an incrementally-maintained byte-run histogram.
//!
//! The run histogram mirrors the sliding-window bookkeeping the original
//! tool uses to cheaply advance a 4096-byte window one byte at a time while
//! looking for the Twofish `mk_tab` substitution table (see
//! [`crate::twofish_layout`]): initialize once with [`RunHistogram::init`],
//! then call [`RunHistogram::step`] once per byte the window advances. The
//! result after `n` steps must equal [`RunHistogram::init`] run on the
//! window in its new position - this equivalence is the property the test
//! suite in this module checks.

use std::collections::VecDeque;

/// Number of bins in [`RunHistogram`]. Bin `i` counts runs of exact run
/// value `i+1` (a run value of `k` is a maximal span of `k+1` equal bytes),
/// with the last bin accumulating every run of value `k >= BINS`.
pub const BINS: usize = 6;

/// Shannon entropy, in bits, of the byte distribution of `data`.
///
/// Returns `0.0` for an empty slice. The result always lies in `[0, 8]` for
/// byte data, with `8.0` reached only when all 256 byte values occur with
/// identical frequency.
pub fn entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Number of distinct byte values present in `data`.
pub fn unique_byte_count(data: &[u8]) -> usize {
    let mut seen = [false; 256];
    let mut count = 0;
    for &b in data {
        if !seen[b as usize] {
            seen[b as usize] = true;
            count += 1;
        }
    }
    count
}

/// Round `value` to 4 decimal places.
///
/// The Twofish validators in [`crate::twofish_layout`] compare entropy
/// against exact constants (e.g. `8.0`, or a table of 21 discrete values);
/// rounding first absorbs the last-bit noise `f64::log2` otherwise
/// introduces, matching the original's `snprintf("%.4f")` / `atof`
/// round-trip.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[inline]
fn bin_of(run_value: usize) -> usize {
    (run_value - 1).min(BINS - 1)
}

fn leading_run_value(window: &VecDeque<u8>) -> usize {
    let mut it = window.iter();
    let Some(&first) = it.next() else {
        return 0;
    };
    let mut k = 0;
    for &b in it {
        if b == first {
            k += 1;
        } else {
            break;
        }
    }
    k
}

/// Incrementally-maintained histogram of byte-run lengths over a sliding
/// window.
#[derive(Debug, Clone)]
pub struct RunHistogram {
    bins: [u64; BINS],
    window: VecDeque<u8>,
    /// Run value of the run touching the front of the window (0 if the
    /// front byte differs from its neighbour).
    first_run: usize,
    /// Run value of the run touching the back of the window.
    last_run: usize,
}

impl RunHistogram {
    /// Build a histogram from scratch over `window`.
    pub fn init(window: &[u8]) -> Self {
        let n = window.len();
        let mut bins = [0u64; BINS];
        let mut first_run = 0;
        let mut last_run = 0;
        let mut i = 0;
        while i < n {
            let start = i;
            while i + 1 < n && window[i + 1] == window[start] {
                i += 1;
            }
            let run_value = i - start;
            if run_value >= 1 {
                bins[bin_of(run_value)] += 1;
            }
            if start == 0 {
                first_run = run_value;
            }
            if i == n - 1 {
                last_run = run_value;
            }
            i += 1;
        }
        Self {
            bins,
            window: window.iter().copied().collect(),
            first_run,
            last_run,
        }
    }

    /// Advance the window by one byte: drop the front byte, append
    /// `incoming` at the back, and update the histogram to match.
    pub fn step(&mut self, incoming: u8) {
        self.window.pop_front();

        if self.first_run >= 1 {
            self.bins[bin_of(self.first_run)] -= 1;
            self.first_run -= 1;
            if self.first_run >= 1 {
                self.bins[bin_of(self.first_run)] += 1;
            }
        } else {
            // The byte now at the front belonged to a run that was already
            // fully interior (or the trailing run) and so already holds a
            // bin entry; only the bookkeeping needs to catch up.
            self.first_run = leading_run_value(&self.window);
        }

        self.window.push_back(incoming);
        let n = self.window.len();
        let extends_last_run = n >= 2 && self.window[n - 2] == incoming;
        if extends_last_run {
            if self.last_run >= 1 {
                self.bins[bin_of(self.last_run)] -= 1;
            }
            self.last_run += 1;
            self.bins[bin_of(self.last_run)] += 1;
        } else {
            self.last_run = 0;
        }
    }

    /// Current bin counts.
    pub fn bins(&self) -> [u64; BINS] {
        self.bins
    }
}

/// Heuristic match of a 4096-byte window's run histogram against the shape
/// produced by a Twofish `mk_tab` substitution table.
///
/// See the component design notes for [`crate::twofish_layout`] for the
/// provenance of these bounds.
pub fn looks_like_mk_tab(bins: [u64; BINS]) -> bool {
    bins[0] > 485
        && bins[0] < 520
        && bins[1] == 0
        && (1..=12).contains(&bins[2])
        && bins[3] == 0
        && bins[4] == 0
        && (bins[5] == 0 || bins[5] == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn entropy_of_empty_is_zero() {
        assert_eq!(entropy(&[]), 0.0);
    }

    #[test]
    fn entropy_of_constant_buffer_is_zero() {
        assert_eq!(entropy(&[0x42; 4096]), 0.0);
    }

    #[test]
    fn entropy_of_uniform_256_distribution_is_eight() {
        let data: Vec<u8> = (0..256u32).map(|b| b as u8).collect();
        assert!((entropy(&data) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn entropy_is_bounded() {
        let mut data = Vec::new();
        for i in 0u32..5000 {
            data.push((i % 251) as u8);
        }
        let h = entropy(&data);
        assert!(h >= 0.0 && h <= 8.0);
    }

    #[test]
    fn unique_byte_count_basic() {
        assert_eq!(unique_byte_count(&[1, 1, 2, 3, 3, 3]), 3);
        assert_eq!(unique_byte_count(&[]), 0);
    }

    #[test]
    fn round4_matches_expected() {
        assert_eq!(round4(7.99996), 8.0);
        assert_eq!(round4(3.12344), 3.1234);
        assert_eq!(round4(3.12345_000_1), 3.1235);
    }

    proptest! {
        #[test]
        fn incremental_matches_from_scratch(
            data in prop::collection::vec(any::<u8>(), 256..16_384),
            window_size in 16usize..256,
        ) {
            let window_size = window_size.min(data.len() - 1).max(2);
            let mut hist = RunHistogram::init(&data[0..window_size]);
            for i in window_size..data.len() {
                hist.step(data[i]);
                let expected = RunHistogram::init(&data[i + 1 - window_size..=i]);
                prop_assert_eq!(hist.bins(), expected.bins());
            }
        }
    }
}
