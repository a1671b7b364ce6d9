use tracing::{debug, warn};

use crate::flame::{Flame, Xform};
use crate::rand::Rng;
use crate::variations::IterState;

pub const DEFAULT_SETTLE_ITERS: u32 = 20;
pub const DEFAULT_BAD_VALUE_THRESHOLD: f64 = 1e10;

// Divergence events past this count are suppressed to avoid flooding output.
const MAX_BAD_VALUE_LOGS: u64 = 8;

/// Tunable renderer knobs. Neither default has a documented derivation in
/// the flame literature; they are configuration, not contract.
#[derive(Debug, Clone, Copy)]
pub struct RenderOpts {
    /// Initial (and post-recovery) iterations discarded so the orbit can
    /// approach the attractor before samples are recorded. At least 1.
    pub settle_iters: u32,
    /// Magnitude above which a coordinate counts as divergent.
    pub bad_value_threshold: f64,
}

impl Default for RenderOpts {
    fn default() -> RenderOpts {
        RenderOpts {
            settle_iters: DEFAULT_SETTLE_ITERS,
            bad_value_threshold: DEFAULT_BAD_VALUE_THRESHOLD,
        }
    }
}

/// Counters accumulated over one render. `plotted + dropped + skipped`
/// always equals the flame's sample count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Samples accumulated into the histogram.
    pub plotted: u64,
    /// Samples outside the viewport rectangle, silently discarded.
    pub dropped: u64,
    /// Divergence events (bad coordinate detected after an xform).
    pub bad_values: u64,
    /// Sample budget consumed by post-divergence re-settling.
    pub skipped: u64,
}

/// Dense 2-D grid of sample counts, `size_x` wide and `size_y` tall,
/// row-major with the origin at the *bottom-left* of the viewport. Cells
/// only ever increment; a cell never exceeds the flame's sample count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    width: u32,
    height: u32,
    cells: Vec<u32>,
}

impl Histogram {
    pub fn new(width: u32, height: u32) -> Histogram {
        Histogram {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Cell count at `(px, py)`, with `py` measured from the bottom.
    pub fn get(&self, px: u32, py: u32) -> u32 {
        self.cells[py as usize * self.width as usize + px as usize]
    }

    pub(crate) fn increment(&mut self, px: u32, py: u32) {
        self.cells[py as usize * self.width as usize + px as usize] += 1;
    }

    /// All cells in storage order (bottom row first).
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Rows from the *top* of the image down, the orientation in which
    /// raster output is written.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.width as usize).rev()
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn max_cell(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }
}

/// Scales `weights` so they sum to 1. The input is non-empty, non-negative,
/// and not all zero (enforced at configuration time).
pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| w / sum).collect()
}

/// Builds the cumulative-weight array used for stage selection. The final
/// entry is forced to exactly 1.0 to absorb summation rounding, so selection
/// can never scan past the end.
pub fn cumulative_weights(weights: &[f64]) -> Vec<f64> {
    let normalized = normalize_weights(weights);
    let mut acc = 0.0;
    let mut cw: Vec<f64> = normalized
        .iter()
        .map(|w| {
            acc += w;
            acc
        })
        .collect();
    if let Some(last) = cw.last_mut() {
        *last = 1.0;
    }
    cw
}

/// Selects the first stage whose cumulative weight reaches the uniform draw
/// `u`. Linear scan; `cw` is short and sorted with `cw[last] == 1.0`.
pub fn pick_xform(cw: &[f64], u: f64) -> usize {
    for (i, &c) in cw.iter().enumerate() {
        if c >= u {
            return i;
        }
    }
    cw.len() - 1
}

/// A coordinate is bad if it left the attractor's basin: NaN or beyond the
/// magnitude threshold (infinities included).
fn bad_value(v: f64, threshold: f64) -> bool {
    v.is_nan() || v > threshold || v < -threshold
}

/// One step of the chaos game: pre-affine, summed variations, post-affine.
/// Mutates `st` and nothing else.
pub fn apply_xform(st: &mut IterState, xform: &Xform) {
    (st.tx, st.ty) = xform.pre_affine.apply(st.x, st.y);
    st.vx = 0.0;
    st.vy = 0.0;
    for &(var, weight) in &xform.variations {
        var.apply(st, &xform.pre_affine, weight);
    }
    (st.x, st.y) = xform.post_affine.apply(st.vx, st.vy);
}

// Uniform starting point in [-s, s] x [-s, s].
fn reseed_point(st: &mut IterState, s: f64) {
    st.x = s * (f64::from(st.rng.next_float()) * 2.0 - 1.0);
    st.y = s * (f64::from(st.rng.next_float()) * 2.0 - 1.0);
}

fn settle(st: &mut IterState, flame: &Flame, cw: &[f64], iters: u32) {
    for _ in 0..iters {
        let i = pick_xform(cw, f64::from(st.rng.next_float()));
        apply_xform(st, &flame.xforms[i]);
    }
}

/// Runs the chaos game for `flame.samples` iterations and accumulates the
/// density histogram. The render is strictly sequential: each sample's
/// starting point is the previous sample's ending point.
pub fn render(flame: &Flame, opts: &RenderOpts, rng: Rng) -> (Histogram, RenderStats) {
    let settle_iters = opts.settle_iters.max(1);
    let weights: Vec<f64> = flame.xforms.iter().map(|xf| xf.weight).collect();
    let cw = cumulative_weights(&weights);

    let xscale = f64::from(flame.size_x) / (flame.xmax - flame.xmin);
    let yscale = f64::from(flame.size_y) / (flame.ymax - flame.ymin);

    let mut histogram = Histogram::new(flame.size_x, flame.size_y);
    let mut stats = RenderStats::default();
    let mut st = IterState::new(rng);

    debug!(
        flame = %flame.name,
        samples = flame.samples,
        settle_iters,
        "starting chaos game"
    );
    reseed_point(&mut st, 1.0);
    settle(&mut st, flame, &cw, settle_iters);

    let mut i: u64 = 0;
    while i < flame.samples {
        let stage = pick_xform(&cw, f64::from(st.rng.next_float()));
        apply_xform(&mut st, &flame.xforms[stage]);

        if bad_value(st.x, opts.bad_value_threshold) || bad_value(st.y, opts.bad_value_threshold) {
            stats.bad_values += 1;
            if stats.bad_values <= MAX_BAD_VALUE_LOGS {
                warn!(
                    flame = %flame.name,
                    sample = i,
                    x = st.x,
                    y = st.y,
                    "divergent orbit, reseeding"
                );
                if stats.bad_values == MAX_BAD_VALUE_LOGS {
                    warn!(flame = %flame.name, "further divergence reports suppressed");
                }
            }
            reseed_point(&mut st, 1.0);
            settle(&mut st, flame, &cw, settle_iters);
            // Charge the re-settle against the remaining budget so a
            // persistently divergent system cannot stall the render.
            let skip = u64::from(settle_iters).min(flame.samples - i).max(1);
            stats.skipped += skip;
            i += skip;
            continue;
        }

        if st.x >= flame.xmin && st.x < flame.xmax && st.y >= flame.ymin && st.y < flame.ymax {
            let px = ((st.x - flame.xmin) * xscale).floor() as i64;
            let py = ((st.y - flame.ymin) * yscale).floor() as i64;
            // The rectangle test bounds-checks the point; the index check
            // guards the edge case where scaling rounds up to the boundary.
            if (0..i64::from(flame.size_x)).contains(&px)
                && (0..i64::from(flame.size_y)).contains(&py)
            {
                histogram.increment(px as u32, py as u32);
                stats.plotted += 1;
            } else {
                stats.dropped += 1;
            }
        } else {
            stats.dropped += 1;
        }
        i += 1;
    }

    debug!(
        flame = %flame.name,
        plotted = stats.plotted,
        dropped = stats.dropped,
        bad_values = stats.bad_values,
        skipped = stats.skipped,
        "chaos game finished"
    );
    (histogram, stats)
}
