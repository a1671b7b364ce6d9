use crate::render::{RenderOpts, DEFAULT_BAD_VALUE_THRESHOLD, DEFAULT_SETTLE_ITERS};

#[derive(Debug, clap::Args)]
pub struct Config {
    /// Orbit iterations discarded before (and after each divergence
    /// recovery during) sample recording.
    #[clap(long, default_value_t = DEFAULT_SETTLE_ITERS)]
    pub settle_iters: u32,

    /// Coordinate magnitude beyond which an orbit counts as divergent and is
    /// reseeded.
    #[clap(long, default_value_t = DEFAULT_BAD_VALUE_THRESHOLD)]
    pub bad_value_threshold: f64,

    /// Also write each flame's raw u32 histogram buffer next to its image.
    #[clap(long)]
    pub dump_histogram: bool,
}

impl Config {
    pub fn render_opts(&self) -> RenderOpts {
        RenderOpts {
            settle_iters: self.settle_iters,
            bad_value_threshold: self.bad_value_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            settle_iters: DEFAULT_SETTLE_ITERS,
            bad_value_threshold: DEFAULT_BAD_VALUE_THRESHOLD,
            dump_histogram: false,
        }
    }
}
