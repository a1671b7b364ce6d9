use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use flare::flame::Flame;
use flare::rand::{Rng, SeedSource};

#[derive(Parser)]
struct Opts {
    /// JSON document describing the flames to render.
    input: PathBuf,
    /// Explicit PRNG seed; when omitted, each flame is auto-seeded.
    #[clap(long)]
    seed: Option<i64>,
    /// Directory to write output artifacts into.
    #[clap(short, long, default_value = ".")]
    out_dir: PathBuf,
    #[clap(flatten)]
    config: flare::config::Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let document = fs::read_to_string(&opts.input)
        .with_context(|| format!("failed to read {}", opts.input.display()))?;
    let flames = flare::flame::parse_flames(&document)?;
    info!(count = flames.len(), "parsed flame document");

    let mut seeds = SeedSource::new();
    for flame in &flames {
        render_one(flame, &opts, &mut seeds)?;
    }
    Ok(())
}

fn render_one(flame: &Flame, opts: &Opts, seeds: &mut SeedSource) -> anyhow::Result<()> {
    let rng = match opts.seed {
        Some(seed) => Rng::from_seed(seed),
        None => Rng::auto_seeded(seeds),
    };

    info!(flame = %flame.name, samples = flame.samples, "rendering");
    let start = Instant::now();
    let (histogram, stats) = flare::render::render(flame, &opts.config.render_opts(), rng);
    let elapsed = start.elapsed().as_secs_f64();
    let samples_per_sec = (flame.samples as f64 / elapsed) as u64;
    let in_viewport_pct = stats.plotted as f64 / flame.samples as f64 * 100.0;
    info!(
        flame = %flame.name,
        secs = elapsed,
        samples_per_sec,
        in_viewport_pct,
        bad_values = stats.bad_values,
        max_cell = histogram.max_cell(),
        "render finished"
    );

    let pixels = flare::image::tone_map(&histogram);
    let pgm_path = opts.out_dir.join(format!("{}.pgm", flame.name));
    let out = BufWriter::new(
        File::create(&pgm_path)
            .with_context(|| format!("failed to create {}", pgm_path.display()))?,
    );
    flare::image::write_pgm(out, flame.size_x, flame.size_y, &pixels)
        .with_context(|| format!("failed to write {}", pgm_path.display()))?;
    info!(path = %pgm_path.display(), "wrote image");

    if opts.config.dump_histogram {
        let buf_path = opts.out_dir.join(format!("{}.buf", flame.name));
        let out = BufWriter::new(
            File::create(&buf_path)
                .with_context(|| format!("failed to create {}", buf_path.display()))?,
        );
        flare::image::write_histogram_dump(out, &histogram)
            .with_context(|| format!("failed to write {}", buf_path.display()))?;
        info!(path = %buf_path.display(), "wrote histogram dump");
    }
    Ok(())
}
