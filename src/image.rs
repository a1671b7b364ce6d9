use std::io::{self, Write};

use crate::render::Histogram;

/// Converts the density histogram into 8-bit grayscale pixels, top row
/// first, using logarithmic compression so a few very dense cells do not
/// wash out the rest of the image.
///
/// Each cell maps to `round(log(cell + 1) * 255.5 / log_max)` clamped to
/// `[0, 255]`, where `log_max` is the largest `log(cell + 1)`. An empty
/// histogram (`log_max == 0`) produces an all-zero image.
pub fn tone_map(histogram: &Histogram) -> Vec<u8> {
    let log_max = histogram
        .cells()
        .iter()
        .map(|&c| scale_log(c))
        .fold(0.0f64, f64::max);
    let mut pixels = Vec::with_capacity(histogram.cells().len());
    if log_max == 0.0 {
        pixels.resize(histogram.cells().len(), 0);
        return pixels;
    }
    for row in histogram.rows_top_down() {
        for &cell in row {
            let value = (scale_log(cell) * 255.5 / log_max).round();
            pixels.push(value.clamp(0.0, 255.0) as u8);
        }
    }
    pixels
}

fn scale_log(cell: u32) -> f64 {
    (f64::from(cell) + 1.0).ln()
}

/// Writes a binary PGM (P5) grayscale raster. `pixels` is row-major with
/// the top row first, as produced by [`tone_map`].
pub fn write_pgm<W: Write>(
    mut out: W,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> io::Result<()> {
    debug_assert_eq!(pixels.len(), width as usize * height as usize);
    write!(out, "P5\n{} {}\n255\n", width, height)?;
    out.write_all(pixels)
}

/// Writes the raw u32 histogram buffer in native byte order, row-major, in
/// the same top-row-first orientation as the PGM output.
pub fn write_histogram_dump<W: Write>(mut out: W, histogram: &Histogram) -> io::Result<()> {
    for row in histogram.rows_top_down() {
        for &cell in row {
            out.write_all(&cell.to_ne_bytes())?;
        }
    }
    Ok(())
}
