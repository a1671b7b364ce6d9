/// Additive fudge for denominators that would otherwise hit a division
/// singularity. The bias is deliberate and reproducible, not an error path.
pub const EPS: f64 = 1e-10;

/// Squared 2-norm of `(x, y)`.
#[inline(always)]
pub fn r2(x: f64, y: f64) -> f64 {
    x * x + y * y
}

/// 2-norm of `(x, y)`.
#[inline(always)]
pub fn r(x: f64, y: f64) -> f64 {
    r2(x, y).sqrt()
}

/// The angle `atan2(x, y)` — note the argument order, which follows the
/// flame-fractal convention of measuring from the positive y-axis.
#[inline(always)]
pub fn theta(x: f64, y: f64) -> f64 {
    x.atan2(y)
}
