use std::f64::consts::PI;

use crate::flame::AffineParams;
use crate::math::{r, r2, theta, EPS};
use crate::rand::Rng;

/// The mutable per-sample state threaded through one full render: the
/// current point, the pre-affine-transformed point, the variation
/// accumulator, and the generator. Exactly one exists per render and is
/// mutated in place for every sample; cloning it per sample would defeat the
/// performance goal.
pub struct IterState {
    pub x: f64,
    pub y: f64,
    pub tx: f64,
    pub ty: f64,
    pub vx: f64,
    pub vy: f64,
    pub rng: Rng,
}

impl IterState {
    pub fn new(rng: Rng) -> IterState {
        IterState {
            x: 0.0,
            y: 0.0,
            tx: 0.0,
            ty: 0.0,
            vx: 0.0,
            vy: 0.0,
            rng,
        }
    }
}

/// A nonlinear point-transform function, identified by a stable name.
///
/// The catalog is closed and append-only; configuration resolves names to
/// handles once at parse time, so the hot loop dispatches through a direct
/// match with no lookup. Each variation consumes the pre-affine point
/// `(tx, ty)` (and, for a few, the owning xform's pre-affine coefficients or
/// a random draw) and *adds* its weighted contribution into `(vx, vy)`:
/// multiple variations on one xform are summed, not overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variation {
    Linear,
    Sinusoidal,
    Spherical,
    Swirl,
    Horseshoe,
    Polar,
    Handkerchief,
    Heart,
    Disc,
    Spiral,
    Hyperbolic,
    Diamond,
    Ex,
    Julia,
    Bent,
    Waves,
    Fisheye,
    Popcorn,
    Exponential,
    Power,
    Cosine,
    Rings,
    Fan,
}

// flam3 numbering, 0 through 22.
const CATALOG: &[(&str, Variation)] = &[
    ("linear", Variation::Linear),
    ("sinusoidal", Variation::Sinusoidal),
    ("spherical", Variation::Spherical),
    ("swirl", Variation::Swirl),
    ("horseshoe", Variation::Horseshoe),
    ("polar", Variation::Polar),
    ("handkerchief", Variation::Handkerchief),
    ("heart", Variation::Heart),
    ("disc", Variation::Disc),
    ("spiral", Variation::Spiral),
    ("hyperbolic", Variation::Hyperbolic),
    ("diamond", Variation::Diamond),
    ("ex", Variation::Ex),
    ("julia", Variation::Julia),
    ("bent", Variation::Bent),
    ("waves", Variation::Waves),
    ("fisheye", Variation::Fisheye),
    ("popcorn", Variation::Popcorn),
    ("exponential", Variation::Exponential),
    ("power", Variation::Power),
    ("cosine", Variation::Cosine),
    ("rings", Variation::Rings),
    ("fan", Variation::Fan),
];

impl Variation {
    /// Resolves a catalog name by exact string match.
    pub fn from_name(name: &str) -> Option<Variation> {
        CATALOG
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|&(_, var)| var)
    }

    pub fn name(self) -> &'static str {
        CATALOG
            .iter()
            .find(|&&(_, var)| var == self)
            .map(|&(name, _)| name)
            .unwrap_or("?")
    }

    /// Adds this variation's weighted contribution to the accumulator
    /// `(st.vx, st.vy)`, reading the pre-affine point `(st.tx, st.ty)`.
    /// `pre` is the owning xform's pre-affine map, whose coefficients
    /// parameterize `waves`, `popcorn`, `rings`, and `fan`.
    pub fn apply(self, st: &mut IterState, pre: &AffineParams, weight: f64) {
        let (tx, ty) = (st.tx, st.ty);
        let (vx, vy) = match self {
            Variation::Linear => (tx, ty),
            Variation::Sinusoidal => (tx.sin(), ty.sin()),
            Variation::Spherical => {
                let k = 1.0 / (r2(tx, ty) + EPS);
                (k * tx, k * ty)
            }
            Variation::Swirl => {
                let (sr, cr) = r2(tx, ty).sin_cos();
                (sr * tx - cr * ty, cr * tx + sr * ty)
            }
            Variation::Horseshoe => {
                let k = 1.0 / (r(tx, ty) + EPS);
                ((tx - ty) * (tx + ty) * k, 2.0 * tx * ty * k)
            }
            Variation::Polar => (theta(tx, ty) / PI, r(tx, ty) - 1.0),
            Variation::Handkerchief => {
                let a = theta(tx, ty);
                let rad = r(tx, ty);
                (rad * (a + rad).sin(), rad * (a - rad).cos())
            }
            Variation::Heart => {
                let rad = r(tx, ty);
                let a = rad * theta(tx, ty);
                (rad * a.sin(), -rad * a.cos())
            }
            Variation::Disc => {
                let a = theta(tx, ty);
                let rad = r(tx, ty);
                (a * (PI * rad).sin() / PI, a * (PI * rad).cos() / PI)
            }
            Variation::Spiral => {
                let a = theta(tx, ty);
                let k = 1.0 / (r(tx, ty) + EPS);
                ((a.cos() + r(tx, ty).sin()) * k, (a.sin() - r(tx, ty).cos()) * k)
            }
            Variation::Hyperbolic => {
                let a = theta(tx, ty);
                let rad = r(tx, ty) + EPS;
                (a.sin() / rad, rad * a.cos())
            }
            Variation::Diamond => {
                let a = theta(tx, ty);
                let rad = r(tx, ty);
                (a.sin() * rad.cos(), a.cos() * rad.sin())
            }
            Variation::Ex => {
                let a = theta(tx, ty);
                let rad = r(tx, ty);
                let p0 = (a + rad).sin();
                let p1 = (a - rad).sin();
                let (p0, p1) = (p0 * p0 * p0, p1 * p1 * p1);
                (rad * (p0 + p1), rad * (p0 - p1))
            }
            Variation::Julia => {
                let half = theta(tx, ty) / 2.0;
                let sr = r(tx, ty).sqrt();
                // omega: 0 or pi
                let omega = if st.rng.next_bool() { PI } else { 0.0 };
                (sr * (half + omega).cos(), sr * (half + omega).sin())
            }
            Variation::Bent => {
                let bx = if tx >= 0.0 { tx } else { 2.0 * tx };
                let by = if ty >= 0.0 { ty } else { ty / 2.0 };
                (bx, by)
            }
            Variation::Waves => (
                tx + pre.b * (ty / (pre.c * pre.c + EPS)).sin(),
                ty + pre.e * (tx / (pre.f * pre.f + EPS)).sin(),
            ),
            Variation::Fisheye => {
                // Note the swapped output coordinates, faithful to flam3.
                let k = 2.0 / (r(tx, ty) + 1.0);
                (k * ty, k * tx)
            }
            Variation::Popcorn => (
                tx + pre.c * (3.0 * ty).tan().sin(),
                ty + pre.f * (3.0 * tx).tan().sin(),
            ),
            Variation::Exponential => {
                let rad = (tx - 1.0).exp();
                let a = PI * ty;
                (rad * a.cos(), rad * a.sin())
            }
            Variation::Power => {
                let a = theta(tx, ty);
                let rad = r(tx, ty).powf(a.sin());
                (rad * a.cos(), rad * a.sin())
            }
            Variation::Cosine => {
                let a = PI * tx;
                (a.cos() * ty.cosh(), -a.sin() * ty.sinh())
            }
            Variation::Rings => {
                let dx = pre.c * pre.c + EPS;
                let rad = r(tx, ty);
                let z = (rad + dx) % (2.0 * dx) - dx + rad * (1.0 - dx);
                let a = theta(tx, ty);
                (z * a.cos(), z * a.sin())
            }
            Variation::Fan => {
                let dx = PI * (pre.c * pre.c + EPS);
                let dx2 = dx / 2.0;
                let a = theta(tx, ty);
                let a = if (a + pre.f) % dx > dx2 { a - dx2 } else { a + dx2 };
                let rad = r(tx, ty);
                (rad * a.cos(), rad * a.sin())
            }
        };
        st.vx += weight * vx;
        st.vy += weight * vy;
    }
}
