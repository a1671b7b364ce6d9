use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::variations::Variation;

const SIZE_DEFAULT: u32 = 512;
const SIZE_LIMIT: u32 = 100_000;
const DIM_DEFAULT: f64 = 1.0;
const DIM_LIMIT: f64 = 1e5;
const SAMPLES_PER_PIXEL_DEFAULT: u64 = 100;

/// Coefficients of the affine map `(x, y) -> (a*x + b*y + c, d*x + e*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineParams {
    /// The identity map `(x, y) -> (x, y)`.
    pub const IDENTITY: AffineParams = AffineParams {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// Coefficients in declaration order `a, b, c, d, e, f`.
    pub fn from_coefficients([a, b, c, d, e, f]: [f64; 6]) -> AffineParams {
        AffineParams { a, b, c, d, e, f }
    }

    #[inline(always)]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.b * y + self.c, self.d * x + self.e * y + self.f)
    }
}

/// One stage of the iterated system: a weighted choice in the chaos game,
/// applying `pre_affine`, then the summed variations, then `post_affine`.
///
/// Immutable once constructed; owned exclusively by its parent [`Flame`].
#[derive(Debug, Clone)]
pub struct Xform {
    /// Relative selection probability; non-negative. The renderer normalizes
    /// across all xforms of a flame without mutating the model.
    pub weight: f64,
    /// Non-empty, in declaration order. Order matters only for
    /// floating-point summation rounding.
    pub variations: Vec<(Variation, f64)>,
    pub pre_affine: AffineParams,
    pub post_affine: AffineParams,
}

/// The top-level description of one fractal system. Constructed once from
/// configuration, rendered once, then discarded.
#[derive(Debug, Clone)]
pub struct Flame {
    /// Identifier, used to name output artifacts.
    pub name: String,
    pub size_x: u32,
    pub size_y: u32,
    /// Iteration count for the main sample loop.
    pub samples: u64,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    /// Non-empty.
    pub xforms: Vec<Xform>,
}

/// Configuration errors. All are fatal for the whole run: rendering starts
/// only after every flame in the document has validated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed flame document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("flame {flame:?}: {axis} size {value} not in (0, {SIZE_LIMIT})")]
    SizeOutOfRange {
        flame: String,
        axis: &'static str,
        value: u32,
    },
    #[error("flame {flame:?}: samples must be positive")]
    NoSamples { flame: String },
    #[error("flame {flame:?}: {axis} viewport bounds [{min}, {max}) invalid (need {min} < {max}, both in (-{DIM_LIMIT}, {DIM_LIMIT}))")]
    BadViewport {
        flame: String,
        axis: &'static str,
        min: f64,
        max: f64,
    },
    #[error("flame {flame:?}: no xforms")]
    NoXforms { flame: String },
    #[error("flame {flame:?}, xform {index}: negative weight {weight}")]
    NegativeWeight {
        flame: String,
        index: usize,
        weight: f64,
    },
    #[error("flame {flame:?}: xform weights are all zero")]
    AllWeightsZero { flame: String },
    #[error("flame {flame:?}, xform {index}: no variations")]
    NoVariations { flame: String, index: usize },
    #[error("flame {flame:?}, xform {index}: unknown variation {name:?}")]
    UnknownVariation {
        flame: String,
        index: usize,
        name: String,
    },
}

// Wire form of the JSON document. Unknown keys are tolerated; missing
// optional keys fall back to the documented defaults.
#[derive(Debug, Deserialize)]
struct FlameDoc {
    name: String,
    size_x: Option<u32>,
    size_y: Option<u32>,
    samples: Option<u64>,
    xmin: Option<f64>,
    xmax: Option<f64>,
    ymin: Option<f64>,
    ymax: Option<f64>,
    xforms: Vec<XformDoc>,
}

#[derive(Debug, Deserialize)]
struct XformDoc {
    weight: Option<f64>,
    variations: Vec<VariationDoc>,
    pre_affine: [f64; 6],
    post_affine: [f64; 6],
}

#[derive(Debug, Deserialize)]
struct VariationDoc {
    name: String,
    weight: Option<f64>,
}

/// Parses and validates a JSON document describing a list of flames.
pub fn parse_flames(json: &str) -> Result<Vec<Flame>, ConfigError> {
    let docs: Vec<FlameDoc> = serde_json::from_str(json)?;
    let flames = docs
        .into_iter()
        .map(Flame::from_doc)
        .collect::<Result<Vec<Flame>, ConfigError>>()?;
    debug!(count = flames.len(), "parsed flame document");
    Ok(flames)
}

impl Flame {
    fn from_doc(doc: FlameDoc) -> Result<Flame, ConfigError> {
        let name = doc.name;
        debug!(flame = %name, xforms = doc.xforms.len(), "validating flame");

        let size_x = doc.size_x.unwrap_or(SIZE_DEFAULT);
        let size_y = doc.size_y.unwrap_or(SIZE_DEFAULT);
        for (axis, value) in [("x", size_x), ("y", size_y)] {
            if value == 0 || value >= SIZE_LIMIT {
                return Err(ConfigError::SizeOutOfRange {
                    flame: name,
                    axis,
                    value,
                });
            }
        }
        let samples = doc
            .samples
            .unwrap_or(u64::from(size_x) * u64::from(size_y) * SAMPLES_PER_PIXEL_DEFAULT);
        if samples == 0 {
            return Err(ConfigError::NoSamples { flame: name });
        }

        let xmin = doc.xmin.unwrap_or(-DIM_DEFAULT);
        let xmax = doc.xmax.unwrap_or(DIM_DEFAULT);
        let ymin = doc.ymin.unwrap_or(-DIM_DEFAULT);
        let ymax = doc.ymax.unwrap_or(DIM_DEFAULT);
        for (axis, min, max) in [("x", xmin, xmax), ("y", ymin, ymax)] {
            let in_bounds = |v: f64| v > -DIM_LIMIT && v < DIM_LIMIT;
            if !(in_bounds(min) && in_bounds(max) && min < max) {
                return Err(ConfigError::BadViewport {
                    flame: name,
                    axis,
                    min,
                    max,
                });
            }
        }

        if doc.xforms.is_empty() {
            return Err(ConfigError::NoXforms { flame: name });
        }
        let mut xforms = Vec::with_capacity(doc.xforms.len());
        for (index, xf) in doc.xforms.into_iter().enumerate() {
            xforms.push(Xform::from_doc(xf, &name, index)?);
        }
        if xforms.iter().all(|xf| xf.weight == 0.0) {
            return Err(ConfigError::AllWeightsZero { flame: name });
        }

        Ok(Flame {
            name,
            size_x,
            size_y,
            samples,
            xmin,
            xmax,
            ymin,
            ymax,
            xforms,
        })
    }
}

impl Xform {
    fn from_doc(doc: XformDoc, flame: &str, index: usize) -> Result<Xform, ConfigError> {
        let weight = doc.weight.unwrap_or(1.0);
        if !(weight >= 0.0) {
            return Err(ConfigError::NegativeWeight {
                flame: flame.to_owned(),
                index,
                weight,
            });
        }
        if doc.variations.is_empty() {
            return Err(ConfigError::NoVariations {
                flame: flame.to_owned(),
                index,
            });
        }
        // Resolve names against the catalog once, here; the render loop
        // dispatches through the resolved handle only.
        let mut variations = Vec::with_capacity(doc.variations.len());
        for var in doc.variations {
            let Some(resolved) = Variation::from_name(&var.name) else {
                return Err(ConfigError::UnknownVariation {
                    flame: flame.to_owned(),
                    index,
                    name: var.name,
                });
            };
            variations.push((resolved, var.weight.unwrap_or(1.0)));
        }
        Ok(Xform {
            weight,
            variations,
            pre_affine: AffineParams::from_coefficients(doc.pre_affine),
            post_affine: AffineParams::from_coefficients(doc.post_affine),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY6: &str = "[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]";

    fn doc_with(flame_body: &str) -> String {
        format!("[{{{}}}]", flame_body)
    }

    fn minimal_xforms() -> String {
        format!(
            r#""xforms": [{{"variations": [{{"name": "linear"}}],
                "pre_affine": {IDENTITY6}, "post_affine": {IDENTITY6}}}]"#
        )
    }

    #[test]
    fn test_affine_apply() {
        let af = AffineParams::from_coefficients([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(af.apply(10.0, 100.0), (213.0, 546.0));
        assert_eq!(AffineParams::IDENTITY.apply(3.5, -7.25), (3.5, -7.25));
    }

    #[test]
    fn test_parse_defaults() {
        let json = doc_with(&format!(r#""name": "basic", {}"#, minimal_xforms()));
        let flames = parse_flames(&json).unwrap();
        assert_eq!(flames.len(), 1);
        let flame = &flames[0];
        assert_eq!(flame.name, "basic");
        assert_eq!((flame.size_x, flame.size_y), (512, 512));
        assert_eq!(flame.samples, 512 * 512 * 100);
        assert_eq!(
            (flame.xmin, flame.xmax, flame.ymin, flame.ymax),
            (-1.0, 1.0, -1.0, 1.0)
        );
        assert_eq!(flame.xforms.len(), 1);
        let xform = &flame.xforms[0];
        assert_eq!(xform.weight, 1.0);
        assert_eq!(xform.variations, vec![(Variation::Linear, 1.0)]);
        assert_eq!(xform.pre_affine, AffineParams::IDENTITY);
    }

    #[test]
    fn test_parse_explicit_fields() {
        let json = doc_with(&format!(
            r#""name": "full", "size_x": 32, "size_y": 16, "samples": 9000,
               "xmin": -2.5, "xmax": 2.5, "ymin": -1.5, "ymax": 1.5,
               "xforms": [{{"weight": 0.25,
                 "variations": [{{"name": "swirl", "weight": 0.5}},
                                {{"name": "spherical"}}],
                 "pre_affine": [0.5, 0.0, -0.5, 0.0, 0.5, 0.5],
                 "post_affine": {IDENTITY6}}}]"#
        ));
        let flame = parse_flames(&json).unwrap().remove(0);
        assert_eq!((flame.size_x, flame.size_y), (32, 16));
        assert_eq!(flame.samples, 9000);
        assert_eq!((flame.xmin, flame.xmax), (-2.5, 2.5));
        let xform = &flame.xforms[0];
        assert_eq!(xform.weight, 0.25);
        assert_eq!(
            xform.variations,
            vec![(Variation::Swirl, 0.5), (Variation::Spherical, 1.0)]
        );
        assert_eq!(xform.pre_affine.c, -0.5);
    }

    #[test]
    fn test_unknown_variation_is_fatal() {
        let json = doc_with(&format!(
            r#""name": "bad", "xforms": [{{"variations": [{{"name": "frobnicate"}}],
                "pre_affine": {IDENTITY6}, "post_affine": {IDENTITY6}}}]"#
        ));
        match parse_flames(&json) {
            Err(ConfigError::UnknownVariation { flame, index, name }) => {
                assert_eq!(flame, "bad");
                assert_eq!(index, 0);
                assert_eq!(name, "frobnicate");
            }
            other => panic!("expected UnknownVariation, got {:?}", other),
        }
    }

    #[test]
    fn test_size_bounds() {
        for (key, value) in [("size_x", 0), ("size_y", 100_000)] {
            let json = doc_with(&format!(
                r#""name": "sized", "{key}": {value}, {}"#,
                minimal_xforms()
            ));
            assert!(matches!(
                parse_flames(&json),
                Err(ConfigError::SizeOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_viewport_must_be_ordered() {
        let json = doc_with(&format!(
            r#""name": "flipped", "xmin": 1.0, "xmax": -1.0, {}"#,
            minimal_xforms()
        ));
        assert!(matches!(
            parse_flames(&json),
            Err(ConfigError::BadViewport { axis: "x", .. })
        ));
    }

    #[test]
    fn test_empty_xforms_and_variations() {
        let json = doc_with(r#""name": "hollow", "xforms": []"#);
        assert!(matches!(parse_flames(&json), Err(ConfigError::NoXforms { .. })));

        let json = doc_with(&format!(
            r#""name": "hollow", "xforms": [{{"variations": [],
                "pre_affine": {IDENTITY6}, "post_affine": {IDENTITY6}}}]"#
        ));
        assert!(matches!(
            parse_flames(&json),
            Err(ConfigError::NoVariations { index: 0, .. })
        ));
    }

    #[test]
    fn test_weight_invariants() {
        let json = doc_with(&format!(
            r#""name": "w", "xforms": [{{"weight": -0.5,
                "variations": [{{"name": "linear"}}],
                "pre_affine": {IDENTITY6}, "post_affine": {IDENTITY6}}}]"#
        ));
        assert!(matches!(
            parse_flames(&json),
            Err(ConfigError::NegativeWeight { .. })
        ));

        let json = doc_with(&format!(
            r#""name": "w", "xforms": [{{"weight": 0.0,
                "variations": [{{"name": "linear"}}],
                "pre_affine": {IDENTITY6}, "post_affine": {IDENTITY6}}}]"#
        ));
        assert!(matches!(
            parse_flames(&json),
            Err(ConfigError::AllWeightsZero { .. })
        ));
    }

    #[test]
    fn test_missing_required_key_is_fatal() {
        let json = doc_with(&minimal_xforms()); // no "name"
        assert!(matches!(parse_flames(&json), Err(ConfigError::Malformed(_))));

        let json = doc_with(
            r#""name": "n", "xforms": [{"variations": [{"name": "linear"}],
                "pre_affine": [1.0, 0.0, 0.0], "post_affine": [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]}]"#,
        );
        assert!(matches!(parse_flames(&json), Err(ConfigError::Malformed(_))));
    }
}
