//! Filter pipeline: an ordered, immutable list of typed pixel operations.
//!
//! [`FilterParams::pipeline`] compiles the knobs of an image into a
//! `Vec<FilterOp>`. The order is fixed:
//!
//! ```text
//! brightness → contrast → saturation → sepia → blur → sharpen → noise → vignette
//!            → vintage → dramatic → vibrant
//! ```
//!
//! Only non-neutral knobs contribute an op, so neutral parameters compile to
//! an empty pipeline (identity). Preset ops are composites: the backend
//! expands them with [`FilterOp::expand`] into primitive ops scaled by the
//! preset's intensity. Several presets may be active at once; their
//! primitives accumulate in the order above.

use super::params::{FilterKnob, FilterParams, Transform};
use serde::{Deserialize, Serialize};

/// One pixel operation. Parameters are already converted from knob values
/// into the units the math in [`calculations`](super::calculations) uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum FilterOp {
    /// Offset in `-1.0..=1.0`, applied as `offset * 255`.
    Brightness(f32),
    /// Multiplier around mid-gray; `1.0` is identity.
    Contrast(f32),
    /// Multiplier around luma; `1.0` is identity.
    Saturation(f32),
    /// Blend amount towards sepia, `0.0..=1.0`.
    Sepia(f32),
    /// Gaussian sigma in pixels.
    Blur(f32),
    /// Unsharp-mask sigma in pixels.
    Sharpen(f32),
    /// Noise amplitude in channel units.
    Noise(f32),
    /// Vignette strength, `0.0..=1.0`.
    Vignette(f32),
    /// Per-channel additive tint.
    Tint([f32; 3]),
    /// Blue lift for dark pixels, in channel units.
    ShadowTint(f32),
    /// Dominant-channel boost, `0.0..=1.0`.
    Vibrance(f32),
    PresetVintage(f32),
    PresetDramatic(f32),
    PresetVibrant(f32),
}

impl FilterOp {
    /// Whether this op is a composite preset.
    pub fn is_preset(&self) -> bool {
        matches!(
            self,
            FilterOp::PresetVintage(_) | FilterOp::PresetDramatic(_) | FilterOp::PresetVibrant(_)
        )
    }

    /// Primitive ops this op stands for. Primitives expand to themselves.
    ///
    /// - vintage(i): sepia(i), contrast(1 + 0.2i), noise(20i), plus a warm
    ///   tint (+25i red, +12i green) above half intensity
    /// - dramatic(i): contrast(1 + i), blue shadow tint(50i)
    /// - vibrant(i): vibrance(i)
    pub fn expand(&self) -> Vec<FilterOp> {
        match *self {
            FilterOp::PresetVintage(i) => {
                let mut ops = vec![
                    FilterOp::Sepia(i),
                    FilterOp::Contrast(1.0 + 0.2 * i),
                    FilterOp::Noise(20.0 * i),
                ];
                if i > 0.5 {
                    ops.push(FilterOp::Tint([25.0 * i, 12.0 * i, 0.0]));
                }
                ops
            }
            FilterOp::PresetDramatic(i) => {
                vec![FilterOp::Contrast(1.0 + i), FilterOp::ShadowTint(50.0 * i)]
            }
            FilterOp::PresetVibrant(i) => vec![FilterOp::Vibrance(i)],
            primitive => vec![primitive],
        }
    }

    /// Short name used in logs and history parameters.
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Brightness(_) => "brightness",
            FilterOp::Contrast(_) => "contrast",
            FilterOp::Saturation(_) => "saturation",
            FilterOp::Sepia(_) => "sepia",
            FilterOp::Blur(_) => "blur",
            FilterOp::Sharpen(_) => "sharpen",
            FilterOp::Noise(_) => "noise",
            FilterOp::Vignette(_) => "vignette",
            FilterOp::Tint(_) => "tint",
            FilterOp::ShadowTint(_) => "shadowTint",
            FilterOp::Vibrance(_) => "vibrance",
            FilterOp::PresetVintage(_) => "vintage",
            FilterOp::PresetDramatic(_) => "dramatic",
            FilterOp::PresetVibrant(_) => "vibrant",
        }
    }
}

/// Anything a drawing surface can apply to a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurfaceOp {
    Filter(FilterOp),
    Transform(Transform),
}

impl From<FilterOp> for SurfaceOp {
    fn from(op: FilterOp) -> Self {
        SurfaceOp::Filter(op)
    }
}

impl From<Transform> for SurfaceOp {
    fn from(t: Transform) -> Self {
        SurfaceOp::Transform(t)
    }
}

impl FilterParams {
    /// Compile the knobs into the ordered pipeline (see module docs).
    pub fn pipeline(&self) -> Vec<FilterOp> {
        let pct = |knob: FilterKnob| f32::from(self.get(knob)) / 100.0;
        let mut ops = Vec::new();
        for (knob, value) in self.adjusted() {
            let op = match knob {
                FilterKnob::Brightness => FilterOp::Brightness((f32::from(value) - 100.0) / 100.0),
                FilterKnob::Contrast => FilterOp::Contrast(pct(knob)),
                FilterKnob::Saturation => FilterOp::Saturation(pct(knob)),
                FilterKnob::Sepia => FilterOp::Sepia(pct(knob)),
                FilterKnob::Blur => FilterOp::Blur(f32::from(value) / 10.0),
                FilterKnob::Sharpen => FilterOp::Sharpen(f32::from(value) / 25.0),
                FilterKnob::Noise => FilterOp::Noise(f32::from(value)),
                FilterKnob::Vignette => FilterOp::Vignette(pct(knob)),
                FilterKnob::Vintage => FilterOp::PresetVintage(pct(knob)),
                FilterKnob::Dramatic => FilterOp::PresetDramatic(pct(knob)),
                FilterKnob::Vibrant => FilterOp::PresetVibrant(pct(knob)),
            };
            ops.push(op);
        }
        ops
    }
}

/// Expand every composite op in `ops`, preserving order.
pub fn flatten(ops: &[FilterOp]) -> Vec<FilterOp> {
    ops.iter().flat_map(FilterOp::expand).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_params_compile_to_empty_pipeline() {
        assert!(FilterParams::neutral().pipeline().is_empty());
    }

    #[test]
    fn pipeline_follows_fixed_order_regardless_of_set_order() {
        let params = FilterParams::neutral()
            .with(FilterKnob::Vibrant, 10)
            .with(FilterKnob::Vignette, 30)
            .with(FilterKnob::Contrast, 150)
            .with(FilterKnob::Brightness, 150)
            .with(FilterKnob::Noise, 5)
            .with(FilterKnob::Blur, 20);
        let names: Vec<_> = params.pipeline().iter().map(FilterOp::name).collect();
        assert_eq!(
            names,
            vec!["brightness", "contrast", "blur", "noise", "vignette", "vibrant"]
        );
    }

    #[test]
    fn knob_values_convert_to_op_units() {
        let params = FilterParams::neutral()
            .with(FilterKnob::Brightness, 150)
            .with(FilterKnob::Contrast, 50)
            .with(FilterKnob::Saturation, 200)
            .with(FilterKnob::Blur, 25);
        assert_eq!(
            params.pipeline(),
            vec![
                FilterOp::Brightness(0.5),
                FilterOp::Contrast(0.5),
                FilterOp::Saturation(2.0),
                FilterOp::Blur(2.5),
            ]
        );
    }

    #[test]
    fn presets_come_last_in_declared_order() {
        let params = FilterParams::neutral()
            .with(FilterKnob::Vibrant, 100)
            .with(FilterKnob::Dramatic, 50)
            .with(FilterKnob::Vintage, 20)
            .with(FilterKnob::Sepia, 10);
        let ops = params.pipeline();
        assert_eq!(ops[0], FilterOp::Sepia(0.1));
        assert_eq!(
            &ops[1..],
            &[
                FilterOp::PresetVintage(0.2),
                FilterOp::PresetDramatic(0.5),
                FilterOp::PresetVibrant(1.0),
            ]
        );
    }

    #[test]
    fn vintage_expands_with_tint_only_above_half() {
        assert_eq!(FilterOp::PresetVintage(0.5).expand().len(), 3);
        let strong = FilterOp::PresetVintage(1.0).expand();
        assert_eq!(strong.len(), 4);
        assert_eq!(strong[0], FilterOp::Sepia(1.0));
        assert_eq!(strong[3], FilterOp::Tint([25.0, 12.0, 0.0]));
    }

    #[test]
    fn flatten_accumulates_all_presets() {
        let ops = [
            FilterOp::PresetVintage(0.4),
            FilterOp::PresetDramatic(0.4),
            FilterOp::PresetVibrant(0.4),
        ];
        let flat = flatten(&ops);
        assert_eq!(flat.len(), 3 + 2 + 1);
        assert!(flat.iter().all(|op| !op.is_preset()));
    }

    #[test]
    fn primitives_expand_to_themselves() {
        assert_eq!(FilterOp::Blur(1.0).expand(), vec![FilterOp::Blur(1.0)]);
    }
}
