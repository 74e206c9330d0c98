//! Named filter presets.
//!
//! A preset is a complete [`FilterParams`] set under a display name.
//! Applying one replaces the image's filter knobs and tags the result with
//! the preset id (see [`editing::apply_preset`](crate::editing::apply_preset)).

use crate::imaging::{FilterKnob, FilterParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub filters: FilterParams,
}

impl FilterPreset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, filters: FilterParams) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            filters,
        }
    }

    /// The filters to store on an image when this preset is applied.
    pub fn labelled_filters(&self) -> FilterParams {
        self.filters.clone().with_preset(self.id.clone())
    }
}

/// The presets every store starts with: `vintage` and `dramatic`.
pub fn stock_presets() -> Vec<FilterPreset> {
    use FilterKnob::*;
    let build = |values: &[(FilterKnob, i64)]| {
        values
            .iter()
            .fold(FilterParams::neutral(), |params, &(knob, value)| {
                params.with(knob, value)
            })
    };
    vec![
        FilterPreset::new(
            "vintage",
            "Vintage",
            build(&[
                (Brightness, 90),
                (Contrast, 110),
                (Saturation, 80),
                (Sepia, 50),
                (Vignette, 30),
                (Vintage, 100),
                (Noise, 20),
            ])
            .with_preset("vintage"),
        ),
        FilterPreset::new(
            "dramatic",
            "Dramatic",
            build(&[
                (Brightness, 90),
                (Contrast, 150),
                (Saturation, 120),
                (Vignette, 50),
                (Dramatic, 100),
                (Sharpen, 30),
                (Noise, 10),
            ])
            .with_preset("dramatic"),
        ),
    ]
}
