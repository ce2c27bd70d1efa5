use serde::{Deserialize, Serialize};

pub(crate) const PRECISION_MIN: u8 = 1;
pub(crate) const PRECISION_MAX: u8 = 10;
pub(crate) const PRECISION_DEFAULT: u8 = 4;

/// One saved quick note. Field names match the persisted JSON payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Note {
    pub(crate) id: u64,
    pub(crate) text: String,
    pub(crate) date: String,
}

impl Note {
    pub(crate) fn new(id: u64, text: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            date: date.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CurveMode {
    Mixed,
    Smooth,
    Polygon,
}

impl CurveMode {
    pub(crate) const ALL: [CurveMode; 3] = [CurveMode::Mixed, CurveMode::Smooth, CurveMode::Polygon];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CurveMode::Mixed => "mixed",
            CurveMode::Smooth => "smooth",
            CurveMode::Polygon => "polygon",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            CurveMode::Mixed => "Mixed",
            CurveMode::Smooth => "Curves",
            CurveMode::Polygon => "Straight",
        }
    }
}

/// Layering strategy sent to the engine. Only one value is recognized today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Stacking {
    #[default]
    Cutout,
}

impl Stacking {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Stacking::Cutout => "cutout",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ConversionParams {
    pub(crate) precision: u8,
    pub(crate) curve_mode: CurveMode,
    pub(crate) stacking: Stacking,
    pub(crate) group_by_color: bool,
    pub(crate) fill_gaps: bool,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            precision: PRECISION_DEFAULT,
            curve_mode: CurveMode::Mixed,
            stacking: Stacking::Cutout,
            group_by_color: true,
            fill_gaps: false,
        }
    }
}

impl ConversionParams {
    pub(crate) fn clamp_precision(raw: i32) -> u8 {
        raw.clamp(PRECISION_MIN as i32, PRECISION_MAX as i32) as u8
    }

    /// Multipart fields in wire order, string-encoded. The `image` field is
    /// appended separately by the engine client.
    pub(crate) fn form_fields(&self) -> [(&'static str, String); 5] {
        [
            ("precision", self.precision.to_string()),
            ("stacking", self.stacking.as_str().to_string()),
            ("curveMode", self.curve_mode.as_str().to_string()),
            ("groupByColor", self.group_by_color.to_string()),
            ("fillGaps", self.fill_gaps.to_string()),
        ]
    }
}
