//! Land area units
//!
//! Lot sizes are always stored in square metres. Other units are only used
//! at the edges when reading input and printing output.

use std::fmt;
use std::str::FromStr;

/// Square metres per hectare
pub const SQM_PER_HECTARE: f64 = 10_000.0;
/// Square metres per acre
pub const SQM_PER_ACRE: f64 = 4_046.86;

/// A unit a lot size can be entered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaUnit {
    #[default]
    SquareMetres,
    Hectares,
    Acres,
}

impl AreaUnit {
    fn factor(self) -> f64 {
        match self {
            AreaUnit::SquareMetres => 1.0,
            AreaUnit::Hectares => SQM_PER_HECTARE,
            AreaUnit::Acres => SQM_PER_ACRE,
        }
    }

    /// Convert a value in this unit to square metres
    pub fn to_sqm(self, value: f64) -> f64 {
        value * self.factor()
    }

    /// Convert square metres to this unit
    pub fn from_sqm(self, sqm: f64) -> f64 {
        sqm / self.factor()
    }

    pub fn label(self) -> &'static str {
        match self {
            AreaUnit::SquareMetres => "m²",
            AreaUnit::Hectares => "ha",
            AreaUnit::Acres => "acres",
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AreaUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqm" | "m2" | "m²" | "square_metres" | "square_meters" => Ok(AreaUnit::SquareMetres),
            "ha" | "hectare" | "hectares" => Ok(AreaUnit::Hectares),
            "acre" | "acres" => Ok(AreaUnit::Acres),
            _ => Err(format!(
                "Invalid area unit '{}'. Valid options are: sqm, hectares, acres",
                s
            )),
        }
    }
}

/// Format an area in square metres for display in the given unit
pub fn format_area(sqm: f64, unit: AreaUnit) -> String {
    match unit {
        AreaUnit::SquareMetres => format!("{:.0} {}", sqm, unit),
        _ => format!("{:.4} {}", unit.from_sqm(sqm), unit),
    }
}
