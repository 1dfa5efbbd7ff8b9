use crate::utils::error::{Result, SimError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    None,
    Length,
    Time,
    PhotonEnergy,
    Energy,
    Angle,
}

/// Physical units accepted by calculator parameters.
///
/// Photon energy (eV) and pulse energy (joule) are kept as separate
/// dimensions so a pulse energy can never be silently read as a photon energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Dimensionless,
    Meter,
    Millimeter,
    Micrometer,
    Nanometer,
    Second,
    Picosecond,
    Femtosecond,
    ElectronVolt,
    KiloElectronVolt,
    Joule,
    Millijoule,
    Microjoule,
    Radian,
    Microradian,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Dimensionless => Dimension::None,
            Unit::Meter | Unit::Millimeter | Unit::Micrometer | Unit::Nanometer => Dimension::Length,
            Unit::Second | Unit::Picosecond | Unit::Femtosecond => Dimension::Time,
            Unit::ElectronVolt | Unit::KiloElectronVolt => Dimension::PhotonEnergy,
            Unit::Joule | Unit::Millijoule | Unit::Microjoule => Dimension::Energy,
            Unit::Radian | Unit::Microradian => Dimension::Angle,
        }
    }

    /// Factor to the canonical unit of the dimension (m, s, eV, J, rad).
    fn factor(self) -> f64 {
        match self {
            Unit::Dimensionless => 1.0,
            Unit::Meter => 1.0,
            Unit::Millimeter => 1e-3,
            Unit::Micrometer => 1e-6,
            Unit::Nanometer => 1e-9,
            Unit::Second => 1.0,
            Unit::Picosecond => 1e-12,
            Unit::Femtosecond => 1e-15,
            Unit::ElectronVolt => 1.0,
            Unit::KiloElectronVolt => 1e3,
            Unit::Joule => 1.0,
            Unit::Millijoule => 1e-3,
            Unit::Microjoule => 1e-6,
            Unit::Radian => 1.0,
            Unit::Microradian => 1e-6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Dimensionless => "",
            Unit::Meter => "m",
            Unit::Millimeter => "mm",
            Unit::Micrometer => "um",
            Unit::Nanometer => "nm",
            Unit::Second => "s",
            Unit::Picosecond => "ps",
            Unit::Femtosecond => "fs",
            Unit::ElectronVolt => "eV",
            Unit::KiloElectronVolt => "keV",
            Unit::Joule => "J",
            Unit::Millijoule => "mJ",
            Unit::Microjoule => "uJ",
            Unit::Radian => "rad",
            Unit::Microradian => "urad",
        }
    }

    pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64> {
        if from == to {
            return Ok(value);
        }
        if from.dimension() != to.dimension() {
            return Err(SimError::UnitMismatch {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(value * from.factor() / to.factor())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Dimensionless => f.write_str("dimensionless"),
            other => f.write_str(other.symbol()),
        }
    }
}

impl FromStr for Unit {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim() {
            "" | "dimensionless" => Unit::Dimensionless,
            "m" | "meter" => Unit::Meter,
            "mm" | "millimeter" => Unit::Millimeter,
            "um" | "micrometer" => Unit::Micrometer,
            "nm" | "nanometer" => Unit::Nanometer,
            "s" | "second" => Unit::Second,
            "ps" | "picosecond" => Unit::Picosecond,
            "fs" | "femtosecond" => Unit::Femtosecond,
            "eV" | "electronvolt" => Unit::ElectronVolt,
            "keV" | "kiloelectronvolt" => Unit::KiloElectronVolt,
            "J" | "joule" => Unit::Joule,
            "mJ" | "millijoule" => Unit::Millijoule,
            "uJ" | "microjoule" => Unit::Microjoule,
            "rad" | "radian" => Unit::Radian,
            "urad" | "microradian" => Unit::Microradian,
            other => {
                return Err(SimError::InvalidConfigValueError {
                    field: "unit".to_string(),
                    value: other.to_string(),
                    reason: "Unknown unit symbol".to_string(),
                })
            }
        };
        Ok(unit)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        symbol.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
    }

    #[test]
    fn test_convert_within_dimension() {
        assert!(close(Unit::convert(15.0, Unit::Femtosecond, Unit::Second).unwrap(), 15e-15));
        assert!(close(Unit::convert(9.0, Unit::KiloElectronVolt, Unit::ElectronVolt).unwrap(), 9000.0));
        assert!(close(Unit::convert(50.0, Unit::Micrometer, Unit::Millimeter).unwrap(), 0.05));
        assert!(close(Unit::convert(1e-4, Unit::Joule, Unit::Microjoule).unwrap(), 100.0));
    }

    #[test]
    fn test_convert_across_dimensions_fails() {
        let err = Unit::convert(1.0, Unit::ElectronVolt, Unit::Joule).unwrap_err();
        assert!(matches!(err, SimError::UnitMismatch { .. }));
        assert!(Unit::convert(1.0, Unit::Meter, Unit::Second).is_err());
    }

    #[test]
    fn test_parse_and_serialize_symbols() {
        assert_eq!("meter".parse::<Unit>().unwrap(), Unit::Meter);
        assert_eq!("keV".parse::<Unit>().unwrap(), Unit::KiloElectronVolt);
        assert_eq!("".parse::<Unit>().unwrap(), Unit::Dimensionless);
        assert!("furlong".parse::<Unit>().is_err());

        let json = serde_json::to_string(&Unit::Femtosecond).unwrap();
        assert_eq!(json, "\"fs\"");
        let back: Unit = serde_json::from_str("\"joule\"").unwrap();
        assert_eq!(back, Unit::Joule);
    }
}
