use crate::domain::units::Unit;
use crate::utils::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Range([f64; 2]),
    Text(String),
}

impl ParamValue {
    /// Numeric components, used for interval checks and unit conversion.
    fn numbers(&self) -> Vec<f64> {
        match self {
            ParamValue::Int(v) => vec![*v as f64],
            ParamValue::Float(v) => vec![*v],
            ParamValue::Range(r) => r.to_vec(),
            ParamValue::Bool(_) | ParamValue::Text(_) => Vec::new(),
        }
    }

    fn scaled(&self, factor: f64) -> ParamValue {
        match self {
            ParamValue::Int(v) if factor != 1.0 => ParamValue::Float(*v as f64 * factor),
            ParamValue::Float(v) => ParamValue::Float(v * factor),
            ParamValue::Range([a, b]) => ParamValue::Range([a * factor, b * factor]),
            other => other.clone(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{:e}", v),
            ParamValue::Range([a, b]) => write!(f, "[{:e}, {:e}]", a, b),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Option<ParamValue>,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal: Vec<Interval>,
}

impl Parameter {
    pub fn new(name: &str, unit: Unit, comment: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            unit,
            comment: comment.to_string(),
            legal: Vec::new(),
        }
    }

    pub fn add_legal_interval(&mut self, min: f64, max: f64) -> &mut Self {
        self.legal.push(Interval { min, max });
        self
    }

    pub fn is_legal(&self, value: &ParamValue) -> bool {
        if self.legal.is_empty() {
            return true;
        }
        value
            .numbers()
            .iter()
            .all(|v| self.legal.iter().any(|interval| interval.contains(*v)))
    }

    /// Sets the value in the parameter's own unit.
    pub fn set_value(&mut self, value: ParamValue) -> Result<&mut Self> {
        let value = match (&self.value, value) {
            (Some(ParamValue::Float(_)), ParamValue::Int(v)) => ParamValue::Float(v as f64),
            (_, v) => v,
        };
        if !self.is_legal(&value) {
            return Err(SimError::invalid_parameter(
                &self.name,
                format!("value {} is outside the legal intervals {:?}", value, self.legal),
            ));
        }
        self.value = Some(value);
        Ok(self)
    }

    /// Converts `value` from `unit` into the parameter's unit before setting it.
    pub fn set_value_with_unit(&mut self, value: ParamValue, unit: Unit) -> Result<&mut Self> {
        let factor = Unit::convert(1.0, unit, self.unit)?;
        self.set_value(value.scaled(factor))
    }

    pub fn value(&self) -> Result<&ParamValue> {
        self.value.as_ref().ok_or_else(|| SimError::MissingParameter {
            name: self.name.clone(),
        })
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self.value()? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(self.type_error("a number", other)),
        }
    }

    pub fn as_usize(&self) -> Result<usize> {
        match self.value()? {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(self.type_error("a non-negative integer", other)),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        self.as_usize().map(|v| v as u64)
    }

    pub fn as_range(&self) -> Result<[f64; 2]> {
        match self.value()? {
            ParamValue::Range(r) => Ok(*r),
            other => Err(self.type_error("a [start, end] pair", other)),
        }
    }

    pub fn value_in(&self, unit: Unit) -> Result<f64> {
        Unit::convert(self.as_f64()?, self.unit, unit)
    }

    pub fn range_in(&self, unit: Unit) -> Result<[f64; 2]> {
        let [a, b] = self.as_range()?;
        Ok([
            Unit::convert(a, self.unit, unit)?,
            Unit::convert(b, self.unit, unit)?,
        ])
    }

    fn type_error(&self, expected: &str, found: &ParamValue) -> SimError {
        SimError::invalid_parameter(&self.name, format!("expected {}, found {}", expected, found))
    }
}

/// Override read from a config file: either a bare value in the parameter's
/// unit or a value tagged with its own unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamOverride {
    WithUnit { value: ParamValue, unit: Unit },
    Plain(ParamValue),
}

/// Named parameters of one calculator, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorParameters {
    parameters: Vec<Parameter>,
}

impl CalculatorParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_parameter(&mut self, name: &str, unit: Unit, comment: &str) -> Result<&mut Parameter> {
        if self.contains(name) {
            return Err(SimError::invalid_parameter(name, "parameter already defined"));
        }
        self.parameters.push(Parameter::new(name, unit, comment));
        let last = self.parameters.len() - 1;
        Ok(&mut self.parameters[last])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SimError::invalid_parameter(name, "no such parameter"))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| SimError::invalid_parameter(name, "no such parameter"))
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn apply_overrides(&mut self, overrides: &HashMap<String, ParamOverride>) -> Result<()> {
        for (name, value) in overrides {
            let parameter = self.get_mut(name)?;
            match value {
                ParamOverride::WithUnit { value, unit } => {
                    parameter.set_value_with_unit(value.clone(), *unit)?;
                }
                ParamOverride::Plain(value) => {
                    parameter.set_value(value.clone())?;
                }
            }
            tracing::debug!("Parameter override: {} = {:?}", name, value);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for CalculatorParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.parameters.iter().map(|p| p.name.len()).max().unwrap_or(0);
        for p in &self.parameters {
            let value = p
                .value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<unset>".to_string());
            writeln!(
                f,
                "{:<width$}  {:<28} {:<6} {}",
                p.name,
                value,
                p.unit.symbol(),
                p.comment,
                width = width
            )?;
        }
        Ok(())
    }
}
