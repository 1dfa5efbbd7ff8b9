use crate::app::registry;
use crate::core::instrument::Instrument;
use crate::domain::data::FormatKind;
use crate::domain::parameters::{ParamOverride, ParamValue};
use crate::domain::units::Unit;
use crate::utils::error::{Result, SimError};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_unique_names, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub instrument: InstrumentSection,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub calculators: Vec<CalculatorConfig>,
    #[serde(default)]
    pub master_parameters: Vec<MasterParameterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSection {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

fn default_base_dir() -> String {
    "./".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub name: String,
    pub kind: String,
    pub output_filename: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, ParamOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterParameterConfig {
    pub name: String,
    /// Defaults to the unit of the first linked parameter.
    pub unit: Option<Unit>,
    pub value: Option<ParamValue>,
    pub links: BTreeMap<String, String>,
}

impl InstrumentConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SimError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay literal.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| SimError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// Creates the calculators, applies parameter overrides and wires the
    /// master parameters.
    pub fn build_instrument(&self) -> Result<Instrument> {
        self.validate()?;

        let mut instrument = Instrument::new(&self.instrument.name)
            .with_monitoring(self.monitoring_enabled());
        instrument.set_instrument_base_dir(&self.instrument.base_dir);

        for calc in &self.calculators {
            let mut calculator = registry::create_calculator(&calc.kind, &calc.name)?;
            if let Some(filename) = &calc.output_filename {
                calculator.base_mut().output_filenames = vec![filename.clone()];
            }
            calculator
                .parameters_mut()
                .apply_overrides(&calc.parameters)
                .map_err(|e| SimError::ConfigValidationError {
                    field: format!("calculators.{}.parameters", calc.name),
                    message: e.to_string(),
                })?;
            instrument.add_calculator(calculator)?;
        }

        for master in &self.master_parameters {
            let unit = match master.unit {
                Some(unit) => unit,
                None => self.linked_unit(&instrument, master)?,
            };
            instrument.add_master_parameter(
                &master.name,
                unit,
                master.links.iter().map(|(c, p)| (c.clone(), p.clone())),
            )?;
            if let Some(value) = &master.value {
                instrument.set_master_value(&master.name, value.clone())?;
            }
        }

        tracing::info!(
            "🔧 Built instrument '{}' with calculators: {:?}",
            instrument.name(),
            instrument.calculator_names()
        );
        Ok(instrument)
    }

    fn linked_unit(&self, instrument: &Instrument, master: &MasterParameterConfig) -> Result<Unit> {
        let (calculator_name, parameter_name) =
            master
                .links
                .iter()
                .next()
                .ok_or_else(|| SimError::MissingConfigError {
                    field: format!("master_parameters.{}.links", master.name),
                })?;
        let calculator = instrument.calculator(calculator_name).ok_or_else(|| {
            SimError::invalid_parameter(&master.name, format!("unknown calculator '{}'", calculator_name))
        })?;
        Ok(calculator.parameters().get(parameter_name)?.unit)
    }
}

impl Validate for InstrumentConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("instrument.name", &self.instrument.name)?;
        validate_path("instrument.base_dir", &self.instrument.base_dir)?;

        for calc in &self.calculators {
            validate_non_empty_string("calculators.name", &calc.name)?;
            if !registry::is_known_kind(&calc.kind) {
                return Err(SimError::InvalidConfigValueError {
                    field: format!("calculators.{}.kind", calc.name),
                    value: calc.kind.clone(),
                    reason: format!("Known kinds: {}", registry::KNOWN_KINDS.join(", ")),
                });
            }
            if let Some(filename) = &calc.output_filename {
                validate_file_extensions(
                    &format!("calculators.{}.output_filename", calc.name),
                    std::slice::from_ref(filename),
                    &[FormatKind::WavefrontArchive.extension()],
                )?;
            }
        }
        validate_unique_names("calculators.name", self.calculators.iter().map(|c| c.name.as_str()))?;

        for master in &self.master_parameters {
            validate_non_empty_string("master_parameters.name", &master.name)?;
            validate_positive_number(
                &format!("master_parameters.{}.links", master.name),
                master.links.len(),
                1,
            )?;
        }
        validate_unique_names(
            "master_parameters.name",
            self.master_parameters.iter().map(|m| m.name.as_str()),
        )?;

        Ok(())
    }
}
