use crate::domain::parameters::CalculatorParameters;
use crate::utils::error::{Result, SimError};
use std::path::PathBuf;

/// State shared by every calculator: identity, parameters and output layout.
///
/// Output files land in `instrument_base_dir/calculator_base_dir/filename`.
#[derive(Debug, Clone)]
pub struct CalculatorBase {
    pub name: String,
    pub parameters: CalculatorParameters,
    pub output_keys: Vec<String>,
    pub output_filenames: Vec<String>,
    pub instrument_base_dir: PathBuf,
    pub calculator_base_dir: PathBuf,
}

impl CalculatorBase {
    pub fn new(
        name: &str,
        parameters: CalculatorParameters,
        output_key: &str,
        output_filename: &str,
        calculator_base_dir: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            output_keys: vec![output_key.to_string()],
            output_filenames: vec![output_filename.to_string()],
            instrument_base_dir: PathBuf::from("./"),
            calculator_base_dir: PathBuf::from(calculator_base_dir),
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.instrument_base_dir.join(&self.calculator_base_dir)
    }

    pub fn output_file_paths(&self) -> Result<Vec<PathBuf>> {
        if self.output_keys.len() != self.output_filenames.len() {
            return Err(SimError::ConfigValidationError {
                field: format!("{}.output_filenames", self.name),
                message: format!(
                    "{} output keys but {} output filenames",
                    self.output_keys.len(),
                    self.output_filenames.len()
                ),
            });
        }
        let dir = self.base_dir();
        Ok(self.output_filenames.iter().map(|f| dir.join(f)).collect())
    }

    /// First output key and its file path.
    pub fn primary_output(&self) -> Result<(String, PathBuf)> {
        let paths = self.output_file_paths()?;
        match (self.output_keys.first(), paths.into_iter().next()) {
            (Some(key), Some(path)) => Ok((key.clone(), path)),
            _ => Err(SimError::MissingConfigError {
                field: format!("{}.output_keys", self.name),
            }),
        }
    }
}
