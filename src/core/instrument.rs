use crate::domain::data::{DataCollection, DataHandle};
use crate::domain::parameters::ParamValue;
use crate::domain::ports::Calculator;
use crate::domain::units::Unit;
use crate::utils::error::{Result, SimError};
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of one calculator run.
#[derive(Debug, Clone)]
pub struct CalculatorResult {
    pub calculator_name: String,
    pub output: DataCollection,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

/// State handed to each calculator: everything produced earlier in the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub execution_id: String,
    pub previous_results: Vec<CalculatorResult>,
    pub shared_data: HashMap<String, serde_json::Value>,
}

impl RunContext {
    pub fn new(execution_id: String) -> Self {
        Self {
            execution_id,
            previous_results: Vec::new(),
            shared_data: HashMap::new(),
        }
    }

    pub fn get_previous_result(&self) -> Option<&CalculatorResult> {
        self.previous_results.last()
    }

    pub fn get_result_by_name(&self, name: &str) -> Option<&CalculatorResult> {
        self.previous_results
            .iter()
            .find(|r| r.calculator_name == name)
    }

    /// Most recent output registered under `key`.
    pub fn find_output(&self, key: &str) -> Option<&DataHandle> {
        self.previous_results
            .iter()
            .rev()
            .find_map(|r| r.output.get(key))
    }

    pub fn add_shared_data(&mut self, key: String, value: serde_json::Value) {
        self.shared_data.insert(key, value);
    }

    pub fn get_shared_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.shared_data.get(key)
    }

    pub fn add_result(&mut self, result: CalculatorResult) {
        self.previous_results.push(result);
    }
}

/// Instrument-level parameter pushed into linked calculator parameters.
#[derive(Debug, Clone, Serialize)]
pub struct MasterParameter {
    pub name: String,
    pub unit: Unit,
    pub value: Option<ParamValue>,
    /// calculator name -> parameter name
    pub links: BTreeMap<String, String>,
}

/// Ordered set of calculators sharing one base directory.
pub struct Instrument {
    name: String,
    base_dir: PathBuf,
    calculators: Vec<Box<dyn Calculator>>,
    master_parameters: Vec<MasterParameter>,
    monitor: Option<SystemMonitor>,
}

impl Instrument {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_dir: PathBuf::from("./"),
            calculators: Vec::new(),
            master_parameters: Vec::new(),
            monitor: None,
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| SystemMonitor::new(true));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn add_calculator(&mut self, mut calculator: Box<dyn Calculator>) -> Result<()> {
        if self.calculator(calculator.name()).is_some() {
            return Err(SimError::InvalidConfigValueError {
                field: "calculators".to_string(),
                value: calculator.name().to_string(),
                reason: "Duplicate calculator name".to_string(),
            });
        }
        calculator.base_mut().instrument_base_dir = self.base_dir.clone();
        tracing::debug!("Added calculator '{}' to '{}'", calculator.name(), self.name);
        self.calculators.push(calculator);
        Ok(())
    }

    pub fn set_instrument_base_dir(&mut self, dir: impl AsRef<Path>) {
        self.base_dir = dir.as_ref().to_path_buf();
        for calculator in &mut self.calculators {
            calculator.base_mut().instrument_base_dir = self.base_dir.clone();
        }
    }

    pub fn calculator(&self, name: &str) -> Option<&dyn Calculator> {
        self.calculators
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn calculator_mut(&mut self, name: &str) -> Option<&mut Box<dyn Calculator>> {
        self.calculators.iter_mut().find(|c| c.name() == name)
    }

    pub fn calculator_names(&self) -> Vec<&str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }

    pub fn master_parameters(&self) -> &[MasterParameter] {
        &self.master_parameters
    }

    /// Links `name` to `(calculator, parameter)` pairs. Every link must point
    /// at an existing parameter whose unit shares the master's dimension.
    pub fn add_master_parameter(
        &mut self,
        name: &str,
        unit: Unit,
        links: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        if self.master_parameters.iter().any(|m| m.name == name) {
            return Err(SimError::invalid_parameter(name, "master parameter already defined"));
        }
        let links: BTreeMap<String, String> = links.into_iter().collect();
        for (calculator_name, parameter_name) in &links {
            let calculator = self.calculator(calculator_name).ok_or_else(|| {
                SimError::invalid_parameter(name, format!("unknown calculator '{}'", calculator_name))
            })?;
            let parameter = calculator.parameters().get(parameter_name)?;
            if parameter.unit.dimension() != unit.dimension() {
                return Err(SimError::UnitMismatch {
                    from: unit.to_string(),
                    to: parameter.unit.to_string(),
                });
            }
        }
        self.master_parameters.push(MasterParameter {
            name: name.to_string(),
            unit,
            value: None,
            links,
        });
        Ok(())
    }

    pub fn set_master_value(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let index = self
            .master_parameters
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| SimError::invalid_parameter(name, "no such master parameter"))?;
        let unit = self.master_parameters[index].unit;
        let links = self.master_parameters[index].links.clone();

        // Every link is checked on a copy before any calculator changes.
        let mut staged = Vec::with_capacity(links.len());
        for (calculator_name, parameter_name) in &links {
            let calculator = self.calculator(calculator_name).ok_or_else(|| {
                SimError::invalid_parameter(name, format!("unknown calculator '{}'", calculator_name))
            })?;
            let mut parameter = calculator.parameters().get(parameter_name)?.clone();
            parameter.set_value_with_unit(value.clone(), unit)?;
            staged.push((calculator_name, parameter));
        }

        for (calculator_name, parameter) in staged {
            if let Some(calculator) = self.calculator_mut(calculator_name) {
                let parameter_name = parameter.name.clone();
                *calculator.parameters_mut().get_mut(&parameter_name)? = parameter;
            }
            tracing::debug!(
                "Master '{}' -> {} = {} {}",
                name,
                calculator_name,
                value,
                unit.symbol()
            );
        }
        self.master_parameters[index].value = Some(value);
        Ok(())
    }

    /// Parameters of every calculator, keyed by calculator name.
    pub fn export_parameters(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for calculator in &self.calculators {
            map.insert(
                calculator.name().to_string(),
                serde_json::to_value(calculator.parameters())?,
            );
        }
        if !self.master_parameters.is_empty() {
            map.insert(
                "_master".to_string(),
                serde_json::to_value(&self.master_parameters)?,
            );
        }
        Ok(serde_json::Value::Object(map))
    }

    pub async fn run(&mut self) -> Result<Vec<CalculatorResult>> {
        let execution_id = format!("{}-{}", self.name, Utc::now().format("%Y%m%dT%H%M%S"));
        let mut context = RunContext::new(execution_id);
        let mut results = Vec::new();

        tracing::info!(
            "🚀 Running instrument '{}' ({} calculators) in {}",
            self.name,
            self.calculators.len(),
            self.base_dir.display()
        );
        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Instrument run started.");
        }

        for calculator in self.calculators.iter_mut() {
            if !calculator.should_run(&context) {
                tracing::info!("⏭️ Skipping calculator: {} (condition not met)", calculator.name());
                continue;
            }

            let start_time = Instant::now();
            match calculator.backengine(&context).await {
                Ok(output) => {
                    let result = CalculatorResult {
                        calculator_name: calculator.name().to_string(),
                        output,
                        duration: start_time.elapsed(),
                        finished_at: Utc::now(),
                    };
                    tracing::info!(
                        "✅ Calculator executed: {} (outputs: {}, duration: {:?})",
                        result.calculator_name,
                        result.output.len(),
                        result.duration
                    );
                    context.add_result(result.clone());
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("❌ Calculator '{}' failed: {}", calculator.name(), e);
                    return Err(SimError::CalculatorError {
                        stage: calculator.name().to_string(),
                        details: e.to_string(),
                    });
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Instrument run completed.");
            monitor.log_final_stats();
        }

        Ok(results)
    }

    pub fn execution_summary(results: &[CalculatorResult]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_outputs: usize = results.iter().map(|r| r.output.len()).sum();
        let total_duration: Duration = results.iter().map(|r| r.duration).sum();

        summary.insert(
            "total_calculators".to_string(),
            serde_json::Value::Number(results.len().into()),
        );
        summary.insert(
            "total_outputs".to_string(),
            serde_json::Value::Number(total_outputs.into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let names: Vec<serde_json::Value> = results
            .iter()
            .map(|r| serde_json::Value::String(r.calculator_name.clone()))
            .collect();
        summary.insert(
            "executed_calculators".to_string(),
            serde_json::Value::Array(names),
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::CalculatorBase;
    use crate::domain::data::FormatKind;
    use crate::domain::parameters::CalculatorParameters;
    use async_trait::async_trait;

    struct MockCalculator {
        base: CalculatorBase,
        should_run: bool,
        fail: bool,
        requires: Option<String>,
    }

    impl MockCalculator {
        fn new(name: &str) -> Self {
            let mut parameters = CalculatorParameters::new();
            parameters
                .new_parameter("photon_energy", Unit::ElectronVolt, "")
                .unwrap()
                .set_value(ParamValue::Float(10e3))
                .unwrap();
            parameters
                .new_parameter("sigma", Unit::Meter, "")
                .unwrap()
                .set_value(ParamValue::Float(50e-6))
                .unwrap();
            Self {
                base: CalculatorBase::new(name, parameters, &format!("{}_out", name), "out.zip", name),
                should_run: true,
                fail: false,
                requires: None,
            }
        }

        fn with_run_condition(mut self, should_run: bool) -> Self {
            self.should_run = should_run;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn requiring(mut self, key: &str) -> Self {
            self.requires = Some(key.to_string());
            self
        }
    }

    #[async_trait]
    impl Calculator for MockCalculator {
        fn base(&self) -> &CalculatorBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut CalculatorBase {
            &mut self.base
        }

        async fn backengine(&mut self, context: &RunContext) -> Result<DataCollection> {
            if self.fail {
                return Err(SimError::config("mock failure"));
            }
            if let Some(key) = &self.requires {
                if context.find_output(key).is_none() {
                    return Err(SimError::MissingConfigError { field: key.clone() });
                }
            }
            let (key, path) = self.base.primary_output()?;
            let mut collection = DataCollection::new();
            collection.add(DataHandle::new(&key, path, FormatKind::WavefrontArchive));
            Ok(collection)
        }

        fn should_run(&self, _context: &RunContext) -> bool {
            self.should_run
        }
    }

    #[tokio::test]
    async fn test_run_in_order_with_context() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("source"))).unwrap();
        instrument
            .add_calculator(Box::new(MockCalculator::new("diffraction").requiring("source_out")))
            .unwrap();
        instrument.set_instrument_base_dir("/tmp/run");

        let results = instrument.run().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].calculator_name, "source");
        assert_eq!(results[1].calculator_name, "diffraction");
        assert_eq!(
            results[0].output.get("source_out").unwrap().path,
            PathBuf::from("/tmp/run/source/out.zip")
        );
    }

    #[tokio::test]
    async fn test_skipped_calculator_not_reported() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        instrument
            .add_calculator(Box::new(MockCalculator::new("b").with_run_condition(false)))
            .unwrap();
        instrument.add_calculator(Box::new(MockCalculator::new("c"))).unwrap();

        let results = instrument.run().await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.calculator_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_failure_aborts_with_stage() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a").failing())).unwrap();
        instrument.add_calculator(Box::new(MockCalculator::new("b"))).unwrap();

        let err = instrument.run().await.unwrap_err();
        match err {
            SimError::CalculatorError { stage, details } => {
                assert_eq!(stage, "a");
                assert!(details.contains("mock failure"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_upstream_output_fails() {
        let mut instrument = Instrument::new("spb");
        instrument
            .add_calculator(Box::new(MockCalculator::new("diffraction").requiring("source_out")))
            .unwrap();
        assert!(instrument.run().await.is_err());
    }

    #[test]
    fn test_duplicate_calculator_rejected() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        assert!(instrument.add_calculator(Box::new(MockCalculator::new("a"))).is_err());
        assert_eq!(instrument.calculator_names(), vec!["a"]);
    }

    #[test]
    fn test_base_dir_propagates() {
        let mut instrument = Instrument::new("spb");
        instrument.set_instrument_base_dir("/first");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        assert_eq!(
            instrument.calculator("a").unwrap().base().instrument_base_dir,
            PathBuf::from("/first")
        );

        instrument.set_instrument_base_dir("/second");
        assert_eq!(
            instrument.calculator("a").unwrap().base().instrument_base_dir,
            PathBuf::from("/second")
        );
    }

    #[test]
    fn test_master_parameter_updates_linked_calculators() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        instrument.add_calculator(Box::new(MockCalculator::new("b"))).unwrap();
        instrument
            .add_master_parameter(
                "photon_energy",
                Unit::KiloElectronVolt,
                [
                    ("a".to_string(), "photon_energy".to_string()),
                    ("b".to_string(), "photon_energy".to_string()),
                ],
            )
            .unwrap();

        instrument
            .set_master_value("photon_energy", ParamValue::Float(4.96))
            .unwrap();

        for name in ["a", "b"] {
            let energy = instrument
                .calculator(name)
                .unwrap()
                .parameters()
                .get("photon_energy")
                .unwrap()
                .as_f64()
                .unwrap();
            assert!((energy - 4960.0).abs() < 1e-9);
        }
        assert_eq!(
            instrument.master_parameters()[0].value,
            Some(ParamValue::Float(4.96))
        );
    }

    #[test]
    fn test_master_parameter_link_validation() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();

        let unknown_calc = instrument.add_master_parameter(
            "energy",
            Unit::ElectronVolt,
            [("nope".to_string(), "photon_energy".to_string())],
        );
        assert!(unknown_calc.is_err());

        let wrong_dimension = instrument.add_master_parameter(
            "energy",
            Unit::Meter,
            [("a".to_string(), "photon_energy".to_string())],
        );
        assert!(matches!(wrong_dimension, Err(SimError::UnitMismatch { .. })));

        assert!(instrument.set_master_value("energy", ParamValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_rejected_master_value_leaves_links_untouched() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        instrument.add_calculator(Box::new(MockCalculator::new("b"))).unwrap();
        instrument
            .calculator_mut("b")
            .unwrap()
            .parameters_mut()
            .get_mut("sigma")
            .unwrap()
            .add_legal_interval(1e-9, 1.0);
        instrument
            .add_master_parameter(
                "width",
                Unit::Meter,
                [
                    ("a".to_string(), "sigma".to_string()),
                    ("b".to_string(), "sigma".to_string()),
                ],
            )
            .unwrap();

        let err = instrument
            .set_master_value("width", ParamValue::Float(2.0))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));

        for name in ["a", "b"] {
            let sigma = instrument
                .calculator(name)
                .unwrap()
                .parameters()
                .get("sigma")
                .unwrap()
                .as_f64()
                .unwrap();
            assert_eq!(sigma, 50e-6);
        }
        assert_eq!(instrument.master_parameters()[0].value, None);

        instrument
            .set_master_value("width", ParamValue::Float(0.5))
            .unwrap();
        assert_eq!(
            instrument.calculator("a").unwrap().parameters().get("sigma").unwrap().as_f64().unwrap(),
            0.5
        );
    }

    #[test]
    fn test_execution_summary() {
        let mut output = DataCollection::new();
        output.add(DataHandle::new("wf", "wf.zip", FormatKind::WavefrontArchive));
        let results = vec![
            CalculatorResult {
                calculator_name: "source".to_string(),
                output: output.clone(),
                duration: Duration::from_millis(100),
                finished_at: Utc::now(),
            },
            CalculatorResult {
                calculator_name: "export".to_string(),
                output,
                duration: Duration::from_millis(200),
                finished_at: Utc::now(),
            },
        ];

        let summary = Instrument::execution_summary(&results);
        assert_eq!(summary["total_calculators"], serde_json::json!(2));
        assert_eq!(summary["total_outputs"], serde_json::json!(2));
        assert_eq!(summary["total_duration_ms"], serde_json::json!(300));
        assert_eq!(
            summary["executed_calculators"],
            serde_json::json!(["source", "export"])
        );
    }

    #[test]
    fn test_context_lookup() {
        let mut context = RunContext::new("exec".to_string());
        let mut first = DataCollection::new();
        first.add(DataHandle::new("wf", "old.zip", FormatKind::WavefrontArchive));
        let mut second = DataCollection::new();
        second.add(DataHandle::new("wf", "new.zip", FormatKind::WavefrontArchive));

        for (name, output) in [("one", first), ("two", second)] {
            context.add_result(CalculatorResult {
                calculator_name: name.to_string(),
                output,
                duration: Duration::ZERO,
                finished_at: Utc::now(),
            });
        }
        context.add_shared_data("seed".to_string(), serde_json::json!(7));

        assert_eq!(context.get_previous_result().unwrap().calculator_name, "two");
        assert!(context.get_result_by_name("one").is_some());
        assert_eq!(context.find_output("wf").unwrap().path, PathBuf::from("new.zip"));
        assert_eq!(context.get_shared_data("seed"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn test_export_parameters() {
        let mut instrument = Instrument::new("spb");
        instrument.add_calculator(Box::new(MockCalculator::new("a"))).unwrap();
        let exported = instrument.export_parameters().unwrap();
        assert!(exported.get("a").is_some());
        assert!(exported.get("_master").is_none());
    }
}
