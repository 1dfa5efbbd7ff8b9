use crate::adapters::LocalStorage;
use crate::app::sources::beam::{build_wavefront, Coherence, SourceSettings};
use crate::app::sources::beam_parameters;
use crate::core::calculator::CalculatorBase;
use crate::core::instrument::RunContext;
use crate::core::{Calculator, DataCollection, DataHandle, FormatKind, ParamValue, Storage};
use crate::domain::parameters::CalculatorParameters;
use crate::domain::units::Unit;
use crate::formats::wavefront_archive;
use crate::utils::error::{Result, SimError};

pub const DEFAULT_OUTPUT_KEY: &str = "Phenom_wavefront";
pub const DEFAULT_OUTPUT_FILENAME: &str = "wavefront.zip";
pub const DEFAULT_BASE_DIR: &str = "PhenomSourceCalculator";

/// X-ray free electron laser photon source under the phenomenological SASE model.
///
/// Output lands in `instrument_base_dir/calculator_base_dir/wavefront.zip`.
pub struct PhenomSourceCalculator<S: Storage = LocalStorage> {
    base: CalculatorBase,
    storage: S,
}

impl PhenomSourceCalculator<LocalStorage> {
    pub fn new(name: &str) -> Result<Self> {
        Self::with_storage(name, LocalStorage::default())
    }
}

impl<S: Storage> PhenomSourceCalculator<S> {
    pub fn with_storage(name: &str, storage: S) -> Result<Self> {
        Ok(Self {
            base: CalculatorBase::new(
                name,
                Self::default_parameters()?,
                DEFAULT_OUTPUT_KEY,
                DEFAULT_OUTPUT_FILENAME,
                DEFAULT_BASE_DIR,
            ),
            storage,
        })
    }

    pub fn default_parameters() -> Result<CalculatorParameters> {
        let mut parameters = beam_parameters()?;
        parameters
            .new_parameter("spectral_bandwidth", Unit::Dimensionless, "The bandwith of the beam spectrum (relative rms)")?
            .add_legal_interval(0.0, 1.0)
            .set_value(ParamValue::Float(1e-12))?;
        parameters.new_parameter("seed", Unit::Dimensionless, "Random seed for the SASE phases; unset draws from entropy")?;
        Ok(parameters)
    }
}

#[async_trait::async_trait]
impl<S: Storage + 'static> Calculator for PhenomSourceCalculator<S> {
    fn base(&self) -> &CalculatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CalculatorBase {
        &mut self.base
    }

    async fn backengine(&mut self, _context: &RunContext) -> Result<DataCollection> {
        let settings = SourceSettings::from_parameters(&self.base.parameters)?;
        let (key, path) = self.base.primary_output()?;

        tracing::info!(
            "🌊 Generating SASE pulse: {}x{}x{} mesh, {} eV, {} J",
            settings.mesh.x.n,
            settings.mesh.y.n,
            settings.mesh.t.n,
            settings.photon_energy,
            settings.pulse_energy
        );

        let wavefront = tokio::task::spawn_blocking(move || build_wavefront(&settings, Coherence::Sase))
            .await
            .map_err(|e| SimError::CalculatorError {
                stage: self.base.name.clone(),
                details: format!("pulse synthesis task failed: {}", e),
            })??;

        let bytes = wavefront_archive::encode(&wavefront)?;
        tracing::debug!("Writing wavefront ({} bytes) to {}", bytes.len(), path.display());
        self.storage
            .write_file(&path.to_string_lossy(), &bytes)
            .await?;

        let mut output = DataCollection::new();
        output.add(DataHandle::new(&key, &path, FormatKind::WavefrontArchive));
        Ok(output)
    }
}
