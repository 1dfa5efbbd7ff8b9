use crate::adapters::LocalStorage;
use crate::app::sources::beam::{build_wavefront, Coherence, SourceSettings};
use crate::app::sources::beam_parameters;
use crate::core::calculator::CalculatorBase;
use crate::core::instrument::RunContext;
use crate::core::{Calculator, DataCollection, DataHandle, FormatKind, Storage};
use crate::domain::parameters::CalculatorParameters;
use crate::formats::wavefront_archive;
use crate::utils::error::{Result, SimError};

pub const DEFAULT_OUTPUT_KEY: &str = "Gaussian_wavefront";
pub const DEFAULT_OUTPUT_FILENAME: &str = "wavefront.zip";
pub const DEFAULT_BASE_DIR: &str = "GaussianSourceCalculator";

/// Fully coherent Gaussian pulse sharing the SASE source's beam parameters.
pub struct GaussianSourceCalculator<S: Storage = LocalStorage> {
    base: CalculatorBase,
    storage: S,
}

impl GaussianSourceCalculator<LocalStorage> {
    pub fn new(name: &str) -> Result<Self> {
        Self::with_storage(name, LocalStorage::default())
    }
}

impl<S: Storage> GaussianSourceCalculator<S> {
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
        beam_parameters()
    }
}

#[async_trait::async_trait]
impl<S: Storage + 'static> Calculator for GaussianSourceCalculator<S> {
    fn base(&self) -> &CalculatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CalculatorBase {
        &mut self.base
    }

    async fn backengine(&mut self, _context: &RunContext) -> Result<DataCollection> {
        let settings = SourceSettings::from_parameters(&self.base.parameters)?;
        let (key, path) = self.base.primary_output()?;
        tracing::info!("🌊 Generating coherent Gaussian pulse at {} eV", settings.photon_energy);

        let wavefront = tokio::task::spawn_blocking(move || build_wavefront(&settings, Coherence::Coherent))
            .await
            .map_err(|e| SimError::CalculatorError {
                stage: self.base.name.clone(),
                details: format!("pulse synthesis task failed: {}", e),
            })??;

        let bytes = wavefront_archive::encode(&wavefront)?;
        self.storage
            .write_file(&path.to_string_lossy(), &bytes)
            .await?;

        let mut output = DataCollection::new();
        output.add(DataHandle::new(&key, &path, FormatKind::WavefrontArchive));
        Ok(output)
    }
}
