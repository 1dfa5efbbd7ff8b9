use crate::core::calculator::CalculatorBase;
use crate::core::instrument::RunContext;
use crate::domain::data::DataCollection;
use crate::domain::parameters::CalculatorParameters;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A parameterised computation whose backengine writes data files.
#[async_trait]
pub trait Calculator: Send + Sync {
    fn base(&self) -> &CalculatorBase;
    fn base_mut(&mut self) -> &mut CalculatorBase;

    async fn backengine(&mut self, context: &RunContext) -> Result<DataCollection>;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn parameters(&self) -> &CalculatorParameters {
        &self.base().parameters
    }

    fn parameters_mut(&mut self) -> &mut CalculatorParameters {
        &mut self.base_mut().parameters
    }

    fn should_run(&self, _context: &RunContext) -> bool {
        true
    }
}
