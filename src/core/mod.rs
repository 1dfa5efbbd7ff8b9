pub mod calculator;
pub mod instrument;

pub use crate::domain::data::{DataCollection, DataHandle, FormatKind};
pub use crate::domain::parameters::{CalculatorParameters, ParamValue, Parameter};
pub use crate::domain::ports::{Calculator, Storage};
pub use crate::utils::error::Result;
