pub mod beam;
pub mod gaussian;
pub mod phenom;

pub use gaussian::GaussianSourceCalculator;
pub use phenom::PhenomSourceCalculator;

use crate::domain::parameters::{CalculatorParameters, ParamValue};
use crate::domain::units::Unit;
use crate::utils::error::Result;

/// Mesh and beam parameters shared by the source calculators.
pub(crate) fn beam_parameters() -> Result<CalculatorParameters> {
    let mut parameters = CalculatorParameters::new();
    let sigma = 50e-6;

    parameters
        .new_parameter("range_x", Unit::Meter, "The spatial mesh range in x direction. [start, end]")?
        .set_value(ParamValue::Range([-sigma * 4.0, sigma * 4.0]))?;
    parameters
        .new_parameter("num_x", Unit::Dimensionless, "Number of mesh points in x direction.")?
        .add_legal_interval(1.0, 1e5)
        .set_value(ParamValue::Int(512))?;
    parameters
        .new_parameter("range_y", Unit::Meter, "The spatial mesh range in y direction. [start, end]")?
        .set_value(ParamValue::Range([-sigma * 4.0, sigma * 4.0]))?;
    parameters
        .new_parameter("num_y", Unit::Dimensionless, "Number of mesh points in y direction.")?
        .add_legal_interval(1.0, 1e5)
        .set_value(ParamValue::Int(512))?;
    parameters
        .new_parameter("range_t", Unit::Second, "The temporal range. [start, end]")?
        .set_value(ParamValue::Range([-25e-15, 25e-15]))?;
    parameters
        .new_parameter("num_t", Unit::Dimensionless, "Number of mesh points in t direction.")?
        .add_legal_interval(1.0, 1e5)
        .set_value(ParamValue::Int(250))?;
    parameters
        .new_parameter("photon_energy", Unit::ElectronVolt, "The photon energy of X-ray beam.")?
        .add_legal_interval(1.0, 1e6)
        .set_value(ParamValue::Float(10e3))?;
    parameters
        .new_parameter("pulse_energy", Unit::Joule, "Total energy of the pulse")?
        .add_legal_interval(0.0, 1.0)
        .set_value(ParamValue::Float(1e-4))?;
    parameters
        .new_parameter("pulse_duration", Unit::Second, "The length of a pulse (intensity FWHM)")?
        .add_legal_interval(1e-18, 1e-9)
        .set_value(ParamValue::Float(15e-15))?;
    parameters
        .new_parameter("sigma", Unit::Meter, "pulse width (rms of the intensity profile)")?
        .add_legal_interval(1e-9, 1.0)
        .set_value(ParamValue::Float(sigma))?;
    parameters
        .new_parameter("div", Unit::Radian, "pulse divergence")?
        .add_legal_interval(0.0, 1.0)
        .set_value(ParamValue::Float(2.5e-3))?;

    for (name, unit, comment) in [
        ("x0", Unit::Meter, "Beam centre in x"),
        ("y0", Unit::Meter, "Beam centre in y"),
        ("t0", Unit::Second, "Pulse centre in time"),
        ("theta_x", Unit::Radian, "Beam pointing angle in x"),
        ("theta_y", Unit::Radian, "Beam pointing angle in y"),
    ] {
        parameters
            .new_parameter(name, unit, comment)?
            .set_value(ParamValue::Float(0.0))?;
    }

    Ok(parameters)
}
