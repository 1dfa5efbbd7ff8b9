use anyhow::Result;
use simex_lite::core::ParamValue;
use simex_lite::domain::units::Unit;
use simex_lite::formats::wavefront_archive;
use simex_lite::{Calculator, Instrument, LocalStorage, PhenomSourceCalculator, RunContext};
use tempfile::TempDir;

fn small_source(name: &str) -> Result<PhenomSourceCalculator> {
    let mut calculator = PhenomSourceCalculator::new(name)?;
    let params = calculator.parameters_mut();
    params.get_mut("num_x")?.set_value(ParamValue::Int(20))?;
    params.get_mut("num_y")?.set_value(ParamValue::Int(20))?;
    params.get_mut("num_t")?.set_value(ParamValue::Int(48))?;
    params.get_mut("spectral_bandwidth")?.set_value(ParamValue::Float(3e-3))?;
    params.get_mut("seed")?.set_value(ParamValue::Int(99))?;
    Ok(calculator)
}

#[tokio::test]
async fn test_backengine_with_relative_storage_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path());
    let mut calculator = PhenomSourceCalculator::with_storage("source", storage)?;
    calculator
        .parameters_mut()
        .get_mut("num_t")?
        .set_value(ParamValue::Int(16))?;
    calculator
        .parameters_mut()
        .get_mut("num_x")?
        .set_value(ParamValue::Int(16))?;
    calculator
        .parameters_mut()
        .get_mut("num_y")?
        .set_value(ParamValue::Int(16))?;

    let output = calculator
        .backengine(&RunContext::new("standalone".to_string()))
        .await?;
    let handle = output.get("Phenom_wavefront").unwrap();
    assert!(temp_dir.path().join(&handle.path).exists());
    Ok(())
}

#[tokio::test]
async fn test_sase_pulse_in_instrument() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut instrument = Instrument::new("source-only");
    instrument.add_calculator(Box::new(small_source("source")?))?;
    instrument.set_instrument_base_dir(temp_dir.path());
    instrument.add_master_parameter(
        "energy",
        Unit::KiloElectronVolt,
        [("source".to_string(), "photon_energy".to_string())],
    )?;
    instrument.set_master_value("energy", ParamValue::Float(6.0))?;

    let results = instrument.run().await?;
    let handle = results[0].output.get("Phenom_wavefront").unwrap();
    let wavefront = wavefront_archive::read_file(&handle.path)?;

    assert_eq!(wavefront.photon_energy_ev, 6000.0);
    assert!(((wavefront.pulse_energy() - 1e-4) / 1e-4).abs() < 1e-4);
    // 6 keV is about 2.07 Å.
    assert!((wavefront.wavelength() - 2.0664e-10).abs() < 1e-13);

    let power = wavefront.temporal_power();
    assert_eq!(power.len(), 48);
    assert!(wavefront.peak_power() > 0.0);
    // The envelope keeps the power near the window edges small.
    assert!(power[0] < 1e-2 * wavefront.peak_power());
    assert!(power[47] < 1e-2 * wavefront.peak_power());
    Ok(())
}

#[tokio::test]
async fn test_unseeded_pulses_differ() -> Result<()> {
    let mut powers = Vec::new();
    for _ in 0..2 {
        let temp_dir = TempDir::new()?;
        let mut instrument = Instrument::new("source-only");
        let mut source = small_source("source")?;
        source.parameters_mut().get_mut("seed")?.value = None;
        instrument.add_calculator(Box::new(source))?;
        instrument.set_instrument_base_dir(temp_dir.path());

        let results = instrument.run().await?;
        let handle = results[0].output.get("Phenom_wavefront").unwrap();
        powers.push(wavefront_archive::read_file(&handle.path)?.temporal_power());
    }
    assert_ne!(powers[0], powers[1]);
    Ok(())
}
