use anyhow::Context;
use clap::Parser;
use simex_lite::app::registry;
use simex_lite::config::{Command, LogFormat};
use simex_lite::formats::{csv_export, wavefront_archive, DiffractionPatterns, LoadOptions, PatternSelection};
use simex_lite::utils::logger;
use simex_lite::{CliConfig, DataHandle, FormatKind, Instrument, InstrumentConfig, SimError};
use std::path::Path;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = execute(config.command).await {
        let exit_code = match e.downcast_ref::<SimError>() {
            Some(sim_error) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    e,
                    sim_error.category(),
                    sim_error.severity()
                );
                eprintln!("❌ {}", sim_error.user_friendly_message());
                eprintln!("💡 Suggestion: {}", sim_error.recovery_suggestion());
                sim_error.severity().exit_code()
            }
            None => {
                tracing::error!("❌ {:#}", e);
                eprintln!("❌ {:#}", e);
                1
            }
        };

        std::process::exit(exit_code);
    }
}

async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run {
            config,
            base_dir,
            monitor,
            dry_run,
        } => run(&config, base_dir.as_deref(), monitor, dry_run).await,
        Command::Params { kind, json } => {
            let parameters = registry::default_parameters(&kind)?;
            if json {
                println!("{}", parameters.to_json()?);
            } else {
                println!("{}", parameters);
            }
            Ok(())
        }
        Command::Inspect { file } => inspect(&file),
        Command::Diffr {
            file,
            indices,
            poissonize,
            seed,
        } => diffr(&file, indices, poissonize, seed),
        Command::Export { file, output } => {
            let handle = DataHandle::new("wavefront", &file, FormatKind::WavefrontArchive);
            let converted = csv_export::convert_wavefront(&handle, &output)
                .with_context(|| format!("exporting {}", file.display()))?;
            println!("📁 Fluence written to: {}", converted.path.display());
            Ok(())
        }
    }
}

async fn run(config_path: &Path, base_dir: Option<&Path>, monitor: bool, dry_run: bool) -> anyhow::Result<()> {
    let mut config = InstrumentConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(dir) = base_dir {
        config.instrument.base_dir = dir.to_string_lossy().to_string();
    }
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
        config.monitoring = Some(simex_lite::config::instrument_config::MonitoringConfig { enabled: true });
    }

    let mut instrument = config.build_instrument()?;
    if dry_run {
        println!("{}", serde_json::to_string_pretty(&instrument.export_parameters()?)?);
        return Ok(());
    }

    let results = instrument.run().await?;
    for result in &results {
        for handle in result.output.iter() {
            println!(
                "✅ {} -> {} ({}) in {:?}",
                result.calculator_name,
                handle.path.display(),
                handle.key,
                result.duration
            );
        }
    }

    let summary = Instrument::execution_summary(&results);
    println!("📊 Summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let wavefront = wavefront_archive::read_file(file)?;
    let mesh = wavefront.mesh;
    println!("📄 {}", file.display());
    println!("  photon energy: {} eV (λ = {:e} m)", wavefront.photon_energy_ev, wavefront.wavelength());
    println!("  x: [{:e}, {:e}] m, {} points", mesh.x.start, mesh.x.end, mesh.x.n);
    println!("  y: [{:e}, {:e}] m, {} points", mesh.y.start, mesh.y.end, mesh.y.n);
    println!("  t: [{:e}, {:e}] s, {} points", mesh.t.start, mesh.t.end, mesh.t.n);
    println!("  pulse energy: {:e} J", wavefront.pulse_energy());
    println!("  peak power: {:e} W", wavefront.peak_power());
    if let Some((cx, cy)) = wavefront.centroid() {
        println!("  centroid: ({:e}, {:e}) m", cx, cy);
    }
    Ok(())
}

fn diffr(file: &Path, indices: Vec<u32>, poissonize: bool, seed: Option<u64>) -> anyhow::Result<()> {
    let patterns = DiffractionPatterns::open(file)?;
    let selection = if indices.is_empty() {
        PatternSelection::All
    } else {
        PatternSelection::List(indices)
    };
    let stack = patterns.load(selection, LoadOptions { poissonize, seed })?;

    println!("📄 {}", file.display());
    if let Some(beam) = patterns.parameters().get("beam") {
        println!("  beam: {}", beam);
    }
    if let Some(energy) = patterns.photon_energy() {
        println!("  photon energy: {} eV", energy);
    }
    println!("  patterns: {} of shape {:?}", patterns.pattern_total(), patterns.shape());
    println!("  selected: {} (total photons: {})", stack.len(), stack.sum());
    for (id, pattern) in stack.ids.iter().zip(&stack.patterns) {
        println!("    {:07}: {}", id, pattern.iter().sum::<f64>());
    }
    Ok(())
}
