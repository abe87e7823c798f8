//! Headless runner: drives the particle system from an emissions dataset.

use anyhow::{Context, Result};
use clap::Parser;
use plume::dataset::{load_companies, Company};
use plume::prelude::*;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "plume", version, about = "CO2 emission plumes over a rotating globe")]
struct Cli {
    /// JSON file with company emissions
    #[arg(long)]
    dataset: PathBuf,

    /// First year to show
    #[arg(long, default_value_t = 2022)]
    year: i32,

    /// Last year to move on to (defaults to the first year)
    #[arg(long)]
    final_year: Option<i32>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Frames per second; each frame advances 1/fps seconds
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Speed multiplier
    #[arg(long)]
    speed: Option<f32>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final vertex buffer to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG sets per-module filters; -v raises the global level on top
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = verbosity_level(cli.verbose) {
        logger.filter_level(level);
    }
    logger.init();

    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        anyhow::bail!("--fps must be positive, got {}", cli.fps);
    }

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(speed) = cli.speed {
        config = config.with_speed_multiplier(speed);
    }

    let mut system = match cli.seed {
        Some(seed) => ParticleSystem::with_seed(config, seed)?,
        None => ParticleSystem::new(config)?,
    };
    system.on_active_count_change(|count| log::debug!("active particles: {count}"));

    let companies = load_companies(&cli.dataset)
        .with_context(|| format!("failed to load dataset {}", cli.dataset.display()))?;
    let final_year = cli.final_year.unwrap_or(cli.year);

    let mut reveal = start_year(&mut system, &companies, cli.year, final_year)?;
    let delta = 1.0 / cli.fps;
    let log_every = (cli.fps.round() as u64).max(1);

    for frame in 1..=cli.frames {
        let speed = system.config().speed_multiplier;
        for event in reveal.advance(delta, speed) {
            match event {
                RevealEvent::Announced(entity) => {
                    log::info!(
                        "{}: {} ({:.0} t CO2)",
                        entity.year,
                        entity.display_name,
                        entity.emissions_tons
                    );
                }
                RevealEvent::Revealed(entity) => system.push_entity(entity),
                RevealEvent::Completed { year } => {
                    log::info!(
                        "{year} complete: {} companies, {:.0} t CO2",
                        system.entities().len(),
                        system.active_emissions()
                    );
                }
                RevealEvent::NextYear(year) => {
                    reveal.cancel();
                    reveal = start_year(&mut system, &companies, year, final_year)?;
                }
            }
        }

        let result = system.step(delta);
        if frame % log_every == 0 {
            log::info!(
                "t={:.1}s active={} pending={} planet={:.4} rad",
                result.now,
                result.active_count,
                result.pending_count,
                result.planet_angle
            );
        }
    }

    if let Some(path) = &cli.dump {
        let bytes = system.field().vertex_bytes(system.config().particle_size);
        fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!(
            "wrote {} vertices ({} bytes) to {}",
            system.field().len(),
            bytes.len(),
            path.display()
        );
    }

    Ok(())
}

/// Log level requested by `-v` flags, if any.
fn verbosity_level(verbose: u8) -> Option<log::LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

/// Reset the system for `year` and queue its companies for reveal.
fn start_year(
    system: &mut ParticleSystem,
    companies: &[Company],
    year: i32,
    final_year: i32,
) -> Result<RevealSequence> {
    let dataset = EmissionsDataset::from_companies(companies, year)?;
    log::info!(
        "showing {year}: {} companies, {:.0} t CO2",
        dataset.len(),
        dataset.total_emissions()
    );

    system.clear();
    system.set_total_emissions(dataset.total_emissions());
    Ok(RevealSequence::new(&dataset, final_year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["plume", "--dataset", "ds.json", "-vvv"]).unwrap();
        assert_eq!(verbosity_level(cli.verbose), Some(log::LevelFilter::Trace));

        let cli = Cli::try_parse_from(["plume", "--dataset", "ds.json", "-vv"]).unwrap();
        assert_eq!(verbosity_level(cli.verbose), Some(log::LevelFilter::Debug));

        let cli = Cli::try_parse_from(["plume", "--dataset", "ds.json"]).unwrap();
        assert_eq!(verbosity_level(cli.verbose), None);
    }

    #[test]
    fn test_verbosity_reaches_logger_filter() {
        let mut logger = env_logger::Builder::new();
        logger.parse_filters("info");
        if let Some(level) = verbosity_level(2) {
            logger.filter_level(level);
        }
        let logger = logger.build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }
}
