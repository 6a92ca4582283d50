//! startrace: generate chunked trace scenarios and validate trace directories.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use startrace::validate::{GroundAerialRules, OrbitalRules};
use startrace::{
    generate_ground_aerial, generate_orbital, validate_dir, Catalog, Fleet, J2Propagator, Profile,
    ScenarioConfig, ValidationRules, Wgs84,
};

#[derive(Parser, Debug)]
#[command(name = "startrace")]
#[command(about = "Constellation and ground/aerial trace generation and validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select visible catalog nodes and write an orbital scenario
    Generate {
        /// TLE catalog (2-line or 3-line format)
        #[arg(long)]
        tle: PathBuf,

        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Maximum number of selected nodes
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Keep only catalog names containing this text (case-insensitive)
        #[arg(long, conflicts_with = "all_names")]
        filter: Option<String>,

        /// Do not filter catalog names
        #[arg(long)]
        all_names: bool,
    },

    /// Write a ground station + aerial fleet scenario
    GenerateFleet {
        /// Fleet description (JSON); the reference fleet when omitted
        #[arg(long)]
        fleet: Option<PathBuf>,

        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Validate every trace chunk in a directory
    Validate {
        /// Directory holding sat_trace_*.csv / uav_trace_*.csv files
        dir: PathBuf,

        /// Expected orbital nodes per timestamp
        #[arg(long, default_value_t = 50)]
        sat_count: usize,

        /// Expected ground+aerial nodes per timestamp
        #[arg(long, default_value_t = 4)]
        group_size: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Settings shared by both generators; each overrides the config file.
#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Scenario configuration (JSON); missing fields take reference values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output root; traces go to <output>/<scenario>/traces
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scenario name
    #[arg(long)]
    scenario: Option<String>,

    /// Total simulated duration in seconds
    #[arg(long)]
    duration_sec: Option<u64>,
}

impl ScenarioArgs {
    fn resolve(&self, profile: Profile) -> Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::from_json_file(path)?,
            None => ScenarioConfig::for_profile(profile),
        };
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if let Some(name) = &self.scenario {
            config.scenario_name = name.clone();
        }
        if let Some(sec) = self.duration_sec {
            config.duration_ms = sec * 1000;
        }
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "startrace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            tle,
            scenario,
            max_nodes,
            filter,
            all_names,
        } => {
            let mut config = scenario.resolve(Profile::Orbital)?;
            if let Some(n) = max_nodes {
                config.max_nodes = n;
            }
            if all_names {
                config.catalog_filter = None;
            } else if filter.is_some() {
                config.catalog_filter = filter;
            }

            let catalog = Catalog::from_tle_file(&tle, config.catalog_filter.as_deref())
                .with_context(|| format!("loading catalog {}", tle.display()))?;
            let manifest = generate_orbital(&catalog, &J2Propagator, &Wgs84, &Wgs84, &config)
                .context("orbital scenario generation failed")?;
            report_manifest(&config, manifest.node_count, manifest.trace_files.len());
            Ok(ExitCode::SUCCESS)
        }

        Command::GenerateFleet { fleet, scenario } => {
            let config = scenario.resolve(Profile::GroundAerial)?;
            let fleet = match fleet {
                Some(path) => load_fleet(&path)?,
                None => Fleet::reference(),
            };
            let manifest = generate_ground_aerial(&fleet, &config)
                .context("ground+aerial scenario generation failed")?;
            report_manifest(&config, manifest.node_count, manifest.trace_files.len());
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate {
            dir,
            sat_count,
            group_size,
            json,
        } => {
            let rules = ValidationRules {
                orbital: OrbitalRules {
                    expected_nodes: sat_count,
                    ..OrbitalRules::default()
                },
                ground_aerial: GroundAerialRules {
                    group_size,
                    ..GroundAerialRules::default()
                },
            };
            let report = validate_dir(&dir, &rules, &Wgs84)
                .with_context(|| format!("validating {}", dir.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            Ok(if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn load_fleet(path: &Path) -> Result<Fleet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading fleet {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing fleet {}", path.display()))
}

fn report_manifest(config: &ScenarioConfig, nodes: usize, chunks: usize) {
    info!(
        nodes,
        chunks,
        traces = %config.trace_dir().display(),
        manifest = %config.manifest_path().display(),
        "done"
    );
}
