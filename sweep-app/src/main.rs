//! Sweep
//!
//! Command-line front end for the laser-line turntable scanner.
//!
//! Subcommands:
//! - `scan`: capture one rotation and export the cloud and mesh
//! - `laser`: switch the laser on
//! - `mesh`: mesh a previously exported PLY cloud
//! - `init-config`: write the default configuration file

mod app;
mod config;
mod error;

use clap::{Parser, Subcommand, ValueEnum};
use config::ScannerConfig;
use error::Result;
use std::path::PathBuf;
use sweep_data::MeshStrategy;
use tracing::info;

/// Sweep - laser-line turntable 3D scanner
#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one rotation and export the results
    Scan {
        /// Number of frames to capture
        #[arg(short = 'n', long)]
        frames: Option<usize>,

        /// Tick period in milliseconds
        #[arg(short, long)]
        period_ms: Option<u64>,

        /// Process frames back to back, ignoring the period
        #[arg(long)]
        free_run: bool,

        /// Serial port of the turntable controller
        #[arg(long)]
        port: Option<String>,

        /// Switch the laser on before starting
        #[arg(long)]
        laser: bool,

        /// Where to write the point cloud (PLY)
        #[arg(long)]
        cloud: Option<PathBuf>,

        /// Where to write the mesh (OBJ)
        #[arg(long)]
        mesh: Option<PathBuf>,
    },

    /// Switch the laser on
    Laser {
        /// Serial port of the turntable controller
        #[arg(long)]
        port: Option<String>,
    },

    /// Mesh a point cloud exported by `scan`
    Mesh {
        /// Input PLY file
        input: PathBuf,

        /// Output OBJ file
        #[arg(short, long, default_value = "mesh.obj")]
        output: PathBuf,

        /// Scan lines per frame; the configured frame height by default
        #[arg(long)]
        lines: Option<usize>,

        /// Triangulation strategy; the configured one by default
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Write the default configuration to a file
    InitConfig {
        #[arg(default_value = "sweep.toml")]
        path: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StrategyArg {
    /// Connect neighbouring lines of neighbouring frames, closing the rotation
    Grid,
    /// Connect neighbouring frames without closing the rotation
    GridOpen,
    /// Projected Delaunay triangulation
    Delaunay,
}

impl From<StrategyArg> for MeshStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Grid => MeshStrategy::Grid { close_loop: true },
            StrategyArg::GridOpen => MeshStrategy::Grid { close_loop: false },
            StrategyArg::Delaunay => MeshStrategy::Delaunay,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ScannerConfig> {
    match path {
        Some(path) => ScannerConfig::from_file(path),
        None => Ok(ScannerConfig::default()),
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    app::init_logging(&config.logging.level);
    if let Some(path) = &args.config {
        info!("Loaded configuration from {}", path.display());
    }

    match args.command {
        Command::Scan {
            frames,
            period_ms,
            free_run,
            port,
            laser,
            cloud,
            mesh,
        } => {
            if let Some(frames) = frames {
                config.capture.frame_count = frames;
            }
            if let Some(period_ms) = period_ms {
                config.capture.period_ms = period_ms;
            }
            config.capture.free_run |= free_run;
            if port.is_some() {
                config.hardware.port = port;
            }
            config.hardware.laser_on_start |= laser;
            if cloud.is_some() {
                config.output.cloud_ply = cloud;
            }
            if mesh.is_some() {
                config.output.mesh_obj = mesh;
            }
            app::run_scan(&config)?;
        }
        Command::Laser { port } => {
            if port.is_some() {
                config.hardware.port = port;
            }
            app::run_laser(&config)?;
        }
        Command::Mesh {
            input,
            output,
            lines,
            strategy,
        } => {
            let lines = lines.unwrap_or(config.frame.height as usize);
            let strategy = strategy.map_or(config.mesh, MeshStrategy::from);
            app::run_mesh(&input, &output, lines, strategy)?;
        }
        Command::InitConfig { path } => {
            config.to_file(&path)?;
            info!("Wrote configuration to {}", path.display());
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("sweep error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_scan_overrides_parse() {
        let args = Args::parse_from(["sweep", "scan", "-n", "68", "--free-run", "--laser"]);
        match args.command {
            Command::Scan {
                frames,
                free_run,
                laser,
                ..
            } => {
                assert_eq!(frames, Some(68));
                assert!(free_run);
                assert!(laser);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_strategy_mapping() {
        assert_eq!(
            MeshStrategy::from(StrategyArg::GridOpen),
            MeshStrategy::Grid { close_loop: false }
        );
        assert_eq!(MeshStrategy::from(StrategyArg::Delaunay), MeshStrategy::Delaunay);
    }
}
