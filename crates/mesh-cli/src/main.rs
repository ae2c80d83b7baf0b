//! mesh-cli: Command-line interface for hollowing resin prints.
//!
//! Hollows a solid part, drills drain holes through the walls and reports
//! mesh statistics, suitable for scripting and batch pipelines.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_hollow=info` - Basic operation logging
//! - `RUST_LOG=mesh_hollow=debug` - Detailed progress logging
//! - `RUST_LOG=mesh_repair::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Hollow with 2mm walls
//! mesh hollow part.stl -o hollowed.stl --thickness 2
//!
//! # Hollow and drill two drain holes from the bottom
//! mesh drill part.stl -o drilled.stl \
//!     --hole 10,10,0,0,0,1,1.5,6 --hole 30,10,0,0,0,1,1.5,6
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mesh_hollow::DrainHole;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{drill, hollow, info};

/// mesh - Hollow resin prints and drill drain holes.
#[derive(Parser)]
#[command(name = "mesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Cavity parameters shared by `hollow` and `drill`.
///
/// Values given on the command line override the job file.
#[derive(Args, Clone, Default)]
pub struct HollowArgs {
    /// Minimum wall thickness in mm
    #[arg(long, short)]
    pub thickness: Option<f64>,

    /// Voxel density in [0, 1]; higher is finer and slower
    #[arg(long)]
    pub quality: Option<f64>,

    /// Closing distance in mm (fills small gaps in the cavity)
    #[arg(long)]
    pub closing: Option<f64>,

    /// Hollowing job file (TOML) with a [config] table and [[holes]]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Keep triangles of the part that reach into the cavity
    #[arg(long)]
    pub no_trim: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh statistics and solid checks
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Hollow a part by adding an inward offset cavity
    Hollow {
        /// Input mesh file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        params: HollowArgs,
    },

    /// Hollow a part and drill drain holes into the cavity
    Drill {
        /// Input mesh file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Drain hole as x,y,z,nx,ny,nz,radius,depth. The position lies on
        /// the outer surface and the normal points into the part.
        #[arg(long = "hole", value_parser = parse_hole)]
        holes: Vec<DrainHole>,

        /// Seed for the hole jitter, for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        params: HollowArgs,
    },
}

/// Parse `x,y,z,nx,ny,nz,r,h` into a drain hole.
fn parse_hole(s: &str) -> Result<DrainHole, String> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{v}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [x, y, z, nx, ny, nz, radius, height] = values[..] else {
        return Err(format!(
            "expected 8 comma separated values (x,y,z,nx,ny,nz,r,h), got {}",
            values.len()
        ));
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err("hole values must be finite".into());
    }
    if radius <= 0.0 || height <= 0.0 {
        return Err("hole radius and depth must be positive".into());
    }
    let normal = nalgebra::Vector3::new(nx, ny, nz);
    if normal.norm() < 1e-9 {
        return Err("hole normal must not be zero".into());
    }

    Ok(DrainHole::new(
        nalgebra::Point3::new(x, y, z),
        normal.normalize(),
        radius,
        height,
    ))
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_repair=info,mesh_hollow=info",
            2 => "mesh_repair=debug,mesh_hollow=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Nicer panic reports in development
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input } => info::run(input, &cli),
        Commands::Hollow {
            input,
            output,
            params,
        } => hollow::run(input, output, params, &cli),
        Commands::Drill {
            input,
            output,
            holes,
            seed,
            params,
        } => drill::run(input, output, holes, *seed, params, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(mesh_err) = e.downcast_ref::<mesh_repair::MeshError>() {
                eprintln!("{}: {}", "Error".red().bold(), mesh_err);
                eprintln!("  {}: {}", "Code".cyan(), mesh_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    mesh_err.recovery_suggestion()
                );
            } else if let Some(hollow_err) = e.downcast_ref::<mesh_hollow::HollowError>() {
                eprintln!("{}: {}", "Error".red().bold(), hollow_err);
                eprintln!("  {}: {}", "Code".cyan(), hollow_err.code());
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
