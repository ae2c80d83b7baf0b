//! mesh drill command - hollow a part and cut drain holes.

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mesh_hollow::{DrainHole, DrillStatus, HOLE_STICK_OUT_LENGTH};
use mesh_repair::{Mesh, validate_mesh};
use serde::Serialize;

use crate::commands::hollow::{load_job, run_job};
use crate::{Cli, HollowArgs, OutputFormat, output};

#[derive(Serialize)]
struct DrillSummary {
    input: String,
    output: String,
    success: bool,
    status: DrillStatus,
    holes: usize,
    failed_holes: Vec<usize>,
    interior_faces: usize,
    output_faces: usize,
    watertight: bool,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    holes: &[DrainHole],
    seed: Option<u64>,
    params: &HollowArgs,
    cli: &Cli,
) -> Result<()> {
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let mut job = load_job(params)?;

    // Holes given on the command line sit on the surface; pull them out so
    // the cut starts outside the wall.
    job.holes.extend(holes.iter().cloned().map(|mut hole| {
        hole.stick_out(HOLE_STICK_OUT_LENGTH);
        hole
    }));
    if job.holes.is_empty() {
        bail!("No drain holes given; use --hole or a job file with [[holes]]");
    }
    let hole_count = job.holes.len();

    output::info(
        &format!("Hollowing and drilling {hole_count} hole(s)..."),
        cli.format,
        cli.quiet,
    );

    let result = run_job(&mesh, job, params, seed)?;

    for &i in &result.failed_holes {
        output::warning(&format!("Hole {i} could not be drilled"), cli.format, cli.quiet);
    }
    if result.status.contains(DrillStatus::DRILLING_FAILED) {
        output::warning(
            "Drilling failed; the hollowed part is saved without holes",
            cli.format,
            cli.quiet,
        );
    }

    result
        .mesh
        .save(output_path)
        .with_context(|| format!("Failed to save drilled mesh to {:?}", output_path))?;

    let summary = DrillSummary {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        success: result.status.is_applied(),
        status: result.status,
        holes: hole_count,
        failed_holes: result.failed_holes,
        interior_faces: result.interior_faces,
        output_faces: result.mesh.face_count(),
        watertight: validate_mesh(&result.mesh).is_watertight,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&summary, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Drilled mesh saved to {}", output_path.display()),
                    cli.format,
                    cli.quiet,
                );
                let status = summary.status.to_string();
                println!(
                    "  {}: {}",
                    "Status".cyan(),
                    if summary.success {
                        status.green()
                    } else {
                        status.red()
                    }
                );
                println!(
                    "  {}: {} of {} drilled",
                    "Holes".cyan(),
                    summary.holes - summary.failed_holes.len(),
                    summary.holes
                );
                println!("  {}: {}", "Faces".cyan(), summary.output_faces);
                println!(
                    "  {}: {}",
                    "Watertight".cyan(),
                    if summary.watertight { "yes" } else { "NO" }
                );
            }
        }
    }

    Ok(())
}
