//! mesh hollow command - add an inward offset cavity.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_hollow::{HollowBuilder, HollowJob, HollowOutput};
use mesh_repair::{Mesh, Progress};
use serde::Serialize;
use tracing::debug;

use crate::{Cli, HollowArgs, OutputFormat, output};

#[derive(Serialize)]
struct HollowSummary {
    input: String,
    output: String,
    success: bool,
    min_thickness: f64,
    quality: f64,
    closing_distance: f64,
    input_faces: usize,
    interior_faces: usize,
    output_faces: usize,
    volume_before: f64,
    volume_after: f64,
}

/// Job file (if any) with command line overrides applied.
pub fn load_job(params: &HollowArgs) -> Result<HollowJob> {
    let mut job = match &params.config {
        Some(path) => HollowJob::from_toml_file(path)
            .with_context(|| format!("Failed to read hollowing job from {:?}", path))?,
        None => HollowJob::default(),
    };

    if let Some(thickness) = params.thickness {
        job.config.min_thickness = thickness;
    }
    if let Some(quality) = params.quality {
        job.config.quality = quality;
    }
    if let Some(closing) = params.closing {
        job.config.closing_distance = closing;
    }
    job.config
        .validate()
        .context("Invalid hollowing parameters")?;

    Ok(job)
}

/// Run the builder with progress forwarded to the log.
pub fn run_job(
    mesh: &Mesh,
    job: HollowJob,
    params: &HollowArgs,
    seed: Option<u64>,
) -> Result<HollowOutput> {
    let mut builder = HollowBuilder::new(mesh)
        .job(job)
        .remove_inside_triangles(!params.no_trim)
        .with_progress(Box::new(|p: &Progress| {
            debug!(percent = p.current, message = %p.message, "hollowing");
            true
        }));
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }

    builder
        .build()
        .context("Hollowing failed")?
        .context("Hollowing was cancelled")
}

pub fn run(input: &Path, output_path: &Path, params: &HollowArgs, cli: &Cli) -> Result<()> {
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let job = load_job(params)?;
    let config = job.config.clone();

    output::info(
        &format!("Hollowing with {:.2}mm walls...", config.min_thickness),
        cli.format,
        cli.quiet,
    );

    let result = run_job(&mesh, job, params, None)?;

    result
        .mesh
        .save(output_path)
        .with_context(|| format!("Failed to save hollowed mesh to {:?}", output_path))?;

    let summary = HollowSummary {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        success: true,
        min_thickness: config.min_thickness,
        quality: config.quality,
        closing_distance: config.closing_distance,
        input_faces: mesh.face_count(),
        interior_faces: result.interior_faces,
        output_faces: result.mesh.face_count(),
        volume_before: mesh.signed_volume(),
        volume_after: result.mesh.signed_volume(),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&summary, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Hollowed mesh saved to {}", output_path.display()),
                    cli.format,
                    cli.quiet,
                );
                println!(
                    "  {}: {:.2}mm (quality {:.2}, closing {:.2}mm)",
                    "Walls".cyan(),
                    summary.min_thickness,
                    summary.quality,
                    summary.closing_distance
                );
                println!(
                    "  {}: {} → {} faces ({} in cavity)",
                    "Faces".cyan(),
                    summary.input_faces,
                    summary.output_faces,
                    summary.interior_faces
                );
                println!(
                    "  {}: {:.2} → {:.2} mm³",
                    "Volume".cyan(),
                    summary.volume_before,
                    summary.volume_after
                );
            }
        }
    }

    Ok(())
}
