//! mesh info command - display mesh statistics.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_repair::{Mesh, has_self_intersections};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    faces: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    volume: f64,
    surface_area: f64,
    components: usize,
    watertight: bool,
    manifold: bool,
    self_intersecting: bool,
    /// Whether the mesh can be hollowed and drilled as is.
    solid: bool,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value { "yes".normal() } else { "NO".red() }
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let report = mesh.validate();
    let self_intersecting = has_self_intersections(&mesh);
    let bounds = report.bounds.map(|(min, max)| {
        let dims = max - min;
        BoundsInfo {
            min: [min.x, min.y, min.z],
            max: [max.x, max.y, max.z],
            dimensions: [dims.x, dims.y, dims.z],
        }
    });

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: report.vertex_count,
        faces: report.face_count,
        bounds,
        volume: report.signed_volume,
        surface_area: report.surface_area,
        components: report.component_count,
        watertight: report.is_watertight,
        manifold: report.is_manifold,
        self_intersecting,
        solid: report.bounds_a_volume() && !self_intersecting,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Information".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Faces".cyan(), info.faces);
                println!("  {}: {}", "Components".cyan(), info.components);

                if let Some(b) = &info.bounds {
                    let [dx, dy, dz] = b.dimensions;
                    println!("  {}: {dx:.2} x {dy:.2} x {dz:.2} mm", "Dimensions".cyan());
                    println!(
                        "  {}: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                        "Bounds".cyan(),
                        b.min[0],
                        b.min[1],
                        b.min[2],
                        b.max[0],
                        b.max[1],
                        b.max[2]
                    );
                }

                println!("  {}: {:.2} mm³", "Volume".cyan(), info.volume);
                println!("  {}: {:.2} mm²", "Surface area".cyan(), info.surface_area);
                println!("  {}: {}", "Watertight".cyan(), yes_no(info.watertight));
                println!("  {}: {}", "Manifold".cyan(), yes_no(info.manifold));
                println!(
                    "  {}: {}",
                    "Self-intersecting".cyan(),
                    if info.self_intersecting { "YES".red() } else { "no".normal() }
                );
                println!("  {}: {}", "Ready to hollow".cyan(), yes_no(info.solid));
            }
        }
    }

    Ok(())
}
