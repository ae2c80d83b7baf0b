//! Mesh file I/O for STL and OBJ.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::log_io_operation;
use crate::validate::{ValidationOptions, validate_mesh_data};
use crate::{Mesh, Vertex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "obj" => Some(MeshFormat::Obj),
                _ => None,
            })
    }

    fn name(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
        }
    }
}

fn unsupported(path: &Path) -> MeshError {
    MeshError::UnsupportedFormat {
        extension: path.extension().and_then(|e| e.to_str()).map(String::from),
    }
}

/// Load a mesh from file, auto-detecting format from extension.
///
/// The result is checked for invalid indices and non-finite coordinates; an
/// empty file is an error.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    let loaded = match format {
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Obj => load_obj(path),
    };
    log_io_operation("load", path, format.name(), loaded.is_ok());
    let mesh = loaded?;

    if mesh.is_empty() {
        return Err(MeshError::empty_mesh("mesh has no vertices or faces"));
    }
    validate_mesh_data(&mesh, &ValidationOptions::default())?;

    if let Some((min, max)) = mesh.bounds() {
        let dims = max - min;
        debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            dimensions = format!("{:.1} x {:.1} x {:.1}", dims.x, dims.y, dims.z),
            "Loaded mesh"
        );
        if dims.max() < 0.1 {
            warn!(largest = dims.max(), "Mesh is tiny, check the file units");
        }
    }

    Ok(mesh)
}

/// Load an STL file (binary or ASCII).
fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let file = File::open(path).map_err(|e| MeshError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader).map_err(|e| MeshError::ParseError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices.push(Vertex::from_coords(
            f64::from(v.0[0]),
            f64::from(v.0[1]),
            f64::from(v.0[2]),
        ));
    }
    for face in &stl.faces {
        let [a, b, c] = face.vertices.map(|i| i as u32);
        if a != b && b != c && a != c {
            mesh.faces.push([a, b, c]);
        }
    }

    Ok(mesh)
}

/// Load an OBJ file, merging all of its objects.
fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::ParseError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let mut mesh = Mesh::new();
    for model in &models {
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend(model.mesh.positions.chunks_exact(3).map(|c| {
            Vertex::from_coords(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]))
        }));
        mesh.faces.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|c| [c[0] + base, c[1] + base, c[2] + base]),
        );
    }

    debug!(models = models.len(), "OBJ parsed");
    Ok(mesh)
}

/// Save a mesh, choosing the format from the extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;
    let saved = match format {
        MeshFormat::Stl => save_stl(mesh, path),
        MeshFormat::Obj => save_obj(mesh, path),
    };
    log_io_operation("save", path, format.name(), saved.is_ok());
    saved
}

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> MeshError + '_ {
    move |source| MeshError::IoWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Save as binary STL.
pub fn save_stl(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut writer = BufWriter::new(file);

    let to_vertex = |p: nalgebra::Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| {
            let n = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [to_vertex(tri.v0), to_vertex(tri.v1), to_vertex(tri.v2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(write_error(path))?;
    writer.flush().map_err(write_error(path))?;

    Ok(())
}

/// Save as ASCII OBJ, keeping the vertex order.
pub fn save_obj(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut writer = BufWriter::new(file);

    let mut write = || -> std::io::Result<()> {
        writeln!(writer, "# Vertices: {}", mesh.vertices.len())?;
        writeln!(writer, "# Faces: {}", mesh.faces.len())?;
        for v in &mesh.vertices {
            let p = v.position;
            writeln!(writer, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
        }
        for [a, b, c] in &mesh.faces {
            writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        writer.flush()
    };
    write().map_err(write_error(path))
}
