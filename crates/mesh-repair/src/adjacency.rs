//! Edge and vertex adjacency for indexed triangle sets.

use hashbrown::HashMap;

/// Undirected edge key `(min, max)`.
pub type EdgeKey = (u32, u32);

#[inline]
fn edge_key(a: u32, b: u32) -> EdgeKey {
    (a.min(b), a.max(b))
}

/// Edge-to-face adjacency.
///
/// Also tracks how often each directed edge occurs, which is what an
/// orientation check needs: in a consistently wound closed surface every
/// directed edge appears exactly once and its reverse exactly once.
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Faces incident to each undirected edge.
    pub edge_to_faces: HashMap<EdgeKey, Vec<u32>>,
    directed: HashMap<(u32, u32), u32>,
}

impl MeshAdjacency {
    /// Build adjacency from a face list.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<EdgeKey, Vec<u32>> = HashMap::with_capacity(faces.len() * 3 / 2);
        let mut directed: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3);

        for (fi, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                edge_to_faces.entry(edge_key(a, b)).or_default().push(fi as u32);
                *directed.entry((a, b)).or_insert(0) += 1;
            }
        }

        Self {
            edge_to_faces,
            directed,
        }
    }

    /// Edges used by exactly one face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(edge, _)| *edge)
    }

    /// Number of edges used by exactly one face.
    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edges().count()
    }

    /// Number of edges used by more than two faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() > 2)
            .count()
    }

    /// No boundary edges.
    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count() == 0
    }

    /// Number of directed edges that are not matched by exactly one reversed
    /// twin. Zero for a closed, consistently oriented, edge-manifold surface.
    pub fn orientation_defect_count(&self) -> usize {
        self.directed
            .iter()
            .filter(|&(&(a, b), &count)| {
                count != 1 || self.directed.get(&(b, a)).copied() != Some(1)
            })
            .count()
    }

    /// Faces sharing the edge `(a, b)`, in either direction.
    pub fn faces_of_edge(&self, a: u32, b: u32) -> &[u32] {
        self.edge_to_faces
            .get(&edge_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Vertex-to-face incidence in compressed (CSR) form.
///
/// Two faces are one-ring neighbors when they share at least one vertex.
#[derive(Debug, Clone)]
pub struct VertexFaceIndex {
    offsets: Vec<u32>,
    faces: Vec<u32>,
}

impl VertexFaceIndex {
    /// Build the index for `vertex_count` vertices.
    pub fn build(vertex_count: usize, faces: &[[u32; 3]]) -> Self {
        let mut offsets = vec![0u32; vertex_count + 1];
        for face in faces {
            for &v in face {
                offsets[v as usize + 1] += 1;
            }
        }
        for i in 0..vertex_count {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut incident = vec![0u32; faces.len() * 3];
        for (fi, face) in faces.iter().enumerate() {
            for &v in face {
                let slot = &mut cursor[v as usize];
                incident[*slot as usize] = fi as u32;
                *slot += 1;
            }
        }

        Self {
            offsets,
            faces: incident,
        }
    }

    /// Faces using vertex `v`.
    #[inline]
    pub fn faces_of(&self, v: u32) -> &[u32] {
        let v = v as usize;
        if v + 1 >= self.offsets.len() {
            return &[];
        }
        &self.faces[self.offsets[v] as usize..self.offsets[v + 1] as usize]
    }

    /// Faces sharing at least one vertex with `face` (including `face`
    /// itself, possibly more than once).
    pub fn one_ring<'a>(&'a self, face: &'a [u32; 3]) -> impl Iterator<Item = u32> + 'a {
        face.iter().flat_map(move |&v| self.faces_of(v).iter().copied())
    }
}
