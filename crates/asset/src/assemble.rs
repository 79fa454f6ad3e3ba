//! Flat, parallel output buffers for a rendering host.

use bytemuck::{Pod, Zeroable};
use corelib::color::WHITE;
use corelib::{DVec2, DVec3, Rgba, Vec2, Vec3};
use serde::Serialize;

use crate::derive::{Attributes, Colors, FALLBACK_NORMAL, Normals, triangle_tangent};
use crate::error::BufferError;
use crate::mesh::{Cell, Mesh};

/// How triangles map onto output vertices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexMode {
    /// Output vertices are the mesh points. Per-cell attributes and tangents
    /// of a shared point are those of the last triangle that touches it.
    #[default]
    Shared,
    /// Three fresh vertices per triangle, for hard per-face shading.
    Duplicated,
}

/// Interleaved vertex for direct GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub tangent: [f32; 3],
}

/// Triangle mesh as parallel arrays, all `vertices.len()` long.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeshBuffers {
    pub vertices: Vec<Vec3>,
    /// Triangle list; always a multiple of 3.
    pub indices: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Rgba>,
    pub tangents: Vec<Vec3>,
}

impl MeshBuffers {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks the parallel-array and index invariants.
    pub fn validate(&self) -> Result<(), BufferError> {
        let vertices = self.vertices.len();
        let lengths = [
            ("normals", self.normals.len()),
            ("uvs", self.uvs.len()),
            ("colors", self.colors.len()),
            ("tangents", self.tangents.len()),
        ];
        for (buffer, len) in lengths {
            if len != vertices {
                return Err(BufferError::LengthMismatch {
                    buffer,
                    len,
                    vertices,
                });
            }
        }
        if self.indices.len() % 3 != 0 {
            return Err(BufferError::PartialTriangle(self.indices.len()));
        }
        match self.indices.iter().find(|&&i| i as usize >= vertices) {
            Some(&index) => Err(BufferError::IndexOutOfRange { index, vertices }),
            None => Ok(()),
        }
    }

    /// Packs the parallel arrays into one vertex buffer.
    pub fn interleaved(&self) -> Vec<PackedVertex> {
        (0..self.vertices.len())
            .map(|i| PackedVertex {
                position: self.vertices[i].to_array(),
                normal: self.normals.get(i).map_or([0.0; 3], |n| n.to_array()),
                uv: self.uvs.get(i).map_or([0.0; 2], |uv| uv.to_array()),
                color: self.colors.get(i).copied().unwrap_or(WHITE),
                tangent: self.tangents.get(i).map_or([0.0; 3], |t| t.to_array()),
            })
            .collect()
    }

    /// Raw bytes of [`Self::interleaved`].
    pub fn interleaved_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.interleaved()).to_vec()
    }
}

/// Fan-triangulates every polygon and lays out the attribute buffers.
/// Cells with fewer than three points produce nothing.
pub fn assemble(mesh: &Mesh, attrs: &Attributes, mode: VertexMode) -> MeshBuffers {
    let out = match mode {
        VertexMode::Shared => assemble_shared(mesh, attrs),
        VertexMode::Duplicated => assemble_duplicated(mesh, attrs),
    };
    log::debug!(
        "Assembled {} vertices, {} triangles ({mode:?})",
        out.vertices.len(),
        out.triangle_count()
    );
    out
}

/// Triangles of every polygon with their polygon index and cell. Triangles
/// that reference missing points are dropped.
fn triangles(mesh: &Mesh) -> impl Iterator<Item = (usize, &Cell, [u32; 3])> + '_ {
    let points = mesh.points.len();
    mesh.polys.iter().enumerate().flat_map(move |(poly, cell)| {
        cell.fan().filter_map(move |tri| {
            if tri.iter().all(|&i| (i as usize) < points) {
                Some((poly, cell, tri))
            } else {
                log::warn!("Cell {} references a missing point; triangle skipped", cell.id);
                None
            }
        })
    })
}

fn tangent_of(mesh: &Mesh, uvs: &[DVec2], tri: [u32; 3]) -> DVec3 {
    let p = tri.map(|i| mesh.points[i as usize]);
    let uv = tri.map(|i| uvs.get(i as usize).copied().unwrap_or(DVec2::ZERO));
    triangle_tangent(p, uv)
}

fn normal_at(normals: &Normals, poly: usize, cell: &Cell, point: u32) -> DVec3 {
    let found = match normals {
        Normals::PerPoint(n) => n.get(point as usize),
        Normals::PerCell(n) => n.get(cell.id),
        Normals::PerPolygon(n) => n.get(poly),
        Normals::Uniform(n) => Some(n),
    };
    found.copied().unwrap_or(FALLBACK_NORMAL)
}

fn color_at(colors: &Colors, cell: &Cell, point: u32) -> Rgba {
    let found = match colors {
        Colors::PerPoint(c) => c.get(point as usize),
        Colors::PerCell(c) => c.get(cell.id),
        Colors::Uniform(c) => Some(c),
    };
    found.copied().unwrap_or(WHITE)
}

fn assemble_shared(mesh: &Mesh, attrs: &Attributes) -> MeshBuffers {
    let n = mesh.points.len();
    let mut normals: Vec<Vec3> = (0..n)
        .map(|i| match &attrs.normals {
            Normals::PerPoint(v) => v.get(i).copied().unwrap_or(FALLBACK_NORMAL),
            Normals::Uniform(u) => *u,
            _ => FALLBACK_NORMAL,
        })
        .map(|v| v.as_vec3())
        .collect();
    let mut colors: Vec<Rgba> = (0..n)
        .map(|i| match &attrs.colors {
            Colors::PerPoint(c) => c.get(i).copied().unwrap_or(WHITE),
            Colors::Uniform(c) => *c,
            Colors::PerCell(_) => WHITE,
        })
        .collect();
    let mut tangents = vec![Vec3::X; n];
    let mut indices = Vec::with_capacity(mesh.triangle_count() * 3);

    for (poly, cell, tri) in triangles(mesh) {
        let tangent = tangent_of(mesh, &attrs.uvs, tri).as_vec3();
        for v in tri {
            let i = v as usize;
            tangents[i] = tangent;
            normals[i] = normal_at(&attrs.normals, poly, cell, v).as_vec3();
            colors[i] = color_at(&attrs.colors, cell, v);
        }
        indices.extend_from_slice(&tri);
    }

    MeshBuffers {
        vertices: mesh.points.iter().map(|p| p.as_vec3()).collect(),
        indices,
        normals,
        uvs: (0..n)
            .map(|i| attrs.uvs.get(i).copied().unwrap_or(DVec2::ZERO).as_vec2())
            .collect(),
        colors,
        tangents,
    }
}

fn assemble_duplicated(mesh: &Mesh, attrs: &Attributes) -> MeshBuffers {
    let cap = mesh.triangle_count() * 3;
    let mut out = MeshBuffers {
        vertices: Vec::with_capacity(cap),
        indices: Vec::with_capacity(cap),
        normals: Vec::with_capacity(cap),
        uvs: Vec::with_capacity(cap),
        colors: Vec::with_capacity(cap),
        tangents: Vec::with_capacity(cap),
    };

    for (poly, cell, tri) in triangles(mesh) {
        let tangent = tangent_of(mesh, &attrs.uvs, tri).as_vec3();
        for v in tri {
            let i = v as usize;
            out.indices.push(out.vertices.len() as u32);
            out.vertices.push(mesh.points[i].as_vec3());
            out.normals.push(normal_at(&attrs.normals, poly, cell, v).as_vec3());
            out.uvs.push(attrs.uvs.get(i).copied().unwrap_or(DVec2::ZERO).as_vec2());
            out.colors.push(color_at(&attrs.colors, cell, v));
            out.tangents.push(tangent);
        }
    }
    out
}
