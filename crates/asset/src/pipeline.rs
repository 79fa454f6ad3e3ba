//! Parse, color-map, derive and assemble in one call.

use std::path::Path;

use corelib::Aabb;
use serde::Serialize;

use crate::assemble::{MeshBuffers, VertexMode, assemble};
use crate::derive::{
    Attributes, NormalSource, Precedence, Shading, UvSource, resolve_colors, resolve_normals,
    resolve_uvs, select_scalars,
};
use crate::error::ParseResult;
use crate::legacy::load_legacy_from_path;
use crate::lut::{LookupMode, LookupTable, TableSource};
use crate::mesh::{DataClass, Mesh, ScalarArray};

/// Knobs for one conversion. The defaults reproduce the plain pipeline:
/// shared vertices, active point scalars before cell scalars, nearest-entry
/// lookup and a 256-entry fallback table.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    pub vertex_mode: VertexMode,
    /// Scalar array to color by instead of the active one.
    pub scalars: Option<String>,
    /// Component of a multi-component array used for mapping.
    pub component: usize,
    /// Table to use instead of the one the array names.
    pub lookup_table: Option<String>,
    pub default_table_size: usize,
    /// Overrides the range taken from the scalars.
    pub scalar_range: Option<(f64, f64)>,
    pub precedence: Precedence,
    pub lookup_mode: LookupMode,
    pub uv_source: UvSource,
    /// Geometric normals instead of the up-vector placeholder: smooth point
    /// normals for shared vertices, face normals for duplicated ones.
    pub compute_normals: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            vertex_mode: VertexMode::Shared,
            scalars: None,
            component: 0,
            lookup_table: None,
            default_table_size: LookupTable::DEFAULT_SIZE,
            scalar_range: None,
            precedence: Precedence::Point,
            lookup_mode: LookupMode::Nearest,
            uv_source: UvSource::Auto,
            compute_normals: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorSource {
    Point { array: String },
    Cell { array: String },
    Uniform,
}

/// What a conversion ended up using.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversionReport {
    pub colors: ColorSource,
    pub normals: NormalSource,
    /// Table from the file, `None` when the hue ramp or no table was used.
    pub lookup_table: Option<String>,
    /// A requested table was unusable and the hue ramp stood in.
    pub table_fallback: bool,
    pub scalar_range: Option<(f64, f64)>,
    pub vertex_mode: VertexMode,
    pub bounds: Aabb,
    pub triangles: usize,
    pub parse_warnings: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Conversion {
    pub report: ConversionReport,
    pub buffers: MeshBuffers,
}

/// Loads `path` and converts it. Only parse failures are errors; table and
/// attribute problems degrade to defaults.
pub fn convert_file(path: impl AsRef<Path>, opts: &ConvertOptions) -> ParseResult<Conversion> {
    let mesh = load_legacy_from_path(path)?;
    Ok(convert_mesh(&mesh, opts))
}

pub fn convert_mesh(mesh: &Mesh, opts: &ConvertOptions) -> Conversion {
    let selection = select_scalars(mesh, opts.scalars.as_deref(), opts.precedence);
    if let (Some(name), None) = (&opts.scalars, &selection) {
        log::warn!("Scalar array '{name}' not found; coloring white");
    }

    let component = match selection {
        Some(sel) if opts.component >= sel.values.components() => {
            log::warn!(
                "'{}' has {} components; mapping component 0 instead of {}",
                sel.name,
                sel.values.components(),
                opts.component
            );
            0
        }
        _ => opts.component,
    };

    let needs_table =
        selection.is_some_and(|s| !matches!(s.values, ScalarArray::UInt8Rgba(_)));
    let table_name = if needs_table {
        opts.lookup_table
            .as_deref()
            .or(selection.and_then(|s| s.lookup_table))
    } else {
        None
    };
    let (mut lut, table_source) = LookupTable::resolve(mesh, table_name, opts.default_table_size);

    if needs_table {
        let applied = opts.scalar_range.is_some_and(|(lo, hi)| match lut.set_range(lo, hi) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{err}; using the scalar range instead");
                false
            }
        });
        let array_range = selection.and_then(|s| s.values.range(component));
        if let (false, Some((lo, hi))) = (applied, array_range) {
            if let Err(err) = lut.set_range(lo, hi) {
                log::warn!("{err}; keeping range {:?}", lut.range());
            }
        }
    }

    let colors = resolve_colors(mesh, selection.as_ref(), component, &lut, opts.lookup_mode);
    let shading = opts.compute_normals.then_some(match opts.vertex_mode {
        VertexMode::Shared => Shading::Smooth,
        VertexMode::Duplicated => Shading::Flat,
    });
    let (normals, normal_source) = resolve_normals(mesh, shading);
    let attrs = Attributes {
        uvs: resolve_uvs(mesh, opts.uv_source),
        normals,
        colors,
    };
    let buffers = assemble(mesh, &attrs, opts.vertex_mode);

    let color_source = match selection {
        Some(sel) if sel.class == DataClass::Point => ColorSource::Point {
            array: sel.name.to_string(),
        },
        Some(sel) => ColorSource::Cell {
            array: sel.name.to_string(),
        },
        None => ColorSource::Uniform,
    };
    let (lookup_table, table_fallback) = match table_source {
        _ if !needs_table => (None, false),
        TableSource::File(name) => (Some(name), false),
        TableSource::Default { requested } => (None, requested.is_some()),
    };

    let report = ConversionReport {
        colors: color_source,
        normals: normal_source,
        lookup_table,
        table_fallback,
        scalar_range: needs_table.then(|| lut.range()),
        vertex_mode: opts.vertex_mode,
        bounds: mesh.bounds(),
        triangles: buffers.triangle_count(),
        parse_warnings: mesh.warnings.len(),
    };
    log::info!(
        "Converted '{}': {} vertices, {} triangles, colors {:?}",
        mesh.description,
        buffers.vertices.len(),
        report.triangles,
        report.colors
    );
    Conversion { report, buffers }
}
