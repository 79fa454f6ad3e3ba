//! CPU-side mesh representation produced by the legacy parser.

use std::collections::BTreeMap;
use std::fmt;

use corelib::{Aabb, DVec3, Rgba};

/// Which geometry entity an attribute array is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataClass {
    Point,
    Cell,
}

/// Dataset kinds accepted by the parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatasetKind {
    #[default]
    PolyData,
    UnstructuredGrid,
}

/// One cell: ordered point ids plus the id its cell data is stored under.
///
/// Polygons derived from a 3-D unstructured cell share the parent's `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub id: usize,
    pub points: Vec<u32>,
}

impl Cell {
    pub fn new(id: usize, points: Vec<u32>) -> Self {
        Self { id, points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fan triangulation from the first point: `N - 2` triangles for `N >= 3`,
    /// nothing for degenerate cells.
    pub fn fan(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let p = &self.points;
        (1..p.len().saturating_sub(1)).map(move |i| [p[0], p[i], p[i + 1]])
    }
}

/// Typed storage for attribute values, resolved once while parsing.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarArray {
    /// Direct colors (`COLOR_SCALARS`, or `unsigned_char` scalars with 3/4 components).
    UInt8Rgba(Vec<[u8; 4]>),
    Float { components: usize, values: Vec<f64> },
    Int { components: usize, values: Vec<i64> },
}

impl ScalarArray {
    pub fn components(&self) -> usize {
        match self {
            Self::UInt8Rgba(_) => 4,
            Self::Float { components, .. } | Self::Int { components, .. } => *components,
        }
    }

    pub fn tuple_count(&self) -> usize {
        match self {
            Self::UInt8Rgba(v) => v.len(),
            Self::Float { components, values } => values.len() / (*components).max(1),
            Self::Int { components, values } => values.len() / (*components).max(1),
        }
    }

    /// Value of one component as `f64`. Byte colors are reported in `[0, 255]`.
    pub fn component(&self, tuple: usize, comp: usize) -> Option<f64> {
        let n = self.components();
        if comp >= n || tuple >= self.tuple_count() {
            return None;
        }
        match self {
            Self::UInt8Rgba(v) => Some(f64::from(v[tuple][comp])),
            Self::Float { values, .. } => values.get(tuple * n + comp).copied(),
            Self::Int { values, .. } => values.get(tuple * n + comp).map(|&x| x as f64),
        }
    }

    /// First three components as a vector (normals, vectors).
    pub fn tuple3(&self, tuple: usize) -> Option<DVec3> {
        Some(DVec3::new(
            self.component(tuple, 0)?,
            self.component(tuple, 1)?,
            self.component(tuple, 2)?,
        ))
    }

    /// Min/max of the finite values of one component.
    pub fn range(&self, comp: usize) -> Option<(f64, f64)> {
        (0..self.tuple_count())
            .filter_map(|t| self.component(t, comp))
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// What a named array was declared as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayRole {
    Scalars,
    ColorScalars,
    Normals,
    TextureCoords,
    Vectors,
    Tensors,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub role: ArrayRole,
    pub values: ScalarArray,
    /// Table named on the `LOOKUP_TABLE` line after `SCALARS`; `None` for `default`.
    pub lookup_table: Option<String>,
}

/// Point or cell attributes with the format's notion of "active" arrays.
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    arrays: Vec<DataArray>,
    scalars: Option<usize>,
    normals: Option<usize>,
    tcoords: Option<usize>,
}

impl AttributeSet {
    /// Adds an array. The first array of each role becomes active; a later
    /// array with an existing name replaces it in place.
    pub fn insert(&mut self, array: DataArray) {
        let idx = match self.arrays.iter().position(|a| a.name == array.name) {
            Some(i) => {
                self.arrays[i] = array;
                i
            }
            None => {
                self.arrays.push(array);
                self.arrays.len() - 1
            }
        };
        let slot = match self.arrays[idx].role {
            ArrayRole::Scalars | ArrayRole::ColorScalars => &mut self.scalars,
            ArrayRole::Normals => &mut self.normals,
            ArrayRole::TextureCoords => &mut self.tcoords,
            ArrayRole::Vectors | ArrayRole::Tensors => return,
        };
        slot.get_or_insert(idx);
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn scalars(&self) -> Option<&DataArray> {
        self.scalars.map(|i| &self.arrays[i])
    }

    pub fn normals(&self) -> Option<&DataArray> {
        self.normals.map(|i| &self.arrays[i])
    }

    pub fn tcoords(&self) -> Option<&DataArray> {
        self.tcoords.map(|i| &self.arrays[i])
    }

    pub fn arrays(&self) -> &[DataArray] {
        &self.arrays
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

/// Named auxiliary array from a `FIELD` block; its shape is independent of
/// the point and cell counts.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldArray {
    pub name: String,
    /// Data section the block appeared in, `None` at dataset level.
    pub association: Option<DataClass>,
    pub values: ScalarArray,
}

/// A `LOOKUP_TABLE <name> <count>` block as read from the file.
#[derive(Clone, Debug, PartialEq)]
pub struct RawLookupTable {
    pub name: String,
    pub declared: usize,
    pub entries: Vec<Rgba>,
    /// `false` on a short read or any malformed row.
    pub complete: bool,
}

/// A recoverable, row-level problem found while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Geometry and attributes of one legacy dataset.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub kind: DatasetKind,
    pub description: String,
    pub points: Vec<DVec3>,
    pub verts: Vec<Cell>,
    pub lines: Vec<Cell>,
    pub polys: Vec<Cell>,
    pub strips: Vec<Cell>,
    /// Number of cells the cell data is indexed by.
    pub cell_count: usize,
    pub point_data: AttributeSet,
    pub cell_data: AttributeSet,
    pub field_data: BTreeMap<String, FieldArray>,
    pub lookup_tables: BTreeMap<String, RawLookupTable>,
    pub warnings: Vec<ParseWarning>,
}

impl Mesh {
    /// Polygon-only mesh; cell ids follow polygon order.
    pub fn from_polygons(points: Vec<DVec3>, polys: Vec<Vec<u32>>) -> Self {
        let polys: Vec<Cell> = polys
            .into_iter()
            .enumerate()
            .map(|(id, p)| Cell::new(id, p))
            .collect();
        Self {
            cell_count: polys.len(),
            points,
            polys,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.points.iter())
    }

    /// Triangles produced by fan-triangulating every polygon.
    pub fn triangle_count(&self) -> usize {
        self.polys.iter().map(|c| c.len().saturating_sub(2)).sum()
    }
}
