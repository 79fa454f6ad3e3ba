//! Attributes the host needs but the file may not carry: UVs, normals,
//! tangents and scalar-mapped colors.

use corelib::color::{WHITE, rgba_from_u8};
use corelib::{DVec2, DVec3, Rgba};

use crate::lut::{LookupMode, LookupTable};
use crate::mesh::{Cell, DataClass, Mesh, ScalarArray};

/// Placeholder normal when neither the file nor the caller provides one.
/// It carries no geometric meaning.
pub const FALLBACK_NORMAL: DVec3 = DVec3::Y;

/// `|det|` below which a triangle's UV mapping is treated as degenerate.
pub const UV_DET_EPSILON: f64 = 1e-4;

/// Which data class wins when both carry scalars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precedence {
    #[default]
    Point,
    Cell,
}

impl Precedence {
    fn order(self) -> [DataClass; 2] {
        match self {
            Self::Point => [DataClass::Point, DataClass::Cell],
            Self::Cell => [DataClass::Cell, DataClass::Point],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvSource {
    /// File texture coordinates when present, planar projection otherwise.
    #[default]
    Auto,
    Planar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalSource {
    PointData,
    CellData,
    /// Area-weighted average of adjacent face normals.
    ComputedPoint,
    /// One normal per polygon.
    ComputedFace,
    Fallback,
}

/// Shape of computed normals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Per point, blending the faces around it.
    Smooth,
    /// Per polygon.
    Flat,
}

/// Normals in the shape they were found.
#[derive(Clone, Debug, PartialEq)]
pub enum Normals {
    /// One per point.
    PerPoint(Vec<DVec3>),
    /// Indexed by cell id.
    PerCell(Vec<DVec3>),
    /// Indexed by position in [`Mesh::polys`].
    PerPolygon(Vec<DVec3>),
    Uniform(DVec3),
}

/// Colors in the shape they were mapped.
#[derive(Clone, Debug, PartialEq)]
pub enum Colors {
    PerPoint(Vec<Rgba>),
    /// Indexed by cell id.
    PerCell(Vec<Rgba>),
    Uniform(Rgba),
}

/// Everything the assembler needs besides geometry.
#[derive(Clone, Debug)]
pub struct Attributes {
    /// One per point.
    pub uvs: Vec<DVec2>,
    pub normals: Normals,
    pub colors: Colors,
}

/// A scalar array chosen for coloring, with the class it is indexed by.
#[derive(Clone, Copy, Debug)]
pub struct ScalarSelection<'a> {
    pub class: DataClass,
    pub name: &'a str,
    pub values: &'a ScalarArray,
    /// Table named by the array itself.
    pub lookup_table: Option<&'a str>,
}

/// Bounding-box projection onto the XY plane. A flat axis maps to 0.
pub fn planar_uvs(points: &[DVec3]) -> Vec<DVec2> {
    if points.is_empty() {
        return Vec::new();
    }
    let bounds = corelib::Aabb::from_points(points.iter());
    let size = bounds.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        log::debug!("Degenerate UV axis (extent {:.3} x {:.3})", size.x, size.y);
    }
    let axis = |v: f64, min: f64, extent: f64| {
        if extent > 0.0 { (v - min) / extent } else { 0.0 }
    };
    points
        .iter()
        .map(|p| {
            DVec2::new(
                axis(p.x, bounds.min.x, size.x),
                axis(p.y, bounds.min.y, size.y),
            )
        })
        .collect()
}

/// Active point texture coordinates, if they cover every point with at
/// least two components.
pub fn texture_uvs(mesh: &Mesh) -> Option<Vec<DVec2>> {
    let tcoords = mesh.point_data.tcoords()?;
    let values = &tcoords.values;
    if values.components() < 2 || values.tuple_count() < mesh.points.len() {
        log::debug!(
            "Texture coordinates '{}' do not cover the mesh; projecting instead",
            tcoords.name
        );
        return None;
    }
    (0..mesh.points.len())
        .map(|i| Some(DVec2::new(values.component(i, 0)?, values.component(i, 1)?)))
        .collect()
}

pub fn resolve_uvs(mesh: &Mesh, source: UvSource) -> Vec<DVec2> {
    match source {
        UvSource::Auto => texture_uvs(mesh).unwrap_or_else(|| planar_uvs(&mesh.points)),
        UvSource::Planar => planar_uvs(&mesh.points),
    }
}

/// Unit normal of a polygon by Newell's method; `None` when it has no area.
pub fn face_normal(points: &[DVec3], cell: &Cell) -> Option<DVec3> {
    newell(points, cell)?.try_normalize()
}

/// Newell vector of a polygon, twice its area in length.
fn newell(points: &[DVec3], cell: &Cell) -> Option<DVec3> {
    let ring: Vec<DVec3> = cell
        .points
        .iter()
        .map(|&i| points.get(i as usize).copied())
        .collect::<Option<_>>()?;
    let mut n = DVec3::ZERO;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    Some(n)
}

/// Unit point normals summed from the area-weighted normals of every
/// polygon using the point. Points on no polygon get [`FALLBACK_NORMAL`].
pub fn point_normals(points: &[DVec3], polys: &[Cell]) -> Vec<DVec3> {
    let mut sums = vec![DVec3::ZERO; points.len()];
    for cell in polys {
        let Some(n) = newell(points, cell) else {
            continue;
        };
        for &i in &cell.points {
            sums[i as usize] += n;
        }
    }
    sums.into_iter()
        .map(|n| n.try_normalize().unwrap_or(FALLBACK_NORMAL))
        .collect()
}

/// Point normals, then cell normals, then normals computed with `compute`
/// shading, then [`FALLBACK_NORMAL`].
pub fn resolve_normals(mesh: &Mesh, compute: Option<Shading>) -> (Normals, NormalSource) {
    if let Some(n) = mesh.point_data.normals() {
        if let Some(v) = tuples3(&n.values, mesh.points.len()) {
            return (Normals::PerPoint(v), NormalSource::PointData);
        }
        log::warn!("Point normals '{}' do not cover every point; ignored", n.name);
    }
    if let Some(n) = mesh.cell_data.normals() {
        if let Some(v) = tuples3(&n.values, mesh.cell_count) {
            return (Normals::PerCell(v), NormalSource::CellData);
        }
        log::warn!("Cell normals '{}' do not cover every cell; ignored", n.name);
    }
    match compute {
        Some(Shading::Smooth) => (
            Normals::PerPoint(point_normals(&mesh.points, &mesh.polys)),
            NormalSource::ComputedPoint,
        ),
        Some(Shading::Flat) => {
            let normals = mesh
                .polys
                .iter()
                .map(|c| face_normal(&mesh.points, c).unwrap_or(FALLBACK_NORMAL))
                .collect();
            (Normals::PerPolygon(normals), NormalSource::ComputedFace)
        }
        None => (Normals::Uniform(FALLBACK_NORMAL), NormalSource::Fallback),
    }
}

fn tuples3(values: &ScalarArray, count: usize) -> Option<Vec<DVec3>> {
    if values.components() < 3 {
        return None;
    }
    (0..count).map(|i| values.tuple3(i)).collect()
}

/// Picks the scalar array used for coloring.
///
/// With a `name`, point data, cell data and field data are searched in
/// precedence order. Without one, the active scalars of each class are tried
/// in precedence order. Arrays too short for their class are skipped.
pub fn select_scalars<'a>(
    mesh: &'a Mesh,
    name: Option<&str>,
    precedence: Precedence,
) -> Option<ScalarSelection<'a>> {
    let needed = |class| tuples_for(mesh, class);

    for class in precedence.order() {
        let set = match class {
            DataClass::Point => &mesh.point_data,
            DataClass::Cell => &mesh.cell_data,
        };
        let array = match name {
            Some(name) => set.get(name),
            None => set.scalars(),
        };
        let Some(array) = array else { continue };
        if array.values.tuple_count() < needed(class) {
            log::warn!(
                "Scalars '{}' hold {} tuples, {} needed; ignored",
                array.name,
                array.values.tuple_count(),
                needed(class)
            );
            continue;
        }
        return Some(ScalarSelection {
            class,
            name: &array.name,
            values: &array.values,
            lookup_table: array.lookup_table.as_deref(),
        });
    }

    let field = mesh.field_data.get(name?)?;
    let tuples = field.values.tuple_count();
    let mut classes = precedence.order();
    if field.association == Some(DataClass::Cell) {
        classes = [DataClass::Cell, DataClass::Point];
    } else if field.association == Some(DataClass::Point) {
        classes = [DataClass::Point, DataClass::Cell];
    }
    let Some(class) = classes.into_iter().find(|&c| needed(c) > 0 && tuples == needed(c)) else {
        log::warn!(
            "Field array '{}' has {tuples} tuples, matching neither points nor cells",
            field.name
        );
        return None;
    };
    Some(ScalarSelection {
        class,
        name: &field.name,
        values: &field.values,
        lookup_table: None,
    })
}

fn tuples_for(mesh: &Mesh, class: DataClass) -> usize {
    match class {
        DataClass::Point => mesh.points.len(),
        DataClass::Cell => mesh.cell_count,
    }
}

/// One color per tuple. Byte colors are used as they are; numeric scalars
/// go through `lut` using `component`.
pub fn map_scalars(
    values: &ScalarArray,
    count: usize,
    component: usize,
    lut: &LookupTable,
    mode: LookupMode,
) -> Vec<Rgba> {
    if let ScalarArray::UInt8Rgba(colors) = values {
        return colors.iter().take(count).map(|&c| rgba_from_u8(c)).collect();
    }
    (0..count)
        .map(|i| {
            values
                .component(i, component)
                .map_or(lut.nan_color(), |v| lut.map(v, mode))
        })
        .collect()
}

/// Colors for a selection, or uniform white without one.
pub fn resolve_colors(
    mesh: &Mesh,
    selection: Option<&ScalarSelection<'_>>,
    component: usize,
    lut: &LookupTable,
    mode: LookupMode,
) -> Colors {
    let Some(sel) = selection else {
        return Colors::Uniform(WHITE);
    };
    match sel.class {
        DataClass::Point => {
            Colors::PerPoint(map_scalars(sel.values, mesh.points.len(), component, lut, mode))
        }
        DataClass::Cell => {
            Colors::PerCell(map_scalars(sel.values, mesh.cell_count, component, lut, mode))
        }
    }
}

/// Tangent of one triangle from its positions and UVs.
///
/// A near-singular UV mapping uses a unit scale factor; a result that
/// cannot be normalized becomes +X. The result is always unit length.
pub fn triangle_tangent(p: [DVec3; 3], uv: [DVec2; 3]) -> DVec3 {
    let edge1 = p[1] - p[0];
    let edge2 = p[2] - p[0];
    let d1 = uv[1] - uv[0];
    let d2 = uv[2] - uv[0];
    let det = d1.x * d2.y - d2.x * d1.y;
    let f = if det.abs() < UV_DET_EPSILON {
        log::debug!("Degenerate UV determinant {det:e}");
        1.0
    } else {
        1.0 / det
    };
    (f * (d2.y * edge1 - d1.y * edge2))
        .try_normalize()
        .unwrap_or(DVec3::X)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ArrayRole, DataArray, FieldArray};
    use corelib::dvec3;

    fn quad() -> Mesh {
        Mesh::from_polygons(
            vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(2.0, 0.0, 0.0),
                dvec3(2.0, 1.0, 0.0),
                dvec3(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    fn scalars(name: &str, values: Vec<f64>) -> DataArray {
        DataArray {
            name: name.into(),
            role: ArrayRole::Scalars,
            values: ScalarArray::Float {
                components: 1,
                values,
            },
            lookup_table: None,
        }
    }

    #[test]
    fn planar_uvs_span_the_unit_square() {
        let uvs = planar_uvs(&quad().points);
        assert_eq!(uvs[0], DVec2::ZERO);
        assert_eq!(uvs[2], DVec2::ONE);
        assert_eq!(uvs[1], DVec2::new(1.0, 0.0));
    }

    #[test]
    fn flat_axis_maps_to_zero() {
        let pts = [dvec3(1.0, 0.0, 0.0), dvec3(1.0, 4.0, 0.0)];
        let uvs = planar_uvs(&pts);
        assert!(uvs.iter().all(|uv| uv.x == 0.0 && uv.is_finite()));
        assert_eq!(uvs[1].y, 1.0);
    }

    #[test]
    fn file_texture_coordinates_win_in_auto_mode() {
        let mut mesh = quad();
        mesh.point_data.insert(DataArray {
            name: "uv".into(),
            role: ArrayRole::TextureCoords,
            values: ScalarArray::Float {
                components: 2,
                values: vec![0.5; 8],
            },
            lookup_table: None,
        });
        assert_eq!(resolve_uvs(&mesh, UvSource::Auto)[3], DVec2::splat(0.5));
        assert_eq!(resolve_uvs(&mesh, UvSource::Planar)[3], DVec2::new(0.0, 1.0));
    }

    #[test]
    fn normals_fall_back_to_up() {
        let (normals, source) = resolve_normals(&quad(), None);
        assert_eq!(normals, Normals::Uniform(DVec3::Y));
        assert_eq!(source, NormalSource::Fallback);
    }

    #[test]
    fn computed_normals_follow_winding() {
        let (normals, source) = resolve_normals(&quad(), Some(Shading::Flat));
        assert_eq!(source, NormalSource::ComputedFace);
        assert_eq!(normals, Normals::PerPolygon(vec![DVec3::Z]));
    }

    #[test]
    fn smooth_normals_blend_shared_points() {
        // A flat quad (+Z) folded along the x axis onto a wall (+Y).
        let mesh = Mesh::from_polygons(
            vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 0.0, 0.0),
                dvec3(1.0, 1.0, 0.0),
                dvec3(0.0, 1.0, 0.0),
                dvec3(0.0, 0.0, 1.0),
                dvec3(1.0, 0.0, 1.0),
            ],
            vec![vec![0, 1, 2, 3], vec![1, 0, 4, 5]],
        );
        let (normals, source) = resolve_normals(&mesh, Some(Shading::Smooth));
        assert_eq!(source, NormalSource::ComputedPoint);
        let Normals::PerPoint(n) = normals else {
            panic!("expected point normals, got {normals:?}");
        };
        let edge = dvec3(0.0, 1.0, 1.0).normalize();
        assert!(n[0].abs_diff_eq(edge, 1e-12));
        assert!(n[1].abs_diff_eq(edge, 1e-12));
        assert_eq!(n[2], DVec3::Z);
        assert_eq!(n[4], DVec3::Y);
    }

    #[test]
    fn isolated_points_get_the_fallback() {
        let mut mesh = quad();
        mesh.points.push(dvec3(5.0, 5.0, 5.0));
        let n = point_normals(&mesh.points, &mesh.polys);
        assert_eq!(n[0], DVec3::Z);
        assert_eq!(n[4], FALLBACK_NORMAL);
    }

    #[test]
    fn point_normals_win_over_cell_normals() {
        let mut mesh = quad();
        mesh.point_data.insert(DataArray {
            name: "pn".into(),
            role: ArrayRole::Normals,
            values: ScalarArray::Float {
                components: 3,
                values: [0.0, 0.0, 1.0].repeat(4),
            },
            lookup_table: None,
        });
        mesh.cell_data.insert(DataArray {
            name: "cn".into(),
            role: ArrayRole::Normals,
            values: ScalarArray::Float {
                components: 3,
                values: vec![0.0, 0.0, -1.0],
            },
            lookup_table: None,
        });
        let (normals, source) = resolve_normals(&mesh, Some(Shading::Smooth));
        assert_eq!(source, NormalSource::PointData);
        assert_eq!(normals, Normals::PerPoint(vec![DVec3::Z; 4]));
    }

    #[test]
    fn cell_normals_are_used_before_computing() {
        let mut mesh = quad();
        mesh.cell_data.insert(DataArray {
            name: "n".into(),
            role: ArrayRole::Normals,
            values: ScalarArray::Float {
                components: 3,
                values: vec![0.0, 0.0, -1.0],
            },
            lookup_table: None,
        });
        let (normals, source) = resolve_normals(&mesh, Some(Shading::Flat));
        assert_eq!(source, NormalSource::CellData);
        assert_eq!(normals, Normals::PerCell(vec![DVec3::NEG_Z]));
    }

    #[test]
    fn point_scalars_win_by_default() {
        let mut mesh = quad();
        mesh.point_data.insert(scalars("p", vec![0.0, 1.0, 2.0, 3.0]));
        mesh.cell_data.insert(scalars("c", vec![5.0]));

        let sel = select_scalars(&mesh, None, Precedence::Point).expect("selection");
        assert_eq!((sel.class, sel.name), (DataClass::Point, "p"));
        let sel = select_scalars(&mesh, None, Precedence::Cell).expect("selection");
        assert_eq!((sel.class, sel.name), (DataClass::Cell, "c"));
        let sel = select_scalars(&mesh, Some("c"), Precedence::Point).expect("by name");
        assert_eq!(sel.class, DataClass::Cell);
    }

    #[test]
    fn short_point_scalars_are_skipped() {
        let mut mesh = quad();
        mesh.point_data.insert(scalars("p", vec![0.0, 1.0]));
        assert!(select_scalars(&mesh, None, Precedence::Point).is_none());
    }

    #[test]
    fn field_array_sized_like_cells_is_cell_scalars() {
        let mut mesh = quad();
        mesh.field_data.insert(
            "faceAttributes".into(),
            FieldArray {
                name: "faceAttributes".into(),
                association: None,
                values: ScalarArray::Float {
                    components: 2,
                    values: vec![0.25, 0.75],
                },
            },
        );
        let sel = select_scalars(&mesh, Some("faceAttributes"), Precedence::Point)
            .expect("field selection");
        assert_eq!(sel.class, DataClass::Cell);
        assert_eq!(sel.values.component(0, 0), Some(0.25));
    }

    #[test]
    fn byte_colors_bypass_the_table() {
        let lut = LookupTable::build_default(4).expect("lut");
        let values = ScalarArray::UInt8Rgba(vec![[255, 0, 0, 255]]);
        let colors = map_scalars(&values, 1, 0, &lut, LookupMode::Nearest);
        assert_eq!(colors, vec![[1.0, 0.0, 0.0, 1.0]]);
    }

    #[test]
    fn no_scalars_means_white() {
        let lut = LookupTable::build_default(4).expect("lut");
        let colors = resolve_colors(&quad(), None, 0, &lut, LookupMode::Nearest);
        assert_eq!(colors, Colors::Uniform(WHITE));
    }

    #[test]
    fn tangent_follows_u_direction() {
        let p = [dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0), dvec3(0.0, 1.0, 0.0)];
        let uv = [DVec2::ZERO, DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)];
        let t = triangle_tangent(p, uv);
        assert!((t - DVec3::X).length() < 1e-9);
    }

    #[test]
    fn degenerate_uvs_still_give_unit_tangent() {
        let p = [dvec3(0.0, 0.0, 0.0), dvec3(0.0, 1.0, 0.0), dvec3(0.0, 0.0, 1.0)];
        let uv = [DVec2::ZERO; 3];
        let t = triangle_tangent(p, uv);
        assert!(t.is_finite());
        assert!((t.length() - 1.0).abs() < 1e-9);

        let uv = [DVec2::ZERO, DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0)];
        let t = triangle_tangent(p, uv);
        assert!((t.length() - 1.0).abs() < 1e-9);
    }
}
