//! `POINTS`, polygonal cell blocks and unstructured `CELLS`/`CELL_TYPES`.

use std::collections::HashMap;

use corelib::DVec3;

use super::reader::{excerpt, parse_row};
use super::{Parser, checked_len, count_arg};
use crate::error::{ParseError, ParseResult};
use crate::mesh::{Cell, DatasetKind};

// Cell type ids of the unstructured-grid format.
const VERTEX: i64 = 1;
const POLY_VERTEX: i64 = 2;
const LINE: i64 = 3;
const POLY_LINE: i64 = 4;
const TRIANGLE: i64 = 5;
const TRIANGLE_STRIP: i64 = 6;
const POLYGON: i64 = 7;
const PIXEL: i64 = 8;
const QUAD: i64 = 9;
const TETRA: i64 = 10;
const VOXEL: i64 = 11;
const HEXAHEDRON: i64 = 12;
const WEDGE: i64 = 13;
const PYRAMID: i64 = 14;

/// Outward-facing boundary faces of the linear 3-D cells, as local point ids.
fn solid_faces(cell_type: i64) -> Option<(usize, &'static [&'static [usize]])> {
    const TETRA_FACES: &[&[usize]] = &[&[0, 1, 3], &[1, 2, 3], &[2, 0, 3], &[0, 2, 1]];
    const VOXEL_FACES: &[&[usize]] = &[
        &[0, 4, 6, 2],
        &[1, 3, 7, 5],
        &[0, 1, 5, 4],
        &[2, 6, 7, 3],
        &[0, 2, 3, 1],
        &[4, 5, 7, 6],
    ];
    const HEXAHEDRON_FACES: &[&[usize]] = &[
        &[0, 4, 7, 3],
        &[1, 2, 6, 5],
        &[0, 1, 5, 4],
        &[3, 7, 6, 2],
        &[0, 3, 2, 1],
        &[4, 5, 6, 7],
    ];
    const WEDGE_FACES: &[&[usize]] = &[
        &[0, 1, 2],
        &[3, 5, 4],
        &[0, 3, 4, 1],
        &[1, 4, 5, 2],
        &[2, 5, 3, 0],
    ];
    const PYRAMID_FACES: &[&[usize]] = &[
        &[0, 3, 2, 1],
        &[0, 1, 4],
        &[1, 2, 4],
        &[2, 3, 4],
        &[3, 0, 4],
    ];

    match cell_type {
        TETRA => Some((4, TETRA_FACES)),
        VOXEL => Some((8, VOXEL_FACES)),
        HEXAHEDRON => Some((8, HEXAHEDRON_FACES)),
        WEDGE => Some((6, WEDGE_FACES)),
        PYRAMID => Some((5, PYRAMID_FACES)),
        _ => None,
    }
}

/// Non-negative integral value as an index.
fn as_index(v: f64) -> Option<usize> {
    (v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64).then_some(v as usize)
}

impl Parser<'_> {
    pub(super) fn parse_points(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let n = count_arg(line_no, args, 0, "POINTS")?;
        let wanted = checked_len(line_no, "POINTS", n, 3)?;
        let values = self.read_numbers("POINTS", wanted);
        if values.len() < wanted {
            return Err(ParseError::Truncated {
                block: "POINTS",
                line: line_no,
                expected: n,
                found: values.len() / 3,
            });
        }
        self.mesh.points = values
            .chunks_exact(3)
            .map(|c| DVec3::new(c[0], c[1], c[2]))
            .collect();
        self.saw_points = true;
        Ok(())
    }

    pub(super) fn parse_poly_cells(
        &mut self,
        line_no: usize,
        keyword: &str,
        args: &[&str],
    ) -> ParseResult<()> {
        let block = match keyword {
            "VERTICES" => "VERTICES",
            "LINES" => "LINES",
            "POLYGONS" => "POLYGONS",
            _ => "TRIANGLE_STRIPS",
        };
        let cells = self.read_cells(line_no, block, args)?;
        if self.mesh.kind != DatasetKind::PolyData {
            self.warn(line_no, format!("{block} ignored outside a POLYDATA dataset"));
            return Ok(());
        }
        let target = match block {
            "VERTICES" => &mut self.mesh.verts,
            "LINES" => &mut self.mesh.lines,
            "POLYGONS" => &mut self.mesh.polys,
            _ => &mut self.mesh.strips,
        };
        // Ids are assigned once every block is known.
        target.extend(cells.into_iter().map(|points| Cell::new(0, points)));
        Ok(())
    }

    pub(super) fn parse_grid_cells(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let cells = self.read_cells(line_no, "CELLS", args)?;
        if self.mesh.kind != DatasetKind::UnstructuredGrid {
            self.warn(line_no, "CELLS ignored outside an UNSTRUCTURED_GRID dataset");
            return Ok(());
        }
        self.grid_cells = Some(cells);
        Ok(())
    }

    pub(super) fn parse_cell_types(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let n = count_arg(line_no, args, 0, "CELL_TYPES")?;
        let values = self.read_numbers("CELL_TYPES", n);
        if values.len() < n {
            return Err(ParseError::Truncated {
                block: "CELL_TYPES",
                line: line_no,
                expected: n,
                found: values.len(),
            });
        }
        let types = values.into_iter().map(|v| v as i64).collect();
        self.grid_types = Some((line_no, types));
        Ok(())
    }

    /// Number of cells seen so far, for checking `CELL_DATA` counts.
    pub(super) fn cells_so_far(&self) -> usize {
        match self.mesh.kind {
            DatasetKind::PolyData => {
                self.mesh.verts.len()
                    + self.mesh.lines.len()
                    + self.mesh.polys.len()
                    + self.mesh.strips.len()
            }
            DatasetKind::UnstructuredGrid => self.grid_cells.as_ref().map_or(0, Vec::len),
        }
    }

    /// Reads `<n> <size>` cell rows in either the classic `<count> <ids..>`
    /// layout or the `OFFSETS`/`CONNECTIVITY` layout of version 5 files.
    fn read_cells(
        &mut self,
        line_no: usize,
        block: &'static str,
        args: &[&str],
    ) -> ParseResult<Vec<Vec<u32>>> {
        let n = count_arg(line_no, args, 0, block)?;
        let size = count_arg(line_no, args, 1, block)?;
        if !self.saw_points {
            return Err(ParseError::MissingRequiredBlock { block: "POINTS" });
        }

        let offsets_layout = self
            .lines
            .peek_nonblank()
            .is_some_and(|(_, l)| l.trim_start().starts_with("OFFSETS"));
        if offsets_layout {
            return self.read_offset_cells(block, n, size);
        }

        let points = self.mesh.points.len();
        let mut cells = Vec::with_capacity(n.min(1 << 20));
        let mut total = 0usize;
        for k in 0..n {
            let Some((row_no, line)) = self.lines.next_data_line() else {
                return Err(ParseError::Truncated {
                    block,
                    line: line_no,
                    expected: n,
                    found: k,
                });
            };
            let row = parse_row(line).filter(|r| {
                r.first()
                    .and_then(|&c| as_index(c))
                    .is_some_and(|c| c + 1 == r.len())
                    && r[1..].iter().all(|v| v.fract() == 0.0)
            });
            let Some(row) = row else {
                self.warn(
                    row_no,
                    format!("{block}: skipping malformed cell '{}'", excerpt(line)),
                );
                // Keep the slot so cell data stays aligned.
                cells.push(Vec::new());
                continue;
            };
            total += row.len();
            cells.push(to_point_ids(&row[1..], row_no, points)?);
        }

        if total != size {
            self.warn(
                line_no,
                format!("{block}: declared size {size} but cells hold {total} values"),
            );
        }
        Ok(cells)
    }

    fn read_offset_cells(
        &mut self,
        block: &'static str,
        n_offsets: usize,
        n_conn: usize,
    ) -> ParseResult<Vec<Vec<u32>>> {
        let (_, offsets) = self.read_tagged("OFFSETS", n_offsets)?;
        let (conn_line, connectivity) = self.read_tagged("CONNECTIVITY", n_conn)?;

        let points = self.mesh.points.len();
        let mut cells = Vec::with_capacity(n_offsets.saturating_sub(1));
        for w in offsets.windows(2) {
            let range = as_index(w[0])
                .zip(as_index(w[1]))
                .filter(|(a, b)| a <= b && *b <= connectivity.len());
            let Some((start, end)) = range else {
                return Err(ParseError::layout(
                    conn_line,
                    format!("{block}: offsets {} .. {} do not index CONNECTIVITY", w[0], w[1]),
                ));
            };
            cells.push(to_point_ids(&connectivity[start..end], conn_line, points)?);
        }
        Ok(cells)
    }

    fn read_tagged(&mut self, tag: &'static str, count: usize) -> ParseResult<(usize, Vec<f64>)> {
        let (tag_line, line) = self
            .lines
            .next_nonblank()
            .ok_or(ParseError::MissingRequiredBlock { block: tag })?;
        if !line.trim_start().starts_with(tag) {
            return Err(ParseError::layout(tag_line, format!("expected {tag}")));
        }
        let values = self.read_numbers(tag, count);
        if values.len() < count {
            return Err(ParseError::Truncated {
                block: tag,
                line: tag_line,
                expected: count,
                found: values.len(),
            });
        }
        Ok((tag_line, values))
    }

    /// Assigns cell ids and expands unstructured cells once the file is read.
    pub(super) fn finish_cells(&mut self) -> ParseResult<()> {
        match self.mesh.kind {
            DatasetKind::PolyData => {
                let mesh = &mut self.mesh;
                let all = mesh
                    .verts
                    .iter_mut()
                    .chain(mesh.lines.iter_mut())
                    .chain(mesh.polys.iter_mut())
                    .chain(mesh.strips.iter_mut());
                let mut count = 0;
                for cell in all {
                    cell.id = count;
                    count += 1;
                }
                mesh.cell_count = count;
            }
            DatasetKind::UnstructuredGrid => {
                let cells = self.grid_cells.take().unwrap_or_default();
                let (types_line, types) = match self.grid_types.take() {
                    Some(t) => t,
                    None if cells.is_empty() => (0, Vec::new()),
                    None => {
                        return Err(ParseError::MissingRequiredBlock {
                            block: "CELL_TYPES",
                        });
                    }
                };
                if types.len() != cells.len() {
                    self.warn(
                        types_line,
                        format!(
                            "CELL_TYPES lists {} types for {} cells",
                            types.len(),
                            cells.len()
                        ),
                    );
                }
                self.mesh.cell_count = cells.len();
                self.build_grid(types_line, cells, &types);
            }
        }
        Ok(())
    }

    /// Sorts unstructured cells into the polydata kinds. 3-D cells contribute
    /// their boundary faces; a face shared by two cells is interior and dropped.
    fn build_grid(&mut self, types_line: usize, cells: Vec<Vec<u32>>, types: &[i64]) {
        let mut polys: Vec<(Cell, Option<Vec<u32>>)> = Vec::new();
        let mut face_uses: HashMap<Vec<u32>, usize> = HashMap::new();

        for (id, (points, &cell_type)) in cells.into_iter().zip(types).enumerate() {
            match cell_type {
                VERTEX | POLY_VERTEX => self.mesh.verts.push(Cell::new(id, points)),
                LINE | POLY_LINE => self.mesh.lines.push(Cell::new(id, points)),
                TRIANGLE | POLYGON | QUAD => polys.push((Cell::new(id, points), None)),
                PIXEL if points.len() == 4 => {
                    let loop_order = vec![points[0], points[1], points[3], points[2]];
                    polys.push((Cell::new(id, loop_order), None));
                }
                TRIANGLE_STRIP => self.mesh.strips.push(Cell::new(id, points)),
                _ => match solid_faces(cell_type) {
                    Some((expected, faces)) if points.len() == expected => {
                        for face in faces {
                            let ids: Vec<u32> = face.iter().map(|&i| points[i]).collect();
                            let mut key = ids.clone();
                            key.sort_unstable();
                            *face_uses.entry(key.clone()).or_insert(0) += 1;
                            polys.push((Cell::new(id, ids), Some(key)));
                        }
                    }
                    _ => self.warn(
                        types_line,
                        format!(
                            "skipping cell {id}: type {cell_type} with {} points is not supported",
                            points.len()
                        ),
                    ),
                },
            }
        }

        self.mesh.polys = polys
            .into_iter()
            .filter(|(_, key)| key.as_ref().is_none_or(|k| face_uses[k] == 1))
            .map(|(cell, _)| cell)
            .collect();
    }
}

fn to_point_ids(values: &[f64], line: usize, points: usize) -> ParseResult<Vec<u32>> {
    values
        .iter()
        .map(|&v| match as_index(v) {
            Some(i) if i < points => Ok(i as u32),
            _ if v.fract() != 0.0 => Err(ParseError::layout(
                line,
                format!("point index {v} is not an integer"),
            )),
            _ => Err(ParseError::InvalidIndex {
                line,
                index: v as i64,
                points,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::legacy::load_legacy_from_str;

    fn grid(body: &str) -> String {
        format!("# vtk DataFile Version 2.0\ngrid\nASCII\nDATASET UNSTRUCTURED_GRID\n{body}")
    }

    #[test]
    fn cell_ids_follow_format_order() {
        let src = "# vtk DataFile Version 3.0
mixed
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0 1 0 0 1 1 0 0 1 0
POLYGONS 1 5
4 0 1 2 3
VERTICES 2 4
1 0
1 1
LINES 1 3
2 0 2
";
        let mesh = load_legacy_from_str(src).expect("parse");
        assert_eq!(mesh.verts.iter().map(|c| c.id).collect::<Vec<_>>(), [0, 1]);
        assert_eq!(mesh.lines[0].id, 2);
        assert_eq!(mesh.polys[0].id, 3);
        assert_eq!(mesh.cell_count, 4);
    }

    #[test]
    fn version5_offsets_layout() {
        let src = "# vtk DataFile Version 5.1
quad
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0 1 0 0 1 1 0 0 1 0
POLYGONS 3 6
OFFSETS vtktypeint64
0 3 6
CONNECTIVITY vtktypeint64
0 1 2 0 2 3
";
        let mesh = load_legacy_from_str(src).expect("parse");
        assert_eq!(mesh.polys.len(), 2);
        assert_eq!(mesh.polys[1].points, vec![0, 2, 3]);
    }

    #[test]
    fn malformed_cell_row_keeps_alignment() {
        let src = "# vtk DataFile Version 3.0
x
ASCII
DATASET POLYDATA
POINTS 3 float
0 0 0 1 0 0 0 1 0
POLYGONS 2 8
3 0 1
3 0 1 2
";
        let mesh = load_legacy_from_str(src).expect("parse");
        assert_eq!(mesh.polys.len(), 2);
        assert!(mesh.polys[0].is_empty());
        assert_eq!(mesh.polys[1].id, 1);
        assert_eq!(mesh.warnings.len(), 2);
    }

    #[test]
    fn fractional_index_is_a_malformed_row() {
        let src = "# vtk DataFile Version 3.0
x
ASCII
DATASET POLYDATA
POINTS 3 float
0 0 0 1 0 0 0 1 0
POLYGONS 2 8
3 0 1 2.5
3 0 1 2
";
        let mesh = load_legacy_from_str(src).expect("parse");
        assert!(mesh.polys[0].is_empty());
        assert_eq!(mesh.polys[1].points, vec![0, 1, 2]);
        assert!(mesh.warnings.iter().any(|w| w.line == 8));
    }

    #[test]
    fn fractional_connectivity_is_reported_as_written() {
        let src = "# vtk DataFile Version 5.1
tri
ASCII
DATASET POLYDATA
POINTS 3 float
0 0 0 1 0 0 0 1 0
POLYGONS 2 3
OFFSETS vtktypeint64
0 3
CONNECTIVITY vtktypeint64
0 1.5 2
";
        let err = load_legacy_from_str(src).expect_err("fractional index");
        assert!(
            matches!(&err, ParseError::UnsupportedCellLayout { message, .. } if message.contains("1.5")),
            "{err:?}"
        );
    }

    #[test]
    fn two_tetras_share_an_interior_face() {
        let src = grid(
            "POINTS 5 float
0 0 0 1 0 0 0 1 0 0 0 1 1 1 1
CELLS 2 10
4 0 1 2 3
4 1 2 3 4
CELL_TYPES 2
10
10
",
        );
        let mesh = load_legacy_from_str(&src).expect("parse");
        assert_eq!(mesh.cell_count, 2);
        // 8 faces, one shared pair removed.
        assert_eq!(mesh.polys.len(), 6);
        assert!(mesh.polys.iter().filter(|c| c.id == 0).count() == 3);
    }

    #[test]
    fn grid_pixel_and_line_cells() {
        let src = grid(
            "POINTS 4 float
0 0 0 1 0 0 0 1 0 1 1 0
CELLS 2 8
4 0 1 2 3
2 0 3
CELL_TYPES 2
8
3
",
        );
        let mesh = load_legacy_from_str(&src).expect("parse");
        assert_eq!(mesh.polys[0].points, vec![0, 1, 3, 2]);
        assert_eq!(mesh.lines[0].id, 1);
    }

    #[test]
    fn grid_without_types_is_rejected() {
        let src = grid("POINTS 3 float\n0 0 0 1 0 0 0 1 0\nCELLS 1 4\n3 0 1 2\n");
        assert!(matches!(
            load_legacy_from_str(&src),
            Err(ParseError::MissingRequiredBlock {
                block: "CELL_TYPES"
            })
        ));
    }

    #[test]
    fn cells_before_points_are_rejected() {
        let src = "# vtk DataFile Version 3.0\nx\nASCII\nDATASET POLYDATA\nPOLYGONS 1 4\n3 0 1 2\n";
        assert!(matches!(
            load_legacy_from_str(src),
            Err(ParseError::MissingRequiredBlock { block: "POINTS" })
        ));
    }

    #[test]
    fn truncated_polygon_block() {
        let src = "# vtk DataFile Version 3.0\nx\nASCII\nDATASET POLYDATA\nPOINTS 3 float\n0 0 0 1 0 0 0 1 0\nPOLYGONS 2 8\n3 0 1 2\n";
        assert!(matches!(
            load_legacy_from_str(src),
            Err(ParseError::Truncated {
                block: "POLYGONS",
                expected: 2,
                found: 1,
                ..
            })
        ));
    }
}
