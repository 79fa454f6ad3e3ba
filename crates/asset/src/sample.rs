//! Sample cube dataset: eight points, six quads, cell scalars and normals,
//! a cell `FIELD` block, two point scalar arrays and an 8-entry table.

use std::path::Path;

pub const SAMPLE_CUBE: &str = "# vtk DataFile Version 2.0
Cube example
ASCII
DATASET POLYDATA
POINTS 8 float
0.0 0.0 0.0
1.0 0.0 0.0
1.0 1.0 0.0
0.0 1.0 0.0
0.0 0.0 1.0
1.0 0.0 1.0
1.0 1.0 1.0
0.0 1.0 1.0
POLYGONS 6 30
4 0 1 2 3
4 4 5 6 7
4 0 1 5 4
4 2 3 7 6
4 0 4 7 3
4 1 2 6 5
CELL_DATA 6
SCALARS cell_scalars int 1
LOOKUP_TABLE default
0
1
2
3
4
5
NORMALS cell_normals float
0 0 -1
0 0 1
0 -1 0
0 1 0
-1 0 0
1 0 0
FIELD FieldData 2
cellIds 1 6 int
0 1 2 3 4 5
faceAttributes 2 6 float
0.0 1.0 1.0 2.0 2.0 3.0 3.0 4.0 4.0 5.0 5.0 6.0
POINT_DATA 8
SCALARS custom_table_scalars float 1
LOOKUP_TABLE my_table
0.0
0.5
0.5
0.5
0.5
0.5
1.0
0.5
SCALARS default_table_scalars float 1
LOOKUP_TABLE default
0.0
0.5
0.5
0.5
0.5
0.5
1.0
0.5
LOOKUP_TABLE my_table 8
0.0 0.0 0.0 1.0
0.3 0.0 0.0 1.0
0.6 0.0 0.0 1.0
0.9 0.0 0.0 1.0
0.9 0.3 0.3 1.0
0.9 0.6 0.6 1.0
0.9 0.9 0.9 1.0
1.0 1.0 1.0 1.0
";

/// Writes [`SAMPLE_CUBE`] to `path`.
pub fn write_sample_cube(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    std::fs::write(path, SAMPLE_CUBE)?;
    log::info!("Wrote sample cube to {}", path.display());
    Ok(())
}
