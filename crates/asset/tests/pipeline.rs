use std::io::Write;

use asset::derive::Precedence;
use asset::pipeline::ColorSource;
use asset::sample::{SAMPLE_CUBE, write_sample_cube};
use asset::{ConvertOptions, ParseError, VertexMode, convert_file, load_legacy_from_path};
use tempfile::NamedTempFile;

fn temp_mesh(text: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".vtk")
        .tempfile()
        .expect("temp file");
    file.write_all(text.as_bytes()).expect("write mesh");
    file
}

fn cube_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cube.vtk");
    write_sample_cube(&path).expect("write sample");
    (dir, path)
}

#[test]
fn cube_shared_mode_has_twelve_triangles() {
    let (_dir, path) = cube_file();
    let conv = convert_file(&path, &ConvertOptions::default()).expect("convert");
    let b = &conv.buffers;
    assert_eq!(b.triangle_count(), 12);
    assert_eq!(b.vertices.len(), 8);
    b.validate().expect("parallel arrays");
}

#[test]
fn cube_duplicated_mode_colors_each_face_flat() {
    let (_dir, path) = cube_file();
    let opts = ConvertOptions {
        vertex_mode: VertexMode::Duplicated,
        scalars: Some("cell_scalars".into()),
        ..ConvertOptions::default()
    };
    let conv = convert_file(&path, &opts).expect("convert");
    let b = &conv.buffers;
    assert_eq!(b.vertices.len(), 36);
    assert_eq!(b.indices.len(), 36);
    b.validate().expect("parallel arrays");
    assert_eq!(
        conv.report.colors,
        ColorSource::Cell {
            array: "cell_scalars".into()
        }
    );

    for face in b.colors.chunks(6) {
        assert!(face.iter().all(|c| *c == face[0]));
    }
    assert_ne!(b.colors[0], b.colors[6]);

    // Cell normals are flat per face: the front face points to -Z.
    assert!(b.normals[..6].iter().all(|n| n.z == -1.0));
    for t in &b.tangents {
        assert!(t.is_finite());
        assert!((t.length() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn face_attributes_field_colors_by_component() {
    let (_dir, path) = cube_file();
    let opts = ConvertOptions {
        vertex_mode: VertexMode::Duplicated,
        scalars: Some("faceAttributes".into()),
        component: 1,
        ..ConvertOptions::default()
    };
    let conv = convert_file(&path, &opts).expect("convert");
    assert_eq!(conv.report.scalar_range, Some((1.0, 6.0)));
    assert!(matches!(conv.report.colors, ColorSource::Cell { .. }));
}

#[test]
fn short_lookup_table_falls_back_to_default_ramp() {
    let text = SAMPLE_CUBE.replace(
        "0.9 0.6 0.6 1.0\n0.9 0.9 0.9 1.0\n1.0 1.0 1.0 1.0\n",
        "0.9 0.6 0.6 1.0\n",
    );
    let file = temp_mesh(&text);
    let mesh = load_legacy_from_path(file.path()).expect("parse");
    let raw = &mesh.lookup_tables["my_table"];
    assert_eq!((raw.declared, raw.entries.len(), raw.complete), (8, 6, false));

    let conv = convert_file(file.path(), &ConvertOptions::default()).expect("convert");
    assert!(conv.report.table_fallback);
    assert_eq!(conv.report.lookup_table, None);
    // Point 0 holds the minimum scalar: first entry of the blue-to-red ramp.
    let c = conv.buffers.colors[0];
    assert!(c[2] > 0.99 && c[0] < 0.01, "{c:?}");
    // Point 6 holds the maximum: red.
    assert_eq!(conv.buffers.colors[6], [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn cell_precedence_beats_point_scalars() {
    let (_dir, path) = cube_file();
    let opts = ConvertOptions {
        precedence: Precedence::Cell,
        ..ConvertOptions::default()
    };
    let conv = convert_file(&path, &opts).expect("convert");
    assert!(matches!(conv.report.colors, ColorSource::Cell { .. }));
}

#[test]
fn unstructured_hexahedron_exposes_six_faces() {
    let text = "# vtk DataFile Version 3.0
hex
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 8 float
0 0 0 1 0 0 1 1 0 0 1 0
0 0 1 1 0 1 1 1 1 0 1 1
CELLS 1 9
8 0 1 2 3 4 5 6 7
CELL_TYPES 1
12
CELL_DATA 1
SCALARS temperature float 1
LOOKUP_TABLE default
42.0
";
    let file = temp_mesh(text);
    let opts = ConvertOptions {
        vertex_mode: VertexMode::Duplicated,
        compute_normals: true,
        ..ConvertOptions::default()
    };
    let conv = convert_file(file.path(), &opts).expect("convert");
    assert_eq!(conv.report.triangles, 12);
    let b = &conv.buffers;
    assert!(b.colors.iter().all(|c| *c == b.colors[0]));

    // Boundary faces wind outward.
    let centre = corelib::Vec3::splat(0.5);
    for (tri, n) in b.vertices.chunks(3).zip(b.normals.chunks(3)) {
        let mid = (tri[0] + tri[1] + tri[2]) / 3.0;
        assert!((mid - centre).dot(n[0]) > 0.0);
    }
}

#[test]
fn parse_failures_are_typed() {
    let file = temp_mesh("# vtk DataFile Version 3.0\nx\nBINARY\nDATASET POLYDATA\n");
    assert!(matches!(
        convert_file(file.path(), &ConvertOptions::default()),
        Err(ParseError::UnsupportedEncoding { line: 3 })
    ));

    let missing = tempfile::tempdir().expect("temp dir");
    assert!(matches!(
        convert_file(missing.path().join("nope.vtk"), &ConvertOptions::default()),
        Err(ParseError::Io { .. })
    ));
}

#[test]
fn report_serializes_to_json() {
    let (_dir, path) = cube_file();
    let conv = convert_file(&path, &ConvertOptions::default()).expect("convert");
    let json = serde_json::to_value(&conv).expect("json");
    assert_eq!(json["report"]["colors"]["kind"], "point");
    assert_eq!(json["buffers"]["vertices"].as_array().map(Vec::len), Some(8));
}
