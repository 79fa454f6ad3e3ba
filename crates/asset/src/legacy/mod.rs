//! Reader for the legacy line-oriented mesh format (`# vtk DataFile Version x.y`).
//!
//! Only the ASCII encoding is supported. Geometry blocks are strict: a short
//! or out-of-range block fails the whole file with a [`ParseError`]. Attribute
//! rows are lenient: a malformed row is skipped and recorded in
//! [`Mesh::warnings`], and an attribute array that ends up short is dropped.

mod cells;
mod data;
mod reader;
mod scan;

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use crate::error::{ParseError, ParseResult};
use crate::mesh::{DataClass, DatasetKind, Mesh, ParseWarning};

use reader::{Lines, excerpt, parse_row};

pub use scan::scan_lookup_table;

/// Load a legacy mesh from a file path.
pub fn load_legacy_from_path(path: impl AsRef<Path>) -> ParseResult<Mesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loading legacy mesh from {}", path.display());
    // Binary payloads are not UTF-8; the header check reports them properly.
    load_legacy_from_str(&String::from_utf8_lossy(&bytes))
}

/// Load a legacy mesh from any [`Read`] implementation.
pub fn load_legacy_from_reader<R: Read>(mut reader: R) -> ParseResult<Mesh> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| ParseError::Io {
            path: PathBuf::from("<reader>"),
            source,
        })?;
    load_legacy_from_str(&String::from_utf8_lossy(&bytes))
}

/// Parse legacy mesh text already in memory.
pub fn load_legacy_from_str(text: &str) -> ParseResult<Mesh> {
    Parser::new(text).parse()
}

/// Current `POINT_DATA` / `CELL_DATA` section.
#[derive(Clone, Copy, Debug)]
struct Section {
    class: DataClass,
    count: usize,
}

struct Parser<'a> {
    lines: Lines<'a>,
    mesh: Mesh,
    saw_points: bool,
    section: Option<Section>,
    grid_cells: Option<Vec<Vec<u32>>>,
    grid_types: Option<(usize, Vec<i64>)>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: Lines::new(text),
            mesh: Mesh::default(),
            saw_points: false,
            section: None,
            grid_cells: None,
            grid_types: None,
        }
    }

    fn parse(mut self) -> ParseResult<Mesh> {
        self.parse_header()?;

        while let Some((line_no, line)) = self.lines.next_nonblank() {
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let args: Vec<&str> = tokens.collect();

            match keyword {
                "POINTS" => self.parse_points(line_no, &args)?,
                "VERTICES" | "LINES" | "POLYGONS" | "TRIANGLE_STRIPS" => {
                    self.parse_poly_cells(line_no, keyword, &args)?
                }
                "CELLS" => self.parse_grid_cells(line_no, &args)?,
                "CELL_TYPES" => self.parse_cell_types(line_no, &args)?,
                "POINT_DATA" => self.begin_section(line_no, DataClass::Point, &args)?,
                "CELL_DATA" => self.begin_section(line_no, DataClass::Cell, &args)?,
                "SCALARS" => self.parse_scalars(line_no, &args)?,
                "COLOR_SCALARS" => self.parse_color_scalars(line_no, &args)?,
                "NORMALS" | "TEXTURE_COORDINATES" | "VECTORS" | "TENSORS" => {
                    self.parse_attribute(line_no, keyword, &args)?
                }
                "FIELD" => self.parse_field(line_no, &args)?,
                "LOOKUP_TABLE" => self.parse_lookup_table(line_no, &args),
                "METADATA" => self.skip_metadata(),
                _ => self.warn(
                    line_no,
                    format!("skipping unrecognised line '{}'", excerpt(line)),
                ),
            }
        }

        self.finish()
    }

    fn parse_header(&mut self) -> ParseResult<()> {
        let (n, version) = self
            .lines
            .next_line()
            .ok_or_else(|| ParseError::header(1, "empty file"))?;
        if !version
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("# vtk datafile version")
        {
            return Err(ParseError::header(
                n,
                "expected '# vtk DataFile Version x.y'",
            ));
        }

        let (_, title) = self
            .lines
            .next_line()
            .ok_or_else(|| ParseError::header(2, "missing description line"))?;
        self.mesh.description = title.trim().to_string();

        let (n, encoding) = self
            .lines
            .next_nonblank()
            .ok_or_else(|| ParseError::header(3, "missing encoding line"))?;
        match encoding.trim().to_ascii_uppercase().as_str() {
            "ASCII" => {}
            "BINARY" => return Err(ParseError::UnsupportedEncoding { line: n }),
            other => {
                return Err(ParseError::header(
                    n,
                    format!("unknown encoding '{other}'"),
                ));
            }
        }

        let (n, dataset) = self
            .lines
            .next_nonblank()
            .ok_or_else(|| ParseError::header(4, "missing DATASET line"))?;
        let mut tokens = dataset.split_whitespace();
        if tokens.next() != Some("DATASET") {
            return Err(ParseError::header(n, "expected 'DATASET <kind>'"));
        }
        self.mesh.kind = match tokens.next() {
            Some(k) if k.eq_ignore_ascii_case("POLYDATA") => DatasetKind::PolyData,
            Some(k) if k.eq_ignore_ascii_case("UNSTRUCTURED_GRID") => {
                DatasetKind::UnstructuredGrid
            }
            Some(other) => {
                return Err(ParseError::header(
                    n,
                    format!("unsupported dataset kind '{other}'"),
                ));
            }
            None => return Err(ParseError::header(n, "missing dataset kind")),
        };

        log::debug!(
            "Legacy header ok: '{}' ({:?})",
            self.mesh.description,
            self.mesh.kind
        );
        Ok(())
    }

    fn finish(mut self) -> ParseResult<Mesh> {
        if !self.saw_points {
            return Err(ParseError::MissingRequiredBlock { block: "POINTS" });
        }
        self.finish_cells()?;

        log::info!(
            "Parsed {} points, {} polygons, {} cells ({} warnings)",
            self.mesh.points.len(),
            self.mesh.polys.len(),
            self.mesh.cell_count,
            self.mesh.warnings.len()
        );
        Ok(self.mesh)
    }

    fn warn(&mut self, line: usize, message: impl Into<String>) {
        let warning = ParseWarning {
            line,
            message: message.into(),
        };
        log::warn!("{warning}");
        self.mesh.warnings.push(warning);
    }

    /// Collects `count` numbers from consecutive data rows.
    ///
    /// Rows holding a non-numeric token are skipped with a warning. Fewer
    /// than `count` values come back when the block ends early.
    fn read_numbers(&mut self, block: &str, count: usize) -> Vec<f64> {
        self.read_numbers_until(block, count, |_| false)
    }

    /// [`Self::read_numbers`], also stopping before any line `stop` accepts.
    fn read_numbers_until(
        &mut self,
        block: &str,
        count: usize,
        stop: impl Fn(&str) -> bool,
    ) -> Vec<f64> {
        let mut out = Vec::with_capacity(count.min(1 << 20));
        while out.len() < count {
            if self.lines.peek_nonblank().is_some_and(|(_, l)| stop(l)) {
                break;
            }
            let Some((line_no, line)) = self.lines.next_data_line() else {
                break;
            };
            match parse_row(line) {
                Some(row) => {
                    let room = count - out.len();
                    if row.len() > room {
                        self.warn(
                            line_no,
                            format!("{block}: ignoring {} extra values", row.len() - room),
                        );
                    }
                    out.extend(row.into_iter().take(room));
                }
                None => self.warn(
                    line_no,
                    format!("{block}: skipping malformed row '{}'", excerpt(line)),
                ),
            }
        }
        out
    }
}

/// Parses the `idx`-th argument of a block line as a count.
fn count_arg(line: usize, args: &[&str], idx: usize, block: &str) -> ParseResult<usize> {
    args.get(idx)
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| ParseError::header(line, format!("{block}: expected a count argument")))
}

/// `a * b`, rejecting counts no file could hold.
fn checked_len(line: usize, block: &str, a: usize, b: usize) -> ParseResult<usize> {
    a.checked_mul(b)
        .ok_or_else(|| ParseError::header(line, format!("{block}: count overflows")))
}
