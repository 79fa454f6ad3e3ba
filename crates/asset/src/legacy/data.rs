//! `POINT_DATA`/`CELL_DATA` sections, their attribute arrays, `FIELD`
//! blocks and inline lookup tables.

use corelib::color::unit_to_u8;

use super::reader::{excerpt, is_field_header, read_table_rows};
use super::{Parser, Section, checked_len, count_arg};
use crate::error::{ParseError, ParseResult};
use crate::mesh::{ArrayRole, DataArray, DataClass, FieldArray, RawLookupTable, ScalarArray};

const INTEGER_TYPES: &[&str] = &[
    "bit",
    "char",
    "unsigned_char",
    "short",
    "unsigned_short",
    "int",
    "unsigned_int",
    "long",
    "unsigned_long",
    "vtkIdType",
    "vtktypeint8",
    "vtktypeuint8",
    "vtktypeint16",
    "vtktypeuint16",
    "vtktypeint32",
    "vtktypeuint32",
    "vtktypeint64",
    "vtktypeuint64",
];

impl Parser<'_> {
    pub(super) fn begin_section(
        &mut self,
        line_no: usize,
        class: DataClass,
        args: &[&str],
    ) -> ParseResult<()> {
        let count = count_arg(line_no, args, 0, section_name(class))?;
        let expected = match class {
            DataClass::Point => self.mesh.points.len(),
            DataClass::Cell => self.cells_so_far(),
        };
        if count != expected {
            self.warn(
                line_no,
                format!(
                    "{} declares {count} tuples but the dataset has {expected}",
                    section_name(class)
                ),
            );
        }
        self.section = Some(Section { class, count });
        Ok(())
    }

    /// Attribute arrays need an open `POINT_DATA` or `CELL_DATA` section.
    fn require_section(&self) -> ParseResult<Section> {
        self.section.ok_or(ParseError::MissingRequiredBlock {
            block: "POINT_DATA or CELL_DATA",
        })
    }

    /// `SCALARS name type [ncomp]`, optionally followed by `LOOKUP_TABLE name`.
    pub(super) fn parse_scalars(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let section = self.require_section()?;
        let (Some(&name), Some(&ty)) = (args.first(), args.get(1)) else {
            return Err(ParseError::header(line_no, "SCALARS: expected a name and a type"));
        };
        let components = match args.get(2) {
            Some(c) => match c.parse::<usize>() {
                Ok(n @ 1..=4) => n,
                _ => {
                    return Err(ParseError::header(
                        line_no,
                        format!("SCALARS: invalid component count '{c}'"),
                    ));
                }
            },
            None => 1,
        };

        let mut lookup_table = None;
        if let Some((_, line)) = self.lines.peek_nonblank() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() == 2 && tokens[0] == "LOOKUP_TABLE" {
                self.lines.next_nonblank();
                if tokens[1] != "default" {
                    lookup_table = Some(tokens[1].to_string());
                }
            }
        }

        let wanted = checked_len(line_no, "SCALARS", section.count, components)?;
        let values = self.read_numbers("SCALARS", wanted);
        if values.len() < wanted {
            self.warn(
                line_no,
                format!(
                    "SCALARS {name}: expected {wanted} values, found {}; array dropped",
                    values.len()
                ),
            );
            return Ok(());
        }

        let values = self.typed_array(line_no, ty, components, values);
        self.insert_array(
            section.class,
            DataArray {
                name: name.to_string(),
                role: ArrayRole::Scalars,
                values,
                lookup_table,
            },
        );
        Ok(())
    }

    /// `COLOR_SCALARS name n`: unit-range colors stored as 8-bit RGBA.
    pub(super) fn parse_color_scalars(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let section = self.require_section()?;
        let name = args.first().copied().unwrap_or("color_scalars");
        let components = match args.get(1).map(|c| c.parse::<usize>()) {
            Some(Ok(n @ 1..=4)) => n,
            _ => {
                return Err(ParseError::header(
                    line_no,
                    "COLOR_SCALARS: expected a component count of 1 to 4",
                ));
            }
        };

        let wanted = checked_len(line_no, "COLOR_SCALARS", section.count, components)?;
        let values = self.read_numbers("COLOR_SCALARS", wanted);
        if values.len() < wanted {
            self.warn(
                line_no,
                format!("COLOR_SCALARS {name}: block is short; array dropped"),
            );
            return Ok(());
        }

        let colors = values
            .chunks_exact(components)
            .map(|c| {
                let c: Vec<u8> = c.iter().map(|&v| unit_to_u8(v)).collect();
                match c.as_slice() {
                    [g] => [*g, *g, *g, 255],
                    [g, a] => [*g, *g, *g, *a],
                    [r, g, b] => [*r, *g, *b, 255],
                    [r, g, b, a, ..] => [*r, *g, *b, *a],
                    [] => [255; 4],
                }
            })
            .collect();

        self.insert_array(
            section.class,
            DataArray {
                name: name.to_string(),
                role: ArrayRole::ColorScalars,
                values: ScalarArray::UInt8Rgba(colors),
                lookup_table: None,
            },
        );
        Ok(())
    }

    /// `NORMALS`, `TEXTURE_COORDINATES`, `VECTORS` and `TENSORS` blocks.
    pub(super) fn parse_attribute(
        &mut self,
        line_no: usize,
        keyword: &str,
        args: &[&str],
    ) -> ParseResult<()> {
        let section = self.require_section()?;
        let name = args.first().copied().unwrap_or(keyword);
        let (role, components, ty) = match keyword {
            "NORMALS" => (ArrayRole::Normals, 3, args.get(1)),
            "VECTORS" => (ArrayRole::Vectors, 3, args.get(1)),
            "TENSORS" => (ArrayRole::Tensors, 9, args.get(1)),
            _ => {
                let dim = match args.get(1).map(|d| d.parse::<usize>()) {
                    Some(Ok(d @ 1..=3)) => d,
                    _ => {
                        return Err(ParseError::header(
                            line_no,
                            "TEXTURE_COORDINATES: expected a dimension of 1 to 3",
                        ));
                    }
                };
                (ArrayRole::TextureCoords, dim, args.get(2))
            }
        };

        let wanted = checked_len(line_no, "attribute", section.count, components)?;
        let values = self.read_numbers(keyword, wanted);
        if values.len() < wanted {
            self.warn(
                line_no,
                format!(
                    "{keyword} {name}: expected {wanted} values, found {}; array dropped",
                    values.len()
                ),
            );
            return Ok(());
        }

        let values = match ty {
            Some(ty) => self.typed_array(line_no, ty, components, values),
            None => ScalarArray::Float { components, values },
        };
        self.insert_array(
            section.class,
            DataArray {
                name: name.to_string(),
                role,
                values,
                lookup_table: None,
            },
        );
        Ok(())
    }

    /// `FIELD name k` followed by `k` arrays of `name ncomp ntuples type`.
    pub(super) fn parse_field(&mut self, line_no: usize, args: &[&str]) -> ParseResult<()> {
        let arrays = count_arg(line_no, args, 1, "FIELD")?;
        let association = self.section.map(|s| s.class);

        for k in 0..arrays {
            let Some((header_no, header)) = self.lines.next_data_line() else {
                return Err(ParseError::Truncated {
                    block: "FIELD",
                    line: line_no,
                    expected: arrays,
                    found: k,
                });
            };
            let tokens: Vec<&str> = header.split_whitespace().collect();
            if tokens.first() == Some(&"NULL_ARRAY") {
                continue;
            }
            let parsed = match tokens.as_slice() {
                [name, ncomp, ntuples, ty, ..] => ncomp
                    .parse::<usize>()
                    .ok()
                    .zip(ntuples.parse::<usize>().ok())
                    .map(|(c, t)| (*name, c, t, *ty)),
                _ => None,
            };
            let Some((name, components, tuples, ty)) = parsed.filter(|p| p.1 > 0) else {
                return Err(ParseError::header(
                    header_no,
                    format!("FIELD: malformed array header '{}'", excerpt(header)),
                ));
            };

            let wanted = checked_len(header_no, "FIELD", components, tuples)?;
            // A bad row must not swallow the next array's header.
            let values = self.read_numbers_until("FIELD", wanted, is_field_header);
            if values.len() < wanted {
                self.warn(
                    header_no,
                    format!(
                        "FIELD {name}: expected {wanted} values, found {}; array dropped",
                        values.len()
                    ),
                );
                continue;
            }
            let values = self.typed_array(header_no, ty, components, values);
            self.mesh.field_data.insert(
                name.to_string(),
                FieldArray {
                    name: name.to_string(),
                    association,
                    values,
                },
            );
        }
        Ok(())
    }

    /// `LOOKUP_TABLE name n` followed by `n` RGBA rows. Problems are recorded
    /// on the table; they only matter if some array uses it.
    pub(super) fn parse_lookup_table(&mut self, line_no: usize, args: &[&str]) {
        let (Some(&name), Some(declared)) = (args.first(), args.get(1)) else {
            self.warn(line_no, "LOOKUP_TABLE: expected a name and an entry count");
            return;
        };
        let Ok(declared) = declared.parse::<usize>() else {
            self.warn(
                line_no,
                format!("LOOKUP_TABLE {name}: invalid entry count '{declared}'"),
            );
            return;
        };

        let rows = read_table_rows(&mut self.lines, declared);
        for (row_no, row) in &rows.rejected {
            self.warn(
                *row_no,
                format!("LOOKUP_TABLE {name}: row '{row}' is not four numbers"),
            );
        }
        let complete = rows.is_complete(declared);
        if !complete {
            self.warn(
                line_no,
                format!(
                    "LOOKUP_TABLE {name}: declares {declared} entries but {} were readable",
                    rows.entries.len()
                ),
            );
        }
        self.mesh.lookup_tables.insert(
            name.to_string(),
            RawLookupTable {
                name: name.to_string(),
                declared,
                entries: rows.entries,
                complete,
            },
        );
    }

    /// Skips a `METADATA` block, which runs to the next blank line.
    pub(super) fn skip_metadata(&mut self) {
        let start = self.lines.line_no();
        let mut skipped = 0;
        while let Some((_, line)) = self.lines.next_line() {
            if line.trim().is_empty() {
                break;
            }
            skipped += 1;
        }
        log::debug!("Skipped {skipped} METADATA lines from line {start}");
    }

    fn insert_array(&mut self, class: DataClass, array: DataArray) {
        log::debug!(
            "{} array '{}' ({:?}, {} tuples)",
            section_name(class),
            array.name,
            array.role,
            array.values.tuple_count()
        );
        match class {
            DataClass::Point => self.mesh.point_data.insert(array),
            DataClass::Cell => self.mesh.cell_data.insert(array),
        }
    }

    /// Stores `values` with the storage their declared type calls for.
    fn typed_array(
        &mut self,
        line_no: usize,
        ty: &str,
        components: usize,
        values: Vec<f64>,
    ) -> ScalarArray {
        let integral = values.iter().all(|v| v.fract() == 0.0);
        match ty {
            "float" | "double" => ScalarArray::Float { components, values },
            "unsigned_char"
                if matches!(components, 3 | 4)
                    && integral
                    && values.iter().all(|v| (0.0..=255.0).contains(v)) =>
            {
                let colors = values
                    .chunks_exact(components)
                    .map(|c| {
                        let alpha = c.get(3).map_or(255, |&a| a as u8);
                        [c[0] as u8, c[1] as u8, c[2] as u8, alpha]
                    })
                    .collect();
                ScalarArray::UInt8Rgba(colors)
            }
            t if INTEGER_TYPES.contains(&t) => {
                if integral {
                    ScalarArray::Int {
                        components,
                        values: values.into_iter().map(|v| v as i64).collect(),
                    }
                } else {
                    self.warn(
                        line_no,
                        format!("{t} data holds fractional values; keeping them as floats"),
                    );
                    ScalarArray::Float { components, values }
                }
            }
            other => {
                self.warn(
                    line_no,
                    format!("unknown data type '{other}'; reading as float"),
                );
                ScalarArray::Float { components, values }
            }
        }
    }
}

fn section_name(class: DataClass) -> &'static str {
    match class {
        DataClass::Point => "POINT_DATA",
        DataClass::Cell => "CELL_DATA",
    }
}
