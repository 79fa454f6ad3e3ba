//! Line cursor and token helpers shared by the block parsers.

/// Block keywords that terminate a data run. Spelling is part of the format
/// and is matched case-sensitively.
const KEYWORDS: &[&str] = &[
    "DATASET",
    "POINTS",
    "VERTICES",
    "LINES",
    "POLYGONS",
    "TRIANGLE_STRIPS",
    "CELLS",
    "CELL_TYPES",
    "OFFSETS",
    "CONNECTIVITY",
    "POINT_DATA",
    "CELL_DATA",
    "SCALARS",
    "COLOR_SCALARS",
    "LOOKUP_TABLE",
    "NORMALS",
    "TEXTURE_COORDINATES",
    "VECTORS",
    "TENSORS",
    "FIELD",
    "METADATA",
];

pub(crate) fn is_keyword(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|tok| KEYWORDS.contains(&tok))
}

/// `name ncomp ntuples type` header of a `FIELD` array, or `NULL_ARRAY`.
pub(crate) fn is_field_header(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["NULL_ARRAY"] => true,
        [name, ncomp, ntuples, _ty, ..] => {
            name.parse::<f64>().is_err()
                && ncomp.parse::<usize>().is_ok()
                && ntuples.parse::<usize>().is_ok()
        }
        _ => false,
    }
}

/// Parses every token of a row; `None` if any token is not a number.
/// `str::parse` always uses `.` as the decimal separator.
pub(crate) fn parse_row(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace().map(|t| t.parse::<f64>().ok()).collect()
}

/// Shortens a row for inclusion in a warning.
pub(crate) fn excerpt(line: &str) -> String {
    const MAX: usize = 48;
    let line = line.trim();
    match line.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

/// Forward-only cursor over the lines of a file, tracking 1-based line numbers.
pub(crate) struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    /// Line number of the next line to be read.
    #[inline]
    pub(crate) fn line_no(&self) -> usize {
        self.pos + 1
    }

    pub(crate) fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = *self.lines.get(self.pos)?;
        self.pos += 1;
        Some((self.pos, line))
    }

    /// Skips blank lines and returns the next one without consuming it.
    pub(crate) fn peek_nonblank(&mut self) -> Option<(usize, &'a str)> {
        while let Some(&line) = self.lines.get(self.pos) {
            if !line.trim().is_empty() {
                return Some((self.pos + 1, line));
            }
            self.pos += 1;
        }
        None
    }

    pub(crate) fn next_nonblank(&mut self) -> Option<(usize, &'a str)> {
        let found = self.peek_nonblank()?;
        self.pos += 1;
        Some(found)
    }

    /// Next non-blank line unless it starts a new block.
    pub(crate) fn next_data_line(&mut self) -> Option<(usize, &'a str)> {
        let (_, line) = self.peek_nonblank()?;
        if is_keyword(line) {
            return None;
        }
        self.next_nonblank()
    }
}

/// RGBA rows of a lookup-table block.
pub(crate) struct TableRows {
    pub entries: Vec<[f32; 4]>,
    /// Rows that did not hold exactly four numbers, with their line numbers.
    pub rejected: Vec<(usize, String)>,
}

impl TableRows {
    pub(crate) fn is_complete(&self, declared: usize) -> bool {
        self.rejected.is_empty() && self.entries.len() == declared
    }
}

/// Reads up to `count` table rows, stopping early at EOF or the next block.
pub(crate) fn read_table_rows(lines: &mut Lines<'_>, count: usize) -> TableRows {
    let mut rows = TableRows {
        entries: Vec::with_capacity(count.min(4096)),
        rejected: Vec::new(),
    };
    let mut consumed = 0;
    while consumed < count {
        let Some((line_no, line)) = lines.next_data_line() else {
            break;
        };
        consumed += 1;
        match parse_row(line) {
            Some(v) if v.len() == 4 => {
                rows.entries
                    .push([v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32]);
            }
            _ => rows.rejected.push((line_no, excerpt(line))),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(is_keyword("POINTS 8 float"));
        assert!(is_keyword("  LOOKUP_TABLE my_table 8"));
        assert!(!is_keyword("Normals 3 8 float"));
        assert!(!is_keyword("0.0 1.0 2.0"));
    }

    #[test]
    fn field_headers_are_recognised() {
        assert!(is_field_header("faceAttributes 2 6 float"));
        assert!(is_field_header("NULL_ARRAY"));
        assert!(!is_field_header("0.5 0.25"));
        assert!(!is_field_header("1 x"));
        assert!(!is_field_header("1 2 3 4"));
    }

    #[test]
    fn row_parsing_rejects_garbage() {
        assert_eq!(parse_row("1 2.5 -3e2"), Some(vec![1.0, 2.5, -300.0]));
        assert_eq!(parse_row("1,5 2"), None);
        assert_eq!(parse_row("0.1 abc"), None);
    }

    #[test]
    fn cursor_skips_blanks_and_stops_at_keywords() {
        let mut lines = Lines::new("\n\n1 2 3\n\nPOINTS 1 float\n");
        assert_eq!(lines.next_data_line(), Some((3, "1 2 3")));
        assert_eq!(lines.next_data_line(), None);
        assert_eq!(lines.next_nonblank(), Some((5, "POINTS 1 float")));
        assert_eq!(lines.next_nonblank(), None);
    }

    #[test]
    fn short_table_is_incomplete() {
        let mut lines = Lines::new("0 0 0 1\n1 1 1 1\nPOINT_DATA 2\n");
        let rows = read_table_rows(&mut lines, 3);
        assert_eq!(rows.entries.len(), 2);
        assert!(!rows.is_complete(3));
        assert_eq!(lines.next_nonblank(), Some((3, "POINT_DATA 2")));
    }

    #[test]
    fn wrong_arity_row_is_rejected() {
        let mut lines = Lines::new("0 0 0 1\n1 1 1\n");
        let rows = read_table_rows(&mut lines, 2);
        assert_eq!(rows.entries.len(), 1);
        assert_eq!(rows.rejected, vec![(2, "1 1 1".to_string())]);
    }
}
