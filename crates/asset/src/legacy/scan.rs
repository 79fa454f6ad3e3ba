//! Standalone lookup-table extraction from raw file text.

use corelib::Rgba;

use super::reader::{Lines, read_table_rows};
use crate::error::LutError;

/// Finds the `LOOKUP_TABLE <name> <count>` block in `text` and returns its
/// RGBA rows.
///
/// The two-token `LOOKUP_TABLE <name>` line that follows a `SCALARS` header
/// only names a table and is not a match. Rows that are not exactly four
/// numbers are not counted; the table must then hold `count` valid rows.
pub fn scan_lookup_table(text: &str, name: &str) -> Result<Vec<Rgba>, LutError> {
    let mut lines = Lines::new(text);

    while let Some((line_no, line)) = lines.next_nonblank() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let declared = match tokens.as_slice() {
            ["LOOKUP_TABLE", table, count] if *table == name => count.parse::<usize>().ok(),
            _ => continue,
        };
        let Some(declared) = declared else {
            log::warn!("line {line_no}: LOOKUP_TABLE {name} has an invalid entry count");
            continue;
        };
        if declared == 0 {
            return Err(LutError::Empty);
        }

        let rows = read_table_rows(&mut lines, declared);
        if !rows.is_complete(declared) {
            log::warn!(
                "line {line_no}: LOOKUP_TABLE {name} declares {declared} entries, {} valid",
                rows.entries.len()
            );
            return Err(LutError::CountMismatch {
                name: name.to_string(),
                declared,
                found: rows.entries.len(),
            });
        }
        return Ok(rows.entries);
    }

    Err(LutError::NotFound {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "POINT_DATA 2
SCALARS s float 1
LOOKUP_TABLE my_table
0 1
LOOKUP_TABLE my_table 2
0 0 0 1
1 0 0 1
LOOKUP_TABLE short 3
0 0 0 1
0.5 0.5
1 1 1 1
LOOKUP_TABLE none 0
";

    #[test]
    fn finds_table_after_scalars_reference() {
        let entries = scan_lookup_table(TEXT, "my_table").expect("table");
        assert_eq!(entries, vec![[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]]);
    }

    #[test]
    fn bad_row_counts_against_declared_size() {
        assert_eq!(
            scan_lookup_table(TEXT, "short"),
            Err(LutError::CountMismatch {
                name: "short".into(),
                declared: 3,
                found: 2
            })
        );
    }

    #[test]
    fn missing_and_empty_tables() {
        assert_eq!(
            scan_lookup_table(TEXT, "other"),
            Err(LutError::NotFound {
                name: "other".into()
            })
        );
        assert_eq!(scan_lookup_table(TEXT, "none"), Err(LutError::Empty));
    }
}
