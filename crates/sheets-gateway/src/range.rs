//! Conversions between (row, column) table coordinates and the remote
//! service's range notation. Pure functions, no I/O.

use {crate::error::GatewayError, serde_json::Value};

/// Converts a 1-based column number to spreadsheet column letters using
/// bijective base-26: 1 -> "A", 26 -> "Z", 27 -> "AA".
///
/// There is no symbol for zero in this encoding, so plain modulo arithmetic
/// is off by one: both the digit and the carry work on `n - 1`.
///
/// # Panics
///
/// Panics on `column == 0`; column numbers are 1-based by definition.
pub fn column_letters(column: u32) -> String {
    assert!(column >= 1, "column numbers are 1-based");
    let mut column = column;
    let mut letters = Vec::new();
    while column > 0 {
        let digit = (column - 1) % 26;
        letters.push(b'A' + digit as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap()
}

/// Range covering `col_count` columns from row `start_row` downwards,
/// scoped to a tab: `"Expenses!A2:C"`. The row end is left open so the
/// range covers however many rows the region holds.
pub fn block_range(tab_name: &str, start_row: u32, col_count: u32) -> String {
    format!("{tab_name}!A{start_row}:{}", column_letters(col_count))
}

/// Splits raw remote rows into the header row and the data rows below it.
///
/// The header lives at 1-based `header_row`; `header_offset` further rows
/// directly below it (separators and the like) are dropped as well. A header
/// row beyond the fetched data means the remote tab is malformed, which is
/// reported rather than silently truncated.
pub fn split_header(
    mut raw: Vec<Vec<Value>>,
    header_row: u32,
    header_offset: u32,
) -> Result<(Vec<String>, Vec<Vec<Value>>), GatewayError> {
    if header_row < 1 || raw.len() < header_row as usize {
        return Err(GatewayError::Precondition(format!(
            "header expected at row {header_row} but the tab only has {} rows",
            raw.len()
        )));
    }
    let header = raw[header_row as usize - 1]
        .iter()
        .map(|cell| match cell {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
        .collect();
    let data_start = (header_row + header_offset) as usize;
    let data = if raw.len() > data_start {
        raw.split_off(data_start)
    } else {
        Vec::new()
    };
    Ok((header, data))
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn bijective_base_26_column_letters() {
        for (column, expected) in [
            (1, "A"),
            (26, "Z"),
            (27, "AA"),
            (52, "AZ"),
            (53, "BA"),
            (702, "ZZ"),
            (703, "AAA"),
        ] {
            assert_eq!(column_letters(column), expected);
        }
    }

    #[test]
    #[should_panic(expected = "1-based")]
    fn column_zero_is_a_programmer_error() {
        column_letters(0);
    }

    #[test]
    fn formats_block_range() {
        assert_eq!(block_range("Expenses", 2, 3), "Expenses!A2:C");
        assert_eq!(block_range("wide", 1, 27), "wide!A1:AA");
    }

    #[test]
    fn splits_header_from_data() {
        let raw = vec![
            vec![json!("h1"), json!("h2")],
            vec![json!("a"), json!("b")],
            vec![json!("c"), json!("d")],
        ];
        let (header, data) = split_header(raw, 1, 0).unwrap();
        assert_eq!(header, ["h1", "h2"]);
        assert_eq!(
            data,
            vec![vec![json!("a"), json!("b")], vec![json!("c"), json!("d")]]
        );
    }

    #[test]
    fn header_offset_drops_separator_rows() {
        let raw = vec![
            vec![json!("title")],
            vec![json!("h1"), json!("h2")],
            vec![json!("---"), json!("---")],
            vec![json!("a"), json!("b")],
        ];
        let (header, data) = split_header(raw, 2, 1).unwrap();
        assert_eq!(header, ["h1", "h2"]);
        assert_eq!(data, vec![vec![json!("a"), json!("b")]]);
    }

    #[test]
    fn header_beyond_data_is_reported() {
        let raw = vec![vec![json!("only row")]];
        assert!(matches!(
            split_header(raw, 3, 0),
            Err(GatewayError::Precondition(_))
        ));
    }

    #[test]
    fn header_only_tab_has_no_data() {
        let raw = vec![vec![json!("h1")]];
        let (header, data) = split_header(raw, 1, 0).unwrap();
        assert_eq!(header, ["h1"]);
        assert!(data.is_empty());
    }
}
