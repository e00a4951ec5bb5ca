//! Conversions between A1-style cell references and zero-based indexes.
//! References outside the worksheet grid (`A1:XFD1048576`) are rejected.

/// Rows in a worksheet
pub(crate) const MAX_ROWS: usize = 1_048_576;
/// Columns in a worksheet
pub(crate) const MAX_COLUMNS: usize = 16_384;

/// Converts a column label (`A`, `AB`) to a zero-based index.
pub(crate) fn col_to_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for character in label.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        let digit = (character.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1).filter(|index| *index < MAX_COLUMNS)
}

/// Converts a one-based row label (`1`, `42`) to a zero-based index.
pub(crate) fn row_to_index(label: &str) -> Option<usize> {
    label.parse::<usize>().ok().filter(|row| (1..=MAX_ROWS).contains(row)).map(|row| row - 1)
}

/// Converts a reference such as `C7` to `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    Some((row_to_index(row)?, col_to_index(col)?))
}

/// Converts a zero-based column index to its label.
pub(crate) fn index_to_col(col: usize) -> String {
    let mut col = col + 1;
    let mut label = Vec::new();
    while col > 0 {
        col -= 1;
        label.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Converts `(row, col)` to a reference such as `C7`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}
