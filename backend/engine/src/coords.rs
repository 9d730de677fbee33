//! Spreadsheet column lettering (1 → A, 27 → AA) and A1-style cell addresses.

/// Convert a 1-based column number into its letter form. Returns `None` for 0.
pub fn to_letter(column: u32) -> Option<String> {
    if column == 0 {
        return None;
    }
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    // Only ASCII uppercase bytes were pushed.
    Some(letters.into_iter().map(char::from).collect())
}

/// Convert column letters (case-insensitive) back into a 1-based number.
pub fn to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Letter form of a 0-based column index.
pub fn column_letter(column_index: usize) -> String {
    let column = u32::try_from(column_index + 1).unwrap_or(u32::MAX);
    to_letter(column).unwrap_or_default()
}

/// Quote a sheet name for use in a range when it holds anything besides
/// ASCII letters, digits, and underscores.
pub fn quote_sheet_name(sheet: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// `Sheet!C5` style address for 0-based coordinates.
pub fn cell_address(sheet: &str, row_index: usize, column_index: usize) -> String {
    format!(
        "{}!{}{}",
        quote_sheet_name(sheet),
        column_letter(column_index),
        row_index + 1
    )
}
