/// Rows a worksheet can address.
pub const MAX_ROWS: u32 = 1_048_576;
/// Columns a worksheet can address (`A` through `XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Parse an A1-style cell reference (`B7`, `AA12`) into zero-based
/// `(row, col)` indices. Returns `None` for malformed references and for
/// addresses past [`MAX_ROWS`] or [`MAX_COLUMNS`].
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .filter(|&idx| idx > 0)?;
    let (letters, digits) = reference.split_at(split);

    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let offset = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        col = col.checked_mul(26)?.checked_add(offset)?;
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return None;
    }

    Some((row - 1, col - 1))
}
