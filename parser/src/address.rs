//! FILENAME: parser/src/address.rs
//! PURPOSE: Converts between `(row, col)` coordinates and `A1`-style labels.
//! CONTEXT: Handles both single-cell addresses and `A1:B10`-style ranges.
//! Columns are bijective base-26 (A=0, Z=25, AA=26…); rows are 1-based in
//! the textual form, 0-based internally.

/// A 0-based `(row, col)` address.
pub type Address = (u32, u32);

/// Failure converting between a textual address/range and its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressError {
    pub input: String,
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid address: {:?}", self.input)
    }
}

impl std::error::Error for AddressError {}

/// Bijective base-26 encoding of a 0-based column index: 0 -> "A", 25 -> "Z",
/// 26 -> "AA", 701 -> "ZZ", 702 -> "AAA".
pub fn col_to_letters(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Inverse of [`col_to_letters`]. Fails if any character is not `A..Z`.
pub fn letters_to_col(s: &str) -> Result<u32, AddressError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AddressError { input: s.to_string() });
    }
    let mut result: u32 = 0;
    for c in s.chars() {
        let digit = (c as u32) - ('A' as u32) + 1;
        result = result * 26 + digit;
    }
    Ok(result - 1)
}

/// Parses an `A1`-style label into a 0-based `(row, col)` address.
/// Requires `^[A-Z]+[1-9][0-9]*$` — uppercase letters followed by a
/// 1-based row number with no leading zero.
pub fn parse_address(s: &str) -> Result<Address, AddressError> {
    let err = || AddressError { input: s.to_string() };

    let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(err)?;
    let (letters, digits) = s.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(err());
    }
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit())
        || digits.starts_with('0')
    {
        return Err(err());
    }

    let col = letters_to_col(letters).map_err(|_| err())?;
    let row_num: u32 = digits.parse().map_err(|_| err())?;
    Ok((row_num - 1, col))
}

/// Formats a 0-based `(row, col)` address as its `A1`-style label.
pub fn format_address(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}

/// Parses an `A1:B3`-style range into the rectangle it closes over, with
/// `min`/`max` taken independently on each axis and addresses produced in
/// row-major order.
pub fn parse_range(s: &str) -> Result<Vec<Address>, AddressError> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| AddressError { input: s.to_string() })?;
    let (r1, c1) = parse_address(start)?;
    let (r2, c2) = parse_address(end)?;

    let (row_lo, row_hi) = (r1.min(r2), r1.max(r2));
    let (col_lo, col_hi) = (c1.min(c2), c1.max(c2));

    let mut addresses = Vec::with_capacity(
        ((row_hi - row_lo + 1) * (col_hi - col_lo + 1)) as usize,
    );
    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            addresses.push((row, col));
        }
    }
    Ok(addresses)
}
