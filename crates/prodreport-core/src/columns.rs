//! Spreadsheet column labels
//!
//! Converts letter labels (`A`, `Z`, `AA`, ...) to zero-based positional
//! indices using bijective base-26 (A=1 … Z=26, AA=27). Labels are
//! case-insensitive; surrounding whitespace is ignored.
//!
//! ```rust
//! use prodreport_core::columns::column_index;
//!
//! assert_eq!(column_index("A").unwrap(), 0);
//! assert_eq!(column_index("aa").unwrap(), 26);
//! assert!(column_index("A1").is_err());
//! ```

use crate::ColumnSpecError;

/// Convert a column label to a zero-based index.
pub fn column_index(label: &str) -> Result<usize, ColumnSpecError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(ColumnSpecError::Empty);
    }

    let mut index: usize = 0;
    for ch in trimmed.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ColumnSpecError::InvalidCharacter {
                label: label.to_string(),
                character: ch,
            });
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| ColumnSpecError::Overflow(label.to_string()))?;
    }

    Ok(index - 1)
}

/// Resolve an ordered list of labels, failing on the first bad one.
pub fn resolve_columns<S: AsRef<str>>(labels: &[S]) -> Result<Vec<usize>, ColumnSpecError> {
    labels.iter().map(|l| column_index(l.as_ref())).collect()
}

/// Convert a zero-based index back to its label (0 -> A, 26 -> AA)
pub fn column_label(index: usize) -> String {
    let mut result = String::new();
    let mut n = index;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
