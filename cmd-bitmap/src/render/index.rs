//! Row and bit labels

/// Bijective base-26 label: 0 → A, 25 → Z, 26 → AA, 701 → ZZ, 702 → AAA
pub fn alpha_index(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index;
    loop {
        letters.push(char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Alphabetic label of one bit: row letters followed by the column
pub fn alpha_bit_label(row: usize, column: usize) -> String {
    format!("{}{}", alpha_index(row), column)
}
