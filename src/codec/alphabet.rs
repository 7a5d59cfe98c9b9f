//! The 65-symbol alphabet: 64 data symbols followed by the pad sentinel.

/// Ordered alphabet. Index 64 is the pad sentinel.
pub const SYMBOLS: &[u8; 65] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

/// Index of the pad sentinel `=`.
pub const PAD_INDEX: u8 = 64;

/// Pad sentinel character.
pub const PAD: char = '=';

const NOT_FOUND: u8 = 0xFF;

/// Inverse lookup: ASCII byte -> alphabet index, or `NOT_FOUND`.
const INVERSE: [u8; 256] = build_inverse();

const fn build_inverse() -> [u8; 256] {
    let mut table = [NOT_FOUND; 256];
    let mut i = 0;
    while i < SYMBOLS.len() {
        table[SYMBOLS[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Look up the alphabet index of `c`. Returns `None` for characters outside the alphabet.
pub fn index_of(c: char) -> Option<u8> {
    if !c.is_ascii() {
        return None;
    }
    match INVERSE[c as usize] {
        NOT_FOUND => None,
        i => Some(i),
    }
}

/// Symbol at `index`. Indices are always produced by 6-bit arithmetic or `PAD_INDEX`.
pub fn symbol_at(index: u8) -> char {
    SYMBOLS[index as usize] as char
}

/// True if `c` belongs to the alphabet (data symbol or pad).
pub fn contains(c: char) -> bool {
    index_of(c).is_some()
}
