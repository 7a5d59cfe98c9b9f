//! Variant Base64 stage: symbol string <-> raw bytes over the 65-symbol alphabet.

use super::alphabet::{self, PAD, PAD_INDEX};
use super::CodecError;

/// Drop every character that is not part of the alphabet.
///
/// Scraped payloads carry whitespace and escape leftovers between the symbols.
pub fn filter(input: &str) -> String {
    input.chars().filter(|c| alphabet::contains(*c)).collect()
}

/// Decode an already filtered symbol string into bytes.
///
/// The symbol count must be a positive multiple of 4. The pad sentinel is accepted only in the
/// last two positions of the final group, and a padded third position requires a padded fourth.
pub fn decode_symbols(symbols: &str) -> Result<Vec<u8>, CodecError> {
    let indices = symbols
        .chars()
        .enumerate()
        .map(|(position, symbol)| {
            alphabet::index_of(symbol).ok_or(CodecError::InvalidSymbol { symbol, position })
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if indices.is_empty() || indices.len() % 4 != 0 {
        return Err(CodecError::InvalidLength {
            length: indices.len(),
        });
    }

    let groups = indices.len() / 4;
    let mut out = Vec::with_capacity(groups * 3);
    for (g, group) in indices.chunks_exact(4).enumerate() {
        let (a, b, c, d) = (group[0], group[1], group[2], group[3]);
        let base = g * 4;
        check_pad_placement([a, b, c, d], base, g + 1 == groups)?;

        out.push((a << 2) | (b >> 4));
        if c != PAD_INDEX {
            out.push(((b & 0x0F) << 4) | (c >> 2));
        }
        if d != PAD_INDEX {
            out.push(((c & 0x03) << 6) | d);
        }
    }
    Ok(out)
}

fn check_pad_placement(group: [u8; 4], base: usize, is_last: bool) -> Result<(), CodecError> {
    let misplaced = |offset: usize| CodecError::InvalidSymbol {
        symbol: PAD,
        position: base + offset,
    };
    if group[0] == PAD_INDEX {
        return Err(misplaced(0));
    }
    if group[1] == PAD_INDEX {
        return Err(misplaced(1));
    }
    if group[2] == PAD_INDEX && (group[3] != PAD_INDEX || !is_last) {
        return Err(misplaced(2));
    }
    if group[3] == PAD_INDEX && !is_last {
        return Err(misplaced(3));
    }
    Ok(())
}

/// Encode bytes into a symbol string of length `4 * ceil(len / 3)`.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let e = chunk[0];
        let t = chunk.get(1).copied().unwrap_or(0);
        let n = chunk.get(2).copied().unwrap_or(0);

        let r = e >> 2;
        let o = ((e & 0x03) << 4) | (t >> 4);
        let mut l = ((t & 0x0F) << 2) | (n >> 6);
        let mut c = n & 0x3F;
        match chunk.len() {
            1 => {
                l = PAD_INDEX;
                c = PAD_INDEX;
            }
            2 => c = PAD_INDEX,
            _ => {}
        }

        for index in [r, o, l, c] {
            out.push(alphabet::symbol_at(index));
        }
    }
    out
}
