//! UTF-8 stage limited to the one-, two- and three-byte forms (Basic Multilingual Plane).

use super::CodecError;

/// Reassemble code points from a byte sequence.
///
/// Continuation bytes must carry the `10` high-bit pattern. Lead bytes that start no supported
/// form (stray continuation bytes, four-byte leads) and three-byte forms that land on a
/// surrogate are rejected as malformed.
pub fn reassemble(bytes: &[u8]) -> Result<String, CodecError> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let t = bytes[i];
        let needed = match t {
            0x00..=0x7F => {
                out.push(char::from(t));
                i += 1;
                continue;
            }
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            _ => return Err(CodecError::MalformedSequence { offset: i, byte: t }),
        };

        let available = bytes.len() - i;
        if available < needed {
            return Err(CodecError::TruncatedSequence {
                offset: i,
                needed,
                available,
            });
        }
        let seq = &bytes[i..i + needed];
        for (k, &b) in seq.iter().enumerate().skip(1) {
            if b & 0xC0 != 0x80 {
                return Err(CodecError::MalformedSequence {
                    offset: i + k,
                    byte: b,
                });
            }
        }

        let code_point = if needed == 2 {
            (u32::from(t & 0x1F) << 6) | u32::from(seq[1] & 0x3F)
        } else {
            (u32::from(t & 0x0F) << 12) | (u32::from(seq[1] & 0x3F) << 6) | u32::from(seq[2] & 0x3F)
        };
        let ch = char::from_u32(code_point)
            .ok_or(CodecError::MalformedSequence { offset: i, byte: t })?;
        out.push(ch);
        i += needed;
    }
    Ok(out)
}

/// Emit the UTF-8 bytes of `text`. Characters above U+FFFF are rejected.
pub fn emit(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let cp = u32::from(ch);
        match cp {
            0..=0x7F => out.push(cp as u8),
            0x80..=0x7FF => {
                out.push(((cp >> 6) | 0xC0) as u8);
                out.push(((cp & 0x3F) | 0x80) as u8);
            }
            0x800..=0xFFFF => {
                out.push(((cp >> 12) | 0xE0) as u8);
                out.push((((cp >> 6) & 0x3F) | 0x80) as u8);
                out.push(((cp & 0x3F) | 0x80) as u8);
            }
            _ => return Err(CodecError::UnsupportedCodePoint { code_point: cp }),
        }
    }
    Ok(out)
}
