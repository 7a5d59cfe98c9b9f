//! Transcoding codec for Pratilipi chapter payloads.
//!
//! Chapter text is shipped as UTF-8 bytes wrapped in a Base64-style encoding over a 65-symbol
//! alphabet. [decode] filters the scraped string, turns symbols into bytes and bytes into text;
//! [encode] is the mirror image. Both are pure functions over in-memory buffers.

pub mod alphabet;
pub mod base64;
pub mod utf8;

mod error;

pub use error::CodecError;

/// Decode a scraped payload into text.
///
/// Characters outside the alphabet are discarded before the length check.
pub fn decode(text: &str) -> Result<String, CodecError> {
    let symbols = base64::filter(text);
    let bytes = base64::decode_symbols(&symbols)?;
    utf8::reassemble(&bytes)
}

/// Encode text into the payload form. Fails only for characters above U+FFFF.
pub fn encode(text: &str) -> Result<String, CodecError> {
    let bytes = utf8::emit(text)?;
    Ok(base64::encode_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn literal_single_byte() -> Result<(), CodecError> {
        assert_eq!(encode("A")?, "QQ==");
        assert_eq!(decode("QQ==")?, "A");
        Ok(())
    }

    #[test]
    fn literal_tamil_letter() -> Result<(), CodecError> {
        let encoded = encode("\u{0B85}")?;
        assert_eq!(encoded, "4K6F");
        assert!(!encoded.contains(alphabet::PAD));
        assert_eq!(decode(&encoded)?, "\u{0B85}");
        Ok(())
    }

    #[test]
    fn decode_html_chapter_fragment() -> Result<(), CodecError> {
        let body = "<p>அம்மா வந்தாள்.</p>\n<p>\"Hello\" & bye</p>";
        assert_eq!(decode(&encode(body)?)?, body);
        Ok(())
    }

    #[test]
    fn decode_ignores_characters_between_groups() -> Result<(), CodecError> {
        let encoded = encode("வணக்கம், world")?;
        let mut noisy = String::new();
        for (i, c) in encoded.chars().enumerate() {
            if i > 0 && i % 4 == 0 {
                noisy.push_str(" \n\t-_");
            }
            noisy.push(c);
        }
        assert_eq!(decode(&noisy)?, decode(&encoded)?);
        Ok(())
    }

    #[test]
    fn decode_length_six_fails() {
        assert_eq!(
            decode("QUJD RE"),
            Err(CodecError::InvalidLength { length: 6 })
        );
    }

    #[test]
    fn decode_truncated_trailing_lead_fails() {
        // "4A==" decodes to the single byte 0xE0.
        assert!(matches!(
            decode("4A=="),
            Err(CodecError::TruncatedSequence { offset: 0, .. })
        ));
    }

    #[test]
    fn encode_rejects_non_bmp() {
        assert!(matches!(
            encode("🙂"),
            Err(CodecError::UnsupportedCodePoint { .. })
        ));
    }

    #[test]
    fn repeated_calls_agree() -> Result<(), CodecError> {
        let s = "ஒரு ஊரில் ஒரு ராஜா";
        let first = encode(s)?;
        assert_eq!(encode(s)?, first);
        assert_eq!(decode(&first)?, decode(&first)?);
        Ok(())
    }

    proptest! {
        #[test]
        fn round_trip_bmp_text(s in "[\\u{0}-\\u{D7FF}\\u{E000}-\\u{FFFF}]{1,64}") {
            let encoded = encode(&s).unwrap();
            prop_assert_eq!(decode(&encoded).unwrap(), s);
        }

        #[test]
        fn padding_follows_byte_length(s in "[a-zé\\u{0B80}-\\u{0BFF}]{1,32}") {
            let encoded = encode(&s).unwrap();
            let pads = encoded.chars().filter(|c| *c == alphabet::PAD).count();
            let expected = match s.len() % 3 {
                1 => 2,
                2 => 1,
                _ => 0,
            };
            prop_assert_eq!(pads, expected);
        }
    }
}
