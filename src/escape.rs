//! Escape-sequence decoding for string and character literals.
//!
//! Pure and total over well-formed escape syntax: no I/O, no state. Each
//! escape maps to one code point; code points above U+00FF only arise from
//! `\u` and `\U` forms.

use crate::error::{CResult, CompilerError};
use crate::source::SourceLoc;

/// Decode the body of a C string or character literal, replacing escape
/// sequences with the characters they denote.
///
/// Recognized escapes: `\'`, `\"`, `\?`, `\\`, `\a`, `\b`, `\f`, `\n`,
/// `\r`, `\t`, `\v`, octal `\N` through `\NNN`, hex `\xHH..`, and the
/// Unicode forms `\uHHHH` and `\UHHHHHHHH`. Anything else is a decode
/// error reported at `loc`.
pub fn decode_escapes(raw: &str, loc: SourceLoc) -> CResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let esc = chars
            .next()
            .ok_or_else(|| CompilerError::lexical("Trailing backslash in literal", loc))?;
        match esc {
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '?' => out.push('?'),
            '\\' => out.push('\\'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                // 1 to 3 octal digits, first one already consumed
                let mut value = esc.to_digit(8).unwrap();
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char_from_u32(value, loc)?);
            }
            'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    digits += 1;
                    chars.next();
                }
                if digits == 0 {
                    return Err(CompilerError::lexical("Missing hex digits after \\x", loc));
                }
                out.push(char_from_u32(value, loc)?);
            }
            'u' => out.push(decode_unicode(&mut chars, 4, loc)?),
            'U' => out.push(decode_unicode(&mut chars, 8, loc)?),
            other => {
                return Err(CompilerError::lexical(
                    format!("Unknown escape sequence '\\{}'", other),
                    loc,
                ));
            }
        }
    }

    Ok(out)
}

fn decode_unicode(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: u32,
    loc: SourceLoc,
) -> CResult<char> {
    let mut value: u32 = 0;
    for _ in 0..digits {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| CompilerError::lexical("Malformed universal character name", loc))?;
        value = value * 16 + d;
    }
    char_from_u32(value, loc)
}

fn char_from_u32(value: u32, loc: SourceLoc) -> CResult<char> {
    char::from_u32(value)
        .ok_or_else(|| CompilerError::lexical(format!("Invalid code point U+{:X}", value), loc))
}

/// Encode one decoded character as initializer bytes: characters up to
/// U+00FF become the single byte they denote (so `\x81` round-trips),
/// anything higher is encoded as UTF-8.
pub fn encode_char(ch: char, out: &mut Vec<u8>) {
    let cp = ch as u32;
    if cp <= 0xFF {
        out.push(cp as u8);
    } else {
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(src: &str) -> String {
        decode_escapes(src, SourceLoc::start()).unwrap()
    }

    #[test]
    fn escape_strings() {
        let src = r#"\' \" \? \\ \a \b \f \n \r \t \v \0 \001"#;
        let expected = "' \" ? \\ \u{7} \u{8} \u{c} \n \r \t \u{b} \0 \u{1}";
        assert_eq!(decode(src), expected);
    }

    #[test]
    fn escape_unicode() {
        let src = r"H \xfe \u1234 \U00010123";
        let expected = "H \u{fe} \u{1234} \u{10123}";
        assert_eq!(decode(src), expected);
    }

    #[test]
    fn octal_stops_after_three_digits() {
        assert_eq!(decode(r"\1234"), "\u{53}4");
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let err = decode_escapes(r"\q", SourceLoc::new(4, 2)).unwrap_err();
        assert!(err.message.contains("Unknown escape sequence"));
        assert_eq!(err.loc.row, 4);
    }

    #[test]
    fn missing_hex_digits() {
        assert!(decode_escapes(r"\x", SourceLoc::start()).is_err());
    }

    #[test]
    fn byte_encoding_keeps_high_bytes() {
        let mut bytes = Vec::new();
        for ch in decode(r"\x81A").chars() {
            encode_char(ch, &mut bytes);
        }
        assert_eq!(bytes, vec![0x81, b'A']);
    }
}
