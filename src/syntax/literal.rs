//! Decoding of Go literal tokens into constant values.

use crate::ast::LitKind;
use crate::types::Constant;

/// Decodes a literal token. Returns `None` for tokens that are malformed or out of
/// the supported range (imaginary numbers, integers beyond 128 bits).
pub fn decode(kind: LitKind, raw: &str) -> Option<Constant> {
    match kind {
        LitKind::String => unquote_interpreted(raw).map(Constant::String),
        LitKind::RawString => unquote_raw(raw).map(Constant::String),
        LitKind::Int => parse_int(raw).map(Constant::Int),
        LitKind::Float => parse_float(raw).map(Constant::Float),
        LitKind::Rune => unquote_rune(raw).map(|c| Constant::Int(c as i128)),
        LitKind::Imaginary => None,
    }
}

/// `` `text` `` with carriage returns removed.
pub fn unquote_raw(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('`')?.strip_suffix('`')?;
    Some(inner.replace('\r', ""))
}

/// `"text"` with Go escape sequences decoded. Byte escapes that do not form valid UTF-8
/// are not folded: the literal is treated as non-constant rather than altered.
pub fn unquote_interpreted(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let bytes = unescape(inner, '"')?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(_) => {
            tracing::warn!("String literal {} is not valid UTF-8", raw);
            None
        }
    }
}

/// `'c'` as a code point.
pub fn unquote_rune(raw: &str) -> Option<char> {
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    if !inner.starts_with('\\') {
        let mut chars = inner.chars();
        let c = chars.next()?;
        return chars.next().is_none().then_some(c);
    }
    let bytes = unescape(inner, '\'')?;
    let text = std::str::from_utf8(&bytes).ok()?;
    let mut chars = text.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn unescape(inner: &str, quote: char) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let esc = chars.next()?;
        match esc {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            c if c == quote => out.push(c as u8),
            'x' => out.push(take_radix(&mut chars, 2, 16)? as u8),
            'u' | 'U' => {
                let digits = if esc == 'u' { 4 } else { 8 };
                let c = char::from_u32(take_radix(&mut chars, digits, 16)?)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            '0'..='7' => {
                let rest = take_radix(&mut chars, 2, 8)?;
                let value = (esc as u32 - '0' as u32) * 64 + rest;
                out.push(u8::try_from(value).ok()?);
            }
            _ => return None,
        }
    }
    Some(out)
}

fn take_radix(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
    radix: u32,
) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..digits {
        let d = chars.next()?.to_digit(radix)?;
        value = value.checked_mul(radix)?.checked_add(d)?;
    }
    Some(value)
}

/// Go integer literal: decimal, `0x`, `0o`, `0b`, legacy leading-zero octal, `_`
/// separators.
pub fn parse_int(raw: &str) -> Option<i128> {
    let text: String = raw.chars().filter(|&c| c != '_').collect();
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest.to_string(), 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest.to_string(), 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest.to_string(), 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (lower[1..].to_string(), 8)
    } else {
        (lower, 10)
    };
    i128::from_str_radix(&digits, radix).ok()
}

pub fn parse_float(raw: &str) -> Option<f64> {
    let text: String = raw.chars().filter(|&c| c != '_').collect();
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreted_strings() {
        assert_eq!(unquote_interpreted(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(unquote_interpreted(r#""\x41\101é""#).as_deref(), Some("AAé"));
        assert_eq!(unquote_interpreted(r#""say \"hi\"""#).as_deref(), Some("say \"hi\""));
        assert_eq!(unquote_interpreted(r#""bad \q""#), None);
    }

    #[test]
    fn invalid_utf8_is_not_folded() {
        assert_eq!(unquote_interpreted(r#""x\xffy""#), None);
        assert_eq!(unquote_interpreted(r#""\xc3\xa9""#).as_deref(), Some("é"));
    }

    #[test]
    fn raw_strings_drop_carriage_returns() {
        assert_eq!(unquote_raw("`a\r\nb`").as_deref(), Some("a\nb"));
        assert_eq!(unquote_raw("`\\n`").as_deref(), Some("\\n"));
    }

    #[test]
    fn runes() {
        assert_eq!(unquote_rune("'a'"), Some('a'));
        assert_eq!(unquote_rune(r"'\n'"), Some('\n'));
        assert_eq!(unquote_rune(r"'\''"), Some('\''));
        assert_eq!(unquote_rune("'ab'"), None);
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0"), Some(0));
    }

    #[test]
    fn decode_dispatches_on_kind() {
        assert_eq!(decode(LitKind::Float, "1.5"), Some(Constant::Float(1.5)));
        assert_eq!(decode(LitKind::Rune, "'A'"), Some(Constant::Int(65)));
        assert_eq!(decode(LitKind::Imaginary, "2i"), None);
    }
}
