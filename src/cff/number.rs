//! Operand encoding shared by DICT data and charstrings.
//!
//! Refer to Table 3 "Operand Encoding" and Table 5 "Nibble Definitions" in section 4 of
//! Technical Note #5176.

use lazy_static::lazy_static;
use log::warn;
use num_traits::ToPrimitive;
use regex::Regex;
use tinyvec::TinyVec;

use crate::binary::read::ReadCtxt;
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::{I16Be, I32Be, U8};
use crate::error::{ParseError, WriteError};

pub(crate) const REAL_MARKER: u8 = 30;
const END_OF_FLOAT_FLAG: u8 = 0xf;

lazy_static! {
    // A fraction ending in a long run of 9s or 0s, optionally followed by an exponent. Such
    // strings come from values like 0.1 + 0.2 and are rounded before packing.
    static ref LONG_RUN_FRACTION: Regex =
        Regex::new(r"\.(\d*?)(?:9{5,20}|0{5,20})\d{0,2}(?:e(.+)|$)").unwrap();
}

/// Decode the operand introduced by `b0`, which has already been consumed from `ctxt`.
///
/// Reserved operand bytes decode as NaN; callers drop entries holding NaN.
pub(crate) fn read_operand(ctxt: &mut ReadCtxt<'_>, b0: u8) -> Result<f64, ParseError> {
    let value = match b0 {
        28 => f64::from(ctxt.read_i16be()?),
        29 => f64::from(ctxt.read_i32be()?),
        REAL_MARKER => read_real(ctxt)?,
        32..=246 => f64::from(i32::from(b0) - 139),
        247..=250 => {
            let b1 = ctxt.read_u8()?;
            f64::from((i32::from(b0) - 247) * 256 + i32::from(b1) + 108)
        }
        251..=254 => {
            let b1 = ctxt.read_u8()?;
            f64::from(-(i32::from(b0) - 251) * 256 - i32::from(b1) - 108)
        }
        _ => {
            warn!("invalid byte in CFF dict operand: {}", b0);
            f64::NAN
        }
    };
    Ok(value)
}

fn read_real(ctxt: &mut ReadCtxt<'_>) -> Result<f64, ParseError> {
    let mut text = String::new();
    while ctxt.bytes_available() {
        let byte = ctxt.read_u8()?;
        for nibble in [byte >> 4, byte & 0xf] {
            if nibble == END_OF_FLOAT_FLAG {
                return Ok(parse_float_prefix(&text));
            }
            match nibble {
                0..=9 => text.push(char::from(b'0' + nibble)),
                0xa => text.push('.'),
                0xb => text.push('E'),
                0xc => text.push_str("E-"),
                0xe => text.push('-'),
                // 0xd is reserved and can never be part of a number
                _ => text.push('?'),
            }
        }
    }
    Ok(parse_float_prefix(&text))
}

/// Parse the longest prefix of `text` that forms a decimal number, NaN when there is none.
fn parse_float_prefix(text: &str) -> f64 {
    let bytes = text.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        mantissa_digits += fraction_end - fraction_start;
        end = fraction_end;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && bytes[end] == b'E' {
        let mut exponent_end = end + 1;
        if bytes.get(exponent_end) == Some(&b'-') {
            exponent_end += 1;
        }
        let exponent_digits = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits {
            end = exponent_end;
        }
    }
    text[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Write `value` using the shortest integer form, or as a real if it has a fractional part.
pub(crate) fn write_number<C: WriteContext>(ctxt: &mut C, value: f64) -> Result<(), WriteError> {
    match value.to_i32() {
        Some(int) if value.fract() == 0.0 => write_integer(ctxt, int),
        _ => write_real(ctxt, value),
    }
}

pub(crate) fn write_integer<C: WriteContext>(ctxt: &mut C, value: i32) -> Result<(), WriteError> {
    match value {
        // NOTE: Casts are safe due to patterns limiting range
        -107..=107 => U8::write(ctxt, (value + 139) as u8),
        108..=1131 => {
            let value = value - 108;
            U8::write(ctxt, ((value >> 8) + 247) as u8)?;
            U8::write(ctxt, value as u8)
        }
        -1131..=-108 => {
            let value = -value - 108;
            U8::write(ctxt, ((value >> 8) + 251) as u8)?;
            U8::write(ctxt, value as u8)
        }
        -32768..=32767 => {
            U8::write(ctxt, 28)?;
            I16Be::write(ctxt, value as i16)
        }
        _ => {
            U8::write(ctxt, 29)?;
            I32Be::write(ctxt, value)
        }
    }
}

pub(crate) fn write_real<C: WriteContext>(ctxt: &mut C, value: f64) -> Result<(), WriteError> {
    if !value.is_finite() {
        return Err(WriteError::BadValue);
    }
    let text = rounded_number_string(value);

    let mut nibbles: TinyVec<[u8; 24]> = TinyVec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'e' => match chars.peek() {
                Some('-') => {
                    chars.next();
                    nibbles.push(0xc);
                }
                Some('+') => {
                    chars.next();
                    nibbles.push(0xb);
                }
                _ => nibbles.push(0xb),
            },
            '.' => nibbles.push(0xa),
            '-' => nibbles.push(0xe),
            _ => {
                let digit = c.to_digit(10).ok_or(WriteError::BadValue)?;
                nibbles.push(digit as u8);
            }
        }
    }
    nibbles.push(END_OF_FLOAT_FLAG);
    if nibbles.len() % 2 == 1 {
        nibbles.push(END_OF_FLOAT_FLAG);
    }

    U8::write(ctxt, REAL_MARKER)?;
    ctxt.write_iter::<U8, _>(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]))
}

fn rounded_number_string(value: f64) -> String {
    let text = number_string(value);
    let captures = match LONG_RUN_FRACTION.captures(&text) {
        Some(captures) => captures,
        None => return text,
    };
    let fraction_len = captures.get(1).map_or(0, |m| m.as_str().len());
    let exponent = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(0);
    let Ok(places) = i32::try_from(fraction_len).map(|len| len + exponent) else {
        return text;
    };
    let epsilon = 10f64.powi(places);
    let rounded = (value * epsilon + 0.5).floor() / epsilon;
    if rounded.is_finite() {
        number_string(rounded)
    } else {
        text
    }
}

/// Shortest round-trip decimal form of `value`, switching to exponent notation for very small
/// and very large magnitudes.
fn number_string(value: f64) -> String {
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };
    if value == 0.0 || (-6..21).contains(&exponent) {
        format!("{}", value)
    } else {
        format!("{}e{}", mantissa, exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::binary::write::WriteBuffer;

    fn write_int_operand(val: i32) -> Vec<u8> {
        let mut ctxt = WriteBuffer::new();
        write_integer(&mut ctxt, val).unwrap();
        ctxt.into_inner()
    }

    fn write_real_operand(val: f64) -> Vec<u8> {
        let mut ctxt = WriteBuffer::new();
        write_real(&mut ctxt, val).unwrap();
        ctxt.into_inner()
    }

    fn read(data: &[u8]) -> f64 {
        let mut ctxt = ReadScope::new(data).ctxt();
        let b0 = ctxt.read_u8().unwrap();
        read_operand(&mut ctxt, b0).unwrap()
    }

    #[test]
    fn test_write_int_operand() {
        assert_eq!(write_int_operand(0), &[0x8b]);
        assert_eq!(write_int_operand(100), &[0xef]);
        assert_eq!(write_int_operand(-100), &[0x27]);
        assert_eq!(write_int_operand(1000), &[0xfa, 0x7c]);
        assert_eq!(write_int_operand(-1000), &[0xfe, 0x7c]);
        assert_eq!(write_int_operand(10000), &[0x1c, 0x27, 0x10]);
        assert_eq!(write_int_operand(-10000), &[0x1c, 0xd8, 0xf0]);
        assert_eq!(write_int_operand(100000), &[0x1d, 0x00, 0x01, 0x86, 0xa0]);
        assert_eq!(write_int_operand(-100000), &[0x1d, 0xff, 0xfe, 0x79, 0x60]);
    }

    #[test]
    fn test_read_int_operands() {
        assert_eq!(read(&[0x8b]), 0.0);
        assert_eq!(read(&[0xef]), 100.0);
        assert_eq!(read(&[0x27]), -100.0);
        assert_eq!(read(&[0xfa, 0x7c]), 1000.0);
        assert_eq!(read(&[0xfe, 0x7c]), -1000.0);
        assert_eq!(read(&[0x1c, 0xd8, 0xf0]), -10000.0);
        assert_eq!(read(&[0x1d, 0xff, 0xfe, 0x79, 0x60]), -100000.0);
    }

    #[test]
    fn test_write_real_operand() {
        assert_eq!(write_real_operand(-2.25), &[0x1e, 0xe2, 0xa2, 0x5f]);
        assert_eq!(write_real_operand(5e-11), &[0x1e, 0x5c, 0x11, 0xff]);
        assert_eq!(write_real_operand(0.001), &[0x1e, 0x0a, 0x00, 0x1f]);
    }

    #[test]
    fn test_write_real_rounds_long_runs() {
        // 0.1 + 0.2 is 0.30000000000000004
        assert_eq!(write_real_operand(0.1 + 0.2), &[0x1e, 0x0a, 0x3f]);
        assert_eq!(rounded_number_string(0.039625), "0.039625");
        assert_eq!(rounded_number_string(1.9999999999), "2");
    }

    #[test]
    fn test_number_string() {
        assert_eq!(number_string(0.000001), "0.000001");
        assert_eq!(number_string(1e-7), "1e-7");
        assert_eq!(number_string(1.5e21), "1.5e21");
        assert_eq!(number_string(-0.5), "-0.5");
    }

    #[test]
    fn test_write_number_picks_form() {
        let mut ctxt = WriteBuffer::new();
        write_number(&mut ctxt, 2.0).unwrap();
        write_number(&mut ctxt, 0.5).unwrap();
        assert_eq!(ctxt.bytes(), &[0x8d, 0x1e, 0x0a, 0x5f]);
    }

    #[test]
    fn test_read_real() {
        assert_eq!(read(&[0x1e, 0xe2, 0xa2, 0x5f]), -2.25);
        assert_eq!(read(&[0x1e, 0x5c, 0x11, 0xff]), 5e-11);
        assert_eq!(read(&[0x1e, 0x1b, 0x2f]), 100.0);
        // A missing terminator reads to the end of the data
        assert_eq!(read(&[0x1e, 0x15]), 15.0);
    }

    #[test]
    fn test_read_real_prefix() {
        // "1.5E" has no exponent digits so only the mantissa is used
        assert_eq!(read(&[0x1e, 0x1a, 0x5b, 0xff]), 1.5);
        assert!(read(&[0x1e, 0xef]).is_nan());
        assert!(read(&[0x1e, 0xd1, 0xff]).is_nan());
    }

    #[test]
    fn test_reserved_operand_is_nan() {
        assert!(read(&[22]).is_nan());
        assert!(read(&[255]).is_nan());
    }

    #[test]
    fn test_int_operand_round_trip() {
        for val in [0, 100, 540, -100, -267, 1000, -1000, 10000, -10000, 100000, -100000] {
            assert_eq!(read(&write_int_operand(val)), f64::from(val));
        }
    }
}
