//! Bit-field codec
//!
//! Conversions between decimal values, fixed-width binary strings and
//! hexadecimal. Every address in the simulator travels as a binary string so
//! the index and offset fields can be split and reassembled bit for bit.

use crate::constants::*;
use crate::error::CodecError;

/// Render `value` as exactly `width` binary digits, zero-padded on the left.
///
/// Values that need more than `width` bits are rejected instead of losing
/// their high bits. A zero-width field holds only the value 0, rendered as "".
pub fn decimal_to_binary(value: u64, width: u32) -> Result<String, CodecError> {
    if width < u64::BITS && value >> width != 0 {
        return Err(CodecError::FieldOverflow { value, width });
    }
    if width == 0 {
        return Ok(String::new());
    }
    Ok(format!("{:0width$b}", value, width = width as usize))
}

/// Map a single hex character (either case) to its 4-bit pattern.
pub fn hex_digit_to_binary(digit: char) -> Result<&'static str, CodecError> {
    let bits = match digit.to_ascii_lowercase() {
        '0' => "0000",
        '1' => "0001",
        '2' => "0010",
        '3' => "0011",
        '4' => "0100",
        '5' => "0101",
        '6' => "0110",
        '7' => "0111",
        '8' => "1000",
        '9' => "1001",
        'a' => "1010",
        'b' => "1011",
        'c' => "1100",
        'd' => "1101",
        'e' => "1110",
        'f' => "1111",
        _ => return Err(CodecError::InvalidDigit(digit)),
    };
    Ok(bits)
}

/// Expand a hex string into binary, most significant digit first.
pub fn hex_string_to_binary(hex: &str) -> Result<String, CodecError> {
    let mut binary = String::with_capacity(hex.len() * NIBBLE_BITS as usize);
    for digit in hex.chars() {
        binary.push_str(hex_digit_to_binary(digit)?);
    }
    Ok(binary)
}

/// Group a binary string into nibbles counted from the least significant end.
///
/// The string is padded to a whole number of nibbles so the separators land
/// on nibble boundaries, then the padding is cut off again: `1010101`
/// renders as `101 0101`.
pub fn format_grouped(binary: &str) -> String {
    let nibble = NIBBLE_BITS as usize;
    let padding = (nibble - binary.len() % nibble) % nibble;
    let padded = format!("{}{}", "0".repeat(padding), binary);

    let mut grouped = String::with_capacity(padded.len() + padded.len() / nibble);
    for (i, bit) in padded.chars().enumerate() {
        grouped.push(bit);
        if (i + 1) % nibble == 0 && i + 1 != padded.len() {
            grouped.push(GROUP_SEPARATOR);
        }
    }

    grouped[padding..].to_string()
}

/// Parse a binary field. An empty field has no value and is rejected.
pub fn binary_to_decimal(binary: &str) -> Result<u64, CodecError> {
    if binary.is_empty() {
        return Err(CodecError::EmptyField);
    }
    if let Some(bad) = binary.chars().find(|c| *c != '0' && *c != '1') {
        return Err(CodecError::InvalidBit(bad));
    }
    let significant = binary.trim_start_matches('0');
    if significant.len() > u64::BITS as usize {
        return Err(CodecError::FieldOverflow {
            value: u64::MAX,
            width: u64::BITS,
        });
    }
    if significant.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(significant, 2).map_err(|_| CodecError::FieldOverflow {
        value: u64::MAX,
        width: u64::BITS,
    })
}

/// Uppercase hex rendering of a binary string, zero-padded to `digits`.
pub fn binary_to_hex(binary: &str, digits: usize) -> Result<String, CodecError> {
    let value = binary_to_decimal(binary)?;
    Ok(format!("{:0digits$X}", value, digits = digits))
}

/// Number of hex digits needed to show a field of `bits` bits.
#[inline]
pub fn hex_digits_for(bits: u32) -> usize {
    bits.div_ceil(NIBBLE_BITS) as usize
}

/// Fit a binary string to exactly `width` bits.
///
/// Shorter input is zero-extended. Longer input may only drop leading zero
/// bits; `None` means a dropped bit was set and the value does not fit.
pub fn fit_to_width(binary: &str, width: u32) -> Option<String> {
    let width = width as usize;
    if binary.len() <= width {
        return Some(format!("{}{}", "0".repeat(width - binary.len()), binary));
    }
    let (extra, kept) = binary.split_at(binary.len() - width);
    if extra.contains('1') {
        return None;
    }
    Some(kept.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_to_binary_pads_left() {
        assert_eq!(decimal_to_binary(5, 8).unwrap(), "00000101");
        assert_eq!(decimal_to_binary(0, 3).unwrap(), "000");
        assert_eq!(decimal_to_binary(7, 3).unwrap(), "111");
    }

    #[test]
    fn test_decimal_to_binary_rejects_overflow() {
        // 8 needs 4 bits, only 3 available
        assert_eq!(
            decimal_to_binary(8, 3),
            Err(CodecError::FieldOverflow { value: 8, width: 3 })
        );
        assert!(decimal_to_binary(1, 0).is_err());
    }

    #[test]
    fn test_decimal_to_binary_zero_width() {
        assert_eq!(decimal_to_binary(0, 0).unwrap(), "");
    }

    #[test]
    fn test_decimal_to_binary_full_width() {
        let bits = decimal_to_binary(u64::MAX, 64).unwrap();
        assert_eq!(bits.len(), 64);
        assert!(bits.chars().all(|c| c == '1'));
    }

    #[test]
    fn test_hex_digit_to_binary_case_insensitive() {
        assert_eq!(hex_digit_to_binary('a').unwrap(), "1010");
        assert_eq!(hex_digit_to_binary('A').unwrap(), "1010");
        assert_eq!(hex_digit_to_binary('0').unwrap(), "0000");
        assert_eq!(hex_digit_to_binary('F').unwrap(), "1111");
    }

    #[test]
    fn test_hex_digit_to_binary_invalid() {
        assert_eq!(hex_digit_to_binary('g'), Err(CodecError::InvalidDigit('g')));
        assert_eq!(hex_digit_to_binary(' '), Err(CodecError::InvalidDigit(' ')));
    }

    #[test]
    fn test_hex_string_to_binary() {
        assert_eq!(hex_string_to_binary("2A3F").unwrap(), "0010101000111111");
        assert_eq!(hex_string_to_binary("").unwrap(), "");
        assert_eq!(hex_string_to_binary("1x"), Err(CodecError::InvalidDigit('x')));
    }

    #[test]
    fn test_format_grouped_aligns_to_lsb() {
        assert_eq!(format_grouped("1010101"), "101 0101");
        assert_eq!(format_grouped("10101010"), "1010 1010");
        assert_eq!(format_grouped("0010000000000101"), "0010 0000 0000 0101");
        assert_eq!(format_grouped("1"), "1");
        assert_eq!(format_grouped(""), "");
    }

    #[test]
    fn test_format_grouped_keeps_bit_count() {
        let bits = "110000000000001";
        let grouped = format_grouped(bits);
        assert_eq!(grouped, "110 0000 0000 0001");
        assert_eq!(grouped.chars().filter(|c| *c != GROUP_SEPARATOR).count(), bits.len());
    }

    #[test]
    fn test_binary_to_decimal() {
        assert_eq!(binary_to_decimal("001").unwrap(), 1);
        assert_eq!(binary_to_decimal("000").unwrap(), 0);
        assert_eq!(binary_to_decimal("1101").unwrap(), 13);
        assert_eq!(binary_to_decimal(""), Err(CodecError::EmptyField));
        assert_eq!(binary_to_decimal("012"), Err(CodecError::InvalidBit('2')));
    }

    #[test]
    fn test_binary_to_hex_uppercase_padded() {
        assert_eq!(binary_to_hex("0010101000111111", 4).unwrap(), "2A3F");
        assert_eq!(binary_to_hex("000000000000101", 4).unwrap(), "0005");
    }

    #[test]
    fn test_hex_digits_for() {
        assert_eq!(hex_digits_for(16), 4);
        assert_eq!(hex_digits_for(15), 4);
        assert_eq!(hex_digits_for(13), 4);
        assert_eq!(hex_digits_for(12), 3);
    }

    #[test]
    fn test_fit_to_width() {
        // zero-extend
        assert_eq!(fit_to_width("101", 6).unwrap(), "000101");
        // drop leading zeros
        assert_eq!(fit_to_width("0000101", 4).unwrap(), "0101");
        // set bit in the dropped part
        assert_eq!(fit_to_width("1000101", 4), None);
        assert_eq!(fit_to_width("0101", 4).unwrap(), "0101");
    }
}
