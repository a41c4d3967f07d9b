//! Big-endian ("network byte order") integer helpers.
//!
//! SASL security layers encode sequence numbers, message types and buffer
//! sizes as unsigned big-endian integers of one to four bytes.

use crate::error::{SaslError, SaslResult};

/// Widest integer the helpers accept, in bytes.
pub const MAX_INT_WIDTH: usize = 4;

fn check_width(len: usize) -> SaslResult<()> {
    if len == 0 || len > MAX_INT_WIDTH {
        return Err(SaslError::invalid_length()
            .with_context(format!("width {len} not in 1..={MAX_INT_WIDTH}")));
    }
    Ok(())
}

/// Decodes a big-endian unsigned integer from `buf`.
///
/// # Errors
///
/// Returns `InvalidLength` if `buf` is empty or longer than four bytes.
///
/// # Example
///
/// ```
/// use saslwrap::util::network_byte_order_to_int;
///
/// assert_eq!(network_byte_order_to_int(&[0x01, 0x00]).unwrap(), 256);
/// assert!(network_byte_order_to_int(&[0; 5]).is_err());
/// ```
pub fn network_byte_order_to_int(buf: &[u8]) -> SaslResult<u32> {
    check_width(buf.len())?;
    Ok(buf.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// Encodes `value` big-endian into all of `out`.
///
/// High-order bytes that do not fit in `out` are discarded, the same way a
/// narrowing cast would.
///
/// # Errors
///
/// Returns `InvalidLength` if `out` is empty or longer than four bytes.
///
/// # Example
///
/// ```
/// use saslwrap::util::int_to_network_byte_order;
///
/// let mut out = [0u8; 2];
/// int_to_network_byte_order(1, &mut out).unwrap();
/// assert_eq!(out, [0x00, 0x01]);
/// ```
pub fn int_to_network_byte_order(value: u32, out: &mut [u8]) -> SaslResult<()> {
    check_width(out.len())?;
    let be = value.to_be_bytes();
    out.copy_from_slice(&be[MAX_INT_WIDTH - out.len()..]);
    Ok(())
}
