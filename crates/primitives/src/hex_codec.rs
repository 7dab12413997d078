//! Hex parsing/formatting helpers that implement the conventions in the spec's
//! "External interfaces" section: inputs accept lowercase hex with or without a `0x`
//! prefix; raw byte output is lowercase without a prefix, U256 output is lowercase
//! with a `0x` prefix padded to 64 nibbles.

use crate::error::{Result, TinyEvmError};
use alloy_primitives::{Address, U256};

fn strip_0x(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

pub fn decode_bytes(field: &'static str, input: &str) -> Result<Vec<u8>> {
    hex::decode(strip_0x(input)).map_err(|err| TinyEvmError::InvalidHex {
        field,
        message: err.to_string(),
    })
}

pub fn decode_address(field: &'static str, input: &str) -> Result<Address> {
    let bytes = decode_bytes(field, input)?;
    if bytes.len() != 20 {
        return Err(TinyEvmError::InvalidAddressLength {
            field,
            len: bytes.len(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

pub fn decode_salt(input: &str) -> Result<[u8; 32]> {
    let bytes = decode_bytes("salt", input)?;
    if bytes.len() != 32 {
        return Err(TinyEvmError::InvalidSaltLength(bytes.len()));
    }
    let mut salt = [0u8; 32];
    salt.copy_from_slice(&bytes);
    Ok(salt)
}

pub fn decode_u256(field: &'static str, input: &str) -> Result<U256> {
    let trimmed = strip_0x(input);
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    U256::from_str_radix(trimmed, 16).map_err(|err| TinyEvmError::InvalidHex {
        field,
        message: err.to_string(),
    })
}

/// Lowercase, no `0x` prefix — the convention for raw byte payloads (addresses, code, calldata).
pub fn encode_bytes(data: &[u8]) -> String {
    hex::encode(data)
}

/// Lowercase, `0x`-prefixed, padded to 64 nibbles — the convention for U256 env fields.
pub fn encode_u256(value: U256) -> String {
    format!("0x{value:064x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_bytes_accepts_0x_prefix_and_bare_hex_alike() {
        assert_eq!(decode_bytes("x", "0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_bytes("x", "deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_bytes("x", "0XDEADBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn decode_bytes_rejects_malformed_hex() {
        let err = decode_bytes("input", "0xzz").unwrap_err();
        assert!(matches!(err, TinyEvmError::InvalidHex { field: "input", .. }));
    }

    #[test]
    fn bytes_round_trip_through_encode_and_decode() {
        let original = vec![0x01, 0x02, 0xff, 0x00, 0xab];
        let encoded = encode_bytes(&original);
        assert_eq!(encoded, "0102ff00ab");
        assert_eq!(decode_bytes("x", &encoded).unwrap(), original);
    }

    #[test]
    fn decode_address_requires_exactly_twenty_bytes() {
        let addr = decode_address("addr", "0x0102030405060708090a0b0c0d0e0f1011121314").unwrap();
        assert_eq!(addr.as_slice(), &hex::decode("0102030405060708090a0b0c0d0e0f1011121314").unwrap()[..]);

        let err = decode_address("addr", "0xaabb").unwrap_err();
        assert!(matches!(err, TinyEvmError::InvalidAddressLength { field: "addr", len: 2 }));
    }

    #[test]
    fn decode_salt_requires_exactly_thirty_two_bytes() {
        let salt = decode_salt(&"11".repeat(32)).unwrap();
        assert_eq!(salt, [0x11u8; 32]);

        let err = decode_salt(&"11".repeat(31)).unwrap_err();
        assert!(matches!(err, TinyEvmError::InvalidSaltLength(31)));
    }

    #[test]
    fn u256_round_trips_through_encode_and_decode() {
        let value = U256::from(0xdeadbeefu64);
        let encoded = encode_u256(value);
        assert_eq!(encoded, format!("0x{:064x}", 0xdeadbeefu64));
        assert_eq!(decode_u256("x", &encoded).unwrap(), value);
    }

    #[test]
    fn decode_u256_treats_empty_hex_as_zero() {
        assert_eq!(decode_u256("x", "0x").unwrap(), U256::ZERO);
        assert_eq!(decode_u256("x", "").unwrap(), U256::ZERO);
    }
}
