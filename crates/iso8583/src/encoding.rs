//! Payload encodings: how a field's canonical bytes are written on the wire.

use std::fmt;

use crate::errors::EncodingError;

/// Transcodes a payload between its canonical form and its wire form.
///
/// `encode` and `decode` must be inverse on valid input and reject bytes
/// outside the encoding's character domain.
pub trait Encoder: fmt::Debug + Send + Sync {
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, EncodingError>;

    /// Decodes exactly `encoded`. `length` is the canonical length the field
    /// declares; encodings whose width already fixes it ignore the argument.
    fn decode(&self, encoded: &[u8], length: usize) -> Result<Vec<u8>, EncodingError>;

    /// Number of wire bytes for `length` canonical bytes.
    fn encoded_len(&self, length: usize) -> usize;
}

/// 7-bit ASCII passthrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascii;

impl Ascii {
    fn check(data: &[u8]) -> Result<(), EncodingError> {
        match data.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(EncodingError::NonAscii {
                byte: data[offset],
                offset,
            }),
            None => Ok(()),
        }
    }
}

impl Encoder for Ascii {
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, EncodingError> {
        Self::check(raw)?;
        Ok(raw.to_vec())
    }

    fn decode(&self, encoded: &[u8], _length: usize) -> Result<Vec<u8>, EncodingError> {
        Self::check(encoded)?;
        Ok(encoded.to_vec())
    }

    fn encoded_len(&self, length: usize) -> usize {
        length
    }
}

/// Opaque bytes, copied unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl Encoder for Binary {
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, EncodingError> {
        Ok(raw.to_vec())
    }

    fn decode(&self, encoded: &[u8], _length: usize) -> Result<Vec<u8>, EncodingError> {
        Ok(encoded.to_vec())
    }

    fn encoded_len(&self, length: usize) -> usize {
        length
    }
}

/// Packed BCD: two ASCII digits per byte, odd lengths left-padded with a zero nibble.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bcd;

impl Encoder for Bcd {
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, EncodingError> {
        let pad = raw.len() % 2;
        let mut out = vec![0u8; (raw.len() + 1) / 2];

        for (offset, &byte) in raw.iter().enumerate() {
            if !byte.is_ascii_digit() {
                return Err(EncodingError::NonDigit { byte, offset });
            }
            let nibble = byte - b'0';
            let pos = offset + pad;
            if pos % 2 == 0 {
                out[pos / 2] |= nibble << 4;
            } else {
                out[pos / 2] |= nibble;
            }
        }

        Ok(out)
    }

    fn decode(&self, encoded: &[u8], length: usize) -> Result<Vec<u8>, EncodingError> {
        let mut digits = Vec::with_capacity(encoded.len() * 2);

        for (offset, &byte) in encoded.iter().enumerate() {
            for nibble in [byte >> 4, byte & 0x0f] {
                if nibble > 9 {
                    return Err(EncodingError::InvalidNibble { nibble, offset });
                }
                digits.push(b'0' + nibble);
            }
        }

        if length > 0 && length < digits.len() {
            digits.drain(..digits.len() - length);
        }

        Ok(digits)
    }

    fn encoded_len(&self, length: usize) -> usize {
        (length + 1) / 2
    }
}

/// Raw bytes rendered as uppercase ASCII hex, two wire bytes per raw byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hex;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_value(byte: u8, offset: usize) -> Result<u8, EncodingError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        _ => Err(EncodingError::InvalidHex { byte, offset }),
    }
}

impl Encoder for Hex {
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::with_capacity(raw.len() * 2);
        for &byte in raw {
            out.push(HEX_DIGITS[(byte >> 4) as usize]);
            out.push(HEX_DIGITS[(byte & 0x0f) as usize]);
        }
        Ok(out)
    }

    fn decode(&self, encoded: &[u8], _length: usize) -> Result<Vec<u8>, EncodingError> {
        if encoded.len() % 2 != 0 {
            return Err(EncodingError::OddHexLength(encoded.len()));
        }

        encoded
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| -> Result<u8, EncodingError> {
                Ok(hex_value(pair[0], 2 * i)? << 4 | hex_value(pair[1], 2 * i + 1)?)
            })
            .collect()
    }

    fn encoded_len(&self, length: usize) -> usize {
        length * 2
    }
}
