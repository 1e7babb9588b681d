//! Length prefixes: how a field announces the length of its payload.
//!
//! Lengths passed to and returned from a [Prefixer] are canonical (decoded)
//! lengths. Fields convert them to wire byte counts through
//! [crate::encoding::Encoder::encoded_len].

use std::fmt;

use crate::errors::PrefixError;

/// Encodes and decodes the length that precedes a payload.
pub trait Prefixer: fmt::Debug + Send + Sync {
    /// Writes `data_len`, checked against `max_len`.
    fn encode_length(&self, max_len: usize, data_len: usize) -> Result<Vec<u8>, PrefixError>;

    /// Reads the length at the start of `data`, checked against `max_len`.
    fn decode_length(&self, max_len: usize, data: &[u8]) -> Result<usize, PrefixError>;

    /// Wire width of the prefix itself.
    fn width(&self) -> usize;
}

/// No prefix: the payload always has its declared length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed;

impl Prefixer for Fixed {
    fn encode_length(&self, max_len: usize, data_len: usize) -> Result<Vec<u8>, PrefixError> {
        if data_len != max_len {
            return Err(PrefixError::FixedMismatch {
                expected: max_len,
                actual: data_len,
            });
        }
        Ok(Vec::new())
    }

    fn decode_length(&self, max_len: usize, _data: &[u8]) -> Result<usize, PrefixError> {
        Ok(max_len)
    }

    fn width(&self) -> usize {
        0
    }
}

fn check_max(max_len: usize, actual: usize) -> Result<(), PrefixError> {
    if actual > max_len {
        return Err(PrefixError::TooLong {
            max: max_len,
            actual,
        });
    }
    Ok(())
}

fn check_available(needed: usize, data: &[u8]) -> Result<(), PrefixError> {
    if data.len() < needed {
        return Err(PrefixError::Truncated {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn decimal_digits(length: usize, digits: usize) -> Result<Vec<u8>, PrefixError> {
    let text = length.to_string();
    if text.len() > digits {
        return Err(PrefixError::Overflow {
            length,
            width: digits,
        });
    }

    let mut out = vec![b'0'; digits - text.len()];
    out.extend_from_slice(text.as_bytes());
    Ok(out)
}

/// Length written as ASCII decimal digits (`L`, `LL`, `LLL`, `LLLL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ascii {
    digits: usize,
}

impl Ascii {
    pub const L: Ascii = Ascii { digits: 1 };
    pub const LL: Ascii = Ascii { digits: 2 };
    pub const LLL: Ascii = Ascii { digits: 3 };
    pub const LLLL: Ascii = Ascii { digits: 4 };

    /// Returns `None` unless `digits` is in 1..=4.
    pub fn with_digits(digits: usize) -> Option<Self> {
        (1..=4).contains(&digits).then_some(Ascii { digits })
    }
}

impl Prefixer for Ascii {
    fn encode_length(&self, max_len: usize, data_len: usize) -> Result<Vec<u8>, PrefixError> {
        check_max(max_len, data_len)?;
        decimal_digits(data_len, self.digits)
    }

    fn decode_length(&self, max_len: usize, data: &[u8]) -> Result<usize, PrefixError> {
        check_available(self.digits, data)?;

        let mut length = 0usize;
        for &byte in &data[..self.digits] {
            if !byte.is_ascii_digit() {
                return Err(PrefixError::InvalidDigit { byte });
            }
            length = length * 10 + usize::from(byte - b'0');
        }

        check_max(max_len, length)?;
        Ok(length)
    }

    fn width(&self) -> usize {
        self.digits
    }
}

/// Length written as packed BCD digits, left-padded with a zero nibble when odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bcd {
    digits: usize,
}

impl Bcd {
    pub const L: Bcd = Bcd { digits: 1 };
    pub const LL: Bcd = Bcd { digits: 2 };
    pub const LLL: Bcd = Bcd { digits: 3 };
    pub const LLLL: Bcd = Bcd { digits: 4 };

    pub fn with_digits(digits: usize) -> Option<Self> {
        (1..=4).contains(&digits).then_some(Bcd { digits })
    }
}

impl Prefixer for Bcd {
    fn encode_length(&self, max_len: usize, data_len: usize) -> Result<Vec<u8>, PrefixError> {
        check_max(max_len, data_len)?;

        if data_len.to_string().len() > self.digits {
            return Err(PrefixError::Overflow {
                length: data_len,
                width: self.digits,
            });
        }

        // Whole bytes; an odd digit count leaves the leading nibble zero.
        let ascii = decimal_digits(data_len, self.width() * 2)?;

        Ok(ascii
            .chunks_exact(2)
            .map(|pair| (pair[0] - b'0') << 4 | (pair[1] - b'0'))
            .collect())
    }

    fn decode_length(&self, max_len: usize, data: &[u8]) -> Result<usize, PrefixError> {
        let width = self.width();
        check_available(width, data)?;

        let mut length = 0usize;
        for &byte in &data[..width] {
            for nibble in [byte >> 4, byte & 0x0f] {
                if nibble > 9 {
                    return Err(PrefixError::InvalidDigit { byte });
                }
                length = length * 10 + usize::from(nibble);
            }
        }

        check_max(max_len, length)?;
        Ok(length)
    }

    fn width(&self) -> usize {
        (self.digits + 1) / 2
    }
}

/// Length written as a big-endian unsigned integer of one or two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binary {
    bytes: usize,
}

impl Binary {
    pub const L: Binary = Binary { bytes: 1 };
    pub const LL: Binary = Binary { bytes: 2 };

    pub fn with_bytes(bytes: usize) -> Option<Self> {
        (1..=2).contains(&bytes).then_some(Binary { bytes })
    }
}

impl Prefixer for Binary {
    fn encode_length(&self, max_len: usize, data_len: usize) -> Result<Vec<u8>, PrefixError> {
        check_max(max_len, data_len)?;
        if data_len >> (8 * self.bytes) != 0 {
            return Err(PrefixError::Overflow {
                length: data_len,
                width: self.bytes,
            });
        }

        let be = (data_len as u64).to_be_bytes();
        Ok(be[be.len() - self.bytes..].to_vec())
    }

    fn decode_length(&self, max_len: usize, data: &[u8]) -> Result<usize, PrefixError> {
        check_available(self.bytes, data)?;

        let length = data[..self.bytes]
            .iter()
            .fold(0usize, |acc, &b| acc << 8 | usize::from(b));

        check_max(max_len, length)?;
        Ok(length)
    }

    fn width(&self) -> usize {
        self.bytes
    }
}
