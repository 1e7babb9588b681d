//! Presence bits for ISO 8583 bitmaps.
//!
//! Bits are addressed in MSB-first order: position 1 is the high bit of the first byte.

use std::fmt;
use std::ops::RangeInclusive;

use crate::errors::FieldError;

/// Number of addressable positions (primary plus secondary bitmap).
pub const CAPACITY: usize = 128;

/// Bytes needed to hold [CAPACITY] bits.
pub const CAPACITY_BYTES: usize = CAPACITY / 8;

/// Reads the bit at zero-based `bit_pos` (0 = MSB of first byte). Out-of-range reads are 0.
pub fn read_bit_at(data: &[u8], bit_pos: usize) -> u8 {
    match data.get(bit_pos / 8) {
        Some(byte) => (byte >> (7 - bit_pos % 8)) & 1,
        None => 0,
    }
}

/// Sets or clears the bit at zero-based `bit_pos`. The caller guarantees it is in range.
fn write_bit_at(data: &mut [u8], bit_pos: usize, bit: bool) {
    let mask = 1 << (7 - bit_pos % 8);
    if bit {
        data[bit_pos / 8] |= mask;
    } else {
        data[bit_pos / 8] &= !mask;
    }
}

/// Fixed-capacity bit vector with 1-based addressing.
///
/// Bit 1 flags a secondary bitmap, bits 2..=64 address fields of the primary
/// bitmap and bits 65..=128 those of the secondary one.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PresenceBits {
    bytes: [u8; CAPACITY_BYTES],
}

impl PresenceBits {
    /// Creates an all-clear vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from raw wire bytes. Shorter input leaves the remaining positions clear.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FieldError> {
        if data.len() > CAPACITY_BYTES {
            return Err(FieldError::TooLong {
                max: CAPACITY_BYTES,
                actual: data.len(),
            });
        }

        let mut bits = Self::new();
        bits.bytes[..data.len()].copy_from_slice(data);
        Ok(bits)
    }

    /// Raw form, always [CAPACITY_BYTES] long.
    pub fn bytes(&self) -> [u8; CAPACITY_BYTES] {
        self.bytes
    }

    pub fn set(&mut self, i: usize) -> Result<(), FieldError> {
        Self::check(i)?;
        write_bit_at(&mut self.bytes, i - 1, true);
        Ok(())
    }

    pub fn clear(&mut self, i: usize) -> Result<(), FieldError> {
        Self::check(i)?;
        write_bit_at(&mut self.bytes, i - 1, false);
        Ok(())
    }

    /// Positions outside 1..=128 are never set.
    pub fn is_set(&self, i: usize) -> bool {
        (1..=CAPACITY).contains(&i) && read_bit_at(&self.bytes, i - 1) == 1
    }

    /// True if any position in `range` is set.
    pub fn any_in(&self, range: RangeInclusive<usize>) -> bool {
        range.into_iter().any(|i| self.is_set(i))
    }

    /// Set positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=CAPACITY).filter(move |&i| self.is_set(i))
    }

    pub fn len(&self) -> usize {
        CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    fn check(i: usize) -> Result<(), FieldError> {
        if (1..=CAPACITY).contains(&i) {
            Ok(())
        } else {
            Err(FieldError::BitOutOfRange(i))
        }
    }
}

impl fmt::Debug for PresenceBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for PresenceBits {
    /// Binary rendering, one space-separated group per byte.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:08b}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bit_at() {
        let data = [0b1000_0000, 0b0000_0001];
        assert_eq!(read_bit_at(&data, 0), 1);
        assert_eq!(read_bit_at(&data, 1), 0);
        assert_eq!(read_bit_at(&data, 15), 1);
        assert_eq!(read_bit_at(&data, 16), 0);
    }

    #[test]
    fn test_set_is_msb_first() {
        let mut bits = PresenceBits::new();
        bits.set(2).unwrap();
        bits.set(11).unwrap();

        assert_eq!(bits.bytes()[..8], [0x40, 0x20, 0, 0, 0, 0, 0, 0]);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![2, 11]);
    }

    #[test]
    fn test_clear() {
        let mut bits = PresenceBits::new();
        bits.set(128).unwrap();
        assert_eq!(bits.bytes()[15], 0x01);

        bits.clear(128).unwrap();
        assert!(bits.is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let mut bits = PresenceBits::new();
        assert!(matches!(bits.set(0), Err(FieldError::BitOutOfRange(0))));
        assert!(matches!(bits.set(129), Err(FieldError::BitOutOfRange(129))));
        assert!(!bits.is_set(0));
        assert!(!bits.is_set(500));
    }

    #[test]
    fn test_from_short_bytes() {
        let bits = PresenceBits::from_bytes(&[0x80]).unwrap();
        assert!(bits.is_set(1));
        assert!(!bits.any_in(2..=128));
    }

    #[test]
    fn test_from_long_bytes() {
        assert!(matches!(
            PresenceBits::from_bytes(&[0; 17]),
            Err(FieldError::TooLong { max: 16, actual: 17 })
        ));
    }

    #[test]
    fn test_display() {
        let mut bits = PresenceBits::new();
        bits.set(1).unwrap();
        assert!(bits.to_string().starts_with("10000000 00000000"));
    }
}
