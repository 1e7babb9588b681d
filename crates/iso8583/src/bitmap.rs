//! The bitmap field: the presence vector that addresses the fields of a message.

use std::sync::Arc;

use crate::{
    bits::{CAPACITY, PresenceBits},
    errors::FieldError,
    field::Field,
    spec::Spec,
};

/// First position of the secondary bitmap.
const SECONDARY_START: usize = 65;

/// Presence bitmap of 128 positions, sent as 8 bytes or, when bit 1 is set, 16 bytes.
///
/// Bit 1 is derived on [Field::pack]: it is set whenever any of bits 65..=128 is set.
#[derive(Debug, Clone)]
pub struct Bitmap {
    spec: Arc<Spec>,
    bits: PresenceBits,
}

impl Bitmap {
    pub fn new(spec: Arc<Spec>) -> Self {
        Self {
            spec,
            bits: PresenceBits::new(),
        }
    }

    pub fn set(&mut self, i: usize) -> Result<(), FieldError> {
        self.bits.set(i)
    }

    pub fn clear(&mut self, i: usize) -> Result<(), FieldError> {
        self.bits.clear(i)
    }

    pub fn is_set(&self, i: usize) -> bool {
        self.bits.is_set(i)
    }

    pub fn bits(&self) -> &PresenceBits {
        &self.bits
    }

    /// Set positions in ascending order, bit 1 included.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter()
    }

    pub fn len(&self) -> usize {
        CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    fn is_secondary(&self) -> bool {
        self.bits.any_in(SECONDARY_START..=CAPACITY)
    }

    /// Decodes `length` canonical bitmap bytes following a prefix of `width` bytes.
    fn read(
        &self,
        data: &[u8],
        width: usize,
        length: usize,
    ) -> Result<(PresenceBits, usize), FieldError> {
        let end = width + self.spec.encoding.encoded_len(length);
        if data.len() < end {
            return Err(FieldError::BufferTooShort {
                needed: end,
                available: data.len(),
            });
        }

        let raw = self.spec.encoding.decode(&data[width..end], length)?;
        Ok((PresenceBits::from_bytes(&raw)?, end))
    }
}

impl Field for Bitmap {
    fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    fn set_spec(&mut self, spec: Arc<Spec>) {
        self.spec = spec;
    }

    fn pack(&mut self) -> Result<Vec<u8>, FieldError> {
        if self.is_secondary() {
            self.bits.set(1)?;
        }

        let data = self.bits.bytes();
        let mut packed = self.spec.encoding.encode(&data)?;
        let mut out = self.spec.prefixer().encode_length(self.spec.length, data.len())?;

        // Halve the encoded form, not the raw one: some encodings expand.
        if !self.bits.is_set(1) {
            packed.truncate(packed.len() / 2);
        }

        out.extend(packed);
        Ok(out)
    }

    /// Reads a primary bitmap first; only if its bit 1 is set is the full
    /// length read again. Consumes 8 or 16 canonical bytes plus the prefix.
    fn unpack(&mut self, data: &[u8]) -> Result<usize, FieldError> {
        let prefixer = self.spec.prefixer();
        let width = prefixer.width();
        if data.len() < width {
            return Err(FieldError::BufferTooShort {
                needed: width,
                available: data.len(),
            });
        }

        let min_len = prefixer.decode_length(self.spec.length / 2, data)?;
        let full_len = prefixer.decode_length(self.spec.length, data)?;

        let (primary, read) = self.read(data, width, min_len)?;
        if !primary.is_set(1) {
            self.bits = primary;
            return Ok(read);
        }

        let (full, read) = self.read(data, width, full_len)?;
        self.bits = full;
        Ok(read)
    }

    fn bytes(&self) -> Result<Vec<u8>, FieldError> {
        Ok(self.bits.bytes().to_vec())
    }

    fn set_bytes(&mut self, data: &[u8]) -> Result<(), FieldError> {
        self.bits = PresenceBits::from_bytes(data)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.bits = PresenceBits::new();
    }

    fn box_clone(&self) -> Box<dyn Field> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding;
    use crate::errors::EncodingError;

    fn new_bitmap(encoder: impl encoding::Encoder + 'static) -> Bitmap {
        Bitmap::new(Arc::new(Spec::new(16, encoder)))
    }

    #[test]
    fn test_primary_only_ascii() {
        let mut bitmap = new_bitmap(encoding::Ascii);
        bitmap.set(2).unwrap();
        bitmap.set(11).unwrap();

        let packed = bitmap.pack().unwrap();
        assert_eq!(packed, vec![0x40, 0x20, 0, 0, 0, 0, 0, 0]);
        assert!(!bitmap.is_set(1));

        let mut read = new_bitmap(encoding::Ascii);
        assert_eq!(read.unpack(&packed).unwrap(), 8);
        assert_eq!(read.iter().collect::<Vec<_>>(), vec![2, 11]);
    }

    #[test]
    fn test_secondary_sets_bit_one() {
        for i in 66..=128 {
            let mut bitmap = new_bitmap(encoding::Binary);
            bitmap.set(i).unwrap();

            let packed = bitmap.pack().unwrap();
            assert_eq!(packed.len(), 16);
            assert_eq!(packed[0] & 0x80, 0x80);
        }
    }

    #[test]
    fn test_primary_range_keeps_short_form() {
        for i in 2..=64 {
            let mut bitmap = new_bitmap(encoding::Binary);
            bitmap.set(i).unwrap();

            let packed = bitmap.pack().unwrap();
            assert_eq!(packed.len(), 8);
            assert_eq!(packed[0] & 0x80, 0);
        }
    }

    #[test]
    fn test_reset_packs_empty_primary() {
        let mut bitmap = new_bitmap(encoding::Binary);
        bitmap.set(100).unwrap();
        bitmap.reset();

        assert_eq!(bitmap.pack().unwrap(), vec![0; 8]);
    }

    #[test]
    fn test_manual_bit_one_forces_secondary() {
        let mut bitmap = new_bitmap(encoding::Binary);
        bitmap.set(1).unwrap();

        let packed = bitmap.pack().unwrap();
        assert_eq!(packed.len(), 16);
        assert_eq!(packed[0], 0x80);
        assert!(packed[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_hex_truncates_encoded_form() {
        let mut bitmap = new_bitmap(encoding::Hex);
        bitmap.set(2).unwrap();
        bitmap.set(3).unwrap();

        let packed = bitmap.pack().unwrap();
        assert_eq!(packed, b"6000000000000000");

        let mut read = new_bitmap(encoding::Hex);
        assert_eq!(read.unpack(&packed).unwrap(), 16);
        assert!(read.is_set(2) && read.is_set(3));
    }

    #[test]
    fn test_hex_secondary_roundtrip() {
        let mut bitmap = new_bitmap(encoding::Hex);
        bitmap.set(3).unwrap();
        bitmap.set(70).unwrap();

        let packed = bitmap.pack().unwrap();
        assert_eq!(packed, b"A0000000000000000400000000000000");

        let mut read = new_bitmap(encoding::Hex);
        assert_eq!(read.unpack(&packed).unwrap(), 32);
        assert_eq!(read.iter().collect::<Vec<_>>(), vec![1, 3, 70]);
    }

    #[test]
    fn test_unpack_buffer_boundaries() {
        let mut read = new_bitmap(encoding::Binary);
        assert!(matches!(
            read.unpack(&[0; 7]),
            Err(FieldError::BufferTooShort { needed: 8, available: 7 })
        ));

        assert_eq!(read.unpack(&[0x40, 0, 0, 0, 0, 0, 0, 0]).unwrap(), 8);
        assert!(read.is_set(2));

        let mut short_secondary = [0u8; 12];
        short_secondary[0] = 0x80;
        assert!(matches!(
            read.unpack(&short_secondary),
            Err(FieldError::BufferTooShort { needed: 16, available: 12 })
        ));
        // failed unpack keeps the previous bits
        assert!(read.is_set(2));
    }

    #[test]
    fn test_secondary_ascii_is_rejected() {
        let mut bitmap = new_bitmap(encoding::Ascii);
        bitmap.set(65).unwrap();
        assert!(matches!(
            bitmap.pack(),
            Err(FieldError::Encoding(EncodingError::NonAscii { byte: 0x80, offset: 0 }))
        ));
    }

    #[test]
    fn test_set_bytes() {
        let mut bitmap = new_bitmap(encoding::Binary);
        bitmap.set_bytes(&[0xc0]).unwrap();
        assert!(bitmap.is_set(1) && bitmap.is_set(2));
        assert_eq!(bitmap.bytes().unwrap().len(), 16);

        assert!(matches!(
            bitmap.set_bytes(&[0; 20]),
            Err(FieldError::TooLong { max: 16, actual: 20 })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut bitmap = new_bitmap(encoding::Binary);
        assert!(matches!(bitmap.set(129), Err(FieldError::BitOutOfRange(129))));
        assert!(!bitmap.is_set(129));
    }
}
