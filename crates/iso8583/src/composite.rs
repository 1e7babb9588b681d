//! Composite fields: a field whose payload is itself a set of numbered sub-fields.
//!
//! A composite whose subfield 1 is a [Bitmap] packs only the sub-fields that
//! are present, addressed by that bitmap. Any other composite is positional:
//! every defined sub-field is packed in ascending order.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    bitmap::Bitmap,
    errors::{Error, FieldError},
    field::Field,
    field_set::{BITMAP, FieldSet},
    spec::{FieldKind, Spec},
};

#[derive(Debug, Clone)]
pub struct Composite {
    spec: Arc<Spec>,
    bitmap: Option<Bitmap>,
    subfields: FieldSet,
}

impl Composite {
    pub fn new(spec: Arc<Spec>) -> Self {
        let bitmap = bitmap_for(&spec);
        let subfields = FieldSet::new(spec.subfields.clone());

        Self {
            spec,
            bitmap,
            subfields,
        }
    }

    /// The sub-field bitmap, if this composite is bitmap-driven.
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn subfield(&self, number: u16) -> Option<&dyn Field> {
        self.subfields.get(number)
    }

    /// Returns the sub-field, creating it on first access.
    pub fn subfield_mut(&mut self, number: u16) -> Result<&mut Box<dyn Field>, Error> {
        self.subfields.get_mut(number)
    }

    pub fn set_subfield(&mut self, number: u16, data: &[u8]) -> Result<(), Error> {
        self.subfields.set(number, data)
    }

    pub fn unset_subfield(&mut self, number: u16) {
        self.subfields.unset(number);
    }

    /// Numbers of the sub-fields holding a value, ascending.
    pub fn present(&self) -> Vec<u16> {
        self.subfields.present().collect()
    }

    fn pack_body(&mut self) -> Result<Vec<u8>, FieldError> {
        let body = match &mut self.bitmap {
            Some(bitmap) => self.subfields.pack_with_bitmap(bitmap),
            None => self.subfields.pack_all(),
        };
        body.map_err(|e| FieldError::Subfield(Box::new(e)))
    }

    /// Reads sub-fields from exactly `body`, committing them only if all of it is consumed.
    fn unpack_body(&mut self, body: &[u8]) -> Result<(), FieldError> {
        let unpacked = match &self.bitmap {
            Some(bitmap) => self
                .subfields
                .unpack_with_bitmap(bitmap, body)
                .map(|(fields, bitmap, read)| (fields, Some(bitmap), read)),
            None => self
                .subfields
                .unpack_all(body)
                .map(|(fields, read)| (fields, None, read)),
        };
        let (fields, bitmap, read): (BTreeMap<u16, Box<dyn Field>>, _, _) =
            unpacked.map_err(|e| FieldError::Subfield(Box::new(e)))?;

        if read != body.len() {
            return Err(FieldError::LengthMismatch {
                expected: body.len(),
                actual: read,
            });
        }

        self.subfields.commit(fields);
        if bitmap.is_some() {
            self.bitmap = bitmap;
        }
        Ok(())
    }
}

fn bitmap_for(spec: &Spec) -> Option<Bitmap> {
    spec.subfields
        .get(&BITMAP)
        .filter(|sub| sub.kind == FieldKind::Bitmap)
        .map(|sub| Bitmap::new(Arc::clone(&sub.spec)))
}

impl Field for Composite {
    fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    /// Replaces the spec; sub-fields the new layout still defines keep their values.
    fn set_spec(&mut self, spec: Arc<Spec>) {
        self.bitmap = bitmap_for(&spec);
        self.subfields.set_specs(spec.subfields.clone());
        self.spec = spec;
    }

    fn pack(&mut self) -> Result<Vec<u8>, FieldError> {
        let body = self.pack_body()?;
        let mut out = self
            .spec
            .prefixer()
            .encode_length(self.spec.length, body.len())?;
        out.extend(body);
        Ok(out)
    }

    fn unpack(&mut self, data: &[u8]) -> Result<usize, FieldError> {
        let prefixer = self.spec.prefixer();
        let width = prefixer.width();
        if data.len() < width {
            return Err(FieldError::BufferTooShort {
                needed: width,
                available: data.len(),
            });
        }

        let length = prefixer.decode_length(self.spec.length, data)?;
        let end = width + length;
        if data.len() < end {
            return Err(FieldError::BufferTooShort {
                needed: end,
                available: data.len(),
            });
        }

        self.unpack_body(&data[width..end])?;
        Ok(end)
    }

    /// The packed sub-fields without the length prefix.
    fn bytes(&self) -> Result<Vec<u8>, FieldError> {
        self.clone().pack_body()
    }

    fn set_bytes(&mut self, data: &[u8]) -> Result<(), FieldError> {
        self.unpack_body(data)
    }

    fn reset(&mut self) {
        self.subfields.clear();
        if let Some(bitmap) = &mut self.bitmap {
            bitmap.reset();
        }
    }

    fn box_clone(&self) -> Box<dyn Field> {
        Box::new(self.clone())
    }

    fn as_composite(&self) -> Option<&Composite> {
        Some(self)
    }

    fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PrefixError;
    use crate::spec::FieldSpec;
    use crate::{encoding, padding, prefix};

    fn numeric(length: usize) -> FieldSpec {
        let mut spec = Spec::new(length, encoding::Ascii);
        spec.set_padding(padding::Left(b'0'));
        FieldSpec::fixed(spec)
    }

    fn llvar(length: usize) -> FieldSpec {
        let mut spec = Spec::new(length, encoding::Ascii);
        spec.set_prefix(prefix::Ascii::LL);
        FieldSpec::variable(spec)
    }

    /// Processing code: three positional two-digit parts.
    fn processing_code() -> Arc<Spec> {
        let mut spec = Spec::new(6, encoding::Ascii);
        spec.set_subfield(1, numeric(2))
            .set_subfield(2, numeric(2))
            .set_subfield(3, numeric(2));
        Arc::new(spec)
    }

    /// LLL-prefixed composite addressed by a hex sub-bitmap.
    fn additional_data() -> Arc<Spec> {
        let mut spec = Spec::new(999, encoding::Ascii);
        spec.set_prefix(prefix::Ascii::LLL)
            .set_subfield(1, FieldSpec::bitmap(Spec::new(16, encoding::Hex)))
            .set_subfield(2, llvar(20))
            .set_subfield(3, FieldSpec::fixed(Spec::new(4, encoding::Ascii)));
        Arc::new(spec)
    }

    #[test]
    fn test_positional_roundtrip() {
        let mut field = Composite::new(processing_code());
        assert!(field.bitmap().is_none());
        field.set_subfield(2, b"20").unwrap();

        let packed = field.pack().unwrap();
        assert_eq!(packed, b"002000");

        let mut read = Composite::new(processing_code());
        assert_eq!(read.unpack(b"312000rest").unwrap(), 6);
        assert_eq!(read.subfield(1).unwrap().bytes().unwrap(), b"31");
        assert_eq!(read.subfield(3).unwrap().bytes().unwrap(), b"0");
        assert_eq!(read.present(), vec![1, 2, 3]);
    }

    #[test]
    fn test_bitmap_driven_packs_present_only() {
        let mut field = Composite::new(additional_data());
        field.set_subfield(3, b"abcd").unwrap();

        let packed = field.pack().unwrap();
        assert_eq!(packed, b"0202000000000000000abcd");

        let mut read = Composite::new(additional_data());
        assert_eq!(read.unpack(&packed).unwrap(), packed.len());
        assert_eq!(read.present(), vec![3]);
        assert!(read.bitmap().unwrap().is_set(3));
        assert_eq!(read.subfield(3).unwrap().bytes().unwrap(), b"abcd");
    }

    #[test]
    fn test_bitmap_subfield_is_not_settable() {
        let mut field = Composite::new(additional_data());
        assert!(matches!(
            field.set_subfield(1, b"00"),
            Err(Error::BitmapField { field: 1 })
        ));
        assert!(matches!(
            field.set_subfield(9, b"00"),
            Err(Error::UnknownField { field: 9 })
        ));
    }

    #[test]
    fn test_nested_composite() {
        let mut outer = Spec::new(99, encoding::Ascii);
        outer
            .set_prefix(prefix::Ascii::LL)
            .set_subfield(1, FieldSpec::composite(processing_code()))
            .set_subfield(2, llvar(10));
        let outer = Arc::new(outer);

        let mut field = Composite::new(Arc::clone(&outer));
        field
            .subfield_mut(1)
            .unwrap()
            .as_composite_mut()
            .unwrap()
            .set_subfield(3, b"7")
            .unwrap();
        field.set_subfield(2, b"hi").unwrap();

        let packed = field.pack().unwrap();
        assert_eq!(packed, b"1000000702hi");

        let mut read = Composite::new(outer);
        assert_eq!(read.unpack(&packed).unwrap(), 12);
        let inner = read.subfield(1).unwrap().as_composite().unwrap();
        assert_eq!(inner.subfield(3).unwrap().bytes().unwrap(), b"7");
    }

    #[test]
    fn test_unconsumed_body_is_a_length_mismatch() {
        let mut spec = Spec::new(6, encoding::Ascii);
        spec.set_subfield(1, numeric(2)).set_subfield(2, numeric(2));
        let mut field = Composite::new(Arc::new(spec));

        assert!(matches!(
            field.unpack(b"123456"),
            Err(FieldError::LengthMismatch {
                expected: 6,
                actual: 4
            })
        ));
        assert!(field.present().is_empty());
    }

    #[test]
    fn test_fixed_length_is_enforced_on_pack() {
        let mut spec = Spec::new(5, encoding::Ascii);
        spec.set_subfield(1, numeric(2)).set_subfield(2, numeric(2));
        let mut field = Composite::new(Arc::new(spec));

        assert!(matches!(
            field.pack(),
            Err(FieldError::LengthEncoding(PrefixError::FixedMismatch {
                expected: 5,
                actual: 4
            }))
        ));
    }

    #[test]
    fn test_subfield_error_carries_number() {
        let mut field = Composite::new(additional_data());
        field.set_subfield(2, "ü".as_bytes()).unwrap();

        let err = field.pack().unwrap_err();
        let FieldError::Subfield(inner) = err else {
            panic!("expected subfield error, got {err:?}");
        };
        assert!(matches!(*inner, Error::Field { field: 2, .. }));
    }

    #[test]
    fn test_unknown_sub_bitmap_bit() {
        let mut field = Composite::new(additional_data());
        let err = field.unpack(b"0160800000000000000").unwrap_err();
        assert!(matches!(
            err,
            FieldError::Subfield(inner) if matches!(*inner, Error::UnknownField { field: 5 })
        ));
    }

    #[test]
    fn test_bytes_and_set_bytes_skip_prefix() {
        let mut field = Composite::new(additional_data());
        field.set_subfield(3, b"wxyz").unwrap();
        let body = field.bytes().unwrap();
        assert_eq!(body, b"2000000000000000wxyz");

        let mut copy = Composite::new(additional_data());
        copy.set_bytes(&body).unwrap();
        assert_eq!(copy.subfield(3).unwrap().bytes().unwrap(), b"wxyz");
    }

    #[test]
    fn test_set_spec_keeps_defined_subfields() {
        let mut field = Composite::new(processing_code());
        field.set_subfield(1, b"1").unwrap();
        field.set_subfield(3, b"3").unwrap();

        let mut narrower = Spec::new(4, encoding::Ascii);
        narrower.set_subfield(1, numeric(2)).set_subfield(2, numeric(2));
        field.set_spec(Arc::new(narrower));

        assert_eq!(field.present(), vec![1]);
        assert_eq!(field.pack().unwrap(), b"0100");
    }

    #[test]
    fn test_reset_clears_subfields() {
        let mut field = Composite::new(additional_data());
        field.set_subfield(3, b"abcd").unwrap();
        field.pack().unwrap();
        field.reset();

        assert!(field.present().is_empty());
        assert!(field.bitmap().unwrap().is_empty());
    }
}
