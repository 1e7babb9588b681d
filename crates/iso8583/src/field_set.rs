//! Numbered fields addressed by a bitmap or by position.
//!
//! Shared by [crate::message::Message] and bitmap-driven or positional
//! [crate::composite::Composite] fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::{
    bitmap::Bitmap,
    errors::Error,
    field::Field,
    spec::{FieldKind, FieldSpec},
};

/// Field number of the message type indicator.
pub(crate) const MTI: u16 = 0;
/// Field number of the bitmap.
pub(crate) const BITMAP: u16 = 1;

/// Field instances created on demand from a table of [FieldSpec]s.
#[derive(Debug, Clone)]
pub(crate) struct FieldSet {
    specs: BTreeMap<u16, FieldSpec>,
    fields: BTreeMap<u16, Box<dyn Field>>,
}

impl FieldSet {
    pub(crate) fn new(specs: BTreeMap<u16, FieldSpec>) -> Self {
        Self {
            specs,
            fields: BTreeMap::new(),
        }
    }

    /// Swaps the layout, keeping the values of fields the new layout still defines.
    pub(crate) fn set_specs(&mut self, specs: BTreeMap<u16, FieldSpec>) {
        self.fields.retain(|number, _| specs.contains_key(number));
        for (number, field) in &mut self.fields {
            if let Some(spec) = specs.get(number) {
                field.set_spec(Arc::clone(&spec.spec));
            }
        }
        self.specs = specs;
    }

    /// Numbers of the fields holding a value, ascending.
    pub(crate) fn present(&self) -> impl Iterator<Item = u16> + '_ {
        self.fields.keys().copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u16, &dyn Field)> + '_ {
        self.fields
            .iter()
            .map(|(&number, field)| (number, field.as_ref()))
    }

    pub(crate) fn get(&self, number: u16) -> Option<&dyn Field> {
        self.fields.get(&number).map(|field| field.as_ref())
    }

    /// Returns the field, creating it (and marking it present) on first access.
    pub(crate) fn get_mut(&mut self, number: u16) -> Result<&mut Box<dyn Field>, Error> {
        let spec = self
            .specs
            .get(&number)
            .ok_or(Error::UnknownField { field: number })?;
        if spec.kind == FieldKind::Bitmap {
            return Err(Error::BitmapField { field: number });
        }
        Ok(self
            .fields
            .entry(number)
            .or_insert_with(|| spec.instantiate()))
    }

    pub(crate) fn set(&mut self, number: u16, data: &[u8]) -> Result<(), Error> {
        self.get_mut(number)?
            .set_bytes(data)
            .map_err(|source| Error::field(number, source))
    }

    pub(crate) fn unset(&mut self, number: u16) {
        self.fields.remove(&number);
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    /// Packs the optional MTI, then `bitmap`, then every present field ascending.
    pub(crate) fn pack_with_bitmap(&mut self, bitmap: &mut Bitmap) -> Result<Vec<u8>, Error> {
        bitmap.reset();
        for number in self.present().filter(|&n| n > BITMAP) {
            bitmap.set(usize::from(number)).map_err(|e| Error::field(number, e))?;
        }

        let mut out = Vec::new();
        if self.specs.contains_key(&MTI) {
            if !self.fields.contains_key(&MTI) {
                return Err(Error::MissingField { field: MTI });
            }
            out.extend(self.pack_one(MTI)?);
        }

        out.extend(bitmap.pack().map_err(|e| Error::field(BITMAP, e))?);

        let numbers: Vec<u16> = self.present().filter(|&n| n > BITMAP).collect();
        for number in numbers {
            out.extend(self.pack_one(number)?);
        }

        Ok(out)
    }

    /// Packs every defined field in ascending order, present or not.
    pub(crate) fn pack_all(&mut self) -> Result<Vec<u8>, Error> {
        let numbers: Vec<u16> = self.specs.keys().copied().collect();
        let mut out = Vec::new();
        for number in numbers {
            self.get_mut(number)?;
            out.extend(self.pack_one(number)?);
        }
        Ok(out)
    }

    fn pack_one(&mut self, number: u16) -> Result<Vec<u8>, Error> {
        let field = self.get_mut(number)?;
        let packed = field.pack().map_err(|e| Error::field(number, e))?;
        trace!(field = number, len = packed.len(), "packed field");
        Ok(packed)
    }

    /// Reads the optional MTI, the bitmap and then each field whose bit is
    /// set, ascending. Returns the new fields and bitmap with the bytes read;
    /// `self` is left untouched so a failure commits nothing.
    pub(crate) fn unpack_with_bitmap(
        &self,
        bitmap: &Bitmap,
        data: &[u8],
    ) -> Result<(BTreeMap<u16, Box<dyn Field>>, Bitmap, usize), Error> {
        let mut fields = BTreeMap::new();
        let mut cursor = 0;

        if let Some(spec) = self.specs.get(&MTI) {
            let mut mti = spec.instantiate();
            cursor += unpack_one(mti.as_mut(), MTI, data)?;
            fields.insert(MTI, mti);
        }

        let mut bitmap = bitmap.clone();
        cursor += bitmap
            .unpack(&data[cursor..])
            .map_err(|e| Error::field(BITMAP, e))?;

        for bit in bitmap.iter().filter(|&i| i > usize::from(BITMAP)) {
            // positions are bounded by the 128-bit capacity
            let number = bit as u16;

            let Some(spec) = self.specs.get(&number) else {
                warn!(field = number, "bitmap bit set for undefined field");
                return Err(Error::UnknownField { field: number });
            };

            let mut field = spec.instantiate();
            cursor += unpack_one(field.as_mut(), number, &data[cursor..])?;
            fields.insert(number, field);
        }

        Ok((fields, bitmap, cursor))
    }

    /// Reads every defined field in ascending order.
    pub(crate) fn unpack_all(
        &self,
        data: &[u8],
    ) -> Result<(BTreeMap<u16, Box<dyn Field>>, usize), Error> {
        let mut fields = BTreeMap::new();
        let mut cursor = 0;

        for (&number, spec) in &self.specs {
            let mut field = spec.instantiate();
            cursor += unpack_one(field.as_mut(), number, &data[cursor..])?;
            fields.insert(number, field);
        }

        Ok((fields, cursor))
    }

    pub(crate) fn commit(&mut self, fields: BTreeMap<u16, Box<dyn Field>>) {
        self.fields = fields;
    }
}

fn unpack_one(field: &mut dyn Field, number: u16, data: &[u8]) -> Result<usize, Error> {
    let read = field
        .unpack(data)
        .map_err(|e| Error::field(number, e))?;
    trace!(field = number, read, "unpacked field");
    Ok(read)
}
