//! Whole-message pack and unpack.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    bitmap::Bitmap,
    composite::Composite,
    errors::Error,
    field::Field,
    field_set::{BITMAP, FieldSet, MTI},
    spec::MessageSpec,
};

/// A message instance: the bitmap plus the fields that hold a value.
///
/// Fields are set in any order; [Message::pack] derives the bitmap from the
/// set of present fields and writes the optional MTI, the bitmap and then
/// every present field in ascending number order. The wire format carries no
/// field tags, so [Message::unpack] relies on the same ordering.
///
/// ```
/// use iso8583::{message::Message, spec87};
///
/// let mut request = Message::new(spec87::iso87_ascii()).unwrap();
/// request.set_mti("0100").unwrap();
/// request.set_string(2, "4242424242424242").unwrap();
/// request.set_string(4, "100").unwrap();
/// let packed = request.pack().unwrap();
///
/// let mut response = Message::new(spec87::iso87_ascii()).unwrap();
/// response.unpack(&packed).unwrap();
/// assert_eq!(response.mti().unwrap().as_deref(), Some("0100"));
/// assert_eq!(response.get_string(4).unwrap().as_deref(), Some("100"));
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    spec: Arc<MessageSpec>,
    bitmap: Bitmap,
    fields: FieldSet,
}

impl Message {
    /// Validates `spec` and creates an empty message backed by it.
    pub fn new(spec: impl Into<Arc<MessageSpec>>) -> Result<Self, Error> {
        let spec = spec.into();
        spec.validate()?;

        let bitmap = spec
            .field(BITMAP)
            .map(|field| Bitmap::new(Arc::clone(&field.spec)))
            .ok_or_else(|| Error::InvalidSpec("field 1 must be a bitmap".to_string()))?;
        let fields = FieldSet::new(spec.fields.clone());

        Ok(Self {
            spec,
            bitmap,
            fields,
        })
    }

    pub fn spec(&self) -> &Arc<MessageSpec> {
        &self.spec
    }

    /// The bitmap as of the last pack or unpack.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Stores the canonical payload of `number` and marks it present.
    pub fn set_field(&mut self, number: u16, data: &[u8]) -> Result<(), Error> {
        self.fields.set(number, data)
    }

    pub fn set_string(&mut self, number: u16, value: &str) -> Result<(), Error> {
        self.set_field(number, value.as_bytes())
    }

    pub fn get_bytes(&self, number: u16) -> Result<Option<Vec<u8>>, Error> {
        self.fields
            .get(number)
            .map(|field| field.bytes().map_err(|e| Error::field(number, e)))
            .transpose()
    }

    pub fn get_string(&self, number: u16) -> Result<Option<String>, Error> {
        self.get_bytes(number)?
            .map(|data| String::from_utf8(data).map_err(|_| Error::NotUtf8 { field: number }))
            .transpose()
    }

    pub fn unset_field(&mut self, number: u16) {
        self.fields.unset(number);
    }

    pub fn field(&self, number: u16) -> Option<&dyn Field> {
        self.fields.get(number)
    }

    /// Returns the field, creating it (and marking it present) on first access.
    pub fn field_mut(&mut self, number: u16) -> Result<&mut Box<dyn Field>, Error> {
        self.fields.get_mut(number)
    }

    pub fn composite_mut(&mut self, number: u16) -> Result<&mut Composite, Error> {
        self.field_mut(number)?
            .as_composite_mut()
            .ok_or_else(|| Error::InvalidSpec(format!("field {number} is not a composite")))
    }

    pub fn mti(&self) -> Result<Option<String>, Error> {
        self.get_string(MTI)
    }

    pub fn set_mti(&mut self, mti: &str) -> Result<(), Error> {
        self.set_string(MTI, mti)
    }

    /// Numbers of the fields holding a value, ascending. The MTI counts as field 0.
    pub fn present(&self) -> Vec<u16> {
        self.fields.present().collect()
    }

    /// Canonical payloads of all present fields.
    pub fn values(&self) -> Result<BTreeMap<u16, Vec<u8>>, Error> {
        self.fields
            .iter()
            .map(|(number, field)| {
                let data = field.bytes().map_err(|e| Error::field(number, e))?;
                Ok((number, data))
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.fields.clear();
        self.bitmap.reset();
    }

    /// Packs the message. No bytes are returned if any field fails.
    pub fn pack(&mut self) -> Result<Vec<u8>, Error> {
        let packed = self.fields.pack_with_bitmap(&mut self.bitmap)?;
        debug!(fields = ?self.present(), len = packed.len(), "packed message");
        Ok(packed)
    }

    /// Replaces the message contents with those read from `data`, returning
    /// the bytes consumed. On failure the message is left unchanged.
    pub fn unpack(&mut self, data: &[u8]) -> Result<usize, Error> {
        let (fields, bitmap, read) = self.fields.unpack_with_bitmap(&self.bitmap, data)?;

        if read < data.len() {
            trace!(trailing = data.len() - read, "ignoring bytes after last field");
        }

        self.fields.commit(fields);
        self.bitmap = bitmap;
        debug!(fields = ?self.present(), len = read, "unpacked message");
        Ok(read)
    }
}
