//! The [Field] contract and the fixed and variable-length leaf fields.

use std::fmt;
use std::sync::Arc;

use crate::{composite::Composite, errors::FieldError, prefix::Prefixer, spec::Spec};

/// One schema-configured value of a message.
///
/// Fields keep their payload in canonical (decoded, unpadded) form; wire bytes
/// only exist as the output of [Field::pack] or the input of [Field::unpack].
/// A failed `unpack` leaves the stored payload untouched.
pub trait Field: fmt::Debug + Send + Sync {
    fn spec(&self) -> &Arc<Spec>;

    /// Replaces the spec without touching the payload.
    fn set_spec(&mut self, spec: Arc<Spec>);

    fn pack(&mut self) -> Result<Vec<u8>, FieldError>;

    /// Reads the field from the start of `data` and returns the bytes consumed.
    fn unpack(&mut self, data: &[u8]) -> Result<usize, FieldError>;

    fn bytes(&self) -> Result<Vec<u8>, FieldError>;

    fn set_bytes(&mut self, data: &[u8]) -> Result<(), FieldError>;

    fn reset(&mut self);

    /// Clones the field behind a trait object.
    fn box_clone(&self) -> Box<dyn Field>;

    fn as_composite(&self) -> Option<&Composite> {
        None
    }

    fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        None
    }
}

impl Clone for Box<dyn Field> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Pads, prefixes and encodes a canonical payload.
fn pack_leaf(spec: &Spec, prefixer: &dyn Prefixer, value: &[u8]) -> Result<Vec<u8>, FieldError> {
    let raw = match &spec.padding {
        Some(padding) => padding.pad(value, spec.length)?,
        None => value.to_vec(),
    };

    let mut out = prefixer.encode_length(spec.length, raw.len())?;
    out.extend(spec.encoding.encode(&raw)?);
    Ok(out)
}

/// Inverse of [pack_leaf]. Returns the canonical payload and the bytes consumed.
fn unpack_leaf(
    spec: &Spec,
    prefixer: &dyn Prefixer,
    data: &[u8],
) -> Result<(Vec<u8>, usize), FieldError> {
    let width = prefixer.width();
    if data.len() < width {
        return Err(FieldError::BufferTooShort {
            needed: width,
            available: data.len(),
        });
    }

    let length = prefixer.decode_length(spec.length, data)?;
    let end = width + spec.encoding.encoded_len(length);
    if data.len() < end {
        return Err(FieldError::BufferTooShort {
            needed: end,
            available: data.len(),
        });
    }

    let raw = spec.encoding.decode(&data[width..end], length)?;
    let raw = match &spec.padding {
        Some(padding) => padding.unpad(&raw),
        None => raw,
    };

    Ok((raw, end))
}

/// Field whose payload always occupies the spec's declared length.
///
/// A configured prefix is still written; without one the field is unprefixed.
#[derive(Debug, Clone)]
pub struct Fixed {
    spec: Arc<Spec>,
    value: Vec<u8>,
}

impl Fixed {
    pub fn new(spec: Arc<Spec>) -> Self {
        Self {
            spec,
            value: Vec::new(),
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl Field for Fixed {
    fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    fn set_spec(&mut self, spec: Arc<Spec>) {
        self.spec = spec;
    }

    fn pack(&mut self) -> Result<Vec<u8>, FieldError> {
        pack_leaf(&self.spec, self.spec.prefixer(), &self.value)
    }

    fn unpack(&mut self, data: &[u8]) -> Result<usize, FieldError> {
        let (raw, read) = unpack_leaf(&self.spec, self.spec.prefixer(), data)?;
        self.value = raw;
        Ok(read)
    }

    fn bytes(&self) -> Result<Vec<u8>, FieldError> {
        Ok(self.value.clone())
    }

    fn set_bytes(&mut self, data: &[u8]) -> Result<(), FieldError> {
        self.value = data.to_vec();
        Ok(())
    }

    fn reset(&mut self) {
        self.value.clear();
    }

    fn box_clone(&self) -> Box<dyn Field> {
        Box::new(self.clone())
    }
}

/// Field whose payload length is announced by a length prefix.
#[derive(Debug, Clone)]
pub struct Variable {
    spec: Arc<Spec>,
    value: Vec<u8>,
}

impl Variable {
    pub fn new(spec: Arc<Spec>) -> Self {
        Self {
            spec,
            value: Vec::new(),
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    fn prefixer(&self) -> Result<&dyn Prefixer, FieldError> {
        self.spec.prefix.as_deref().ok_or(FieldError::MissingPrefix)
    }
}

impl Field for Variable {
    fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    fn set_spec(&mut self, spec: Arc<Spec>) {
        self.spec = spec;
    }

    fn pack(&mut self) -> Result<Vec<u8>, FieldError> {
        pack_leaf(&self.spec, self.prefixer()?, &self.value)
    }

    fn unpack(&mut self, data: &[u8]) -> Result<usize, FieldError> {
        let (raw, read) = unpack_leaf(&self.spec, self.prefixer()?, data)?;
        self.value = raw;
        Ok(read)
    }

    fn bytes(&self) -> Result<Vec<u8>, FieldError> {
        Ok(self.value.clone())
    }

    fn set_bytes(&mut self, data: &[u8]) -> Result<(), FieldError> {
        self.value = data.to_vec();
        Ok(())
    }

    fn reset(&mut self) {
        self.value.clear();
    }

    fn box_clone(&self) -> Box<dyn Field> {
        Box::new(self.clone())
    }
}
