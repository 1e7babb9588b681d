//! Specs: immutable per-field configuration shared by reference across messages.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    bitmap::Bitmap,
    composite::Composite,
    encoding::Encoder,
    errors::Error,
    field::{Field, Fixed, Variable},
    padding::Padder,
    prefix::{self, Prefixer},
};

/// Highest addressable field number.
pub const MAX_FIELD: u16 = 128;

/// Wire configuration of one field.
///
/// A `Spec` is built once, wrapped in an [Arc] and then only read. Use the
/// builder-style setters before sharing it.
///
/// ```
/// use iso8583::spec::Spec;
/// use iso8583::{encoding, padding, prefix};
///
/// let mut spec = Spec::new(12, encoding::Ascii);
/// spec.set_description("Amount, transaction").set_padding(padding::Left(b'0'));
///
/// let mut pan = Spec::new(19, encoding::Ascii);
/// pan.set_prefix(prefix::Ascii::LL);
/// ```
#[derive(Debug, Clone)]
pub struct Spec {
    /// Declared (maximum) canonical length. For composites, a byte count of the packed sub-fields.
    pub length: usize,
    pub description: String,
    pub encoding: Arc<dyn Encoder>,
    /// `None` means the payload is not prefixed and always has `length` bytes.
    pub prefix: Option<Arc<dyn Prefixer>>,
    pub padding: Option<Arc<dyn Padder>>,
    /// Sub-field layout of a composite field, empty otherwise.
    pub subfields: BTreeMap<u16, FieldSpec>,
}

impl Spec {
    pub fn new(length: usize, encoding: impl Encoder + 'static) -> Self {
        Self {
            length,
            description: String::new(),
            encoding: Arc::new(encoding),
            prefix: None,
            padding: None,
            subfields: BTreeMap::new(),
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn set_prefix(&mut self, prefix: impl Prefixer + 'static) -> &mut Self {
        self.prefix = Some(Arc::new(prefix));
        self
    }

    pub fn set_padding(&mut self, padding: impl Padder + 'static) -> &mut Self {
        self.padding = Some(Arc::new(padding));
        self
    }

    pub fn set_subfield(&mut self, number: u16, field: FieldSpec) -> &mut Self {
        self.subfields.insert(number, field);
        self
    }

    /// The configured prefix, or [prefix::Fixed] when there is none.
    pub fn prefixer(&self) -> &dyn Prefixer {
        match &self.prefix {
            Some(prefix) => prefix.as_ref(),
            None => &prefix::Fixed,
        }
    }
}

/// Which [Field] implementation a field number is instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Fixed,
    Variable,
    Composite,
    Bitmap,
}

/// A field kind paired with its shared [Spec].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub spec: Arc<Spec>,
}

impl FieldSpec {
    pub fn new(kind: FieldKind, spec: impl Into<Arc<Spec>>) -> Self {
        Self {
            kind,
            spec: spec.into(),
        }
    }

    pub fn fixed(spec: impl Into<Arc<Spec>>) -> Self {
        Self::new(FieldKind::Fixed, spec)
    }

    pub fn variable(spec: impl Into<Arc<Spec>>) -> Self {
        Self::new(FieldKind::Variable, spec)
    }

    pub fn composite(spec: impl Into<Arc<Spec>>) -> Self {
        Self::new(FieldKind::Composite, spec)
    }

    pub fn bitmap(spec: impl Into<Arc<Spec>>) -> Self {
        Self::new(FieldKind::Bitmap, spec)
    }

    /// Creates an empty field instance backed by this spec.
    pub fn instantiate(&self) -> Box<dyn Field> {
        let spec = Arc::clone(&self.spec);
        match self.kind {
            FieldKind::Fixed => Box::new(Fixed::new(spec)),
            FieldKind::Variable => Box::new(Variable::new(spec)),
            FieldKind::Composite => Box::new(Composite::new(spec)),
            FieldKind::Bitmap => Box::new(Bitmap::new(spec)),
        }
    }

    fn validate(&self, number: u16, bitmap_allowed: bool) -> Result<(), Error> {
        match self.kind {
            FieldKind::Bitmap if !bitmap_allowed => Err(Error::InvalidSpec(format!(
                "field {number}: bitmaps are only allowed as field 1"
            ))),
            FieldKind::Bitmap if self.spec.length != crate::bits::CAPACITY_BYTES => {
                Err(Error::InvalidSpec(format!(
                    "field {number}: bitmap length must be {}",
                    crate::bits::CAPACITY_BYTES
                )))
            }
            FieldKind::Bitmap if self.spec.prefix.is_some() => Err(Error::InvalidSpec(format!(
                "field {number}: bitmaps cannot have a length prefix"
            ))),
            FieldKind::Variable if self.spec.prefix.is_none() => Err(Error::InvalidSpec(format!(
                "field {number}: variable-length field needs a length prefix"
            ))),
            FieldKind::Composite if self.spec.subfields.is_empty() => Err(Error::InvalidSpec(
                format!("field {number}: composite field has no subfields"),
            )),
            FieldKind::Composite => validate_numbers(&self.spec.subfields, 1),
            _ => Ok(()),
        }
    }
}

fn validate_numbers(fields: &BTreeMap<u16, FieldSpec>, first: u16) -> Result<(), Error> {
    for (&number, field) in fields {
        if number < first || number > MAX_FIELD {
            return Err(Error::InvalidSpec(format!(
                "field number {number} is outside {first}..={MAX_FIELD}"
            )));
        }
        field.validate(number, number == 1)?;
    }
    Ok(())
}

/// Field layout of a whole message: field 1 is the bitmap, field 0 an optional MTI.
#[derive(Debug, Clone, Default)]
pub struct MessageSpec {
    pub fields: BTreeMap<u16, FieldSpec>,
}

impl MessageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, number: u16, field: FieldSpec) -> &mut Self {
        self.fields.insert(number, field);
        self
    }

    pub fn field(&self, number: u16) -> Option<&FieldSpec> {
        self.fields.get(&number)
    }

    /// Checks the structural rules a [crate::message::Message] relies on.
    pub fn validate(&self) -> Result<(), Error> {
        match self.fields.get(&1) {
            Some(field) if field.kind == FieldKind::Bitmap => {}
            _ => {
                return Err(Error::InvalidSpec(
                    "field 1 must be a bitmap".to_string(),
                ));
            }
        }
        if let Some(mti) = self.fields.get(&0) {
            if mti.kind == FieldKind::Bitmap {
                return Err(Error::InvalidSpec("field 0 cannot be a bitmap".to_string()));
            }
        }
        validate_numbers(&self.fields, 0)
    }

    /// Parses and validates a JSON spec in the shape of [crate::serde::MessageSpecDef].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let def: crate::serde::MessageSpecDef = serde_json::from_str(json)?;
        def.try_into()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<crate::serde::FieldDef> for FieldSpec {
    type Error = Error;

    fn try_from(value: crate::serde::FieldDef) -> Result<Self, Self::Error> {
        use crate::serde::{EncodingDef, FieldKindDef, PaddingDef, PrefixDef};
        use crate::{encoding, padding};

        let mut spec = match value.encoding {
            EncodingDef::Ascii => Spec::new(value.length, encoding::Ascii),
            EncodingDef::Binary => Spec::new(value.length, encoding::Binary),
            EncodingDef::Bcd => Spec::new(value.length, encoding::Bcd),
            EncodingDef::Hex => Spec::new(value.length, encoding::Hex),
        };
        spec.set_description(value.description);

        match value.prefix {
            None | Some(PrefixDef::Fixed) => {}
            Some(PrefixDef::Ascii { digits }) => {
                spec.set_prefix(prefix::Ascii::with_digits(digits).ok_or_else(|| {
                    Error::InvalidSpec(format!("ascii prefix must have 1..=4 digits, got {digits}"))
                })?);
            }
            Some(PrefixDef::Bcd { digits }) => {
                spec.set_prefix(prefix::Bcd::with_digits(digits).ok_or_else(|| {
                    Error::InvalidSpec(format!("bcd prefix must have 1..=4 digits, got {digits}"))
                })?);
            }
            Some(PrefixDef::Binary { bytes }) => {
                spec.set_prefix(prefix::Binary::with_bytes(bytes).ok_or_else(|| {
                    Error::InvalidSpec(format!("binary prefix must have 1..=2 bytes, got {bytes}"))
                })?);
            }
        }

        match value.padding {
            None => {}
            Some(PaddingDef::Left { pad }) => {
                spec.set_padding(padding::Left(pad_byte(pad)?));
            }
            Some(PaddingDef::Right { pad }) => {
                spec.set_padding(padding::Right(pad_byte(pad)?));
            }
        }

        for (number, sub) in value.subfields {
            spec.set_subfield(number, sub.try_into()?);
        }

        let kind = match value.kind {
            FieldKindDef::Fixed => FieldKind::Fixed,
            FieldKindDef::Variable => FieldKind::Variable,
            FieldKindDef::Composite => FieldKind::Composite,
            FieldKindDef::Bitmap => FieldKind::Bitmap,
        };

        Ok(FieldSpec::new(kind, spec))
    }
}

#[cfg(feature = "serde")]
fn pad_byte(pad: char) -> Result<u8, Error> {
    u8::try_from(pad)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::InvalidSpec(format!("pad character {pad:?} is not ASCII")))
}

#[cfg(feature = "serde")]
impl TryFrom<crate::serde::MessageSpecDef> for MessageSpec {
    type Error = Error;

    fn try_from(value: crate::serde::MessageSpecDef) -> Result<Self, Self::Error> {
        let mut spec = MessageSpec::new();
        for (number, field) in value.fields {
            spec.set_field(number, field.try_into()?);
        }
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding;

    fn bitmap() -> FieldSpec {
        FieldSpec::bitmap(Spec::new(16, encoding::Binary))
    }

    #[test]
    fn test_prefixer_defaults_to_fixed() {
        let spec = Spec::new(4, encoding::Ascii);
        assert_eq!(spec.prefixer().width(), 0);
        assert_eq!(spec.prefixer().decode_length(4, b"").unwrap(), 4);
    }

    #[test]
    fn test_validate_requires_bitmap() {
        let mut spec = MessageSpec::new();
        spec.set_field(2, FieldSpec::fixed(Spec::new(4, encoding::Ascii)));
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));

        spec.set_field(1, bitmap());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_variable_without_prefix() {
        let mut spec = MessageSpec::new();
        spec.set_field(1, bitmap())
            .set_field(2, FieldSpec::variable(Spec::new(19, encoding::Ascii)));
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_numbers() {
        let mut spec = MessageSpec::new();
        spec.set_field(1, bitmap())
            .set_field(129, FieldSpec::fixed(Spec::new(1, encoding::Ascii)));
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_second_bitmap() {
        let mut spec = MessageSpec::new();
        spec.set_field(1, bitmap()).set_field(65, bitmap());
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_prefixed_bitmap() {
        let mut prefixed = Spec::new(16, encoding::Binary);
        prefixed.set_prefix(prefix::Ascii::LL);

        let mut spec = MessageSpec::new();
        spec.set_field(1, FieldSpec::bitmap(prefixed));
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_empty_composite() {
        let mut spec = MessageSpec::new();
        spec.set_field(1, bitmap())
            .set_field(3, FieldSpec::composite(Spec::new(6, encoding::Binary)));
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_spec_is_shared() {
        let spec: Arc<Spec> = Spec::new(4, encoding::Ascii).into();
        let a = FieldSpec::fixed(Arc::clone(&spec));
        let b = FieldSpec::fixed(Arc::clone(&spec));
        assert!(Arc::ptr_eq(&a.spec, &b.spec));
    }
}
