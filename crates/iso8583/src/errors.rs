//! Error types for strategies, fields and messages.
//!
//! Strategy errors ([EncodingError], [PrefixError], [PaddingError]) are wrapped by
//! [FieldError], which records the stage that failed. [Error] adds the field number.

use thiserror::Error;

/// Errors produced by a payload [crate::encoding::Encoder].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Byte is outside the 7-bit ASCII range.
    #[error("byte 0x{byte:02x} at offset {offset} is not 7-bit ASCII")]
    NonAscii { byte: u8, offset: usize },
    /// Byte is not an ASCII decimal digit (BCD packing).
    #[error("byte 0x{byte:02x} at offset {offset} is not a decimal digit")]
    NonDigit { byte: u8, offset: usize },
    /// Packed BCD nibble is greater than 9.
    #[error("nibble 0x{nibble:x} at offset {offset} is not a BCD digit")]
    InvalidNibble { nibble: u8, offset: usize },
    /// Byte is not a hex digit.
    #[error("byte 0x{byte:02x} at offset {offset} is not a hex digit")]
    InvalidHex { byte: u8, offset: usize },
    /// Hex text must hold two digits per byte.
    #[error("hex input has odd length {0}")]
    OddHexLength(usize),
}

/// Errors produced by a length [crate::prefix::Prefixer].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    /// Length is larger than the declared maximum.
    #[error("length {actual} exceeds maximum {max}")]
    TooLong { max: usize, actual: usize },
    /// Fixed fields must hold exactly their declared length.
    #[error("fixed length {expected} required, got {actual}")]
    FixedMismatch { expected: usize, actual: usize },
    /// Length cannot be written with the prefix's digit or byte count.
    #[error("length {length} does not fit in a {width}-place prefix")]
    Overflow { length: usize, width: usize },
    /// Not enough input to read the prefix itself.
    #[error("prefix needs {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    /// Prefix byte is not a digit.
    #[error("prefix byte 0x{byte:02x} is not a digit")]
    InvalidDigit { byte: u8 },
}

/// Errors produced by a [crate::padding::Padder].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaddingError {
    #[error("value of {actual} bytes does not fit in width {width}")]
    Overflow { width: usize, actual: usize },
}

/// Failure of a single field, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("failed to encode or decode content: {0}")]
    Encoding(#[from] EncodingError),
    #[error("failed to encode or decode length: {0}")]
    LengthEncoding(#[from] PrefixError),
    #[error("failed to pad or unpad content: {0}")]
    Padding(#[from] PaddingError),
    #[error("expected at least {needed} bytes, {available} available")]
    BufferTooShort { needed: usize, available: usize },
    #[error("bit {0} is outside the bitmap range 1..=128")]
    BitOutOfRange(usize),
    #[error("value of {actual} bytes exceeds capacity {max}")]
    TooLong { max: usize, actual: usize },
    /// A variable-length field was configured without a length prefix.
    #[error("variable-length field has no length prefix")]
    MissingPrefix,
    /// A composite's sub-fields did not fill its declared length.
    #[error("sub-fields consumed {actual} of {expected} bytes")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("subfield {0}")]
    Subfield(#[source] Box<Error>),
}

/// Message-level failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("field {field}: {source}")]
    Field {
        field: u16,
        #[source]
        source: FieldError,
    },
    /// Field number has no definition in the spec (set bitmap bit or caller input).
    #[error("field {field} is not defined by the spec")]
    UnknownField { field: u16 },
    /// A field the layout always writes, such as the MTI, holds no value.
    #[error("field {field} is required")]
    MissingField { field: u16 },
    /// Bitmaps are maintained by pack and unpack, not set directly.
    #[error("field {field} is a bitmap")]
    BitmapField { field: u16 },
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error("field {field} is not valid UTF-8")]
    NotUtf8 { field: u16 },
    #[cfg(feature = "serde")]
    #[error("spec json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn field(field: u16, source: impl Into<FieldError>) -> Self {
        Error::Field {
            field,
            source: source.into(),
        }
    }

    /// Returns the innermost [FieldError], following composite sub-field nesting.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            Error::Field {
                source: FieldError::Subfield(inner),
                ..
            } => inner.field_error(),
            Error::Field { source, .. } => Some(source),
            _ => None,
        }
    }
}
