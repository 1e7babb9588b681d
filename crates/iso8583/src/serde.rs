//! JSON-deserializable message spec description.
//!
//! These types describe the *shape* of a message: which field numbers exist
//! and how each one is prefixed, encoded and padded. They are intended to be
//! read from JSON (for example a spec file shipped with your application) and
//! then converted into [crate::spec::MessageSpec] with
//! [crate::spec::MessageSpec::from_json] or `TryFrom`.
//!
//! ```json
//! {
//!   "fields": {
//!     "1": { "kind": "Bitmap", "length": 16, "encoding": "Hex" },
//!     "2": {
//!       "kind": "Variable",
//!       "length": 19,
//!       "encoding": "Ascii",
//!       "prefix": { "type": "Ascii", "digits": 2 }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level message definition: field number to field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MessageSpecDef {
    pub fields: BTreeMap<u16, FieldDef>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub kind: FieldKindDef,
    /// Declared length; the maximum for variable and composite fields.
    pub length: usize,
    #[serde(default)]
    pub description: String,
    pub encoding: EncodingDef,
    /// Length prefix; absent means fixed length.
    #[serde(default)]
    pub prefix: Option<PrefixDef>,
    #[serde(default)]
    pub padding: Option<PaddingDef>,
    /// Sub-fields of a composite field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subfields: BTreeMap<u16, FieldDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum FieldKindDef {
    Fixed,
    Variable,
    Composite,
    Bitmap,
}

/// Payload encoding.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum EncodingDef {
    /// 7-bit ASCII text.
    Ascii,
    /// Raw bytes.
    Binary,
    /// Packed decimal digits.
    Bcd,
    /// Raw bytes as uppercase hex text.
    Hex,
}

/// Length prefix layout.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PrefixDef {
    Fixed,
    /// ASCII decimal digits, 1..=4.
    Ascii { digits: usize },
    /// Packed decimal digits, 1..=4.
    Bcd { digits: usize },
    /// Big-endian byte count, 1..=2 bytes.
    Binary { bytes: usize },
}

/// Padding rule for fixed fields.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PaddingDef {
    Left { pad: char },
    Right { pad: char },
}
