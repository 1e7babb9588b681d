//! # iso8583
//!
//! Spec-driven packing and unpacking of ISO 8583 financial messages.
//!
//! A [spec::MessageSpec] maps field numbers to a kind (fixed, variable,
//! composite or bitmap) and a shared [spec::Spec] holding the length prefix,
//! payload encoding and padding. A [message::Message] built on it stores
//! canonical field values; packing writes the optional MTI, the presence
//! bitmap and the present fields in ascending order, and unpacking walks the
//! bitmap to read them back.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use iso8583::message::Message;
//! use iso8583::spec::{FieldSpec, MessageSpec, Spec};
//! use iso8583::{encoding, padding, prefix};
//!
//! let mut pan = Spec::new(19, encoding::Ascii);
//! pan.set_prefix(prefix::Ascii::LL);
//! let mut stan = Spec::new(6, encoding::Ascii);
//! stan.set_padding(padding::Left(b'0'));
//!
//! let mut spec = MessageSpec::new();
//! spec.set_field(1, FieldSpec::bitmap(Spec::new(16, encoding::Binary)))
//!     .set_field(2, FieldSpec::variable(pan))
//!     .set_field(11, FieldSpec::fixed(stan));
//! let spec = Arc::new(spec);
//!
//! let mut message = Message::new(Arc::clone(&spec)).unwrap();
//! message.set_string(2, "4242424242424242").unwrap();
//! message.set_string(11, "123").unwrap();
//! let packed = message.pack().unwrap();
//! assert_eq!(&packed[..8], &[0x40, 0x20, 0, 0, 0, 0, 0, 0]);
//! assert_eq!(&packed[8..], b"164242424242424242000123");
//!
//! let mut read = Message::new(spec).unwrap();
//! read.unpack(&packed).unwrap();
//! assert_eq!(read.get_string(11).unwrap().as_deref(), Some("123"));
//! ```

pub mod bitmap;
pub mod bits;
pub mod composite;
pub mod encoding;
pub mod errors;
pub mod field;
mod field_set;
pub mod message;
pub mod padding;
pub mod prefix;
#[cfg(feature = "serde")]
pub mod serde;
pub mod spec;
pub mod spec87;
