//! Padding of canonical payloads to a fixed width.

use std::fmt;

use crate::errors::PaddingError;

pub trait Padder: fmt::Debug + Send + Sync {
    /// Extends `raw` to exactly `width` bytes.
    fn pad(&self, raw: &[u8], width: usize) -> Result<Vec<u8>, PaddingError>;

    /// Removes the padding added by [Padder::pad].
    fn unpad(&self, padded: &[u8]) -> Vec<u8>;
}

fn fill(raw: &[u8], width: usize) -> Result<usize, PaddingError> {
    if raw.len() > width {
        return Err(PaddingError::Overflow {
            width,
            actual: raw.len(),
        });
    }
    Ok(width - raw.len())
}

/// Pads on the left, e.g. `Left(b'0')` for numeric fields.
///
/// Unpadding an all-fill payload keeps its last byte, so a zero-filled zero reads back as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Left(pub u8);

impl Padder for Left {
    fn pad(&self, raw: &[u8], width: usize) -> Result<Vec<u8>, PaddingError> {
        let mut out = vec![self.0; fill(raw, width)?];
        out.extend_from_slice(raw);
        Ok(out)
    }

    fn unpad(&self, padded: &[u8]) -> Vec<u8> {
        let start = padded
            .iter()
            .position(|&b| b != self.0)
            .unwrap_or(padded.len().saturating_sub(1));
        padded[start..].to_vec()
    }
}

/// Pads on the right, e.g. `Right(b' ')` for alphanumeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Right(pub u8);

impl Padder for Right {
    fn pad(&self, raw: &[u8], width: usize) -> Result<Vec<u8>, PaddingError> {
        fill(raw, width)?;
        let mut out = raw.to_vec();
        out.resize(width, self.0);
        Ok(out)
    }

    fn unpad(&self, padded: &[u8]) -> Vec<u8> {
        let end = padded
            .iter()
            .rposition(|&b| b != self.0)
            .map_or(0, |i| i + 1);
        padded[..end].to_vec()
    }
}
