//! Viewer credential.
//!
//! The viewer key is an opaque bearer token supplied by a human. It is only
//! ever sent as the `token` connection parameter and only ever displayed in
//! masked form.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Character used to hide credential characters.
pub const MASK_CHAR: char = '*';

/// Number of trailing characters left visible by [`mask_credential`].
pub const VISIBLE_SUFFIX_LEN: usize = 4;

/// Viewer credential (bearer token).
///
/// Always non-empty and free of surrounding whitespace. The backing memory is
/// zeroised when the key is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ViewerKey(String);

impl ViewerKey {
    /// Validate raw human input: trims whitespace and rejects empty input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Raw secret, for building the connection URI and persisting.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for display.
    pub fn masked(&self) -> String {
        mask_credential(&self.0)
    }
}

impl fmt::Debug for ViewerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewerKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ViewerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Replace every character except the last four with [`MASK_CHAR`].
///
/// Inputs shorter than four characters are masked entirely. Length is counted
/// in `char`s, so multi-byte input never splits a character.
pub fn mask_credential(raw: &str) -> String {
    let len = raw.chars().count();
    if len < VISIBLE_SUFFIX_LEN {
        return std::iter::repeat(MASK_CHAR).take(len).collect();
    }
    let hidden = len - VISIBLE_SUFFIX_LEN;
    raw.chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { MASK_CHAR } else { c })
        .collect()
}
