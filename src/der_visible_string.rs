//! ASN.1 `VisibleString` support.
//!
//! The `der` crate version pinned by this workspace does not expose a
//! `VisibleString` type (it was added in a later major version), even
//! though `Tag::VisibleString` itself is defined. This provides an owned
//! `VisibleString` with the same wire format (tag `0x1A`, ISO646/ASCII
//! visible characters), implemented directly against `der`'s public
//! `Reader`/`Writer` traits.

use std::fmt;

use der::{DecodeValue, EncodeValue, FixedTag, Header, Length, Reader, Result, Tag, Writer};

/// ASN.1 `VisibleString` type: a string restricted to the visible
/// (non-control) characters of the ASCII/ISO646 character set, i.e.
/// bytes in the range `0x20..=0x7E`.
#[derive(Clone, Eq, PartialEq, PartialOrd, Ord)]
pub struct VisibleString {
    inner: String,
}

impl VisibleString {
    /// Create a new ASN.1 `VisibleString`, validating that all bytes are
    /// within the visible-character range.
    pub fn new<T>(input: &T) -> Result<Self>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        let input = input.as_ref();
        if input.iter().any(|&c| !(0x20..=0x7E).contains(&c)) {
            return Err(Self::TAG.value_error());
        }
        let s = core::str::from_utf8(input).map_err(|_| Self::TAG.value_error())?;
        Ok(Self { inner: String::from(s) })
    }

    /// Borrow the string contents.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl FixedTag for VisibleString {
    const TAG: Tag = Tag::VisibleString;
}

impl<'a> DecodeValue<'a> for VisibleString {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        let len = usize::try_from(header.length)?;
        let bytes = reader.read_slice(header.length)?;
        debug_assert_eq!(bytes.len(), len);
        Self::new(bytes)
    }
}

impl EncodeValue for VisibleString {
    fn value_len(&self) -> Result<Length> {
        Length::try_from(self.inner.len())
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        writer.write(self.inner.as_bytes())
    }
}

impl fmt::Debug for VisibleString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VisibleString({:?})", self.inner)
    }
}

impl fmt::Display for VisibleString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}
