// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Token kinds shared by the tokenizer, parser and serializer.
//!
//! Each kind is a single tag byte on the tape, optionally followed by a
//! fixed payload (see [`TokenKind::payload`] for the layout summary).

use crate::error::{Error, Result};
use crate::tape::Tape;

/// On-tape token kind, one tag byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    /// Derived value marker `*`, no payload.
    Unknown = 0,
    /// Unset value marker `$`, no payload.
    Empty = 1,
    /// Opening parenthesis of a set, no payload.
    SetBegin = 2,
    /// Closing parenthesis of a set, no payload.
    SetEnd = 3,
    /// Quoted string literal; 1-byte length then raw bytes.
    String = 4,
    /// Dotted enumeration `.NAME.`; 1-byte length then raw bytes.
    Enum = 5,
    /// Bare identifier (entity type name); 1-byte length then raw bytes.
    Label = 6,
    /// Entity reference `#N`; 4-byte little-endian express id.
    Ref = 7,
    /// Numeric literal; 8-byte little-endian IEEE-754 double.
    Real = 8,
    /// End of one logical line (`;`), no payload.
    LineEnd = 9,
}

impl TokenKind {
    /// Decode a tag byte read from the tape.
    #[inline]
    pub fn from_tag(tag: u8, offset: u64) -> Result<Self> {
        Ok(match tag {
            0 => Self::Unknown,
            1 => Self::Empty,
            2 => Self::SetBegin,
            3 => Self::SetEnd,
            4 => Self::String,
            5 => Self::Enum,
            6 => Self::Label,
            7 => Self::Ref,
            8 => Self::Real,
            9 => Self::LineEnd,
            _ => return Err(Error::InvalidTokenTag { tag, offset }),
        })
    }

    /// The tag byte written to the tape for this kind.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// True for the length-prefixed kinds (STRING, ENUM, LABEL).
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, Self::String | Self::Enum | Self::Label)
    }

    /// Advance the tape past this token's payload. The tag byte must
    /// already have been consumed.
    pub fn skip_payload(self, tape: &mut Tape) -> Result<()> {
        match self {
            kind if kind.is_text() => {
                let len = tape.read_u8()?;
                tape.advance_read(len as u64)
            }
            Self::Ref => tape.advance_read(4),
            Self::Real => tape.advance_read(8),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for kind in [
            TokenKind::Unknown,
            TokenKind::Empty,
            TokenKind::SetBegin,
            TokenKind::SetEnd,
            TokenKind::String,
            TokenKind::Enum,
            TokenKind::Label,
            TokenKind::Ref,
            TokenKind::Real,
            TokenKind::LineEnd,
        ] {
            assert_eq!(TokenKind::from_tag(kind.tag(), 0).unwrap(), kind);
        }
    }

    #[test]
    fn test_invalid_tag() {
        assert!(TokenKind::from_tag(0xFF, 12).is_err());
    }

    #[test]
    fn test_text_kinds() {
        assert!(TokenKind::String.is_text());
        assert!(TokenKind::Enum.is_text());
        assert!(TokenKind::Label.is_text());
        assert!(!TokenKind::Ref.is_text());
        assert!(!TokenKind::SetBegin.is_text());
    }
}
