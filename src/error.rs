// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the loader core.

use crate::token::TokenKind;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tokenizing, seeking or reading typed
/// arguments.
#[derive(Error, Debug)]
pub enum Error {
    #[error("token payload of {length} bytes at input offset {offset} exceeds 255")]
    TokenTooLong { offset: usize, length: usize },

    #[error("unterminated string literal starting at input offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unterminated comment starting at input offset {offset}")]
    UnterminatedComment { offset: usize },

    #[error("unexpected character {character:?} at input offset {offset}")]
    UnexpectedCharacter { offset: usize, character: char },

    #[error("tape offset {offset} out of range (total size {size})")]
    OutOfRange { offset: u64, size: u64 },

    #[error("line id {line_id} out of range (model has {num_lines} lines)")]
    InvalidLineId { line_id: u32, num_lines: u32 },

    #[error("expected {expected:?} token, found {found:?} at tape offset {offset}")]
    TypeMismatch {
        expected: TokenKind,
        found: TokenKind,
        offset: u64,
    },

    #[error("entity line has no argument {index}")]
    ArgumentOutOfBounds { index: u32 },

    #[error("invalid token tag {tag:#04x} at tape offset {offset}")]
    InvalidTokenTag { tag: u8, offset: u64 },
}
