// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Streaming STEP lexer writing binary tokens onto the tape.
//!
//! Single pass over the raw text. Commas and `=` are dropped (the
//! serializer re-synthesizes them), comments and whitespace are skipped,
//! and the five section markers are consumed without producing tokens.
//! Everything else becomes one token in the tape encoding described in
//! [`TokenKind`](crate::TokenKind).

use crate::error::{Error, Result};
use crate::tape::Tape;
use crate::token::TokenKind;

/// Section markers that structure a STEP file but carry no data.
const MARKERS: [&[u8]; 5] = [
    b"ISO-10303-21",
    b"HEADER",
    b"ENDSEC",
    b"DATA",
    b"END-ISO-10303-21",
];

/// Tokenizer over one input buffer, writing to a borrowed tape.
pub struct Tokenizer<'t> {
    tape: &'t mut Tape,
}

impl<'t> Tokenizer<'t> {
    pub fn new(tape: &'t mut Tape) -> Self {
        Self { tape }
    }

    /// Tokenize STEP text onto the tape. Returns the number of logical
    /// lines (header records included; section markers are not lines).
    pub fn tokenize(&mut self, input: &[u8]) -> Result<u32> {
        let mut pos = 0;
        let mut lines = 0u32;

        while pos < input.len() {
            let b = input[pos];
            match b {
                _ if b.is_ascii_whitespace() => pos += 1,
                b'/' => pos = self.skip_comment(input, pos)?,
                b'\'' => pos = self.string_literal(input, pos)?,
                b'.' => pos = self.enumeration(input, pos)?,
                b'#' => pos = self.reference(input, pos)?,
                b'$' => {
                    self.put_tag(TokenKind::Empty);
                    pos += 1;
                }
                b'*' => {
                    self.put_tag(TokenKind::Unknown);
                    pos += 1;
                }
                b'(' => {
                    self.put_tag(TokenKind::SetBegin);
                    pos += 1;
                }
                b')' => {
                    self.put_tag(TokenKind::SetEnd);
                    pos += 1;
                }
                b',' | b'=' => pos += 1,
                b';' => {
                    self.put_tag(TokenKind::LineEnd);
                    lines += 1;
                    pos += 1;
                }
                b'0'..=b'9' | b'-' | b'+' => pos = self.real(input, pos)?,
                _ if b.is_ascii_alphabetic() => pos = self.label(input, pos)?,
                _ => {
                    return Err(Error::UnexpectedCharacter {
                        offset: pos,
                        character: b as char,
                    })
                }
            }
        }

        Ok(lines)
    }

    #[inline]
    fn put_tag(&mut self, kind: TokenKind) {
        self.tape.push(&[kind.tag()]);
    }

    fn put_text(&mut self, kind: TokenKind, payload: &[u8], offset: usize) -> Result<()> {
        if payload.len() > u8::MAX as usize {
            return Err(Error::TokenTooLong {
                offset,
                length: payload.len(),
            });
        }
        self.tape.push(&[kind.tag(), payload.len() as u8]);
        self.tape.push(payload);
        Ok(())
    }

    /// Skip a `/* ... */` comment; `pos` sits on the `/`.
    fn skip_comment(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        if input.get(pos + 1) != Some(&b'*') {
            return Err(Error::UnexpectedCharacter {
                offset: pos,
                character: '/',
            });
        }
        match memchr::memmem::find(&input[pos + 2..], b"*/") {
            Some(end) => Ok(pos + 2 + end + 2),
            None => Err(Error::UnterminatedComment { offset: pos }),
        }
    }

    /// Lex `'...'`; doubled quotes stay in the payload byte-for-byte.
    fn string_literal(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        let start = pos + 1;
        let mut scan = start;
        loop {
            let quote = memchr::memchr(b'\'', &input[scan..])
                .ok_or(Error::UnterminatedString { offset: pos })?;
            let quote = scan + quote;
            if input.get(quote + 1) == Some(&b'\'') {
                scan = quote + 2;
                continue;
            }
            self.put_text(TokenKind::String, &input[start..quote], pos)?;
            return Ok(quote + 1);
        }
    }

    /// Lex `.NAME.`; the payload is the bytes between the dots.
    fn enumeration(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        let start = pos + 1;
        let end = memchr::memchr(b'.', &input[start..]).ok_or(Error::UnexpectedCharacter {
            offset: pos,
            character: '.',
        })?;
        let end = start + end;
        self.put_text(TokenKind::Enum, &input[start..end], pos)?;
        Ok(end + 1)
    }

    /// Lex `#N`.
    fn reference(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        let start = pos + 1;
        let mut scan = start;
        let mut id: u32 = 0;
        while scan < input.len() && input[scan].is_ascii_digit() {
            id = id
                .wrapping_mul(10)
                .wrapping_add((input[scan] - b'0') as u32);
            scan += 1;
        }
        if scan == start {
            return Err(Error::UnexpectedCharacter {
                offset: pos,
                character: '#',
            });
        }
        self.tape.push(&[TokenKind::Ref.tag()]);
        self.tape.push(&id.to_le_bytes());
        Ok(scan)
    }

    /// Lex a numeric literal. Integers are promoted to REAL.
    fn real(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        match fast_float::parse_partial::<f64, _>(&input[pos..]) {
            Ok((value, consumed)) if consumed > 0 => {
                self.tape.push(&[TokenKind::Real.tag()]);
                self.tape.push(&value.to_le_bytes());
                Ok(pos + consumed)
            }
            _ => Err(Error::UnexpectedCharacter {
                offset: pos,
                character: input[pos] as char,
            }),
        }
    }

    /// Lex a bare identifier: a section marker (dropped, together with its
    /// trailing `;`) or a LABEL token.
    fn label(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        let mut end = pos;
        while end < input.len()
            && (input[end].is_ascii_alphanumeric() || input[end] == b'_' || input[end] == b'-')
        {
            end += 1;
        }
        let name = &input[pos..end];

        if MARKERS.contains(&name) {
            let mut scan = end;
            while scan < input.len() && input[scan].is_ascii_whitespace() {
                scan += 1;
            }
            if input.get(scan) == Some(&b';') {
                scan += 1;
            }
            return Ok(scan);
        }

        self.put_text(TokenKind::Label, name, pos)?;
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(text: &str) -> (Tape, u32) {
        let mut tape = Tape::new();
        let lines = Tokenizer::new(&mut tape).tokenize(text.as_bytes()).unwrap();
        (tape, lines)
    }

    fn kinds(tape: &mut Tape) -> Vec<TokenKind> {
        let mut out = Vec::new();
        tape.move_to(0).unwrap();
        while !tape.at_end() {
            let kind = TokenKind::from_tag(tape.read_u8().unwrap(), 0).unwrap();
            out.push(kind);
            match kind {
                k if k.is_text() => {
                    let len = tape.read_u8().unwrap();
                    tape.advance_read(len as u64).unwrap();
                }
                TokenKind::Ref => {
                    tape.read_u32().unwrap();
                }
                TokenKind::Real => {
                    tape.read_f64().unwrap();
                }
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_data_line() {
        let (mut tape, lines) = tokenize("#1=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);");
        assert_eq!(lines, 1);
        assert_eq!(
            kinds(&mut tape),
            vec![
                TokenKind::Ref,
                TokenKind::Label,
                TokenKind::SetBegin,
                TokenKind::Unknown,
                TokenKind::Enum,
                TokenKind::Enum,
                TokenKind::Enum,
                TokenKind::SetEnd,
                TokenKind::LineEnd,
            ]
        );
    }

    #[test]
    fn test_ref_payload() {
        let (mut tape, _) = tokenize("#4095=IFCWALL();");
        tape.move_to(0).unwrap();
        assert_eq!(tape.read_u8().unwrap(), TokenKind::Ref.tag());
        assert_eq!(tape.read_u32().unwrap(), 4095);
    }

    #[test]
    fn test_integer_promoted_to_real() {
        let (mut tape, _) = tokenize("#1=IFCX(42,-3,1.5E-10,0.);");
        tape.move_to(0).unwrap();
        let mut reals = Vec::new();
        while !tape.at_end() {
            let kind = TokenKind::from_tag(tape.read_u8().unwrap(), 0).unwrap();
            match kind {
                TokenKind::Real => reals.push(tape.read_f64().unwrap()),
                k if k.is_text() => {
                    let len = tape.read_u8().unwrap();
                    tape.advance_read(len as u64).unwrap();
                }
                TokenKind::Ref => {
                    tape.read_u32().unwrap();
                }
                _ => {}
            }
        }
        assert_eq!(reals, vec![42.0, -3.0, 1.5e-10, 0.0]);
    }

    #[test]
    fn test_string_escaping_kept_raw() {
        let (mut tape, _) = tokenize("#1=IFCX('it''s here');");
        tape.move_to(0).unwrap();
        tape.read_u8().unwrap(); // ref tag
        tape.read_u32().unwrap();
        let len = tape.read_u8().unwrap(); // label
        tape.advance_read(len as u64 + 1).unwrap(); // label payload + set begin
        assert_eq!(tape.read_u8().unwrap(), TokenKind::String.tag());
        assert_eq!(tape.read_string_view().unwrap(), b"it''s here");
    }

    #[test]
    fn test_semicolon_inside_string() {
        let (_, lines) = tokenize("FILE_DESCRIPTION(('d'),'2;1');");
        assert_eq!(lines, 1);
    }

    #[test]
    fn test_comments_and_whitespace_skipped() {
        let (mut tape, lines) = tokenize("#1 = /* nothing */ IFCWALL ( $ ) ;");
        assert_eq!(lines, 1);
        assert_eq!(
            kinds(&mut tape),
            vec![
                TokenKind::Ref,
                TokenKind::Label,
                TokenKind::SetBegin,
                TokenKind::Empty,
                TokenKind::SetEnd,
                TokenKind::LineEnd,
            ]
        );
    }

    #[test]
    fn test_section_markers_produce_nothing() {
        let (tape, lines) = tokenize("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;");
        assert_eq!(lines, 0);
        assert_eq!(tape.total_size(), 0);
    }

    #[test]
    fn test_header_records_counted() {
        let (_, lines) =
            tokenize("HEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n#1=IFCWALL($);\nENDSEC;");
        assert_eq!(lines, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let mut tape = Tape::new();
        let err = Tokenizer::new(&mut tape)
            .tokenize(b"#1=IFCX('oops);")
            .unwrap_err();
        assert!(matches!(err, Error::UnterminatedString { .. }));
    }

    #[test]
    fn test_unterminated_comment() {
        let mut tape = Tape::new();
        let err = Tokenizer::new(&mut tape).tokenize(b"/* oops").unwrap_err();
        assert!(matches!(err, Error::UnterminatedComment { .. }));
    }

    #[test]
    fn test_token_too_long() {
        let text = format!("#1=IFCX('{}');", "a".repeat(300));
        let mut tape = Tape::new();
        let err = Tokenizer::new(&mut tape)
            .tokenize(text.as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::TokenTooLong { length: 300, .. }));
    }
}
