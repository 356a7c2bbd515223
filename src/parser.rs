// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line indexer over the tokenized tape.
//!
//! One scan from offset 0. Data lines open with a REF (the express id)
//! followed by the type LABEL; they are recorded in the model index.
//! Header records open with a LABEL and are walked over without being
//! indexed, which keeps the line table (and everything downstream of it)
//! purely about entity records.

use crate::error::Result;
use crate::meta::{IfcLine, ModelIndex};
use crate::schema::{TypeTable, UNREGISTERED};
use crate::tape::Tape;
use crate::token::TokenKind;

/// Tape walker populating a [`ModelIndex`].
pub struct Parser<'t> {
    tape: &'t mut Tape,
    table: &'t TypeTable,
    index: &'t mut ModelIndex,
}

impl<'t> Parser<'t> {
    pub fn new(tape: &'t mut Tape, table: &'t TypeTable, index: &'t mut ModelIndex) -> Self {
        Self { tape, table, index }
    }

    /// Scan the whole tape, recording every data line. `line_hint` is the
    /// tokenizer's line count, used only to presize the line table.
    pub fn parse(&mut self, line_hint: u32) -> Result<()> {
        self.index.lines.reserve(line_hint as usize);
        self.tape.move_to(0)?;

        while !self.tape.at_end() {
            let line_start = self.tape.read_offset();
            let kind = TokenKind::from_tag(self.tape.read_u8()?, line_start)?;

            match kind {
                TokenKind::Ref => {
                    let express_id = self.tape.read_u32()?;
                    let ifc_type = self.read_type_code()?;
                    let tape_end = self.skip_to_line_end()?;
                    self.index.insert_line(IfcLine {
                        express_id,
                        line_index: 0,
                        ifc_type,
                        tape_offset: line_start,
                        tape_end,
                    });
                }
                TokenKind::LineEnd => {}
                other => {
                    // Header record or stray token: walk to the line end
                    // without indexing.
                    other.skip_payload(self.tape)?;
                    self.skip_to_line_end()?;
                }
            }
        }

        Ok(())
    }

    /// Consume the type LABEL after a line's express id and resolve its
    /// code. Labels absent from the table record as [`UNREGISTERED`].
    fn read_type_code(&mut self) -> Result<u32> {
        let offset = self.tape.read_offset();
        let kind = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
        if kind != TokenKind::Label {
            // Malformed line; leave the token for skip_to_line_end.
            self.tape.move_to(offset)?;
            return Ok(UNREGISTERED);
        }
        let name = self.tape.read_string_view()?;
        Ok(std::str::from_utf8(name)
            .ok()
            .and_then(|name| self.table.code_of(name))
            .unwrap_or(UNREGISTERED))
    }

    /// Skip tokens up to and including the next LINE_END; returns the
    /// offset just past it.
    fn skip_to_line_end(&mut self) -> Result<u64> {
        loop {
            let offset = self.tape.read_offset();
            let kind = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
            if kind == TokenKind::LineEnd {
                return Ok(self.tape.read_offset());
            }
            kind.skip_payload(self.tape)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::tokenizer::Tokenizer;

    fn parse(text: &str) -> (Tape, ModelIndex) {
        let mut tape = Tape::new();
        let lines = Tokenizer::new(&mut tape).tokenize(text.as_bytes()).unwrap();
        let table = TypeTable::builtin();
        let mut index = ModelIndex::new();
        Parser::new(&mut tape, &table, &mut index)
            .parse(lines)
            .unwrap();
        (tape, index)
    }

    #[test]
    fn test_data_lines_recorded() {
        let (_, index) = parse(
            "#1=IFCWALL('a',$,$,$,$,$,$,$);\n\
             #2=IFCDOOR('b',$,$,$,$,$,$,$);\n\
             #3=IFCWALL('c',$,$,$,$,$,$,$);\n",
        );

        assert_eq!(index.lines.len(), 3);
        assert_eq!(index.line_of_express_id(2).unwrap().ifc_type, schema::IFCDOOR);
        let walls = &index.type_to_lines[&schema::IFCWALL];
        assert_eq!(walls, &vec![0, 2]);
    }

    #[test]
    fn test_header_records_not_indexed() {
        let (_, index) = parse(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n\
             #1=IFCPROJECT('g',$,$,$,$,$,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n",
        );

        assert_eq!(index.lines.len(), 1);
        assert_eq!(index.lines[0].express_id, 1);
        assert_eq!(index.lines[0].ifc_type, schema::IFCPROJECT);
    }

    #[test]
    fn test_unregistered_type_records_code_zero() {
        let (_, index) = parse("#7=IFCFROBNICATOR($);\n");
        assert_eq!(index.lines[0].ifc_type, UNREGISTERED);
        assert_eq!(index.type_to_lines[&UNREGISTERED], vec![0]);
    }

    #[test]
    fn test_tape_ranges_cover_lines() {
        let (tape, index) = parse("#1=IFCWALL($);#2=IFCDOOR($);");
        for line in &index.lines {
            assert!(line.tape_offset < line.tape_end);
            assert!(line.tape_end <= tape.total_size());
        }
        assert_eq!(index.lines[0].tape_end, index.lines[1].tape_offset);
        assert_eq!(index.lines[1].tape_end, tape.total_size());
    }
}
