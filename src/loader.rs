// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The loader: owns the tape and model index, runs the load pipeline and
//! exposes the cursor-based argument-navigation protocol.
//!
//! A loader instance is single-threaded; the read cursor is shared state
//! between the loader and whichever caller is currently navigating
//! arguments, so callers must not interleave navigation from different
//! control flows.

use std::io;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::meta::{IfcLine, ModelIndex, PairRelMap, RelMap};
use crate::schema::{self, TypeTable};
use crate::serializer;
use crate::tape::Tape;
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;
use crate::units::si_prefix_multiplier;

/// Loader configuration. The core stores it and returns it on request;
/// every field is consumed by downstream geometry code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderSettings {
    pub coordinate_to_origin: bool,
    pub use_fast_bools: bool,
    pub dump_csg_meshes: bool,
    pub circle_segments_low: u32,
    pub circle_segments_medium: u32,
    pub circle_segments_high: u32,
    pub mesh_cache: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            coordinate_to_origin: false,
            use_fast_bools: false,
            dump_csg_meshes: false,
            circle_segments_low: 5,
            circle_segments_medium: 8,
            circle_segments_high: 12,
            mesh_cache: false,
        }
    }
}

/// STEP/IFC loader over an in-memory tape.
pub struct IfcLoader {
    settings: LoaderSettings,
    types: TypeTable,
    tape: Tape,
    index: ModelIndex,
    open: bool,
    /// Offset of the last token-level read, for one-step [`reverse`].
    ///
    /// [`reverse`]: IfcLoader::reverse
    prev_token: u64,
}

impl IfcLoader {
    /// Loader with default settings and the built-in type table.
    pub fn new() -> Self {
        Self::with_settings(LoaderSettings::default())
    }

    pub fn with_settings(settings: LoaderSettings) -> Self {
        Self {
            settings,
            types: TypeTable::builtin(),
            tape: Tape::new(),
            index: ModelIndex::new(),
            open: false,
            prev_token: 0,
        }
    }

    /// The schema catalogue consulted during parse. Register additional
    /// types here before [`load_file`](Self::load_file).
    pub fn type_table(&self) -> &TypeTable {
        &self.types
    }

    pub fn type_table_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    /// Tokenize, index and post-process one STEP file. Any previously
    /// loaded state is discarded first; on error the loader is left empty
    /// and closed.
    pub fn load_file(&mut self, content: &str) -> Result<()> {
        let started = Instant::now();
        self.reset();
        match self.load_inner(content) {
            Ok(()) => {
                self.open = true;
                tracing::debug!(
                    lines = self.index.lines.len(),
                    tape_bytes = self.tape.total_size(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "loaded STEP model"
                );
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn reset(&mut self) {
        self.tape = Tape::new();
        self.index = ModelIndex::new();
        self.open = false;
        self.prev_token = 0;
    }

    fn load_inner(&mut self, content: &str) -> Result<()> {
        let line_count = Tokenizer::new(&mut self.tape).tokenize(content.as_bytes())?;
        crate::parser::Parser::new(&mut self.tape, &self.types, &mut self.index)
            .parse(line_count)?;

        self.populate_rel_voids()?;
        self.populate_rel_aggregates()?;
        self.populate_styled_items()?;
        self.populate_rel_materials()?;
        self.populate_material_definitions()?;
        self.read_linear_scaling_factor()?;
        Ok(())
    }

    // ---- index queries ----------------------------------------------------

    /// True after a successful [`load_file`](Self::load_file).
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of indexed entity lines (header records are not lines).
    #[inline]
    pub fn num_lines(&self) -> usize {
        self.index.lines.len()
    }

    #[inline]
    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Read access to the underlying tape (sizes, bulk copies).
    #[inline]
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Multiplier converting the file's length unit to metres.
    #[inline]
    pub fn linear_scaling_factor(&self) -> f64 {
        self.index.linear_scaling_factor
    }

    /// Line record by dense line index.
    #[inline]
    pub fn line(&self, line_id: u32) -> Option<IfcLine> {
        self.index.line(line_id)
    }

    /// Line index for an express id, or `None` when the id never appeared.
    #[inline]
    pub fn express_id_to_line_id(&self, express_id: u32) -> Option<u32> {
        self.index.express_to_line.get(&express_id).copied()
    }

    /// Line indices of all entities with the given type code, parse order.
    pub fn line_ids_with_type(&self, ifc_type: u32) -> &[u32] {
        self.index
            .type_to_lines
            .get(&ifc_type)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Express ids of all entities with the given type code, parse order.
    pub fn express_ids_with_type(&self, ifc_type: u32) -> Vec<u32> {
        self.line_ids_with_type(ifc_type)
            .iter()
            .map(|&line_id| self.index.lines[line_id as usize].express_id)
            .collect()
    }

    /// Building element → opening elements voiding it.
    pub fn rel_voids(&self) -> &RelMap {
        &self.index.rel_voids
    }

    /// Relating object → aggregate members.
    pub fn rel_aggregates(&self) -> &RelMap {
        &self.index.rel_aggregates
    }

    /// Representation item → (styled-item line, style assignment).
    pub fn styled_items(&self) -> &PairRelMap {
        &self.index.styled_items
    }

    /// Root object → (rel-associates line, material select).
    pub fn rel_materials(&self) -> &PairRelMap {
        &self.index.rel_materials
    }

    /// Material → (definition-representation line, representation).
    pub fn material_definitions(&self) -> &PairRelMap {
        &self.index.material_definitions
    }

    // ---- tape mutation ----------------------------------------------------

    /// Append raw token bytes produced by an external writer.
    pub fn push_data_to_tape(&mut self, bytes: &[u8]) {
        self.tape.push(bytes);
    }

    /// Register or update the line record for an express id against tape
    /// bytes appended through [`push_data_to_tape`](Self::push_data_to_tape).
    pub fn update_line_tape(&mut self, express_id: u32, ifc_type: u32, start: u64, end: u64) {
        if let Some(&line_id) = self.index.express_to_line.get(&express_id) {
            let line = &mut self.index.lines[line_id as usize];
            line.tape_offset = start;
            line.tape_end = end;
        } else {
            self.index.insert_line(IfcLine {
                express_id,
                line_index: 0,
                ifc_type,
                tape_offset: start,
                tape_end: end,
            });
        }
    }

    /// Copy the tape range of an entity's line into `dest`. Returns the
    /// bytes copied, or `None` for an unknown express id.
    pub fn copy_tape_for_express_line(&self, express_id: u32, dest: &mut [u8]) -> Option<usize> {
        let line = self.index.line_of_express_id(express_id)?;
        Some(self.tape.copy(line.tape_offset, line.tape_end, dest))
    }

    /// Flush the raw tape to a sink.
    pub fn dump_tape(&self, sink: &mut impl io::Write) -> io::Result<()> {
        for chunk in self.tape.chunks() {
            sink.write_all(chunk)?;
        }
        Ok(())
    }

    /// Re-emit the indexed tape as ISO-10303-21 text. Never fails on a
    /// tape produced by [`load_file`](Self::load_file).
    pub fn dump_as_ifc(&mut self) -> Result<String> {
        serializer::dump_model(&mut self.tape, &self.index.lines)
    }

    // ---- cursor / argument navigation -------------------------------------

    /// Seek the read cursor to an absolute tape offset.
    #[inline]
    pub fn move_to(&mut self, offset: u64) -> Result<()> {
        self.tape.move_to(offset)
    }

    /// Seek to the first token of a line.
    #[inline]
    pub fn move_to_line(&mut self, line_id: u32) -> Result<()> {
        let line = self.index.line(line_id).ok_or(Error::InvalidLineId {
            line_id,
            num_lines: self.index.lines.len() as u32,
        })?;
        self.tape.move_to(line.tape_offset)
    }

    /// Seek to the `argument_index`-th top-level argument of a line.
    pub fn move_to_line_argument(&mut self, line_id: u32, argument_index: u32) -> Result<()> {
        let line = self.index.line(line_id).ok_or(Error::InvalidLineId {
            line_id,
            num_lines: self.index.lines.len() as u32,
        })?;
        self.move_to_argument_offset(&line, argument_index)
    }

    /// Position the cursor on the tag byte of the 0-based
    /// `argument_index`-th top-level argument of `line`. Values inside
    /// nested sets are skipped transparently; a whole nested set counts as
    /// one argument.
    pub fn move_to_argument_offset(&mut self, line: &IfcLine, argument_index: u32) -> Result<()> {
        self.tape.move_to(line.tape_offset)?;

        let mut moved_over: u32 = 0;
        let mut in_arguments = false;
        let mut set_depth: u32 = 0;
        loop {
            if set_depth == 1 {
                if in_arguments {
                    moved_over += 1;
                }
                in_arguments = true;
                if moved_over == argument_index {
                    return Ok(());
                }
            }

            let offset = self.tape.read_offset();
            let kind = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
            match kind {
                TokenKind::LineEnd => {
                    return Err(Error::ArgumentOutOfBounds {
                        index: argument_index,
                    })
                }
                TokenKind::SetBegin => set_depth += 1,
                TokenKind::SetEnd => {
                    set_depth = set_depth.saturating_sub(1);
                    if set_depth == 0 {
                        return Err(Error::ArgumentOutOfBounds {
                            index: argument_index,
                        });
                    }
                }
                other => other.skip_payload(&mut self.tape)?,
            }
        }
    }

    /// Read the token kind at the cursor, consuming the tag byte.
    #[inline]
    pub fn get_token_type(&mut self) -> Result<TokenKind> {
        let offset = self.tape.read_offset();
        self.prev_token = offset;
        TokenKind::from_tag(self.tape.read_u8()?, offset)
    }

    /// Token kind at the cursor without advancing it.
    #[inline]
    pub fn peek_token_type(&mut self) -> Result<TokenKind> {
        let offset = self.tape.read_offset();
        let kind = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
        self.tape.move_to(offset)?;
        Ok(kind)
    }

    /// Back the cursor up over the most recent token-level read.
    #[inline]
    pub fn reverse(&mut self) -> Result<()> {
        self.tape.move_to(self.prev_token)
    }

    /// Read a REF argument at the cursor.
    pub fn get_ref_argument(&mut self) -> Result<u32> {
        self.expect_token(TokenKind::Ref)?;
        self.tape.read_u32()
    }

    /// Seek then read a REF argument.
    pub fn get_ref_argument_at(&mut self, tape_offset: u64) -> Result<u32> {
        self.tape.move_to(tape_offset)?;
        self.get_ref_argument()
    }

    /// Read a REAL argument at the cursor.
    pub fn get_double_argument(&mut self) -> Result<f64> {
        self.expect_token(TokenKind::Real)?;
        self.tape.read_f64()
    }

    /// Seek then read a REAL argument.
    pub fn get_double_argument_at(&mut self, tape_offset: u64) -> Result<f64> {
        self.tape.move_to(tape_offset)?;
        self.get_double_argument()
    }

    /// Read a STRING/ENUM/LABEL argument at the cursor as an owned string.
    pub fn get_string_argument(&mut self) -> Result<String> {
        let view = self.get_string_view_argument()?;
        Ok(String::from_utf8_lossy(view).into_owned())
    }

    /// Read a STRING/ENUM/LABEL argument at the cursor as a borrowed view
    /// of the tape bytes.
    pub fn get_string_view_argument(&mut self) -> Result<&[u8]> {
        let offset = self.tape.read_offset();
        self.prev_token = offset;
        let found = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
        if !found.is_text() {
            return Err(Error::TypeMismatch {
                expected: TokenKind::String,
                found,
                offset,
            });
        }
        self.tape.read_string_view()
    }

    /// Read a SET argument at the cursor. Returns the tape offset of each
    /// top-level element (nested sets count as one element, addressed at
    /// their SET_BEGIN); the cursor ends one byte past the closing
    /// SET_END.
    pub fn get_set_argument(&mut self) -> Result<Vec<u64>> {
        self.expect_token(TokenKind::SetBegin)?;

        let mut offsets = Vec::new();
        let mut depth: u32 = 1;
        loop {
            let offset = self.tape.read_offset();
            let kind = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
            match kind {
                TokenKind::SetBegin => {
                    if depth == 1 {
                        offsets.push(offset);
                    }
                    depth += 1;
                }
                TokenKind::SetEnd => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(offsets);
                    }
                }
                TokenKind::LineEnd => {
                    return Err(Error::TypeMismatch {
                        expected: TokenKind::SetEnd,
                        found: TokenKind::LineEnd,
                        offset,
                    })
                }
                other => {
                    if depth == 1 {
                        offsets.push(offset);
                    }
                    other.skip_payload(&mut self.tape)?;
                }
            }
        }
    }

    #[inline]
    fn expect_token(&mut self, expected: TokenKind) -> Result<()> {
        let offset = self.tape.read_offset();
        self.prev_token = offset;
        let found = TokenKind::from_tag(self.tape.read_u8()?, offset)?;
        if found == expected {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected,
                found,
                offset,
            })
        }
    }

    // ---- post-index passes ------------------------------------------------

    /// IFCRELVOIDSELEMENT: argument 4 relates the building element,
    /// argument 5 the opening element voiding it.
    fn populate_rel_voids(&mut self) -> Result<()> {
        for express_id in self.express_ids_with_type(schema::IFCRELVOIDSELEMENT) {
            let Some(line) = self.index.line_of_express_id(express_id) else {
                continue;
            };
            self.move_to_argument_offset(&line, 4)?;
            let relating_element = self.get_ref_argument()?;
            let opening_element = self.get_ref_argument()?;
            self.index
                .rel_voids
                .entry(relating_element)
                .or_default()
                .push(opening_element);
        }
        Ok(())
    }

    /// IFCRELAGGREGATES: argument 4 is the relating element, argument 5 a
    /// set of aggregate members.
    fn populate_rel_aggregates(&mut self) -> Result<()> {
        for express_id in self.express_ids_with_type(schema::IFCRELAGGREGATES) {
            let Some(line) = self.index.line_of_express_id(express_id) else {
                continue;
            };
            self.move_to_argument_offset(&line, 4)?;
            let relating_element = self.get_ref_argument()?;
            let members = self.get_set_argument()?;
            for member in members {
                let member_id = self.get_ref_argument_at(member)?;
                self.index
                    .rel_aggregates
                    .entry(relating_element)
                    .or_default()
                    .push(member_id);
            }
        }
        Ok(())
    }

    /// IFCSTYLEDITEM: argument 0 optionally references the representation
    /// item, argument 1 is the set of style assignments.
    fn populate_styled_items(&mut self) -> Result<()> {
        for express_id in self.express_ids_with_type(schema::IFCSTYLEDITEM) {
            let Some(line) = self.index.line_of_express_id(express_id) else {
                continue;
            };
            self.move_to_argument_offset(&line, 0)?;
            if self.peek_token_type()? != TokenKind::Ref {
                continue;
            }
            let representation_item = self.get_ref_argument()?;
            let assignments = self.get_set_argument()?;
            for assignment in assignments {
                let style_assignment = self.get_ref_argument_at(assignment)?;
                self.index
                    .styled_items
                    .entry(representation_item)
                    .or_default()
                    .push((express_id, style_assignment));
            }
        }
        Ok(())
    }

    /// IFCRELASSOCIATESMATERIAL: argument 5 is the material select,
    /// argument 4 the set of root objects it applies to.
    fn populate_rel_materials(&mut self) -> Result<()> {
        for express_id in self.express_ids_with_type(schema::IFCRELASSOCIATESMATERIAL) {
            let Some(line) = self.index.line_of_express_id(express_id) else {
                continue;
            };
            self.move_to_argument_offset(&line, 5)?;
            let material_select = self.get_ref_argument()?;
            self.move_to_argument_offset(&line, 4)?;
            let related_objects = self.get_set_argument()?;
            for object in related_objects {
                let root_id = self.get_ref_argument_at(object)?;
                self.index
                    .rel_materials
                    .entry(root_id)
                    .or_default()
                    .push((express_id, material_select));
            }
        }
        Ok(())
    }

    /// IFCMATERIALDEFINITIONREPRESENTATION: argument 2 is the set of
    /// representations, argument 3 the material they define.
    fn populate_material_definitions(&mut self) -> Result<()> {
        for express_id in self.express_ids_with_type(schema::IFCMATERIALDEFINITIONREPRESENTATION) {
            let Some(line) = self.index.line_of_express_id(express_id) else {
                continue;
            };
            self.move_to_argument_offset(&line, 2)?;
            let representations = self.get_set_argument()?;
            self.move_to_argument_offset(&line, 3)?;
            let material = self.get_ref_argument()?;
            for representation in representations {
                let representation_id = self.get_ref_argument_at(representation)?;
                self.index
                    .material_definitions
                    .entry(material)
                    .or_default()
                    .push((express_id, representation_id));
            }
        }
        Ok(())
    }

    /// Follow IFCPROJECT → IFCUNITASSIGNMENT → IFCSIUNIT and derive the
    /// metre multiplier from the length unit's SI prefix. Dangling refs
    /// along the chain leave the factor at 1.0.
    fn read_linear_scaling_factor(&mut self) -> Result<()> {
        let projects = self.express_ids_with_type(schema::IFCPROJECT);
        if projects.len() != 1 {
            tracing::warn!(
                count = projects.len(),
                "expected exactly one IFCPROJECT entity, keeping linear scale 1.0"
            );
            return Ok(());
        }

        let Some(project) = self.index.line_of_express_id(projects[0]) else {
            return Ok(());
        };
        self.move_to_argument_offset(&project, 8)?;
        if self.peek_token_type()? != TokenKind::Ref {
            return Ok(());
        }
        let units_id = self.get_ref_argument()?;
        let Some(units_line) = self.index.line_of_express_id(units_id) else {
            return Ok(());
        };

        self.move_to_argument_offset(&units_line, 0)?;
        if self.peek_token_type()? != TokenKind::SetBegin {
            return Ok(());
        }
        let unit_offsets = self.get_set_argument()?;

        for unit_offset in unit_offsets {
            if self.peek_token_type_at(unit_offset)? != TokenKind::Ref {
                continue;
            }
            let unit_id = self.get_ref_argument_at(unit_offset)?;
            let Some(unit_line) = self.index.line_of_express_id(unit_id) else {
                continue;
            };
            if unit_line.ifc_type != schema::IFCSIUNIT {
                continue;
            }

            self.move_to_argument_offset(&unit_line, 1)?;
            let unit_type = self.get_string_argument()?;

            self.move_to_argument_offset(&unit_line, 2)?;
            let unit_prefix = if self.peek_token_type()? == TokenKind::Enum {
                self.get_string_argument()?
            } else {
                String::new()
            };

            self.move_to_argument_offset(&unit_line, 3)?;
            let unit_name = self.get_string_argument()?;

            if unit_type == "LENGTHUNIT" && unit_name == "METRE" {
                self.index.linear_scaling_factor = si_prefix_multiplier(&unit_prefix);
            }
        }
        Ok(())
    }

    #[inline]
    fn peek_token_type_at(&mut self, offset: u64) -> Result<TokenKind> {
        self.tape.move_to(offset)?;
        self.peek_token_type()
    }
}

impl Default for IfcLoader {
    fn default() -> Self {
        Self::new()
    }
}
