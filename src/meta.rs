// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The parsed index over the tape: line table, id and type indices, and
//! the relation maps filled by the post-index passes.

use rustc_hash::FxHashMap;

/// One indexed entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfcLine {
    /// Externally assigned entity id, unique per file (`#N`).
    pub express_id: u32,
    /// Dense 0-based slot in the line table.
    pub line_index: u32,
    /// Numeric entity-type code from the [`TypeTable`](crate::TypeTable).
    pub ifc_type: u32,
    /// Tape offset of the line's first token.
    pub tape_offset: u64,
    /// Tape offset just past the line's LINE_END token.
    pub tape_end: u64,
}

/// Inverted relations keyed by express id; inner lists keep insertion
/// (parse) order.
pub type RelMap = FxHashMap<u32, Vec<u32>>;

/// Relations carrying the relating line's id alongside the target.
pub type PairRelMap = FxHashMap<u32, Vec<(u32, u32)>>;

/// Indices produced by the parser and mutated by the post-index passes.
#[derive(Debug)]
pub struct ModelIndex {
    /// All data lines, in parse order.
    pub(crate) lines: Vec<IfcLine>,
    /// Express id → line index. Absent ids are simply missing.
    pub(crate) express_to_line: FxHashMap<u32, u32>,
    /// Type code → line indices, in parse order within each type.
    pub(crate) type_to_lines: FxHashMap<u32, Vec<u32>>,

    /// Building element → opening elements voiding it.
    pub(crate) rel_voids: RelMap,
    /// Relating object → aggregate members.
    pub(crate) rel_aggregates: RelMap,
    /// Representation item → (styled-item line, style assignment).
    pub(crate) styled_items: PairRelMap,
    /// Root object → (rel-associates line, material select).
    pub(crate) rel_materials: PairRelMap,
    /// Material → (definition-representation line, representation).
    pub(crate) material_definitions: PairRelMap,

    /// Multiplier converting the file's length unit to metres.
    pub(crate) linear_scaling_factor: f64,
}

impl ModelIndex {
    pub(crate) fn new() -> Self {
        Self {
            lines: Vec::new(),
            express_to_line: FxHashMap::default(),
            type_to_lines: FxHashMap::default(),
            rel_voids: RelMap::default(),
            rel_aggregates: RelMap::default(),
            styled_items: PairRelMap::default(),
            rel_materials: PairRelMap::default(),
            material_definitions: PairRelMap::default(),
            linear_scaling_factor: 1.0,
        }
    }

    /// Append a line and wire up both secondary indices.
    pub(crate) fn insert_line(&mut self, mut line: IfcLine) -> u32 {
        let line_index = self.lines.len() as u32;
        line.line_index = line_index;
        self.express_to_line.insert(line.express_id, line_index);
        self.type_to_lines
            .entry(line.ifc_type)
            .or_default()
            .push(line_index);
        self.lines.push(line);
        line_index
    }

    #[inline]
    pub(crate) fn line(&self, line_index: u32) -> Option<IfcLine> {
        self.lines.get(line_index as usize).copied()
    }

    #[inline]
    pub(crate) fn line_of_express_id(&self, express_id: u32) -> Option<IfcLine> {
        let index = *self.express_to_line.get(&express_id)?;
        self.line(index)
    }
}

impl Default for ModelIndex {
    fn default() -> Self {
        Self::new()
    }
}
