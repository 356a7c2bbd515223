// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Tape Loader
//!
//! Core of an IFC (ISO-10303-21 "STEP") file loader: a streaming lexer
//! re-encodes the text onto a compact binary [`Tape`], a single parse pass
//! indexes every entity line, and post-index passes expose the
//! building-model relations downstream geometry and query code need.
//!
//! ## Overview
//!
//! - **Tokenizer → tape**: STEP text becomes typed binary tokens on a
//!   chunked append-only buffer with stable offsets.
//! - **Line index**: express id ↔ line and type → lines maps for O(1)
//!   random access into the tape.
//! - **Argument navigation**: a cursor protocol pulls typed arguments
//!   (refs, strings, reals, sets) out of arbitrary entity records without
//!   materializing them.
//! - **Relation maps**: voids, aggregates, styled items, material
//!   associations and material definitions, inverted for lookup by the
//!   entity geometry code starts from.
//! - **Reverse serializer**: reconstructs ISO-10303-21 text from the tape.
//!
//! ## Quick start
//!
//! ```rust
//! use ifc_tape::{schema, IfcLoader};
//!
//! let content = "\
//! ISO-10303-21;
//! HEADER; FILE_SCHEMA(('IFC2X3')); ENDSEC;
//! DATA;
//! #1=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
//! #2=IFCUNITASSIGNMENT((#1));
//! #3=IFCPROJECT('guid',$,$,$,$,$,$,$,#2);
//! ENDSEC; END-ISO-10303-21;
//! ";
//!
//! let mut loader = IfcLoader::new();
//! loader.load_file(content)?;
//!
//! assert_eq!(loader.num_lines(), 3);
//! assert_eq!(loader.linear_scaling_factor(), 1e-3);
//! assert_eq!(loader.express_ids_with_type(schema::IFCPROJECT), vec![3]);
//! # Ok::<(), ifc_tape::Error>(())
//! ```
//!
//! The schema catalogue is deliberately external: the loader ships the
//! entity-type registrations it needs itself (see [`schema`]) and callers
//! register the rest through [`IfcLoader::type_table_mut`].
//!
//! ## Feature flags
//!
//! - `serde`: serialization support for [`LoaderSettings`]

pub mod error;
pub mod loader;
pub mod meta;
pub mod parser;
pub mod schema;
mod serializer;
pub mod tape;
pub mod token;
pub mod tokenizer;
pub mod units;

pub use error::{Error, Result};
pub use loader::{IfcLoader, LoaderSettings};
pub use meta::{IfcLine, PairRelMap, RelMap};
pub use schema::TypeTable;
pub use tape::Tape;
pub use token::TokenKind;
pub use tokenizer::Tokenizer;
pub use units::si_prefix_multiplier;
