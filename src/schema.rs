// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity-type codes and the name/code registry.
//!
//! The loader treats the IFC schema catalogue as an opaque table of
//! `(name ↔ type-code)` pairs. The crate registers the types the loader
//! itself consults plus the common IFC2X3/IFC4 names; callers feed a full
//! catalogue through [`TypeTable::register`] before loading when they need
//! type-indexed queries over the rest of the schema.

use rustc_hash::FxHashMap;

/// Type code recorded for labels absent from the table.
pub const UNREGISTERED: u32 = 0;

macro_rules! ifc_types {
    ($($name:ident = $code:literal),* $(,)?) => {
        $(pub const $name: u32 = $code;)*

        const BUILTIN: &[(&str, u32)] = &[
            $((stringify!($name), $code),)*
        ];
    };
}

ifc_types! {
    // Consulted by the loader's post-index passes.
    IFCPROJECT = 1,
    IFCSIUNIT = 2,
    IFCUNITASSIGNMENT = 3,
    IFCRELVOIDSELEMENT = 4,
    IFCRELAGGREGATES = 5,
    IFCSTYLEDITEM = 6,
    IFCRELASSOCIATESMATERIAL = 7,
    IFCMATERIALDEFINITIONREPRESENTATION = 8,

    // Spatial structure
    IFCSITE = 20,
    IFCBUILDING = 21,
    IFCBUILDINGSTOREY = 22,
    IFCSPACE = 23,

    // Building elements
    IFCWALL = 30,
    IFCWALLSTANDARDCASE = 31,
    IFCSLAB = 32,
    IFCBEAM = 33,
    IFCCOLUMN = 34,
    IFCROOF = 35,
    IFCSTAIR = 36,
    IFCRAILING = 37,
    IFCCURTAINWALL = 38,
    IFCPLATE = 39,
    IFCMEMBER = 40,
    IFCDOOR = 41,
    IFCWINDOW = 42,
    IFCOPENINGELEMENT = 43,
    IFCFURNISHINGELEMENT = 44,

    // Relationships
    IFCRELCONTAINEDINSPATIALSTRUCTURE = 60,
    IFCRELDEFINESBYPROPERTIES = 61,
    IFCRELFILLSELEMENT = 62,

    // Properties
    IFCPROPERTYSET = 70,
    IFCPROPERTYSINGLEVALUE = 71,
    IFCELEMENTQUANTITY = 72,

    // Materials and styles
    IFCMATERIAL = 80,
    IFCMATERIALLAYER = 81,
    IFCMATERIALLAYERSET = 82,
    IFCMATERIALLAYERSETUSAGE = 83,
    IFCPRESENTATIONSTYLEASSIGNMENT = 84,
    IFCSURFACESTYLE = 85,
    IFCSTYLEDREPRESENTATION = 86,

    // Geometry carriers
    IFCSHAPEREPRESENTATION = 100,
    IFCPRODUCTDEFINITIONSHAPE = 101,
    IFCEXTRUDEDAREASOLID = 102,
    IFCAXIS2PLACEMENT2D = 103,
    IFCAXIS2PLACEMENT3D = 104,
    IFCLOCALPLACEMENT = 105,
    IFCCARTESIANPOINT = 106,
    IFCDIRECTION = 107,
    IFCPOLYLINE = 108,

    // Units
    IFCCONVERSIONBASEDUNIT = 120,
    IFCMEASUREWITHUNIT = 121,
    IFCDIMENSIONALEXPONENTS = 122,

    // Ownership
    IFCOWNERHISTORY = 130,
    IFCPERSON = 131,
    IFCORGANIZATION = 132,
    IFCAPPLICATION = 133,
}

/// Registry mapping entity type names to numeric codes and back.
#[derive(Debug, Clone)]
pub struct TypeTable {
    by_name: FxHashMap<String, u32>,
    by_code: FxHashMap<u32, String>,
}

impl TypeTable {
    /// Empty table, for callers supplying their own catalogue.
    pub fn empty() -> Self {
        Self {
            by_name: FxHashMap::default(),
            by_code: FxHashMap::default(),
        }
    }

    /// Table pre-populated with the built-in registrations.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for &(name, code) in BUILTIN {
            table.register(name, code);
        }
        table
    }

    /// Register a type name. Later registrations win on collision.
    pub fn register(&mut self, name: &str, code: u32) {
        self.by_name.insert(name.to_owned(), code);
        self.by_code.insert(code, name.to_owned());
    }

    /// Numeric code for a type name.
    #[inline]
    pub fn code_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Type name for a numeric code.
    #[inline]
    pub fn name_of(&self, code: u32) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookups() {
        let table = TypeTable::builtin();
        assert_eq!(table.code_of("IFCPROJECT"), Some(IFCPROJECT));
        assert_eq!(table.code_of("IFCSIUNIT"), Some(IFCSIUNIT));
        assert_eq!(table.name_of(IFCRELVOIDSELEMENT), Some("IFCRELVOIDSELEMENT"));
        assert_eq!(table.code_of("IFCNOTATHING"), None);
    }

    #[test]
    fn test_register_extends_table() {
        let mut table = TypeTable::builtin();
        table.register("IFCTRIANGULATEDFACESET", 4001);
        assert_eq!(table.code_of("IFCTRIANGULATEDFACESET"), Some(4001));
        assert_eq!(table.name_of(4001), Some("IFCTRIANGULATEDFACESET"));
    }
}
