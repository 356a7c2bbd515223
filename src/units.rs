// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SI prefix handling for the linear-scaling-factor pass.

/// Multiplier for an IfcSIPrefix enum name. Empty or unknown prefixes map
/// to 1.0 (base metres).
#[inline]
pub fn si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "EXA" => 1e18,
        "PETA" => 1e15,
        "TERA" => 1e12,
        "GIGA" => 1e9,
        "MEGA" => 1e6,
        "KILO" => 1e3,
        "HECTO" => 1e2,
        "DECA" => 1e1,
        "DECI" => 1e-1,
        "CENTI" => 1e-2,
        "MILLI" => 1e-3,
        "MICRO" => 1e-6,
        "NANO" => 1e-9,
        "PICO" => 1e-12,
        "FEMTO" => 1e-15,
        "ATTO" => 1e-18,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_table_bit_exact() {
        let table = [
            ("", 1.0),
            ("EXA", 1e18),
            ("PETA", 1e15),
            ("TERA", 1e12),
            ("GIGA", 1e9),
            ("MEGA", 1e6),
            ("KILO", 1e3),
            ("HECTO", 1e2),
            ("DECA", 10.0),
            ("DECI", 1e-1),
            ("CENTI", 1e-2),
            ("MILLI", 1e-3),
            ("MICRO", 1e-6),
            ("NANO", 1e-9),
            ("PICO", 1e-12),
            ("FEMTO", 1e-15),
            ("ATTO", 1e-18),
        ];
        for (name, expected) in table {
            assert_eq!(si_prefix_multiplier(name), expected, "prefix {name:?}");
        }
    }

    #[test]
    fn test_unknown_prefix_is_identity() {
        assert_eq!(si_prefix_multiplier("PARSEC"), 1.0);
    }
}
