//! Canonical registry of Madrid's 21 administrative districts.
//!
//! Every data source in this crate identifies districts differently: some use
//! two-digit codes ("01".."21"), some use canonical names, some use free-text
//! variants with inconsistent accents, casing or hyphenation. The
//! [`DistrictRegistry`] is the single place where all of those are reconciled.
//! Resolution is strict: an identifier that does not match any known district
//! fails with [`UnknownDistrictError`] rather than guessing.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Official district code/name pairs, as published by the Ayuntamiento de Madrid.
const DISTRICT_TABLE: [(u8, &str); 21] = [
    (1, "Centro"),
    (2, "Arganzuela"),
    (3, "Retiro"),
    (4, "Salamanca"),
    (5, "Chamartín"),
    (6, "Tetuán"),
    (7, "Chamberí"),
    (8, "Fuencarral-El Pardo"),
    (9, "Moncloa-Aravaca"),
    (10, "Latina"),
    (11, "Carabanchel"),
    (12, "Usera"),
    (13, "Puente de Vallecas"),
    (14, "Moratalaz"),
    (15, "Ciudad Lineal"),
    (16, "Hortaleza"),
    (17, "Villaverde"),
    (18, "Villa de Vallecas"),
    (19, "Vicálvaro"),
    (20, "San Blas-Canillejas"),
    (21, "Barajas"),
];

/// Raised when a district identifier cannot be resolved against the 21
/// canonical districts. Resolution never falls back to a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown Madrid district '{identifier}'")]
pub struct UnknownDistrictError {
    /// The identifier as it was passed in, before normalization.
    pub identifier: String,
}

impl UnknownDistrictError {
    pub(crate) fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// One of Madrid's 21 administrative districts.
///
/// Immutable reference entity: a numeric code in `1..=21` paired with its
/// canonical name. Obtained from a [`DistrictRegistry`], never constructed
/// directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct District {
    code: u8,
    name: &'static str,
}

impl District {
    /// Numeric district code (1 through 21).
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Two-digit zero-padded code string ("01" through "21"), the form used
    /// as merge key in feature tables.
    pub fn code_str(&self) -> String {
        format!("{:02}", self.code)
    }

    /// Canonical district name, e.g. "Puente de Vallecas".
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02} {}", self.code, self.name)
    }
}

/// Canonical mapping between district names and numeric codes.
///
/// Built once at process start and shared read-only afterwards; it carries no
/// mutable state and needs no locking.
///
/// # Examples
///
/// ```
/// use distrito::DistrictRegistry;
///
/// let registry = DistrictRegistry::new();
///
/// // Accent- and case-insensitive name resolution.
/// let chamberi = registry.resolve("chamberi").unwrap();
/// assert_eq!(chamberi.code(), 7);
/// assert_eq!(chamberi.name(), "Chamberí");
///
/// // Numeric codes resolve too, padded or not.
/// assert_eq!(registry.resolve("04").unwrap().name(), "Salamanca");
/// assert_eq!(registry.resolve("4").unwrap().name(), "Salamanca");
///
/// // Unknown input fails loudly.
/// assert!(registry.resolve("Atlantis").is_err());
/// ```
pub struct DistrictRegistry {
    districts: Vec<District>,
    by_key: HashMap<String, u8>,
}

impl DistrictRegistry {
    /// Builds the registry from the official district table.
    pub fn new() -> Self {
        let districts: Vec<District> = DISTRICT_TABLE
            .iter()
            .map(|&(code, name)| District { code, name })
            .collect();

        let mut by_key = HashMap::new();
        for district in &districts {
            by_key.insert(normalize_identifier(district.name), district.code);
        }

        Self { districts, by_key }
    }

    /// All 21 districts in code order.
    pub fn all(&self) -> &[District] {
        &self.districts
    }

    /// Resolves a free-text district identifier to a [`District`].
    ///
    /// The identifier is diacritic-stripped, case-folded and
    /// whitespace-collapsed before an exact match against canonical names and
    /// numeric codes. There is no fuzzy or partial matching: ambiguous input
    /// fails with [`UnknownDistrictError`].
    pub fn resolve(&self, identifier: &str) -> Result<District, UnknownDistrictError> {
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Err(UnknownDistrictError::new(identifier));
        }

        // Numeric form: "1", "01", .. "21".
        if let Ok(code) = key.parse::<u8>() {
            return self.by_code(code).map_err(|_| UnknownDistrictError::new(identifier));
        }

        self.by_key
            .get(&key)
            .map(|&code| self.districts[code as usize - 1])
            .ok_or_else(|| UnknownDistrictError::new(identifier))
    }

    /// Looks up a district by numeric code.
    pub fn by_code(&self, code: u8) -> Result<District, UnknownDistrictError> {
        if (1..=21).contains(&code) {
            Ok(self.districts[code as usize - 1])
        } else {
            Err(UnknownDistrictError::new(code.to_string()))
        }
    }

    /// Canonical name for a numeric code.
    pub fn canonical_name(&self, code: u8) -> Result<&'static str, UnknownDistrictError> {
        self.by_code(code).map(|d| d.name)
    }

    /// Numeric code for a (possibly free-text) district name.
    pub fn code(&self, name: &str) -> Result<u8, UnknownDistrictError> {
        self.resolve(name).map(|d| d.code)
    }
}

impl Default for DistrictRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes a district identifier for lookup: strips diacritics, lowercases,
/// maps hyphens to spaces and collapses runs of whitespace.
fn normalize_identifier(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut last_was_space = true;
    for c in identifier.chars() {
        for lower in c.to_lowercase() {
            let folded = fold_diacritic(lower);
            if folded == ' ' {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(folded);
                last_was_space = false;
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Folds the Spanish diacritics that occur in district names. Hyphens count as
/// word separators so "Fuencarral-El Pardo" and "fuencarral el pardo" collide.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        '-' | '_' | '\t' => ' ',
        other if other.is_whitespace() => ' ',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_idempotent_over_all_districts() {
        let registry = DistrictRegistry::new();
        for code in 1..=21u8 {
            let name = registry.canonical_name(code).unwrap();
            let district = registry.resolve(name).unwrap();
            assert_eq!(district.code(), code);
            assert_eq!(district.name(), name);
        }
    }

    #[test]
    fn resolve_accepts_numeric_codes() {
        let registry = DistrictRegistry::new();
        assert_eq!(registry.resolve("01").unwrap().name(), "Centro");
        assert_eq!(registry.resolve("1").unwrap().name(), "Centro");
        assert_eq!(registry.resolve("21").unwrap().name(), "Barajas");
    }

    #[test]
    fn resolve_is_accent_and_case_insensitive() {
        let registry = DistrictRegistry::new();
        assert_eq!(registry.resolve("chamberi").unwrap().code(), 7);
        assert_eq!(registry.resolve("CHAMARTÍN").unwrap().code(), 5);
        assert_eq!(registry.resolve("vicalvaro").unwrap().code(), 19);
        assert_eq!(registry.resolve("  tetuan ").unwrap().code(), 6);
    }

    #[test]
    fn resolve_accepts_hyphen_and_space_variants() {
        let registry = DistrictRegistry::new();
        assert_eq!(registry.resolve("Fuencarral-El Pardo").unwrap().code(), 8);
        assert_eq!(registry.resolve("fuencarral el pardo").unwrap().code(), 8);
        assert_eq!(registry.resolve("san blas canillejas").unwrap().code(), 20);
        assert_eq!(registry.resolve("Moncloa Aravaca").unwrap().code(), 9);
    }

    #[test]
    fn unknown_identifiers_fail_loudly() {
        let registry = DistrictRegistry::new();
        for bad in ["", "Atlantis", "22", "0", "Centr", "Salamanca Norte"] {
            let err = registry.resolve(bad).unwrap_err();
            assert_eq!(err.identifier, bad);
        }
    }

    #[test]
    fn code_and_name_lookups_are_inverse() {
        let registry = DistrictRegistry::new();
        for district in registry.all() {
            assert_eq!(registry.code(district.name()).unwrap(), district.code());
            assert_eq!(
                registry.canonical_name(district.code()).unwrap(),
                district.name()
            );
        }
    }

    #[test]
    fn code_str_is_zero_padded() {
        let registry = DistrictRegistry::new();
        assert_eq!(registry.by_code(1).unwrap().code_str(), "01");
        assert_eq!(registry.by_code(13).unwrap().code_str(), "13");
    }
}
