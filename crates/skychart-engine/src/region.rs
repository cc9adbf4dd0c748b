//! Region (constellation) id normalization.
//!
//! Catalog, boundary and line files spell constellations in several ways:
//! upper-case IAU codes (`UMA`), Stellarium ids (`CON modern UMa`),
//! numbered parts of split constellations (`SER1`, `SER2`) and full Latin
//! names. Every index in the engine is keyed by the canonical mixed-case
//! abbreviation returned from [`normalize_region_id`].

use std::fmt;

use serde::Serialize;

/// Canonical IAU constellation abbreviation.
///
/// Only constructible through [`normalize_region_id`], so holding one
/// proves the name was normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RegionId(&'static str);

impl RegionId {
    /// The canonical abbreviation, e.g. `"CMa"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// The full Latin name, e.g. `"Canis Major"`.
    #[must_use]
    pub fn latin_name(self) -> &'static str {
        REGIONS
            .iter()
            .find(|(abbr, _)| *abbr == self.0)
            .map_or(self.0, |(_, name)| name)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The 88 IAU constellations: canonical abbreviation and Latin name.
static REGIONS: [(&str, &str); 88] = [
    ("And", "Andromeda"),
    ("Ant", "Antlia"),
    ("Aps", "Apus"),
    ("Aql", "Aquila"),
    ("Aqr", "Aquarius"),
    ("Ara", "Ara"),
    ("Ari", "Aries"),
    ("Aur", "Auriga"),
    ("Boo", "Bootes"),
    ("Cae", "Caelum"),
    ("Cam", "Camelopardalis"),
    ("Cap", "Capricornus"),
    ("Car", "Carina"),
    ("Cas", "Cassiopeia"),
    ("Cen", "Centaurus"),
    ("Cep", "Cepheus"),
    ("Cet", "Cetus"),
    ("Cha", "Chamaeleon"),
    ("Cir", "Circinus"),
    ("CMa", "Canis Major"),
    ("CMi", "Canis Minor"),
    ("Cnc", "Cancer"),
    ("Col", "Columba"),
    ("Com", "Coma Berenices"),
    ("CrA", "Corona Australis"),
    ("CrB", "Corona Borealis"),
    ("Crt", "Crater"),
    ("Cru", "Crux"),
    ("Crv", "Corvus"),
    ("CVn", "Canes Venatici"),
    ("Cyg", "Cygnus"),
    ("Del", "Delphinus"),
    ("Dor", "Dorado"),
    ("Dra", "Draco"),
    ("Equ", "Equuleus"),
    ("Eri", "Eridanus"),
    ("For", "Fornax"),
    ("Gem", "Gemini"),
    ("Gru", "Grus"),
    ("Her", "Hercules"),
    ("Hor", "Horologium"),
    ("Hya", "Hydra"),
    ("Hyi", "Hydrus"),
    ("Ind", "Indus"),
    ("Lac", "Lacerta"),
    ("Leo", "Leo"),
    ("Lep", "Lepus"),
    ("Lib", "Libra"),
    ("LMi", "Leo Minor"),
    ("Lup", "Lupus"),
    ("Lyn", "Lynx"),
    ("Lyr", "Lyra"),
    ("Men", "Mensa"),
    ("Mic", "Microscopium"),
    ("Mon", "Monoceros"),
    ("Mus", "Musca"),
    ("Nor", "Norma"),
    ("Oct", "Octans"),
    ("Oph", "Ophiuchus"),
    ("Ori", "Orion"),
    ("Pav", "Pavo"),
    ("Peg", "Pegasus"),
    ("Per", "Perseus"),
    ("Phe", "Phoenix"),
    ("Pic", "Pictor"),
    ("PsA", "Piscis Austrinus"),
    ("Psc", "Pisces"),
    ("Pup", "Puppis"),
    ("Pyx", "Pyxis"),
    ("Ret", "Reticulum"),
    ("Scl", "Sculptor"),
    ("Sco", "Scorpius"),
    ("Sct", "Scutum"),
    ("Ser", "Serpens"),
    ("Sex", "Sextans"),
    ("Sge", "Sagitta"),
    ("Sgr", "Sagittarius"),
    ("Tau", "Taurus"),
    ("Tel", "Telescopium"),
    ("Tri", "Triangulum"),
    ("TrA", "Triangulum Australe"),
    ("Tuc", "Tucana"),
    ("UMa", "Ursa Major"),
    ("UMi", "Ursa Minor"),
    ("Vel", "Vela"),
    ("Vir", "Virgo"),
    ("Vol", "Volans"),
    ("Vul", "Vulpecula"),
];

/// Historical names that do not follow the abbreviation or Latin-name rules.
static ALIASES: [(&str, &str); 4] = [
    ("serpenscaput", "Ser"),
    ("serpenscauda", "Ser"),
    ("bootis", "Boo"),
    ("scorpio", "Sco"),
];

/// Normalize a raw region key to its canonical id.
///
/// Returns `None` when the key names no known constellation; callers must
/// not index anything under such a key.
///
/// # Examples
///
/// ```
/// use skychart_engine::region::normalize_region_id;
///
/// assert_eq!(normalize_region_id("UMA").unwrap().as_str(), "UMa");
/// assert_eq!(normalize_region_id("SER2").unwrap().as_str(), "Ser");
/// assert_eq!(normalize_region_id("CON modern CrB").unwrap().as_str(), "CrB");
/// assert_eq!(normalize_region_id("Canis Major").unwrap().as_str(), "CMa");
/// assert!(normalize_region_id("XYZ").is_none());
/// ```
#[must_use]
pub fn normalize_region_id(raw: &str) -> Option<RegionId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Stellarium ids look like "CON <skyculture> <abbr>".
    let token = if trimmed
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("CON "))
    {
        trimmed.split_whitespace().last().unwrap_or(trimmed)
    } else {
        trimmed
    };

    let stem = token.trim_end_matches(|c: char| c.is_ascii_digit() || matches!(c, '_' | '-' | ' '));

    if let Some(id) = lookup_abbreviation(stem) {
        return Some(id);
    }

    let folded: String = stem
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();

    REGIONS
        .iter()
        .find(|(_, name)| {
            name.chars()
                .filter(|c| *c != ' ')
                .flat_map(char::to_lowercase)
                .eq(folded.chars())
        })
        .map(|(abbr, _)| RegionId(abbr))
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == folded)
                .map(|(_, abbr)| RegionId(abbr))
        })
}

fn lookup_abbreviation(stem: &str) -> Option<RegionId> {
    if stem.len() != 3 {
        return None;
    }
    REGIONS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(stem))
        .map(|(abbr, _)| RegionId(abbr))
}

/// Every canonical region id, in table order.
#[cfg(test)]
fn all_regions() -> impl Iterator<Item = RegionId> {
    REGIONS.iter().map(|(abbr, _)| RegionId(abbr))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(raw: &str) -> Option<&'static str> {
        normalize_region_id(raw).map(RegionId::as_str)
    }

    #[test]
    fn table_has_eighty_eight_unique_abbreviations() {
        let mut abbrs: Vec<String> = REGIONS
            .iter()
            .map(|(a, _)| a.to_ascii_uppercase())
            .collect();
        abbrs.sort();
        abbrs.dedup();
        assert_eq!(abbrs.len(), 88);
        assert_eq!(all_regions().count(), 88);
    }

    #[test]
    fn upper_case_codes_map_to_mixed_case() {
        assert_eq!(id("CMA"), Some("CMa"));
        assert_eq!(id("cvn"), Some("CVn"));
        assert_eq!(id("TRA"), Some("TrA"));
        assert_eq!(id("Tri"), Some("Tri"));
    }

    #[test]
    fn numeric_suffixes_collapse() {
        assert_eq!(id("SER1"), Some("Ser"));
        assert_eq!(id("Ser2"), Some("Ser"));
        assert_eq!(id("ser_2"), Some("Ser"));
    }

    #[test]
    fn stellarium_ids() {
        assert_eq!(id("CON modern Mic"), Some("Mic"));
        assert_eq!(id("CON modern_st UMI"), Some("UMi"));
    }

    #[test]
    fn latin_names_and_aliases() {
        assert_eq!(id("Ursa Major"), Some("UMa"));
        assert_eq!(id("ursa_minor"), Some("UMi"));
        assert_eq!(id("CANIS MAJOR"), Some("CMa"));
        assert_eq!(id("Serpens Caput"), Some("Ser"));
        assert_eq!(id("Scorpio"), Some("Sco"));
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(id("  Ori \n"), Some("Ori"));
    }

    #[test]
    fn unknown_keys_return_none() {
        assert_eq!(id(""), None);
        assert_eq!(id("   "), None);
        assert_eq!(id("Orio"), None);
        assert_eq!(id("XX1"), None);
        assert_eq!(id("123"), None);
    }

    #[test]
    fn latin_name_lookup() {
        assert_eq!(normalize_region_id("cma").unwrap().latin_name(), "Canis Major");
        assert_eq!(normalize_region_id("Ori").unwrap().to_string(), "Ori");
    }

    #[test]
    fn ids_order_by_abbreviation() {
        let a = normalize_region_id("And").unwrap();
        let b = normalize_region_id("Ori").unwrap();
        assert!(a < b);
    }
}
