//! Turns loose province text into canonical names.
//!
//! Two entry points share the alias table: `normalize` for text a user typed, and
//! `derive_from_address` for the free-form address attached to a sensor. Derivation is
//! an ordered cascade of independent strategies; the first one producing a non-generic
//! name wins. Nothing here fails: unknown text passes through trimmed, and an address
//! with no usable province yields an empty string.

use super::aliases::{aliases_of, find_entry, CAPITAL, LAOS};
use std::collections::BTreeMap;

/// Decorations stripped from the front of a province name.
const PREFIXES: &[&str] = &["จังหวัด", "จ."];

/// Decorations stripped from the end of a province name (ASCII ones case-insensitively).
const SUFFIXES: &[&str] = &["จังหวัด", "province"];

/// Markers after which an address usually names its province, checked in this order.
const PROVINCE_MARKERS: &[&str] = &["จ.", "จังหวัด"];

/// Address segment delimiters.
const DELIMITERS: &[char] = &[',', ';', '|', '/', '\\'];

/// Words that look like place names but never identify a province.
const GENERIC_WORDS: &[&str] = &[
    "thailand",
    "ประเทศไทย",
    "ประเทศ",
    "amphoe",
    "district",
    "province",
    "city",
    "tambon",
    "ตำบล",
    "อำเภอ",
    "เขต",
    "เมือง",
    "mueang",
    "muang",
    "unknown",
    "central",
    "region",
];

/// Normalizes free text into a canonical province name, or returns it trimmed.
///
/// Drops anything after the first `(` or `,`, strips the prefix/suffix decorations until
/// none remain, then looks the rest up against every canonical name and alias.
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let head = text.split('(').next().unwrap_or_default();
    let head = head.split(',').next().unwrap_or_default();
    canonicalize(strip_decorations(head))
}

/// Maps a bare name onto its canonical form when the alias table knows it.
pub fn canonicalize(name: &str) -> String {
    let trimmed = name.trim();
    match find_entry(trimmed) {
        Some(entry) => entry.canonical.to_string(),
        None => trimmed.to_string(),
    }
}

fn strip_decorations(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let before = current;
        for prefix in PREFIXES {
            if let Some(rest) = current.strip_prefix(prefix) {
                current = rest.trim_start();
            }
        }
        for suffix in SUFFIXES {
            if let Some(rest) = strip_suffix_ignore_ascii_case(current, suffix) {
                current = rest.trim_end();
            }
        }
        if current == before {
            return current;
        }
    }
}

fn strip_suffix_ignore_ascii_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(cut) {
        return None;
    }
    let (rest, tail) = text.split_at(cut);
    tail.eq_ignore_ascii_case(suffix).then_some(rest)
}

/// True for empty text and for words such as "district" or "อำเภอ".
pub fn is_generic_word(word: &str) -> bool {
    let w = word.trim().to_lowercase();
    w.is_empty() || GENERIC_WORDS.contains(&w.as_str())
}

/// Normalizes `candidate` and keeps it only if it names something specific.
fn accept(candidate: &str) -> Option<String> {
    let normalized = normalize(candidate);
    (!is_generic_word(&normalized)).then_some(normalized)
}

type Strategy = fn(&str) -> Option<String>;

/// Derivation strategies in priority order.
const STRATEGIES: [Strategy; 5] = [
    capital_city,
    foreign_country,
    after_province_marker,
    delimited_segments,
    whole_address,
];

/// Derives a province from a raw sensor address, or `""` when nothing usable is found.
///
/// Callers treat `""` as unattributable and leave the row out of per-province charts.
pub fn derive_from_address(address: &str) -> String {
    let addr = address.trim();
    if addr.is_empty() {
        return String::new();
    }
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(addr))
        .unwrap_or_default()
}

/// The capital is recognized anywhere in the address by its native or English name.
fn capital_city(addr: &str) -> Option<String> {
    let lower = addr.to_lowercase();
    (addr.contains(CAPITAL) || lower.contains("bangkok") || lower.contains("krung thep"))
        .then(|| CAPITAL.to_string())
}

/// Readings from across the Lao border: Lao script, or a standalone "lao"/"laos" word.
fn foreign_country(addr: &str) -> Option<String> {
    let lao_script = addr.chars().any(|c| ('\u{0E80}'..='\u{0EFF}').contains(&c));
    let lao_word = addr
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == "lao" || w == "laos");
    (lao_script || lao_word).then(|| LAOS.to_string())
}

/// Text after the last "จ." (then "จังหวัด") marker.
///
/// A known province as the first word after the marker wins over the raw remainder, so
/// "จังหวัดเชียงใหม่ อำเภอเมือง" resolves to the province rather than the whole tail.
fn after_province_marker(addr: &str) -> Option<String> {
    PROVINCE_MARKERS.iter().find_map(|marker| {
        let idx = addr.rfind(marker)?;
        let tail = &addr[idx + marker.len()..];
        let head = tail.split(',').next().unwrap_or_default();
        head.split_whitespace()
            .next()
            .and_then(find_entry)
            .map(|entry| entry.canonical.to_string())
            .or_else(|| accept(tail))
    })
}

/// Scans delimited segments from the last backward: whole segment, then its words last to first.
fn delimited_segments(addr: &str) -> Option<String> {
    addr.split(DELIMITERS)
        .rev()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .find_map(|segment| {
            accept(segment).or_else(|| segment.split_whitespace().rev().find_map(accept))
        })
}

fn whole_address(addr: &str) -> Option<String> {
    accept(addr)
}

/// Builds the de-duplicated `ILIKE` substring patterns for a user-supplied province filter.
///
/// Combines the raw input, its normalized and canonical forms and every alias of the
/// canonical entry. Duplicates are detected case-insensitively. LIKE metacharacters in
/// the input are escaped so they match literally.
pub fn match_filters(raw: &str) -> Vec<String> {
    let mut candidates: BTreeMap<String, String> = BTreeMap::new();
    let mut add = |text: &str| {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            candidates
                .entry(trimmed.to_lowercase())
                .or_insert_with(|| trimmed.to_string());
        }
    };

    add(raw);
    let normalized = normalize(raw);
    add(&normalized);
    let canonical = canonicalize(&normalized);
    if !canonical.is_empty() {
        add(&canonical);
        for alias in aliases_of(&canonical) {
            add(alias);
        }
    }

    candidates
        .values()
        .map(|value| format!("%{}%", escape_like(value)))
        .collect()
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// How closely an aggregated province name matches a user filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    Exact,
    Partial,
}

/// Aliases shorter than this only ever match exactly; "nan" must not claim "Nantes".
const MIN_CONTAINMENT_ALIAS_CHARS: usize = 4;

/// Lower-cased forms a name can be matched by, each flagged with whether substring
/// containment may be tried on it: the normalized name always, aliases only when long
/// enough.
fn match_forms(name: &str) -> Vec<(String, bool)> {
    let normalized = normalize(name);
    let mut forms = vec![(normalized.to_lowercase(), true)];
    forms.extend(aliases_of(&normalized).iter().map(|alias| {
        let long_enough = alias.chars().count() >= MIN_CONTAINMENT_ALIAS_CHARS;
        (alias.to_lowercase(), long_enough)
    }));
    forms
}

fn without_spaces(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compares an aggregated province name against a user filter.
///
/// Equal (with or without internal whitespace) is `Exact`; either side containing the
/// other, in either form, is `Partial`. Containment runs both ways so partial input
/// like "Chiang" still finds "Chiang Mai".
pub fn match_strength(candidate: &str, target: &str) -> Option<MatchStrength> {
    let target = normalize(target).to_lowercase();
    let target_ns = without_spaces(&target);
    if target_ns.is_empty() {
        return None;
    }

    let mut best = None;
    for (form, containment) in match_forms(candidate) {
        let form_ns = without_spaces(&form);
        if form_ns.is_empty() {
            continue;
        }
        if form == target || form_ns == target_ns {
            return Some(MatchStrength::Exact);
        }
        if containment
            && (form.contains(&target)
                || target.contains(&form)
                || form_ns.contains(&target_ns)
                || target_ns.contains(&form_ns))
        {
            best = Some(MatchStrength::Partial);
        }
    }
    best
}

/// Permissive province comparison used when picking one series out of an aggregate.
pub fn fuzzy_equals(candidate: &str, target: &str) -> bool {
    match_strength(candidate, target).is_some()
}

/// Province key used by the daily ranking: the last whitespace-delimited word of the
/// trimmed address.
///
/// Deliberately simpler than `derive_from_address`; it mirrors the store-side SQL
/// expression so in-memory and Postgres rankings agree.
pub fn last_word_province(address: &str) -> Option<&str> {
    address.split_whitespace().last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::province::aliases::PROVINCES;
    use rstest::rstest;

    #[rstest]
    #[case("จ. เชียงใหม่ (test)", "เชียงใหม่")]
    #[case("จังหวัดขอนแก่น", "ขอนแก่น")]
    #[case("Chiang Mai Province", "เชียงใหม่")]
    #[case("  chiangmai province, Thailand", "เชียงใหม่")]
    #[case("Bangkok", "กรุงเทพมหานคร")]
    #[case("ลำปางจังหวัด", "ลำปาง")]
    #[case("KORAT", "นครราชสีมา")]
    #[case("Atlantis (lost)", "Atlantis")]
    #[case("   ", "")]
    #[case("", "")]
    fn normalizes_free_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("จ.จ. Nan")]
    #[case("Foo Province Province")]
    #[case("จังหวัด")]
    #[case("Some Place (a), b")]
    #[case(" Phuket ")]
    #[case("จ.province")]
    fn normalize_is_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn aliases_normalize_to_their_canonical_name() {
        for entry in PROVINCES {
            assert_eq!(normalize(entry.canonical), entry.canonical);
            for alias in entry.aliases {
                assert_eq!(normalize(alias), entry.canonical, "alias {}", alias);
            }
        }
    }

    #[rstest]
    #[case("123 Rd, จ.เชียงใหม่", "เชียงใหม่")]
    #[case("45 Rd, Bangkok", "กรุงเทพมหานคร")]
    #[case("เขตปทุมวัน กรุงเทพมหานคร 10330", "กรุงเทพมหานคร")]
    #[case("Vientiane, Lao PDR", "Laos")]
    #[case("ບ້ານ ໂພນໄຊ", "Laos")]
    #[case("99 หมู่ 3 ต.สุเทพ อ.เมือง จ.เชียงใหม่ 50200", "เชียงใหม่")]
    #[case("จังหวัดลำพูน อำเภอเมือง", "ลำพูน")]
    #[case("Tambon Suthep, Mueang, Chiang Mai", "เชียงใหม่")]
    #[case("Nakhon Ratchasima / Korat", "นครราชสีมา")]
    #[case("Main street, Phuket", "ภูเก็ต")]
    #[case("Moo 5, Nan, Thailand", "น่าน")]
    fn derives_province_from_address(#[case] address: &str, #[case] expected: &str) {
        assert_eq!(derive_from_address(address), expected);
    }

    #[rstest]
    #[case("District, City, Region")]
    #[case("unknown")]
    #[case("  ")]
    #[case("อำเภอ, เมือง")]
    fn generic_only_addresses_derive_nothing(#[case] address: &str) {
        assert_eq!(derive_from_address(address), "");
    }

    #[test]
    fn laos_needs_a_whole_word() {
        // "Laokham" is a village name, not the country.
        assert_ne!(derive_from_address("Laokham, Nan"), "Laos");
        assert_eq!(derive_from_address("Laokham, Nan"), "น่าน");
    }

    #[test]
    fn unknown_trailing_segment_is_kept_verbatim() {
        assert_eq!(derive_from_address("12 Soi 4, Some Village"), "Some Village");
        // The whole segment is tried before its words.
        assert_eq!(derive_from_address("Main street Phuket"), "Main street Phuket");
    }

    #[test]
    fn match_filters_expands_aliases() {
        let patterns = match_filters("Chiang Mai");
        assert!(patterns.contains(&"%เชียงใหม่%".to_string()));
        assert!(patterns.contains(&"%chiangmai%".to_string()));
        // "Chiang Mai" and the alias "chiang mai" collapse into one pattern.
        let chiang_mai = patterns
            .iter()
            .filter(|p| p.to_lowercase() == "%chiang mai%")
            .count();
        assert_eq!(chiang_mai, 1);
        assert_eq!(patterns.len(), 3);
    }

    #[test]
    fn match_filters_passes_unknown_input_through() {
        assert_eq!(match_filters("  Atlantis "), vec!["%Atlantis%".to_string()]);
        assert!(match_filters("   ").is_empty());
    }

    #[test]
    fn match_filters_escapes_like_metacharacters() {
        assert_eq!(match_filters("50%_off"), vec![r"%50\%\_off%".to_string()]);
    }

    #[rstest]
    #[case("เชียงใหม่", "Chiang Mai", Some(MatchStrength::Exact))]
    #[case("เชียงใหม่", "chiangmai", Some(MatchStrength::Exact))]
    #[case("เชียงใหม่", "Chiang", Some(MatchStrength::Partial))]
    #[case("Chiang Mai", "Chiang", Some(MatchStrength::Partial))]
    #[case("Chiang", "Chiang Mai Town", Some(MatchStrength::Partial))]
    #[case("ChiangMai", "chiang mai", Some(MatchStrength::Exact))]
    #[case("เชียงราย", "Chiang Mai", None)]
    #[case("เชียงใหม่", "", None)]
    #[case("น่าน", "Nantes", None)]
    #[case("ตาก", "Takua Pa", None)]
    #[case("Laos", "Laos PDR office", Some(MatchStrength::Partial))]
    #[case("น่าน", "NAN", Some(MatchStrength::Exact))]
    fn fuzzy_matching(
        #[case] candidate: &str,
        #[case] target: &str,
        #[case] expected: Option<MatchStrength>,
    ) {
        assert_eq!(match_strength(candidate, target), expected);
        assert_eq!(fuzzy_equals(candidate, target), expected.is_some());
    }

    #[rstest]
    #[case("  123 Rd Chiang Mai  ", Some("Mai"))]
    #[case("เชียงใหม่", Some("เชียงใหม่"))]
    #[case("   ", None)]
    fn last_word_heuristic(#[case] address: &str, #[case] expected: Option<&str>) {
        assert_eq!(last_word_province(address), expected);
    }
}
