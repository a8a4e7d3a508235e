//! OpenType feature and variation tag names.
//!
//! Tags are four ASCII bytes packed big-endian into a `u32`. The readable
//! names come from a process-wide table built on first use and never
//! modified afterwards.

use std::sync::LazyLock;

use verso_core::alloc::HashMap;

const CUSTOM_PREFIX: &str = "custom_";

const NAMED_TAGS: &[(&str, &[u8; 4])] = &[
    ("access_all_alternates", b"aalt"),
    ("alternative_fractions", b"afrc"),
    ("capital_spacing", b"cpsp"),
    ("case_sensitive_forms", b"case"),
    ("character_variant_01", b"cv01"),
    ("character_variant_02", b"cv02"),
    ("character_variant_03", b"cv03"),
    ("character_variant_04", b"cv04"),
    ("character_variant_05", b"cv05"),
    ("contextual_alternates", b"calt"),
    ("contextual_ligatures", b"clig"),
    ("contextual_swash", b"cswh"),
    ("denominators", b"dnom"),
    ("discretionary_ligatures", b"dlig"),
    ("fractions", b"frac"),
    ("full_widths", b"fwid"),
    ("half_widths", b"hwid"),
    ("historical_forms", b"hist"),
    ("historical_ligatures", b"hlig"),
    ("kerning", b"kern"),
    ("lining_figures", b"lnum"),
    ("localized_forms", b"locl"),
    ("mark_positioning", b"mark"),
    ("mark_to_mark_positioning", b"mkmk"),
    ("numerators", b"numr"),
    ("oldstyle_figures", b"onum"),
    ("ordinals", b"ordn"),
    ("ornaments", b"ornm"),
    ("petite_capitals", b"pcap"),
    ("proportional_figures", b"pnum"),
    ("proportional_widths", b"pwid"),
    ("scientific_inferiors", b"sinf"),
    ("slashed_zero", b"zero"),
    ("small_capitals", b"smcp"),
    ("small_capitals_from_capitals", b"c2sc"),
    ("standard_ligatures", b"liga"),
    ("stylistic_alternates", b"salt"),
    ("stylistic_set_01", b"ss01"),
    ("stylistic_set_02", b"ss02"),
    ("stylistic_set_03", b"ss03"),
    ("stylistic_set_04", b"ss04"),
    ("stylistic_set_05", b"ss05"),
    ("stylistic_set_06", b"ss06"),
    ("stylistic_set_07", b"ss07"),
    ("stylistic_set_08", b"ss08"),
    ("stylistic_set_09", b"ss09"),
    ("stylistic_set_10", b"ss10"),
    ("subscript", b"subs"),
    ("superscript", b"sups"),
    ("swash", b"swsh"),
    ("tabular_figures", b"tnum"),
    ("titling", b"titl"),
    ("unicase", b"unic"),
    ("vertical_alternates", b"valt"),
    ("vertical_writing", b"vert"),
    ("italic", b"ital"),
    ("optical_size", b"opsz"),
    ("slant", b"slnt"),
    ("weight", b"wght"),
    ("width", b"wdth"),
];

struct TagRegistry {
    by_name: HashMap<&'static str, u32>,
    by_tag: HashMap<u32, &'static str>,
}

static REGISTRY: LazyLock<TagRegistry> = LazyLock::new(|| {
    let mut by_name = HashMap::with_capacity(NAMED_TAGS.len());
    let mut by_tag = HashMap::with_capacity(NAMED_TAGS.len());
    for &(name, tag) in NAMED_TAGS {
        let tag = u32::from_be_bytes(*tag);
        by_name.insert(name, tag);
        by_tag.insert(tag, name);
    }
    TagRegistry { by_name, by_tag }
});

/// Packs up to four ASCII characters into a tag, padding with spaces.
///
/// Returns `None` for empty, longer or non-ASCII input.
pub fn pack_tag(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 4 || !text.is_ascii() {
        return None;
    }
    let mut bytes = [b' '; 4];
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    Some(u32::from_be_bytes(bytes))
}

pub fn unpack_tag(tag: u32) -> String {
    tag.to_be_bytes().iter().map(|&b| b as char).collect()
}

/// Resolves a readable feature name to its tag, 0 when the name is unusable.
///
/// Known names map through the registry. Anything else is treated as a raw
/// tag, optionally prefixed with `custom_`.
pub fn name_to_tag(name: &str) -> u32 {
    if let Some(&tag) = REGISTRY.by_name.get(name) {
        return tag;
    }
    let raw = name.strip_prefix(CUSTOM_PREFIX).unwrap_or(name);
    pack_tag(raw).unwrap_or(0)
}

pub fn tag_to_name(tag: u32) -> String {
    match REGISTRY.by_tag.get(&tag) {
        Some(name) => (*name).to_string(),
        None => format!("{}{}", CUSTOM_PREFIX, unpack_tag(tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_round_trip() {
        let tag = name_to_tag("standard_ligatures");
        assert_eq!(tag, u32::from_be_bytes(*b"liga"));
        assert_eq!(tag_to_name(tag), "standard_ligatures");
        assert_eq!(tag_to_name(name_to_tag("weight")), "weight");
    }

    #[test]
    fn test_unknown_tags_use_custom_prefix() {
        let tag = name_to_tag("custom_abcd");
        assert_eq!(tag, u32::from_be_bytes(*b"abcd"));
        assert_eq!(tag_to_name(tag), "custom_abcd");
        assert_eq!(name_to_tag("xyz"), u32::from_be_bytes(*b"xyz "));
    }

    #[test]
    fn test_unusable_names() {
        assert_eq!(name_to_tag(""), 0);
        assert_eq!(name_to_tag("much_too_long_for_a_tag"), 0);
        assert_eq!(name_to_tag("custom_ü"), 0);
    }

    #[test]
    fn test_table_has_no_duplicate_tags() {
        assert_eq!(REGISTRY.by_tag.len(), NAMED_TAGS.len());
        assert_eq!(REGISTRY.by_name.len(), NAMED_TAGS.len());
    }
}
