//! Static authorization table for gated downloads.
//!
//! A file absent from this table does not exist as far as the API is
//! concerned; callers get the same 404 whether the name is unknown or
//! simply not offered.

use crate::models::Tier;

const FILE_ACCESS: &[(&str, &[Tier])] = &[
    ("void-loop-guide.pdf", &[Tier::Free, Tier::Builder, Tier::Admin]),
    ("quickstart-checklist.pdf", &[Tier::Free, Tier::Builder, Tier::Admin]),
    ("templates-pack.zip", &[Tier::Builder, Tier::Admin]),
    ("prd-framework.pdf", &[Tier::Builder, Tier::Admin]),
    ("vision-brief-template.docx", &[Tier::Builder, Tier::Admin]),
    ("implementation-checklist.xlsx", &[Tier::Builder, Tier::Admin]),
    ("deep-dive-template.md", &[Tier::Builder, Tier::Admin]),
    ("admin-guide.pdf", &[Tier::Admin]),
    ("user-data-export.csv", &[Tier::Admin]),
];

/// Tiers allowed to fetch `file`, or `None` for an unknown file.
pub fn allowed_tiers(file: &str) -> Option<&'static [Tier]> {
    FILE_ACCESS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, tiers)| *tiers)
}

/// Lowest tier allowed to fetch `file`, used in upgrade prompts.
pub fn required_tier(file: &str) -> Option<Tier> {
    allowed_tiers(file).and_then(|tiers| tiers.iter().copied().min())
}

pub fn is_allowed(file: &str, tier: Tier) -> bool {
    allowed_tiers(file)
        .map(|tiers| tiers.contains(&tier))
        .unwrap_or(false)
}
