//! Progressive address-shortening for the free provider.
//!
//! Each step is a strictly coarser form of the same address:
//!
//! | Step | Example |
//! |------|---------|
//! | literal | `東京都渋谷区渋谷2-1-1 ABCビル3F` |
//! | without building | `東京都渋谷区渋谷2-1-1` |
//! | block level | `東京都渋谷区渋谷2` |
//! | municipality | `東京都渋谷区` |

use crate::address::{block_level, municipality_level, strip_building};

/// Produces one candidate query from the original address, if the step applies.
pub type CandidateFn = fn(&str) -> Option<String>;

fn literal(address: &str) -> Option<String> {
    Some(address.trim().to_string())
}

fn without_building(address: &str) -> Option<String> {
    Some(strip_building(address))
}

/// Ordered candidate generators, finest first.
pub const FALLBACK_CHAIN: [(&str, CandidateFn); 4] = [
    ("literal", literal),
    ("without-building", without_building),
    ("block", block_level),
    ("municipality", municipality_level),
];

/// Candidate queries for `address`, with empty and repeated candidates removed.
pub fn candidates(address: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(FALLBACK_CHAIN.len());
    for (_, step) in FALLBACK_CHAIN {
        if let Some(c) = step(address) {
            if !c.is_empty() && !out.contains(&c) {
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_chain_for_building_address() {
        assert_eq!(
            candidates("東京都渋谷区渋谷2-1-1 ABCビル3F"),
            vec![
                "東京都渋谷区渋谷2-1-1 ABCビル3F",
                "東京都渋谷区渋谷2-1-1",
                "東京都渋谷区渋谷2",
                "東京都渋谷区",
            ]
        );
    }

    #[test]
    fn grid_address_keeps_lot_until_block_step() {
        assert_eq!(
            candidates("北海道札幌市中央区南4条西3 ススキノビル"),
            vec![
                "北海道札幌市中央区南4条西3 ススキノビル",
                "北海道札幌市中央区南4条西3",
                "北海道札幌市中央区南4",
                "北海道札幌市",
            ]
        );
    }

    #[test]
    fn repeated_steps_collapse() {
        assert_eq!(
            candidates("東京都渋谷区渋谷2"),
            vec!["東京都渋谷区渋谷2", "東京都渋谷区"]
        );
        assert_eq!(candidates("東京都渋谷区"), vec!["東京都渋谷区"]);
    }

    #[test]
    fn every_candidate_is_a_prefix_of_the_original() {
        let original = "大阪府大阪市北区梅田1丁目2番3号 5F";
        for c in candidates(original) {
            assert!(original.starts_with(&c), "{c} is not a prefix");
        }
    }
}
