//! Line-based layout: prefecture section headers, one store per line.
//!
//! ```text
//! 東京都
//! 磯丸水産 渋谷店 東京都渋谷区渋谷2-1-1 ABCビル3F 03-1234-5678
//! 磯丸水産 新宿店 東京都新宿区西新宿1-1-1 03-2345-6789
//! 大阪府
//! ...
//! ```
//!
//! A phone number anchors each record. The text before it is split at the
//! address start into name and address.

use crate::address::{find_address_start, find_phone, prefecture_prefix, section_header};
use crate::output::StoreRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum address length in characters.
const MIN_ADDRESS_CHARS: usize = 4;

/// Boilerplate lines that never carry a store: greetings, notices, page
/// numbers, copyright lines, URLs.
static RE_SKIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:株主様|ご利用|店舗は|ご理解|なお|注|※|・・|ページ|\d+$|Copyright|©|http|年月日|利用上限|ゴルフ)",
    )
    .unwrap()
});

pub fn parse(text: &str, company: &str) -> Vec<StoreRecord> {
    let mut records = Vec::new();
    let mut current_pref: Option<&'static str> = None;
    // Last prose line not yet used as a name.
    let mut pending: Option<&str> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || RE_SKIP.is_match(line) {
            continue;
        }

        if let Some(pref) = section_header(line) {
            current_pref = Some(pref);
            pending = None;
            continue;
        }

        let Some(phone) = find_phone(line) else {
            pending = Some(line);
            continue;
        };

        let before = line[..phone.start].trim();
        let Some(start) = find_address_start(before) else {
            continue;
        };

        let address = before[start..].trim();
        if address.chars().count() < MIN_ADDRESS_CHARS {
            continue;
        }

        let mut name = before[..start].trim();
        if name.is_empty() {
            if let Some(prev) = pending {
                name = prev;
            }
        }
        pending = None;

        let mut record = StoreRecord::new(company, name, address);
        record.tel = Some(phone.number);
        record.pref = current_pref
            .or_else(|| prefecture_prefix(address))
            .map(str::to_string);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_address_phone() {
        let recs = parse(
            "磯丸水産 渋谷店 東京都渋谷区渋谷2-1-1 ABCビル3F 03-1234-5678",
            "クリエイト",
        );
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.name, "磯丸水産 渋谷店");
        assert_eq!(r.address, "東京都渋谷区渋谷2-1-1 ABCビル3F");
        assert_eq!(r.tel.as_deref(), Some("03-1234-5678"));
        assert_eq!(r.pref.as_deref(), Some("東京"));
        assert_eq!(r.company, "クリエイト");
    }

    #[test]
    fn header_overrides_address_prefix() {
        let text = "神奈川県\nかごの屋 横浜店 横浜市西区南幸2-1-5 045-123-4567";
        let recs = parse(text, "A");
        assert_eq!(recs[0].pref.as_deref(), Some("神奈川"));
        assert_eq!(recs[0].address, "横浜市西区南幸2-1-5");
    }

    #[test]
    fn skip_patterns_and_prose_are_ignored() {
        let text = "株主様ご優待券\n\
                    ※ 一部店舗ではご利用いただけません 03-0000-0000\n\
                    12\n\
                    Copyright 2024\n\
                    東京都\n\
                    渋谷店 東京都渋谷区渋谷2-1-1 03-1234-5678";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "渋谷店");
    }

    #[test]
    fn empty_name_takes_preceding_prose_line() {
        let text = "大阪府\n\
                    かごの屋 梅田店\n\
                    大阪府大阪市北区梅田1-2-3 06-1234-5678\n\
                    大阪府大阪市北区梅田2-3-4 06-2345-6789";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].name, "かごの屋 梅田店");
        // The prose line was consumed by the first record.
        assert_eq!(recs[1].name, "");
    }

    #[test]
    fn short_address_is_rejected() {
        assert!(parse("本店 東京 03-1234-5678", "A").is_empty());
    }

    #[test]
    fn line_without_address_is_skipped() {
        assert!(parse("お問い合わせ窓口 0120-123-4567", "A").is_empty());
    }
}
