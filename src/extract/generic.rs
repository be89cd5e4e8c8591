//! Generic layout for noisy text (OCR output, unlabeled column dumps).
//!
//! No single anchor separates records, so every line is tried against three
//! shapes, first match wins:
//!
//! 1. postal-code line followed by an address line; the name is the line
//!    before the postal code
//! 2. `name<TAB or 2+ spaces>address` column split
//! 3. address pattern inside the line; the name is the text before it, or
//!    the previous line when the address starts the line
//!
//! Every candidate passes through [`accept`] (length bounds + noise list).

use crate::address::{
    extract_address_span, find_address_start, find_phone, is_postal_code_line,
    prefecture_prefix, section_header,
};
use crate::output::StoreRecord;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME_CHARS: std::ops::RangeInclusive<usize> = 2..=60;
const ADDRESS_CHARS: std::ops::RangeInclusive<usize> = 5..=100;

/// Navigation headers, disclaimers and URLs that look like names.
const NOISE_PHRASES: &[&str] = &[
    "http",
    "www.",
    "Copyright",
    "©",
    "株主様",
    "株主優待",
    "ご利用",
    "ご注意",
    "お問い合わせ",
    "店舗一覧",
    "店舗名",
    "所在地",
    "電話番号",
    "営業時間",
    "定休日",
    "予告なく",
    "ページ",
];

static RE_COLUMN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+|\s{2,}|　+").unwrap());

struct Candidate<'a> {
    name: String,
    address: String,
    tel: Option<String>,
    pref: Option<&'a str>,
}

pub fn parse(text: &str, company: &str) -> Vec<StoreRecord> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut records = Vec::new();
    let mut current_pref: Option<&'static str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(pref) = section_header(line) {
            current_pref = Some(pref);
            i += 1;
            continue;
        }

        if is_postal_code_line(line) {
            if let (Some(&next), true) = (lines.get(i + 1), i > 0) {
                if find_address_start(next) == Some(0) {
                    let (address, tel) = split_phone(next);
                    let candidate = Candidate {
                        name: lines[i - 1].to_string(),
                        address,
                        tel,
                        pref: current_pref,
                    };
                    if let Some(r) = accept(candidate, company) {
                        records.push(r);
                        i += 2;
                        continue;
                    }
                }
            }
            i += 1;
            continue;
        }

        let (body, tel) = split_phone(line);

        if let Some(candidate) = column_split(&body, tel.clone(), current_pref) {
            if let Some(r) = accept(candidate, company) {
                records.push(r);
                i += 1;
                continue;
            }
        }

        if let Some(span) = extract_address_span(&body) {
            let mut name = body[..span.match_start].trim().to_string();
            if name.is_empty() && i > 0 {
                let prev = lines[i - 1];
                if looks_like_name(prev) {
                    name = prev.to_string();
                }
            }
            let candidate = Candidate {
                name,
                address: span.text,
                tel,
                pref: current_pref,
            };
            if let Some(r) = accept(candidate, company) {
                records.push(r);
            }
        }

        i += 1;
    }

    records
}

/// Line text with the phone number cut out, plus the phone.
fn split_phone(line: &str) -> (String, Option<String>) {
    match find_phone(line) {
        Some(p) => {
            let mut body = String::with_capacity(line.len());
            body.push_str(&line[..p.start]);
            body.push(' ');
            body.push_str(&line[p.end..]);
            (body.trim().to_string(), Some(p.number))
        }
        None => (line.to_string(), None),
    }
}

fn column_split<'a>(
    body: &str,
    tel: Option<String>,
    pref: Option<&'a str>,
) -> Option<Candidate<'a>> {
    let parts: Vec<&str> = RE_COLUMN_SPLIT
        .split(body)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }
    let at = (1..parts.len()).find(|&j| find_address_start(parts[j]) == Some(0))?;
    Some(Candidate {
        name: parts[..at].join(" "),
        address: parts[at..].join(" "),
        tel,
        pref,
    })
}

fn looks_like_name(line: &str) -> bool {
    section_header(line).is_none()
        && !is_postal_code_line(line)
        && extract_address_span(line).is_none()
        && find_phone(line).is_none()
}

fn is_noise(text: &str) -> bool {
    NOISE_PHRASES.iter().any(|p| text.contains(p))
}

fn accept(c: Candidate<'_>, company: &str) -> Option<StoreRecord> {
    let name = c.name.trim();
    let address = c.address.trim();
    if !NAME_CHARS.contains(&name.chars().count())
        || !ADDRESS_CHARS.contains(&address.chars().count())
        || is_noise(name)
        || is_noise(address)
    {
        return None;
    }
    let mut record = StoreRecord::new(company, name, address);
    record.tel = c.tel;
    record.pref = c
        .pref
        .or_else(|| prefecture_prefix(address))
        .map(str::to_string);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_code_pair_takes_name_from_line_before() {
        let text = "かごの屋 梅田店\n〒530-0001\n大阪府大阪市北区梅田1-2-3 5F";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "かごの屋 梅田店");
        assert_eq!(recs[0].address, "大阪府大阪市北区梅田1-2-3 5F");
        assert_eq!(recs[0].pref.as_deref(), Some("大阪"));
    }

    #[test]
    fn column_split_with_wide_spacing() {
        let text = "磯丸水産 渋谷店    東京都渋谷区渋谷2-1-1    03-1234-5678";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "磯丸水産 渋谷店");
        assert_eq!(recs[0].address, "東京都渋谷区渋谷2-1-1");
        assert_eq!(recs[0].tel.as_deref(), Some("03-1234-5678"));
    }

    #[test]
    fn inline_address_takes_name_from_prefix() {
        let recs = parse("新宿店 〒160-0023 東京都新宿区西新宿1-1-1 NSビル", "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "新宿店");
        assert_eq!(recs[0].address, "東京都新宿区西新宿1-1-1 NSビル");
    }

    #[test]
    fn leading_address_takes_name_from_previous_line() {
        let recs = parse("池袋店\n東京都豊島区南池袋1-1-1", "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "池袋店");
    }

    #[test]
    fn noise_and_length_filters() {
        let text = "店舗一覧\n東京都豊島区南池袋1-1-1\n\
                    店\n東京都新宿区西新宿1-1-1";
        assert!(parse(text, "A").is_empty());
    }

    #[test]
    fn section_header_sets_pref_for_unprefixed_address() {
        let recs = parse("神奈川県\n横浜店  横浜市西区南幸2-1-5", "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].pref.as_deref(), Some("神奈川"));
    }
}
