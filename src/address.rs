//! Japanese postal-address grammar.
//!
//! A narrow, heuristic grammar for the business addresses printed in store
//! lists: `〒150-0002 東京都渋谷区渋谷2-1-1 ABCビル3F`. Every sub-rule is a
//! small table or regex with its own tests so a misfire can be traced to
//! exactly one rule.
//!
//! ## Sub-rules
//!
//! | Table | Purpose |
//! |-------|---------|
//! | [`PREFECTURES`] | the 47 prefecture names in short form |
//! | [`PREFECTURE_SUFFIXES`] | 都 / 道 / 府 / 県 |
//! | [`MUNICIPAL_SUFFIXES`] | 市 / 区 / 郡 / 町 / 村 |
//! | [`DASH_GLYPHS`] | hyphen variants separating block / lot / number |
//! | [`BUILDING_KEYWORDS`] | words that open a trailing building descriptor |
//!
//! ## Locating an address
//!
//! [`find_address_start`] tries three anchors in order and returns the first
//! hit:
//!
//! 1. prefecture + municipal unit within a short window (`東京都渋谷区`)
//! 2. bare prefecture (`東京都`)
//! 3. a short Han run ending in a municipal suffix (`渋谷区`)
//!
//! Store names often contain a prefecture word ("大阪王将 新宿店"), which is
//! why anchor 1 is tried before anchor 2.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefecture names in canonical north-to-south order, without suffix.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森", "岩手", "宮城", "秋田", "山形", "福島",
    "茨城", "栃木", "群馬", "埼玉", "千葉", "東京", "神奈川",
    "新潟", "富山", "石川", "福井", "山梨", "長野", "岐阜", "静岡", "愛知", "三重",
    "滋賀", "京都", "大阪", "兵庫", "奈良", "和歌山",
    "鳥取", "島根", "岡山", "広島", "山口",
    "徳島", "香川", "愛媛", "高知",
    "福岡", "佐賀", "長崎", "熊本", "大分", "宮崎", "鹿児島", "沖縄",
];

pub const PREFECTURE_SUFFIXES: [char; 4] = ['都', '道', '府', '県'];

pub const MUNICIPAL_SUFFIXES: [char; 5] = ['市', '区', '郡', '町', '村'];

/// ASCII hyphen, full-width hyphen, hyphen, horizontal bar, minus sign,
/// katakana prolonged sound mark (commonly typeset as a long dash).
pub const DASH_GLYPHS: [char; 6] = ['-', '－', '‐', '―', '−', 'ー'];

pub const BUILDING_KEYWORDS: [&str; 16] = [
    "ビル", "タワー", "号館", "館", "センター", "プラザ", "モール", "マンション",
    "ハイツ", "ホテル", "ヒルズ", "スクエア", "テラス", "棟", "駅", "ガーデン",
];

fn prefecture_alternation() -> String {
    PREFECTURES.join("|")
}

fn dash_class() -> String {
    let mut class = String::from("[");
    for c in DASH_GLYPHS {
        if c == '-' {
            class.push_str("\\-");
        } else {
            class.push(c);
        }
    }
    class.push(']');
    class
}

fn building_alternation() -> String {
    BUILDING_KEYWORDS.join("|")
}

static RE_SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^({})(?:都|道|府|県)?\s*$",
        prefecture_alternation()
    ))
    .unwrap()
});

static RE_PREF_MUNICIPAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:{})(?:都|道|府|県)?\w{{1,10}}?(?:市|区|郡)",
        prefecture_alternation()
    ))
    .unwrap()
});

static RE_PREF_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:{})(?:都|道|府|県)?", prefecture_alternation())).unwrap()
});

static RE_BARE_MUNICIPAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Han}{1,6}(?:市|区|町|村)").unwrap());

static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2,4}[-－]\d{2,4}[-－]\d{4}").unwrap());

static RE_POSTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"〒?\s*(\d{3}[-－]\d{4})").unwrap());

/// Block / lot / number: `2-1-1`, `2丁目1番1号`, `123番地`, `5ー3`, and
/// the grid form `南4条西3丁目`.
static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\d+(?:(?:{}|丁目|番地|番|条[東西南北]?|丁)\d+)*(?:丁目|番地|番|号|条|丁)?",
        dash_class()
    ))
    .unwrap()
});

static RE_FIRST_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:丁目)?").unwrap());

static RE_ADDRESS_SPAN: Lazy<Regex> = Lazy::new(|| {
    let kana_han = r"\p{Han}\p{Katakana}\p{Hiragana}々ヶヵー";
    Regex::new(&format!(
        concat!(
            r"(?:〒?\s*(?P<postal>\d{{3}}[-－]\d{{4}})\s*)?",
            r"(?P<body>",
            r"(?:(?:{pref})(?:都|道|府|県)?[{kh}]{{0,12}}?(?:市|区|郡|町|村)",
            r"|\p{{Han}}{{1,6}}(?:市|区|町|村))",
            r"[{kh}]*",
            r"\d+(?:(?:{dash}|丁目|番地|番|条[東西南北]?|丁)\d+)*(?:丁目|番地|番|号|条|丁)?",
            r"(?:\s*(?:\d+[FＦ階]|[BＢ地下]+\d+[FＦ階]?|\S*?(?:{bld})\S*))?",
            r")"
        ),
        pref = prefecture_alternation(),
        kh = kana_han,
        dash = dash_class(),
        bld = building_alternation(),
    ))
    .unwrap()
});

/// A located address inside a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpan {
    /// Byte offset where the whole match starts, postal code included.
    pub match_start: usize,
    /// Byte offset where the address body starts (after any postal code).
    pub start: usize,
    /// Byte offset one past the end of the address body.
    pub end: usize,
    pub text: String,
    pub postal_code: Option<String>,
}

/// A phone number found in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneMatch {
    pub start: usize,
    pub end: usize,
    pub number: String,
}

/// Byte offset where a postal address begins in `text`, or `None`.
pub fn find_address_start(text: &str) -> Option<usize> {
    RE_PREF_MUNICIPAL
        .find(text)
        .or_else(|| RE_PREF_ONLY.find(text))
        .or_else(|| RE_BARE_MUNICIPAL.find(text))
        .map(|m| m.start())
}

/// If `line` consists of nothing but a prefecture name, return its short form.
pub fn section_header(line: &str) -> Option<&'static str> {
    let caps = RE_SECTION_HEADER.captures(line.trim())?;
    canonical_prefecture(caps.get(1)?.as_str())
}

/// Short prefecture name the address starts with.
pub fn prefecture_prefix(address: &str) -> Option<&'static str> {
    let trimmed = address.trim_start();
    let trimmed = RE_POSTAL
        .find(trimmed)
        .filter(|m| m.start() == 0)
        .map(|m| trimmed[m.end()..].trim_start())
        .unwrap_or(trimmed);
    PREFECTURES.iter().copied().find(|p| trimmed.starts_with(p))
}

fn canonical_prefecture(name: &str) -> Option<&'static str> {
    PREFECTURES.iter().copied().find(|p| *p == name)
}

/// First phone number (`03-1234-5678`) in `text`.
pub fn find_phone(text: &str) -> Option<PhoneMatch> {
    RE_PHONE.find(text).map(|m| PhoneMatch {
        start: m.start(),
        end: m.end(),
        number: m.as_str().replace('－', "-"),
    })
}

/// `true` when the whole (trimmed) line is a postal code such as `〒150-0002`.
pub fn is_postal_code_line(line: &str) -> bool {
    let t = line.trim();
    RE_POSTAL
        .find(t)
        .is_some_and(|m| m.start() == 0 && m.end() == t.len())
}

/// Locate a full address (optional postal code, municipality, block
/// numbers, optional building descriptor) inside `text`.
pub fn extract_address_span(text: &str) -> Option<AddressSpan> {
    let caps = RE_ADDRESS_SPAN.captures(text)?;
    let body = caps.name("body")?;
    Some(AddressSpan {
        match_start: caps.get(0)?.start(),
        start: body.start(),
        end: body.end(),
        text: body.as_str().trim_end().to_string(),
        postal_code: caps.name("postal").map(|m| m.as_str().replace('－', "-")),
    })
}

/// Address without its trailing building / floor / facility descriptor.
///
/// Cuts right after the first block-number sequence; if the address has no
/// block numbers, keeps only the first whitespace-separated token.
pub fn strip_building(address: &str) -> String {
    let address = address.trim();
    if let Some(m) = RE_BLOCK.find(address) {
        return address[..m.end()].trim_end().to_string();
    }
    address
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Address reduced to its first block number (`渋谷2-1-1` → `渋谷2`).
pub fn block_level(address: &str) -> Option<String> {
    let stripped = strip_building(address);
    let m = RE_FIRST_BLOCK.find(&stripped)?;
    Some(stripped[..m.end()].to_string())
}

/// Address reduced to prefecture + first municipal unit
/// (`東京都渋谷区渋谷2-1-1` → `東京都渋谷区`).
///
/// A county (`郡`) is kept together with the town or village that follows it.
pub fn municipality_level(address: &str) -> Option<String> {
    let address = address.trim();
    let pref_len = RE_PREF_ONLY
        .find(address)
        .filter(|m| m.start() == 0)
        .map(|m| m.end())
        .unwrap_or(0);
    let rest = &address[pref_len..];

    let mut seen = 0usize;
    let mut in_county = false;
    for (idx, c) in rest.char_indices() {
        if c.is_ascii_digit() || c.is_whitespace() || c.is_numeric() {
            return None;
        }
        seen += 1;
        if seen < 2 {
            continue;
        }
        // 四日市市, 廿日市市, 十日町市: the unit name itself contains a suffix.
        if rest[idx + c.len_utf8()..].starts_with('市') {
            continue;
        }
        match c {
            '郡' => in_county = true,
            '町' | '村' => return Some(address[..pref_len + idx + c.len_utf8()].to_string()),
            '市' | '区' if !in_county => {
                return Some(address[..pref_len + idx + c.len_utf8()].to_string())
            }
            _ => {}
        }
    }
    None
}

/// `true` when `c` separates block / lot / number.
pub fn is_dash(c: char) -> bool {
    DASH_GLYPHS.contains(&c)
}

/// `true` when `text` contains a building keyword.
pub fn has_building_keyword(text: &str) -> bool {
    BUILDING_KEYWORDS.iter().any(|k| text.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_complete() {
        assert_eq!(PREFECTURES.len(), 47);
        assert!(PREFECTURE_SUFFIXES.contains(&'道'));
        assert!(MUNICIPAL_SUFFIXES.contains(&'郡'));
        assert!(is_dash('－'));
        assert!(is_dash('ー'));
        assert!(!is_dash('〜'));
        assert!(has_building_keyword("ABCビル3F"));
    }

    #[test]
    fn start_at_prefecture_municipal_anchor() {
        let line = "東京都渋谷区渋谷2-1-1 ABCビル3F";
        assert_eq!(find_address_start(line), Some(0));
    }

    #[test]
    fn store_name_with_prefecture_word_is_skipped() {
        let line = "大阪王将 新宿店 東京都新宿区西新宿1-1-1";
        let start = find_address_start(line).expect("found");
        assert!(line[start..].starts_with("東京都新宿区"));
    }

    #[test]
    fn bare_prefecture_fallback() {
        let line = "磯丸水産 札幌店 北海道 すすきの南4条西3";
        let start = find_address_start(line).expect("found");
        assert!(line[start..].starts_with("北海道"));
    }

    #[test]
    fn bare_municipal_fallback() {
        let line = "かっぱ亭 新宿店 新宿区西新宿1-1";
        let start = find_address_start(line).expect("found");
        assert!(line[start..].starts_with("新宿区"));
    }

    #[test]
    fn no_address_in_prose() {
        assert_eq!(find_address_start("ご利用いただけます"), None);
    }

    #[test]
    fn section_header_variants() {
        assert_eq!(section_header("東京都"), Some("東京"));
        assert_eq!(section_header("  大阪府　"), Some("大阪"));
        assert_eq!(section_header("北海道"), Some("北海道"));
        assert_eq!(section_header("神奈川"), Some("神奈川"));
        assert_eq!(section_header("東京都渋谷区"), None);
    }

    #[test]
    fn prefecture_prefix_detection() {
        assert_eq!(prefecture_prefix("京都府京都市中京区"), Some("京都"));
        assert_eq!(prefecture_prefix("東京都港区"), Some("東京"));
        assert_eq!(prefecture_prefix("〒150-0002 東京都渋谷区"), Some("東京"));
        assert_eq!(prefecture_prefix("渋谷区渋谷"), None);
    }

    #[test]
    fn phone_detection() {
        let p = find_phone("東京都渋谷区渋谷2-1-1 ABCビル3F 03-1234-5678").expect("phone");
        assert_eq!(p.number, "03-1234-5678");
        assert!(find_phone("渋谷2-1-1").is_none());
        assert_eq!(find_phone("TEL 0120－123－4567").map(|p| p.number), Some("0120-123-4567".into()));
    }

    #[test]
    fn postal_code_line() {
        assert!(is_postal_code_line("〒150-0002"));
        assert!(is_postal_code_line(" 150-0002 "));
        assert!(!is_postal_code_line("〒150-0002 東京都渋谷区"));
    }

    #[test]
    fn address_span_with_postal_and_building() {
        let span = extract_address_span("渋谷店 〒150-0002 東京都渋谷区渋谷2-1-1 ABCビル3F")
            .expect("span");
        assert_eq!(span.text, "東京都渋谷区渋谷2-1-1 ABCビル3F");
        assert_eq!(span.postal_code.as_deref(), Some("150-0002"));
        assert!(span.match_start < span.start);
    }

    #[test]
    fn address_span_with_chome_and_floor() {
        let span = extract_address_span("梅田店 大阪府大阪市北区梅田1丁目2番3号 5F").expect("span");
        assert_eq!(span.text, "大阪府大阪市北区梅田1丁目2番3号 5F");
    }

    #[test]
    fn address_span_with_full_width_dashes() {
        let span = extract_address_span("横浜市西区南幸2－1－5").expect("span");
        assert_eq!(span.text, "横浜市西区南幸2－1－5");
    }

    #[test]
    fn address_span_with_grid_block() {
        let span = extract_address_span("札幌店 北海道札幌市中央区南4条西3丁目2 011-123-4567")
            .expect("span");
        assert_eq!(span.text, "北海道札幌市中央区南4条西3丁目2");
    }

    #[test]
    fn strip_building_cuts_after_block() {
        assert_eq!(
            strip_building("東京都渋谷区渋谷2-1-1 ABCビル3F"),
            "東京都渋谷区渋谷2-1-1"
        );
        assert_eq!(strip_building("東京都渋谷区渋谷2-1-1"), "東京都渋谷区渋谷2-1-1");
        assert_eq!(
            strip_building("北海道札幌市中央区南4条西3"),
            "北海道札幌市中央区南4条西3"
        );
        assert_eq!(
            strip_building("北海道札幌市中央区南4条西3丁目2 ススキノビル5F"),
            "北海道札幌市中央区南4条西3丁目2"
        );
    }

    #[test]
    fn block_level_keeps_first_number() {
        assert_eq!(
            block_level("東京都渋谷区渋谷2-1-1 ABCビル3F").as_deref(),
            Some("東京都渋谷区渋谷2")
        );
        assert_eq!(
            block_level("大阪府大阪市北区梅田1丁目2番3号").as_deref(),
            Some("大阪府大阪市北区梅田1丁目")
        );
        assert_eq!(block_level("東京都渋谷区"), None);
    }

    #[test]
    fn municipality_level_variants() {
        assert_eq!(
            municipality_level("東京都渋谷区渋谷2-1-1").as_deref(),
            Some("東京都渋谷区")
        );
        assert_eq!(
            municipality_level("千葉県市川市八幡2-1").as_deref(),
            Some("千葉県市川市")
        );
        assert_eq!(
            municipality_level("北海道虻田郡倶知安町北1条").as_deref(),
            Some("北海道虻田郡倶知安町")
        );
        assert_eq!(
            municipality_level("三重県四日市市諏訪栄町1-1").as_deref(),
            Some("三重県四日市市")
        );
        assert_eq!(
            municipality_level("広島県廿日市市下平良1-3").as_deref(),
            Some("広島県廿日市市")
        );
        assert_eq!(
            municipality_level("新潟県十日町市本町2-1").as_deref(),
            Some("新潟県十日町市")
        );
        assert_eq!(municipality_level("東京都2-1"), None);
    }
}
