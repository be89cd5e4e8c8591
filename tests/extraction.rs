//! Integration tests for the text → records half of the pipeline.
//!
//! These run on plain text, so they need neither pdfium nor an OCR provider.

use yutai_map::{extract_from_text, extract_records, Layout, YutaiError};

/// Build a line-based booklet: three prefecture sections, `counts` stores each.
fn booklet(counts: [usize; 3]) -> String {
    let mut lines = vec![
        "株主様ご優待券 ご利用可能店舗一覧".to_string(),
        "※ 一部店舗ではご利用いただけません".to_string(),
    ];
    let mut n = 0;

    lines.push("東京都".into());
    for _ in 0..counts[0] {
        n += 1;
        lines.push(format!("店舗{n} 東京都渋谷区渋谷{n}-1-1 03-1234-{n:04}"));
    }

    lines.push("大阪府".into());
    for _ in 0..counts[1] {
        n += 1;
        lines.push(format!("店舗{n} 大阪府大阪市北区梅田{n}-2-3 06-1234-{n:04}"));
    }

    lines.push("北海道".into());
    for _ in 0..counts[2] {
        n += 1;
        lines.push(format!("店舗{n} 北海道札幌市中央区北{n}-1-1 011-123-{n:04}"));
    }

    lines.push("12".into());
    lines.join("\n")
}

#[test]
fn fifty_stores_across_three_sections() {
    let text = booklet([20, 15, 15]);
    let out = extract_from_text("クリエイト_株主優待_2024.pdf", &text).expect("records");

    assert_eq!(out.layout, Layout::LineBased);
    assert_eq!(out.company, "クリエイト");
    assert_eq!(out.records.len(), 50);

    let count = |pref: &str| {
        out.records
            .iter()
            .filter(|r| r.pref.as_deref() == Some(pref))
            .count()
    };
    assert_eq!(count("東京"), 20);
    assert_eq!(count("大阪"), 15);
    assert_eq!(count("北海道"), 15);

    let first = &out.records[0];
    assert_eq!(first.name, "店舗1");
    assert_eq!(first.address, "東京都渋谷区渋谷1-1-1");
    assert_eq!(first.tel.as_deref(), Some("03-1234-0001"));

    let last = &out.records[49];
    assert_eq!(last.name, "店舗50");
    assert_eq!(last.tel.as_deref(), Some("011-123-0050"));
}

#[test]
fn extraction_is_idempotent() {
    let text = booklet([3, 2, 1]);
    let a = extract_records(&text, "A");
    let b = extract_records(&text, "A");
    assert_eq!(a.layout, b.layout);
    assert_eq!(a.records, b.records);
}

#[test]
fn repeated_pages_are_deduplicated() {
    let page = booklet([2, 2, 2]);
    let text = format!("{page}\n{page}");
    let out = extract_from_text("A.pdf", &text).expect("records");
    assert_eq!(out.records.len(), 6);
    assert_eq!(out.stats.raw_records, 12);
    assert_eq!(out.stats.duplicates_removed, 6);
}

#[test]
fn section_header_applies_to_following_lines_only() {
    let text = "東京都\n\
                渋谷店 渋谷区渋谷1-1-1 03-1111-1111\n\
                新宿店 新宿区西新宿1-1-1 03-2222-2222\n\
                大阪府\n\
                梅田店 大阪市北区梅田1-1-1 06-3333-3333";
    let out = extract_records(text, "A");
    let prefs: Vec<_> = out.records.iter().map(|r| r.pref.as_deref()).collect();
    assert_eq!(prefs, vec![Some("東京"), Some("東京"), Some("大阪")]);
    assert_eq!(out.records[2].address, "大阪市北区梅田1-1-1");
}

#[test]
fn single_store_line() {
    let out = extract_records("磯丸水産 渋谷店 東京都渋谷区渋谷2-1-1 ABCビル3F 03-1234-5678", "クリエイト");
    assert_eq!(out.records.len(), 1);
    let r = &out.records[0];
    assert_eq!(r.name, "磯丸水産 渋谷店");
    assert_eq!(r.address, "東京都渋谷区渋谷2-1-1 ABCビル3F");
    assert_eq!(r.tel.as_deref(), Some("03-1234-5678"));
    assert_eq!(r.pref.as_deref(), Some("東京"));
}

#[test]
fn delimited_export_is_detected() {
    let text = "\"店舗名\",\"住所\",\"電話番号\"\n\
                \"渋谷店\",\"東京都渋谷区渋谷2-1-1\",\"03-1234-5678\"\n\
                \"梅田店\",\"大阪府大阪市北区梅田1-2-3\",\"06-1234-5678\"\n\
                \"札幌店\",\"北海道札幌市中央区南4条西3-1\",\"011-123-4567\"";
    let out = extract_records(text, "A");
    assert_eq!(out.layout, Layout::Delimited);
    assert_eq!(out.records.len(), 3);
    assert_eq!(out.records[1].name, "梅田店");
    assert_eq!(out.records[1].pref.as_deref(), Some("大阪"));
}

#[test]
fn prose_only_text_has_no_records() {
    let err = extract_from_text("A.pdf", "株主優待のご案内\nご利用ありがとうございます。");
    assert!(matches!(err, Err(YutaiError::NoRecords { .. })));
}
