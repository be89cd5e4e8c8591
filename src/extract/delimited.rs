//! Delimited layout: spreadsheet exports printed as quoted CSV rows.
//!
//! ```text
//! "磯丸水産 渋谷店","東京都渋谷区渋谷2-1-1","03-1234-5678"
//! "磯丸水産 新宿店","東京都新宿区西新宿1-1-1","03-2345-6789"
//! ```
//!
//! Rows are self-contained, so there is no section-header state: the
//! prefecture comes from the start of the address.

use crate::address::{find_address_start, find_phone, prefecture_prefix};
use crate::output::StoreRecord;

const ROW_BOUNDARY: &str = "\"\n\"";
const FIELD_BOUNDARY: &str = "\",\"";

pub fn parse(text: &str, company: &str) -> Vec<StoreRecord> {
    text.split(ROW_BOUNDARY)
        .filter_map(|row| parse_row(row, company))
        .collect()
}

fn parse_row(row: &str, company: &str) -> Option<StoreRecord> {
    let fields: Vec<&str> = row.split(FIELD_BOUNDARY).collect();
    if fields.len() < 2 {
        return None;
    }
    let last = fields.len() - 1;

    let fields: Vec<&str> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let mut f = *f;
            // Preamble before the first row, trailing prose after the last.
            if i == 0 {
                f = f.rsplit('\n').next().unwrap_or(f);
            }
            if i == last {
                f = f.split('\n').next().unwrap_or(f);
            }
            f.trim().trim_matches('"').trim()
        })
        .collect();

    let name = fields[0];
    let address = fields[1];
    find_address_start(address)?;

    let mut record = StoreRecord::new(company, name, address);
    record.tel = fields[2..]
        .iter()
        .find_map(|f| find_phone(f))
        .map(|p| p.number);
    record.pref = prefecture_prefix(address).map(str::to_string);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_preamble_and_trailer() {
        let text = "店舗一覧\n\
                    \"渋谷店\",\"東京都渋谷区渋谷2-1-1\",\"03-1234-5678\"\n\
                    \"梅田店\",\"大阪府大阪市北区梅田1-2-3\",\"営業時間 11:00-23:00\",\"06-1234-5678\"\n\
                    \"札幌店\",\"北海道札幌市中央区南4条西3\",\"\"\n\
                    以上";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].name, "渋谷店");
        assert_eq!(recs[0].tel.as_deref(), Some("03-1234-5678"));
        assert_eq!(recs[1].tel.as_deref(), Some("06-1234-5678"));
        assert_eq!(recs[1].pref.as_deref(), Some("大阪"));
        assert_eq!(recs[2].address, "北海道札幌市中央区南4条西3");
        assert_eq!(recs[2].tel, None);
        assert_eq!(recs[2].pref.as_deref(), Some("北海道"));
    }

    #[test]
    fn header_row_is_skipped() {
        let text = "\"店舗名\",\"住所\",\"電話番号\"\n\"渋谷店\",\"東京都渋谷区渋谷2-1-1\",\"03-1234-5678\"";
        let recs = parse(text, "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "渋谷店");
    }

    #[test]
    fn address_without_prefecture_has_no_pref() {
        let recs = parse("\"横浜店\",\"横浜市西区南幸2-1-5\",\"045-123-4567\"", "A");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].pref, None);
    }
}
