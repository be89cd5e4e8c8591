//! CSV export of store records.
//!
//! UTF-8 with a byte-order mark so spreadsheet applications detect the
//! encoding, comma-separated, fields quoted only when they contain a comma,
//! quote or line break (RFC 4180).

use crate::error::YutaiError;
use crate::filter::maps_search_url;
use crate::output::StoreRecord;
use std::io::Write;
use std::path::Path;

const BOM: &str = "\u{FEFF}";

pub const CSV_HEADER: [&str; 9] = [
    "会社",
    "店舗名",
    "都道府県",
    "住所",
    "電話",
    "緯度",
    "経度",
    "距離(km)",
    "GoogleMap",
];

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| escape(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Render records as CSV text, BOM and header included.
pub fn to_csv(records: &[StoreRecord]) -> String {
    let mut out = String::from(BOM);
    push_row(&mut out, CSV_HEADER);
    for r in records {
        push_row(
            &mut out,
            [
                r.company.clone(),
                r.name.clone(),
                r.pref.clone().unwrap_or_default(),
                r.address.clone(),
                r.tel.clone().unwrap_or_default(),
                r.lat.map(|v| format!("{v:.6}")).unwrap_or_default(),
                r.lng.map(|v| format!("{v:.6}")).unwrap_or_default(),
                r.distance_km.map(|v| format!("{v:.2}")).unwrap_or_default(),
                maps_search_url(&r.address),
            ],
        );
    }
    out
}

/// Write records as CSV to `path` atomically (temp file + rename).
pub fn export_csv_to_file(records: &[StoreRecord], path: &Path) -> Result<(), YutaiError> {
    let write_err = |source| YutaiError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(to_csv(records).as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
