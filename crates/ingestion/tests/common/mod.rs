//! Minimal in-memory `.xlsx` writer for workbook tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub enum Cell {
    Text(&'static str),
    Number(f64),
    /// Serial with a built-in date number format applied.
    Date(f64),
}

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>"#);
    for (i, row) in rows.iter().enumerate() {
        let r = i + 1;
        xml.push_str(&format!(r#"<row r="{r}">"#));
        for (j, cell) in row.iter().enumerate() {
            let col = (b'A' + j as u8) as char;
            let cell_xml = match cell {
                Cell::Text(s) => {
                    format!(r#"<c r="{col}{r}" t="inlineStr"><is><t>{s}</t></is></c>"#)
                }
                Cell::Number(v) => format!(r#"<c r="{col}{r}"><v>{v}</v></c>"#),
                Cell::Date(v) => format!(r#"<c r="{col}{r}" s="1"><v>{v}</v></c>"#),
            };
            xml.push_str(&cell_xml);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Build an `.xlsx` with one worksheet per entry of `sheets`, in order.
pub fn xlsx(sheets: &[Vec<Vec<Cell>>], date1904: bool) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"></Default><Default Extension="xml" ContentType="application/xml"></Default><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"></Override><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"></Override>"#
    );
    let mut sheet_entries = String::new();
    let mut relationships = String::new();
    for n in 1..=sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"></Override>"#
        ));
        sheet_entries.push_str(&format!(
            r#"<sheet name="Sheet{n}" sheetId="{n}" r:id="rId{n}"></sheet>"#
        ));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"></Relationship>"#
        ));
    }
    content_types.push_str("</Types>");
    let styles_id = sheets.len() + 1;
    relationships.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="{REL_NS}/styles" Target="styles.xml"></Relationship>"#
    ));

    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><workbookPr date1904="{}"></workbookPr><sheets>{sheet_entries}</sheets></workbook>"#,
        if date1904 { 1 } else { 0 }
    );
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG_REL_NS}">{relationships}</Relationships>"#
    );
    let root_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"></Relationship></Relationships>"#
    );
    // Style 1 uses built-in number format 14 (m/d/yyyy).
    let styles = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="{MAIN_NS}"><cellXfs count="2"><xf numFmtId="0"></xf><xf numFmtId="14" applyNumberFormat="1"></xf></cellXfs></styleSheet>"#
    );

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types),
        ("_rels/.rels".to_string(), root_rels),
        ("xl/workbook.xml".to_string(), workbook),
        ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels),
        ("xl/styles.xml".to_string(), styles),
    ];
    for (i, rows) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(rows)));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Header plus OHLC rows keyed by date serial.
pub fn ohlc_sheet(rows: &[(f64, f64)]) -> Vec<Vec<Cell>> {
    let mut sheet = vec![vec![
        Cell::Text("Date"),
        Cell::Text("Open"),
        Cell::Text("High"),
        Cell::Text("Low"),
        Cell::Text("Close"),
    ]];
    for &(serial, close) in rows {
        sheet.push(vec![
            Cell::Date(serial),
            Cell::Number(1.0),
            Cell::Number(2.0),
            Cell::Number(0.5),
            Cell::Number(close),
        ]);
    }
    sheet
}
