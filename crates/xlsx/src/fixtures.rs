//! In-memory XLSX builders for tests.

use crate::location::CellRef;
use quick_xml::escape::escape;
use xlate_core::Package;

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Cell content for [`WorkbookBuilder`].
#[derive(Debug, Clone, Copy)]
pub enum Cell {
    /// Shared string (deduplicated across the workbook).
    Text(&'static str),
    /// Inline string.
    Inline(&'static str),
    /// `t="str"` text stored directly in `<v>`, no formula.
    Plain(&'static str),
    /// Numeric value, as written in `<v>`.
    Number(&'static str),
    Bool(bool),
    /// Formula with a cached string result.
    Formula(&'static str, &'static str),
    /// Styled cell without a value.
    Empty,
}

enum SheetSpec {
    Worksheet(String, Vec<Vec<Cell>>),
    Chart(String),
}

/// Builds a minimal but well-formed .xlsx package.
#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<SheetSpec>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worksheet; each inner vec is one row starting at column A.
    pub fn sheet(mut self, name: &str, rows: Vec<Vec<Cell>>) -> Self {
        self.sheets.push(SheetSpec::Worksheet(name.to_string(), rows));
        self
    }

    /// Add a chart sheet (never translated).
    pub fn chart_sheet(mut self, name: &str) -> Self {
        self.sheets.push(SheetSpec::Chart(name.to_string()));
        self
    }

    /// Package bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut strings: Vec<&'static str> = Vec::new();
        let mut references = 0;
        for spec in &self.sheets {
            if let SheetSpec::Worksheet(_, rows) = spec {
                for cell in rows.iter().flatten() {
                    if let Cell::Text(text) = cell {
                        references += 1;
                        if !strings.contains(text) {
                            strings.push(text);
                        }
                    }
                }
            }
        }

        let mut sheet_entries = String::new();
        let mut rels = String::new();
        let mut parts = Vec::new();
        let mut worksheet_no = 0;
        let mut chart_no = 0;
        for (idx, spec) in self.sheets.iter().enumerate() {
            let rel_id = format!("rId{}", idx + 1);
            let (name, kind, target) = match spec {
                SheetSpec::Worksheet(name, rows) => {
                    worksheet_no += 1;
                    let target = format!("worksheets/sheet{}.xml", worksheet_no);
                    parts.push((format!("xl/{}", target), worksheet_xml(rows, &strings)));
                    (name, "worksheet", target)
                }
                SheetSpec::Chart(name) => {
                    chart_no += 1;
                    let target = format!("chartsheets/sheet{}.xml", chart_no);
                    parts.push((
                        format!("xl/{}", target),
                        r#"<chartsheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"/>"#.to_string(),
                    ));
                    (name, "chartsheet", target)
                }
            };
            sheet_entries.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="{}"/>"#,
                escape(name.as_str()),
                idx + 1,
                rel_id
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
                rel_id, REL_BASE, kind, target
            ));
        }
        rels.push_str(&format!(
            r#"<Relationship Id="rId100" Type="{}/styles" Target="styles.xml"/>"#,
            REL_BASE
        ));
        if !strings.is_empty() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId101" Type="{}/sharedStrings" Target="sharedStrings.xml"/>"#,
                REL_BASE
            ));
            let items: String = strings
                .iter()
                .map(|text| format!("<si><t>{}</t></si>", escape(*text)))
                .collect();
            parts.push((
                "xl/sharedStrings.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">{}</sst>"#,
                    references,
                    strings.len(),
                    items
                ),
            ));
        }

        let mut all = vec![
            ("[Content_Types].xml".to_string(), CONTENT_TYPES.to_string()),
            ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
            (
                "xl/workbook.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><bookViews><workbookView activeTab="0"/></bookViews><sheets>{}</sheets><calcPr calcId="191029"/></workbook>"#,
                    REL_BASE, sheet_entries
                ),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                    rels
                ),
            ),
            ("xl/styles.xml".to_string(), STYLES.to_string()),
        ];
        all.extend(parts);

        match Package::from_parts(all).and_then(|package| package.to_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => panic!("fixture package failed to build: {}", e),
        }
    }
}

fn worksheet_xml(rows: &[Vec<Cell>], strings: &[&'static str]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let data: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let row = r as u32 + 1;
            let cells: String = cells
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    let reference = CellRef::new(row, c as u32 + 1);
                    match cell {
                        Cell::Text(text) => {
                            let index = strings.iter().position(|s| s == text).unwrap_or(0);
                            format!(r#"<c r="{}" s="1" t="s"><v>{}</v></c>"#, reference, index)
                        }
                        Cell::Inline(text) => format!(
                            r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                            reference,
                            escape(*text)
                        ),
                        Cell::Plain(text) => format!(
                            r#"<c r="{}" t="str"><v>{}</v></c>"#,
                            reference,
                            escape(*text)
                        ),
                        Cell::Number(value) => {
                            format!(r#"<c r="{}" s="2"><v>{}</v></c>"#, reference, value)
                        }
                        Cell::Bool(value) => format!(
                            r#"<c r="{}" t="b"><v>{}</v></c>"#,
                            reference,
                            u8::from(*value)
                        ),
                        Cell::Formula(formula, cached) => format!(
                            r#"<c r="{}" t="str"><f>{}</f><v>{}</v></c>"#,
                            reference,
                            escape(*formula),
                            escape(*cached)
                        ),
                        Cell::Empty => format!(r#"<c r="{}" s="1"/>"#, reference),
                    }
                })
                .collect();
            format!(r#"<row r="{}" spans="1:{}">{}</row>"#, row, width, cells)
        })
        .collect();
    let last = CellRef::new(rows.len().max(1) as u32, width as u32);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><dimension ref="A1:{}"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="18.75"/><cols><col min="1" max="1" width="24.5" customWidth="1"/></cols><sheetData>{}</sheetData><mergeCells count="1"><mergeCell ref="D1:E1"/></mergeCells><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        REL_BASE, last, data
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="游ゴシック"/></font><font><b/><sz val="14"/><color rgb="FFC00000"/></font></fonts><cellXfs count="3"><xf numFmtId="0" fontId="0"/><xf numFmtId="0" fontId="1" applyFont="1"/><xf numFmtId="3" fontId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
