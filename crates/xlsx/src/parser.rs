//! XLSX package parser: sheet order and string cell indexing.

use crate::location::CellRef;
use crate::shared_strings::{is_item_text, rich_text, SharedStrings};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use xlate_core::markup::{attribute, local_name, prefixed_attribute};
use xlate_core::package::{part_relationships, resolve_target};
use xlate_core::{Error, Package, Result, SlotId, Token, XmlPart};

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// A parsed workbook: package, worksheets and the shared string table.
pub struct Workbook {
    pub(crate) package: Package,
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) shared: Option<SharedStrings>,
}

impl Workbook {
    /// Worksheets in workbook order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// The shared string table, if the workbook has one.
    pub fn shared_strings(&self) -> Option<&SharedStrings> {
        self.shared.as_ref()
    }

    /// Find a worksheet by name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Text of the string cell at `cell` in `sheet`.
    pub fn string_at(&self, sheet: &str, cell: CellRef) -> Option<String> {
        let sheet = self.sheet(sheet)?;
        let entry = sheet.cell(cell)?;
        self.cell_text(sheet, entry)
    }

    pub(crate) fn cell_text(&self, sheet: &Sheet, entry: &StringCell) -> Option<String> {
        match &entry.text {
            CellText::Shared { item, .. } => self.shared.as_ref()?.text(*item),
            CellText::Inline { slots } => Some(rich_text(&sheet.part, slots)),
            CellText::Plain { value_slot } => sheet.part.text(*value_slot).map(str::to_string),
        }
    }
}

/// One worksheet part.
pub struct Sheet {
    /// Sheet name as shown on its tab.
    pub name: String,
    /// Part name inside the package (`xl/worksheets/sheet1.xml`).
    pub path: String,
    pub(crate) part: XmlPart,
    pub(crate) cells: Vec<StringCell>,
    pub(crate) index: HashMap<CellRef, usize>,
}

impl Sheet {
    /// Number of `row` elements.
    pub fn row_count(&self) -> usize {
        self.count_elements(b"row")
    }

    /// Number of `c` elements, string or not.
    pub fn cell_count(&self) -> usize {
        self.count_elements(b"c")
    }

    /// References of the string cells, in row order.
    pub fn string_cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.cells.iter().map(|entry| entry.cell)
    }

    pub(crate) fn cell(&self, cell: CellRef) -> Option<&StringCell> {
        self.index.get(&cell).map(|&idx| &self.cells[idx])
    }

    fn count_elements(&self, local: &[u8]) -> usize {
        self.part
            .tokens()
            .iter()
            .filter(|token| match token {
                Token::Markup(Event::Start(e)) | Token::Markup(Event::Empty(e)) => {
                    local_name(e.name().as_ref()) == local
                }
                _ => false,
            })
            .count()
    }
}

/// A cell holding a string.
#[derive(Debug, Clone)]
pub(crate) struct StringCell {
    pub(crate) cell: CellRef,
    pub(crate) text: CellText,
}

/// Where a string cell's text lives.
#[derive(Debug, Clone)]
pub(crate) enum CellText {
    /// `t="s"`: `<v>` holds an index into the shared string table.
    Shared { value_slot: SlotId, item: usize },
    /// `t="inlineStr"`: text is in the cell's own `<is>` element.
    Inline { slots: Vec<SlotId> },
    /// `t="str"` without a formula: `<v>` holds the text itself.
    Plain { value_slot: SlotId },
}

/// Parser for XLSX (Office Open XML) files.
pub struct XlsxParser;

impl XlsxParser {
    /// Create a new XLSX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse an XLSX package into a [`Workbook`].
    pub fn parse(&self, package: Package) -> Result<Workbook> {
        if !package.contains(WORKBOOK_PART) {
            return Err(Error::ParseError(format!(
                "Not a workbook: '{}' is missing",
                WORKBOOK_PART
            )));
        }

        let relationships = part_relationships(&package, WORKBOOK_PART)?;
        let workbook_xml = package.read_string(WORKBOOK_PART)?;

        let mut shared = match relationships.iter().find(|rel| rel.is_kind("sharedStrings")) {
            Some(rel) => {
                let path = resolve_target(WORKBOOK_PART, &rel.target);
                let xml = package.read_string(&path)?;
                Some(SharedStrings::parse(path, &xml)?)
            }
            None => None,
        };

        let mut sheets = Vec::new();
        for (name, rel_id) in self.sheet_list(&workbook_xml)? {
            let rel = relationships
                .iter()
                .find(|rel| rel.id == rel_id)
                .ok_or_else(|| {
                    Error::ParseError(format!("Sheet relationship '{}' not found", rel_id))
                })?;
            if !rel.is_kind("worksheet") {
                log::debug!("Skipping non-worksheet sheet '{}'", name);
                continue;
            }
            let path = resolve_target(WORKBOOK_PART, &rel.target);
            sheets.push(self.parse_sheet(&package, name, path)?);
        }
        log::debug!("Found {} worksheets", sheets.len());

        for sheet in &sheets {
            for entry in &sheet.cells {
                if let CellText::Shared { item, .. } = entry.text {
                    let known = shared
                        .as_mut()
                        .is_some_and(|table| table.add_reference(item));
                    if !known {
                        return Err(Error::ParseError(format!(
                            "{}!{} points at missing shared string {}",
                            sheet.name, entry.cell, item
                        )));
                    }
                }
            }
        }

        Ok(Workbook {
            package,
            sheets,
            shared,
        })
    }

    /// `(name, relationship id)` of every `sheet` in workbook order.
    fn sheet_list(&self, xml: &str) -> Result<Vec<(String, String)>> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut sheets = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sheet" =>
                {
                    let name = attribute(e, b"name").unwrap_or_default();
                    let rel_id = prefixed_attribute(e, b"id").ok_or_else(|| {
                        Error::ParseError(format!("Sheet '{}' has no relationship id", name))
                    })?;
                    sheets.push((name, rel_id));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Error parsing workbook.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(sheets)
    }

    /// Parse one worksheet and index its string cells.
    fn parse_sheet(&self, package: &Package, name: String, path: String) -> Result<Sheet> {
        let content = package.read_string(&path)?;
        let part = XmlPart::parse(&content, |local| local == b"v" || local == b"t")
            .map_err(|e| Error::ParseError(format!("{}: {}", path, e)))?;
        let cells = index_string_cells(&part).map_err(|e| match e {
            Error::ParseError(msg) => Error::ParseError(format!("{}: {}", path, msg)),
            other => other,
        })?;
        log::debug!("{} ('{}'): {} string cells", path, name, cells.len());

        let index = cells
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.cell, idx))
            .collect();

        Ok(Sheet {
            name,
            path,
            part,
            cells,
            index,
        })
    }
}

impl Default for XlsxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A `c` element being walked.
#[derive(Debug)]
struct PendingCell {
    cell: CellRef,
    kind: Option<String>,
    has_formula: bool,
    value_slot: Option<SlotId>,
    inline_slots: Vec<SlotId>,
}

impl PendingCell {
    /// Resolve into a string cell; anything that is not a string is dropped.
    ///
    /// Formula cells are dropped whatever their type, so a cached `t="str"`
    /// result is never treated as text.
    fn finish(self, part: &XmlPart) -> Result<Option<StringCell>> {
        if self.has_formula {
            return Ok(None);
        }
        let text = match self.kind.as_deref() {
            Some("s") => {
                let Some(value_slot) = self.value_slot else {
                    return Ok(None);
                };
                let raw = part.text(value_slot).unwrap_or_default();
                let item = raw.trim().parse::<usize>().map_err(|_| {
                    Error::ParseError(format!(
                        "{} has shared string index '{}'",
                        self.cell, raw
                    ))
                })?;
                CellText::Shared { value_slot, item }
            }
            Some("inlineStr") if !self.inline_slots.is_empty() => CellText::Inline {
                slots: self.inline_slots,
            },
            Some("str") => match self.value_slot {
                Some(value_slot) => CellText::Plain { value_slot },
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(StringCell {
            cell: self.cell,
            text,
        }))
    }
}

/// Row/column cursor for cells without an `r` attribute.
#[derive(Debug, Default)]
struct CellCursor {
    row: u32,
    col: u32,
}

impl CellCursor {
    fn enter_row(&mut self, e: &BytesStart<'_>) {
        self.row = attribute(e, b"r")
            .and_then(|r| r.parse().ok())
            .unwrap_or(self.row + 1);
        self.col = 0;
    }

    fn enter_cell(&mut self, e: &BytesStart<'_>) -> CellRef {
        let cell = attribute(e, b"r")
            .and_then(|r| CellRef::parse(&r))
            .unwrap_or(CellRef::new(self.row.max(1), self.col + 1));
        self.col = cell.col;
        cell
    }
}

/// Walk `sheetData` and collect every string cell in row order.
fn index_string_cells(part: &XmlPart) -> Result<Vec<StringCell>> {
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut cursor = CellCursor::default();
    let mut pending: Option<PendingCell> = None;
    let mut cells = Vec::new();

    for (id, token) in part.tokens().iter().enumerate() {
        match token {
            Token::Markup(Event::Start(e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                match name.as_slice() {
                    b"row" => cursor.enter_row(e),
                    b"c" => {
                        pending = Some(PendingCell {
                            cell: cursor.enter_cell(e),
                            kind: attribute(e, b"t"),
                            has_formula: false,
                            value_slot: None,
                            inline_slots: Vec::new(),
                        });
                    }
                    b"f" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.has_formula = true;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Token::Markup(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"row" => cursor.enter_row(e),
                b"c" => {
                    cursor.enter_cell(e);
                }
                b"f" => {
                    if let Some(cell) = pending.as_mut() {
                        cell.has_formula = true;
                    }
                }
                _ => {}
            },
            Token::Markup(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                if name.as_slice() == b"c" {
                    if let Some(cell) = pending.take() {
                        if let Some(entry) = cell.finish(part)? {
                            cells.push(entry);
                        }
                    }
                }
            }
            Token::Text(_) => {
                let Some(cell) = pending.as_mut() else {
                    continue;
                };
                let depth = stack.len();
                if depth >= 2 && stack[depth - 1] == b"v" && stack[depth - 2] == b"c" {
                    cell.value_slot = Some(id);
                } else if is_item_text(&stack) {
                    cell.inline_slots.push(id);
                }
            }
            Token::Markup(_) => {}
        }
    }

    Ok(cells)
}
