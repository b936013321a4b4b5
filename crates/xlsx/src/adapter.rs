//! [`FormatAdapter`] implementation for workbooks.

use crate::location::CellLocation;
use crate::parser::{CellText, Workbook, XlsxParser};
use crate::shared_strings::set_rich_text;
use xlate_core::{Error, FormatAdapter, Package, Result, TextUnit};

/// Extracts and rewrites string cells in .xlsx workbooks.
///
/// Traversal order: worksheets in workbook order, then cells row by row.
/// Writing a cell whose shared string is used elsewhere gives that cell its
/// own copy of the string, so other cells keep their text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetAdapter;

impl SpreadsheetAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl FormatAdapter for SpreadsheetAdapter {
    type Tree = Workbook;
    type Location = CellLocation;

    fn parse(&self, bytes: &[u8]) -> Result<Workbook> {
        let package = Package::from_bytes(bytes.to_vec())?;
        XlsxParser::new().parse(package)
    }

    fn text_units<'t>(
        &self,
        tree: &'t Workbook,
    ) -> Box<dyn Iterator<Item = TextUnit<CellLocation>> + 't> {
        Box::new(tree.sheets.iter().flat_map(move |sheet| {
            sheet.cells.iter().filter_map(move |entry| {
                let text = tree.cell_text(sheet, entry)?;
                let unit = TextUnit::new(CellLocation::new(sheet.name.clone(), entry.cell), text);
                unit.is_candidate().then_some(unit)
            })
        }))
    }

    fn write(&self, tree: &mut Workbook, location: &CellLocation, text: &str) -> Result<()> {
        let sheet = tree
            .sheets
            .iter_mut()
            .find(|sheet| sheet.name == location.sheet)
            .ok_or_else(|| Error::write(location, "sheet does not exist"))?;
        let idx = *sheet
            .index
            .get(&location.cell)
            .ok_or_else(|| Error::write(location, "not a string cell"))?;

        match sheet.cells[idx].text.clone() {
            CellText::Inline { slots } => {
                set_rich_text(&mut sheet.part, &slots, text)
                    .ok_or_else(|| Error::write(location, "inline string has no text"))?;
            }
            CellText::Plain { value_slot } => {
                sheet
                    .part
                    .set_text(value_slot, text)
                    .ok_or_else(|| Error::write(location, "cell has no value"))?;
            }
            CellText::Shared { value_slot, item } => {
                let shared = tree
                    .shared
                    .as_mut()
                    .ok_or_else(|| Error::write(location, "workbook has no shared strings"))?;
                let target = shared
                    .write(item, text)
                    .ok_or_else(|| Error::write(location, "shared string does not exist"))?;
                if target != item {
                    sheet
                        .part
                        .set_text(value_slot, &target.to_string())
                        .ok_or_else(|| Error::write(location, "cell has no value"))?;
                    sheet.cells[idx].text = CellText::Shared {
                        value_slot,
                        item: target,
                    };
                }
            }
        }
        Ok(())
    }

    fn serialize(&self, tree: Workbook) -> Result<Vec<u8>> {
        let Workbook {
            mut package,
            sheets,
            shared,
        } = tree;
        for sheet in sheets.iter().filter(|sheet| sheet.part.is_modified()) {
            log::debug!("Rewriting {} ('{}')", sheet.path, sheet.name);
            package.replace(&sheet.path, sheet.part.to_xml()?)?;
        }
        if let Some(mut table) = shared.filter(|table| table.is_modified()) {
            log::debug!("Rewriting {}", table.path);
            let xml = table.to_xml()?;
            package.replace(&table.path, xml)?;
        }
        package.to_bytes()
    }
}
