//! The workbook's shared string table (`xl/sharedStrings.xml`).
//!
//! Several cells may point at the same `si` item. Writing a cell whose item
//! is shared clones the item (run formatting included), appends the clone to
//! the table and re-points only that cell, so no other cell changes.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use xlate_core::markup::local_name;
use xlate_core::{Error, Result, SlotId, Token, XmlPart};

/// One `si` item: its token span and the `t` slots that make up its text.
#[derive(Debug, Clone)]
struct StringItem {
    start: usize,
    end: usize,
    slots: Vec<SlotId>,
}

/// Parsed shared string table.
#[derive(Debug)]
pub struct SharedStrings {
    pub(crate) path: String,
    part: XmlPart,
    items: Vec<StringItem>,
    refs: Vec<usize>,
    table_start: Option<usize>,
    table_end: usize,
    appended: usize,
}

impl SharedStrings {
    /// Parse the shared string part at `path`.
    pub fn parse(path: impl Into<String>, xml: &str) -> Result<Self> {
        let path = path.into();
        let part = XmlPart::parse(xml, |name| name == b"t")
            .map_err(|e| Error::ParseError(format!("{}: {}", path, e)))?;

        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut items = Vec::new();
        let mut current: Option<StringItem> = None;
        let mut table_start = None;
        let mut table_end = None;

        for (id, token) in part.tokens().iter().enumerate() {
            match token {
                Token::Markup(Event::Start(e)) => {
                    let name = local_name(e.name().as_ref()).to_vec();
                    match name.as_slice() {
                        b"sst" => table_start = Some(id),
                        b"si" => {
                            current = Some(StringItem {
                                start: id,
                                end: id,
                                slots: Vec::new(),
                            })
                        }
                        _ => {}
                    }
                    stack.push(name);
                }
                Token::Markup(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                    b"si" => items.push(StringItem {
                        start: id,
                        end: id,
                        slots: Vec::new(),
                    }),
                    b"sst" => {
                        table_start = Some(id);
                        table_end = Some(id);
                    }
                    _ => {}
                },
                Token::Markup(Event::End(_)) => {
                    let name = stack.pop().unwrap_or_default();
                    match name.as_slice() {
                        b"si" => {
                            if let Some(mut item) = current.take() {
                                item.end = id;
                                items.push(item);
                            }
                        }
                        b"sst" => table_end = Some(id),
                        _ => {}
                    }
                }
                Token::Text(_) => {
                    if let Some(item) = current.as_mut() {
                        if is_item_text(&stack) {
                            item.slots.push(id);
                        }
                    }
                }
                Token::Markup(_) => {}
            }
        }

        let table_end = table_end
            .ok_or_else(|| Error::ParseError(format!("{}: no <sst> element", path)))?;
        let refs = vec![0; items.len()];
        log::debug!("{}: {} shared strings", path, items.len());

        Ok(Self {
            path,
            part,
            items,
            refs,
            table_start,
            table_end,
            appended: 0,
        })
    }

    /// Number of items in the table.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Plain text of item `index` (phonetic runs excluded).
    pub fn text(&self, index: usize) -> Option<String> {
        let item = self.items.get(index)?;
        Some(rich_text(&self.part, &item.slots))
    }

    /// Record one more cell pointing at `index`.
    pub(crate) fn add_reference(&mut self, index: usize) -> bool {
        match self.refs.get_mut(index) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Set the text of item `index` on behalf of one referencing cell.
    ///
    /// Returns the item the cell must point at afterwards, which differs from
    /// `index` when the item had to be de-shared.
    pub(crate) fn write(&mut self, index: usize, text: &str) -> Option<usize> {
        let current = self.text(index)?;
        if current == text {
            return Some(index);
        }

        let target = if self.refs[index] > 1 {
            self.refs[index] -= 1;
            self.append_copy(index)
        } else {
            index
        };
        let slots = self.items[target].slots.clone();
        set_rich_text(&mut self.part, &slots, text)?;
        Some(target)
    }

    /// Whether the table must be written back.
    pub fn is_modified(&self) -> bool {
        self.appended > 0 || self.part.is_modified()
    }

    /// Serialize the table, updating `uniqueCount` if items were appended.
    pub fn to_xml(&mut self) -> Result<Vec<u8>> {
        if self.appended > 0 {
            if let Some(start) = self.table_start {
                self.update_unique_count(start);
            }
        }
        self.part.to_xml()
    }

    fn append_copy(&mut self, index: usize) -> usize {
        let source = self.items[index].clone();
        let tokens = self.part.clone_range(source.start..=source.end);
        let offset = self.table_end;
        let len = tokens.len();
        self.part.insert_before(offset, tokens);

        self.items.push(StringItem {
            start: offset,
            end: offset + len - 1,
            slots: source
                .slots
                .iter()
                .map(|slot| slot - source.start + offset)
                .collect(),
        });
        self.refs.push(1);
        self.table_end += len;
        self.appended += 1;
        log::debug!("De-shared string {} as {}", index, self.items.len() - 1);
        self.items.len() - 1
    }

    fn update_unique_count(&mut self, start: usize) {
        let Some(Token::Markup(Event::Start(e))) = self.part.tokens().get(start) else {
            return;
        };
        let unique = self.items.len().to_string();
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attributes: Vec<(Vec<u8>, Vec<u8>)> = e
            .attributes()
            .flatten()
            .map(|attr| {
                let value = if attr.key.as_ref() == b"uniqueCount" {
                    unique.as_bytes().to_vec()
                } else {
                    attr.value.to_vec()
                };
                (attr.key.as_ref().to_vec(), value)
            })
            .collect();

        let mut updated = BytesStart::new(name);
        for (key, value) in &attributes {
            updated.push_attribute(Attribute::from((key.as_slice(), value.as_slice())));
        }
        self.part
            .replace_markup(start, Event::Start(updated.into_owned()));
    }
}

/// `t` elements directly under `si`/`is`, or under a rich run `r`.
pub(crate) fn is_item_text(stack: &[Vec<u8>]) -> bool {
    let depth = stack.len();
    if depth < 2 || stack[depth - 1].as_slice() != b"t" {
        return false;
    }
    match stack[depth - 2].as_slice() {
        b"si" | b"is" => true,
        b"r" => depth >= 3 && matches!(stack[depth - 3].as_slice(), b"si" | b"is"),
        _ => false,
    }
}

/// Concatenated text of a rich string's slots.
pub(crate) fn rich_text(part: &XmlPart, slots: &[SlotId]) -> String {
    slots
        .iter()
        .filter_map(|&slot| part.text(slot))
        .collect::<Vec<_>>()
        .concat()
}

/// Put `text` in the first slot and empty the rest; run elements stay.
pub(crate) fn set_rich_text(part: &mut XmlPart, slots: &[SlotId], text: &str) -> Option<()> {
    let (first, rest) = slots.split_first()?;
    part.set_text(*first, text)?;
    for &slot in rest {
        part.set_text(slot, "")?;
    }
    Some(())
}
