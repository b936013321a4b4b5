//! Lossless XML token stream with replaceable text slots.
//!
//! A part is parsed into a flat list of `quick-xml` events. The character
//! content of selected elements (`<a:t>`, `<t>`, `<v>`, ...) is captured in
//! a [`TextSlot`] so it can be read and replaced. Everything else is kept as
//! the original event and written back verbatim, so attributes, namespaces
//! and whitespace survive a round trip untouched.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Index of a token inside an [`XmlPart`].
pub type SlotId = usize;

/// One entry in the token stream.
#[derive(Debug, Clone)]
pub enum Token {
    /// Any event that is not slot content.
    Markup(Event<'static>),
    /// Character content of a slot element.
    Text(TextSlot),
}

/// Replaceable character content of one element.
#[derive(Debug, Clone, Default)]
pub struct TextSlot {
    raw: Vec<Event<'static>>,
    text: String,
    modified: bool,
}

impl TextSlot {
    /// The unescaped text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text was replaced since parsing.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// A parsed XML part.
#[derive(Debug, Clone)]
pub struct XmlPart {
    tokens: Vec<Token>,
}

impl XmlPart {
    /// Parse `xml`, capturing the content of every element whose local name
    /// satisfies `is_slot`.
    pub fn parse(xml: &str, is_slot: impl Fn(&[u8]) -> bool) -> Result<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        let mut tokens = Vec::new();
        let mut open_slot: Option<SlotId> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| {
                    Error::ParseError(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    ))
                })?
                .into_owned();

            match event {
                Event::Eof => break,
                Event::Text(ref e) if open_slot.is_some() => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::ParseError(format!("Bad text content: {}", e)))?
                        .into_owned();
                    if let Some(Token::Text(slot)) = open_slot.and_then(|id| tokens.get_mut(id)) {
                        slot.text.push_str(&text);
                        slot.raw.push(event);
                    }
                }
                Event::CData(ref e) if open_slot.is_some() => {
                    let text = String::from_utf8_lossy(e).into_owned();
                    if let Some(Token::Text(slot)) = open_slot.and_then(|id| tokens.get_mut(id)) {
                        slot.text.push_str(&text);
                        slot.raw.push(event);
                    }
                }
                Event::Start(ref e) => {
                    let captures = is_slot(local_name(e.name().as_ref()));
                    tokens.push(Token::Markup(event));
                    open_slot = if captures {
                        tokens.push(Token::Text(TextSlot::default()));
                        Some(tokens.len() - 1)
                    } else {
                        None
                    };
                }
                Event::Comment(_) | Event::PI(_) if open_slot.is_some() => {
                    if let Some(Token::Text(slot)) = open_slot.and_then(|id| tokens.get_mut(id)) {
                        slot.raw.push(event);
                    }
                }
                other => {
                    open_slot = None;
                    tokens.push(Token::Markup(other));
                }
            }
        }

        Ok(Self { tokens })
    }

    /// All tokens in document order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Text of a slot, or `None` if `id` is not a slot.
    pub fn text(&self, id: SlotId) -> Option<&str> {
        match self.tokens.get(id) {
            Some(Token::Text(slot)) => Some(slot.text()),
            _ => None,
        }
    }

    /// Replace the text of a slot.
    ///
    /// Returns `Some(true)` if the text changed, `Some(false)` if it was
    /// already identical, and `None` if `id` is not a slot.
    pub fn set_text(&mut self, id: SlotId, text: &str) -> Option<bool> {
        match self.tokens.get_mut(id) {
            Some(Token::Text(slot)) => {
                if slot.text == text {
                    return Some(false);
                }
                slot.text = text.to_string();
                slot.modified = true;
                Some(true)
            }
            _ => None,
        }
    }

    /// Copy of the tokens in `range`.
    pub fn clone_range(&self, range: std::ops::RangeInclusive<usize>) -> Vec<Token> {
        self.tokens
            .get(range)
            .map(|tokens| tokens.to_vec())
            .unwrap_or_default()
    }

    /// Insert tokens before `index`. Token ids at or after `index` shift.
    pub fn insert_before(&mut self, index: usize, tokens: Vec<Token>) {
        let index = index.min(self.tokens.len());
        self.tokens.splice(index..index, tokens);
    }

    /// Replace a markup token (e.g. a start tag with updated attributes).
    pub fn replace_markup(&mut self, index: usize, event: Event<'static>) -> bool {
        match self.tokens.get_mut(index) {
            Some(token @ Token::Markup(_)) => {
                *token = Token::Markup(event);
                true
            }
            _ => false,
        }
    }

    /// Whether any slot was replaced.
    pub fn is_modified(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Text(slot) if slot.is_modified()))
    }

    /// Serialize back to XML bytes.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for token in &self.tokens {
            match token {
                Token::Markup(event) => write_event(&mut writer, event)?,
                Token::Text(slot) if slot.is_modified() => {
                    if !slot.text.is_empty() {
                        write_event(&mut writer, &Event::Text(BytesText::new(&slot.text)))?;
                    }
                }
                Token::Text(slot) => {
                    for event in &slot.raw {
                        write_event(&mut writer, event)?;
                    }
                }
            }
        }
        Ok(writer.into_inner())
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: &Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::PackageError(format!("Failed to write XML: {}", e)))
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Value of the attribute whose qualified name is exactly `key`.
pub fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Value of a prefixed attribute (`r:id`, `x:foo`) with the given local name.
pub fn prefixed_attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| {
            let key = attr.key.as_ref();
            key.contains(&b':') && local_name(key) == local
        })
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:p xmlns:a="urn:a"><a:r><a:rPr lang="ja-JP" sz="1800" b="1"/><a:t>猫 &amp; 犬</a:t></a:r><a:r><a:t></a:t></a:r><a:br/></a:p>"#;

    fn slots(part: &XmlPart) -> Vec<SlotId> {
        part.tokens()
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, Token::Text(_)))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_unmodified_round_trip_is_exact() {
        let part = XmlPart::parse(SAMPLE, |name| name == b"t").unwrap();
        assert_eq!(part.to_xml().unwrap(), SAMPLE.as_bytes());
        assert!(!part.is_modified());
    }

    #[test]
    fn test_slot_text_and_replacement() {
        let mut part = XmlPart::parse(SAMPLE, |name| name == b"t").unwrap();
        let ids = slots(&part);
        assert_eq!(ids.len(), 2);
        assert_eq!(part.text(ids[0]), Some("猫 & 犬"));
        assert_eq!(part.text(ids[1]), Some(""));

        assert_eq!(part.set_text(ids[0], "猫 & 犬"), Some(false));
        assert_eq!(part.set_text(ids[0], "cats <& dogs>"), Some(true));
        assert_eq!(part.set_text(0, "nope"), None);

        let xml = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert!(xml.contains(r#"<a:rPr lang="ja-JP" sz="1800" b="1"/>"#));
        assert!(xml.contains("<a:t>cats &lt;&amp; dogs&gt;</a:t>"));
        assert!(part.is_modified());
    }

    #[test]
    fn test_comment_inside_text_keeps_slot_open() {
        let xml = r#"<a:r xmlns:a="urn:a"><a:t>猫<!--x-->犬<?pi y?>鳥</a:t></a:r>"#;
        let mut part = XmlPart::parse(xml, |name| name == b"t").unwrap();
        let ids = slots(&part);
        assert_eq!(ids.len(), 1);
        assert_eq!(part.text(ids[0]), Some("猫犬鳥"));
        assert_eq!(part.to_xml().unwrap(), xml.as_bytes());

        part.set_text(ids[0], "cat dog bird").unwrap();
        let written = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert_eq!(written, r#"<a:r xmlns:a="urn:a"><a:t>cat dog bird</a:t></a:r>"#);
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let result = XmlPart::parse("<a><b></a>", |_| false);
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_attributes() {
        let mut reader = Reader::from_str(r#"<p:sldId id="256" r:id="rId2"/>"#);
        let Ok(Event::Empty(e)) = reader.read_event() else {
            panic!("expected empty element");
        };
        assert_eq!(attribute(&e, b"id").as_deref(), Some("256"));
        assert_eq!(prefixed_attribute(&e, b"id").as_deref(), Some("rId2"));
        assert_eq!(attribute(&e, b"missing"), None);
    }
}
