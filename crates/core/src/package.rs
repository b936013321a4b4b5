//! OPC package (ZIP container) access for .pptx and .xlsx files.
//!
//! The original archive bytes are kept for the whole run. Parts that the
//! adapters rewrite are stored separately and substituted on
//! serialization; every other entry is raw-copied, so untouched parts come
//! out byte-identical.

use crate::error::{Error, Result};
use crate::markup::{attribute, local_name};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A ZIP-based office package.
pub struct Package {
    data: Vec<u8>,
    names: Vec<String>,
    replaced: HashMap<String, Vec<u8>>,
}

impl Package {
    /// Open a package from its raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data.as_slice()))
            .map_err(|e| Error::ParseError(format!("Failed to open ZIP: {}", e)))?;
        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| Error::ParseError(format!("Bad ZIP entry {}: {}", index, e)))?;
            names.push(entry.name().to_string());
        }
        drop(archive);
        Ok(Self {
            data,
            names,
            replaced: HashMap::new(),
        })
    }

    /// Build a package from `(name, content)` pairs, in order.
    ///
    /// Entries get a fixed timestamp so the output is reproducible.
    pub fn from_parts<I, N, B>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: AsRef<[u8]>,
    {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        for (name, content) in parts {
            let name = name.into();
            writer
                .start_file(name.clone(), options)
                .map_err(|e| Error::PackageError(format!("Failed to add '{}': {}", name, e)))?;
            writer.write_all(content.as_ref())?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| Error::PackageError(format!("Failed to finish ZIP: {}", e)))?;
        Self::from_bytes(cursor.into_inner())
    }

    /// Entry names in archive order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the package has an entry called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Read a part as UTF-8 text. A missing part is a parse error.
    pub fn read_string(&self, name: &str) -> Result<String> {
        self.read_optional_string(name)?
            .ok_or_else(|| Error::ParseError(format!("Part not found in package: '{}'", name)))
    }

    /// Read a part as UTF-8 text if it exists.
    pub fn read_optional_string(&self, name: &str) -> Result<Option<String>> {
        if let Some(replaced) = self.replaced.get(name) {
            return String::from_utf8(replaced.clone())
                .map(Some)
                .map_err(|e| Error::ParseError(format!("Part '{}' is not UTF-8: {}", name, e)));
        }
        if !self.contains(name) {
            return Ok(None);
        }

        let mut archive = self.archive()?;
        let mut file = archive
            .by_name(name)
            .map_err(|e| Error::ParseError(format!("Failed to open '{}': {}", name, e)))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ParseError(format!("Failed to read '{}': {}", name, e)))?;
        Ok(Some(content))
    }

    /// Substitute new content for an existing part.
    pub fn replace(&mut self, name: &str, content: Vec<u8>) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::PackageError(format!(
                "Cannot replace missing part '{}'",
                name
            )));
        }
        self.replaced.insert(name.to_string(), content);
        Ok(())
    }

    /// Serialize the package, keeping entry order and timestamps.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.replaced.is_empty() {
            return Ok(self.data.clone());
        }

        let mut archive = self.archive()?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.data.len())));

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| Error::PackageError(format!("Failed to read entry {}: {}", index, e)))?;
            let name = entry.name().to_string();

            match self.replaced.get(&name) {
                Some(content) => {
                    let options = FileOptions::default()
                        .compression_method(CompressionMethod::Deflated)
                        .last_modified_time(entry.last_modified());
                    drop(entry);
                    log::debug!("Writing rewritten part {}", name);
                    writer.start_file(name.clone(), options).map_err(|e| {
                        Error::PackageError(format!("Failed to write '{}': {}", name, e))
                    })?;
                    writer.write_all(content)?;
                }
                None => {
                    writer.raw_copy_file(entry).map_err(|e| {
                        Error::PackageError(format!("Failed to copy '{}': {}", name, e))
                    })?;
                }
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::PackageError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(self.data.as_slice()))
            .map_err(|e| Error::ParseError(format!("Failed to open ZIP: {}", e)))
    }
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id (`rId3`).
    pub id: String,
    /// Relationship type URI.
    pub rel_type: String,
    /// Target, relative to the source part's directory.
    pub target: String,
    /// Whether the target points outside the package.
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type URI ends with `/{kind}`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last == kind)
    }
}

/// Parse the relationships of a `.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml.strip_prefix('\u{feff}').unwrap_or(xml));
    reader.trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                relationships.push(Relationship {
                    id: attribute(e, b"Id").unwrap_or_default(),
                    rel_type: attribute(e, b"Type").unwrap_or_default(),
                    target: attribute(e, b"Target").unwrap_or_default(),
                    external: attribute(e, b"TargetMode").as_deref() == Some("External"),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Path of the `.rels` part for `part` (`ppt/presentation.xml` →
/// `ppt/_rels/presentation.xml.rels`).
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns the `.rels`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Read and parse the relationships owned by `part`; missing means none.
pub fn part_relationships(package: &Package, part: &str) -> Result<Vec<Relationship>> {
    match package.read_optional_string(&rels_path_for(part))? {
        Some(xml) => parse_relationships(&xml),
        None => Ok(Vec::new()),
    }
}
