//! Trie corpus files: a flattened binary list of legacy devices.
//!
//! A corpus starts with the data set preamble tagged
//! [`TrieV30`](FormatVersion::TrieV30) or [`TrieV32`](FormatVersion::TrieV32),
//! followed by these sections, each headed by its count and byte length:
//!
//! | section      | record                                                      |
//! |--------------|-------------------------------------------------------------|
//! | strings      | `u16` length and UTF-8 bytes, addressed by byte offset      |
//! | devices      | id, target, parent index, first capability, capability count |
//! | capabilities | name, value                                                 |
//! | handlers     | TrieV3.2 only, see below                                    |
//!
//! All integers are little endian `u32` unless noted, absent values are
//! stored as `u32::MAX`. A handler record holds its name, a kind byte, a
//! confidence byte, the reduced initial string length and tolerance, then
//! the can-handle trees, the can't-handle trees and the segments, each list
//! prefixed by a `u16` count. A tree is its pattern followed by its `u16`
//! prefixed children.

use crate::{
    DeviceStore, Handler, HandlerKind, LegacyDevice, LegacyEngine, LegacyImportError, RegexTree,
    Segment,
};
use ahash::HashMap;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use devmatch_data::format::{FormatVersion, PREAMBLE_LEN, Section, SectionHeader};
use std::{
    io::{self, Cursor, Write},
    path::Path,
};

const NONE: u32 = u32::MAX;
const DEVICE_LEN: u64 = 20;
const CAPABILITY_LEN: u64 = 8;
const MAX_TREE_DEPTH: usize = 32;

const EDIT_DISTANCE: u8 = 0;
const REDUCED_INITIAL_STRING: u8 = 1;
const REGEX_SEGMENT: u8 = 2;

/// Devices, and for TrieV3.2 handlers, read from a corpus file.
#[derive(Debug, Clone)]
pub struct Corpus {
    version: FormatVersion,
    devices: Vec<LegacyDevice>,
    handlers: Vec<Handler>,
}

impl Corpus {
    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    #[must_use]
    pub fn devices(&self) -> &[LegacyDevice] {
        &self.devices
    }

    /// Handlers stored in the corpus, always empty for TrieV3.0.
    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Build an engine from the corpus devices and handlers.
    pub fn into_engine(self) -> Result<LegacyEngine, LegacyImportError> {
        Ok(LegacyEngine::new(DeviceStore::new(self.devices)?, self.handlers))
    }

    /// Build an engine from the corpus devices and handlers defined elsewhere.
    pub fn into_engine_with(
        self,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<LegacyEngine, LegacyImportError> {
        Ok(LegacyEngine::new(DeviceStore::new(self.devices)?, handlers))
    }
}

/// Read a corpus from its bytes.
pub fn read_corpus(bytes: &[u8]) -> Result<Corpus, LegacyImportError> {
    let file_len = bytes.len() as u64;
    let mut cursor = Cursor::new(bytes);
    let version = FormatVersion::read_preamble(&mut cursor)?;
    if !version.is_trie() {
        return Err(LegacyImportError::invalid(format!(
            "{version} is not a trie corpus"
        )));
    }

    let strings = Section::read_next(&mut cursor, "strings", None, file_len)?;
    let devices = Section::read_next(&mut cursor, "devices", Some(DEVICE_LEN), file_len)?;
    let capabilities =
        Section::read_next(&mut cursor, "capabilities", Some(CAPABILITY_LEN), file_len)?;
    let handlers = match version {
        FormatVersion::TrieV32 => Some(Section::read_next(
            &mut cursor,
            "handlers",
            None,
            file_len,
        )?),
        _ => None,
    };

    let strings = Strings(content(bytes, &strings)?);
    let capabilities = read_capabilities(content(bytes, &capabilities)?, &strings)?;
    let devices = read_devices(content(bytes, &devices)?, &strings, &capabilities)?;
    let handlers = match handlers {
        Some(section) => read_handlers(content(bytes, &section)?, section.count, &strings)?,
        None => Vec::new(),
    };

    tracing::debug!(
        "read {version} corpus: {} devices, {} handlers",
        devices.len(),
        handlers.len()
    );
    Ok(Corpus {
        version,
        devices,
        handlers,
    })
}

pub fn read_corpus_file(path: impl AsRef<Path>) -> Result<Corpus, LegacyImportError> {
    read_corpus(&std::fs::read(path)?)
}

/// Write devices, and for TrieV3.2 handlers, as a corpus.
///
/// Handlers can not be stored in a TrieV3.0 corpus and are rejected.
pub fn write_corpus<W: Write>(
    writer: &mut W,
    version: FormatVersion,
    store: &DeviceStore,
    handlers: &[Handler],
) -> Result<(), LegacyImportError> {
    match version {
        FormatVersion::TrieV32 => {}
        FormatVersion::TrieV30 if handlers.is_empty() => {}
        FormatVersion::TrieV30 => {
            return Err(LegacyImportError::invalid(
                "TrieV3.0 corpora can not carry handlers",
            ));
        }
        other => {
            return Err(LegacyImportError::invalid(format!(
                "{other} is not a trie corpus format"
            )));
        }
    }

    let mut strings = StringHeap::default();
    let mut device_records = Vec::new();
    let mut capability_records = Vec::new();
    let mut capability_count = 0u32;
    for (idx, device) in store.iter().enumerate() {
        device_records.write_u32::<LittleEndian>(strings.add(device.id())?)?;
        device_records.write_u32::<LittleEndian>(match device.target() {
            Some(target) => strings.add(target)?,
            None => NONE,
        })?;
        device_records.write_u32::<LittleEndian>(match store.parent_of(idx) {
            Some(parent) => to_u32(parent, "device index")?,
            None => NONE,
        })?;
        device_records.write_u32::<LittleEndian>(capability_count)?;
        device_records.write_u32::<LittleEndian>(to_u32(
            device.capabilities().len(),
            "capability count",
        )?)?;
        for (name, value) in device.capabilities() {
            capability_records.write_u32::<LittleEndian>(strings.add(name)?)?;
            capability_records.write_u32::<LittleEndian>(strings.add(value)?)?;
            capability_count += 1;
        }
    }

    let mut handler_records = Vec::new();
    for handler in handlers {
        write_handler(&mut handler_records, handler, &mut strings)?;
    }

    version.write_preamble(writer)?;
    write_section(writer, strings.count, &strings.bytes)?;
    write_section(writer, to_u32(store.len(), "device count")?, &device_records)?;
    write_section(writer, capability_count, &capability_records)?;
    if version == FormatVersion::TrieV32 {
        write_section(writer, to_u32(handlers.len(), "handler count")?, &handler_records)?;
    }
    tracing::debug!(
        "wrote {version} corpus: {} devices, {} handlers",
        store.len(),
        handlers.len()
    );
    Ok(())
}

fn write_section<W: Write>(
    writer: &mut W,
    count: u32,
    records: &[u8],
) -> Result<(), LegacyImportError> {
    SectionHeader {
        count,
        byte_len: to_u32(records.len(), "section length")?,
    }
    .write(writer)?;
    writer.write_all(records)?;
    Ok(())
}

fn write_handler(
    out: &mut Vec<u8>,
    handler: &Handler,
    strings: &mut StringHeap,
) -> Result<(), LegacyImportError> {
    out.write_u32::<LittleEndian>(strings.add(handler.name())?)?;
    let (kind, length, tolerance, segments) = match handler.kind() {
        HandlerKind::EditDistance => (EDIT_DISTANCE, 0, 0, &[][..]),
        HandlerKind::ReducedInitialString { length, tolerance } => {
            (REDUCED_INITIAL_STRING, *length, *tolerance, &[][..])
        }
        HandlerKind::RegexSegment { segments } => (REGEX_SEGMENT, 0, 0, segments.as_slice()),
    };
    out.write_u8(kind)?;
    out.write_u8(handler.confidence())?;
    out.write_u32::<LittleEndian>(to_u32(length, "handler length")?)?;
    out.write_u32::<LittleEndian>(to_u32(tolerance, "handler tolerance")?)?;
    write_trees(out, handler.can_handle_trees(), strings)?;
    write_trees(out, handler.cant_handle_trees(), strings)?;
    out.write_u16::<LittleEndian>(to_u16(segments.len(), "segment count")?)?;
    for segment in segments {
        out.write_u32::<LittleEndian>(strings.add(segment.pattern())?)?;
        out.write_u32::<LittleEndian>(segment.weight())?;
    }
    Ok(())
}

fn write_trees(
    out: &mut Vec<u8>,
    trees: &[RegexTree],
    strings: &mut StringHeap,
) -> Result<(), LegacyImportError> {
    out.write_u16::<LittleEndian>(to_u16(trees.len(), "regex count")?)?;
    for tree in trees {
        out.write_u32::<LittleEndian>(strings.add(tree.pattern())?)?;
        write_trees(out, tree.children(), strings)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct StringHeap {
    bytes: Vec<u8>,
    count: u32,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    fn add(&mut self, value: &str) -> Result<u32, LegacyImportError> {
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }
        let offset = to_u32(self.bytes.len(), "string heap")?;
        self.bytes
            .write_u16::<LittleEndian>(to_u16(value.len(), "string length")?)?;
        self.bytes.extend_from_slice(value.as_bytes());
        self.count += 1;
        self.offsets.insert(value.to_owned(), offset);
        Ok(offset)
    }
}

struct Strings<'a>(&'a [u8]);

impl Strings<'_> {
    fn get(&self, offset: u32) -> Result<&str, LegacyImportError> {
        let start = offset as usize;
        let len = self
            .0
            .get(start..start.saturating_add(2))
            .map(|raw| u16::from_le_bytes([raw[0], raw[1]]) as usize)
            .ok_or_else(|| bad_string(offset))?;
        let raw = self
            .0
            .get(start + 2..start + 2 + len)
            .ok_or_else(|| bad_string(offset))?;
        std::str::from_utf8(raw).map_err(|_ignored| bad_string(offset))
    }

    fn optional(&self, offset: u32) -> Result<Option<&str>, LegacyImportError> {
        if offset == NONE {
            return Ok(None);
        }
        self.get(offset).map(Some)
    }
}

fn bad_string(offset: u32) -> LegacyImportError {
    LegacyImportError::invalid(format!("no valid string at offset {offset}"))
}

fn content<'a>(bytes: &'a [u8], section: &Section) -> Result<&'a [u8], LegacyImportError> {
    usize::try_from(section.start)
        .ok()
        .zip(usize::try_from(section.end()).ok())
        .and_then(|(start, end)| bytes.get(start..end))
        .ok_or_else(|| LegacyImportError::invalid("section outside of the corpus"))
}

fn read_capabilities(
    records: &[u8],
    strings: &Strings<'_>,
) -> Result<Vec<(String, String)>, LegacyImportError> {
    let mut cursor = Cursor::new(records);
    let mut capabilities = Vec::with_capacity(records.len() / CAPABILITY_LEN as usize);
    while (cursor.position() as usize) < records.len() {
        let name = read_u32(&mut cursor, "capabilities")?;
        let value = read_u32(&mut cursor, "capabilities")?;
        capabilities.push((strings.get(name)?.to_owned(), strings.get(value)?.to_owned()));
    }
    Ok(capabilities)
}

fn read_devices(
    records: &[u8],
    strings: &Strings<'_>,
    capabilities: &[(String, String)],
) -> Result<Vec<LegacyDevice>, LegacyImportError> {
    let mut cursor = Cursor::new(records);
    let mut raw = Vec::with_capacity(records.len() / DEVICE_LEN as usize);
    while (cursor.position() as usize) < records.len() {
        let mut fields = [0u32; 5];
        for field in &mut fields {
            *field = read_u32(&mut cursor, "devices")?;
        }
        raw.push(fields);
    }

    raw.iter()
        .map(|&[id, target, parent, caps_start, caps_count]| {
            let mut device = LegacyDevice::new(strings.get(id)?);
            if let Some(target) = strings.optional(target)? {
                device.set_target(target);
            }
            if parent != NONE {
                let parent_id = raw
                    .get(parent as usize)
                    .ok_or_else(|| {
                        LegacyImportError::invalid(format!("parent index {parent} out of range"))
                    })
                    .and_then(|parent| strings.get(parent[0]))?;
                device.set_parent(parent_id);
            }
            let start = caps_start as usize;
            let own = capabilities
                .get(start..start.saturating_add(caps_count as usize))
                .ok_or_else(|| {
                    LegacyImportError::invalid(format!(
                        "capabilities {start}..+{caps_count} out of range"
                    ))
                })?;
            for (name, value) in own {
                device.push_capability(name.as_str(), value.as_str());
            }
            Ok(device)
        })
        .collect()
}

fn read_handlers(
    records: &[u8],
    count: u32,
    strings: &Strings<'_>,
) -> Result<Vec<Handler>, LegacyImportError> {
    let mut cursor = Cursor::new(records);
    let mut handlers = Vec::new();
    for _ in 0..count {
        handlers.push(read_handler(&mut cursor, strings)?);
    }
    if cursor.position() != records.len() as u64 {
        return Err(LegacyImportError::invalid(
            "handler section holds trailing bytes",
        ));
    }
    Ok(handlers)
}

fn read_handler(
    cursor: &mut Cursor<&[u8]>,
    strings: &Strings<'_>,
) -> Result<Handler, LegacyImportError> {
    let name = strings.get(read_u32(cursor, "handlers")?)?;
    let kind = cursor.read_u8().map_err(|err| truncated("handlers", &err))?;
    let confidence = cursor.read_u8().map_err(|err| truncated("handlers", &err))?;
    let length = read_u32(cursor, "handlers")? as usize;
    let tolerance = read_u32(cursor, "handlers")? as usize;
    let can = read_trees(cursor, strings, 0)?;
    let cant = read_trees(cursor, strings, 0)?;
    let segment_count = read_u16(cursor)?;
    let mut segments = Vec::with_capacity(usize::from(segment_count));
    for _ in 0..segment_count {
        let pattern = strings.get(read_u32(cursor, "handlers")?)?;
        let weight = read_u32(cursor, "handlers")?;
        segments.push(Segment::new(pattern, weight)?);
    }

    let kind = match kind {
        EDIT_DISTANCE => HandlerKind::EditDistance,
        REDUCED_INITIAL_STRING => HandlerKind::ReducedInitialString { length, tolerance },
        REGEX_SEGMENT => HandlerKind::RegexSegment { segments },
        other => {
            return Err(LegacyImportError::invalid(format!(
                "handler {name:?} has unknown kind {other}"
            )));
        }
    };
    let mut handler = Handler::new(name, kind, confidence);
    for tree in can {
        handler.push_can_handle(tree);
    }
    for tree in cant {
        handler.push_cant_handle(tree);
    }
    Ok(handler)
}

fn read_trees(
    cursor: &mut Cursor<&[u8]>,
    strings: &Strings<'_>,
    depth: usize,
) -> Result<Vec<RegexTree>, LegacyImportError> {
    if depth > MAX_TREE_DEPTH {
        return Err(LegacyImportError::invalid(format!(
            "regex trees nested deeper than {MAX_TREE_DEPTH}"
        )));
    }
    let count = read_u16(cursor)?;
    let mut trees = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let mut tree = RegexTree::new(strings.get(read_u32(cursor, "handlers")?)?)?;
        for child in read_trees(cursor, strings, depth + 1)? {
            tree.push_child(child);
        }
        trees.push(tree);
    }
    Ok(trees)
}

fn read_u32(cursor: &mut Cursor<&[u8]>, section: &str) -> Result<u32, LegacyImportError> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|err| truncated(section, &err))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, LegacyImportError> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|err| truncated("handlers", &err))
}

fn truncated(section: &str, err: &io::Error) -> LegacyImportError {
    LegacyImportError::invalid(format!("truncated {section} record: {err}"))
}

fn to_u32(value: usize, what: &str) -> Result<u32, LegacyImportError> {
    u32::try_from(value).map_err(|_ignored| LegacyImportError::invalid(format!("{what} too large")))
}

fn to_u16(value: usize, what: &str) -> Result<u16, LegacyImportError> {
    u16::try_from(value).map_err(|_ignored| LegacyImportError::invalid(format!("{what} too large")))
}

/// `true` when `bytes` start with a trie corpus preamble.
#[must_use]
pub fn is_corpus_prefix(bytes: &[u8]) -> bool {
    bytes.len() as u64 >= PREAMBLE_LEN
        && FormatVersion::read_preamble(&mut Cursor::new(bytes)).is_ok_and(FormatVersion::is_trie)
}
