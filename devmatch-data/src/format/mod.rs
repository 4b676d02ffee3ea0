//! Binary layout of data set files.
//!
//! Every file starts with a preamble: the [`MAGIC`] bytes, a format tag
//! ([`PATTERN_TAG`] or [`TRIE_TAG`]), a major and a minor version and one
//! reserved byte. The version is checked before anything else is read.
//!
//! Pattern files continue with a fixed header record followed by the
//! sections listed in [`PatternSection::ALL`], in that order. Each section
//! starts with its entity count and byte length, both `u32` little endian.
//! Sections of fixed length records are addressed by index, sections of
//! variable length records (strings and nodes) by byte offset.

use crate::{DataSetError, error::UnsupportedVersionError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom, Write},
    str::FromStr,
};

pub(crate) mod decode;
pub(crate) mod encode;

/// First bytes of every data set file.
pub const MAGIC: [u8; 4] = *b"DMDS";

pub(crate) const PATTERN_TAG: u8 = 0;
pub(crate) const TRIE_TAG: u8 = 1;

/// Byte length of the preamble.
pub const PREAMBLE_LEN: u64 = 8;

/// Byte length of a section header.
pub const SECTION_HEADER_LEN: u64 = 8;

/// Supported data set formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatVersion {
    /// Pattern index, ranked signature indexes stored inline in nodes.
    PatternV31,
    /// Pattern index, ranked signature indexes stored in the integer pool.
    PatternV32,
    /// Legacy device corpus.
    TrieV30,
    /// Legacy device corpus with handler definitions.
    TrieV32,
}

impl FormatVersion {
    pub const ALL: [Self; 4] = [Self::PatternV31, Self::PatternV32, Self::TrieV30, Self::TrieV32];

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::PatternV31 | Self::PatternV32 => PATTERN_TAG,
            Self::TrieV30 | Self::TrieV32 => TRIE_TAG,
        }
    }

    #[must_use]
    pub const fn major(self) -> u8 {
        3
    }

    #[must_use]
    pub const fn minor(self) -> u8 {
        match self {
            Self::PatternV31 => 1,
            Self::PatternV32 | Self::TrieV32 => 2,
            Self::TrieV30 => 0,
        }
    }

    #[must_use]
    pub const fn is_pattern(self) -> bool {
        self.tag() == PATTERN_TAG
    }

    /// Node ranked signature indexes are stored in the integer pool.
    #[must_use]
    pub const fn stores_ranked_in_pool(self) -> bool {
        matches!(self, Self::PatternV32)
    }

    #[must_use]
    pub const fn is_trie(self) -> bool {
        self.tag() == TRIE_TAG
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternV31 => "PatternV3.1",
            Self::PatternV32 => "PatternV3.2",
            Self::TrieV30 => "TrieV3.0",
            Self::TrieV32 => "TrieV3.2",
        }
    }

    /// Map the raw preamble fields onto a supported version.
    pub fn from_parts(tag: u8, major: u8, minor: u8) -> Result<Self, UnsupportedVersionError> {
        Self::ALL
            .into_iter()
            .find(|v| v.tag() == tag && v.major() == major && v.minor() == minor)
            .ok_or(UnsupportedVersionError { tag, major, minor })
    }

    /// Read and validate the preamble.
    pub fn read_preamble<R: Read + ?Sized>(reader: &mut R) -> Result<Self, DataSetError> {
        let mut preamble = [0u8; PREAMBLE_LEN as usize];
        reader
            .read_exact(&mut preamble)
            .map_err(|err| DataSetError::truncated("preamble", err))?;
        if preamble[..4] != MAGIC {
            return Err(DataSetError::parse("preamble", "not a data set file"));
        }
        let version = Self::from_parts(preamble[4], preamble[5], preamble[6])?;
        tracing::trace!("data set preamble: {version}");
        Ok(version)
    }

    pub fn write_preamble<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[self.tag(), self.major(), self.minor(), 0])
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl FromStr for FormatVersion {
    type Err = UnsupportedVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '.')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "v31" | "patternv31" => Ok(Self::PatternV31),
            "v32" | "patternv32" => Ok(Self::PatternV32),
            "triev30" => Ok(Self::TrieV30),
            "triev32" => Ok(Self::TrieV32),
            _ => Err(UnsupportedVersionError {
                tag: u8::MAX,
                major: 0,
                minor: 0,
            }),
        }
    }
}

/// Count and byte length of one section, as stored in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionHeader {
    pub count: u32,
    pub byte_len: u32,
}

impl SectionHeader {
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            count: reader.read_u32::<LittleEndian>()?,
            byte_len: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.count)?;
        writer.write_u32::<LittleEndian>(self.byte_len)
    }
}

/// Located section: its header and the absolute position of its first record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Section {
    pub start: u64,
    pub count: u32,
    pub byte_len: u32,
}

impl Section {
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + u64::from(self.byte_len)
    }

    /// Absolute position of the fixed length record at `index`.
    #[must_use]
    pub fn record(&self, index: u32, record_len: u64) -> Option<u64> {
        (index < self.count).then(|| self.start + u64::from(index) * record_len)
    }

    /// Absolute position of the variable length record at `offset`.
    #[must_use]
    pub fn at_offset(&self, offset: u32) -> Option<u64> {
        (offset < self.byte_len).then(|| self.start + u64::from(offset))
    }

    /// Read the next section header and skip over its content.
    ///
    /// `record_len` is checked against the byte length for sections of
    /// fixed length records. Variable length records take at least one byte
    /// each, so their count can never exceed the byte length.
    pub fn read_next<R: Read + Seek + ?Sized>(
        reader: &mut R,
        name: &'static str,
        record_len: Option<u64>,
        file_len: u64,
    ) -> Result<Self, DataSetError> {
        let header =
            SectionHeader::read(reader).map_err(|err| DataSetError::truncated(name, err))?;
        let start = reader.stream_position().map_err(DataSetError::Io)?;
        let section = Self {
            start,
            count: header.count,
            byte_len: header.byte_len,
        };
        if section.end() > file_len {
            return Err(DataSetError::parse(
                name,
                format!(
                    "section of {} bytes exceeds file length {file_len}",
                    header.byte_len
                ),
            ));
        }
        match record_len {
            Some(record_len)
                if u64::from(header.count) * record_len != u64::from(header.byte_len) =>
            {
                return Err(DataSetError::parse(
                    name,
                    format!(
                        "{} records of {record_len} bytes do not fill {} bytes",
                        header.count, header.byte_len
                    ),
                ));
            }
            None if header.count > header.byte_len => {
                return Err(DataSetError::parse(
                    name,
                    format!(
                        "{} records cannot fit in {} bytes",
                        header.count, header.byte_len
                    ),
                ));
            }
            _ => {}
        }
        reader
            .seek(SeekFrom::Start(section.end()))
            .map_err(DataSetError::Io)?;
        tracing::trace!(
            "section {name}: {} entries in {} bytes at {start}",
            header.count,
            header.byte_len
        );
        Ok(section)
    }
}

/// Sections of a pattern file, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSection {
    Strings,
    Components,
    Properties,
    Values,
    Profiles,
    Signatures,
    RankedSignatures,
    Nodes,
    RootNodes,
    IntegerPool,
}

impl PatternSection {
    pub const ALL: [Self; 10] = [
        Self::Strings,
        Self::Components,
        Self::Properties,
        Self::Values,
        Self::Profiles,
        Self::Signatures,
        Self::RankedSignatures,
        Self::Nodes,
        Self::RootNodes,
        Self::IntegerPool,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strings => "strings",
            Self::Components => "components",
            Self::Properties => "properties",
            Self::Values => "values",
            Self::Profiles => "profiles",
            Self::Signatures => "signatures",
            Self::RankedSignatures => "ranked signatures",
            Self::Nodes => "nodes",
            Self::RootNodes => "root nodes",
            Self::IntegerPool => "integer pool",
        }
    }

    /// Byte length of one record, `None` for variable length records.
    #[must_use]
    pub fn record_len(&self) -> Option<u64> {
        match self {
            Self::Strings | Self::Nodes => None,
            Self::Components => Some(decode::COMPONENT_LEN),
            Self::Properties => Some(decode::PROPERTY_LEN),
            Self::Values => Some(decode::VALUE_LEN),
            Self::Profiles => Some(decode::PROFILE_LEN),
            Self::Signatures => Some(decode::SIGNATURE_LEN),
            Self::RankedSignatures | Self::RootNodes | Self::IntegerPool => Some(4),
        }
    }
}

/// Fixed header record of a pattern file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    pub name: u32,
    pub published: u32,
    pub lowest_character: u8,
    pub highest_character: u8,
    pub max_signature_length: u16,
}

impl HeaderRecord {
    pub const LEN: u64 = 12;

    pub fn read<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            name: reader.read_u32::<LittleEndian>()?,
            published: reader.read_u32::<LittleEndian>()?,
            lowest_character: reader.read_u8()?,
            highest_character: reader.read_u8()?,
            max_signature_length: reader.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.name)?;
        writer.write_u32::<LittleEndian>(self.published)?;
        writer.write_u8(self.lowest_character)?;
        writer.write_u8(self.highest_character)?;
        writer.write_u16::<LittleEndian>(self.max_signature_length)
    }
}

/// Located preamble, header and sections of a pattern file.
#[derive(Debug, Clone)]
pub struct PatternLayout {
    pub version: FormatVersion,
    pub header: HeaderRecord,
    sections: [Section; PatternSection::ALL.len()],
}

impl PatternLayout {
    /// Read the layout of a pattern file, validating every section
    /// against the length of the file.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self, DataSetError> {
        let file_len = reader.seek(SeekFrom::End(0)).map_err(DataSetError::Io)?;
        reader.seek(SeekFrom::Start(0)).map_err(DataSetError::Io)?;

        let version = FormatVersion::read_preamble(reader)?;
        if !version.is_pattern() {
            return Err(DataSetError::parse(
                "preamble",
                format!("{version} is not a pattern data set"),
            ));
        }
        let header =
            HeaderRecord::read(reader).map_err(|err| DataSetError::truncated("header", err))?;

        let mut sections = [Section::default(); PatternSection::ALL.len()];
        for (slot, kind) in sections.iter_mut().zip(PatternSection::ALL) {
            *slot = Section::read_next(reader, kind.as_str(), kind.record_len(), file_len)?;
        }

        Ok(Self {
            version,
            header,
            sections,
        })
    }

    #[must_use]
    pub fn section(&self, kind: PatternSection) -> Section {
        self.sections[kind as usize]
    }
}
