//! Record encoders, the inverse of [`decode`](super::decode).

use super::{
    FormatVersion, HeaderRecord, PatternSection, SectionHeader,
    decode::{
        RawComponent, RawNode, RawProfile, RawProperty, RawRanked, RawSignature, RawValue, Slice,
    },
};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// Raw content of a pattern file.
///
/// Node ranked signature lists are kept inline; they are moved into the
/// integer pool when writing [`FormatVersion::PatternV32`].
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternTables {
    pub(crate) header: HeaderRecord,
    pub(crate) strings: Vec<u8>,
    pub(crate) string_count: u32,
    pub(crate) components: Vec<RawComponent>,
    pub(crate) properties: Vec<RawProperty>,
    pub(crate) values: Vec<RawValue>,
    pub(crate) profiles: Vec<RawProfile>,
    pub(crate) signatures: Vec<RawSignature>,
    pub(crate) ranked_signatures: Vec<u32>,
    pub(crate) nodes: Vec<RawNode>,
    pub(crate) root_nodes: Vec<u32>,
    pub(crate) pool: Vec<u32>,
}

impl PatternTables {
    pub(crate) fn write<W: Write>(&self, version: FormatVersion, writer: &mut W) -> io::Result<()> {
        if !version.is_pattern() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{version} is not a pattern format"),
            ));
        }
        let pooled = version == FormatVersion::PatternV32;
        let mut pool = self.pool.clone();

        let mut buffers: Vec<(u32, Vec<u8>)> = Vec::with_capacity(PatternSection::ALL.len());
        buffers.push((self.string_count, self.strings.clone()));
        buffers.push(records(&self.components, write_component)?);
        buffers.push(records(&self.properties, write_property)?);
        buffers.push(records(&self.values, write_value)?);
        buffers.push(records(&self.profiles, write_profile)?);
        buffers.push(records(&self.signatures, write_signature)?);
        buffers.push(integers(&self.ranked_signatures)?);

        let mut nodes = Vec::new();
        for node in &self.nodes {
            write_node(&mut nodes, node, pooled.then_some(&mut pool))?;
        }
        buffers.push((len_u32(self.nodes.len())?, nodes));
        buffers.push(integers(&self.root_nodes)?);
        buffers.push(integers(&pool)?);

        version.write_preamble(writer)?;
        self.header.write(writer)?;
        for (count, bytes) in buffers {
            SectionHeader {
                count,
                byte_len: len_u32(bytes.len())?,
            }
            .write(writer)?;
            writer.write_all(&bytes)?;
        }
        Ok(())
    }
}

pub(crate) fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_ignored| {
        io::Error::new(io::ErrorKind::InvalidData, "section exceeds 4GiB")
    })
}

pub(crate) fn write_string<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_ignored| {
        io::Error::new(io::ErrorKind::InvalidData, "string exceeds 65535 bytes")
    })?;
    writer.write_u16::<LittleEndian>(len)?;
    writer.write_all(bytes)
}

/// Byte length of a node record.
pub(crate) fn node_len(
    version: FormatVersion,
    ranked: usize,
    children: usize,
    numeric: usize,
) -> u64 {
    let ranked = match version {
        FormatVersion::PatternV31 => 4 + 4 * ranked as u64,
        _ => 8,
    };
    14 + ranked + 5 * children as u64 + 8 * numeric as u64
}

fn records<T>(
    items: &[T],
    write: impl Fn(&mut Vec<u8>, &T) -> io::Result<()>,
) -> io::Result<(u32, Vec<u8>)> {
    let mut buf = Vec::new();
    for item in items {
        write(&mut buf, item)?;
    }
    Ok((len_u32(items.len())?, buf))
}

fn integers(items: &[u32]) -> io::Result<(u32, Vec<u8>)> {
    records(items, |buf, item| buf.write_u32::<LittleEndian>(*item))
}

fn write_slice(buf: &mut Vec<u8>, slice: Slice) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(slice.start)?;
    buf.write_u32::<LittleEndian>(slice.count)
}

fn write_component(buf: &mut Vec<u8>, c: &RawComponent) -> io::Result<()> {
    buf.write_u8(c.id)?;
    buf.write_u32::<LittleEndian>(c.name)?;
    buf.write_u32::<LittleEndian>(c.default_profile)
}

fn write_property(buf: &mut Vec<u8>, p: &RawProperty) -> io::Result<()> {
    buf.write_u8(p.component)?;
    buf.write_u8(p.flags)?;
    buf.write_u32::<LittleEndian>(p.name)?;
    buf.write_u32::<LittleEndian>(p.description)?;
    buf.write_u32::<LittleEndian>(p.default_value)?;
    buf.write_u32::<LittleEndian>(p.first_value)?;
    buf.write_u32::<LittleEndian>(p.value_count)
}

fn write_value(buf: &mut Vec<u8>, v: &RawValue) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(v.property)?;
    buf.write_u32::<LittleEndian>(v.name)?;
    write_slice(buf, v.profiles)
}

fn write_profile(buf: &mut Vec<u8>, p: &RawProfile) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(p.profile_id)?;
    buf.write_u8(p.component)?;
    buf.write_u32::<LittleEndian>(p.parent)?;
    write_slice(buf, p.values)?;
    write_slice(buf, p.signatures)
}

fn write_signature(buf: &mut Vec<u8>, s: &RawSignature) -> io::Result<()> {
    buf.write_u32::<LittleEndian>(s.rank)?;
    buf.write_u16::<LittleEndian>(s.length)?;
    write_slice(buf, s.nodes)?;
    write_slice(buf, s.profiles)
}

fn write_node(buf: &mut Vec<u8>, node: &RawNode, pool: Option<&mut Vec<u32>>) -> io::Result<()> {
    let too_many =
        |what: &str| io::Error::new(io::ErrorKind::InvalidData, format!("too many {what}"));
    buf.write_i16::<LittleEndian>(node.position)?;
    buf.write_u32::<LittleEndian>(node.parent)?;
    buf.write_u32::<LittleEndian>(node.characters)?;
    buf.write_u16::<LittleEndian>(
        u16::try_from(node.children.len()).map_err(|_ignored| too_many("children"))?,
    )?;
    buf.write_u16::<LittleEndian>(
        u16::try_from(node.numeric_children.len())
            .map_err(|_ignored| too_many("numeric children"))?,
    )?;

    let inline = match &node.ranked {
        RawRanked::Inline(items) => items.as_slice(),
        RawRanked::Pooled(_) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "pooled ranked signatures cannot be re-encoded",
            ));
        }
    };
    match pool {
        Some(pool) => {
            let slice = Slice {
                start: len_u32(pool.len())?,
                count: len_u32(inline.len())?,
            };
            pool.extend_from_slice(inline);
            write_slice(buf, slice)?;
        }
        None => {
            buf.write_u32::<LittleEndian>(len_u32(inline.len())?)?;
            for item in inline {
                buf.write_u32::<LittleEndian>(*item)?;
            }
        }
    }

    for child in &node.children {
        buf.write_u8(child.key)?;
        buf.write_u32::<LittleEndian>(child.node.get())?;
    }
    for child in &node.numeric_children {
        buf.write_u32::<LittleEndian>(child.value)?;
        buf.write_u32::<LittleEndian>(child.node.get())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entity::NodeChild, index::NodeOffset};
    use std::io::Cursor;

    fn sample_node() -> RawNode {
        RawNode {
            position: 4,
            parent: 0,
            characters: 12,
            ranked: RawRanked::Inline(vec![0, 3, 7]),
            children: vec![NodeChild {
                key: b' ',
                node: NodeOffset::new(40),
            }],
            numeric_children: Vec::new(),
        }
    }

    #[test]
    fn node_len_matches_encoding() {
        for version in [FormatVersion::PatternV31, FormatVersion::PatternV32] {
            let mut buf = Vec::new();
            let mut pool = Vec::new();
            let node = sample_node();
            write_node(
                &mut buf,
                &node,
                (version == FormatVersion::PatternV32).then_some(&mut pool),
            )
            .unwrap();
            assert_eq!(buf.len() as u64, node_len(version, 3, 1, 0), "{version}");
        }
    }

    #[test]
    fn pooled_node_decodes_to_pool_slice() {
        let mut buf = Vec::new();
        let mut pool = vec![99];
        write_node(&mut buf, &sample_node(), Some(&mut pool)).unwrap();
        assert_eq!(pool, [99, 0, 3, 7]);

        let decoded = RawNode::read(&mut Cursor::new(&buf), true).unwrap();
        assert_eq!(decoded.ranked, RawRanked::Pooled(Slice { start: 1, count: 3 }));
        assert_eq!(decoded.children, sample_node().children);
    }

    #[test]
    fn string_too_long_is_rejected() {
        let mut buf = Vec::new();
        assert!(write_string(&mut buf, &[b'a'; 70_000]).is_err());
        write_string(&mut buf, b"Mozilla").unwrap();
        assert_eq!(&buf[..2], &[7, 0]);
    }
}
