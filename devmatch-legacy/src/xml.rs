//! XML import of devices and handlers.
//!
//! Devices are read from either of two layouts:
//!
//! ```xml
//! <devices>
//!   <device id="nokia_6600" parent="nokia_generic" userAgent="Nokia6600/1.0">
//!     <property name="model_name" value="6600"/>
//!   </device>
//! </devices>
//! ```
//!
//! or the WURFL layout, where capabilities are grouped:
//!
//! ```xml
//! <wurfl><devices>
//!   <device id="nokia_6600" fall_back="nokia_generic" user_agent="Nokia6600/1.0">
//!     <group id="product_info"><capability name="model_name" value="6600"/></group>
//!   </device>
//! </devices></wurfl>
//! ```
//!
//! Handlers nest their expressions:
//!
//! ```xml
//! <handlers>
//!   <handler name="nokia" type="regexSegment" confidence="7">
//!     <canHandle><regex pattern="Nokia"><regex pattern="Symbian"/></regex></canHandle>
//!     <cantHandle><regex pattern="Opera"/></cantHandle>
//!     <regexSegments><segment pattern="Nokia(\d+)" weight="10"/></regexSegments>
//!   </handler>
//! </handlers>
//! ```

use crate::{
    DeviceStore, Handler, HandlerKind, LegacyDevice, LegacyImportError, RegexTree, Segment,
};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{path::Path, str::FromStr};

/// Parse devices from either XML layout.
pub fn parse_devices(xml: &str) -> Result<Vec<LegacyDevice>, LegacyImportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut devices = Vec::new();
    let mut current: Option<LegacyDevice> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => handle_device_element(&e, &mut current, &mut devices, false)?,
            Event::Empty(e) => handle_device_element(&e, &mut current, &mut devices, true)?,
            Event::End(e) if e.local_name().as_ref() == b"device" => {
                if let Some(device) = current.take() {
                    devices.push(device);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if current.is_some() {
        return Err(LegacyImportError::invalid("unterminated device element"));
    }
    tracing::debug!("parsed {} legacy devices", devices.len());
    Ok(devices)
}

fn handle_device_element(
    e: &BytesStart<'_>,
    current: &mut Option<LegacyDevice>,
    devices: &mut Vec<LegacyDevice>,
    empty: bool,
) -> Result<(), LegacyImportError> {
    match e.local_name().as_ref() {
        b"device" => {
            if current.is_some() {
                return Err(LegacyImportError::invalid("nested device element"));
            }
            let attrs = attributes(e)?;
            let id = required(&attrs, &["id"], "device")?;
            let mut device = LegacyDevice::new(id);
            if let Some(target) = optional(&attrs, &["userAgent", "user_agent"]) {
                device.set_target(target);
            }
            if let Some(parent) = optional(&attrs, &["parent", "fall_back"]) {
                device.set_parent(parent);
            }
            if empty {
                devices.push(device);
            } else {
                *current = Some(device);
            }
        }
        b"property" | b"capability" => {
            let attrs = attributes(e)?;
            let name = required(&attrs, &["name"], "capability")?;
            let value = optional(&attrs, &["value"]).unwrap_or_default();
            let Some(device) = current.as_mut() else {
                return Err(LegacyImportError::invalid(format!(
                    "capability {name:?} outside of a device"
                )));
            };
            device.push_capability(name, value);
        }
        _ => {}
    }
    Ok(())
}

/// Parse handler definitions.
pub fn parse_handlers(xml: &str) -> Result<Vec<Handler>, LegacyImportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parser = HandlerParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.open(&e, false)?,
            Event::Empty(e) => parser.open(&e, true)?,
            Event::End(e) => parser.close(e.local_name().as_ref())?,
            Event::Eof => break,
            _ => {}
        }
    }
    if parser.draft.is_some() {
        return Err(LegacyImportError::invalid("unterminated handler element"));
    }
    tracing::debug!("parsed {} legacy handlers", parser.handlers.len());
    Ok(parser.handlers)
}

/// Read devices and handlers from files and build the engine.
pub fn load_engine(
    devices: impl AsRef<Path>,
    handlers: impl AsRef<Path>,
) -> Result<crate::LegacyEngine, LegacyImportError> {
    let devices = parse_devices(&std::fs::read_to_string(devices)?)?;
    let handlers = parse_handlers(&std::fs::read_to_string(handlers)?)?;
    Ok(crate::LegacyEngine::new(DeviceStore::new(devices)?, handlers))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Can,
    Cant,
    Segments,
}

#[derive(Debug)]
struct Draft {
    name: String,
    kind: String,
    confidence: u8,
    length: usize,
    tolerance: usize,
    can: Vec<RegexTree>,
    cant: Vec<RegexTree>,
    segments: Vec<Segment>,
}

impl Draft {
    fn finish(self) -> Result<Handler, LegacyImportError> {
        let kind = match self.kind.to_ascii_lowercase().as_str() {
            "editdistance" => HandlerKind::EditDistance,
            "reducedinitialstring" => HandlerKind::ReducedInitialString {
                length: self.length,
                tolerance: self.tolerance,
            },
            "regexsegment" => {
                if self.segments.is_empty() {
                    return Err(LegacyImportError::invalid(format!(
                        "regex segment handler {:?} declares no segments",
                        self.name
                    )));
                }
                HandlerKind::RegexSegment {
                    segments: self.segments,
                }
            }
            other => {
                return Err(LegacyImportError::invalid(format!(
                    "handler {:?} has unknown type {other:?}",
                    self.name
                )));
            }
        };
        let mut handler = Handler::new(self.name, kind, self.confidence);
        for tree in self.can {
            handler.push_can_handle(tree);
        }
        for tree in self.cant {
            handler.push_cant_handle(tree);
        }
        Ok(handler)
    }
}

#[derive(Debug, Default)]
struct HandlerParser {
    handlers: Vec<Handler>,
    draft: Option<Draft>,
    section: Option<Section>,
    regex_stack: Vec<RegexTree>,
}

impl HandlerParser {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), LegacyImportError> {
        match e.local_name().as_ref() {
            b"handler" => {
                if self.draft.is_some() {
                    return Err(LegacyImportError::invalid("nested handler element"));
                }
                let attrs = attributes(e)?;
                let draft = Draft {
                    name: required(&attrs, &["name"], "handler")?.to_owned(),
                    kind: optional(&attrs, &["type"])
                        .unwrap_or("editDistance")
                        .to_owned(),
                    confidence: number(&attrs, "confidence")?.unwrap_or(0),
                    length: number(&attrs, "length")?.unwrap_or(0),
                    tolerance: number(&attrs, "tolerance")?.unwrap_or(0),
                    can: Vec::new(),
                    cant: Vec::new(),
                    segments: Vec::new(),
                };
                if empty {
                    self.handlers.push(draft.finish()?);
                } else {
                    self.draft = Some(draft);
                }
            }
            b"canHandle" => self.enter(Section::Can, empty)?,
            b"cantHandle" => self.enter(Section::Cant, empty)?,
            b"regexSegments" => self.enter(Section::Segments, empty)?,
            b"regex" => {
                let attrs = attributes(e)?;
                let tree = RegexTree::new(required(&attrs, &["pattern"], "regex")?)?;
                if empty {
                    self.attach(tree)?;
                } else {
                    self.regex_stack.push(tree);
                }
            }
            b"segment" => {
                if self.section != Some(Section::Segments) {
                    return Err(LegacyImportError::invalid(
                        "segment outside of regexSegments",
                    ));
                }
                let attrs = attributes(e)?;
                let pattern = required(&attrs, &["pattern"], "segment")?;
                let weight = number(&attrs, "weight")?.unwrap_or(1);
                let segment = Segment::new(pattern, weight)?;
                if let Some(draft) = self.draft.as_mut() {
                    draft.segments.push(segment);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), LegacyImportError> {
        match name {
            b"handler" => {
                if let Some(draft) = self.draft.take() {
                    self.handlers.push(draft.finish()?);
                }
            }
            b"canHandle" | b"cantHandle" | b"regexSegments" => self.section = None,
            b"regex" => {
                if let Some(tree) = self.regex_stack.pop() {
                    self.attach(tree)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn enter(&mut self, section: Section, empty: bool) -> Result<(), LegacyImportError> {
        if self.draft.is_none() {
            return Err(LegacyImportError::invalid(
                "handler section outside of a handler",
            ));
        }
        if !empty {
            self.section = Some(section);
        }
        Ok(())
    }

    fn attach(&mut self, tree: RegexTree) -> Result<(), LegacyImportError> {
        if let Some(parent) = self.regex_stack.last_mut() {
            parent.push_child(tree);
            return Ok(());
        }
        let draft = self.draft.as_mut();
        match (self.section, draft) {
            (Some(Section::Can), Some(draft)) => draft.can.push(tree),
            (Some(Section::Cant), Some(draft)) => draft.cant.push(tree),
            _ => {
                return Err(LegacyImportError::invalid(format!(
                    "regex {:?} outside of canHandle or cantHandle",
                    tree.pattern()
                )));
            }
        }
        Ok(())
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, LegacyImportError> {
    e.attributes()
        .map(|attr| {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn optional<'a>(attrs: &'a [(String, String)], names: &[&str]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| names.contains(&key.as_str()))
        .map(|(_, value)| value.as_str())
}

fn required<'a>(
    attrs: &'a [(String, String)],
    names: &[&str],
    element: &str,
) -> Result<&'a str, LegacyImportError> {
    optional(attrs, names).ok_or_else(|| {
        LegacyImportError::invalid(format!("{element} element without {} attribute", names[0]))
    })
}

fn number<T: FromStr>(
    attrs: &[(String, String)],
    name: &str,
) -> Result<Option<T>, LegacyImportError> {
    optional(attrs, &[name])
        .map(|raw| {
            raw.trim().parse().map_err(|_ignored| {
                LegacyImportError::invalid(format!("attribute {name} is not a number: {raw:?}"))
            })
        })
        .transpose()
}
