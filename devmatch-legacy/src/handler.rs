//! Handlers of the legacy matching path.
//!
//! A [`Handler`] owns the devices whose target strings it can handle and
//! scores them against an incoming target with one of the
//! [`HandlerKind`] strategies. Lower scores are better.

use crate::{DeviceStore, LegacyImportError};
use devmatch_core::algo::{DISTANCE_OVER_LIMIT, edit_distance};
use regex::Regex;
use std::sync::Arc;

/// A regular expression with optional nested expressions.
///
/// The tree matches when its own expression matches and, if it has
/// children, at least one child matches too.
#[derive(Debug, Clone)]
pub struct RegexTree {
    regex: Regex,
    children: Vec<RegexTree>,
}

impl RegexTree {
    pub fn new(pattern: &str) -> Result<Self, LegacyImportError> {
        Ok(Self {
            regex: compile(pattern)?,
            children: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: Self) -> &mut Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        self.regex.is_match(target)
            && (self.children.is_empty() || self.children.iter().any(|child| child.matches(target)))
    }
}

/// Weighted part of a target string, extracted with a regular expression.
///
/// The value is the first capture group when the expression has one, the
/// whole match otherwise.
#[derive(Debug, Clone)]
pub struct Segment {
    regex: Regex,
    weight: u32,
}

impl Segment {
    pub fn new(pattern: &str, weight: u32) -> Result<Self, LegacyImportError> {
        Ok(Self {
            regex: compile(pattern)?,
            weight,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    #[must_use]
    pub fn value<'t>(&self, target: &'t str) -> Option<&'t str> {
        let captures = self.regex.captures(target)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|found| found.as_str())
    }
}

/// Scoring strategy of a [`Handler`].
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Edit distance between the target and the device target.
    EditDistance,
    /// Edit distance between the first `length` bytes of both, accepted up
    /// to `tolerance`.
    ReducedInitialString { length: usize, tolerance: usize },
    /// Total weight of the segments whose values differ.
    RegexSegment { segments: Vec<Segment> },
}

impl HandlerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EditDistance => "editDistance",
            Self::ReducedInitialString { .. } => "reducedInitialString",
            Self::RegexSegment { .. } => "regexSegment",
        }
    }
}

/// A device scored by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scored {
    pub(crate) device: usize,
    pub(crate) score: usize,
}

#[derive(Debug, Clone)]
struct Owned {
    device: usize,
    target: Arc<str>,
    segments: Vec<Option<Box<str>>>,
}

/// One strategy of the legacy path, with the devices assigned to it.
#[derive(Debug, Clone)]
pub struct Handler {
    name: Arc<str>,
    kind: HandlerKind,
    confidence: u8,
    can_handle: Vec<RegexTree>,
    cant_handle: Vec<RegexTree>,
    devices: Vec<Owned>,
}

impl Handler {
    pub fn new(name: impl Into<Arc<str>>, kind: HandlerKind, confidence: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            confidence,
            can_handle: Vec::new(),
            cant_handle: Vec::new(),
            devices: Vec::new(),
        }
    }

    /// Add an expression target strings must match.
    #[must_use]
    pub fn with_can_handle(mut self, tree: RegexTree) -> Self {
        self.can_handle.push(tree);
        self
    }

    /// Add an expression target strings must not match.
    #[must_use]
    pub fn with_cant_handle(mut self, tree: RegexTree) -> Self {
        self.cant_handle.push(tree);
        self
    }

    pub fn push_can_handle(&mut self, tree: RegexTree) -> &mut Self {
        self.can_handle.push(tree);
        self
    }

    pub fn push_cant_handle(&mut self, tree: RegexTree) -> &mut Self {
        self.cant_handle.push(tree);
        self
    }

    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Weight of this handler's results against those of other handlers.
    #[must_use]
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    #[must_use]
    pub fn can_handle_trees(&self) -> &[RegexTree] {
        &self.can_handle
    }

    #[must_use]
    pub fn cant_handle_trees(&self) -> &[RegexTree] {
        &self.cant_handle
    }

    /// Amount of devices assigned by [`Handler::assign`].
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// `true` if every can-handle expression and no can't-handle
    /// expression matches.
    #[must_use]
    pub fn can_handle(&self, target: &str) -> bool {
        self.can_handle.iter().all(|tree| tree.matches(target))
            && !self.cant_handle.iter().any(|tree| tree.matches(target))
    }

    /// Take ownership of every device with a target this handler can handle.
    pub fn assign(&mut self, store: &DeviceStore) {
        self.devices = store
            .iter()
            .enumerate()
            .filter_map(|(device, info)| {
                let target = info.target()?;
                self.can_handle(target).then(|| Owned {
                    device,
                    target: Arc::from(target),
                    segments: self.segment_values(target),
                })
            })
            .collect();
        tracing::trace!(
            "legacy handler {}: {} devices assigned",
            self.name,
            self.devices.len()
        );
    }

    fn segment_values(&self, target: &str) -> Vec<Option<Box<str>>> {
        match &self.kind {
            HandlerKind::RegexSegment { segments } => segments
                .iter()
                .map(|segment| segment.value(target).map(Box::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Devices sharing the lowest score for `target`.
    pub(crate) fn score(&self, target: &str) -> Vec<Scored> {
        let mut best = Vec::new();
        let mut limit = DISTANCE_OVER_LIMIT - 1;
        for owned in &self.devices {
            let Some(score) = self.score_device(owned, target, limit) else {
                continue;
            };
            if score < limit || best.is_empty() {
                best.clear();
                limit = score;
            }
            if score == limit {
                best.push(Scored {
                    device: owned.device,
                    score,
                });
            }
        }
        best
    }

    fn score_device(&self, owned: &Owned, target: &str, limit: usize) -> Option<usize> {
        match &self.kind {
            HandlerKind::EditDistance => {
                let distance = edit_distance(target, &*owned.target, limit);
                (distance != DISTANCE_OVER_LIMIT).then_some(distance)
            }
            HandlerKind::ReducedInitialString { length, tolerance } => {
                let a = prefix(target.as_bytes(), *length);
                let b = prefix(owned.target.as_bytes(), *length);
                let distance = edit_distance(a, b, limit.min(*tolerance));
                (distance != DISTANCE_OVER_LIMIT).then_some(distance)
            }
            HandlerKind::RegexSegment { segments } => {
                let mut total = 0usize;
                let mut agreeing = 0usize;
                for (segment, device_value) in segments.iter().zip(&owned.segments) {
                    let weight = segment.weight() as usize;
                    total += weight;
                    if let (Some(found), Some(expected)) = (segment.value(target), device_value)
                        && found == &**expected
                    {
                        agreeing += weight;
                    }
                }
                (agreeing > 0).then(|| total - agreeing)
            }
        }
    }
}

fn prefix(bytes: &[u8], length: usize) -> &[u8] {
    bytes.get(..length).unwrap_or(bytes)
}

fn compile(pattern: &str) -> Result<Regex, LegacyImportError> {
    Regex::new(pattern).map_err(|source| LegacyImportError::Regex {
        pattern: pattern.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LegacyDevice;

    fn store() -> DeviceStore {
        DeviceStore::new([
            LegacyDevice::new("nokia_6600").with_target("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s"),
            LegacyDevice::new("nokia_6630").with_target("Nokia6630/1.0 (2.39.15) SymbianOS/8.0"),
            LegacyDevice::new("sony_k750").with_target("SonyEricssonK750i/R1CA Browser/SEMC"),
            LegacyDevice::new("generic"),
        ])
        .unwrap()
    }

    #[test]
    fn regex_tree_requires_a_matching_child() {
        let tree = RegexTree::new("Nokia")
            .unwrap()
            .with_child(RegexTree::new("Symbian").unwrap())
            .with_child(RegexTree::new("Series60").unwrap());
        assert!(tree.matches("Nokia6600 SymbianOS"));
        assert!(tree.matches("Nokia N70 Series60"));
        assert!(!tree.matches("Nokia 3310"));
        assert!(!tree.matches("SymbianOS"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = RegexTree::new("Nokia(").unwrap_err();
        assert!(matches!(err, LegacyImportError::Regex { .. }));
    }

    #[test]
    fn can_and_cant_handle() {
        let handler = Handler::new("nokia", HandlerKind::EditDistance, 5)
            .with_can_handle(RegexTree::new("^Nokia").unwrap())
            .with_cant_handle(RegexTree::new("Opera").unwrap());
        assert!(handler.can_handle("Nokia6600/1.0"));
        assert!(!handler.can_handle("Nokia6600/1.0 Opera/8"));
        assert!(!handler.can_handle("SonyEricssonK750i"));
    }

    #[test]
    fn edit_distance_keeps_closest_device() {
        let store = store();
        let mut handler = Handler::new("nokia", HandlerKind::EditDistance, 5)
            .with_can_handle(RegexTree::new("^Nokia").unwrap());
        handler.assign(&store);
        assert_eq!(handler.device_count(), 2);

        let scored = handler.score("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s Profile/MIDP-2.0");
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].device, store.find("nokia_6600").unwrap());
        assert!(scored[0].score > 0);
    }

    #[test]
    fn reduced_initial_string_within_tolerance() {
        let store = store();
        let mut handler = Handler::new(
            "oem",
            HandlerKind::ReducedInitialString {
                length: 9,
                tolerance: 1,
            },
            3,
        );
        handler.assign(&store);
        assert_eq!(handler.device_count(), 3);

        let scored = handler.score("Nokia6601/9.9");
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].device, store.find("nokia_6600").unwrap());
        assert_eq!(scored[0].score, 1);

        assert!(handler.score("Motorola V3").is_empty());
    }

    #[test]
    fn regex_segments_sum_agreeing_weights() {
        let store = store();
        let segments = vec![
            Segment::new(r"Nokia(\d+)", 10).unwrap(),
            Segment::new(r"SymbianOS/([\d.]+)", 2).unwrap(),
        ];
        let mut handler = Handler::new("segments", HandlerKind::RegexSegment { segments }, 9);
        handler.assign(&store);

        let model_only = handler.score("Nokia6630/3.0 SymbianOS/9.1");
        assert_eq!(model_only.len(), 1);
        assert_eq!(model_only[0].device, store.find("nokia_6630").unwrap());
        assert_eq!(model_only[0].score, 2);

        let both = handler.score("Nokia6600 SymbianOS/7.0s");
        assert_eq!(both[0].score, 0);
        // the platform version alone still identifies a candidate
        let os_only = handler.score("Unknown SymbianOS/8.0");
        assert_eq!(os_only.len(), 1);
        assert_eq!(os_only[0].score, 10);
    }
}
