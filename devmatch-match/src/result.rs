use crate::{DeviceId, matcher::Outcome};
use devmatch_core::{
    ComponentKind, Method,
    resolve::{Values, resolve_property},
};
use devmatch_data::{
    DataSet, DataSetError,
    entity::{Node, Profile, Signature},
};
use serde::Serialize;
use smallvec::SmallVec;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

pub(crate) type Profiles = SmallVec<[Arc<Profile>; 4]>;

/// Result of matching a target string, a set of headers or a device id.
///
/// Cheap to clone, all clones share the same result.
#[derive(Debug, Clone)]
pub struct Match(Arc<Inner>);

#[derive(Debug, Clone)]
struct Inner {
    data_set: Arc<DataSet>,
    target: Arc<str>,
    method: Method,
    difference: usize,
    signature: Option<Arc<Signature>>,
    nodes: Vec<Arc<Node>>,
    primary: Profiles,
    secondary: Option<Profiles>,
    fallback: bool,
    nodes_evaluated: usize,
    signatures_compared: usize,
    elapsed: Duration,
    unknown: Arc<str>,
}

impl Match {
    pub(crate) fn from_outcome(
        data_set: Arc<DataSet>,
        target: Arc<str>,
        outcome: Outcome,
        elapsed: Duration,
        unknown: Arc<str>,
    ) -> Result<Self, DataSetError> {
        let fallback = outcome.signature.is_none();
        let mut primary = Profiles::new();
        if let Some(signature) = &outcome.signature {
            for index in signature.profiles() {
                primary.push(data_set.profile(*index)?);
            }
        }
        let primary = complete_profiles(&data_set, primary)?;
        Ok(Self(Arc::new(Inner {
            data_set,
            target,
            method: outcome.method,
            difference: outcome.difference,
            signature: outcome.signature,
            nodes: outcome.nodes,
            primary,
            secondary: None,
            fallback,
            nodes_evaluated: outcome.nodes_evaluated,
            signatures_compared: outcome.signatures_compared,
            elapsed,
            unknown,
        })))
    }

    pub(crate) fn from_profiles(
        data_set: Arc<DataSet>,
        profiles: Profiles,
        elapsed: Duration,
        unknown: Arc<str>,
    ) -> Result<Self, DataSetError> {
        let primary = complete_profiles(&data_set, profiles)?;
        Ok(Self(Arc::new(Inner {
            data_set,
            target: Arc::from(""),
            method: Method::None,
            difference: 0,
            signature: None,
            nodes: Vec::new(),
            primary,
            secondary: None,
            fallback: false,
            nodes_evaluated: 0,
            signatures_compared: 0,
            elapsed,
            unknown,
        })))
    }

    /// Combine with the match of a secondary header, which then provides
    /// the hardware and software profiles.
    #[must_use]
    pub(crate) fn with_secondary(self, secondary: &Self) -> Self {
        if secondary.0.fallback {
            return self;
        }
        let mut inner = Arc::unwrap_or_clone(self.0);
        inner.secondary = Some(secondary.0.primary.clone());
        Self(Arc::new(inner))
    }

    /// The string that was matched, empty for device id lookups.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.0.target
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.0.method
    }

    /// Distance between the target and the matched signature, `0` for
    /// exact matches.
    #[must_use]
    pub fn difference(&self) -> usize {
        self.0.difference
    }

    #[must_use]
    pub fn signature(&self) -> Option<&Arc<Signature>> {
        self.0.signature.as_ref()
    }

    /// Rank of the matched signature, `0` being the most popular.
    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        self.0.signature.as_ref().map(|signature| signature.rank())
    }

    /// Nodes found in the target string.
    #[must_use]
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.0.nodes
    }

    #[must_use]
    pub fn nodes_evaluated(&self) -> usize {
        self.0.nodes_evaluated
    }

    #[must_use]
    pub fn signatures_compared(&self) -> usize {
        self.0.signatures_compared
    }

    /// Time spent matching.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed
    }

    #[must_use]
    pub fn data_set(&self) -> &Arc<DataSet> {
        &self.0.data_set
    }

    /// `true` when a secondary header contributed to this match.
    #[must_use]
    pub fn has_secondary(&self) -> bool {
        self.0.secondary.is_some()
    }

    /// Profile contributing `component`, secondary profiles winning for
    /// the hardware and software components.
    #[must_use]
    pub fn profile(&self, component: ComponentKind) -> Option<&Arc<Profile>> {
        let primary = find(&self.0.primary, component);
        let secondary = self
            .0
            .secondary
            .as_ref()
            .and_then(|profiles| find(profiles, component));
        match (primary, secondary) {
            (_, Some(secondary)) if component.prefers_secondary() => Some(secondary),
            (Some(primary), _) => Some(primary),
            (None, secondary) => secondary,
        }
    }

    /// Contributing profiles, one per component in component order.
    #[must_use]
    pub fn profiles(&self) -> Profiles {
        let mut kinds: SmallVec<[ComponentKind; 4]> =
            self.0.primary.iter().map(|profile| profile.component()).collect();
        if let Some(secondary) = &self.0.secondary {
            for profile in secondary {
                if !kinds.contains(&profile.component()) {
                    kinds.push(profile.component());
                }
            }
        }
        kinds.sort_unstable();
        kinds
            .into_iter()
            .filter_map(|kind| self.profile(kind).cloned())
            .collect()
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.profiles().iter().map(|profile| profile.profile_id()))
    }

    /// Byte form of [`Match::device_id`].
    #[must_use]
    pub fn device_id_bytes(&self) -> Vec<u8> {
        self.device_id().to_bytes()
    }

    /// Values of the property named `property`.
    ///
    /// Properties that are unknown to the data set, or that no profile
    /// along the parent chain defines and that have no default value,
    /// resolve to the unknown value.
    pub fn values(&self, property: &str) -> Result<Values, DataSetError> {
        let inner = &*self.0;
        if inner.fallback {
            return Ok(Values::unknown(inner.unknown.clone()));
        }
        let Some(property) = inner.data_set.property(property) else {
            return Ok(Values::unknown(inner.unknown.clone()));
        };
        let component = property.component();
        let primary = find(&inner.primary, component);
        let secondary = inner
            .secondary
            .as_ref()
            .and_then(|profiles| find(profiles, component));
        let values = match (primary, secondary) {
            (Some(primary), secondary) => resolve_property(
                &*inner.data_set,
                component,
                primary,
                secondary,
                property,
                &inner.unknown,
            )?,
            (None, Some(secondary)) => resolve_property(
                &*inner.data_set,
                component,
                secondary,
                None,
                property,
                &inner.unknown,
            )?,
            (None, None) => Values::unknown(inner.unknown.clone()),
        };
        if values.is_unknown()
            && let Some(default) = inner.data_set.default_value(property)?
        {
            return Ok(Values::new([default]));
        }
        Ok(values)
    }

    /// First value of the property named `property`.
    pub fn value(&self, property: &str) -> Result<Arc<str>, DataSetError> {
        let values = self.values(property)?;
        Ok(Arc::from(values.first()))
    }

    /// Target characters covered by the found nodes, `_` elsewhere.
    #[must_use]
    pub fn matched_pattern(&self) -> String {
        let target = self.0.target.as_bytes();
        let mut pattern = vec![b'_'; target.len()];
        for node in &self.0.nodes {
            if let (Some(out), Some(src)) = (
                pattern.get_mut(node.position()..node.end()),
                target.get(node.position()..node.end()),
            ) {
                out.copy_from_slice(src);
            }
        }
        String::from_utf8_lossy(&pattern).into_owned()
    }

    /// Reconstructed pattern of the matched signature.
    pub fn signature_pattern(&self) -> Result<Option<String>, DataSetError> {
        match &self.0.signature {
            Some(signature) => {
                let pattern = self.0.data_set.signature_pattern(signature)?;
                Ok(Some(String::from_utf8_lossy(&pattern).into_owned()))
            }
            None => Ok(None),
        }
    }

    /// Serializable overview holding the values of every property.
    pub fn summary(&self) -> Result<MatchSummary, DataSetError> {
        let mut values = BTreeMap::new();
        for property in self.0.data_set.properties() {
            values.insert(property.name().to_owned(), self.values(property.name())?);
        }
        Ok(MatchSummary {
            device_id: self.device_id().to_string(),
            method: self.method(),
            difference: self.difference(),
            rank: self.rank(),
            target: self.target().to_owned(),
            signature: self.signature_pattern()?,
            elapsed_us: u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX),
            values,
        })
    }
}

/// Overview of a [`Match`], see [`Match::summary`].
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub device_id: String,
    pub method: Method,
    pub difference: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub elapsed_us: u64,
    pub values: BTreeMap<String, Values>,
}

fn find(profiles: &[Arc<Profile>], component: ComponentKind) -> Option<&Arc<Profile>> {
    profiles
        .iter()
        .find(|profile| profile.component() == component)
}

/// Keep one profile per component and add the default profile of every
/// component that has none.
pub(crate) fn complete_profiles(
    data_set: &DataSet,
    mut profiles: Profiles,
) -> Result<Profiles, DataSetError> {
    for component in data_set.components() {
        if find(&profiles, component.kind()).is_none() {
            profiles.push(data_set.profile(component.default_profile())?);
        }
    }
    profiles.sort_by_key(|profile| profile.component());
    profiles.dedup_by_key(|profile| profile.component());
    Ok(profiles)
}
