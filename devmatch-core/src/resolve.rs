//! Property resolution across a primary and an optional secondary device.
//!
//! A property owned by the [`Hardware`] or [`Software`] component is read
//! from the secondary device when one is present, any other property from
//! the primary device. When the chosen device does not define the property
//! its parent chain is walked, and when the chain is exhausted the caller
//! supplied unknown value is used.
//!
//! [`Hardware`]: ComponentKind::Hardware
//! [`Software`]: ComponentKind::Software

use crate::ComponentKind;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::{fmt, sync::Arc};

/// Upper bound on the parent chain length, guards against corrupt data.
pub const MAX_PARENT_DEPTH: usize = 64;

/// One or more values of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Values {
    items: SmallVec<[Arc<str>; 1]>,
    unknown: bool,
}

impl Values {
    /// Values found for a property.
    pub fn new(items: impl IntoIterator<Item = Arc<str>>) -> Self {
        Self {
            items: items.into_iter().collect(),
            unknown: false,
        }
    }

    /// The fallback used when a property could not be resolved.
    pub fn unknown(value: impl Into<Arc<str>>) -> Self {
        Self {
            items: SmallVec::from_buf([value.into()]),
            unknown: true,
        }
    }

    /// `true` if this is the unknown fallback.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.unknown
    }

    /// First value, also used for single valued properties.
    #[must_use]
    pub fn first(&self) -> &str {
        self.items.first().map(AsRef::as_ref).unwrap_or_default()
    }

    /// Iterate over all values.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}

impl Serialize for Values {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.items.len() == 1 {
            serializer.serialize_str(self.first())
        } else {
            serializer.collect_seq(self.iter())
        }
    }
}

/// Access to profiles that own property values and inherit from a parent.
pub trait ProfileGraph {
    /// Handle to a profile or device.
    type Profile;
    /// Identification of a property.
    type Property: ?Sized;
    /// Error raised while reading profiles.
    type Error;

    /// Values the profile defines itself, without looking at its parents.
    fn own_values(
        &self,
        profile: &Self::Profile,
        property: &Self::Property,
    ) -> Result<Option<Values>, Self::Error>;

    /// Parent of the profile, if it has one.
    fn parent(&self, profile: &Self::Profile) -> Result<Option<Self::Profile>, Self::Error>;
}

/// Pick the device a property of `component` is read from.
pub fn choose_device<'a, T>(
    component: ComponentKind,
    primary: &'a T,
    secondary: Option<&'a T>,
) -> &'a T {
    match secondary {
        Some(secondary) if component.prefers_secondary() => secondary,
        _ => primary,
    }
}

/// Resolve `property` on `profile`, walking up the parent chain.
///
/// Returns `None` when neither the profile nor any of its parents
/// define the property.
pub fn resolve_inherited<G>(
    graph: &G,
    profile: G::Profile,
    property: &G::Property,
) -> Result<Option<Values>, G::Error>
where
    G: ProfileGraph,
{
    let mut current = profile;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(values) = graph.own_values(&current, property)? {
            return Ok(Some(values));
        }
        match graph.parent(&current)? {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
    tracing::warn!("parent chain exceeds {MAX_PARENT_DEPTH} profiles, giving up on property");
    Ok(None)
}

/// Resolve `property` of `component` for a primary and optional secondary
/// profile, falling back to `unknown`.
pub fn resolve_property<G>(
    graph: &G,
    component: ComponentKind,
    primary: &G::Profile,
    secondary: Option<&G::Profile>,
    property: &G::Property,
    unknown: &Arc<str>,
) -> Result<Values, G::Error>
where
    G: ProfileGraph,
    G::Profile: Clone,
{
    let profile = choose_device(component, primary, secondary).clone();
    Ok(resolve_inherited(graph, profile, property)?
        .unwrap_or_else(|| Values::unknown(unknown.clone())))
}
