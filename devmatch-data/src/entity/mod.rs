//! Read-only entities of a [`DataSet`](crate::DataSet).

use crate::index::{ProfileIndex, PropertyIndex, ValueIndex};
use devmatch_core::ComponentKind;
use std::{ops::Range, sync::Arc};

mod node;
pub use node::{Node, NodeChild, NumericChild};

mod profile;
pub use profile::Profile;

mod signature;
pub use signature::Signature;

/// Grouping of properties and profiles, such as the hardware or the browser.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) kind: ComponentKind,
    pub(crate) name: Arc<str>,
    pub(crate) default_profile: ProfileIndex,
}

impl Component {
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Profile used for this component when a signature has none or
    /// when nothing was matched.
    #[must_use]
    pub fn default_profile(&self) -> ProfileIndex {
        self.default_profile
    }
}

/// A named, typed attribute such as `HardwareVendor`.
///
/// The values of a property occupy one contiguous range of the value list,
/// sorted by name.
#[derive(Debug, Clone)]
pub struct Property {
    pub(crate) index: PropertyIndex,
    pub(crate) name: Arc<str>,
    pub(crate) description: Option<Arc<str>>,
    pub(crate) component: ComponentKind,
    pub(crate) mandatory: bool,
    pub(crate) list: bool,
    pub(crate) default_value: Option<ValueIndex>,
    pub(crate) first_value: ValueIndex,
    pub(crate) value_count: u32,
}

impl Property {
    #[must_use]
    pub fn index(&self) -> PropertyIndex {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn component(&self) -> ComponentKind {
        self.component
    }

    /// Every profile of the component is expected to define this property.
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// A profile can hold more then one value for this property.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.list
    }

    #[must_use]
    pub fn default_value(&self) -> Option<ValueIndex> {
        self.default_value
    }

    /// Indexes of all values of this property.
    #[must_use]
    pub fn value_range(&self) -> Range<u32> {
        self.first_value.get()..self.first_value.get() + self.value_count
    }

    #[must_use]
    pub fn owns_value(&self, value: ValueIndex) -> bool {
        self.value_range().contains(&value.get())
    }
}

/// A human readable datum of one property, such as `Android`.
#[derive(Debug, Clone)]
pub struct Value {
    pub(crate) index: ValueIndex,
    pub(crate) property: PropertyIndex,
    pub(crate) name: Arc<str>,
    pub(crate) profiles: Vec<ProfileIndex>,
}

impl Value {
    #[must_use]
    pub fn index(&self) -> ValueIndex {
        self.index
    }

    #[must_use]
    pub fn property(&self) -> PropertyIndex {
        self.property
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Profiles exhibiting this value, sorted by index.
    #[must_use]
    pub fn profiles(&self) -> &[ProfileIndex] {
        &self.profiles
    }
}
