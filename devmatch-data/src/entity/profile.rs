use crate::{
    entity::Property,
    index::{ProfileIndex, SignatureIndex, ValueIndex},
};
use devmatch_core::ComponentKind;

/// Definition of one device, platform, browser or crawler.
#[derive(Debug, Clone)]
pub struct Profile {
    pub(crate) index: ProfileIndex,
    pub(crate) profile_id: u32,
    pub(crate) component: ComponentKind,
    pub(crate) parent: Option<ProfileIndex>,
    pub(crate) values: Vec<ValueIndex>,
    pub(crate) signatures: Vec<SignatureIndex>,
}

impl Profile {
    #[must_use]
    pub fn index(&self) -> ProfileIndex {
        self.index
    }

    /// Public identifier, used to build device ids.
    #[must_use]
    pub fn profile_id(&self) -> u32 {
        self.profile_id
    }

    #[must_use]
    pub fn component(&self) -> ComponentKind {
        self.component
    }

    /// Profile this one inherits missing values from.
    #[must_use]
    pub fn parent(&self) -> Option<ProfileIndex> {
        self.parent
    }

    /// All values set on this profile, sorted by index.
    #[must_use]
    pub fn values(&self) -> &[ValueIndex] {
        &self.values
    }

    /// Signatures referencing this profile.
    #[must_use]
    pub fn signatures(&self) -> &[SignatureIndex] {
        &self.signatures
    }

    /// Values this profile sets for `property`, not looking at parents.
    #[must_use]
    pub fn values_of(&self, property: &Property) -> &[ValueIndex] {
        let range = property.value_range();
        let start = self.values.partition_point(|v| v.get() < range.start);
        let end = self.values.partition_point(|v| v.get() < range.end);
        &self.values[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PropertyIndex;
    use std::sync::Arc;

    #[test]
    fn values_of_selects_property_range() {
        let profile = Profile {
            index: ProfileIndex::new(0),
            profile_id: 12,
            component: ComponentKind::Hardware,
            parent: None,
            values: [1, 4, 5, 9].map(ValueIndex::new).to_vec(),
            signatures: Vec::new(),
        };
        let property = Property {
            index: PropertyIndex::new(1),
            name: Arc::from("HardwareModel"),
            description: None,
            component: ComponentKind::Hardware,
            mandatory: false,
            list: true,
            default_value: None,
            first_value: ValueIndex::new(3),
            value_count: 4,
        };
        assert_eq!(profile.values_of(&property), &[ValueIndex::new(4), ValueIndex::new(5)]);
    }
}
