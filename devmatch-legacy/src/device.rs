use crate::LegacyImportError;
use ahash::{HashMap, HashMapExt as _, HashSet, HashSetExt as _};
use devmatch_core::resolve::{ProfileGraph, Values};
use std::{convert::Infallible, sync::Arc};

/// Parent id WURFL uses for its generic device, treated as "no parent".
pub const WURFL_ROOT: &str = "root";

/// Device definition of the legacy path.
///
/// A device sets capabilities and inherits every capability it does not set
/// from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDevice {
    id: Arc<str>,
    target: Option<Arc<str>>,
    parent: Option<Arc<str>>,
    capabilities: Vec<(Arc<str>, Arc<str>)>,
}

impl LegacyDevice {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            target: None,
            parent: None,
            capabilities: Vec::new(),
        }
    }

    /// Set the target string this device was recorded with.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.set_target(target);
        self
    }

    pub fn set_target(&mut self, target: impl Into<Arc<str>>) -> &mut Self {
        let target = target.into();
        self.target = (!target.is_empty()).then_some(target);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<Arc<str>>) -> Self {
        self.set_parent(parent);
        self
    }

    pub fn set_parent(&mut self, parent: impl Into<Arc<str>>) -> &mut Self {
        let parent = parent.into();
        self.parent = (!parent.is_empty() && &*parent != WURFL_ROOT).then_some(parent);
        self
    }

    #[must_use]
    pub fn with_capability(
        mut self,
        name: impl Into<Arc<str>>,
        value: impl Into<Arc<str>>,
    ) -> Self {
        self.push_capability(name, value);
        self
    }

    /// Add a value for a capability, a capability may hold several.
    pub fn push_capability(
        &mut self,
        name: impl Into<Arc<str>>,
        value: impl Into<Arc<str>>,
    ) -> &mut Self {
        self.capabilities.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn capabilities(&self) -> &[(Arc<str>, Arc<str>)] {
        &self.capabilities
    }

    /// Values the device sets itself for `name`.
    pub fn capability(&self, name: &str) -> impl Iterator<Item = &Arc<str>> {
        self.capabilities
            .iter()
            .filter(move |(key, _)| &**key == name)
            .map(|(_, value)| value)
    }
}

/// All devices of a legacy import, with parents resolved.
#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    devices: Vec<Arc<LegacyDevice>>,
    parents: Vec<Option<usize>>,
    by_id: HashMap<Arc<str>, usize>,
    capability_names: Vec<Arc<str>>,
}

impl DeviceStore {
    /// Index the devices, failing on duplicate ids, unknown parents and
    /// parent cycles.
    pub fn new(devices: impl IntoIterator<Item = LegacyDevice>) -> Result<Self, LegacyImportError> {
        let devices: Vec<Arc<LegacyDevice>> = devices.into_iter().map(Arc::new).collect();
        let mut by_id = HashMap::with_capacity(devices.len());
        for (idx, device) in devices.iter().enumerate() {
            if by_id.insert(device.id.clone(), idx).is_some() {
                return Err(LegacyImportError::invalid(format!(
                    "duplicate device id {:?}",
                    device.id
                )));
            }
        }

        let parents = devices
            .iter()
            .map(|device| match &device.parent {
                Some(parent) => by_id.get(parent).copied().map(Some).ok_or_else(|| {
                    LegacyImportError::invalid(format!(
                        "device {:?} falls back to unknown device {parent:?}",
                        device.id
                    ))
                }),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        for start in 0..devices.len() {
            let mut seen = HashSet::new();
            let mut current = Some(start);
            while let Some(idx) = current {
                if !seen.insert(idx) {
                    return Err(LegacyImportError::invalid(format!(
                        "device {:?} is part of a parent cycle",
                        devices[start].id
                    )));
                }
                current = parents[idx];
            }
        }

        let mut names: Vec<Arc<str>> = devices
            .iter()
            .flat_map(|device| device.capabilities.iter().map(|(name, _)| name.clone()))
            .collect();
        names.sort_unstable();
        names.dedup();

        tracing::debug!(
            "legacy device store: {} devices, {} capabilities",
            devices.len(),
            names.len()
        );
        Ok(Self {
            devices,
            parents,
            by_id,
            capability_names: names,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Arc<LegacyDevice>> {
        self.devices.get(idx)
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LegacyDevice>> {
        self.devices.iter()
    }

    /// Names of every capability set by at least one device, sorted.
    #[must_use]
    pub fn capability_names(&self) -> &[Arc<str>] {
        &self.capability_names
    }

    #[must_use]
    pub fn parent_of(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }
}

impl ProfileGraph for DeviceStore {
    type Profile = usize;
    type Property = str;
    type Error = Infallible;

    fn own_values(&self, profile: &usize, property: &str) -> Result<Option<Values>, Infallible> {
        let Some(device) = self.devices.get(*profile) else {
            return Ok(None);
        };
        let values: Vec<Arc<str>> = device.capability(property).cloned().collect();
        Ok((!values.is_empty()).then(|| Values::new(values)))
    }

    fn parent(&self, profile: &usize) -> Result<Option<usize>, Infallible> {
        Ok(self.parent_of(*profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devmatch_core::resolve::resolve_inherited;

    fn store() -> DeviceStore {
        DeviceStore::new([
            LegacyDevice::new("generic")
                .with_parent(WURFL_ROOT)
                .with_capability("is_wireless_device", "false")
                .with_capability("resolution_width", "90"),
            LegacyDevice::new("nokia_generic")
                .with_parent("generic")
                .with_capability("brand_name", "Nokia")
                .with_capability("is_wireless_device", "true"),
            LegacyDevice::new("nokia_6600")
                .with_parent("nokia_generic")
                .with_target("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s")
                .with_capability("model_name", "6600"),
        ])
        .unwrap()
    }

    #[test]
    fn inherits_through_fall_back_chain() {
        let store = store();
        let idx = store.find("nokia_6600").unwrap();
        let width = resolve_inherited(&store, idx, "resolution_width")
            .unwrap()
            .unwrap();
        assert_eq!(width.first(), "90");
        let wireless = resolve_inherited(&store, idx, "is_wireless_device")
            .unwrap()
            .unwrap();
        assert_eq!(wireless.first(), "true");
        assert!(resolve_inherited(&store, idx, "unknown_cap").unwrap().is_none());
        assert_eq!(store.capability_names().len(), 4);
    }

    #[test]
    fn rejects_inconsistent_devices() {
        let duplicate = DeviceStore::new([LegacyDevice::new("a"), LegacyDevice::new("a")]);
        assert!(matches!(duplicate, Err(LegacyImportError::Invalid(_))));

        let orphan = DeviceStore::new([LegacyDevice::new("a").with_parent("missing")]);
        assert!(matches!(orphan, Err(LegacyImportError::Invalid(_))));

        let cycle = DeviceStore::new([
            LegacyDevice::new("a").with_parent("b"),
            LegacyDevice::new("b").with_parent("a"),
        ]);
        let err = cycle.unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }
}
