use devmatch_core::ComponentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative description of a data set, as accepted by
/// [`DataSetBuilder`](super::DataSetBuilder).
///
/// ```json
/// {
///   "name": "sample",
///   "published": "2026-10-01",
///   "components": [{ "kind": "HardwarePlatform", "default_profile": 1 }],
///   "properties": [{ "name": "HardwareVendor", "component": "HardwarePlatform" }],
///   "profiles": [{ "id": 1, "component": "HardwarePlatform", "values": { "HardwareVendor": "Acme" } }],
///   "signatures": [{ "target": "Acme/1.0", "profiles": [1], "popularity": 10 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetSource {
    pub name: String,
    pub published: jiff::civil::Date,
    pub components: Vec<ComponentSource>,
    #[serde(default)]
    pub properties: Vec<PropertySource>,
    #[serde(default)]
    pub profiles: Vec<ProfileSource>,
    #[serde(default)]
    pub signatures: Vec<SignatureSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSource {
    pub kind: ComponentKind,
    /// Display name, defaults to the name of the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifier of the profile used when a signature has none.
    pub default_profile: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySource {
    pub name: String,
    pub component: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSource {
    pub id: u32,
    pub component: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// Property name to one or more value names.
    #[serde(default)]
    pub values: BTreeMap<String, ValueList>,
}

/// One value or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueList {
    One(String),
    Many(Vec<String>),
}

impl ValueList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        items.iter().map(String::as_str)
    }
}

impl From<&str> for ValueList {
    fn from(value: &str) -> Self {
        Self::One(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSource {
    /// Literal target string the signature matches.
    pub target: String,
    /// Profile identifiers, at most one per component. Components left
    /// out use their default profile.
    pub profiles: Vec<u32>,
    /// Relative popularity, higher is more popular.
    #[serde(default)]
    pub popularity: u64,
}
