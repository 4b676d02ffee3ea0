use crate::error::OpaqueError;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Grouping of properties and profiles by concern.
///
/// The discriminant is the identifier used in data files, the declaration
/// order is the order in which profile ids are joined into a device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ComponentKind {
    /// Physical device: vendor, model, screen, ...
    Hardware = 1,
    /// Operating system or platform.
    Software = 2,
    /// Browser or requesting application.
    Browser = 3,
    /// Crawlers and bots.
    Crawler = 4,
}

impl ComponentKind {
    /// All components, in device id order.
    pub const ALL: [Self; 4] = [Self::Hardware, Self::Software, Self::Browser, Self::Crawler];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hardware => "HardwarePlatform",
            Self::Software => "SoftwarePlatform",
            Self::Browser => "BrowserUA",
            Self::Crawler => "Crawler",
        }
    }

    /// Identifier of the component as stored in data files.
    #[must_use]
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Resolve a component from its data file identifier.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Hardware),
            2 => Some(Self::Software),
            3 => Some(Self::Browser),
            4 => Some(Self::Crawler),
            _ => None,
        }
    }

    /// Whether a secondary (device) header takes precedence for
    /// properties of this component.
    #[must_use]
    pub fn prefers_secondary(&self) -> bool {
        matches!(self, Self::Hardware | Self::Software)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("hardwareplatform") || s.eq_ignore_ascii_case("hardware") {
            Ok(Self::Hardware)
        } else if s.eq_ignore_ascii_case("softwareplatform")
            || s.eq_ignore_ascii_case("software")
            || s.eq_ignore_ascii_case("platform")
        {
            Ok(Self::Software)
        } else if s.eq_ignore_ascii_case("browserua") || s.eq_ignore_ascii_case("browser") {
            Ok(Self::Browser)
        } else if s.eq_ignore_ascii_case("crawler") {
            Ok(Self::Crawler)
        } else {
            Err(OpaqueError::from_display(format!("invalid component: {s}")))
        }
    }
}

impl Serialize for ComponentKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse::<Self>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ComponentKind::from_id(0), None);
        assert_eq!(ComponentKind::from_id(5), None);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("Hardware".parse::<ComponentKind>().unwrap(), ComponentKind::Hardware);
        assert_eq!("platform".parse::<ComponentKind>().unwrap(), ComponentKind::Software);
        assert_eq!("BrowserUA".parse::<ComponentKind>().unwrap(), ComponentKind::Browser);
        assert!("robot".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&ComponentKind::Crawler).unwrap();
        assert_eq!(json, r#""Crawler""#);
        let kind: ComponentKind = serde_json::from_str(r#""software""#).unwrap();
        assert_eq!(kind, ComponentKind::Software);
    }
}
