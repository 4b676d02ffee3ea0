use crate::error::OpaqueError;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

/// The matching strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Nothing could be resolved, all properties are unknown.
    #[default]
    None,
    /// The target string matched a known signature exactly.
    Exact,
    /// Matched after tolerating differences in numeric substrings.
    Numeric,
    /// Chosen by node coverage.
    Nearest,
    /// Chosen by edit distance.
    Closest,
}

impl Method {
    /// All methods, in the order of the matching stages.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Exact,
        Self::Numeric,
        Self::Nearest,
        Self::Closest,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Exact => "Exact",
            Self::Numeric => "Numeric",
            Self::Nearest => "Nearest",
            Self::Closest => "Closest",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = OpaqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OpaqueError::from_display(format!("invalid match method: {s}")))
    }
}

impl Serialize for Method {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse::<Self>().map_err(serde::de::Error::custom)
    }
}

/// Per [`Method`] detection counters.
#[derive(Debug, Default)]
pub struct MethodCounts {
    counts: [AtomicU64; 5],
}

impl MethodCounts {
    /// Record one detection made with `method`.
    pub fn record(&self, method: Method) {
        self.counts[method.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Amount of detections made with `method`.
    #[must_use]
    pub fn get(&self, method: Method) -> u64 {
        self.counts[method.index()].load(Ordering::Relaxed)
    }

    /// Total amount of detections.
    #[must_use]
    pub fn total(&self) -> u64 {
        Method::ALL.into_iter().map(|method| self.get(method)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("closest".parse::<Method>().unwrap(), Method::Closest);
        assert_eq!("EXACT".parse::<Method>().unwrap(), Method::Exact);
        assert!("fuzzy".parse::<Method>().is_err());
    }

    #[test]
    fn counts() {
        let counts = MethodCounts::default();
        counts.record(Method::Exact);
        counts.record(Method::Exact);
        counts.record(Method::None);
        assert_eq!(counts.get(Method::Exact), 2);
        assert_eq!(counts.get(Method::Closest), 0);
        assert_eq!(counts.total(), 3);
    }
}
