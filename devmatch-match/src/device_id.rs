use smallvec::SmallVec;
use std::{fmt, str::FromStr};

/// Separator between the profile ids of a [`DeviceId`].
pub const DEVICE_ID_SEPARATOR: char = '-';

/// Profile ids of a match, one per component in component order.
///
/// The string form joins the ids with [`DEVICE_ID_SEPARATOR`], the byte
/// form stores every id as four little endian bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeviceId(SmallVec<[u32; 4]>);

impl DeviceId {
    pub fn new(profile_ids: impl IntoIterator<Item = u32>) -> Self {
        Self(profile_ids.into_iter().collect())
    }

    #[must_use]
    pub fn profile_ids(&self) -> &[u32] {
        &self.0
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|id| id.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidDeviceIdError> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(InvalidDeviceIdError::new(format!(
                "{} bytes is not a multiple of four",
                bytes.len()
            )));
        }
        Ok(Self(
            bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        ))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{DEVICE_ID_SEPARATOR}")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceId {
    type Err = InvalidDeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidDeviceIdError::new("empty device id"));
        }
        s.split(DEVICE_ID_SEPARATOR)
            .map(|part| {
                part.parse::<u32>().map_err(|_ignored| {
                    InvalidDeviceIdError::new(format!("invalid profile id: {part:?}"))
                })
            })
            .collect::<Result<SmallVec<_>, _>>()
            .map(Self)
    }
}

/// A device id that is malformed or names profiles the data set lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDeviceIdError {
    reason: String,
}

impl InvalidDeviceIdError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for InvalidDeviceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid device id: {}", self.reason)
    }
}

impl std::error::Error for InvalidDeviceIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form() {
        let id: DeviceId = "4-11-21".parse().unwrap();
        assert_eq!(id.profile_ids(), [4, 11, 21]);
        assert_eq!(id.to_string(), "4-11-21");
    }

    #[test]
    fn byte_form() {
        let id = DeviceId::new([4, 11, 70_000]);
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], [4, 0, 0, 0]);
        assert_eq!(DeviceId::from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn rejects_malformed() {
        for input in ["", "-", "4--11", "4-x", "4-11-"] {
            assert!(input.parse::<DeviceId>().is_err(), "{input:?}");
        }
        let err = DeviceId::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("multiple of four"));
    }
}
