/// A strategy turning a target string into a detection result.
///
/// Implemented by the node trie provider and by the legacy handler
/// engine, so callers can drive either the same way.
pub trait Detector {
    /// Result of one detection.
    type Detection;
    /// Error raised while reading the reference data.
    type Error;

    /// Detect the device behind `target`.
    ///
    /// Unknown or malformed targets are not an error: they produce a
    /// detection without a match.
    fn detect(&self, target: &str) -> Result<Self::Detection, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for &D {
    type Detection = D::Detection;
    type Error = D::Error;

    fn detect(&self, target: &str) -> Result<Self::Detection, Self::Error> {
        (**self).detect(target)
    }
}

impl<D: Detector + ?Sized> Detector for std::sync::Arc<D> {
    type Detection = D::Detection;
    type Error = D::Error;

    fn detect(&self, target: &str) -> Result<Self::Detection, Self::Error> {
        (**self).detect(target)
    }
}
