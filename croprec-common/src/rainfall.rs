//! Rainfall lookup by location
//!
//! Rainfall is never supplied by a request; it is inferred from the city name.
//! The built-in table is a stand-in for a real climate data source, so the
//! encoder only depends on the [`RainfallProvider`] trait.

use std::collections::HashMap;

/// Rainfall (mm) returned for locations missing from the table
pub const DEFAULT_RAINFALL_MM: f64 = 85.0;

/// Built-in city rainfall table (mm)
pub const BUILTIN_RAINFALL_MM: [(&str, f64); 4] = [
    ("Nairobi", 90.0),
    ("Kisumu", 120.0),
    ("Mombasa", 70.0),
    ("Eldoret", 100.0),
];

/// Source of rainfall values for a named location
///
/// Implementations must be infallible: unknown locations resolve to a default.
pub trait RainfallProvider: Send + Sync {
    /// Rainfall in millimeters for `location`
    fn rainfall_mm(&self, location: &str) -> f64;
}

/// Immutable city → rainfall table with a fallback value
///
/// Lookup is exact-match and case-sensitive ("nairobi" is not "Nairobi").
#[derive(Debug, Clone)]
pub struct StaticRainfallTable {
    cities: HashMap<String, f64>,
    default_mm: f64,
}

impl StaticRainfallTable {
    /// Build a table from explicit entries
    pub fn new<I, S>(entries: I, default_mm: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            cities: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            default_mm,
        }
    }

    /// Table used when no overrides are configured
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RAINFALL_MM, DEFAULT_RAINFALL_MM)
    }

    pub fn default_mm(&self) -> f64 {
        self.default_mm
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

impl Default for StaticRainfallTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RainfallProvider for StaticRainfallTable {
    fn rainfall_mm(&self, location: &str) -> f64 {
        self.cities.get(location).copied().unwrap_or(self.default_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_cities() {
        let table = StaticRainfallTable::builtin();
        assert_eq!(table.rainfall_mm("Nairobi"), 90.0);
        assert_eq!(table.rainfall_mm("Kisumu"), 120.0);
        assert_eq!(table.rainfall_mm("Mombasa"), 70.0);
        assert_eq!(table.rainfall_mm("Eldoret"), 100.0);
    }

    #[test]
    fn test_unknown_location_uses_default() {
        let table = StaticRainfallTable::builtin();
        assert_eq!(table.rainfall_mm("Atlantis"), 85.0);
        assert_eq!(table.rainfall_mm(""), 85.0);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = StaticRainfallTable::builtin();
        assert_eq!(table.rainfall_mm("nairobi"), DEFAULT_RAINFALL_MM);
        assert_eq!(table.rainfall_mm(" Kisumu"), DEFAULT_RAINFALL_MM);
    }

    #[test]
    fn test_custom_table() {
        let table = StaticRainfallTable::new([("Nakuru", 95.0)], 60.0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rainfall_mm("Nakuru"), 95.0);
        assert_eq!(table.rainfall_mm("Nairobi"), 60.0);
        assert_eq!(table.default_mm(), 60.0);
    }
}
