//! Working-space matrix provider.
//!
//! The application engine never derives matrices itself: it asks a
//! [`WorkingSpaceProvider`] for the forward (`RGB -> XYZ D50`) and inverse
//! matrix of a named profile once, at construction. Hosts with their own
//! color management implement the trait; [`WorkingSpaces`] is the built-in
//! table.

use crate::{
    pcs_to_rgb_matrix, rgb_to_pcs_matrix, Primaries, ACES_AP0, ACES_AP1, ADOBE_RGB, DCI_P3,
    PROPHOTO_RGB, REC2020, SRGB, WIDE_GAMUT,
};
use clut_math::Mat3;

/// Profile used when a name is unknown, and the default Hald profile.
pub const DEFAULT_PROFILE: &str = "sRGB";

/// Supplies 3x3 matrices between named working spaces and D50 XYZ.
///
/// Implementations are shared across engine threads.
pub trait WorkingSpaceProvider: Send + Sync {
    /// Names of all known working profiles.
    fn working_profiles(&self) -> Vec<String>;

    /// Working RGB to D50 XYZ.
    fn working_space_matrix(&self, profile: &str) -> Mat3;

    /// D50 XYZ to working RGB.
    fn working_space_inverse_matrix(&self, profile: &str) -> Mat3;
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    to_pcs: Mat3,
    from_pcs: Mat3,
}

/// Built-in provider computed from published primaries.
///
/// Unknown profile names resolve to [`DEFAULT_PROFILE`].
#[derive(Debug, Clone)]
pub struct WorkingSpaces {
    entries: Vec<Entry>,
}

impl WorkingSpaces {
    /// Creates the table of standard working spaces.
    pub fn new() -> Self {
        let mut spaces = Self { entries: Vec::new() };
        for p in [
            SRGB,
            ADOBE_RGB,
            PROPHOTO_RGB,
            WIDE_GAMUT,
            REC2020,
            DCI_P3,
            ACES_AP0,
            ACES_AP1,
        ] {
            spaces = spaces.with_space(p.name, &p);
        }
        spaces
    }

    /// Registers (or replaces) a working space.
    pub fn with_space(mut self, name: impl Into<String>, primaries: &Primaries) -> Self {
        let entry = Entry {
            name: name.into(),
            to_pcs: rgb_to_pcs_matrix(primaries),
            from_pcs: pcs_to_rgb_matrix(primaries),
        };
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        self
    }

    fn lookup(&self, profile: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.name == profile)
            .or_else(|| self.entries.iter().find(|e| e.name == DEFAULT_PROFILE))
    }
}

impl Default for WorkingSpaces {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingSpaceProvider for WorkingSpaces {
    fn working_profiles(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    fn working_space_matrix(&self, profile: &str) -> Mat3 {
        self.lookup(profile).map_or(Mat3::IDENTITY, |e| e.to_pcs)
    }

    fn working_space_inverse_matrix(&self, profile: &str) -> Mat3 {
        self.lookup(profile).map_or(Mat3::IDENTITY, |e| e.from_pcs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_listed() {
        let spaces = WorkingSpaces::new();
        let names = spaces.working_profiles();
        assert_eq!(names.len(), 8);
        assert!(names.iter().any(|n| n == "ProPhoto"));
        assert!(names.iter().any(|n| n == "ACESp0"));
    }

    #[test]
    fn test_unknown_falls_back_to_srgb() {
        let spaces = WorkingSpaces::new();
        assert_eq!(
            spaces.working_space_matrix("NoSuchSpace"),
            spaces.working_space_matrix("sRGB")
        );
    }

    #[test]
    fn test_forward_inverse_pair() {
        let spaces = WorkingSpaces::new();
        for name in spaces.working_profiles() {
            let m = spaces.working_space_matrix(&name);
            let inv = spaces.working_space_inverse_matrix(&name);
            assert!((inv * m).max_abs_diff(&Mat3::IDENTITY) < 1e-4, "{}", name);
        }
    }

    #[test]
    fn test_custom_space() {
        let custom = Primaries { name: "Mine", ..SRGB };
        let spaces = WorkingSpaces::new().with_space("Mine", &custom);
        assert!(spaces.working_profiles().iter().any(|n| n == "Mine"));
        assert!(
            spaces
                .working_space_matrix("Mine")
                .max_abs_diff(&spaces.working_space_matrix("sRGB"))
                < 1e-6
        );
    }
}
