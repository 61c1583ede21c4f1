//! Writer configuration.

use std::fmt;

/// A three-component version number, used to decide which optional fields a
/// block writes (reMarkable added fields to several block kinds across
/// software releases, and the tagged format keeps both old and new readers
/// working by bumping a block's `current_version` byte only when a reader
/// targeting an old software version would choke on the new field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    /// Treated as "never", used as the default so writers emit every field.
    pub const UNBOUNDED: Version = Version(9999, 0, 0);

    pub const V3_0_0: Version = Version(3, 0, 0);
    pub const V3_2_2: Version = Version(3, 2, 2);
    pub const V3_4_0: Version = Version(3, 4, 0);
}

impl Default for Version {
    fn default() -> Self {
        Version::UNBOUNDED
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Options controlling how a scene is serialized back to tagged blocks.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Target reMarkable software version. Blocks gate optional fields on
    /// this so the output stays readable by that version's own reader.
    pub version: Version,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: Version::UNBOUNDED,
        }
    }
}

impl WriteOptions {
    pub fn for_version(version: Version) -> Self {
        Self { version }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(Version(3, 0, 0) < Version(3, 2, 2));
        assert!(Version(3, 2, 2) < Version(3, 4, 0));
        assert!(Version(2, 9, 9) < Version::V3_0_0);
    }

    #[test]
    fn test_default_is_unbounded() {
        let opts = WriteOptions::default();
        assert!(opts.version > Version::V3_4_0);
    }
}
