use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::version::{Version, VersionRange};

/// Package name used as the graph node key.
///
/// NuGet package ids are case-insensitive, so equality, hashing and
/// ordering all ignore ASCII case while the original spelling is kept
/// for display. Two entries that differ only by version (or by case)
/// collapse onto the same node.
#[derive(Debug, Clone)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Edge label: the target package name plus the declared version range.
/// Only the unsatisfied-dependency check reads the range.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub id: PackageId,
    pub range: VersionRange,
}

impl Dependency {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        Self {
            id: PackageId::new(id),
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Keep,
    Remove,
    Ignore,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub version: Version,
    pub is_project_reference: bool,
    pub is_root: bool,
    pub dependencies: Vec<Dependency>,
    pub state: PackageState,
    pub link: Option<String>,
}

impl Package {
    pub fn new(
        id: impl Into<String>,
        version: Version,
        is_project_reference: bool,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            id: PackageId::new(id),
            version,
            is_project_reference,
            is_root: false,
            dependencies,
            state: PackageState::Keep,
            link: None,
        }
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    /// Display identity, e.g. `Serilog/3.1.1`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::core::package::PackageId;

    #[test]
    fn package_id_equality_ignores_case() {
        assert_eq!(PackageId::new("Newtonsoft.Json"), PackageId::new("newtonsoft.json"));
        assert_ne!(PackageId::new("Serilog"), PackageId::new("Serilog.Sinks.Console"));
    }

    #[test]
    fn package_id_hashing_collapses_case_variants() {
        let mut set = HashSet::new();
        set.insert(PackageId::new("AWSSDK.Core"));
        assert!(!set.insert(PackageId::new("awssdk.core")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn package_id_ordering_is_case_insensitive() {
        let mut ids = vec![
            PackageId::new("zlib"),
            PackageId::new("Azure.Core"),
            PackageId::new("azure.Identity"),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(PackageId::as_str).collect();
        assert_eq!(names, vec!["Azure.Core", "azure.Identity", "zlib"]);
    }
}
