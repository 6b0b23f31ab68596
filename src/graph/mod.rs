use std::collections::{HashMap, HashSet};

use crate::core::package::{Package, PackageId};

pub mod builder;
pub mod ops;

/// Dependency graph over an arena of package records.
///
/// The three derived structures are built once at construction and never
/// restructured afterward; `remove` and `ignore` only mutate per-package
/// state in place. Both adjacency maps store keys into the arena, so
/// there is a single mutable record per package.
///
/// Invariant: every graph node, roots included, has a reverse-adjacency
/// entry (a root maps at least to itself). The reverse key set is the
/// set of known packages.
#[derive(Debug)]
pub struct DependencyGraph {
    pub(crate) packages: HashMap<PackageId, Package>,
    pub(crate) roots: HashSet<PackageId>,
    pub(crate) forward: HashMap<PackageId, HashSet<PackageId>>,
    pub(crate) reverse: HashMap<PackageId, HashSet<PackageId>>,
}

impl DependencyGraph {
    /// All known packages, in arbitrary order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.reverse.keys().map(|id| &self.packages[id])
    }

    pub fn package(&self, id: &PackageId) -> Option<&Package> {
        if self.reverse.contains_key(id) {
            self.packages.get(id)
        } else {
            None
        }
    }

    pub fn roots(&self) -> &HashSet<PackageId> {
        &self.roots
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.reverse.contains_key(id)
    }

    /// Attaches a registry link to a package. A no-op for unknown ids so
    /// that enrichment can never corrupt graph state.
    pub fn set_link(&mut self, id: &PackageId, link: String) {
        if let Some(package) = self.packages.get_mut(id) {
            package.link = Some(link);
        }
    }
}
