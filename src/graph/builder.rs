use std::collections::{HashMap, HashSet};

use crate::core::package::{Package, PackageId};
use crate::graph::DependencyGraph;

/// Builds the graph from an already-deduplicated package map and the
/// subset of names directly required by the project.
///
/// Declared dependencies pointing outside the known package set are
/// silently dropped: the closure is bounded by what the caller already
/// resolved. Forward edges exist only for packages with at least one
/// surviving dependency; reverse edges are the inversion, and every
/// root's reverse entry is seeded with itself so that the reverse key
/// set covers all known packages. The ignore patterns are applied as the
/// last construction step, before any caller-issued removal.
pub fn build_graph(
    mut packages: HashMap<PackageId, Package>,
    roots: &HashSet<PackageId>,
    ignores: &[String],
) -> DependencyGraph {
    let mut forward: HashMap<PackageId, HashSet<PackageId>> = HashMap::new();
    let mut reverse: HashMap<PackageId, HashSet<PackageId>> = HashMap::new();

    for (id, package) in &packages {
        let dependencies: HashSet<PackageId> = package
            .dependencies
            .iter()
            .filter_map(|dep| packages.get_key_value(&dep.id))
            .map(|(known, _)| known.clone())
            .collect();

        if dependencies.is_empty() {
            continue;
        }

        for dependency in &dependencies {
            reverse
                .entry(dependency.clone())
                .or_default()
                .insert(id.clone());
        }
        forward.insert(id.clone(), dependencies);
    }

    let roots: HashSet<PackageId> = roots
        .iter()
        .filter(|root| packages.contains_key(*root))
        .cloned()
        .collect();

    for root in &roots {
        reverse.entry(root.clone()).or_default().insert(root.clone());
        if let Some(package) = packages.get_mut(root) {
            package.is_root = true;
        }
    }

    let mut graph = DependencyGraph {
        packages,
        roots,
        forward,
        reverse,
    };
    graph.ignore(ignores);
    graph
}
