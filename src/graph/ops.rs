use std::collections::{BTreeSet, HashSet};

use glob::{MatchOptions, Pattern};

use crate::core::package::{PackageId, PackageState};
use crate::core::version::{Version, VersionRange};
use crate::graph::DependencyGraph;

/// Result of a removal pass. `not_found` and `removed_roots` are
/// advisory data for the caller to warn about, never errors.
#[derive(Debug, Clone, Default)]
pub struct RemovalOutcome {
    /// Names of all packages left in Remove state, including transitive
    /// dependencies the caller never named.
    pub removed: BTreeSet<String>,
    /// Requested names absent from the graph, in the requested spelling.
    pub not_found: BTreeSet<String>,
    /// Requested names that are roots and therefore cannot be removed.
    pub removed_roots: BTreeSet<String>,
}

/// A project reference whose actual version does not satisfy the range
/// some dependent declared on it.
#[derive(Debug, Clone)]
pub struct UnsatisfiedDependency {
    pub project: PackageId,
    pub project_version: Version,
    pub dependent: PackageId,
    pub dependent_version: Version,
    pub range: VersionRange,
}

impl DependencyGraph {
    /// Marks the named packages (and, transitively, their dependencies)
    /// for removal, then restores every package that is still reachable
    /// from a surviving ancestor or is a root.
    pub fn remove(&mut self, names: &[String]) -> RemovalOutcome {
        let mut outcome = RemovalOutcome::default();
        let mut requested: HashSet<PackageId> = HashSet::new();
        let mut targets: HashSet<PackageId> = HashSet::new();

        for name in names {
            let id = PackageId::new(name.as_str());
            if !requested.insert(id.clone()) {
                continue;
            }
            match self.reverse.get_key_value(&id) {
                None => {
                    outcome.not_found.insert(name.clone());
                }
                Some((known, _)) => {
                    if self.roots.contains(known) {
                        outcome.removed_roots.insert(known.as_str().to_string());
                    } else {
                        targets.insert(known.clone());
                    }
                }
            }
        }

        for target in &targets {
            self.mark(target, PackageState::Remove);
        }
        for target in &targets {
            self.restore(target, &targets, PackageState::Remove);
        }

        outcome.removed = self
            .reverse
            .keys()
            .filter(|id| self.packages[*id].state == PackageState::Remove)
            .map(|id| id.as_str().to_string())
            .collect();
        outcome
    }

    /// Construction-time ignore pass. Same mark/restore mechanics as
    /// `remove` with the Ignore terminal state; patterns are literal
    /// names or wildcard globs, matched case-insensitively, and names
    /// absent from the graph are silently skipped.
    pub(crate) fn ignore(&mut self, patterns: &[String]) {
        let targets = self.match_ignore_patterns(patterns);
        for target in &targets {
            self.mark(target, PackageState::Ignore);
        }
        for target in &targets {
            self.restore(target, &targets, PackageState::Ignore);
        }
    }

    fn match_ignore_patterns(&self, patterns: &[String]) -> HashSet<PackageId> {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };
        let mut targets = HashSet::new();
        for raw in patterns {
            match Pattern::new(raw) {
                Ok(pattern) => {
                    for id in self.reverse.keys() {
                        if pattern.matches_with(id.as_str(), options) {
                            targets.insert(id.clone());
                        }
                    }
                }
                Err(_) => {
                    if let Some((known, _)) =
                        self.reverse.get_key_value(&PackageId::new(raw.as_str()))
                    {
                        targets.insert(known.clone());
                    }
                }
            }
        }
        targets
    }

    /// Transitively downward-closed marking. Revisiting a node is
    /// idempotent; diamonds are revisited rather than short-circuited so
    /// the result never depends on visit order.
    ///
    /// Ignore is terminal: a removal pass stops at an ignored node and
    /// leaves its subtree untouched.
    fn mark(&mut self, id: &PackageId, state: PackageState) {
        let package = self
            .packages
            .get_mut(id)
            .expect("marked package missing from arena");
        if package.state == PackageState::Ignore && state != PackageState::Ignore {
            return;
        }
        package.state = state;
        if let Some(dependencies) = self.forward.get(id).cloned() {
            for dependency in &dependencies {
                self.mark(dependency, state);
            }
        }
    }

    /// Flips a package back to Keep when some reverse neighbor survives
    /// in Keep state (and the package is not itself a current target),
    /// or when it is a non-target root. Recurses over forward edges:
    /// un-removing a package means its own dependencies may need to
    /// survive too. Only packages in the `from` state of the current
    /// pass are touched, so a removal pass cannot un-ignore anything and
    /// the fixed point is independent of target iteration order.
    fn restore(&mut self, id: &PackageId, exclude: &HashSet<PackageId>, from: PackageState) {
        let dependents = &self.reverse[id];
        let has_keeper = dependents
            .iter()
            .any(|dependent| self.packages[dependent].state == PackageState::Keep);
        let kept_root = self.roots.contains(id) && !exclude.contains(id);

        if (has_keeper && !exclude.contains(id)) || kept_root {
            let package = self
                .packages
                .get_mut(id)
                .expect("restored package missing from arena");
            if package.state == from {
                package.state = PackageState::Keep;
            }
        }

        if let Some(dependencies) = self.forward.get(id).cloned() {
            for dependency in &dependencies {
                self.restore(dependency, exclude, from);
            }
        }
    }

    /// For every project reference, yields each dependent whose declared
    /// range does not admit the project's actual version. Read-only;
    /// results are sorted by (project, dependent) for determinism.
    pub fn unsatisfied_project_dependencies(&self) -> Vec<UnsatisfiedDependency> {
        let mut projects: Vec<&PackageId> = self
            .reverse
            .keys()
            .filter(|id| self.packages[*id].is_project_reference)
            .collect();
        projects.sort();

        let mut unsatisfied = Vec::new();
        for id in projects {
            let project = &self.packages[id];
            let mut dependents: Vec<&PackageId> = self.reverse[id].iter().collect();
            dependents.sort();
            for dependent_id in dependents {
                if dependent_id == id {
                    continue;
                }
                let dependent = &self.packages[dependent_id];
                for dependency in &dependent.dependencies {
                    if dependency.id == *id && !dependency.range.matches(&project.version) {
                        unsatisfied.push(UnsatisfiedDependency {
                            project: project.id.clone(),
                            project_version: project.version.clone(),
                            dependent: dependent.id.clone(),
                            dependent_version: dependent.version.clone(),
                            range: dependency.range.clone(),
                        });
                    }
                }
            }
        }
        unsatisfied
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap, HashSet};

    use crate::core::package::{Dependency, Package, PackageId, PackageState};
    use crate::core::version::{Version, VersionRange};
    use crate::graph::builder::build_graph;
    use crate::graph::DependencyGraph;

    fn package(name: &str, deps: &[&str]) -> (PackageId, Package) {
        let dependencies = deps
            .iter()
            .map(|dep| Dependency::new(*dep, VersionRange::any()))
            .collect();
        (
            PackageId::new(name),
            Package::new(name, Version::parse("1.0.0"), false, dependencies),
        )
    }

    fn graph(specs: &[(&str, &[&str])], root_names: &[&str]) -> DependencyGraph {
        let packages: HashMap<PackageId, Package> =
            specs.iter().map(|(name, deps)| package(name, deps)).collect();
        let roots: HashSet<PackageId> = root_names.iter().map(|name| PackageId::new(*name)).collect();
        build_graph(packages, &roots, &[])
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn state(graph: &DependencyGraph, name: &str) -> PackageState {
        graph.packages[&PackageId::new(name)].state
    }

    #[test]
    fn removal_is_downward_closed_when_no_other_keeper() {
        // R -> A -> B, R2 -> A: removing A removes B too, roots survive.
        let mut graph = graph(
            &[("R", &["A"]), ("R2", &["A"]), ("A", &["B"]), ("B", &[])],
            &["R", "R2"],
        );
        let outcome = graph.remove(&["A".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A", "B"]);
        assert!(outcome.not_found.is_empty());
        assert!(outcome.removed_roots.is_empty());
        assert_eq!(state(&graph, "R"), PackageState::Keep);
        assert_eq!(state(&graph, "R2"), PackageState::Keep);
    }

    #[test]
    fn shared_dependency_with_surviving_dependent_is_restored() {
        // R -> A -> B and C (non-root) -> B: only A goes.
        let mut graph = graph(
            &[("R", &["A", "C"]), ("A", &["B"]), ("B", &[]), ("C", &["B"])],
            &["R"],
        );
        let outcome = graph.remove(&["A".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A"]);
        assert_eq!(state(&graph, "B"), PackageState::Keep);
        assert_eq!(state(&graph, "C"), PackageState::Keep);
    }

    #[test]
    fn roots_are_never_removed() {
        let mut graph = graph(&[("R", &["A"]), ("A", &[])], &["R"]);
        let outcome = graph.remove(&["R".to_string()]);

        assert!(outcome.removed.is_empty());
        assert_eq!(names(&outcome.removed_roots), vec!["R"]);
        assert_eq!(state(&graph, "R"), PackageState::Keep);
        assert_eq!(state(&graph, "A"), PackageState::Keep);
    }

    #[test]
    fn unknown_names_are_reported_without_touching_state() {
        let mut graph = graph(&[("R", &["A"]), ("A", &[])], &["R"]);
        let outcome = graph.remove(&["DoesNotExist".to_string()]);

        assert!(outcome.removed.is_empty());
        assert_eq!(names(&outcome.not_found), vec!["DoesNotExist"]);
        assert_eq!(state(&graph, "A"), PackageState::Keep);
    }

    #[test]
    fn removal_resolves_names_case_insensitively() {
        let mut graph = graph(&[("R", &["Serilog"]), ("Serilog", &[])], &["R"]);
        let outcome = graph.remove(&["SERILOG".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["Serilog"]);
    }

    #[test]
    fn diamond_dependencies_produce_correct_results() {
        // A -> {B, C}, B -> D, C -> D: removing A takes the whole diamond.
        let mut graph = graph(
            &[
                ("R", &["A", "K"]),
                ("A", &["B", "C"]),
                ("B", &["D"]),
                ("C", &["D"]),
                ("D", &[]),
                ("K", &[]),
            ],
            &["R"],
        );
        let outcome = graph.remove(&["A".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A", "B", "C", "D"]);
        assert_eq!(state(&graph, "K"), PackageState::Keep);
    }

    #[test]
    fn removed_set_is_independent_of_target_order() {
        let build = || {
            graph(
                &[
                    ("R", &["A", "B", "Other"]),
                    ("A", &["Shared"]),
                    ("B", &["Shared", "Leaf"]),
                    ("Shared", &[]),
                    ("Leaf", &[]),
                    ("Other", &["Shared"]),
                ],
                &["R"],
            )
        };

        let mut forward = build();
        let first = forward.remove(&["A".to_string(), "B".to_string()]);
        let mut reversed = build();
        let second = reversed.remove(&["B".to_string(), "A".to_string()]);

        assert_eq!(first.removed, second.removed);
        assert_eq!(names(&first.removed), vec!["A", "B", "Leaf"]);
        // Shared survives through Other.
        assert_eq!(state(&forward, "Shared"), PackageState::Keep);
    }

    #[test]
    fn mutual_targets_do_not_keep_each_other_alive() {
        // A -> C, B -> C: removing both A and B must also remove C even
        // though each target is the other's excuse to stay.
        let mut graph = graph(
            &[("R", &["A", "B"]), ("A", &["C"]), ("B", &["C"]), ("C", &[])],
            &["R"],
        );
        let outcome = graph.remove(&["A".to_string(), "B".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A", "B", "C"]);
    }

    #[test]
    fn repeated_removal_passes_accumulate() {
        let mut graph = graph(
            &[("R", &["A", "B"]), ("A", &[]), ("B", &[])],
            &["R"],
        );
        graph.remove(&["A".to_string()]);
        let outcome = graph.remove(&["B".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A", "B"]);
    }

    #[test]
    fn ignored_packages_stay_out_of_removal_accounting() {
        let packages: HashMap<PackageId, Package> = [
            package("R", &["A", "Noise"]),
            package("A", &[]),
            package("Noise", &[]),
        ]
        .into_iter()
        .collect();
        let roots: HashSet<PackageId> = [PackageId::new("R")].into_iter().collect();
        let mut graph = build_graph(packages, &roots, &["Noise".to_string()]);

        let outcome = graph.remove(&["A".to_string()]);
        assert_eq!(names(&outcome.removed), vec!["A"]);
        assert_eq!(state(&graph, "Noise"), PackageState::Ignore);
    }

    #[test]
    fn later_removal_passes_leave_ignored_dependencies_ignored() {
        // R -> {A, I} and A -> I, with I ignored at construction:
        // removing A must not flip I through Remove back to Keep.
        let packages: HashMap<PackageId, Package> = [
            package("R", &["A", "I"]),
            package("A", &["I"]),
            package("I", &[]),
        ]
        .into_iter()
        .collect();
        let roots: HashSet<PackageId> = [PackageId::new("R")].into_iter().collect();
        let mut graph = build_graph(packages, &roots, &["I".to_string()]);
        assert_eq!(state(&graph, "I"), PackageState::Ignore);

        let outcome = graph.remove(&["A".to_string()]);

        assert_eq!(names(&outcome.removed), vec!["A"]);
        assert_eq!(state(&graph, "I"), PackageState::Ignore);
    }

    #[test]
    fn removing_an_ignored_package_is_a_no_op() {
        let packages: HashMap<PackageId, Package> =
            [package("R", &["I"]), package("I", &[])].into_iter().collect();
        let roots: HashSet<PackageId> = [PackageId::new("R")].into_iter().collect();
        let mut graph = build_graph(packages, &roots, &["I".to_string()]);

        let outcome = graph.remove(&["I".to_string()]);

        assert!(outcome.removed.is_empty());
        assert!(outcome.not_found.is_empty());
        assert_eq!(state(&graph, "I"), PackageState::Ignore);
    }

    #[test]
    fn unsatisfied_project_dependency_is_detected() {
        let mut packages: HashMap<PackageId, Package> = HashMap::new();
        let project = Package::new("Contracts", Version::parse("1.0.0"), true, Vec::new());
        packages.insert(project.id.clone(), project);
        let dependent = Package::new(
            "App.Client",
            Version::parse("3.2.0"),
            false,
            vec![Dependency::new("Contracts", VersionRange::parse("[2.0.0, )"))],
        );
        packages.insert(dependent.id.clone(), dependent);
        let (root_id, root) = package("R", &["App.Client"]);
        packages.insert(root_id, root);

        let roots: HashSet<PackageId> = [PackageId::new("R")].into_iter().collect();
        let graph = build_graph(packages, &roots, &[]);

        let unsatisfied = graph.unsatisfied_project_dependencies();
        assert_eq!(unsatisfied.len(), 1);
        let entry = &unsatisfied[0];
        assert_eq!(entry.project.as_str(), "Contracts");
        assert_eq!(entry.dependent.as_str(), "App.Client");
        assert_eq!(entry.range.raw, "[2.0.0, )");
    }

    #[test]
    fn satisfied_project_dependencies_yield_nothing() {
        let mut packages: HashMap<PackageId, Package> = HashMap::new();
        let project = Package::new("Contracts", Version::parse("2.1.0"), true, Vec::new());
        packages.insert(project.id.clone(), project);
        let dependent = Package::new(
            "App.Client",
            Version::parse("3.2.0"),
            false,
            vec![Dependency::new("Contracts", VersionRange::parse("[2.0.0, )"))],
        );
        packages.insert(dependent.id.clone(), dependent);
        let (root_id, root) = package("R", &["App.Client"]);
        packages.insert(root_id, root);

        let roots: HashSet<PackageId> = [PackageId::new("R")].into_iter().collect();
        let graph = build_graph(packages, &roots, &[]);

        assert!(graph.unsatisfied_project_dependencies().is_empty());
    }
}
