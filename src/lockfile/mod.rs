use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::package::{Dependency, Package, PackageId};
use crate::core::version::{Version, VersionRange};

#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse assets at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("target framework \"{tfm}\" is not available in assets at {path} (JSON path: project.frameworks)")]
    FrameworkNotFound { tfm: String, path: PathBuf },
    #[error("multiple target frameworks are matching \"{tfm}\" in assets at {path} (JSON path: project.frameworks)")]
    AmbiguousFramework { tfm: String, path: PathBuf },
    #[error("target \"{target_id}\" is not available in assets at {path} (JSON path: targets)")]
    TargetNotFound { target_id: String, path: PathBuf },
    #[error("multiple targets are matching \"{target_id}\" in assets at {path} (JSON path: targets)")]
    AmbiguousTarget { target_id: String, path: PathBuf },
    #[error("library \"{key}\" in assets at {path} must have a name and a version")]
    MalformedLibrary { key: String, path: PathBuf },
}

pub type LockfileResult<T> = std::result::Result<T, LockfileError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetsFile {
    #[serde(default)]
    targets: BTreeMap<String, BTreeMap<String, TargetLibrary>>,
    #[serde(default)]
    project_file_dependency_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    project: ProjectSection,
}

#[derive(Debug, Deserialize)]
struct TargetLibrary {
    #[serde(rename = "type")]
    library_type: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectSection {
    #[serde(default)]
    frameworks: BTreeMap<String, FrameworkSection>,
}

#[derive(Debug, Deserialize)]
struct FrameworkSection {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

/// Reads the resolved package set and the root set for one target out
/// of a `project.assets.json` file.
///
/// An absent or ambiguous framework/target is a hard error: it means
/// the lock file cannot answer for the requested build, so graph
/// construction must not proceed.
pub fn read_packages(
    path: &Path,
    tfm: &str,
    rid: Option<&str>,
) -> LockfileResult<(HashMap<PackageId, Package>, HashSet<PackageId>)> {
    let assets = load(path)?;
    let framework = select_framework(&assets, tfm, path)?;
    let target = select_target(&assets, &framework, rid, path)?;

    let mut packages: HashMap<PackageId, Package> = HashMap::new();
    for (key, library) in &assets.targets[&target] {
        let (name, version) = key
            .split_once('/')
            .filter(|(name, version)| !name.is_empty() && !version.is_empty())
            .ok_or_else(|| LockfileError::MalformedLibrary {
                key: key.clone(),
                path: path.to_path_buf(),
            })?;
        let is_project_reference = library.library_type.as_deref() == Some("project");
        let dependencies = library
            .dependencies
            .iter()
            .map(|(dep, range)| Dependency::new(dep.clone(), VersionRange::parse(range.clone())))
            .collect();
        let package = Package::new(name, Version::parse(version), is_project_reference, dependencies);
        packages.insert(package.id.clone(), package);
    }

    let mut roots: HashSet<PackageId> = HashSet::new();
    for (group, dependencies) in &assets.project_file_dependency_groups {
        if !group.eq_ignore_ascii_case(&framework) {
            continue;
        }
        for dependency in dependencies {
            // Entries look like "Serilog >= 3.1.1"; the name stops at
            // the first space.
            let name = dependency.split(' ').next().unwrap_or(dependency);
            let id = PackageId::new(name);
            if packages.contains_key(&id) {
                roots.insert(id);
            }
        }
    }
    if let Some(section) = assets.project.frameworks.get(&framework) {
        for name in section.dependencies.keys() {
            let id = PackageId::new(name.clone());
            if packages.contains_key(&id) {
                roots.insert(id);
            }
        }
    }

    for root in &roots {
        if let Some(package) = packages.get_mut(root) {
            package.is_root = true;
        }
    }

    Ok((packages, roots))
}

/// Framework aliases present in the assets file, for defaulting when
/// the caller did not pick one.
pub fn available_frameworks(path: &Path) -> LockfileResult<Vec<String>> {
    let assets = load(path)?;
    Ok(assets.project.frameworks.keys().cloned().collect())
}

fn load(path: &Path) -> LockfileResult<AssetsFile> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| LockfileError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn select_framework(assets: &AssetsFile, tfm: &str, path: &Path) -> LockfileResult<String> {
    let matches: Vec<&String> = assets
        .project
        .frameworks
        .keys()
        .filter(|key| key.eq_ignore_ascii_case(tfm))
        .collect();
    match matches.as_slice() {
        [] => Err(LockfileError::FrameworkNotFound {
            tfm: tfm.to_string(),
            path: path.to_path_buf(),
        }),
        [framework] => Ok((*framework).clone()),
        _ => Err(LockfileError::AmbiguousFramework {
            tfm: tfm.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

fn select_target(
    assets: &AssetsFile,
    framework: &str,
    rid: Option<&str>,
    path: &Path,
) -> LockfileResult<String> {
    let rid = rid.filter(|value| !value.is_empty());
    let matches: Vec<&String> = assets
        .targets
        .keys()
        .filter(|key| {
            let (target_framework, target_rid) = match key.split_once('/') {
                Some((fw, r)) => (fw, Some(r)),
                None => (key.as_str(), None),
            };
            if !target_framework.eq_ignore_ascii_case(framework) {
                return false;
            }
            match (rid, target_rid) {
                (None, None) => true,
                (Some(requested), Some(present)) => requested.eq_ignore_ascii_case(present),
                _ => false,
            }
        })
        .collect();

    let target_id = match rid {
        Some(rid) => format!("{framework}/{rid}"),
        None => framework.to_string(),
    };
    match matches.as_slice() {
        [] => Err(LockfileError::TargetNotFound {
            target_id,
            path: path.to_path_buf(),
        }),
        [target] => Ok((*target).clone()),
        _ => Err(LockfileError::AmbiguousTarget {
            target_id,
            path: path.to_path_buf(),
        }),
    }
}
