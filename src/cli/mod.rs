use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use clap::Parser;

use crate::core::package::PackageState;
use crate::error::{AdzeError, Result};
use crate::graph::builder::build_graph;
use crate::graph::DependencyGraph;
use crate::lockfile;
use crate::registry::{add_links, NuGetClient};
use crate::render::mermaid::{live_editor_url, parse_editor_mode, EditorMode};
use crate::render::{
    parse_direction, GraphOptions, GraphvizWriter, MermaidWriter, Palette,
};
use crate::util::output;

#[derive(Parser, Debug)]
#[command(name = "adze")]
#[command(about = "Trims package dependency graphs", long_about = None)]
pub struct Cli {
    /// Path to a project.assets.json file, or a directory containing one
    pub source: Option<PathBuf>,
    #[arg(short = 'f', long)]
    pub framework: Option<String>,
    #[arg(short = 'r', long)]
    pub runtime: Option<String>,
    /// Write the graph to this file instead of printing a mermaid.live URL
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
    /// Packages to remove along with their exclusive dependencies
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<String>,
    /// Package name patterns to leave out of the graph entirely
    #[arg(short = 'i', long, value_delimiter = ',')]
    pub ignore: Vec<String>,
    #[arg(long, default_value = "LeftToRight")]
    pub direction: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub include_versions: bool,
    /// Show ignored packages in the graph instead of hiding them
    #[arg(long)]
    pub write_ignored: bool,
    /// Look up registry landing pages and attach them to the nodes
    #[arg(long)]
    pub links: bool,
    #[arg(long)]
    pub jobs: Option<usize>,
    #[arg(long, default_value = "edit")]
    pub mermaid_mode: String,
    #[arg(long, env = "ADZE_REGISTRY_URL", default_value = NuGetClient::DEFAULT_BASE_URL)]
    pub registry_url: String,
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli) {
        output::error(&err.to_string());
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let assets_path = locate_assets_file(cli.source.as_deref())?;
    let framework = resolve_framework(&assets_path, cli.framework.as_deref())?;

    let (packages, roots) = lockfile::read_packages(&assets_path, &framework, cli.runtime.as_deref())?;
    let mut graph = build_graph(packages, &roots, &cli.ignore);

    let outcome = graph.remove(&cli.remove);
    for name in &outcome.not_found {
        output::warn(&format!("{name} not found in the dependency graph"));
    }
    for name in &outcome.removed_roots {
        output::warn(&format!(
            "{name} can't be removed because it's a direct dependency of the project"
        ));
    }
    for unsatisfied in graph.unsatisfied_project_dependencies() {
        output::warn(&format!(
            "{}/{} requires {} to satisfy {} but {} does not",
            unsatisfied.dependent,
            unsatisfied.dependent_version,
            unsatisfied.project,
            unsatisfied.range,
            unsatisfied.project_version
        ));
    }

    if cli.links {
        let registry = NuGetClient::new(cli.registry_url.clone()).map_err(AdzeError::Registry)?;
        let cancel = AtomicBool::new(false);
        let failures = add_links(&mut graph, &registry, cli.jobs, &cancel);
        for failure in failures {
            output::warn(&format!(
                "no link for {}: {}",
                failure.package, failure.reason
            ));
        }
    }

    let direction = parse_direction(&cli.direction).ok_or_else(|| {
        AdzeError::Other(anyhow::anyhow!(format!(
            "unknown graph direction '{}'",
            cli.direction
        )))
    })?;
    let options = GraphOptions {
        direction,
        title: cli.title.clone(),
        include_versions: cli.include_versions,
        write_ignored_packages: cli.write_ignored,
        palette: Palette::default(),
    };

    match cli.output.as_deref() {
        Some(path) => write_graph_file(&graph, path, &options),
        None => {
            let mode = parse_editor_mode(&cli.mermaid_mode).ok_or_else(|| {
                AdzeError::Other(anyhow::anyhow!(format!(
                    "unknown mermaid mode '{}'",
                    cli.mermaid_mode
                )))
            })?;
            print_live_editor_url(&graph, &options, mode)
        }
    }
}

/// Accepts the assets file itself, a directory holding it, or a project
/// directory where the SDK put it under obj/.
fn locate_assets_file(source: Option<&Path>) -> Result<PathBuf> {
    let base = match source {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    if base.is_file() {
        return Ok(base);
    }
    for candidate in [
        base.join("project.assets.json"),
        base.join("obj").join("project.assets.json"),
    ] {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(AdzeError::Other(anyhow::anyhow!(format!(
        "no project.assets.json found under {} (run a restore first)",
        base.display()
    ))))
}

fn resolve_framework(assets_path: &Path, requested: Option<&str>) -> Result<String> {
    if let Some(tfm) = requested {
        return Ok(tfm.to_string());
    }
    let frameworks = lockfile::available_frameworks(assets_path)?;
    match frameworks.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(AdzeError::Other(anyhow::anyhow!(format!(
            "no target frameworks in assets at {}",
            assets_path.display()
        )))),
        many => Err(AdzeError::Other(anyhow::anyhow!(format!(
            "pick a target framework with --framework: {}",
            many.join(", ")
        )))),
    }
}

fn write_graph_file(graph: &DependencyGraph, path: &Path, options: &GraphOptions) -> Result<()> {
    // Render into memory first so a failed render never leaves a
    // truncated file behind.
    let mut buffer = Vec::new();
    if is_mermaid_file(path) {
        let mut writer = MermaidWriter::new(&mut buffer);
        crate::render::write_graph(graph, &mut writer, options)?;
    } else {
        let mut writer = GraphvizWriter::new(&mut buffer);
        crate::render::write_graph(graph, &mut writer, options)?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, buffer)?;
    output::info(&format!("{}", path.display()));
    report_removed(graph);
    Ok(())
}

fn print_live_editor_url(
    graph: &DependencyGraph,
    options: &GraphOptions,
    mode: EditorMode,
) -> Result<()> {
    let mut buffer = Vec::new();
    let mut writer = MermaidWriter::new(&mut buffer);
    crate::render::write_graph(graph, &mut writer, options)?;
    let code = String::from_utf8(buffer)
        .map_err(|err| AdzeError::Other(anyhow::Error::new(err)))?;

    println!("{}", live_editor_url(&code, mode)?);
    report_removed(graph);
    Ok(())
}

fn report_removed(graph: &DependencyGraph) {
    let mut removed: Vec<&str> = graph
        .packages()
        .filter(|package| package.state == PackageState::Remove)
        .map(|package| package.name())
        .collect();
    if removed.is_empty() {
        return;
    }
    removed.sort_unstable_by_key(|name| name.to_ascii_lowercase());
    output::info(&format!(
        "{} package(s) can be removed: {}",
        removed.len(),
        removed.join(", ")
    ));
}

fn is_mermaid_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("mmd") || ext.eq_ignore_ascii_case("mermaid")
    )
}
