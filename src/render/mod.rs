use std::io;

use crate::core::package::{Package, PackageState};
use crate::graph::DependencyGraph;

pub mod graphviz;
pub mod mermaid;

pub use graphviz::GraphvizWriter;
pub use mermaid::MermaidWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphDirection {
    LeftToRight,
    TopToBottom,
}

pub fn parse_direction(input: &str) -> Option<GraphDirection> {
    match input.to_ascii_lowercase().as_str() {
        "lefttoright" | "left-to-right" | "lr" => Some(GraphDirection::LeftToRight),
        "toptobottom" | "top-to-bottom" | "tb" => Some(GraphDirection::TopToBottom),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Color {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub text: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub default_: Color,
    pub project: Color,
    pub private: Color,
    pub removed: Color,
    pub ignored: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            default_: Color {
                fill: "aquamarine",
                stroke: "#009061",
                text: Some("#333333"),
            },
            project: Color {
                fill: "skyblue",
                stroke: "#05587C",
                text: None,
            },
            private: Color {
                fill: "moccasin",
                stroke: "#AF8844",
                text: None,
            },
            removed: Color {
                fill: "lightcoral",
                stroke: "#A42A2A",
                text: None,
            },
            ignored: Color {
                fill: "lightgray",
                stroke: "#7A7A7A",
                text: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub direction: GraphDirection,
    pub title: Option<String>,
    pub include_versions: bool,
    pub write_ignored_packages: bool,
    pub palette: Palette,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            direction: GraphDirection::LeftToRight,
            title: None,
            include_versions: false,
            write_ignored_packages: false,
            palette: Palette::default(),
        }
    }
}

/// What the visible part of the graph contains, so writers can emit
/// only the style declarations they need.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphSummary {
    pub has_project: bool,
    pub has_ignored: bool,
    pub has_removed: bool,
    pub has_link: bool,
}

/// Format strategy. Writers own their sink; shared state lives in the
/// options passed to every call.
pub trait GraphWriter {
    fn write_header(&mut self, summary: &GraphSummary, options: &GraphOptions) -> io::Result<()>;
    fn write_node(
        &mut self,
        package: &Package,
        summary: &GraphSummary,
        options: &GraphOptions,
    ) -> io::Result<()>;
    fn write_edge(
        &mut self,
        package: &Package,
        dependency: &Package,
        options: &GraphOptions,
    ) -> io::Result<()>;
    fn write_footer(&mut self) -> io::Result<()>;
}

/// Drives a writer over the graph: header, edges, nodes, footer.
///
/// Nodes and edges go through the same ignored-visibility predicate and
/// are ordered lexicographically by package name so the output is
/// reproducible.
pub fn write_graph(
    graph: &DependencyGraph,
    writer: &mut dyn GraphWriter,
    options: &GraphOptions,
) -> io::Result<()> {
    let visible =
        |package: &Package| options.write_ignored_packages || package.state != PackageState::Ignore;

    let mut summary = GraphSummary::default();
    for package in graph.packages().filter(|p| visible(p)) {
        summary.has_project |= package.is_project_reference;
        summary.has_ignored |= package.state == PackageState::Ignore;
        summary.has_removed |= package.state == PackageState::Remove;
        summary.has_link |= package.link.is_some();
    }

    writer.write_header(&summary, options)?;

    let mut sources: Vec<&Package> = graph
        .forward
        .keys()
        .map(|id| &graph.packages[id])
        .filter(|p| visible(p))
        .collect();
    sources.sort_by(|a, b| a.id.cmp(&b.id));
    for source in sources {
        let mut dependencies: Vec<&Package> = graph.forward[&source.id]
            .iter()
            .map(|id| &graph.packages[id])
            .filter(|p| visible(p))
            .collect();
        dependencies.sort_by(|a, b| a.id.cmp(&b.id));
        for dependency in dependencies {
            writer.write_edge(source, dependency, options)?;
        }
    }

    let mut nodes: Vec<&Package> = graph.packages().filter(|p| visible(p)).collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    for node in nodes {
        writer.write_node(node, &summary, options)?;
    }

    writer.write_footer()
}
