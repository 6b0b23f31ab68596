use std::io::{self, Write};

use crate::core::package::{Package, PackageState};
use crate::render::{GraphDirection, GraphOptions, GraphSummary, GraphWriter};

/// Graphviz dot writer. Node identity is the package label so the same
/// string is used for node declarations and edge endpoints.
pub struct GraphvizWriter<W: Write> {
    out: W,
}

impl<W: Write> GraphvizWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn node_id(package: &Package, options: &GraphOptions) -> String {
        if options.include_versions {
            package.label()
        } else {
            package.name().to_string()
        }
    }
}

impl<W: Write> GraphWriter for GraphvizWriter<W> {
    fn write_header(&mut self, _summary: &GraphSummary, options: &GraphOptions) -> io::Result<()> {
        writeln!(self.out, "# Generated by adze")?;
        writeln!(self.out)?;
        writeln!(self.out, "digraph")?;
        writeln!(self.out, "{{")?;
        match options.direction {
            GraphDirection::LeftToRight => writeln!(self.out, "  rankdir=LR")?,
            GraphDirection::TopToBottom => writeln!(self.out, "  rankdir=TB")?,
        }
        if let Some(title) = options.title.as_deref() {
            writeln!(self.out, "  label = \"{}\"", escape(title))?;
        }
        writeln!(
            self.out,
            "  node [ fontname = \"Segoe UI, sans-serif\", shape = box, style = filled, color = {} ]",
            options.palette.default_.fill
        )?;
        writeln!(self.out)
    }

    fn write_node(
        &mut self,
        package: &Package,
        _summary: &GraphSummary,
        options: &GraphOptions,
    ) -> io::Result<()> {
        let mut attributes: Vec<String> = Vec::new();
        match package.state {
            PackageState::Ignore => {
                attributes.push(format!("color = {}", options.palette.ignored.fill));
            }
            PackageState::Remove => {
                attributes.push(format!("color = {}", options.palette.removed.fill));
            }
            PackageState::Keep if package.is_project_reference => {
                attributes.push(format!("color = {}", options.palette.project.fill));
            }
            PackageState::Keep => {}
        }
        if let Some(link) = package.link.as_deref() {
            attributes.push(format!("URL = \"{}\"", escape(link)));
        }

        write!(self.out, "  \"{}\"", escape(&Self::node_id(package, options)))?;
        if !attributes.is_empty() {
            write!(self.out, " [ {} ]", attributes.join(", "))?;
        }
        writeln!(self.out)
    }

    fn write_edge(
        &mut self,
        package: &Package,
        dependency: &Package,
        options: &GraphOptions,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "  \"{}\" -> \"{}\"",
            escape(&Self::node_id(package, options)),
            escape(&Self::node_id(dependency, options))
        )
    }

    fn write_footer(&mut self) -> io::Result<()> {
        writeln!(self.out, "}}")
    }
}

fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}
