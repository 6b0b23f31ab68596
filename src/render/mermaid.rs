use std::collections::HashSet;
use std::io::{self, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::core::package::{Package, PackageId, PackageState};
use crate::error::Result;
use crate::render::{Color, GraphDirection, GraphOptions, GraphSummary, GraphWriter};

/// Mermaid flowchart writer.
///
/// Mermaid attaches the node text to whichever statement mentions the
/// node first, so the writer tracks first mentions and emits the full
/// label (shape plus optional version) only once per node.
pub struct MermaidWriter<W: Write> {
    out: W,
    mentioned: HashSet<PackageId>,
}

impl<W: Write> MermaidWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mentioned: HashSet::new(),
        }
    }

    fn root_text(package: &Package, options: &GraphOptions) -> String {
        if options.include_versions {
            format!(
                "{name}{{{{{name}#64;{version}}}}}",
                name = package.name(),
                version = package.version
            )
        } else {
            format!("{name}{{{{{name}}}}}", name = package.name())
        }
    }

    fn node_text(package: &Package, options: &GraphOptions) -> String {
        if options.include_versions {
            format!(
                "{name}[{name}#64;{version}]",
                name = package.name(),
                version = package.version
            )
        } else {
            package.name().to_string()
        }
    }

    fn mention(&mut self, package: &Package, options: &GraphOptions) -> String {
        if self.mentioned.insert(package.id.clone()) {
            if package.is_root {
                Self::root_text(package, options)
            } else {
                Self::node_text(package, options)
            }
        } else {
            package.name().to_string()
        }
    }

    fn class_def(name: &str, color: Color) -> String {
        let mut def = format!("classDef {} fill:{},stroke:{}", name, color.fill, color.stroke);
        if let Some(text) = color.text {
            def.push_str(",color:");
            def.push_str(text);
        }
        def
    }
}

impl<W: Write> GraphWriter for MermaidWriter<W> {
    fn write_header(&mut self, summary: &GraphSummary, options: &GraphOptions) -> io::Result<()> {
        if let Some(title) = options.title.as_deref().filter(|t| !t.trim().is_empty()) {
            // Mermaid front-matter titles are single-line.
            let title = title.replace('\r', "").replace('\n', "\\n");
            writeln!(self.out, "---")?;
            writeln!(self.out, "title: {title}")?;
            writeln!(self.out, "---")?;
            writeln!(self.out)?;
        }

        writeln!(self.out, "%% Generated by adze")?;
        writeln!(self.out)?;
        match options.direction {
            GraphDirection::LeftToRight => writeln!(self.out, "graph LR")?,
            GraphDirection::TopToBottom => writeln!(self.out, "graph TB")?,
        }
        writeln!(self.out)?;

        writeln!(self.out, "classDef root stroke-width:4px")?;
        writeln!(self.out, "{}", Self::class_def("default", options.palette.default_))?;
        if summary.has_project {
            writeln!(self.out, "{}", Self::class_def("project", options.palette.project))?;
        }
        if summary.has_ignored {
            writeln!(self.out, "{}", Self::class_def("ignored", options.palette.ignored))?;
        }
        if summary.has_removed {
            writeln!(self.out, "{}", Self::class_def("removed", options.palette.removed))?;
        }
        if summary.has_link {
            writeln!(self.out, "{}", Self::class_def("private", options.palette.private))?;
        }
        writeln!(self.out)
    }

    fn write_node(
        &mut self,
        package: &Package,
        summary: &GraphSummary,
        options: &GraphOptions,
    ) -> io::Result<()> {
        if self.mentioned.insert(package.id.clone()) {
            // Isolated node: nothing mentioned it while writing edges.
            if package.is_root {
                writeln!(self.out, "{}", Self::root_text(package, options))?;
            } else {
                writeln!(self.out, "{}", Self::node_text(package, options))?;
            }
        }

        if package.is_root {
            writeln!(self.out, "class {} root", package.name())?;
        }
        let class = match package.state {
            PackageState::Ignore => "ignored",
            PackageState::Remove => "removed",
            PackageState::Keep if package.is_project_reference => "project",
            PackageState::Keep if summary.has_link && package.link.is_none() => "private",
            PackageState::Keep => "default",
        };
        writeln!(self.out, "class {} {}", package.name(), class)?;
        if let Some(link) = package.link.as_deref() {
            writeln!(
                self.out,
                "click {} \"{}\" \"{} {}\"",
                package.name(),
                link,
                package.name(),
                package.version
            )?;
        }
        Ok(())
    }

    fn write_edge(
        &mut self,
        package: &Package,
        dependency: &Package,
        options: &GraphOptions,
    ) -> io::Result<()> {
        let source = self.mention(package, options);
        let destination = self.mention(dependency, options);
        writeln!(self.out, "{source} --> {destination}")
    }

    fn write_footer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Edit,
    View,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditorMode::Edit => "edit",
            EditorMode::View => "view",
        }
    }
}

pub fn parse_editor_mode(input: &str) -> Option<EditorMode> {
    match input.to_ascii_lowercase().as_str() {
        "edit" => Some(EditorMode::Edit),
        "view" => Some(EditorMode::View),
        _ => None,
    }
}

/// Builds a mermaid.live URL carrying the diagram as a zlib-compressed,
/// base64url-encoded editor state (the `pako:` payload format).
pub fn live_editor_url(code: &str, mode: EditorMode) -> Result<String> {
    let state = serde_json::json!({
        "code": code,
        "mermaid": "{\"theme\":\"default\"}",
        "panZoom": true,
    });

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    serde_json::to_writer(&mut encoder, &state).map_err(|err| anyhow::anyhow!(err))?;
    let compressed = encoder.finish()?;

    Ok(format!(
        "https://mermaid.live/{}#pako:{}",
        mode.as_str(),
        URL_SAFE_NO_PAD.encode(compressed)
    ))
}
