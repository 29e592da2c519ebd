//! Projection of a [`GraphContext`] into Mermaid flowchart text.

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Layout hint emitted after `graph`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowDirection {
    #[default]
    TopDown,
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopDown => "TD",
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowDirection {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TD" => Ok(Self::TopDown),
            "TB" => Ok(Self::TopBottom),
            "BT" => Ok(Self::BottomTop),
            "LR" => Ok(Self::LeftRight),
            "RL" => Ok(Self::RightLeft),
            _ => Err(GraphError::invalid_option(format!(
                "unknown diagram direction '{s}' (expected TD, TB, BT, LR or RL)"
            ))),
        }
    }
}

/// Rendering options
#[derive(Debug, Clone)]
pub struct MermaidOptions {
    pub direction: FlowDirection,
    /// Label -> colour token (`#f9f`, `lightblue`, ...)
    pub node_colors: BTreeMap<String, String>,
    /// Property shown as the node's name
    pub name_property: String,
}

impl Default for MermaidOptions {
    fn default() -> Self {
        Self {
            direction: FlowDirection::default(),
            node_colors: BTreeMap::new(),
            name_property: "name".to_string(),
        }
    }
}

impl MermaidOptions {
    pub fn new(direction: FlowDirection) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, label: impl Into<String>, color: impl Into<String>) -> Self {
        self.node_colors.insert(label.into(), color.into());
        self
    }

    pub fn with_name_property(mut self, key: impl Into<String>) -> Self {
        self.name_property = key.into();
        self
    }
}

/// Render `ctx` with a direction given as text and an optional colour map
pub fn context_to_mermaid(
    ctx: &GraphContext,
    direction: &str,
    node_color_map: Option<&BTreeMap<String, String>>,
) -> Result<String> {
    let mut options = MermaidOptions::new(direction.parse()?);
    if let Some(colors) = node_color_map {
        options.node_colors = colors.clone();
    }
    render(ctx, &options)
}

/// Render `ctx` as a Mermaid flowchart.
///
/// Output depends only on `ctx` and `options`: one line per node in context
/// order, one line per edge in context order, then one `classDef` per coloured
/// label present in the context, sorted by label.
pub fn render(ctx: &GraphContext, options: &MermaidOptions) -> Result<String> {
    for (label, color) in &options.node_colors {
        validate_color(label, color)?;
    }

    let present: HashSet<&str> = ctx.labels().into_iter().collect();
    let mut class_ids = IdAllocator::new("cls_");
    let classes: BTreeMap<&str, String> = options
        .node_colors
        .keys()
        .filter(|label| present.contains(label.as_str()))
        .map(|label| (label.as_str(), class_ids.assign(label)))
        .collect();

    let mut node_ids = IdAllocator::new("n_");
    let mut lines = vec![format!("graph {}", options.direction)];

    for node in ctx.nodes() {
        let safe_id = node_ids.assign(node.id());
        let name = escape_text(&node.display_name(&options.name_property));
        let label = escape_text(node.label());
        let mut line = format!("    {safe_id}[\"{name}<br/><small>({label})</small>\"]");
        if let Some(class) = classes.get(node.label()) {
            line.push_str(":::");
            line.push_str(class);
        }
        lines.push(line);
    }

    for edge in ctx.edges() {
        let src = node_ids.assign(edge.source_id());
        let dst = node_ids.assign(edge.target_id());
        lines.push(format!(
            "    {src} -->|{}| {dst}",
            escape_text(edge.relation_type())
        ));
    }

    for (label, class) in &classes {
        if let Some(color) = options.node_colors.get(*label) {
            lines.push(format!("    classDef {class} fill:{color}"));
        }
    }

    Ok(lines.join("\n"))
}

fn validate_color(label: &str, color: &str) -> Result<()> {
    if color.is_empty() {
        return Err(GraphError::invalid_option(format!(
            "empty colour for label '{label}'"
        )));
    }
    if color
        .chars()
        .any(|c| c == ';' || c == ',' || c.is_whitespace())
    {
        return Err(GraphError::invalid_option(format!(
            "colour '{color}' for label '{label}' contains a delimiter"
        )));
    }
    Ok(())
}

/// Maps arbitrary ids onto Mermaid-safe identifiers.
///
/// Every distinct input gets a distinct output; the prefix keeps outputs clear
/// of Mermaid keywords such as `end`.
struct IdAllocator {
    prefix: &'static str,
    assigned: HashMap<String, String>,
    taken: HashSet<String>,
}

impl IdAllocator {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            assigned: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    fn assign(&mut self, raw: &str) -> String {
        if let Some(existing) = self.assigned.get(raw) {
            return existing.clone();
        }

        let base: String = std::iter::once(self.prefix.to_string())
            .chain(raw.chars().map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c.to_string()
                } else {
                    "_".to_string()
                }
            }))
            .collect();

        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }

        self.taken.insert(candidate.clone());
        self.assigned.insert(raw.to_string(), candidate.clone());
        candidate
    }
}

/// Entity-escape characters that would end a quoted label or an edge label
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '#' => out.push_str("#35;"),
            '"' => out.push_str("#quot;"),
            '|' => out.push_str("#124;"),
            '<' => out.push_str("#lt;"),
            '>' => out.push_str("#gt;"),
            '\n' | '\r' | '\t' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
