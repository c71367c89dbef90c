//! The `updpilot.xml` manifest
//!
//! A manifest is a root element holding `<step major=".." minor="..">`
//! elements. Each step holds items executed in `order`:
//!
//! ```xml
//! <updpilot>
//!   <step major="2023" minor="2">
//!     <file-sql modify="2023-02-tables.sql" order="1"/>
//!     <file-csv modify="countries.csv" table="countries" key="code" order="2"/>
//!     <execute linux="./post.sh" win="post.cmd" order="3"/>
//!     <statement target="postgresql">macro_createunique(t; ux_t; code);</statement>
//!   </step>
//! </updpilot>
//! ```
//!
//! Steps are kept sorted by version; items keep document order until a
//! step is asked for the items of a given adapter.

use crate::error::{CoreError, CoreResult};
use crate::sql_utils::{non_blank, parse_flag};
use crate::version::StepVersion;
use roxmltree::Node;
use std::path::Path;

/// Target value matching every adapter
pub const TARGET_ALL: &str = "all";

/// A parsed manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Steps in ascending version order (stable for equal versions)
    pub steps: Vec<Step>,
}

/// One version-tagged step
#[derive(Debug, Clone)]
pub struct Step {
    /// Step version
    pub version: StepVersion,

    /// Transaction hint declared on the step element
    pub transaction: bool,

    /// Items in document order
    pub items: Vec<Item>,
}

/// One action within a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// What the item does
    pub kind: ItemKind,

    /// Intra-step execution order; ties keep document order
    pub order: i32,

    /// Adapter name or `all`
    pub target: String,

    /// Transaction hint for an external boundary
    pub transaction: bool,

    /// 1-based source line, for diagnostics
    pub line: u32,
}

/// The four item kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// `<file-sql modify="...">`
    SqlFile { modify: String },

    /// `<file-csv modify="..." table="..." key="...">`
    CsvFile {
        modify: String,
        table: String,
        key: Option<String>,
    },

    /// `<execute linux="..." win="...">`
    Execute {
        linux: Option<String>,
        windows: Option<String>,
    },

    /// `<statement>...</statement>`
    Statement { sql: String },
}

impl ItemKind {
    /// Element name as written in the manifest
    pub fn element_name(&self) -> &'static str {
        match self {
            ItemKind::SqlFile { .. } => "file-sql",
            ItemKind::CsvFile { .. } => "file-csv",
            ItemKind::Execute { .. } => "execute",
            ItemKind::Statement { .. } => "statement",
        }
    }
}

impl Item {
    /// Whether this item applies to `adapter`
    pub fn targets(&self, adapter: &str) -> bool {
        self.target.eq_ignore_ascii_case(TARGET_ALL) || self.target.eq_ignore_ascii_case(adapter)
    }
}

impl Step {
    /// Items applying to `adapter`, stable-sorted by `order`.
    ///
    /// With no adapter every item is kept.
    pub fn items_for(&self, adapter: Option<&str>) -> Vec<&Item> {
        let mut items: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| adapter.map_or(true, |a| item.targets(a)))
            .collect();
        items.sort_by_key(|item| item.order);
        items
    }
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    /// Parse a manifest from XML text
    pub fn parse(xml: &str) -> CoreResult<Self> {
        Self::parse_named(xml, "<inline>")
    }

    fn parse_named(xml: &str, name: &str) -> CoreResult<Self> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| CoreError::ManifestParse {
            path: name.to_string(),
            message: e.to_string(),
        })?;

        let mut steps = Vec::new();
        for node in doc.root_element().children().filter(Node::is_element) {
            if node.tag_name().name() != "step" {
                log::debug!(
                    "Ignoring manifest element <{}> at line {}",
                    node.tag_name().name(),
                    line_of(&node)
                );
                continue;
            }
            steps.push(parse_step(&node)?);
        }

        // stable: equal versions keep document order
        steps.sort_by_key(|s| s.version);
        Ok(Self { steps })
    }

    /// The newest step, if any
    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Steps newer than `baseline`
    pub fn pending(&self, baseline: StepVersion) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.version > baseline)
    }
}

fn line_of(node: &Node<'_, '_>) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

fn invalid(node: &Node<'_, '_>, message: impl Into<String>) -> CoreError {
    CoreError::ManifestInvalid {
        element: node.tag_name().name().to_string(),
        line: line_of(node),
        message: message.into(),
    }
}

fn required_attr(node: &Node<'_, '_>, name: &str) -> CoreResult<String> {
    node.attribute(name)
        .and_then(non_blank)
        .map(str::to_string)
        .ok_or_else(|| invalid(node, format!("missing required attribute '{name}'")))
}

fn optional_attr(node: &Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).and_then(non_blank).map(str::to_string)
}

fn int_attr(node: &Node<'_, '_>, name: &str) -> CoreResult<Option<i32>> {
    match optional_attr(node, name) {
        Some(v) => v
            .parse::<i32>()
            .map(Some)
            .map_err(|_| invalid(node, format!("attribute '{name}' is not an integer: {v}"))),
        None => Ok(None),
    }
}

fn parse_step(node: &Node<'_, '_>) -> CoreResult<Step> {
    let major = int_attr(node, "major")?
        .ok_or_else(|| invalid(node, "missing required attribute 'major'"))?;
    let minor = int_attr(node, "minor")?
        .ok_or_else(|| invalid(node, "missing required attribute 'minor'"))?;

    let mut items = Vec::new();
    for child in node.children().filter(Node::is_element) {
        match parse_item(&child)? {
            Some(item) => items.push(item),
            None => log::info!(
                "Element <{}> at line {} is not valid inside a step: ignored",
                child.tag_name().name(),
                line_of(&child)
            ),
        }
    }

    Ok(Step {
        version: StepVersion::new(major, minor),
        transaction: node.attribute("transaction").is_some_and(parse_flag),
        items,
    })
}

fn parse_item(node: &Node<'_, '_>) -> CoreResult<Option<Item>> {
    let kind = match node.tag_name().name() {
        "file-sql" => ItemKind::SqlFile {
            modify: required_attr(node, "modify")?,
        },
        "file-csv" => ItemKind::CsvFile {
            modify: required_attr(node, "modify")?,
            table: required_attr(node, "table")?,
            key: optional_attr(node, "key"),
        },
        "execute" => ItemKind::Execute {
            linux: optional_attr(node, "linux"),
            windows: optional_attr(node, "win"),
        },
        "statement" => ItemKind::Statement {
            sql: node
                .children()
                .filter(Node::is_text)
                .filter_map(|n| n.text())
                .collect(),
        },
        _ => return Ok(None),
    };

    Ok(Some(Item {
        kind,
        order: int_attr(node, "order")?.unwrap_or(0),
        target: optional_attr(node, "target").unwrap_or_else(|| TARGET_ALL.to_string()),
        transaction: node.attribute("transaction").is_some_and(parse_flag),
        line: line_of(node),
    }))
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod tests;
