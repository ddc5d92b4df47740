//! Mutable SVG element tree.
//!
//! Floor plans are parsed once with `roxmltree` into an arena of nodes. Every node keeps a
//! parent back-reference so transform accumulation and `closest(...)` lookups never need a
//! separate parent map. Nodes are addressed by [`NodeId`]; removed nodes stay in the arena but
//! are detached from the tree.

use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt::Write as _;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        name: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SvgDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
}

fn qualified_attr_name(a: &roxmltree::Attribute<'_, '_>) -> String {
    match a.namespace() {
        Some(XLINK_NS) => format!("xlink:{}", a.name()),
        Some(XML_NS) => format!("xml:{}", a.name()),
        _ => a.name().to_string(),
    }
}

impl SvgDocument {
    /// Parses SVG markup. The first `<svg>` element becomes the document root; anything
    /// outside it (doctype, comments, wrapping HTML) is dropped.
    pub fn parse(svg: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(svg)?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("svg"))
            .ok_or(Error::MissingSvgRoot)?;

        let mut out = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        out.root = out.build_node(root, None);
        tracing::debug!(nodes = out.nodes.len(), "parsed floor plan svg");
        Ok(out)
    }

    fn build_node(&mut self, n: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let mut attrs = IndexMap::new();
        for a in n.attributes() {
            attrs.insert(qualified_attr_name(&a), a.value().to_string());
        }
        let id = self.push(NodeKind::Element {
            name: n.tag_name().name().to_string(),
            attrs,
        });
        self.nodes[id.0].parent = parent;

        for c in n.children() {
            if c.is_element() {
                let child = self.build_node(c, Some(id));
                self.nodes[id.0].children.push(child);
            } else if c.is_text() {
                let text = c.text().unwrap_or_default().to_string();
                let child = self.push(NodeKind::Text(text));
                self.nodes[child.0].parent = Some(id);
                self.nodes[id.0].children.push(child);
            }
        }
        id
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    /// Local tag name of an element, `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Numeric attribute; missing or unparseable values yield `None`.
    pub fn attr_f64(&self, id: NodeId, name: &str) -> Option<f64> {
        parse_leading_number(self.attr(id, name)?)
    }

    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        let attrs = match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        };
        attrs
            .into_iter()
            .flat_map(|a| a.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs.shift_remove(name),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
    }

    /// Pre-order traversal of the elements under `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.is_element(cur) {
                continue;
            }
            out.push(cur);
            for c in self.nodes[cur.0].children.iter().rev() {
                stack.push(*c);
            }
        }
        out
    }

    /// Elements under the root, in document order, whose tag is one of `tags`.
    pub fn elements_by_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.tag(*n).is_some_and(|t| tags.contains(&t)))
            .collect()
    }

    /// Ancestors from the root down to `id`, `id` included.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut stack = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            stack.push(n);
            cur = self.nodes[n.0].parent;
        }
        stack.reverse();
        stack
    }

    /// `true` if `id` is attached under the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.path_from_root(id).first() == Some(&self.root)
    }

    /// Nearest ancestor-or-self element carrying `attr`.
    pub fn closest_with_attr(&self, id: NodeId, attr: &str) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if self.attr(n, attr).is_some() {
                return Some(n);
            }
            cur = self.nodes[n.0].parent;
        }
        None
    }

    pub fn find_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(element_id))
    }

    /// Concatenated text of all descendant text nodes (DOM `textContent`).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for c in &self.nodes[id.0].children {
                    self.collect_text(*c, out);
                }
            }
        }
    }

    /// Replaces all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for c in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[c.0].parent = None;
        }
        let t = self.push(NodeKind::Text(text.to_string()));
        self.nodes[t.0].parent = Some(id);
        self.nodes[id.0].children.push(t);
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_string(),
            attrs: IndexMap::new(),
        })
    }

    /// Moves `child` to the end of `parent`'s children, detaching it from its old parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.path_from_root(parent).contains(&child) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlinks `id` from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(p) = self.nodes[id.0].parent.take() {
            self.nodes[p.0].children.retain(|c| *c != id);
        }
    }

    pub fn class_list(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut value = self.attr(id, "class").unwrap_or_default().trim().to_string();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class);
        self.set_attr(id, "class", value);
    }

    pub fn remove_classes(&mut self, id: NodeId, classes: &[&str]) {
        let Some(current) = self.attr(id, "class") else {
            return;
        };
        let kept: Vec<&str> = current
            .split_whitespace()
            .filter(|c| !classes.contains(c))
            .collect();
        let kept = kept.join(" ");
        if kept.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", kept);
        }
    }

    /// First direct element child with the given tag and class.
    pub fn child_with_class(&self, id: NodeId, tag: &str, class: &str) -> Option<NodeId> {
        self.element_children(id)
            .find(|c| self.tag(*c) == Some(tag) && self.has_class(*c, class))
    }

    /// First direct element child with the given tag.
    pub fn child_with_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.element_children(id).find(|c| self.tag(*c) == Some(tag))
    }

    /// Serialises the tree back to SVG markup.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, true, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, is_root: bool, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(&escape_xml(t, false)),
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                if is_root {
                    if !attrs.contains_key("xmlns") {
                        let _ = write!(out, r#" xmlns="{SVG_NS}""#);
                    }
                    if !attrs.contains_key("xmlns:xlink") && self.uses_xlink() {
                        let _ = write!(out, r#" xmlns:xlink="{XLINK_NS}""#);
                    }
                }
                for (k, v) in attrs {
                    let _ = write!(out, r#" {k}="{}""#, escape_xml(v, true));
                }
                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for c in children {
                    self.write_node(*c, false, out);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }

    fn uses_xlink(&self) -> bool {
        self.descendants(self.root)
            .into_iter()
            .any(|n| self.attrs(n).any(|(k, _)| k.starts_with("xlink:")))
    }
}

fn escape_xml(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Parses the first number in a whitespace/comma separated list (`x="10 20"` → `10`).
///
/// Unit suffixes such as `px` are ignored; anything else that does not start with a number
/// yields `None`.
pub fn parse_leading_number(raw: &str) -> Option<f64> {
    let first = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())?;
    if let Ok(v) = first.parse::<f64>() {
        return Some(v);
    }
    let numeric: &str = first.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    numeric.parse::<f64>().ok()
}

/// Splits a list of numbers separated by whitespace and/or commas.
pub fn parse_number_list(raw: &str) -> Vec<f64> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 100 50">
  <g id="level" transform="translate(5,5)">
    <rect data-slot-id="L1-A1" class="slot bay" x="0" y="0" width="10" height="10"/>
    <text><tspan x="3" y="4">P12</tspan> &amp; more</text>
    <use xlink:href="#level"/>
  </g>
</svg>"##;

    #[test]
    fn parse_keeps_structure_and_parent_links() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        let root = doc.root();
        assert_eq!(doc.tag(root), Some("svg"));
        assert_eq!(doc.attr(root, "viewBox"), Some("0 0 100 50"));

        let level = doc.find_by_id("level").unwrap();
        assert_eq!(doc.parent(level), Some(root));
        let rect = doc.element_children(level).next().unwrap();
        assert_eq!(doc.tag(rect), Some("rect"));
        assert_eq!(doc.path_from_root(rect), vec![root, level, rect]);
        assert_eq!(doc.closest_with_attr(rect, "data-slot-id"), Some(rect));
        assert_eq!(doc.closest_with_attr(level, "data-slot-id"), None);
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        let text = doc.elements_by_tag(&["text"])[0];
        assert_eq!(doc.text_content(text).trim(), "P12 & more");
    }

    #[test]
    fn missing_svg_root_is_an_error() {
        let err = SvgDocument::parse("<html><body/></html>").unwrap_err();
        assert!(matches!(err, Error::MissingSvgRoot));
        assert!(matches!(
            SvgDocument::parse("<svg>").unwrap_err(),
            Error::Xml { .. }
        ));
    }

    #[test]
    fn class_helpers_are_idempotent() {
        let mut doc = SvgDocument::parse(PLAN).unwrap();
        let rect = doc.elements_by_tag(&["rect"])[0];
        doc.add_class(rect, "slot--free");
        doc.add_class(rect, "slot--free");
        assert_eq!(doc.attr(rect, "class"), Some("slot bay slot--free"));
        doc.remove_classes(rect, &["slot--free", "bay"]);
        assert_eq!(doc.attr(rect, "class"), Some("slot"));
        doc.remove_classes(rect, &["slot"]);
        assert_eq!(doc.attr(rect, "class"), None);
    }

    #[test]
    fn append_child_moves_nodes_and_rejects_cycles() {
        let mut doc = SvgDocument::parse(PLAN).unwrap();
        let root = doc.root();
        let level = doc.find_by_id("level").unwrap();
        let rect = doc.elements_by_tag(&["rect"])[0];

        let wrap = doc.create_element("g");
        assert!(!doc.is_attached(wrap));
        doc.append_child(root, wrap);
        doc.append_child(wrap, level);
        assert_eq!(doc.parent(level), Some(wrap));
        assert!(doc.is_attached(rect));

        doc.append_child(rect, wrap);
        assert_eq!(doc.parent(wrap), Some(root));
    }

    #[test]
    fn serialisation_round_trips_through_the_parser() {
        let mut doc = SvgDocument::parse(PLAN).unwrap();
        let rect = doc.elements_by_tag(&["rect"])[0];
        doc.set_attr(rect, "data-note", "a \"quoted\" <value>");
        let markup = doc.to_svg_string();
        assert!(markup.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg""#));
        assert!(markup.contains(r##"xlink:href="#level""##));

        let again = SvgDocument::parse(&markup).unwrap();
        let rect = again.elements_by_tag(&["rect"])[0];
        assert_eq!(again.attr(rect, "data-note"), Some("a \"quoted\" <value>"));
        assert_eq!(again.attr(rect, "data-slot-id"), Some("L1-A1"));
    }

    #[test]
    fn number_helpers_tolerate_lists_and_units() {
        assert_eq!(parse_leading_number("10 20"), Some(10.0));
        assert_eq!(parse_leading_number("12.5px"), Some(12.5));
        assert_eq!(parse_leading_number(" ,3"), Some(3.0));
        assert_eq!(parse_leading_number("auto"), None);
        assert_eq!(parse_number_list("0,0 10, 20  30"), vec![0.0, 0.0, 10.0, 20.0, 30.0]);
    }
}
