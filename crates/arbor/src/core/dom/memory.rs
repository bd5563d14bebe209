use std::collections::BTreeMap;

use slotmap::SlotMap;

use super::{Dom, ElementId, NodeKind};
use crate::error::{Error, Result};

/// Tags whose elements cannot contain children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "iframe", "img", "input", "link", "meta",
    "param", "script", "source", "style", "track", "wbr",
];

/// Node data stored in the memory document.
#[derive(Debug, Clone)]
struct ElementData {
    /// Node kind.
    kind: NodeKind,
    /// Lowercase tag name; empty for fragments.
    tag: String,
    /// Class list in insertion order.
    classes: Vec<String>,
    /// Inline style properties.
    style: BTreeMap<String, String>,
    /// Attributes.
    attributes: BTreeMap<String, String>,
    /// Parent node.
    parent: Option<ElementId>,
    /// Child nodes in document order.
    children: Vec<ElementId>,
}

impl ElementData {
    /// Construct an empty node.
    fn new(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            style: BTreeMap::new(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A document held entirely in memory. This is the default document for a
/// `Core`, and the one the test suite inspects.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    /// Node storage.
    nodes: SlotMap<ElementId, ElementData>,
    /// The body element.
    body: ElementId,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create a document containing only a body element.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(ElementData::new(NodeKind::Element, "body"));
        Self { nodes, body }
    }

    /// Number of live nodes, including the body.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the document tracks no nodes. A fresh document always has a
    /// body, so this is only true for a document that was never constructed
    /// through `new`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render a compact outline of the subtree under `el`, one node per line,
    /// indented by depth: `tag.class1.class2#id`.
    pub fn outline(&self, el: ElementId) -> String {
        let mut out = String::new();
        self.outline_into(el, 0, &mut out);
        out
    }

    /// Recursive helper for `outline`.
    fn outline_into(&self, el: ElementId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(el) else {
            return;
        };
        out.push_str(&"  ".repeat(depth));
        match node.kind {
            NodeKind::Element => out.push_str(&node.tag),
            NodeKind::Fragment => out.push_str("#fragment"),
        }
        for c in &node.classes {
            out.push('.');
            out.push_str(c);
        }
        if let Some(id) = node.attributes.get("id") {
            out.push('#');
            out.push_str(id);
        }
        out.push('\n');
        for child in &node.children {
            self.outline_into(*child, depth + 1, out);
        }
    }

    /// Unlink a node from its parent's child list.
    fn unlink(&mut self, el: ElementId) -> bool {
        let Some(parent) = self.nodes.get(el).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != el);
        }
        if let Some(n) = self.nodes.get_mut(el) {
            n.parent = None;
        }
        true
    }
}

impl Dom for MemoryDom {
    fn body(&self) -> ElementId {
        self.body
    }

    fn create_element(&mut self, tag: &str, classes: &[String]) -> ElementId {
        let mut data = ElementData::new(NodeKind::Element, tag);
        for c in classes {
            if !c.is_empty() && !data.classes.contains(c) {
                data.classes.push(c.clone());
            }
        }
        self.nodes.insert(data)
    }

    fn create_fragment(&mut self) -> ElementId {
        self.nodes.insert(ElementData::new(NodeKind::Fragment, ""))
    }

    fn kind(&self, el: ElementId) -> Option<NodeKind> {
        self.nodes.get(el).map(|n| n.kind)
    }

    fn tag(&self, el: ElementId) -> Option<String> {
        self.nodes
            .get(el)
            .filter(|n| n.kind == NodeKind::Element)
            .map(|n| n.tag.clone())
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.nodes.get(el).and_then(|n| n.parent)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.nodes
            .get(el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::ElementNotFound(parent));
        }
        if !self.nodes.contains_key(child) {
            return Err(Error::ElementNotFound(child));
        }
        if self.contains(child, parent) {
            return Err(Error::Invalid(
                "cannot append a node to its own descendant".into(),
            ));
        }
        self.unlink(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    fn remove_node(&mut self, el: ElementId) -> bool {
        self.unlink(el)
    }

    fn destroy(&mut self, el: ElementId) -> usize {
        if el == self.body {
            return 0;
        }
        self.unlink(el);
        let mut stack = vec![el];
        let mut freed = 0;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn replace_node(&mut self, new: ElementId, old: ElementId) -> Result<()> {
        if !self.nodes.contains_key(new) {
            return Err(Error::ElementNotFound(new));
        }
        let parent = self
            .nodes
            .get(old)
            .ok_or(Error::ElementNotFound(old))?
            .parent;
        let Some(parent) = parent else {
            return Ok(());
        };
        if self.contains(new, parent) {
            return Err(Error::Invalid(
                "cannot replace a node with its own ancestor".into(),
            ));
        }
        self.unlink(new);
        let Some(pos) = self.nodes[parent].children.iter().position(|c| *c == old) else {
            return Ok(());
        };
        self.nodes[parent].children[pos] = new;
        self.nodes[new].parent = Some(parent);
        self.nodes[old].parent = None;
        Ok(())
    }

    fn classes(&self, el: ElementId) -> Vec<String> {
        self.nodes
            .get(el)
            .map(|n| n.classes.clone())
            .unwrap_or_default()
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(n) = self.nodes.get_mut(el)
            && !class.is_empty()
            && !n.classes.iter().any(|c| c == class)
        {
            n.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(n) = self.nodes.get_mut(el) {
            n.classes.retain(|c| c != class);
        }
    }

    fn style(&self, el: ElementId, prop: &str) -> Option<String> {
        self.nodes.get(el).and_then(|n| n.style.get(prop).cloned())
    }

    fn set_style(&mut self, el: ElementId, prop: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(el) {
            if value.is_empty() {
                n.style.remove(prop);
            } else {
                n.style.insert(prop.to_string(), value.to_string());
            }
        }
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.nodes.get(el).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(el) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn can_have_children(&self, el: ElementId) -> bool {
        self.nodes.get(el).is_some_and(|n| match n.kind {
            NodeKind::Fragment => true,
            NodeKind::Element => !VOID_TAGS.contains(&n.tag.as_str()),
        })
    }
}
