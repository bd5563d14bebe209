/// In-memory document implementation.
pub mod memory;

use slotmap::new_key_type;

pub use memory::MemoryDom;

use crate::error::Result;

new_key_type! {
    /// Opaque identifier for a node in a document.
    pub struct ElementId;
}

/// The kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular element with a tag name.
    Element,
    /// A detached container that is not itself an element.
    Fragment,
}

/// The document capabilities components and renderers rely on.
///
/// Element IDs that are not in the document are ignored by queries and
/// class/style/attribute mutators. Structural mutators report them as errors.
pub trait Dom {
    /// The element the document renders top-level components into.
    fn body(&self) -> ElementId;

    /// Create a detached element with a tag and an initial class list.
    fn create_element(&mut self, tag: &str, classes: &[String]) -> ElementId;

    /// Create a detached fragment.
    fn create_fragment(&mut self) -> ElementId;

    /// The kind of a node, or None if it is not in the document.
    fn kind(&self, el: ElementId) -> Option<NodeKind>;

    /// The tag name of an element.
    fn tag(&self, el: ElementId) -> Option<String>;

    /// The parent of a node, if any.
    fn parent(&self, el: ElementId) -> Option<ElementId>;

    /// The children of a node, in document order.
    fn children(&self, el: ElementId) -> Vec<ElementId>;

    /// Append `child` as the last child of `parent`, first removing it from
    /// any current parent.
    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()>;

    /// Remove a node from its parent. Returns false if it had no parent.
    fn remove_node(&mut self, el: ElementId) -> bool;

    /// Put `new` where `old` is and unparent `old`.
    fn replace_node(&mut self, new: ElementId, old: ElementId) -> Result<()>;

    /// Remove a node from its parent and free it along with everything below
    /// it. Returns the number of nodes freed. The body is never freed.
    fn destroy(&mut self, el: ElementId) -> usize;

    /// Number of live nodes, including the body.
    fn node_count(&self) -> usize;

    /// The class list of an element.
    fn classes(&self, el: ElementId) -> Vec<String>;

    /// Add a class if it is not present.
    fn add_class(&mut self, el: ElementId, class: &str);

    /// Remove a class if it is present.
    fn remove_class(&mut self, el: ElementId, class: &str);

    /// Inline style property, if set.
    fn style(&self, el: ElementId, prop: &str) -> Option<String>;

    /// Set an inline style property. An empty value clears it.
    fn set_style(&mut self, el: ElementId, prop: &str, value: &str);

    /// An attribute value, if set.
    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;

    /// Set an attribute.
    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str);

    /// Whether the element type permits children.
    fn can_have_children(&self, el: ElementId) -> bool;

    /// Does the element carry a class?
    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.classes(el).iter().any(|c| c == class)
    }

    /// Add or remove a class.
    fn enable_class(&mut self, el: ElementId, class: &str, enabled: bool) {
        if enabled {
            self.add_class(el, class);
        } else {
            self.remove_class(el, class);
        }
    }

    /// Is `el` equal to or a descendant of `ancestor`?
    fn contains(&self, ancestor: ElementId, el: ElementId) -> bool {
        let mut cur = Some(el);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }
}
