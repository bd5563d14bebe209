use std::{collections::HashMap, fmt, rc::Rc};

use serde_json::Value;

use crate::{
    core::{cache::RendererCache, id::NodeId, lock::UpdateLock, renderer::Renderer},
    dom::ElementId,
    state::{State, StateMask},
    widgets::list::Collection,
};

/// The kinds of component the arena knows how to construct. Each kind maps to
/// a default renderer in the `RendererRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A plain component.
    Component,
    /// An ordered collection of child components.
    List,
}

/// Component data stored in the arena.
pub struct Node {
    /// Unique component ID, also the key under which a parent registers it.
    pub(crate) id: String,
    /// Component kind.
    pub(crate) kind: Kind,
    /// Current and supported states.
    pub(crate) states: StateMask,
    /// Root element, once created or decorated.
    pub(crate) element: Option<ElementId>,
    /// Element that receives children. Defaults to the root element.
    pub(crate) content: Option<ElementId>,
    /// Active renderer.
    pub(crate) renderer: Rc<dyn Renderer>,
    /// Values cached by the active renderer.
    pub(crate) cache: RendererCache,
    /// User payload.
    pub(crate) value: Value,
    /// Notification lock.
    pub(crate) lock: UpdateLock,
    /// Visibility flag.
    pub(crate) visible: bool,
    /// Whether the component is in the document.
    pub(crate) in_document: bool,
    /// Whether a cover stands in for the root element.
    pub(crate) covered: bool,
    /// DOM `id` attribute for the root element.
    pub(crate) node_id: String,
    /// Replacement for the renderer's base class.
    pub(crate) css_prefix: String,
    /// Extra classes for the root element.
    pub(crate) custom_class: String,

    /// Parent in the component tree.
    pub(crate) parent: Option<NodeId>,
    /// Children in registration order.
    pub(crate) children: Vec<NodeId>,
    /// Children keyed by their component ID.
    pub(crate) child_keys: HashMap<String, NodeId>,

    /// Ordering state for list components.
    pub(crate) collection: Option<Collection>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.states.current())
            .field("element", &self.element)
            .field("in_document", &self.in_document)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Construct a detached node.
    pub(crate) fn new(id: String, kind: Kind, renderer: Rc<dyn Renderer>) -> Self {
        Self {
            id,
            kind,
            states: StateMask::default(),
            element: None,
            content: None,
            renderer,
            cache: RendererCache::default(),
            value: Value::Null,
            lock: UpdateLock::default(),
            visible: true,
            in_document: false,
            covered: false,
            node_id: String::new(),
            css_prefix: String::new(),
            custom_class: String::new(),
            parent: None,
            children: Vec::new(),
            child_keys: HashMap::new(),
            collection: (kind == Kind::List).then(Collection::default),
        }
    }

    /// The component ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The component kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Return the node's parent, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Return the node's children in registration order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The root element, if created.
    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// The element children are placed into.
    pub fn content_element(&self) -> Option<ElementId> {
        self.content.or(self.element)
    }

    /// The active renderer.
    pub fn renderer(&self) -> &Rc<dyn Renderer> {
        &self.renderer
    }

    /// The renderer cache.
    pub fn cache(&self) -> &RendererCache {
        &self.cache
    }

    /// The renderer cache, for renderers.
    pub fn cache_mut(&mut self) -> &mut RendererCache {
        &mut self.cache
    }

    /// The user payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Is the component visible?
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Is the component in the document?
    pub fn in_document(&self) -> bool {
        self.in_document
    }

    /// Is a cover standing in for the root element?
    pub fn is_covered(&self) -> bool {
        self.covered
    }

    /// Current lock depth.
    pub fn update_count(&self) -> usize {
        self.lock.depth()
    }

    /// Is the update lock open?
    pub fn can_update(&self) -> bool {
        self.lock.can_update()
    }

    /// DOM `id` attribute.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// CSS prefix, empty if the renderer's base class is used.
    pub fn css_prefix(&self) -> &str {
        &self.css_prefix
    }

    /// Extra CSS classes.
    pub fn custom_class(&self) -> &str {
        &self.custom_class
    }

    /// List ordering state, if this is a list.
    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    /// Is this a list?
    pub fn is_list(&self) -> bool {
        self.collection.is_some()
    }

    /// Set the content element. Renderers call this while building DOM.
    pub fn set_content_element(&mut self, el: Option<ElementId>) {
        self.content = el;
    }

    /// Record the DOM `id` without touching the document. Renderers call this
    /// while adopting existing markup.
    pub fn set_node_id_internal(&mut self, id: impl Into<String>) {
        self.node_id = id.into();
    }

    /// Replace the current states without renderer reflection or events.
    /// Renderers call this while adopting existing markup.
    pub fn set_states_internal(&mut self, states: State) {
        self.states.set_raw(states);
    }

    /// Current states.
    pub fn state(&self) -> State {
        self.states.current()
    }

    /// Supported states.
    pub fn supported_states(&self) -> State {
        self.states.supported()
    }

    /// Are the given states enabled?
    pub fn has_state(&self, state: State) -> bool {
        self.states.has(state)
    }

    /// Are the given states supported?
    pub fn is_supported_state(&self, state: State) -> bool {
        self.states.is_supported(state)
    }

    /// FOCUSED state.
    pub fn is_focused(&self) -> bool {
        self.has_state(State::FOCUSED)
    }

    /// ACTIVE state.
    pub fn is_active(&self) -> bool {
        self.has_state(State::ACTIVE)
    }

    /// CHECKED state.
    pub fn is_checked(&self) -> bool {
        self.has_state(State::CHECKED)
    }

    /// SELECTED state.
    pub fn is_selected(&self) -> bool {
        self.has_state(State::SELECTED)
    }

    /// READONLY state.
    pub fn is_readonly(&self) -> bool {
        self.has_state(State::READONLY)
    }

    /// DISABLED state.
    pub fn is_disabled(&self) -> bool {
        self.has_state(State::DISABLED)
    }

    /// INDETERMINATE state.
    pub fn is_indeterminate(&self) -> bool {
        self.has_state(State::INDETERMINATE)
    }

    /// OPENED state.
    pub fn is_opened(&self) -> bool {
        self.has_state(State::OPENED)
    }
}
