use std::{
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use serde_json::Value;
use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::{
    Kind, NodeId, Options,
    cache::{self, Cached},
    dom::{Dom, ElementId, MemoryDom},
    error::{Error, Result},
    event::{Event, EventType, ListenerId, Listeners, Outcome},
    node::Node,
    renderer::{RenderCx, Renderer, RendererRegistry, Transition},
    state::State,
    widgets::list::{self, Collection, ListMut},
};

/// Deferred work, executed by `Core::run_pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// Render the next batch of a list's items.
    RenderBatch {
        /// The list.
        list: NodeId,
        /// Index of the first item in the batch.
        start: usize,
    },
}

impl Task {
    /// The component this task belongs to.
    fn owner(&self) -> NodeId {
        match self {
            Self::RenderBatch { list, .. } => *list,
        }
    }
}

/// The component arena: tree registry, document, renderers, listeners and
/// deferred tasks.
///
/// Every component operation goes through `Core`, addressed by `NodeId`.
/// List operations are grouped on the `ListMut` view returned by
/// [`Core::list`].
pub struct Core {
    /// Component storage.
    pub(crate) nodes: SlotMap<NodeId, Node>,
    /// Component IDs to arena keys.
    ids: HashMap<String, NodeId>,
    /// The document.
    pub(crate) dom: Box<dyn Dom>,
    /// Default renderers.
    renderers: RendererRegistry,
    /// Event listeners.
    listeners: Listeners,
    /// Deferred continuations.
    tasks: VecDeque<Task>,
    /// Counter for generated component IDs.
    next_id: u64,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// Create a core backed by an in-memory document.
    pub fn new() -> Self {
        Self::with_dom(Box::new(MemoryDom::new()))
    }

    /// Create a core backed by the given document.
    pub fn with_dom(dom: Box<dyn Dom>) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            ids: HashMap::new(),
            dom,
            renderers: RendererRegistry::new(),
            listeners: Listeners::default(),
            tasks: VecDeque::new(),
            next_id: 0,
        }
    }

    /// The document.
    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    /// The document, mutably.
    pub fn dom_mut(&mut self) -> &mut dyn Dom {
        self.dom.as_mut()
    }

    /// The renderer registry.
    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    /// The renderer registry, mutably.
    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    /// Return a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Return a node by ID, or an error.
    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(Error::NodeNotFound(id))
    }

    /// Return a mutable node by ID, or an error.
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(Error::NodeNotFound(id))
    }

    /// Is the node alive?
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Find a component by its component ID.
    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.ids.get(key).copied()
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no live components.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a component of a kind with its default renderer.
    pub fn create(&mut self, kind: Kind, options: Options) -> Result<NodeId> {
        let renderer = self.renderers.get(kind);
        self.create_with_renderer(kind, renderer, options)
    }

    /// Create a plain component.
    pub fn create_component(&mut self, options: Options) -> Result<NodeId> {
        self.create(Kind::Component, options)
    }

    /// Create a list.
    pub fn create_list(&mut self, options: Options) -> Result<NodeId> {
        self.create(Kind::List, options)
    }

    /// Create a component with an explicit renderer. Options are applied under
    /// a single update lock that is released without firing.
    pub fn create_with_renderer(
        &mut self,
        kind: Kind,
        renderer: Rc<dyn Renderer>,
        mut options: Options,
    ) -> Result<NodeId> {
        let key = match options.id.take() {
            Some(k) if k.is_empty() => return Err(Error::Invalid("empty component id".into())),
            Some(k) if self.ids.contains_key(&k) => {
                return Err(Error::Invalid(format!("duplicate component id: {k}")));
            }
            Some(k) => k,
            None => self.generate_key(),
        };
        let id = self.nodes.insert(Node::new(key.clone(), kind, renderer));
        self.ids.insert(key, id);

        self.begin_update(id)?;
        let assigned = self.assign(id, &options);
        self.end_update(id, false)?;
        assigned?;
        Ok(id)
    }

    /// Produce an unused component ID.
    fn generate_key(&mut self) -> String {
        loop {
            let k = format!(":{}", self.next_id);
            self.next_id += 1;
            if !self.ids.contains_key(&k) {
                return k;
            }
        }
    }

    /// Apply construction options.
    fn assign(&mut self, id: NodeId, o: &Options) -> Result<()> {
        if let Some(v) = &o.node_id {
            self.set_node_id(id, v)?;
        }
        if let Some(v) = &o.css_prefix {
            self.set_css_prefix(id, v)?;
        }
        if let Some(v) = &o.css_class {
            self.set_custom_class(id, v)?;
        }
        let flags = [
            (o.disabled, State::DISABLED),
            (o.readonly, State::READONLY),
            (o.checked, State::CHECKED),
            (o.selected, State::SELECTED),
            (o.opened, State::OPENED),
            (o.active, State::ACTIVE),
            (o.focused, State::FOCUSED),
            (o.indeterminate, State::INDETERMINATE),
        ];
        for (v, state) in flags {
            if let Some(v) = v {
                self.set_state_notify(id, state, v)?;
            }
        }
        Ok(())
    }

    /// Register `child` under `parent`. Adding to a list appends to the list.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.get(parent)?.is_list() {
            return self.list(parent)?.add(child, None);
        }
        self.register_child(parent, child)
    }

    /// Deregister `child` from `parent`. Returns None if it was not a child.
    /// Removal does not dispose or unrender the child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>> {
        if self.get(parent)?.is_list() {
            return self.list(parent)?.remove(child, false);
        }
        Ok(self.unregister_child(parent, child).then_some(child))
    }

    /// Remove a component from its parent, if it has one.
    pub fn remove_from_parent(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        match self.get(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(None),
        }
    }

    /// Return the keyed child under a parent.
    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes
            .get(parent)
            .and_then(|node| node.child_keys.get(key).copied())
    }

    /// Return a node's children in registration order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Return a node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Is `ancestor` a strict ancestor of `node`?
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.parent(node);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Link a child into the tree, validating before mutating.
    pub(crate) fn register_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let p = self.get(parent)?;
        let c = self.get(child)?;
        if c.parent.is_some() {
            return Err(Error::Invalid(format!("{} already has a parent", c.id)));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(Error::Invalid(format!(
                "adding {} under {} would create a cycle",
                c.id, p.id
            )));
        }
        if p.child_keys.contains_key(&c.id) {
            return Err(Error::Invalid(format!("duplicate child key: {}", c.id)));
        }
        let key = c.id.clone();

        let p = self.get_mut(parent)?;
        p.child_keys.insert(key, child);
        p.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlink a child from the tree. Returns false if it was not a child.
    pub(crate) fn unregister_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        let before = p.children.len();
        p.children.retain(|c| *c != child);
        p.child_keys.retain(|_, c| *c != child);
        let removed = p.children.len() != before;
        if removed && let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        removed
    }

    /// Borrow the renderer and a render context for a node.
    fn render_cx(&mut self, id: NodeId) -> Result<(Rc<dyn Renderer>, RenderCx<'_>)> {
        let node = self.nodes.get_mut(id).ok_or(Error::NodeNotFound(id))?;
        let renderer = node.renderer.clone();
        Ok((
            renderer,
            RenderCx::new(id, node, self.dom.as_mut(), &mut self.listeners),
        ))
    }

    /// Build the component's element through its renderer.
    pub fn create_dom(&mut self, id: NodeId) -> Result<ElementId> {
        if self.get(id)?.element.is_some() {
            return Err(Error::AlreadyRendered(id));
        }
        let (r, mut cx) = self.render_cx(id)?;
        let el = r.create_dom(&mut cx)?;
        cx.node.element = Some(el);
        Ok(el)
    }

    /// Return the component's element, creating it if needed.
    pub(crate) fn ensure_dom(&mut self, id: NodeId) -> Result<ElementId> {
        match self.get(id)?.element {
            Some(el) => Ok(el),
            None => self.create_dom(id),
        }
    }

    /// Can the component's renderer adopt `el`?
    pub fn can_decorate(&self, id: NodeId, el: ElementId) -> Result<bool> {
        Ok(self.get(id)?.renderer.can_decorate(self.dom.as_ref(), el))
    }

    /// Adopt an existing element and enter the document.
    pub fn decorate(&mut self, id: NodeId, el: ElementId) -> Result<()> {
        if self.get(id)?.element.is_some() {
            return Err(Error::AlreadyRendered(id));
        }
        if self.dom.kind(el).is_none() {
            return Err(Error::ElementNotFound(el));
        }
        if !self.can_decorate(id, el)? {
            return Err(Error::CannotDecorate(el));
        }
        {
            let (r, mut cx) = self.render_cx(id)?;
            let el = r.decorate(&mut cx, el)?;
            cx.node.element = Some(el);
        }
        self.enter_document(id)
    }

    /// Create the element if needed, append it to `parent` (or the body) and
    /// enter the document.
    pub fn render(&mut self, id: NodeId, parent: Option<ElementId>) -> Result<()> {
        if self.get(id)?.in_document {
            return Err(Error::AlreadyRendered(id));
        }
        let el = self.ensure_dom(id)?;
        let target = parent.unwrap_or_else(|| self.dom.body());
        self.dom.append_child(target, el)?;
        self.enter_document(id)
    }

    /// Mark the component as in the document and let the renderer wire up
    /// behaviour. Idempotent.
    pub fn enter_document(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        if node.in_document {
            return Ok(());
        }
        if node.element.is_none() {
            return Err(Error::Invalid(format!("{} has no element", node.id)));
        }
        if node.is_list() {
            list::enter_document(self, id)
        } else {
            self.enter_document_base(id, true)
        }
    }

    /// Shared part of entering the document. Lists render their own children,
    /// so they pass `enter_children = false`.
    pub(crate) fn enter_document_base(&mut self, id: NodeId, enter_children: bool) -> Result<()> {
        self.get_mut(id)?.in_document = true;
        if enter_children {
            for child in self.get(id)?.children.clone() {
                let c = self.get(child)?;
                if c.element.is_some() && !c.in_document {
                    self.enter_document(child)?;
                }
            }
        }
        let (r, mut cx) = self.render_cx(id)?;
        r.initialize_dom(&mut cx)
    }

    /// Let the renderer tear down behaviour and mark the component as out of
    /// the document. Children leave first. Idempotent.
    pub fn exit_document(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        if !node.in_document {
            return Ok(());
        }
        if node.is_list() {
            list::exit_document(self, id)?;
        }
        for child in self.get(id)?.children.clone() {
            if self.get(child)?.in_document {
                self.exit_document(child)?;
            }
        }
        {
            let (r, mut cx) = self.render_cx(id)?;
            r.uninitialize_dom(&mut cx);
        }
        self.get_mut(id)?.in_document = false;
        Ok(())
    }

    /// Append the element to the parent's content element (or the body when
    /// there is no parent) and enter the document. A no-op without an element
    /// or when already attached.
    pub fn attach(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        if node.element.is_none() || node.in_document {
            return Ok(());
        }
        let target = match node.parent {
            Some(p) => match self.get(p)?.content_element() {
                Some(el) => el,
                None => return Ok(()),
            },
            None => self.dom.body(),
        };
        self.attach_to(id, target)
    }

    /// Append the element to `el` and enter the document.
    pub fn attach_to(&mut self, id: NodeId, el: ElementId) -> Result<()> {
        let node = self.get(id)?;
        let Some(own) = node.element else {
            return Ok(());
        };
        if node.in_document {
            return Ok(());
        }
        self.dom.append_child(el, own)?;
        self.enter_document(id)
    }

    /// Leave the document and remove the element from its parent.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(el) = self.get(id)?.element else {
            return Ok(());
        };
        self.exit_document(id)?;
        self.dom.remove_node(el);
        Ok(())
    }

    /// Destroy a component and its children. Disposable cache entries are
    /// released, the element is removed, and the component leaves the arena.
    pub fn dispose(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.get(id)?.parent
            && self.get(parent)?.is_list()
        {
            self.list(parent)?.remove(id, false)?;
        }
        self.exit_document(id)?;
        if self.get(id)?.is_list() {
            self.list(id)?.clear(true)?;
        }
        for child in self.get(id)?.children.clone() {
            self.dispose(child)?;
        }

        let node = self.get(id)?;
        let (parent, element) = (node.parent, node.element);
        let cover = node.cache.element(cache::COVER);
        self.clear_renderer_cache(id)?;
        if let Some(el) = element {
            self.destroy_element(id, el);
        }
        if let Some(c) = cover {
            self.dom.destroy(c);
        }
        if let Some(p) = parent {
            self.unregister_child(p, id);
        }
        self.listeners.remove_node(id);
        self.tasks.retain(|t| t.owner() != id);
        if let Some(node) = self.nodes.remove(id) {
            debug!(id = %node.id, "disposed");
            self.ids.remove(&node.id);
        }
        Ok(())
    }

    /// Free an element the component owns. Elements of other components that
    /// sit inside it are unlinked first so they survive.
    fn destroy_element(&mut self, owner: NodeId, el: ElementId) {
        let foreign: Vec<ElementId> = self
            .nodes
            .iter()
            .filter(|(id, _)| *id != owner)
            .flat_map(|(_, n)| [n.element, n.cache.element(cache::COVER)])
            .flatten()
            .filter(|e| *e != el && self.dom.contains(el, *e))
            .collect();
        for e in foreign {
            self.dom.remove_node(e);
        }
        self.dom.destroy(el);
    }

    /// The element children are placed into.
    pub fn content_element(&self, id: NodeId) -> Option<ElementId> {
        self.nodes.get(id).and_then(Node::content_element)
    }

    /// Replace the renderer. Forbidden while in the document. An existing
    /// element is discarded along with the renderer cache.
    pub fn set_renderer(&mut self, id: NodeId, renderer: Rc<dyn Renderer>) -> Result<()> {
        let node = self.get(id)?;
        if node.in_document {
            return Err(Error::InDocument(id));
        }
        if node.covered {
            self.set_covered(id, false)?;
        }
        let node = self.get(id)?;
        let (element, cover) = (node.element, node.cache.element(cache::COVER));
        self.clear_renderer_cache(id)?;
        if let Some(el) = element {
            self.destroy_element(id, el);
        }
        if let Some(c) = cover {
            self.dom.destroy(c);
        }
        let node = self.get_mut(id)?;
        node.element = None;
        node.content = None;
        node.renderer = renderer;
        Ok(())
    }

    /// Replace the renderer, re-rendering in place if the component is in the
    /// document. A hidden placeholder holds the component's position meanwhile.
    /// Rendered children move into the new content element. A cover is lifted
    /// first.
    pub fn change_renderer(&mut self, id: NodeId, renderer: Rc<dyn Renderer>) -> Result<()> {
        if Rc::ptr_eq(&self.get(id)?.renderer, &renderer) {
            return Ok(());
        }
        self.set_covered(id, false)?;
        let node = self.get(id)?;
        let (in_document, element) = (node.in_document, node.element);
        let placeholder = match element {
            Some(old) if in_document && self.dom.parent(old).is_some() => {
                let p = self.dom.create_element("span", &[]);
                self.dom.set_style(p, "display", "none");
                self.dom.replace_node(p, old)?;
                Some(p)
            }
            _ => None,
        };
        if in_document {
            self.exit_document(id)?;
        }

        self.set_renderer(id, renderer)?;
        let el = self.create_dom(id)?;
        if let Some(p) = placeholder {
            self.dom.replace_node(el, p)?;
            self.dom.destroy(p);
        }
        if !self.get(id)?.is_list()
            && let Some(content) = self.content_element(id)
        {
            for child in self.get(id)?.children.clone() {
                if let Some(child_el) = self.get(child)?.element
                    && self.dom.parent(child_el).is_none()
                {
                    self.dom.append_child(content, child_el)?;
                }
            }
        }
        if in_document {
            self.enter_document(id)?;
        }
        self.changed(id)
    }

    /// Look up a renderer cache entry.
    pub fn renderer_cache(&self, id: NodeId, key: &str) -> Option<&Cached> {
        self.nodes.get(id).and_then(|n| n.cache.get(key))
    }

    /// Store a renderer cache entry.
    pub fn set_renderer_cache(&mut self, id: NodeId, key: &str, value: Cached) -> Result<()> {
        self.get_mut(id)?.cache.insert(key, value);
        Ok(())
    }

    /// Empty the renderer cache, releasing disposable entries first.
    pub fn clear_renderer_cache(&mut self, id: NodeId) -> Result<()> {
        for entry in self.get_mut(id)?.cache.drain_disposable() {
            if let Cached::Scope(s) = entry {
                self.listeners.release_scope(s);
            }
        }
        Ok(())
    }

    /// Set the DOM `id` attribute of the root element.
    pub fn set_node_id(&mut self, id: NodeId, node_id: &str) -> Result<()> {
        let (r, mut cx) = self.render_cx(id)?;
        cx.node.node_id = node_id.to_string();
        r.set_node_id(&mut cx, node_id);
        Ok(())
    }

    /// Set the CSS prefix. Only the first word is used.
    pub fn set_css_prefix(&mut self, id: NodeId, prefix: &str) -> Result<()> {
        self.get_mut(id)?.css_prefix = prefix.split_whitespace().next().unwrap_or("").to_string();
        Ok(())
    }

    /// Set extra classes for the root element.
    pub fn set_custom_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        self.get_mut(id)?.custom_class = class.to_string();
        Ok(())
    }

    /// Ask the renderer to react to a size change. Only applies in the
    /// document.
    pub fn resize(&mut self, id: NodeId) -> Result<()> {
        if !self.get(id)?.in_document {
            return Ok(());
        }
        let (r, mut cx) = self.render_cx(id)?;
        r.resize(&mut cx);
        Ok(())
    }

    /// Swap the root element for a cover placeholder, or restore it. Returns
    /// false if the component was already in that state.
    pub fn set_covered(&mut self, id: NodeId, covered: bool) -> Result<bool> {
        let (r, mut cx) = self.render_cx(id)?;
        if cx.node.covered == covered {
            return Ok(false);
        }
        r.set_covered(&mut cx, covered)?;
        cx.node.covered = covered;
        Ok(true)
    }

    /// Enable or disable states, reflecting the change through the renderer.
    /// Returns false if nothing changed, including when a state is not
    /// supported. Emits no notifications.
    pub fn set_state(&mut self, id: NodeId, state: State, enabled: bool) -> Result<bool> {
        let (r, mut cx) = self.render_cx(id)?;
        if !cx.node.states.set(state, enabled) {
            return Ok(false);
        }
        for s in state.iter() {
            r.set_state(&mut cx, s, enabled);
        }
        Ok(true)
    }

    /// Like `set_state`, but an unsupported state is an error.
    pub fn try_set_state(&mut self, id: NodeId, state: State, enabled: bool) -> Result<bool> {
        if !self.get(id)?.is_supported_state(state) {
            return Err(Error::UnsupportedState { node: id, state });
        }
        self.set_state(id, state, enabled)
    }

    /// Set states and emit the dedicated notifications for the ones that
    /// carry one.
    fn set_state_notify(&mut self, id: NodeId, state: State, enabled: bool) -> Result<bool> {
        if !self.set_state(id, state, enabled)? {
            return Ok(false);
        }
        if state.contains(State::CHECKED) {
            self.dispatch(id, EventType::Check)?;
        }
        if state.contains(State::SELECTED) {
            self.dispatch(id, EventType::Select)?;
        }
        if state.contains(State::OPENED) {
            let kind = if enabled {
                EventType::Open
            } else {
                EventType::Close
            };
            self.dispatch(id, kind)?;
        }
        Ok(true)
    }

    /// Enable or disable support for states. Withdrawing support clears the
    /// states first, through the renderer.
    pub fn set_supported_state(&mut self, id: NodeId, state: State, supported: bool) -> Result<()> {
        if !supported {
            let active = self.get(id)?.state() & state;
            if !active.is_empty() {
                self.set_state_notify(id, active, false)?;
            }
        }
        self.get_mut(id)?.states.set_supported(state, supported);
        Ok(())
    }

    /// Set FOCUSED.
    pub fn set_focused(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state(id, State::FOCUSED, v)
    }

    /// Set ACTIVE.
    pub fn set_active(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state(id, State::ACTIVE, v)
    }

    /// Set CHECKED, emitting `Check` if it flipped.
    pub fn set_checked(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state_notify(id, State::CHECKED, v)
    }

    /// Set SELECTED, emitting `Select` if it flipped.
    pub fn set_selected(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state_notify(id, State::SELECTED, v)
    }

    /// Set READONLY.
    pub fn set_readonly(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state(id, State::READONLY, v)
    }

    /// Set DISABLED.
    pub fn set_disabled(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state(id, State::DISABLED, v)
    }

    /// Set INDETERMINATE.
    pub fn set_indeterminate(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state(id, State::INDETERMINATE, v)
    }

    /// Set OPENED, emitting `Open` or `Close` if it flipped.
    pub fn set_opened(&mut self, id: NodeId, v: bool) -> Result<bool> {
        self.set_state_notify(id, State::OPENED, v)
    }

    /// Show the component. With `force`, the change is immediate and only a
    /// `Change` notification fires. Otherwise `BeforeShow` may veto, and
    /// `AfterShow` follows once the renderer's transition completes. Returns
    /// false if already visible or vetoed.
    pub fn show(&mut self, id: NodeId, force: bool) -> Result<bool> {
        if self.get(id)?.visible {
            return Ok(false);
        }
        if !force && self.dispatch(id, EventType::BeforeShow)?.is_cancelled() {
            return Ok(false);
        }
        let transition = {
            let (r, mut cx) = self.render_cx(id)?;
            cx.node.visible = true;
            r.show(&mut cx, force)
        };
        if force {
            self.changed(id)?;
        } else if transition == Transition::Complete {
            self.complete_show(id)?;
        }
        Ok(true)
    }

    /// Finish an animated show.
    pub fn complete_show(&mut self, id: NodeId) -> Result<()> {
        self.dispatch(id, EventType::AfterShow)?;
        self.changed(id)
    }

    /// Hide the component. Mirrors `show`.
    pub fn hide(&mut self, id: NodeId, force: bool) -> Result<bool> {
        if !self.get(id)?.visible {
            return Ok(false);
        }
        if !force && self.dispatch(id, EventType::BeforeHide)?.is_cancelled() {
            return Ok(false);
        }
        let transition = {
            let (r, mut cx) = self.render_cx(id)?;
            cx.node.visible = false;
            r.hide(&mut cx, force)
        };
        if force {
            self.changed(id)?;
        } else if transition == Transition::Complete {
            self.complete_hide(id)?;
        }
        Ok(true)
    }

    /// Finish an animated hide.
    pub fn complete_hide(&mut self, id: NodeId) -> Result<()> {
        self.dispatch(id, EventType::AfterHide)?;
        self.changed(id)
    }

    /// Show or hide immediately.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<bool> {
        if visible {
            self.show(id, true)
        } else {
            self.hide(id, true)
        }
    }

    /// Set the value. Does nothing if it is equal to the current one;
    /// otherwise the renderer reacts, then `ValueChanged` and `Change` fire.
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<bool> {
        let (r, mut cx) = self.render_cx(id)?;
        if cx.node.value == value {
            return Ok(false);
        }
        cx.node.value = value;
        r.set_value(&mut cx);
        self.dispatch(id, EventType::ValueChanged)?;
        self.changed(id)?;
        Ok(true)
    }

    /// Take the update lock, or nest deeper.
    pub fn begin_update(&mut self, id: NodeId) -> Result<()> {
        self.get_mut(id)?.lock.begin();
        Ok(())
    }

    /// Release one level of the update lock. When it opens and `fire` is
    /// true, the component updates.
    pub fn end_update(&mut self, id: NodeId, fire: bool) -> Result<()> {
        if self.get_mut(id)?.lock.end() && fire {
            self.update(id)?;
        }
        Ok(())
    }

    /// Run `f` with the update lock held, then release it and update. The
    /// lock is released even if `f` fails.
    pub fn batch<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.begin_update(id)?;
        let res = f(self);
        if !self.contains(id) {
            return res;
        }
        let ended = self.end_update(id, true);
        let v = res?;
        ended?;
        Ok(v)
    }

    /// Bring the component up to date. Lists reconcile; plain components
    /// notify. Does nothing while locked.
    pub fn update(&mut self, id: NodeId) -> Result<()> {
        if self.get(id)?.is_list() {
            list::reconcile(self, id)
        } else {
            self.changed(id)
        }
    }

    /// Emit `Change`, but only in the document and with the lock open.
    pub fn changed(&mut self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        if !node.in_document || !node.can_update() {
            return Ok(());
        }
        self.dispatch(id, EventType::Change)?;
        Ok(())
    }

    /// Listen for an event on a component. Events dispatched on descendants
    /// bubble up to it.
    pub fn listen(
        &mut self,
        id: NodeId,
        kind: EventType,
        handler: impl FnMut(&Event) -> Outcome + 'static,
    ) -> Result<ListenerId> {
        self.get(id)?;
        self.listeners
            .add(id, kind, None, Box::new(handler))
            .ok_or_else(|| Error::Invalid("listener scope released".into()))
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unlisten(&mut self, listener: ListenerId) -> bool {
        self.listeners.remove(listener)
    }

    /// Number of listeners attached to a component.
    pub fn listener_count(&self, id: NodeId) -> usize {
        self.listeners.count(id)
    }

    /// Dispatch an event on `target` and bubble it to the root. A listener
    /// returning `Cancel` on a cancelable event stops it and the cancellation
    /// is returned. Other events always reach the root.
    pub fn dispatch(&mut self, target: NodeId, kind: EventType) -> Result<Outcome> {
        self.get(target)?;
        trace!(event = %kind, ?target, "dispatch");
        let mut current = Some(target);
        while let Some(cur) = current {
            if matches!(kind, EventType::Select | EventType::Check) {
                self.track_child_state(cur, target, kind);
            }
            let event = Event {
                kind,
                target,
                current: cur,
            };
            if self.listeners.notify(&event).is_cancelled() {
                return Ok(Outcome::Cancel);
            }
            current = self.parent(cur);
        }
        Ok(Outcome::Proceed)
    }

    /// Keep a list's selected/checked tracking in step with a direct child's
    /// state as its notification passes through.
    fn track_child_state(&mut self, current: NodeId, target: NodeId, kind: EventType) {
        let Some(child) = self.nodes.get(target) else {
            return;
        };
        if child.parent != Some(current) {
            return;
        }
        let on = match kind {
            EventType::Select => child.is_selected(),
            _ => child.is_checked(),
        };
        if let Some(c) = self.nodes.get_mut(current).and_then(|n| n.collection.as_mut()) {
            c.track(kind, target, on);
        }
    }

    /// Queue deferred work.
    pub(crate) fn schedule(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Drop deferred work belonging to a component.
    pub(crate) fn cancel_tasks(&mut self, id: NodeId) {
        self.tasks.retain(|t| t.owner() != id);
    }

    /// Number of queued tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Run the next queued task. Returns false if the queue was empty.
    pub fn run_next(&mut self) -> Result<bool> {
        let Some(task) = self.tasks.pop_front() else {
            return Ok(false);
        };
        match task {
            Task::RenderBatch { list, start } => {
                if self.contains(list) {
                    list::render_batch(self, list, start)?;
                }
            }
        }
        Ok(true)
    }

    /// Run queued tasks until the queue is empty, including tasks queued along
    /// the way. Returns the number of tasks run.
    pub fn run_pending(&mut self) -> Result<usize> {
        let mut n = 0;
        while self.run_next()? {
            n += 1;
        }
        Ok(n)
    }

    /// Structural operations on a list.
    pub fn list(&mut self, id: NodeId) -> Result<ListMut<'_>> {
        if !self.get(id)?.is_list() {
            return Err(Error::NotAList(id));
        }
        Ok(ListMut::new(self, id))
    }

    /// A list's ordering state.
    pub fn collection(&self, id: NodeId) -> Result<&Collection> {
        self.get(id)?.collection.as_ref().ok_or(Error::NotAList(id))
    }

    /// A list's ordering state, mutably.
    pub(crate) fn collection_mut(&mut self, id: NodeId) -> Result<&mut Collection> {
        self.get_mut(id)?
            .collection
            .as_mut()
            .ok_or(Error::NotAList(id))
    }
}
