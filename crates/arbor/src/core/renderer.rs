//! Renderers turn component state into document structure.
//!
//! A renderer is stateless and shared by every component of a kind. Anything
//! it needs to remember per component goes into the component's renderer
//! cache. The component calls into its renderer only at fixed lifecycle
//! points; renderers never initiate actions.

use std::{collections::HashMap, rc::Rc};

use crate::{
    Kind, NodeId,
    cache::{self, Cached},
    dom::{Dom, ElementId},
    error::Result,
    event::{EventType, Handler, ListenerId, Listeners, ScopeId},
    node::Node,
    state::State,
};

/// Base class for plain components.
pub const COMPONENT_CLASS: &str = "arbor-component";
/// Base class for lists.
pub const LIST_CLASS: &str = "arbor-list";

/// Inline styles a cover copies from the element it replaces.
const COVER_STYLES: [&str; 11] = [
    "width",
    "height",
    "margin-top",
    "margin-bottom",
    "margin-left",
    "margin-right",
    "position",
    "top",
    "bottom",
    "left",
    "right",
];

/// Bidirectional mapping between states and the classes that represent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    /// State to class.
    by_state: HashMap<State, String>,
    /// Class to state.
    by_class: HashMap<String, State>,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    /// Build the standard table: one lowercase class per state.
    pub fn new() -> Self {
        Self::from_pairs([
            (State::FOCUSED, "focused"),
            (State::ACTIVE, "active"),
            (State::CHECKED, "checked"),
            (State::SELECTED, "selected"),
            (State::READONLY, "readonly"),
            (State::DISABLED, "disabled"),
            (State::OPENED, "opened"),
            (State::INDETERMINATE, "indeterminate"),
        ])
    }

    /// Build a table from explicit pairs. The reverse table is derived here.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (State, &'a str)>) -> Self {
        let by_state: HashMap<State, String> = pairs
            .into_iter()
            .map(|(s, c)| (s, c.to_string()))
            .collect();
        let by_class = by_state.iter().map(|(s, c)| (c.clone(), *s)).collect();
        Self { by_state, by_class }
    }

    /// The class for a single state.
    pub fn class_for(&self, state: State) -> Option<&str> {
        self.by_state.get(&state).map(String::as_str)
    }

    /// The state for a class.
    pub fn state_for(&self, class: &str) -> Option<State> {
        self.by_class.get(class).copied()
    }
}

/// How a show or hide request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The change is already visible.
    Complete,
    /// The renderer started an animation and will report completion through
    /// `Core::complete_show` or `Core::complete_hide`.
    Pending,
}

/// What a renderer can touch while servicing a component.
pub struct RenderCx<'a> {
    /// The component being rendered.
    pub id: NodeId,
    /// Component data.
    pub node: &'a mut Node,
    /// The document.
    pub dom: &'a mut dyn Dom,
    /// Listener registry, for scoped listeners.
    listeners: &'a mut Listeners,
}

impl<'a> RenderCx<'a> {
    /// Construct a context.
    pub(crate) fn new(
        id: NodeId,
        node: &'a mut Node,
        dom: &'a mut dyn Dom,
        listeners: &'a mut Listeners,
    ) -> Self {
        Self {
            id,
            node,
            dom,
            listeners,
        }
    }

    /// The cached root element, falling back to the component's element.
    pub fn root(&self) -> Option<ElementId> {
        self.node.cache().element(cache::ROOT).or(self.node.element())
    }

    /// Open a listener scope.
    pub fn open_scope(&mut self) -> ScopeId {
        self.listeners.open_scope()
    }

    /// Release a scope and its listeners.
    pub fn release_scope(&mut self, scope: ScopeId) -> usize {
        self.listeners.release_scope(scope)
    }

    /// Listen on this component within the renderer's event scope. Returns
    /// None if the component is not initialized.
    pub fn listen(&mut self, kind: EventType, handler: Handler) -> Option<ListenerId> {
        let scope = self.node.cache().scope(cache::EVENTS)?;
        self.listeners.add(self.id, kind, Some(scope), handler)
    }
}

/// A stateless strategy that builds and updates a component's DOM.
///
/// Only `css_class`, `classes` and `with_css_class` are required. The provided
/// methods implement the standard behaviour and are meant to be overridden
/// selectively.
pub trait Renderer {
    /// Base CSS class.
    fn css_class(&self) -> &str;

    /// The shared state/class table.
    fn classes(&self) -> &ClassTable;

    /// A variant of this renderer with a different base class.
    fn with_css_class(&self, class: &str) -> Rc<dyn Renderer>;

    /// Tag name of the root element.
    fn tag(&self) -> &str {
        "div"
    }

    /// A BEM class name: `prefix`, `prefix__element` or
    /// `prefix__element_modifier`. The prefix is the component's CSS prefix,
    /// or the renderer's base class if none is set.
    fn bem_class(&self, node: &Node, element: Option<&str>, modifier: Option<&str>) -> String {
        let prefix = if node.css_prefix().is_empty() {
            self.css_class()
        } else {
            node.css_prefix()
        };
        match (element, modifier) {
            (None, _) => prefix.to_string(),
            (Some(e), None) => format!("{prefix}__{e}"),
            (Some(e), Some(m)) => format!("{prefix}__{e}_{m}"),
        }
    }

    /// The base class plus one class per enabled state.
    fn state_classes(&self, node: &Node) -> Vec<String> {
        let mut v = vec![self.bem_class(node, None, None)];
        v.extend(
            node.state()
                .iter()
                .filter_map(|s| self.classes().class_for(s))
                .map(str::to_string),
        );
        v
    }

    /// Infer states from an element's classes.
    fn states_from_classes(&self, dom: &dyn Dom, el: ElementId) -> State {
        dom.classes(el)
            .iter()
            .filter(|c| c.as_str() != self.css_class())
            .filter_map(|c| self.classes().state_for(c))
            .fold(State::empty(), |acc, s| acc | s)
    }

    /// Build a fresh root element for the component.
    fn create_dom(&self, cx: &mut RenderCx<'_>) -> Result<ElementId> {
        let mut classes = self.state_classes(cx.node);
        classes.extend(cx.node.custom_class().split_whitespace().map(str::to_string));
        let el = cx.dom.create_element(self.tag(), &classes);
        cx.node.cache_mut().insert(cache::ROOT, Cached::Element(el));
        let node_id = cx.node.node_id().to_string();
        self.set_node_id(cx, &node_id);
        cx.node.set_content_element(Some(el));
        Ok(el)
    }

    /// Can this renderer adopt `el`?
    fn can_decorate(&self, dom: &dyn Dom, el: ElementId) -> bool {
        dom.can_have_children(el)
    }

    /// Adopt an existing element. States are inferred from its classes, and
    /// the renderer's classes are added without removing unknown ones.
    fn decorate(&self, cx: &mut RenderCx<'_>, el: ElementId) -> Result<ElementId> {
        if let Some(id) = cx.dom.attribute(el, "id") {
            cx.node.set_node_id_internal(id);
        }
        let states = self.states_from_classes(cx.dom, el);
        cx.node.set_states_internal(states);

        let base = self.bem_class(cx.node, None, None);
        cx.dom.add_class(el, &base);
        for c in cx.node.custom_class().split_whitespace() {
            cx.dom.add_class(el, c);
        }
        cx.node.cache_mut().insert(cache::ROOT, Cached::Element(el));
        cx.node.set_content_element(Some(el));
        Ok(el)
    }

    /// Push the DOM `id` attribute to the root element.
    fn set_node_id(&self, cx: &mut RenderCx<'_>, id: &str) {
        if id.is_empty() {
            return;
        }
        if let Some(root) = cx.root() {
            cx.dom.set_attribute(root, "id", id);
        }
    }

    /// Wire up behaviour when the component enters the document.
    fn initialize_dom(&self, cx: &mut RenderCx<'_>) -> Result<()> {
        self.reflect_states(cx);
        if !cx.node.is_visible()
            && let Some(el) = cx.node.element()
        {
            cx.dom.set_style(el, "display", "none");
        }
        if let Some(old) = cx.node.cache().scope(cache::EVENTS) {
            cx.release_scope(old);
        }
        let scope = cx.open_scope();
        cx.node.cache_mut().insert(cache::EVENTS, Cached::Scope(scope));
        Ok(())
    }

    /// Tear down behaviour when the component leaves the document.
    fn uninitialize_dom(&self, cx: &mut RenderCx<'_>) {
        if let Some(Cached::Scope(s)) = cx.node.cache_mut().remove(cache::EVENTS) {
            cx.release_scope(s);
        }
    }

    /// Reflect every enabled state.
    fn reflect_states(&self, cx: &mut RenderCx<'_>) {
        for s in cx.node.state().iter() {
            self.set_state(cx, s, true);
        }
    }

    /// Reflect one state change: toggle its class and run the state hook.
    fn set_state(&self, cx: &mut RenderCx<'_>, state: State, enabled: bool) {
        let Some(root) = cx.root() else {
            return;
        };
        if let Some(class) = self.classes().class_for(state) {
            cx.dom.enable_class(root, class, enabled);
        }
        self.on_state(cx, state, enabled);
    }

    /// Per-state hook.
    fn on_state(&self, _cx: &mut RenderCx<'_>, _state: State, _enabled: bool) {}

    /// Make the component visible.
    fn show(&self, cx: &mut RenderCx<'_>, _force: bool) -> Transition {
        if let Some(el) = cx.node.element() {
            cx.dom.set_style(el, "display", "");
        }
        Transition::Complete
    }

    /// Make the component invisible.
    fn hide(&self, cx: &mut RenderCx<'_>, _force: bool) -> Transition {
        if let Some(el) = cx.node.element() {
            cx.dom.set_style(el, "display", "none");
        }
        Transition::Complete
    }

    /// React to a value change.
    fn set_value(&self, _cx: &mut RenderCx<'_>) {}

    /// The component's cover element, created and cached on first use.
    fn cover(&self, cx: &mut RenderCx<'_>) -> ElementId {
        if let Some(el) = cx.node.cache().element(cache::COVER) {
            return el;
        }
        let class = self.bem_class(cx.node, Some("cover"), None);
        let el = cx.dom.create_element("div", &[class]);
        cx.node.cache_mut().insert(cache::COVER, Cached::Element(el));
        el
    }

    /// Swap the root element for its cover, or back. The cover takes over
    /// the element's inline size, margins and position.
    fn set_covered(&self, cx: &mut RenderCx<'_>, enabled: bool) -> Result<()> {
        let Some(el) = cx.node.element() else {
            return Ok(());
        };
        let cover = self.cover(cx);
        if enabled {
            for prop in COVER_STYLES {
                let v = cx.dom.style(el, prop).unwrap_or_default();
                cx.dom.set_style(cover, prop, &v);
            }
            if cx.dom.parent(el).is_some() {
                cx.dom.replace_node(cover, el)?;
            }
        } else {
            if cx.dom.parent(cover).is_some() {
                cx.dom.replace_node(el, cover)?;
            }
            cx.dom.set_style(cover, "width", "");
            cx.dom.set_style(cover, "height", "");
        }
        Ok(())
    }

    /// React to a size change.
    fn resize(&self, _cx: &mut RenderCx<'_>) {}
}

/// The standard renderer, configured by base class, tag and decoration policy.
#[derive(Debug, Clone)]
pub struct BasicRenderer {
    /// Base CSS class.
    css_class: String,
    /// Root element tag.
    tag: String,
    /// Whether existing markup may be adopted.
    decoratable: bool,
    /// Shared state/class table.
    classes: Rc<ClassTable>,
}

impl BasicRenderer {
    /// A renderer with the given base class that renders `div`s.
    pub fn new(css_class: impl Into<String>, classes: Rc<ClassTable>) -> Self {
        Self {
            css_class: css_class.into(),
            tag: "div".into(),
            decoratable: true,
            classes,
        }
    }

    /// The default renderer for plain components.
    pub fn component(classes: Rc<ClassTable>) -> Self {
        Self::new(COMPONENT_CLASS, classes)
    }

    /// The default renderer for lists. Lists never adopt existing markup.
    pub fn list(classes: Rc<ClassTable>) -> Self {
        Self::new(LIST_CLASS, classes).decoratable(false)
    }

    /// Set the root tag.
    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set whether existing markup may be adopted.
    pub fn decoratable(mut self, v: bool) -> Self {
        self.decoratable = v;
        self
    }
}

impl Renderer for BasicRenderer {
    fn css_class(&self) -> &str {
        &self.css_class
    }

    fn classes(&self) -> &ClassTable {
        &self.classes
    }

    fn with_css_class(&self, class: &str) -> Rc<dyn Renderer> {
        let mut r = self.clone();
        r.css_class = class.to_string();
        Rc::new(r)
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn can_decorate(&self, dom: &dyn Dom, el: ElementId) -> bool {
        self.decoratable && dom.can_have_children(el)
    }
}

/// Default renderers by component kind. The class table is built once here
/// and shared by every renderer the registry creates.
pub struct RendererRegistry {
    /// Shared class table.
    classes: Rc<ClassTable>,
    /// Default renderer per kind.
    defaults: HashMap<Kind, Rc<dyn Renderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// A registry with the standard renderers for every kind.
    pub fn new() -> Self {
        let classes = Rc::new(ClassTable::new());
        let mut defaults: HashMap<Kind, Rc<dyn Renderer>> = HashMap::new();
        defaults.insert(
            Kind::Component,
            Rc::new(BasicRenderer::component(classes.clone())),
        );
        defaults.insert(Kind::List, Rc::new(BasicRenderer::list(classes.clone())));
        Self { classes, defaults }
    }

    /// The shared class table.
    pub fn classes(&self) -> Rc<ClassTable> {
        self.classes.clone()
    }

    /// The default renderer for a kind.
    pub fn get(&self, kind: Kind) -> Rc<dyn Renderer> {
        match self.defaults.get(&kind) {
            Some(r) => r.clone(),
            None => Rc::new(BasicRenderer::component(self.classes.clone())),
        }
    }

    /// Replace the default renderer for a kind. Components created afterwards
    /// use it; existing components keep theirs.
    pub fn register(&mut self, kind: Kind, renderer: Rc<dyn Renderer>) {
        self.defaults.insert(kind, renderer);
    }

    /// A variant of a kind's default renderer with another base class.
    pub fn custom(&self, kind: Kind, css_class: &str) -> Rc<dyn Renderer> {
        self.get(kind).with_css_class(css_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn class_table_round_trips_every_state() {
        let t = ClassTable::new();
        for s in State::all().iter() {
            let class = t.class_for(s);
            assert!(class.is_some(), "{s:?} has no class");
            assert_eq!(class.and_then(|c| t.state_for(c)), Some(s));
        }
        assert_eq!(t.state_for("arbor-component"), None);
    }

    #[test]
    fn custom_renderer_keeps_policy() {
        let reg = RendererRegistry::new();
        let r = reg.custom(Kind::List, "menu");
        assert_eq!(r.css_class(), "menu");
        let mut dom = MemoryDom::new();
        let el = dom.create_element("div", &[]);
        assert!(!r.can_decorate(&dom, el));
        assert!(reg.custom(Kind::Component, "x").can_decorate(&dom, el));
    }

    #[test]
    fn states_from_classes_ignores_unknown() {
        let reg = RendererRegistry::new();
        let r = reg.get(Kind::Component);
        let mut dom = MemoryDom::new();
        let el = dom.create_element(
            "div",
            &[
                "arbor-component".into(),
                "checked".into(),
                "fancy".into(),
                "opened".into(),
            ],
        );
        assert_eq!(
            r.states_from_classes(&dom, el),
            State::CHECKED | State::OPENED
        );
    }

    #[test]
    fn void_elements_cannot_be_decorated() {
        let reg = RendererRegistry::new();
        let mut dom = MemoryDom::new();
        let img = dom.create_element("img", &[]);
        assert!(!reg.get(Kind::Component).can_decorate(&dom, img));
    }
}
