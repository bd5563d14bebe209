use std::{collections::HashMap, fmt};

use slotmap::{SlotMap, new_key_type};

use crate::NodeId;

new_key_type! {
    /// Identifier for a registered listener.
    pub struct ListenerId;
    /// Identifier for a group of listeners that are released together.
    pub struct ScopeId;
}

/// Notifications emitted by components and lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The user activated the component.
    Action,
    /// The component is about to be shown. Cancelable.
    BeforeShow,
    /// The component is about to be hidden. Cancelable.
    BeforeHide,
    /// An animated show completed.
    AfterShow,
    /// An animated hide completed.
    AfterHide,
    /// The component was opened.
    Open,
    /// The component was closed.
    Close,
    /// Something about the component changed.
    Change,
    /// The component's value changed.
    ValueChanged,
    /// The checked state flipped.
    Check,
    /// The selected state flipped.
    Select,
    /// A list finished rendering a batch of items. Cancelable: cancelling
    /// stops the remaining batches.
    PartRendered,
}

impl EventType {
    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::BeforeShow => "beforeShow",
            Self::BeforeHide => "beforeHide",
            Self::AfterShow => "afterShow",
            Self::AfterHide => "afterHide",
            Self::Open => "afterOpen",
            Self::Close => "afterClose",
            Self::Change => "change",
            Self::ValueChanged => "value_changed",
            Self::Check => "check",
            Self::Select => "select",
            Self::PartRendered => "list__partially_rendered",
        }
    }

    /// Can a listener veto the transition this event announces?
    pub fn is_cancelable(&self) -> bool {
        matches!(self, Self::BeforeShow | Self::BeforeHide | Self::PartRendered)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dispatched notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventType,
    /// The component the event was dispatched on.
    pub target: NodeId,
    /// The component whose listener is running. Differs from `target` while
    /// the event bubbles through ancestors.
    pub current: NodeId,
}

/// A listener's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Let the event continue.
    #[default]
    Proceed,
    /// Stop propagation and veto the announced transition. Ignored for
    /// events that are not cancelable.
    Cancel,
}

impl Outcome {
    /// Did a listener cancel?
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancel)
    }
}

/// A listener callback.
pub type Handler = Box<dyn FnMut(&Event) -> Outcome>;

/// A registered listener.
struct Listener {
    /// Component the listener is attached to.
    node: NodeId,
    /// Event type it responds to.
    kind: EventType,
    /// Scope that owns the listener, if any.
    scope: Option<ScopeId>,
    /// Callback.
    handler: Handler,
}

/// Registry of listeners, indexed by the component they are attached to.
#[derive(Default)]
pub struct Listeners {
    /// Listener storage.
    entries: SlotMap<ListenerId, Listener>,
    /// Registration order per component.
    by_node: HashMap<NodeId, Vec<ListenerId>>,
    /// Open scopes and their members.
    scopes: SlotMap<ScopeId, Vec<ListenerId>>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("listeners", &self.entries.len())
            .field("scopes", &self.scopes.len())
            .finish()
    }
}

impl Listeners {
    /// Register a listener, optionally owned by a scope. Listeners for a
    /// released scope are never registered.
    pub fn add(
        &mut self,
        node: NodeId,
        kind: EventType,
        scope: Option<ScopeId>,
        handler: Handler,
    ) -> Option<ListenerId> {
        if let Some(s) = scope
            && !self.scopes.contains_key(s)
        {
            return None;
        }
        let id = self.entries.insert(Listener {
            node,
            kind,
            scope,
            handler,
        });
        self.by_node.entry(node).or_default().push(id);
        if let Some(s) = scope
            && let Some(members) = self.scopes.get_mut(s)
        {
            members.push(id);
        }
        Some(id)
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let Some(l) = self.entries.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_node.get_mut(&l.node) {
            ids.retain(|x| *x != id);
            if ids.is_empty() {
                self.by_node.remove(&l.node);
            }
        }
        if let Some(s) = l.scope
            && let Some(members) = self.scopes.get_mut(s)
        {
            members.retain(|x| *x != id);
        }
        true
    }

    /// Open a new listener scope.
    pub fn open_scope(&mut self) -> ScopeId {
        self.scopes.insert(Vec::new())
    }

    /// Release a scope and every listener it owns. Returns the number of
    /// listeners removed.
    pub fn release_scope(&mut self, scope: ScopeId) -> usize {
        let Some(members) = self.scopes.remove(scope) else {
            return 0;
        };
        members.into_iter().filter(|id| self.remove(*id)).count()
    }

    /// Drop every listener attached to a component.
    pub fn remove_node(&mut self, node: NodeId) {
        for id in self.by_node.remove(&node).unwrap_or_default() {
            self.remove(id);
        }
    }

    /// Number of listeners attached to a component.
    pub fn count(&self, node: NodeId) -> usize {
        self.by_node.get(&node).map_or(0, Vec::len)
    }

    /// Run the listeners registered on `event.current` for `event.kind`, in
    /// registration order. The first `Cancel` of a cancelable event stops the
    /// run; for other events `Cancel` is ignored.
    pub fn notify(&mut self, event: &Event) -> Outcome {
        let ids = self.by_node.get(&event.current).cloned().unwrap_or_default();
        for id in ids {
            if let Some(l) = self.entries.get_mut(id)
                && l.kind == event.kind
                && (l.handler)(event).is_cancelled()
                && event.kind.is_cancelable()
            {
                return Outcome::Cancel;
            }
        }
        Outcome::Proceed
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use slotmap::SlotMap;

    use super::*;

    fn nodes() -> (NodeId, NodeId) {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn notify_in_registration_order() {
        let (a, _) = nodes();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut l = Listeners::default();
        for i in 0..3 {
            let seen = seen.clone();
            l.add(
                a,
                EventType::Change,
                None,
                Box::new(move |_| {
                    seen.borrow_mut().push(i);
                    Outcome::Proceed
                }),
            );
        }
        let ev = Event {
            kind: EventType::Change,
            target: a,
            current: a,
        };
        assert_eq!(l.notify(&ev), Outcome::Proceed);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn cancel_stops_the_run() {
        let (a, _) = nodes();
        let calls = Rc::new(RefCell::new(0));
        let mut l = Listeners::default();
        l.add(a, EventType::BeforeShow, None, Box::new(|_| Outcome::Cancel));
        let c = calls.clone();
        l.add(
            a,
            EventType::BeforeShow,
            None,
            Box::new(move |_| {
                *c.borrow_mut() += 1;
                Outcome::Proceed
            }),
        );
        let ev = Event {
            kind: EventType::BeforeShow,
            target: a,
            current: a,
        };
        assert!(l.notify(&ev).is_cancelled());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn cancel_is_ignored_for_announcements() {
        let (a, _) = nodes();
        let calls = Rc::new(RefCell::new(0));
        let mut l = Listeners::default();
        l.add(a, EventType::Select, None, Box::new(|_| Outcome::Cancel));
        let c = calls.clone();
        l.add(
            a,
            EventType::Select,
            None,
            Box::new(move |_| {
                *c.borrow_mut() += 1;
                Outcome::Proceed
            }),
        );
        let ev = Event {
            kind: EventType::Select,
            target: a,
            current: a,
        };
        assert_eq!(l.notify(&ev), Outcome::Proceed);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn scopes_release_their_listeners() {
        let (a, b) = nodes();
        let mut l = Listeners::default();
        let s = l.open_scope();
        l.add(a, EventType::Change, Some(s), Box::new(|_| Outcome::Proceed));
        l.add(b, EventType::Change, Some(s), Box::new(|_| Outcome::Proceed));
        let keep = l.add(a, EventType::Select, None, Box::new(|_| Outcome::Proceed));
        assert_eq!(l.release_scope(s), 2);
        assert_eq!(l.count(a), 1);
        assert_eq!(l.count(b), 0);
        assert!(l.add(a, EventType::Change, Some(s), Box::new(|_| Outcome::Proceed)).is_none());
        assert!(keep.is_some_and(|k| l.remove(k)));
        assert_eq!(l.release_scope(s), 0);
    }

    #[test]
    fn names() {
        assert_eq!(EventType::PartRendered.to_string(), "list__partially_rendered");
        assert!(EventType::BeforeHide.is_cancelable());
        assert!(!EventType::Change.is_cancelable());
    }
}
