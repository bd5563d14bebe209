//! Ordered collections of child components.
//!
//! A list keeps an explicit presentation order that is independent of
//! registration order and of the document. Structural mutations update the
//! logical model immediately and mark the list dirty; the document is brought
//! in line by a single reconciliation once the list's update lock opens.

use std::{cmp::Ordering, mem, ops::ControlFlow};

use tracing::{debug, trace};

use crate::{
    Core, NodeId,
    core::world::Task,
    dom::NodeKind,
    error::{Error, Result},
    event::EventType,
    node::Node,
};

/// Number of items rendered per batch when a list first enters the document.
pub const BATCH_SIZE: usize = 50;

/// Ordering and tracking state of a list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Presentation order. Always a permutation of the live children.
    order: Vec<NodeId>,
    /// Order as of the last add or remove, restored by `sort_reset`.
    default_order: Vec<NodeId>,
    /// Removed items whose elements have not been taken out of the document.
    pending: Vec<NodeId>,
    /// Set by structural mutations, cleared by reconciliation.
    dirty: bool,
    /// Selected children, in selection order.
    selected: Vec<NodeId>,
    /// Checked children, in check order.
    checked: Vec<NodeId>,
}

impl Collection {
    /// Items in presentation order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Items in insertion order.
    pub fn default_order(&self) -> &[NodeId] {
        &self.default_order
    }

    /// Items waiting to be taken out of the document.
    pub fn pending_removals(&self) -> &[NodeId] {
        &self.pending
    }

    /// Does the document need reconciling?
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Selected items.
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    /// Checked items.
    pub fn checked(&self) -> &[NodeId] {
        &self.checked
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the list has no items.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The item at a position.
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.order.get(index).copied()
    }

    /// The position of an item, or None if it is not in the list.
    pub fn index_of(&self, item: NodeId) -> Option<usize> {
        self.order.iter().position(|x| *x == item)
    }

    /// Record a child's selected or checked state.
    pub(crate) fn track(&mut self, kind: EventType, child: NodeId, on: bool) {
        let list = match kind {
            EventType::Select => &mut self.selected,
            EventType::Check => &mut self.checked,
            _ => return,
        };
        if !on {
            list.retain(|x| *x != child);
        } else if !list.contains(&child) {
            list.push(child);
        }
    }

    /// Drop an item from every sequence except `pending`.
    fn forget(&mut self, item: NodeId) {
        self.order.retain(|x| *x != item);
        self.default_order.retain(|x| *x != item);
        self.selected.retain(|x| *x != item);
        self.checked.retain(|x| *x != item);
    }
}

/// An item addressed by position or by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Position in presentation order.
    Index(usize),
    /// A specific component.
    Node(NodeId),
}

impl From<usize> for Target {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<NodeId> for Target {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

/// Mutable access to a list, obtained from [`Core::list`].
///
/// Index targets that fall outside the list are errors for `remove`,
/// `select` and `deselect`. Component targets that are not items of the list
/// resolve to a no-op.
pub struct ListMut<'a> {
    /// The arena.
    core: &'a mut Core,
    /// The list.
    id: NodeId,
}

impl<'a> ListMut<'a> {
    /// Construct a view. The caller has checked that `id` is a list.
    pub(crate) fn new(core: &'a mut Core, id: NodeId) -> Self {
        Self { core, id }
    }

    /// The list's node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The list's ordering state.
    pub fn collection(&self) -> Result<&Collection> {
        self.core.collection(self.id)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.collection().map_or(0, Collection::len)
    }

    /// True if the list has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at a position.
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.collection().ok().and_then(|c| c.get(index))
    }

    /// The position of an item, or None if it is not in the list.
    pub fn index_of(&self, item: NodeId) -> Option<usize> {
        self.collection().ok().and_then(|c| c.index_of(item))
    }

    /// Component IDs in presentation order.
    pub fn keys(&self) -> Vec<String> {
        self.collection()
            .map(|c| {
                c.order()
                    .iter()
                    .filter_map(|id| self.core.node(*id))
                    .map(|n| n.id().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a target to an item.
    fn resolve(&self, target: Target) -> Result<Option<NodeId>> {
        let c = self.collection()?;
        match target {
            Target::Index(index) => c.get(index).map(Some).ok_or(Error::IndexOutOfRange {
                index,
                len: c.len(),
            }),
            Target::Node(id) => Ok(c.index_of(id).map(|_| id)),
        }
    }

    /// Insert a component at `index`, clamped to the list length, or at the
    /// end. The component must not already have a parent.
    pub fn add(&mut self, child: NodeId, index: Option<usize>) -> Result<()> {
        self.core.register_child(self.id, child)?;
        let node = self.core.get(child)?;
        let (selected, checked) = (node.is_selected(), node.is_checked());

        let c = self.core.collection_mut(self.id)?;
        let at = index.map_or(c.order.len(), |i| i.min(c.order.len()));
        c.order.insert(at, child);
        c.default_order.insert(at.min(c.default_order.len()), child);
        c.pending.retain(|x| *x != child);
        c.track(EventType::Select, child, selected);
        c.track(EventType::Check, child, checked);
        c.dirty = true;
        self.core.update(self.id)
    }

    /// Remove an item. Its element leaves the document at the next
    /// reconciliation. With `dispose`, the item is destroyed afterwards.
    /// Returns None if the target is not an item.
    pub fn remove(&mut self, target: impl Into<Target>, dispose: bool) -> Result<Option<NodeId>> {
        let Some(item) = self.resolve(target.into())? else {
            return Ok(None);
        };
        if !self.core.unregister_child(self.id, item) {
            return Ok(None);
        }
        let c = self.core.collection_mut(self.id)?;
        c.forget(item);
        c.pending.push(item);
        c.dirty = true;
        self.core.update(self.id)?;
        if dispose {
            self.core.dispose(item)?;
        }
        Ok(Some(item))
    }

    /// Remove every item in one batch, returning them in presentation order.
    pub fn clear(&mut self, dispose: bool) -> Result<Vec<NodeId>> {
        let items = self.collection()?.order.clone();
        if items.is_empty() {
            return Ok(items);
        }
        for item in &items {
            self.core.unregister_child(self.id, *item);
        }
        let c = self.core.collection_mut(self.id)?;
        c.order.clear();
        c.default_order.clear();
        c.selected.clear();
        c.checked.clear();
        c.pending.extend(items.iter().copied());
        c.dirty = true;
        self.core.update(self.id)?;
        if dispose {
            for item in &items {
                self.core.dispose(*item)?;
            }
        }
        Ok(items)
    }

    /// Move an item to position `to` in presentation order. Unknown items,
    /// out-of-range positions and moves to the same position do nothing and
    /// return false.
    pub fn move_item(&mut self, target: impl Into<Target>, to: usize) -> Result<bool> {
        let c = self.collection()?;
        let from = match target.into() {
            Target::Index(i) => (i < c.len()).then_some(i),
            Target::Node(id) => c.index_of(id),
        };
        let Some(from) = from else {
            return Ok(false);
        };
        if to >= c.len() || to == from {
            return Ok(false);
        }
        let c = self.core.collection_mut(self.id)?;
        let item = c.order.remove(from);
        c.order.insert(to, item);
        c.dirty = true;
        self.core.update(self.id)?;
        Ok(true)
    }

    /// Reorder items with a comparator over the components. The sort is
    /// stable: items that compare equal keep their relative order.
    pub fn sort_by(&mut self, mut cmp: impl FnMut(&Node, &Node) -> Ordering) -> Result<()> {
        let mut order = self.collection()?.order.clone();
        let nodes = &self.core.nodes;
        order.sort_by(|a, b| match (nodes.get(*a), nodes.get(*b)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => Ordering::Equal,
        });
        let c = self.core.collection_mut(self.id)?;
        c.order = order;
        c.dirty = true;
        self.core.update(self.id)
    }

    /// Restore insertion order, discarding moves and sorts.
    pub fn sort_reset(&mut self) -> Result<()> {
        let c = self.core.collection_mut(self.id)?;
        c.order = c.default_order.clone();
        c.dirty = true;
        self.core.update(self.id)
    }

    /// Visit a snapshot of the items in presentation order. Mutations made by
    /// `f` do not affect the traversal; items disposed along the way are
    /// skipped. Returning `ControlFlow::Break` stops early.
    pub fn for_each(
        &mut self,
        mut f: impl FnMut(&mut Core, NodeId) -> ControlFlow<()>,
    ) -> Result<()> {
        let snapshot = self.collection()?.order.clone();
        for item in snapshot {
            if !self.core.contains(item) {
                continue;
            }
            if f(&mut *self.core, item).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Select an item through its own state setter.
    pub fn select(&mut self, target: impl Into<Target>) -> Result<bool> {
        match self.resolve(target.into())? {
            Some(item) => self.core.set_selected(item, true),
            None => Ok(false),
        }
    }

    /// Deselect an item through its own state setter.
    pub fn deselect(&mut self, target: impl Into<Target>) -> Result<bool> {
        match self.resolve(target.into())? {
            Some(item) => self.core.set_selected(item, false),
            None => Ok(false),
        }
    }

    /// Deselect every selected item.
    pub fn deselect_all(&mut self) -> Result<()> {
        for item in self.collection()?.selected.clone() {
            self.core.set_selected(item, false)?;
        }
        Ok(())
    }

    /// Select every item.
    pub fn select_all(&mut self) -> Result<()> {
        for item in self.collection()?.order.clone() {
            self.core.set_selected(item, true)?;
        }
        Ok(())
    }

    /// Check every item.
    pub fn check_all(&mut self) -> Result<()> {
        for item in self.collection()?.order.clone() {
            self.core.set_checked(item, true)?;
        }
        Ok(())
    }
}

/// Bring a list's document structure in line with its order. Does nothing
/// while the list is locked.
pub(crate) fn reconcile(core: &mut Core, list: NodeId) -> Result<()> {
    if !core.get(list)?.can_update() {
        return Ok(());
    }

    let pending = mem::take(&mut core.collection_mut(list)?.pending);
    for item in pending {
        // Gone, or adopted by another parent since it was removed.
        if core.node(item).is_none_or(|n| n.parent().is_some()) {
            continue;
        }
        core.set_selected(item, false)?;
        core.exit_document(item)?;
        if let Some(el) = core.get(item)?.element {
            core.dom.remove_node(el);
        }
    }

    if !core.collection(list)?.dirty {
        return Ok(());
    }
    if core.get(list)?.in_document {
        relink(core, list)?;
    } else {
        detach_all(core, list)?;
    }
    core.collection_mut(list)?.dirty = false;
    debug!(list = %core.get(list)?.id, items = core.collection(list)?.len(), "reconciled");
    core.changed(list)
}

/// Remove and re-append every item's element in order, creating and entering
/// items that have not been rendered yet.
fn relink(core: &mut Core, list: NodeId) -> Result<()> {
    let Some(content) = core.content_element(list) else {
        return Ok(());
    };
    for item in core.collection(list)?.order.clone() {
        let node = core.get(item)?;
        let (in_document, element) = (node.in_document, node.element);
        if in_document && let Some(el) = element {
            core.dom.remove_node(el);
        }
        let el = match element {
            Some(el) => el,
            None => core.create_dom(item)?,
        };
        core.dom.append_child(content, el)?;
        if !in_document {
            core.enter_document(item)?;
        }
    }
    Ok(())
}

/// Take every item out of the document. Elements are only unlinked from
/// element parents.
fn detach_all(core: &mut Core, list: NodeId) -> Result<()> {
    for item in core.collection(list)?.order.clone() {
        core.exit_document(item)?;
        if let Some(el) = core.get(item)?.element
            && let Some(parent) = core.dom.parent(el)
            && core.dom.kind(parent) == Some(NodeKind::Element)
        {
            core.dom.remove_node(el);
        }
    }
    Ok(())
}

/// Enter the document and start rendering items in batches.
pub(crate) fn enter_document(core: &mut Core, list: NodeId) -> Result<()> {
    core.enter_document_base(list, false)?;
    render_batch(core, list, 0)
}

/// Leave the document: stop pending batches and detach every item.
pub(crate) fn exit_document(core: &mut Core, list: NodeId) -> Result<()> {
    core.cancel_tasks(list);
    for item in core.collection(list)?.order.clone() {
        core.detach(item)?;
    }
    Ok(())
}

/// Render up to `BATCH_SIZE` items starting at `start`, then announce the
/// batch. Unless a listener cancels, the next batch is queued.
pub(crate) fn render_batch(core: &mut Core, list: NodeId, start: usize) -> Result<()> {
    let node = core.get(list)?;
    if !node.in_document {
        return Ok(());
    }
    let Some(content) = node.content_element() else {
        return Ok(());
    };
    let order = core.collection(list)?.order();
    let len = order.len();
    if start >= len {
        return Ok(());
    }
    let end = (start + BATCH_SIZE).min(len);
    let batch = order[start..end].to_vec();

    for item in batch {
        if core.get(item)?.in_document {
            continue;
        }
        let el = core.ensure_dom(item)?;
        core.dom.append_child(content, el)?;
        core.enter_document(item)?;
    }
    trace!(start, end, len, "rendered batch");

    if core.dispatch(list, EventType::PartRendered)?.is_cancelled() {
        debug!(rendered = end, len, "incremental render cancelled");
        return Ok(());
    }
    if end < len {
        core.schedule(Task::RenderBatch { list, start: end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn tracking_has_no_duplicates() {
        let v = ids(2);
        let mut c = Collection::default();
        c.track(EventType::Select, v[0], true);
        c.track(EventType::Select, v[0], true);
        c.track(EventType::Select, v[1], true);
        c.track(EventType::Check, v[1], true);
        c.track(EventType::Change, v[0], true);
        assert_eq!(c.selected(), &[v[0], v[1]]);
        assert_eq!(c.checked(), &[v[1]]);
        c.track(EventType::Select, v[0], false);
        assert_eq!(c.selected(), &[v[1]]);
    }

    #[test]
    fn forget_keeps_pending() {
        let v = ids(2);
        let mut c = Collection {
            order: v.clone(),
            default_order: v.clone(),
            selected: vec![v[0]],
            ..Default::default()
        };
        c.pending.push(v[0]);
        c.forget(v[0]);
        assert_eq!(c.order(), &[v[1]]);
        assert_eq!(c.default_order(), &[v[1]]);
        assert!(c.selected().is_empty());
        assert_eq!(c.pending_removals(), &[v[0]]);
        assert_eq!(c.index_of(v[1]), Some(0));
        assert_eq!(c.index_of(v[0]), None);
    }

    #[test]
    fn targets() {
        let v = ids(1);
        assert_eq!(Target::from(3), Target::Index(3));
        assert_eq!(Target::from(v[0]), Target::Node(v[0]));
    }
}
