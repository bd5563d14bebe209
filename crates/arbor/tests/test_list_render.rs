//! Integration tests for incremental list rendering.

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use arbor::{BATCH_SIZE, Core, EventType, NodeId, Options, Outcome, error::Result, logging};
    use pretty_assertions::assert_eq;

    /// A detached list holding `n` items.
    fn long_list(core: &mut Core, n: usize) -> Result<(NodeId, Vec<NodeId>)> {
        let list = core.create_list(Options::new())?;
        let mut ids = Vec::with_capacity(n);
        core.batch(list, |core| {
            for i in 0..n {
                let id = core.create_component(Options::new().id(format!("item-{i}")))?;
                core.list(list)?.add(id, None)?;
                ids.push(id);
            }
            Ok(())
        })?;
        Ok((list, ids))
    }

    fn rendered_count(core: &Core, list: NodeId) -> usize {
        core.content_element(list)
            .map_or(0, |el| core.dom().children(el).len())
    }

    fn parts(core: &mut Core, list: NodeId, cancel_after: Option<usize>) -> Result<Rc<Cell<usize>>> {
        let n = Rc::new(Cell::new(0));
        let c = n.clone();
        core.listen(list, EventType::PartRendered, move |_| {
            c.set(c.get() + 1);
            match cancel_after {
                Some(limit) if c.get() >= limit => Outcome::Cancel,
                _ => Outcome::Proceed,
            }
        })?;
        Ok(n)
    }

    #[test]
    fn renders_in_batches() -> Result<()> {
        logging::init_test();
        let mut core = Core::new();
        let (list, ids) = long_list(&mut core, 120)?;
        let parts = parts(&mut core, list, None)?;

        core.render(list, None)?;
        assert_eq!((rendered_count(&core, list), parts.get()), (BATCH_SIZE, 1));
        assert_eq!(core.pending_tasks(), 1);

        assert!(core.run_next()?);
        assert_eq!((rendered_count(&core, list), parts.get()), (100, 2));
        assert!(core.run_next()?);
        assert_eq!((rendered_count(&core, list), parts.get()), (120, 3));
        assert!(!core.run_next()?);

        assert!(ids.iter().all(|id| core.node(*id).is_some_and(|n| n.in_document())));
        let content = core.content_element(list);
        let first = core.node(ids[0]).and_then(|n| n.element());
        assert_eq!(content.and_then(|el| core.dom().children(el).first().copied()), first);
        Ok(())
    }

    #[test]
    fn cancel_stops_after_the_first_batch() -> Result<()> {
        let mut core = Core::new();
        let (list, ids) = long_list(&mut core, 120)?;
        let parts = parts(&mut core, list, Some(1))?;

        core.render(list, None)?;
        assert_eq!(core.run_pending()?, 0);
        assert_eq!(parts.get(), 1);
        assert_eq!(rendered_count(&core, list), 50);
        assert!(core.node(list).is_some_and(|n| n.in_document()));
        assert!(core.node(ids[49]).is_some_and(|n| n.in_document()));
        assert!(core.node(ids[50]).is_some_and(|n| n.element().is_none()));
        Ok(())
    }

    #[test]
    fn detach_abandons_pending_batches() -> Result<()> {
        let mut core = Core::new();
        let (list, ids) = long_list(&mut core, 120)?;
        core.render(list, None)?;
        assert_eq!(core.pending_tasks(), 1);

        core.detach(list)?;
        assert_eq!(core.pending_tasks(), 0);
        assert_eq!(rendered_count(&core, list), 0);
        assert!(ids.iter().all(|id| core.node(*id).is_some_and(|n| !n.in_document())));

        core.attach(list)?;
        assert_eq!(rendered_count(&core, list), 50);
        assert_eq!(core.run_pending()?, 2);
        assert_eq!(rendered_count(&core, list), 120);
        Ok(())
    }

    #[test]
    fn mutation_mid_render_relinks_everything() -> Result<()> {
        let mut core = Core::new();
        let (list, _) = long_list(&mut core, 120)?;
        core.render(list, None)?;
        assert_eq!(rendered_count(&core, list), 50);

        let extra = core.create_component(Options::new().id("extra"))?;
        core.list(list)?.add(extra, Some(0))?;
        assert_eq!(rendered_count(&core, list), 121);

        let parts = parts(&mut core, list, None)?;
        assert_eq!(core.run_pending()?, 2);
        assert_eq!(parts.get(), 2);
        assert_eq!(rendered_count(&core, list), 121);

        let content = core.content_element(list);
        let first = content.and_then(|el| core.dom().children(el).first().copied());
        assert_eq!(first, core.node(extra).and_then(|n| n.element()));
        Ok(())
    }

    #[test]
    fn empty_lists_announce_nothing() -> Result<()> {
        let mut core = Core::new();
        let list = core.create_list(Options::new())?;
        let parts = parts(&mut core, list, None)?;
        core.render(list, None)?;
        assert_eq!(parts.get(), 0);
        assert_eq!(core.pending_tasks(), 0);
        Ok(())
    }

    #[test]
    fn disposal_drops_queued_batches() -> Result<()> {
        let mut core = Core::new();
        let (list, _) = long_list(&mut core, 60)?;
        core.render(list, None)?;
        assert_eq!(core.pending_tasks(), 1);
        core.dispose(list)?;
        assert_eq!(core.pending_tasks(), 0);
        assert!(core.is_empty());
        Ok(())
    }
}
