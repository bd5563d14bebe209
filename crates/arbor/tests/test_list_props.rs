//! Property tests for list ordering.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use arbor::{Core, NodeId, Options, Target};
    use proptest::{prelude::*, test_runner::TestCaseError};

    const POOL: usize = 8;

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, Option<usize>),
        Remove(usize),
        RemoveAt(usize),
        Move(usize, usize),
        Sort,
        Reset,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..POOL, prop::option::of(0usize..10)).prop_map(|(k, i)| Op::Add(k, i)),
            1 => (0..POOL).prop_map(Op::Remove),
            1 => (0usize..10).prop_map(Op::RemoveAt),
            1 => (0usize..10, 0usize..10).prop_map(|(a, b)| Op::Move(a, b)),
            1 => Just(Op::Sort),
            1 => Just(Op::Reset),
        ]
    }

    struct Fixture {
        core: Core,
        list: NodeId,
        pool: Vec<NodeId>,
    }

    /// Presentation order and insertion order, as pool indices.
    type Model = (Vec<usize>, Vec<usize>);

    fn fixture(attached: bool) -> Fixture {
        let mut core = Core::new();
        let list = core.create_list(Options::new()).expect("create list");
        if attached {
            core.render(list, None).expect("render list");
        }
        let pool = (0..POOL)
            .map(|i| {
                core.create_component(Options::new().id(format!("k{i}")))
                    .expect("create item")
            })
            .collect();
        Fixture { core, list, pool }
    }

    fn apply(f: &mut Fixture, model: &mut Model, op: &Op) {
        let (order, default) = model;
        let mut l = f.core.list(f.list).expect("list");
        match *op {
            Op::Add(k, index) => {
                let res = l.add(f.pool[k], index);
                if order.contains(&k) {
                    assert!(res.is_err());
                } else {
                    res.expect("add");
                    let at = index.map_or(order.len(), |i| i.min(order.len()));
                    order.insert(at, k);
                    default.insert(at.min(default.len()), k);
                }
            }
            Op::Remove(k) => {
                let res = l.remove(f.pool[k], false).expect("remove");
                assert_eq!(res.is_some(), order.contains(&k));
                order.retain(|x| *x != k);
                default.retain(|x| *x != k);
            }
            Op::RemoveAt(i) => {
                let res = l.remove(Target::Index(i), false);
                if i < order.len() {
                    let k = order.remove(i);
                    default.retain(|x| *x != k);
                    assert_eq!(res.expect("remove at"), Some(f.pool[k]));
                } else {
                    assert!(res.is_err());
                }
            }
            Op::Move(from, to) => {
                let moved = l.move_item(Target::Index(from), to).expect("move");
                let valid = from < order.len() && to < order.len() && from != to;
                assert_eq!(moved, valid);
                if valid {
                    let k = order.remove(from);
                    order.insert(to, k);
                }
            }
            Op::Sort => {
                l.sort_by(|a, b| b.id().cmp(a.id())).expect("sort");
                order.sort_by(|a, b| b.cmp(a));
            }
            Op::Reset => {
                l.sort_reset().expect("reset");
                order.clone_from(default);
            }
        }
    }

    fn check(f: &Fixture, model: &Model, attached: bool) -> Result<(), TestCaseError> {
        let c = f.core.collection(f.list).expect("collection");
        let expected: Vec<NodeId> = model.0.iter().map(|k| f.pool[*k]).collect();
        let default: Vec<NodeId> = model.1.iter().map(|k| f.pool[*k]).collect();
        prop_assert_eq!(c.order(), expected.as_slice());
        prop_assert_eq!(c.default_order(), default.as_slice());

        let unique: HashSet<&NodeId> = c.order().iter().collect();
        prop_assert_eq!(unique.len(), c.len());
        let mut children = f.core.children(f.list).to_vec();
        let mut sorted = expected.clone();
        children.sort();
        sorted.sort();
        prop_assert_eq!(children, sorted);
        prop_assert!(c.pending_removals().is_empty());
        prop_assert!(!c.is_dirty());

        let dom_order = f
            .core
            .content_element(f.list)
            .map(|el| f.core.dom().children(el))
            .unwrap_or_default();
        let expected_els: Vec<_> = if attached {
            expected
                .iter()
                .filter_map(|id| f.core.node(*id).and_then(|n| n.element()))
                .collect()
        } else {
            Vec::new()
        };
        if attached {
            prop_assert_eq!(expected_els.len(), expected.len());
        }
        prop_assert_eq!(dom_order, expected_els);

        for (k, id) in f.pool.iter().enumerate() {
            let live = f.core.node(*id).is_some_and(|n| n.in_document());
            prop_assert_eq!(live, attached && model.0.contains(&k));
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn order_tracks_the_model(
            ops in prop::collection::vec(op_strategy(), 0..40),
            attached in any::<bool>(),
        ) {
            let mut f = fixture(attached);
            let mut model = Model::default();
            for op in &ops {
                apply(&mut f, &mut model, op);
                check(&f, &model, attached)?;
            }
        }

        #[test]
        fn locking_only_changes_timing(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut plain = fixture(true);
            let mut locked = fixture(true);
            let (mut m1, mut m2) = (Model::default(), Model::default());
            for op in &ops {
                apply(&mut plain, &mut m1, op);
            }
            locked.core.begin_update(locked.list).expect("lock");
            for op in &ops {
                apply(&mut locked, &mut m2, op);
            }
            locked.core.end_update(locked.list, true).expect("unlock");

            let keys = |f: &mut Fixture| f.core.list(f.list).expect("list").keys();
            prop_assert_eq!(keys(&mut plain), keys(&mut locked));
            check(&locked, &m2, true)?;
        }
    }
}
