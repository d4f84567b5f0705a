use std::cell::RefCell;
use std::rc::Rc;

use ikarhu::{codec, ChangeTree, Field, Observed, Relay, Shape, TaskQueue};
use proptest::prelude::*;
use serde_json::{json, Value};

const KEYS: [&str; 3] = ["a", "b", "c"];
const ROOT_KEYS: [&str; 3] = ["a", "nested", "list"];

#[derive(Debug, Clone)]
enum Op {
    Set(usize, i64),
    Delete(usize),
    Nested(usize, i64),
    Push(i64),
    Remove(usize),
    Replace(usize, i64),
    Restructure(usize, u8, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEYS.len(), -2i64..3).prop_map(|(k, v)| Op::Set(k, v)),
        (0..KEYS.len()).prop_map(Op::Delete),
        (0..KEYS.len(), -2i64..3).prop_map(|(k, v)| Op::Nested(k, v)),
        (-2i64..3).prop_map(Op::Push),
        (0usize..8).prop_map(Op::Remove),
        (0usize..8, -2i64..3).prop_map(|(i, v)| Op::Replace(i, v)),
        (0..ROOT_KEYS.len(), 0u8..3, -2i64..3).prop_map(|(k, form, v)| Op::Restructure(k, form, v)),
    ]
}

/// A fresh structure for a root key: a mapping sharing a key with the seed,
/// a mapping that does not, or a sequence.
fn structure(form: u8, v: i64) -> Value {
    match form {
        0 => json!({"a": v}),
        1 => json!({"v": v, "w": {"x": v}}),
        _ => json!([v, v + 1]),
    }
}

fn seed() -> Value {
    json!({"a": 0, "list": [0, 1, 2], "nested": {"a": 0}})
}

fn apply(root: &Observed, op: &Op) {
    let view = |key: &str, shape: Shape| {
        root.get(key)
            .and_then(Field::into_view)
            .filter(|v: &Relay| v.shape() == shape)
    };
    match *op {
        Op::Set(k, v) => {
            root.set(KEYS[k], v).unwrap();
        }
        Op::Delete(k) => {
            root.delete(KEYS[k]).unwrap();
        }
        Op::Nested(k, v) => {
            if let Some(nested) = view("nested", Shape::Mapping) {
                nested.set(KEYS[k], v).unwrap();
            }
        }
        Op::Push(v) => {
            if let Some(list) = view("list", Shape::Sequence) {
                list.push(v).unwrap();
            }
        }
        Op::Remove(i) => {
            if let Some(list) = view("list", Shape::Sequence).filter(|l| !l.is_empty()) {
                list.delete(&(i % list.len()).to_string()).unwrap();
            }
        }
        Op::Replace(i, v) => {
            if let Some(list) = view("list", Shape::Sequence).filter(|l| !l.is_empty()) {
                list.set(&(i % list.len()).to_string(), v).unwrap();
            }
        }
        Op::Restructure(k, form, v) => {
            root.set(ROOT_KEYS[k], structure(form, v)).unwrap();
        }
    }
}

fn recorded(root: &Observed) -> Rc<RefCell<Vec<ChangeTree>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    root.listen(move |changes, _| sink.borrow_mut().push(changes.clone()));
    log
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn one_tick_is_one_notification_that_replays(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let queue = TaskQueue::new();
        let source = Observed::with_scheduler(seed(), Rc::new(queue.clone())).unwrap();
        let mirror = Observed::with_scheduler(seed(), Rc::new(TaskQueue::new())).unwrap();
        let log = recorded(&source);

        for op in &ops {
            apply(&source, op);
        }
        prop_assert!(queue.len() <= 1);
        queue.run_pending();

        prop_assert!(log.borrow().len() <= 1);
        if let Some(batch) = log.borrow().first() {
            prop_assert!(!batch.is_empty());
            mirror.patch(batch.clone()).unwrap();
        }
        prop_assert_eq!(mirror.to_json(), source.to_json());
    }

    #[test]
    fn batched_and_per_op_delivery_agree(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let queue = TaskQueue::new();
        let source = Observed::with_scheduler(seed(), Rc::new(queue.clone())).unwrap();
        let log = recorded(&source);

        for op in &ops {
            apply(&source, op);
            queue.run_pending();
        }

        let mirror = Observed::with_scheduler(seed(), Rc::new(TaskQueue::new())).unwrap();
        for batch in log.borrow().iter() {
            mirror.patch(batch.clone()).unwrap();
        }
        prop_assert_eq!(mirror.to_json(), source.to_json());
    }

    #[test]
    fn json_form_of_a_batch_replays_too(ops in prop::collection::vec(op_strategy(), 1..16)) {
        let queue = TaskQueue::new();
        let source = Observed::with_scheduler(seed(), Rc::new(queue.clone())).unwrap();
        let log = recorded(&source);
        for op in &ops {
            apply(&source, op);
        }
        queue.run_pending();

        let mirror = Observed::with_scheduler(seed(), Rc::new(TaskQueue::new())).unwrap();
        if let Some(batch) = log.borrow().first() {
            let decoded = codec::from_json(&codec::to_json(batch)).unwrap();
            mirror.patch(decoded).unwrap();
        }
        prop_assert_eq!(mirror.to_json(), source.to_json());
    }
}
