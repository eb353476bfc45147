#![allow(missing_docs)]

use graphweave::codec::{encode_range, Range};
use graphweave::decode::{locate, slice_window, Located};
use graphweave::{decode_key, encode_key, Node};
use proptest::prelude::*;
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Slot {
    Data,
    Gap,
    Missing,
}

fn arb_slot() -> impl Strategy<Value = Slot> {
    prop_oneof![Just(Slot::Data), Just(Slot::Gap), Just(Slot::Missing)]
}

fn build(slots: &[Slot]) -> Vec<Node> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| {
            let key = encode_key(&json!([i])).unwrap();
            match slot {
                Slot::Data => Some(Node::leaf(key, json!(i))),
                Slot::Gap => Some(Node::range(key.clone(), key)),
                Slot::Missing => None,
            }
        })
        .collect()
}

fn data_count(nodes: &[Node]) -> usize {
    nodes.iter().filter(|node| !node.is_range()).count()
}

proptest! {
    #[test]
    fn prop_cursor_order_matches_value_order(
        a in -1_000_000i64..1_000_000,
        s in "[a-z]{0,6}",
        b in -1_000_000i64..1_000_000,
        t in "[a-z]{0,6}",
    ) {
        let left = encode_key(&json!([a, s])).unwrap();
        let right = encode_key(&json!([b, t])).unwrap();
        prop_assert_eq!(left.cmp(&right), (a, &s).cmp(&(b, &t)));
        prop_assert_eq!(decode_key(&left).unwrap(), json!([a, s]));
    }

    #[test]
    fn prop_locate_tells_gaps_from_unknowns(slots in prop::collection::vec(arb_slot(), 0..24)) {
        let nodes = build(&slots);
        for (i, slot) in slots.iter().enumerate() {
            let key = encode_key(&json!([i])).unwrap();
            let found = locate(&nodes, &key);
            match slot {
                Slot::Data => prop_assert!(matches!(found, Located::Found(node) if node.key == key)),
                Slot::Gap => prop_assert_eq!(found, Located::Absent),
                Slot::Missing => prop_assert_eq!(found, Located::Unknown),
            }
            let between = encode_key(&json!([i as f64 + 0.5])).unwrap();
            prop_assert_eq!(locate(&nodes, &between), Located::Unknown);
        }
    }

    #[test]
    fn prop_slices_never_exceed_the_page_size(
        slots in prop::collection::vec(arb_slot(), 0..24),
        count in 0usize..30,
        backward in any::<bool>(),
    ) {
        let nodes = build(&slots);
        let range = Range {
            first: (!backward).then_some(count),
            last: backward.then_some(count),
            ..Range::default()
        };
        let window = slice_window(&nodes, &encode_range(&range).unwrap());
        prop_assert_eq!(data_count(window), count.min(data_count(&nodes)));
    }
}
