//! Property-based test generators for the ordered message tree.
//!
//! Generates random operation scripts, applies the ones whose
//! preconditions hold, and checks the tree against a `BTreeSet` model.

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::message_id::MessageId;
use crate::ordered::OrderedMessages;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Shared proptest configuration: 1 000 cases, generous shrink budget.
#[must_use]
pub fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 1000,
        max_shrink_iters: 5000,
        ..ProptestConfig::default()
    }
}

// ─── Operations ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Op {
    Insert {
        server_id: i32,
        have_previous: bool,
        have_next: bool,
        auto: bool,
    },
    Erase {
        server_id: i32,
        only_from_memory: bool,
    },
    AttachPrevious(i32),
    AttachNext(i32),
    AutoAttach {
        server_id: i32,
        last: i32,
    },
}

/// Small id space so that operations collide often.
fn arb_server_id() -> impl Strategy<Value = i32> {
    1..64_i32
}

pub fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (arb_server_id(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(server_id, have_previous, have_next, auto)| Op::Insert {
                server_id,
                have_previous,
                have_next,
                auto,
            }
        ),
        2 => (arb_server_id(), any::<bool>()).prop_map(|(server_id, only_from_memory)| {
            Op::Erase {
                server_id,
                only_from_memory,
            }
        }),
        1 => arb_server_id().prop_map(Op::AttachPrevious),
        1 => arb_server_id().prop_map(Op::AttachNext),
        1 => (arb_server_id(), 0..64_i32)
            .prop_map(|(server_id, last)| Op::AutoAttach { server_id, last }),
    ]
}

pub fn arb_script() -> impl Strategy<Value = (u64, Vec<Op>)> {
    (any::<u64>(), prop::collection::vec(arb_op(), 0..200))
}

/// Apply `ops`, skipping any whose preconditions do not hold.
pub fn apply(seed: u64, ops: &[Op]) -> (OrderedMessages, BTreeSet<MessageId>) {
    let mut messages = OrderedMessages::with_seed(seed);
    let mut model = BTreeSet::new();
    for op in ops {
        match *op {
            Op::Insert {
                server_id,
                have_previous,
                have_next,
                auto,
            } => {
                let id = MessageId::from_server(server_id);
                if model.insert(id) {
                    messages.insert(id, auto, have_previous, have_next);
                }
            }
            Op::Erase {
                server_id,
                only_from_memory,
            } => {
                let id = MessageId::from_server(server_id);
                if model.remove(&id) {
                    messages.erase(id, only_from_memory);
                }
            }
            Op::AttachPrevious(server_id) => {
                let id = MessageId::from_server(server_id);
                if model.contains(&id) && model.range(..id).next_back().is_some() {
                    messages.attach_message_to_previous(id, "model");
                }
            }
            Op::AttachNext(server_id) => {
                let id = MessageId::from_server(server_id);
                if model.contains(&id) && model.range(id..).nth(1).is_some() {
                    messages.attach_message_to_next(id, "model");
                }
            }
            Op::AutoAttach { server_id, last } => {
                let id = MessageId::from_server(server_id);
                if !model.contains(&id) {
                    let last = MessageId::from_server(last);
                    let _ = messages.auto_attach_message(id, last, "model");
                }
            }
        }
    }
    (messages, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordered::OrderedMessage;

    proptest! {
        #![proptest_config(proptest_config())]

        #[test]
        fn iteration_matches_model((seed, ops) in arb_script()) {
            let (messages, model) = apply(seed, &ops);
            let order: Vec<MessageId> = messages.iter().map(OrderedMessage::message_id).collect();
            let expected: Vec<MessageId> = model.iter().copied().collect();
            prop_assert_eq!(order, expected);
            prop_assert_eq!(messages.len(), model.len());
            prop_assert!(messages.is_heap_ordered());
        }

        #[test]
        fn find_older_is_a_contiguous_run((seed, ops) in arb_script(), max in 0..70_i32) {
            let (messages, model) = apply(seed, &ops);
            let older = messages.find_older_messages(MessageId::from_server(max));

            // The run is a suffix of the known ids at or below `max`, newest first.
            let below: Vec<MessageId> = model
                .range(..=MessageId::from_server(max))
                .rev()
                .copied()
                .take(older.len())
                .collect();
            prop_assert_eq!(&older, &below);

            for id in older.iter().take(older.len().saturating_sub(1)) {
                let message = messages.get(*id).map(|message| message.have_previous);
                prop_assert_eq!(message, Some(true));
            }
        }

        #[test]
        fn find_newer_is_a_contiguous_run((seed, ops) in arb_script(), min in 0..70_i32) {
            let (messages, model) = apply(seed, &ops);
            let newer = messages.find_newer_messages(MessageId::from_server(min));
            let above: Vec<MessageId> = model
                .range(MessageId::from_server(min)..)
                .copied()
                .take(newer.len())
                .collect();
            prop_assert_eq!(&newer, &above);

            for id in newer.iter().take(newer.len().saturating_sub(1)) {
                let message = messages.get(*id).map(|message| message.have_next);
                prop_assert_eq!(message, Some(true));
            }
        }

        #[test]
        fn date_lookup_matches_scan((seed, ops) in arb_script(), date in -1..70_i32) {
            let (messages, model) = apply(seed, &ops);
            let date_of = |id: MessageId| i32::try_from(id.server_id()).unwrap_or(i32::MAX);
            let expected = model.iter().copied().rev().find(|id| date_of(*id) <= date);
            prop_assert_eq!(messages.find_message_by_date(date, date_of), expected);

            let in_range: Vec<MessageId> = model
                .iter()
                .copied()
                .filter(|id| (date - 5..=date).contains(&date_of(*id)))
                .collect();
            prop_assert_eq!(messages.find_messages_by_date(date - 5, date, date_of), in_range);
        }

        #[test]
        fn height_stays_logarithmic(seed in any::<u64>(), n in 1..512_i32) {
            let mut messages = OrderedMessages::with_seed(seed);
            for server_id in 1..=n {
                messages.insert(MessageId::from_server(server_id), true, server_id > 1, false);
            }
            prop_assert!(messages.height() <= 64, "height {} for {} messages", messages.height(), n);
        }
    }
}
