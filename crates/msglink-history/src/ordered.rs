//! Treap of known messages with gap-aware adjacency flags.
//!
//! Each node records whether its in-order neighbors are known to be the
//! messages directly before and after it. Queries and the [`Cursor`]
//! stop at the first position where that knowledge is missing.
//!
//! Contract violations (invalid or scheduled ids, duplicate inserts,
//! attaching without a neighbor) panic: callers own the tree exclusively
//! and are expected to uphold them.

use std::cmp::Ordering;

use msglink_core::Config;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::message_id::MessageId;

type Link = Option<Box<OrderedMessage>>;

/// One known message.
#[derive(Debug)]
pub struct OrderedMessage {
    message_id: MessageId,
    /// The in-order predecessor is the message directly before this one.
    pub have_previous: bool,
    /// The in-order successor is the message directly after this one.
    pub have_next: bool,
    priority: u64,
    left: Link,
    right: Link,
}

impl OrderedMessage {
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }
}

/// Result of [`OrderedMessages::auto_attach_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachInfo {
    pub have_previous: bool,
    pub have_next: bool,
}

/// Known messages of one chat, ordered by id.
#[derive(Debug)]
pub struct OrderedMessages {
    root: Link,
    len: usize,
    rng: StdRng,
}

impl Default for OrderedMessages {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Treap primitives
// ──────────────────────────────────────────────────────────────────────────────

/// Split `tree` into ids below `id` and ids at or above it.
fn split(tree: Link, id: MessageId) -> (Link, Link) {
    match tree {
        None => (None, None),
        Some(mut node) => {
            if node.message_id < id {
                let (left, right) = split(node.right.take(), id);
                node.right = left;
                (Some(node), right)
            } else {
                let (left, right) = split(node.left.take(), id);
                node.left = right;
                (left, Some(node))
            }
        }
    }
}

/// Join two treaps where every id in `left` is below every id in `right`.
fn merge(left: Link, right: Link) -> Link {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(mut left), Some(mut right)) => {
            if right.priority > left.priority {
                right.left = merge(Some(left), right.left.take());
                Some(right)
            } else {
                left.right = merge(left.right.take(), Some(right));
                Some(left)
            }
        }
    }
}

fn insert_node(slot: &mut Link, mut node: Box<OrderedMessage>) {
    if let Some(cur) = slot
        .as_mut()
        .filter(|cur| cur.priority >= node.priority)
    {
        if cur.message_id < node.message_id {
            insert_node(&mut cur.right, node);
        } else {
            insert_node(&mut cur.left, node);
        }
        return;
    }
    let (left, right) = split(slot.take(), node.message_id);
    node.left = left;
    node.right = right;
    *slot = Some(node);
}

fn remove_node(slot: &mut Link, id: MessageId) -> Link {
    let cur = slot.as_mut()?;
    match cur.message_id.cmp(&id) {
        Ordering::Less => remove_node(&mut cur.right, id),
        Ordering::Greater => remove_node(&mut cur.left, id),
        Ordering::Equal => {
            let mut node = slot.take()?;
            *slot = merge(node.left.take(), node.right.take());
            Some(node)
        }
    }
}

fn height(node: Option<&OrderedMessage>) -> usize {
    node.map_or(0, |node| {
        1 + height(node.left.as_deref()).max(height(node.right.as_deref()))
    })
}

impl OrderedMessages {
    /// Empty tree with priorities drawn from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            len: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Empty tree whose shape is reproducible for a given insert sequence.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            root: None,
            len: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        config.history_seed.map_or_else(Self::new, Self::with_seed)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn height(&self) -> usize {
        height(self.root.as_deref())
    }

    #[cfg(test)]
    pub(crate) fn is_heap_ordered(&self) -> bool {
        fn check(node: &OrderedMessage) -> bool {
            [node.left.as_deref(), node.right.as_deref()]
                .into_iter()
                .flatten()
                .all(|child| child.priority <= node.priority && check(child))
        }
        self.root.as_deref().is_none_or(check)
    }

    #[must_use]
    pub fn get(&self, message_id: MessageId) -> Option<&OrderedMessage> {
        let mut node = self.root.as_deref();
        while let Some(cur) = node {
            node = match cur.message_id.cmp(&message_id) {
                Ordering::Less => cur.right.as_deref(),
                Ordering::Greater => cur.left.as_deref(),
                Ordering::Equal => return Some(cur),
            };
        }
        None
    }

    #[must_use]
    pub fn contains(&self, message_id: MessageId) -> bool {
        self.get(message_id).is_some()
    }

    fn get_mut(&mut self, message_id: MessageId) -> Option<&mut OrderedMessage> {
        let mut node = self.root.as_deref_mut();
        while let Some(cur) = node {
            node = match cur.message_id.cmp(&message_id) {
                Ordering::Less => cur.right.as_deref_mut(),
                Ordering::Greater => cur.left.as_deref_mut(),
                Ordering::Equal => return Some(cur),
            };
        }
        None
    }

    /// Greatest id strictly below `message_id`.
    fn previous_id(&self, message_id: MessageId) -> Option<MessageId> {
        let mut node = self.root.as_deref();
        let mut best = None;
        while let Some(cur) = node {
            if cur.message_id < message_id {
                best = Some(cur.message_id);
                node = cur.right.as_deref();
            } else {
                node = cur.left.as_deref();
            }
        }
        best
    }

    /// Smallest id strictly above `message_id`.
    fn next_id(&self, message_id: MessageId) -> Option<MessageId> {
        let mut node = self.root.as_deref();
        let mut best = None;
        while let Some(cur) = node {
            if cur.message_id > message_id {
                best = Some(cur.message_id);
                node = cur.left.as_deref();
            } else {
                node = cur.right.as_deref();
            }
        }
        best
    }

    fn previous_mut(&mut self, message_id: MessageId) -> Option<&mut OrderedMessage> {
        let id = self.previous_id(message_id)?;
        self.get_mut(id)
    }

    fn next_mut(&mut self, message_id: MessageId) -> Option<&mut OrderedMessage> {
        let id = self.next_id(message_id)?;
        self.get_mut(id)
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Mutation
    // ──────────────────────────────────────────────────────────────────────────

    /// Add `message_id` with the given adjacency flags.
    ///
    /// A message that lands inside a known contiguous run joins it. When
    /// `was_auto_attached`, the new message's flags are also pushed onto
    /// its neighbors.
    ///
    /// # Panics
    ///
    /// If the id is invalid, scheduled, or already present.
    pub fn insert(
        &mut self,
        message_id: MessageId,
        was_auto_attached: bool,
        mut have_previous: bool,
        mut have_next: bool,
    ) {
        assert!(
            message_id.is_valid(),
            "inserting invalid message {message_id}"
        );
        assert!(
            !self.contains(message_id),
            "message {message_id} is already known"
        );

        if !have_previous && self.previous_mut(message_id).is_some_and(|prev| prev.have_next) {
            tracing::warn!(%message_id, "message inserted after a message that has next");
            have_previous = true;
        }
        if !have_next && self.next_mut(message_id).is_some_and(|next| next.have_previous) {
            tracing::warn!(%message_id, "message inserted before a message that has previous");
            have_next = true;
        }
        if was_auto_attached {
            if have_previous {
                if let Some(prev) = self.previous_mut(message_id) {
                    prev.have_next = true;
                }
            }
            if have_next {
                if let Some(next) = self.next_mut(message_id) {
                    next.have_previous = true;
                }
            }
        }

        let node = Box::new(OrderedMessage {
            message_id,
            have_previous,
            have_next,
            priority: self.rng.r#gen(),
            left: None,
            right: None,
        });
        insert_node(&mut self.root, node);
        self.len += 1;
        tracing::debug!(
            %message_id,
            have_previous,
            have_next,
            was_auto_attached,
            "inserted ordered message"
        );
    }

    /// Remove `message_id`.
    ///
    /// An eviction from memory (`only_from_memory`) leaves a gap on both
    /// sides. A true deletion keeps the neighbors adjacent only if the
    /// deleted message was adjacent to both of them.
    ///
    /// # Panics
    ///
    /// If the id is not present.
    pub fn erase(&mut self, message_id: MessageId, only_from_memory: bool) {
        let removed = remove_node(&mut self.root, message_id);
        let Some(removed) = removed else {
            panic!("erasing unknown message {message_id}");
        };
        self.len -= 1;

        let connected = !only_from_memory && removed.have_previous && removed.have_next;
        if let Some(prev) = self.previous_mut(message_id) {
            prev.have_next = connected;
        }
        if let Some(next) = self.next_mut(message_id) {
            next.have_previous = connected;
        }
        tracing::debug!(%message_id, only_from_memory, connected, "erased ordered message");
    }

    /// Decide whether a new message continues the run ending at its
    /// predecessor.
    ///
    /// The predecessor is extended when it already has a successor link
    /// or when it is at or after `last_message_id`, the newest message the
    /// chat is known to have. `source` names the caller in log events.
    ///
    /// # Panics
    ///
    /// If the id is already present.
    pub fn auto_attach_message(
        &mut self,
        message_id: MessageId,
        last_message_id: MessageId,
        source: &str,
    ) -> AttachInfo {
        assert!(
            !self.contains(message_id),
            "auto-attaching known message {message_id}"
        );
        let has_successor = self.next_id(message_id).is_some();
        let Some(prev) = self.previous_mut(message_id) else {
            tracing::debug!(%message_id, source, "no previous message to attach to");
            return AttachInfo::default();
        };

        if prev.have_next || (last_message_id.is_valid() && prev.message_id >= last_message_id) {
            let have_next = prev.have_next;
            if have_next && !has_successor {
                tracing::warn!(
                    %message_id,
                    previous = %prev.message_id,
                    source,
                    "previous message has next but no next message is known"
                );
            }
            tracing::debug!(
                %message_id,
                previous = %prev.message_id,
                source,
                "auto-attach to previous"
            );
            prev.have_next = true;
            return AttachInfo {
                have_previous: true,
                have_next,
            };
        }
        tracing::debug!(%message_id, previous = %prev.message_id, source, "do not auto-attach");
        AttachInfo::default()
    }

    /// Mark `message_id` as directly following its predecessor.
    ///
    /// # Panics
    ///
    /// If the id is not present or has no predecessor.
    pub fn attach_message_to_previous(&mut self, message_id: MessageId, source: &str) {
        let Some(node) = self.get_mut(message_id) else {
            panic!("attaching unknown message {message_id}");
        };
        if node.have_previous {
            return;
        }
        node.have_previous = true;

        let Some(prev) = self.previous_mut(message_id) else {
            panic!("message {message_id} has no previous message");
        };
        tracing::debug!(%message_id, previous = %prev.message_id, source, "attach to previous");
        if prev.have_next {
            if let Some(node) = self.get_mut(message_id) {
                node.have_next = true;
            }
        } else {
            prev.have_next = true;
        }
    }

    /// Mark `message_id` as directly preceding its successor.
    ///
    /// # Panics
    ///
    /// If the id is not present or has no successor.
    pub fn attach_message_to_next(&mut self, message_id: MessageId, source: &str) {
        let Some(node) = self.get_mut(message_id) else {
            panic!("attaching unknown message {message_id}");
        };
        if node.have_next {
            return;
        }
        node.have_next = true;

        let Some(next) = self.next_mut(message_id) else {
            panic!("message {message_id} has no next message");
        };
        tracing::debug!(%message_id, next = %next.message_id, source, "attach to next");
        if next.have_previous {
            if let Some(node) = self.get_mut(message_id) {
                node.have_previous = true;
            }
        } else {
            next.have_previous = true;
        }
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────────────────────────────────────

    /// Cursor at the greatest id at or below `message_id`.
    #[must_use]
    pub fn cursor(&self, message_id: MessageId) -> Cursor<'_> {
        let mut stack = Vec::new();
        let mut keep = 0;
        let mut node = self.root.as_deref();
        while let Some(cur) = node {
            stack.push(cur);
            if cur.message_id <= message_id {
                keep = stack.len();
                node = cur.right.as_deref();
            } else {
                node = cur.left.as_deref();
            }
        }
        stack.truncate(keep);
        Cursor { stack }
    }

    /// Cursor at the smallest id at or above `message_id`.
    #[must_use]
    pub fn cursor_at_or_after(&self, message_id: MessageId) -> Cursor<'_> {
        let mut stack = Vec::new();
        let mut keep = 0;
        let mut node = self.root.as_deref();
        while let Some(cur) = node {
            stack.push(cur);
            if cur.message_id >= message_id {
                keep = stack.len();
                node = cur.left.as_deref();
            } else {
                node = cur.right.as_deref();
            }
        }
        stack.truncate(keep);
        Cursor { stack }
    }

    /// The contiguous run ending at or below `max_message_id`, newest first.
    #[must_use]
    pub fn find_older_messages(&self, max_message_id: MessageId) -> Vec<MessageId> {
        let mut result = Vec::new();
        let mut cursor = self.cursor(max_message_id);
        while let Some(message) = cursor.get() {
            result.push(message.message_id);
            cursor.move_prev();
        }
        result
    }

    /// The contiguous run starting at or above `min_message_id`, oldest first.
    #[must_use]
    pub fn find_newer_messages(&self, min_message_id: MessageId) -> Vec<MessageId> {
        let mut result = Vec::new();
        let mut cursor = self.cursor_at_or_after(min_message_id);
        while let Some(message) = cursor.get() {
            result.push(message.message_id);
            cursor.move_next();
        }
        result
    }

    /// Greatest id whose date is at or before `date`.
    ///
    /// `date_of` must be non-decreasing in the id. It is called once per
    /// visited level.
    pub fn find_message_by_date(
        &self,
        date: i32,
        mut date_of: impl FnMut(MessageId) -> i32,
    ) -> Option<MessageId> {
        let mut node = self.root.as_deref();
        let mut best = None;
        while let Some(cur) = node {
            if date_of(cur.message_id) > date {
                node = cur.left.as_deref();
            } else {
                best = Some(cur.message_id);
                node = cur.right.as_deref();
            }
        }
        best
    }

    /// All ids dated within `min_date..=max_date`, oldest first.
    pub fn find_messages_by_date(
        &self,
        min_date: i32,
        max_date: i32,
        mut date_of: impl FnMut(MessageId) -> i32,
    ) -> Vec<MessageId> {
        let mut result = Vec::new();
        let mut stack: Vec<(&OrderedMessage, i32)> = Vec::new();
        let mut node = self.root.as_deref();
        loop {
            while let Some(cur) = node {
                let date = date_of(cur.message_id);
                if date >= min_date {
                    stack.push((cur, date));
                    node = cur.left.as_deref();
                } else if date <= max_date {
                    node = cur.right.as_deref();
                } else {
                    node = None;
                }
            }
            let Some((cur, date)) = stack.pop() else {
                break;
            };
            if date > max_date {
                continue;
            }
            result.push(cur.message_id);
            node = cur.right.as_deref();
        }
        result
    }

    /// Pruned descent from the root: `need_scan_older` decides whether to
    /// enter the older subtree of a node, `need_scan_newer` the newer one.
    pub fn traverse_messages(
        &self,
        mut need_scan_older: impl FnMut(MessageId) -> bool,
        mut need_scan_newer: impl FnMut(MessageId) -> bool,
    ) {
        let mut pending: Vec<&OrderedMessage> = self.root.as_deref().into_iter().collect();
        while let Some(node) = pending.pop() {
            if need_scan_newer(node.message_id) {
                pending.extend(node.right.as_deref());
            }
            if need_scan_older(node.message_id) {
                pending.extend(node.left.as_deref());
            }
        }
    }

    /// All known messages in id order, gaps included.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }
}

impl<'a> IntoIterator for &'a OrderedMessages {
    type Item = &'a OrderedMessage;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Cursors
// ──────────────────────────────────────────────────────────────────────────────

/// Bidirectional cursor that refuses to cross gaps.
///
/// The stack holds the path from the root to the current message. Moving
/// past a message whose flag in that direction is unset ends the cursor.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    stack: Vec<&'a OrderedMessage>,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn get(&self) -> Option<&'a OrderedMessage> {
        self.stack.last().copied()
    }

    pub fn move_next(&mut self) {
        let Some(&cur) = self.stack.last() else {
            return;
        };
        if !cur.have_next {
            self.stack.clear();
            return;
        }
        if let Some(right) = cur.right.as_deref() {
            let mut node = Some(right);
            while let Some(n) = node {
                self.stack.push(n);
                node = n.left.as_deref();
            }
            return;
        }
        let mut child = cur;
        loop {
            self.stack.pop();
            let Some(&parent) = self.stack.last() else {
                return;
            };
            if parent
                .left
                .as_deref()
                .is_some_and(|left| std::ptr::eq(left, child))
            {
                return;
            }
            child = parent;
        }
    }

    pub fn move_prev(&mut self) {
        let Some(&cur) = self.stack.last() else {
            return;
        };
        if !cur.have_previous {
            self.stack.clear();
            return;
        }
        if let Some(left) = cur.left.as_deref() {
            let mut node = Some(left);
            while let Some(n) = node {
                self.stack.push(n);
                node = n.right.as_deref();
            }
            return;
        }
        let mut child = cur;
        loop {
            self.stack.pop();
            let Some(&parent) = self.stack.last() else {
                return;
            };
            if parent
                .right
                .as_deref()
                .is_some_and(|right| std::ptr::eq(right, child))
            {
                return;
            }
            child = parent;
        }
    }
}

/// In-order iterator over every known message.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a OrderedMessage>,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut node: Option<&'a OrderedMessage>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a OrderedMessage;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(node)
    }
}
