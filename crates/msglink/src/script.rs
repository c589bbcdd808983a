//! Line-oriented scripts over an ordered message tree.
//!
//! One operation per line; blank lines and `#` comments are skipped. Ids
//! are server message ids.
//!
//! ```text
//! insert 10 next auto
//! erase 10 memory
//! attach-prev 11
//! auto-attach 12 11
//! older 12
//! dump
//! ```

use std::io::Write;

use msglink_history::{MessageId, OrderedMessage, OrderedMessages};

use crate::{CliError, CliResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    Insert {
        id: MessageId,
        have_previous: bool,
        have_next: bool,
        auto: bool,
    },
    Erase {
        id: MessageId,
        only_from_memory: bool,
    },
    AttachPrevious(MessageId),
    AttachNext(MessageId),
    AutoAttach {
        id: MessageId,
        last: MessageId,
    },
    Older(MessageId),
    Newer(MessageId),
    Dump,
}

fn parse_id(word: Option<&str>) -> Result<MessageId, String> {
    let word = word.ok_or("missing message id")?;
    match word.parse::<i32>() {
        Ok(server_id) if server_id > 0 => Ok(MessageId::from_server(server_id)),
        _ => Err(format!("invalid message id: {word}")),
    }
}

fn no_more<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<(), String> {
    words
        .next()
        .map_or(Ok(()), |word| Err(format!("unexpected argument: {word}")))
}

/// Parse one script line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<ScriptOp>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let op = match command {
        "insert" => {
            let id = parse_id(words.next())?;
            let (mut have_previous, mut have_next, mut auto) = (false, false, false);
            for word in words {
                match word {
                    "prev" => have_previous = true,
                    "next" => have_next = true,
                    "auto" => auto = true,
                    other => return Err(format!("unknown insert flag: {other}")),
                }
            }
            ScriptOp::Insert {
                id,
                have_previous,
                have_next,
                auto,
            }
        }
        "erase" => {
            let id = parse_id(words.next())?;
            let only_from_memory = match words.next() {
                None => false,
                Some("memory") => true,
                Some(other) => return Err(format!("unknown erase flag: {other}")),
            };
            no_more(words)?;
            ScriptOp::Erase {
                id,
                only_from_memory,
            }
        }
        "attach-prev" => {
            let id = parse_id(words.next())?;
            no_more(words)?;
            ScriptOp::AttachPrevious(id)
        }
        "attach-next" => {
            let id = parse_id(words.next())?;
            no_more(words)?;
            ScriptOp::AttachNext(id)
        }
        "auto-attach" => {
            let id = parse_id(words.next())?;
            let last = parse_id(words.next())?;
            no_more(words)?;
            ScriptOp::AutoAttach { id, last }
        }
        "older" => {
            let id = parse_id(words.next())?;
            no_more(words)?;
            ScriptOp::Older(id)
        }
        "newer" => {
            let id = parse_id(words.next())?;
            no_more(words)?;
            ScriptOp::Newer(id)
        }
        "dump" => {
            no_more(words)?;
            ScriptOp::Dump
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(op))
}

fn flags(message: &OrderedMessage) -> String {
    format!(
        "{} prev={} next={}",
        message.message_id(),
        message.have_previous,
        message.have_next
    )
}

fn id_list(ids: &[MessageId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

fn has_previous(messages: &OrderedMessages, id: MessageId) -> bool {
    messages.cursor(MessageId::new(id.get() - 1)).get().is_some()
}

fn has_next(messages: &OrderedMessages, id: MessageId) -> bool {
    messages
        .cursor_at_or_after(MessageId::new(id.get() + 1))
        .get()
        .is_some()
}

/// Check the tree's preconditions so that a bad script line is reported
/// instead of panicking.
fn precondition(messages: &OrderedMessages, op: ScriptOp) -> Result<(), String> {
    match op {
        ScriptOp::Insert { id, .. } | ScriptOp::AutoAttach { id, .. } if messages.contains(id) => {
            Err(format!("message {id} is already known"))
        }
        ScriptOp::Erase { id, .. } | ScriptOp::AttachPrevious(id) | ScriptOp::AttachNext(id)
            if !messages.contains(id) =>
        {
            Err(format!("message {id} is not known"))
        }
        ScriptOp::AttachPrevious(id)
            if !messages.get(id).is_some_and(|m| m.have_previous) && !has_previous(messages, id) =>
        {
            Err(format!("message {id} has no previous message"))
        }
        ScriptOp::AttachNext(id)
            if !messages.get(id).is_some_and(|m| m.have_next) && !has_next(messages, id) =>
        {
            Err(format!("message {id} has no next message"))
        }
        _ => Ok(()),
    }
}

/// Apply one operation and return its printed result.
pub fn apply(messages: &mut OrderedMessages, op: ScriptOp) -> Result<String, String> {
    precondition(messages, op)?;
    let touched = match op {
        ScriptOp::Insert {
            id,
            have_previous,
            have_next,
            auto,
        } => {
            messages.insert(id, auto, have_previous, have_next);
            id
        }
        ScriptOp::Erase {
            id,
            only_from_memory,
        } => {
            messages.erase(id, only_from_memory);
            return Ok(format!("erased {id}"));
        }
        ScriptOp::AttachPrevious(id) => {
            messages.attach_message_to_previous(id, "script");
            id
        }
        ScriptOp::AttachNext(id) => {
            messages.attach_message_to_next(id, "script");
            id
        }
        ScriptOp::AutoAttach { id, last } => {
            let info = messages.auto_attach_message(id, last, "script");
            return Ok(format!(
                "prev={} next={}",
                info.have_previous, info.have_next
            ));
        }
        ScriptOp::Older(id) => return Ok(id_list(&messages.find_older_messages(id))),
        ScriptOp::Newer(id) => return Ok(id_list(&messages.find_newer_messages(id))),
        ScriptOp::Dump => {
            return Ok(messages.iter().map(flags).collect::<Vec<_>>().join("\n"));
        }
    };
    Ok(messages.get(touched).map(flags).unwrap_or_default())
}

/// Run every line of `source`, writing one result per operation.
///
/// Stops at the first malformed or failing line.
pub fn run_script(
    source: &str,
    messages: &mut OrderedMessages,
    out: &mut impl Write,
) -> CliResult<()> {
    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let Some(op) = parse_line(line).map_err(|message| CliError::Script {
            line: line_no,
            message,
        })?
        else {
            continue;
        };
        tracing::debug!(line = line_no, ?op, "history op");
        let result = apply(messages, op).map_err(|message| CliError::Operation {
            line: line_no,
            message,
        })?;
        if !result.is_empty() {
            writeln!(out, "{result}")?;
        }
    }
    Ok(())
}
