// SPDX-License-Identifier: MIT

//! Message repository (§3 "Message", §4.4 addressing reads, §4.5 listing
//! and pagination).

use std::collections::BTreeSet;

use rusqlite::{params, types::Value as SqlValue, OptionalExtension, Row};
use thrum_core::{AgentId, BodyFormat, DaemonId, Message, MessageBody, MessageId, Priority, Ref, Scope};

use super::util::{from_json, from_rfc3339, to_json, to_rfc3339};
use crate::error::StoreResult;
use crate::store::Store;

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let format_str: String = row.get("body_format")?;
    let structured_json: Option<String> = row.get("structured")?;
    let priority_str: String = row.get("priority")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: Option<String> = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;
    let reply_to: Option<String> = row.get("reply_to")?;
    let thread_id: Option<String> = row.get("thread_id")?;
    let updated_by_daemon_id: Option<String> = row.get("updated_by_daemon_id")?;

    Ok(Message {
        message_id: MessageId::from_string(row.get::<_, String>("message_id")?),
        author_agent_id: AgentId::from_string(row.get::<_, String>("author_agent_id")?),
        authored_by: row.get::<_, Option<String>>("authored_by")?.map(AgentId::from_string),
        disclosed: row.get("disclosed")?,
        body: MessageBody {
            format: parse_format(&format_str),
            content: row.get("body_content")?,
        },
        structured: structured_json.and_then(|s| serde_json::from_str(&s).ok()),
        priority: parse_priority(&priority_str),
        mentions: from_json::<BTreeSet<String>>(&row.get::<_, String>("mentions")?).unwrap_or_default(),
        scopes: from_json::<BTreeSet<Scope>>(&row.get::<_, String>("scopes")?).unwrap_or_default(),
        refs: from_json::<BTreeSet<Ref>>(&row.get::<_, String>("refs")?).unwrap_or_default(),
        reply_to: reply_to.map(MessageId::from_string),
        thread_id: thread_id.map(MessageId::from_string),
        created_at: from_rfc3339(&created_at).unwrap_or_default(),
        updated_at: updated_at.and_then(|s| from_rfc3339(&s).ok()),
        deleted_at: deleted_at.and_then(|s| from_rfc3339(&s).ok()),
        updated_by_daemon_id: updated_by_daemon_id.map(DaemonId::from_string),
        audience: Vec::new(),
    })
}

fn parse_format(s: &str) -> BodyFormat {
    match s {
        "markdown" => BodyFormat::Markdown,
        "json" => BodyFormat::Json,
        _ => BodyFormat::Plain,
    }
}

fn format_str(f: BodyFormat) -> &'static str {
    match f {
        BodyFormat::Markdown => "markdown",
        BodyFormat::Plain => "plain",
        BodyFormat::Json => "json",
    }
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        "critical" => Priority::Critical,
        _ => Priority::Normal,
    }
}

fn priority_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Normal => "normal",
        Priority::High => "high",
        Priority::Critical => "critical",
    }
}

/// Inserts a message along with its resolved audience (§4.4). `audience`
/// is the fully expanded recipient set computed by the daemon's
/// `AddressResolver` — this repository never expands groups itself.
///
/// Opens its own transaction for the message + audience rows. Callers
/// that must also append the `message_created` event atomically with
/// this write (§4.2/§4.5 "all in one transaction") should use
/// [`insert_tx`] inside a [`Store::write`] instead.
pub fn insert(store: &Store, message: &Message) -> StoreResult<()> {
    store.write(|tx| insert_tx(tx, message))
}

/// Transaction-scoped half of [`insert`] — see its docs.
pub fn insert_tx(tx: &rusqlite::Transaction<'_>, message: &Message) -> StoreResult<()> {
    tx.execute(
        "INSERT INTO messages (message_id, author_agent_id, authored_by, disclosed, body_format, body_content, structured, priority, mentions, scopes, refs, reply_to, thread_id, created_at, updated_at, deleted_at, updated_by_daemon_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            message.message_id.as_str(),
            message.author_agent_id.as_str(),
            message.authored_by.as_ref().map(|a| a.as_str().to_string()),
            message.disclosed,
            format_str(message.body.format),
            message.body.content,
            message.structured.as_ref().map(|v| v.to_string()),
            priority_str(message.priority),
            to_json(&message.mentions)?,
            to_json(&message.scopes)?,
            to_json(&message.refs)?,
            message.reply_to.as_ref().map(|m| m.as_str().to_string()),
            message.thread_id.as_ref().map(|m| m.as_str().to_string()),
            to_rfc3339(message.created_at),
            message.updated_at.map(to_rfc3339),
            message.deleted_at.map(to_rfc3339),
            message.updated_by_daemon_id.as_ref().map(|d| d.as_str().to_string()),
        ],
    )?;
    for agent_id in &message.audience {
        tx.execute(
            "INSERT OR IGNORE INTO message_audience (message_id, agent_id) VALUES (?1, ?2)",
            params![message.message_id.as_str(), agent_id.as_str()],
        )?;
    }
    Ok(())
}

pub fn find_by_id(store: &Store, message_id: &MessageId) -> StoreResult<Option<Message>> {
    let conn = store.lock();
    let mut message = conn
        .query_row("SELECT * FROM messages WHERE message_id = ?1", [message_id.as_str()], row_to_message)
        .optional()?;
    if let Some(m) = message.as_mut() {
        m.audience = audience_for(&conn, message_id)?;
    }
    Ok(message)
}

fn audience_for(conn: &rusqlite::Connection, message_id: &MessageId) -> rusqlite::Result<Vec<AgentId>> {
    let mut stmt = conn.prepare("SELECT agent_id FROM message_audience WHERE message_id = ?1")?;
    let rows = stmt.query_map([message_id.as_str()], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(AgentId::from_string(row?));
    }
    Ok(out)
}

/// Edits a message's content in place (§4.5 "edit"); `updated_at` is
/// always set, `deleted_at`/tombstoning is a separate operation.
///
/// Applies the §4.3 conflict rule for concurrent edits reaching the same
/// message from different daemons: last-writer-wins by `(updated_at,
/// daemon_id)` lex order. Returns `false` (no-op) when the incoming edit
/// loses to what's already stored, which is the normal, harmless outcome
/// of a losing edit replaying via Git sync or peer sync.
pub fn edit_content(
    store: &Store,
    message_id: &MessageId,
    new_content: &str,
    at: chrono::DateTime<chrono::Utc>,
    daemon_id: &DaemonId,
) -> StoreResult<bool> {
    store.write(|tx| edit_content_tx(tx, message_id, new_content, at, daemon_id))
}

/// Transaction-scoped half of [`edit_content`] — see its docs.
pub fn edit_content_tx(
    tx: &rusqlite::Transaction<'_>,
    message_id: &MessageId,
    new_content: &str,
    at: chrono::DateTime<chrono::Utc>,
    daemon_id: &DaemonId,
) -> StoreResult<bool> {
    let existing: Option<(String, Option<String>, Option<String>)> = tx
        .query_row(
            "SELECT created_at, updated_at, updated_by_daemon_id FROM messages WHERE message_id = ?1",
            [message_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((created_at, updated_at, updated_by)) = existing else {
        return Ok(false);
    };
    let existing_key = (updated_at.unwrap_or(created_at), updated_by.unwrap_or_default());
    let incoming_key = (to_rfc3339(at), daemon_id.as_str().to_string());
    if incoming_key <= existing_key {
        return Ok(false);
    }
    tx.execute(
        "UPDATE messages SET body_content = ?1, updated_at = ?2, updated_by_daemon_id = ?3 WHERE message_id = ?4",
        params![new_content, to_rfc3339(at), daemon_id.as_str(), message_id.as_str()],
    )?;
    Ok(true)
}

/// Tombstones a message: content is not actually erased from the row in
/// this call (callers may choose to scrub `body_content` separately); the
/// `deleted_at` marker is what `Message::is_deleted`/`visible_content`
/// key off of (§3).
pub fn soft_delete(store: &Store, message_id: &MessageId, at: chrono::DateTime<chrono::Utc>) -> StoreResult<()> {
    store.write(|tx| soft_delete_tx(tx, message_id, at))
}

/// Transaction-scoped half of [`soft_delete`] — see its docs.
pub fn soft_delete_tx(
    tx: &rusqlite::Transaction<'_>,
    message_id: &MessageId,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<()> {
    tx.execute(
        "UPDATE messages SET deleted_at = ?1, body_content = ?2 WHERE message_id = ?3",
        params![to_rfc3339(at), thrum_core::DELETED_PLACEHOLDER, message_id.as_str()],
    )?;
    Ok(())
}

pub fn mark_read(store: &Store, message_id: &MessageId, reader: &AgentId, at: chrono::DateTime<chrono::Utc>) -> StoreResult<bool> {
    store.write(|tx| mark_read_tx(tx, message_id, reader, at))
}

/// Transaction-scoped half of [`mark_read`] — see its docs.
pub fn mark_read_tx(
    tx: &rusqlite::Transaction<'_>,
    message_id: &MessageId,
    reader: &AgentId,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<bool> {
    let changed = tx.execute(
        "INSERT OR IGNORE INTO read_receipts (message_id, reader_agent_id, read_at) VALUES (?1, ?2, ?3)",
        params![message_id.as_str(), reader.as_str(), to_rfc3339(at)],
    )?;
    Ok(changed > 0)
}

pub fn is_read(store: &Store, message_id: &MessageId, reader: &AgentId) -> StoreResult<bool> {
    let conn = store.lock();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM read_receipts WHERE message_id = ?1 AND reader_agent_id = ?2",
        params![message_id.as_str(), reader.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query shape for `message.list` (§4.5). Every field is an AND'd filter;
/// `None`/empty means "no constraint".
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub for_agent: Option<AgentId>,
    pub unread_for_agent: Option<AgentId>,
    pub mention: Option<String>,
    pub scope: Option<Scope>,
    pub thread_id: Option<MessageId>,
    pub exclude_author: Option<AgentId>,
    pub include_deleted: bool,
}

pub const MAX_PAGE_SIZE: u32 = 100;

pub struct Page {
    pub messages: Vec<Message>,
    pub total: u64,
}

/// Runs `filter` with `page`/`page_size` (1-indexed), clamping
/// `page_size` to [`MAX_PAGE_SIZE`] (§8 "Boundary behaviors").
pub fn list(store: &Store, filter: &MessageFilter, page: u32, page_size: u32, sort: SortOrder) -> StoreResult<Page> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

    let mut clauses: Vec<String> = Vec::new();
    let mut sql_params: Vec<SqlValue> = Vec::new();

    if !filter.include_deleted {
        clauses.push("m.deleted_at IS NULL".to_string());
    }
    if let Some(agent) = &filter.for_agent {
        // §4.5: matches the audience directly, OR a `type=group` scope
        // naming a group the agent is a transitive member of (role or
        // nested-group membership included) even when the send never put
        // the agent in `message_audience` directly.
        let role = super::agents::find_by_id(store, agent)?.map(|a| a.role);
        let group_names = super::groups::transitive_group_names_for_agent(store, agent, role.as_deref())?;

        let mut clause =
            "EXISTS (SELECT 1 FROM message_audience ma WHERE ma.message_id = m.message_id AND ma.agent_id = ?)"
                .to_string();
        sql_params.push(SqlValue::Text(agent.as_str().to_string()));
        for name in &group_names {
            clause.push_str(" OR m.scopes LIKE ?");
            sql_params.push(SqlValue::Text(format!("%\"type\":\"group\",\"value\":\"{name}\"%")));
        }
        clauses.push(format!("({clause})"));
    }
    if let Some(agent) = &filter.unread_for_agent {
        clauses.push("NOT EXISTS (SELECT 1 FROM read_receipts r WHERE r.message_id = m.message_id AND r.reader_agent_id = ?)".to_string());
        sql_params.push(SqlValue::Text(agent.as_str().to_string()));
    }
    if let Some(mention) = &filter.mention {
        clauses.push("m.mentions LIKE ?".to_string());
        sql_params.push(SqlValue::Text(format!("%\"{mention}\"%")));
    }
    if let Some(scope) = &filter.scope {
        let needle = serde_json::to_string(scope).unwrap_or_default();
        clauses.push("m.scopes LIKE ?".to_string());
        sql_params.push(SqlValue::Text(format!("%{needle}%")));
    }
    if let Some(thread_id) = &filter.thread_id {
        clauses.push("m.thread_id = ?".to_string());
        sql_params.push(SqlValue::Text(thread_id.as_str().to_string()));
    }
    if let Some(author) = &filter.exclude_author {
        clauses.push("m.author_agent_id != ?".to_string());
        sql_params.push(SqlValue::Text(author.as_str().to_string()));
    }

    let where_clause =
        if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };
    let order = match sort {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    let conn = store.lock();
    let count_sql = format!("SELECT COUNT(*) FROM messages m {where_clause}");
    let total: i64 = conn.query_row(
        &count_sql,
        rusqlite::params_from_iter(sql_params.iter()),
        |row| row.get(0),
    )?;

    let offset = (page as i64 - 1) * page_size as i64;
    let select_sql = format!(
        "SELECT m.* FROM messages m {where_clause} ORDER BY m.created_at {order} LIMIT ? OFFSET ?"
    );
    let mut select_params = sql_params.clone();
    select_params.push(SqlValue::Integer(page_size as i64));
    select_params.push(SqlValue::Integer(offset));

    let mut stmt = conn.prepare(&select_sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(select_params.iter()), row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        let mut m = row?;
        m.audience = audience_for(&conn, &m.message_id)?;
        messages.push(m);
    }

    Ok(Page { messages, total: total.max(0) as u64 })
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
