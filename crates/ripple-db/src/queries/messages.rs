use anyhow::Result;
use ripple_types::filter::Filter;

use crate::Database;
use crate::models::{ConversationRow, MessageRow};
use crate::sql::bind_all;

impl Database {
    /// Insert a message and maintain the conversation row for the pair in the
    /// same transaction: last-message pointer, timestamp and unread counter.
    /// There is no database-side trigger doing this; the counter is only ever
    /// touched here and in [`Database::mark_read`].
    pub fn send_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, sender_id, receiver_id, content],
            )?;

            let (user1, user2) = canonical_pair(sender_id, receiver_id);
            tx.execute(
                "INSERT INTO conversations (id, user1_id, user2_id, last_message_id, last_message_time, unread_count)
                 VALUES (?1, ?2, ?3, ?4, datetime('now'), 1)
                 ON CONFLICT(user1_id, user2_id) DO UPDATE SET
                    last_message_id = ?4,
                    last_message_time = datetime('now'),
                    unread_count = unread_count + 1,
                    updated_at = datetime('now')",
                rusqlite::params![conversation_id, user1, user2, id],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// All messages between two users, oldest first.
    pub fn messages_between(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageRow>> {
        let filter = Filter::or([
            Filter::and([
                Filter::eq("sender_id", user_a),
                Filter::eq("receiver_id", user_b),
            ]),
            Filter::and([
                Filter::eq("sender_id", user_b),
                Filter::eq("receiver_id", user_a),
            ]),
        ]);

        self.list_messages(&filter)
    }

    /// Messages matching an arbitrary filter, oldest first.
    pub fn list_messages(&self, filter: &Filter) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut params = Vec::new();
            let where_sql = filter.to_sql(&mut params);
            let sql = format!(
                "SELECT id, sender_id, receiver_id, content, is_read, created_at
                 FROM messages WHERE {where_sql}
                 ORDER BY created_at ASC"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(bind_all(&params)), read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Mark everything `other_id` sent to `current_id` as read and reset the
    /// conversation's unread counter. Messages in the opposite direction are
    /// untouched. Returns the number of message rows flipped.
    pub fn mark_read(&self, current_id: &str, other_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let n = tx.execute(
                "UPDATE messages SET is_read = 1, updated_at = datetime('now')
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                [other_id, current_id],
            )?;

            let (user1, user2) = canonical_pair(current_id, other_id);
            tx.execute(
                "UPDATE conversations SET unread_count = 0, updated_at = datetime('now')
                 WHERE user1_id = ?1 AND user2_id = ?2",
                [user1, user2],
            )?;

            tx.commit()?;
            Ok(n)
        })
    }

    /// Inbox listing: every conversation involving `user_id`, most recent
    /// first, joined with the other participant and the last message. The
    /// unread counter comes straight from the stored row.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id,
                        u.id, u.name, u.company_name, u.avatar_url,
                        m.id, m.sender_id, m.receiver_id, m.content, m.is_read, m.created_at,
                        c.unread_count
                 FROM conversations c
                 JOIN users u ON u.id = CASE WHEN c.user1_id = ?1 THEN c.user2_id ELSE c.user1_id END
                 LEFT JOIN messages m ON m.id = c.last_message_id
                 WHERE c.user1_id = ?1 OR c.user2_id = ?1
                 ORDER BY c.last_message_time DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    let last_message_id: Option<String> = row.get(5)?;
                    let last_message = match last_message_id {
                        Some(id) => Some(MessageRow {
                            id,
                            sender_id: row.get(6)?,
                            receiver_id: row.get(7)?,
                            content: row.get(8)?,
                            is_read: row.get(9)?,
                            created_at: row.get(10)?,
                        }),
                        None => None,
                    };

                    Ok(ConversationRow {
                        id: row.get(0)?,
                        other_user_id: row.get(1)?,
                        other_name: row.get(2)?,
                        other_company: row.get(3)?,
                        other_avatar: row.get(4)?,
                        last_message,
                        unread_count: row.get(11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

/// Canonical unordered pair: lexicographically smaller id first, so one
/// conversation row per pair regardless of who messaged first.
fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

fn read_message(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}
