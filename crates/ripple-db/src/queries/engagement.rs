use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::Database;
use crate::models::UserRow;
use crate::sql::{OptionalExt, is_constraint_violation};

impl Database {
    // -- Likes --

    /// Toggle a like: removes if present, inserts if absent.
    /// Returns true when the post is liked after the toggle.
    pub fn toggle_like(&self, id: &str, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                return Ok(false);
            }

            insert_like(conn, id, post_id, user_id)?;
            Ok(true)
        })
    }

    /// Insert a like unconditionally. A duplicate (e.g. two clicks racing the
    /// same toggle) hits UNIQUE(post_id, user_id) and is treated as already
    /// in the desired state, not a failure.
    pub fn add_like(&self, id: &str, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| insert_like(conn, id, post_id, user_id))
    }

    pub fn likes_count(&self, post_id: &str) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM likes WHERE post_id = ?1", post_id)
    }

    pub fn comments_count(&self, post_id: &str) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM comments WHERE post_id = ?1", post_id)
    }

    pub fn liked_by_user(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Followers --

    /// Toggle a follower edge. Returns true when `follower_id` is following
    /// `following_id` after the toggle. Self-follows are rejected.
    pub fn toggle_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<bool> {
        if follower_id == following_id {
            bail!("cannot follow yourself");
        }

        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM followers WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM followers WHERE id = ?1", [&existing_id])?;
                return Ok(false);
            }

            insert_follow(conn, id, follower_id, following_id)?;
            Ok(true)
        })
    }

    /// Insert a follower edge unconditionally; duplicates are idempotent,
    /// same as [`Database::add_like`].
    pub fn add_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<()> {
        if follower_id == following_id {
            bail!("cannot follow yourself");
        }
        self.with_conn(|conn| insert_follow(conn, id, follower_id, following_id))
    }

    pub fn followers_count(&self, user_id: &str) -> Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM followers WHERE following_id = ?1",
            user_id,
        )
    }

    pub fn following_count(&self, user_id: &str) -> Result<i64> {
        self.count(
            "SELECT COUNT(*) FROM followers WHERE follower_id = ?1",
            user_id,
        )
    }

    pub fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM followers WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Users following `user_id`.
    pub fn list_followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.list_edge_users(
            "SELECT u.id, u.email, u.name, u.company_name, u.avatar_url, u.password, u.created_at
             FROM followers f
             JOIN users u ON f.follower_id = u.id
             WHERE f.following_id = ?1
             ORDER BY u.name ASC",
            user_id,
        )
    }

    /// Users that `user_id` follows.
    pub fn list_following(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.list_edge_users(
            "SELECT u.id, u.email, u.name, u.company_name, u.avatar_url, u.password, u.created_at
             FROM followers f
             JOIN users u ON f.following_id = u.id
             WHERE f.follower_id = ?1
             ORDER BY u.name ASC",
            user_id,
        )
    }

    fn count(&self, sql: &str, param: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(sql, [param], |row| row.get(0))?;
            Ok(n)
        })
    }

    fn list_edge_users(&self, sql: &str, param: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([param], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                        company_name: row.get(3)?,
                        avatar_url: row.get(4)?,
                        password: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_like(conn: &Connection, id: &str, post_id: &str, user_id: &str) -> Result<()> {
    match conn.execute(
        "INSERT INTO likes (id, post_id, user_id) VALUES (?1, ?2, ?3)",
        [id, post_id, user_id],
    ) {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn insert_follow(conn: &Connection, id: &str, follower_id: &str, following_id: &str) -> Result<()> {
    match conn.execute(
        "INSERT INTO followers (id, follower_id, following_id) VALUES (?1, ?2, ?3)",
        [id, follower_id, following_id],
    ) {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
