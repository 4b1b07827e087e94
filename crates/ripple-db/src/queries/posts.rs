use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{CommentRow, PostRow};
use crate::sql::OptionalExt;

impl Database {
    pub fn create_post(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, content, image_url) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, content, image_url],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([id], read_post).optional()?;
            Ok(row)
        })
    }

    /// Feed query: every post, newest first, joined with its author.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(conn, &format!("{POST_SELECT} ORDER BY p.created_at DESC"), [])
        })
    }

    pub fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("{POST_SELECT} WHERE p.user_id = ?1 ORDER BY p.created_at DESC"),
                [user_id],
            )
        })
    }

    pub fn create_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, content) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, post_id, user_id, content],
            )?;
            Ok(())
        })
    }

    /// Comments for a post, oldest first, joined with their authors.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.user_id, u.name, u.company_name, u.avatar_url,
                        c.content, c.created_at
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC",
            )?;

            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        author_name: row.get(3)?,
                        author_company: row.get(4)?,
                        author_avatar: row.get(5)?,
                        content: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

// JOIN users to fetch author fields in a single query (eliminates N+1)
const POST_SELECT: &str = "SELECT p.id, p.user_id, u.name, u.company_name, u.avatar_url,
        p.content, p.image_url, p.created_at
 FROM posts p
 JOIN users u ON p.user_id = u.id";

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, read_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn read_post(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author_name: row.get(2)?,
        author_company: row.get(3)?,
        author_avatar: row.get(4)?,
        content: row.get(5)?,
        image_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}
