use anyhow::Result;
use ripple_types::filter::Filter;
use rusqlite::Connection;

use crate::Database;
use crate::models::UserRow;
use crate::sql::{OptionalExt, bind_all};

const USER_COLUMNS: &str = "id, email, name, company_name, avatar_url, password, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        name: &str,
        company_name: Option<&str>,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, company_name, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, name, company_name, password_hash],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one_user(conn, &Filter::eq("id", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one_user(conn, &Filter::eq("email", email))
        })
    }

    pub fn update_profile(
        &self,
        id: &str,
        name: &str,
        company_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET name = ?2, company_name = ?3, avatar_url = ?4 WHERE id = ?1",
                rusqlite::params![id, name, company_name, avatar_url],
            )?;
            Ok(n)
        })
    }

    pub fn set_avatar_url(&self, id: &str, avatar_url: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET avatar_url = ?2 WHERE id = ?1",
                rusqlite::params![id, avatar_url],
            )?;
            Ok(n)
        })
    }

    /// Substring search over name, email and company name. Callers are
    /// responsible for short-circuiting empty queries before reaching here.
    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserRow>> {
        let filter = Filter::or([
            Filter::contains("name", query),
            Filter::contains("email", query),
            Filter::contains("company_name", query),
        ]);

        self.with_conn(|conn| query_users(conn, &filter, limit))
    }
}

fn query_one_user(conn: &Connection, filter: &Filter) -> Result<Option<UserRow>> {
    let mut params = Vec::new();
    let where_sql = filter.to_sql(&mut params);
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {where_sql}");

    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(rusqlite::params_from_iter(bind_all(&params)), read_user)
        .optional()?;

    Ok(row)
}

fn query_users(conn: &Connection, filter: &Filter, limit: u32) -> Result<Vec<UserRow>> {
    let mut params = Vec::new();
    let where_sql = filter.to_sql(&mut params);
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {where_sql} ORDER BY name ASC LIMIT {limit}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(bind_all(&params)), read_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn read_user(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        company_name: row.get(3)?,
        avatar_url: row.get(4)?,
        password: row.get(5)?,
        created_at: row.get(6)?,
    })
}
