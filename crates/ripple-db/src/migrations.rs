use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            name            TEXT NOT NULL,
            company_name    TEXT,
            avatar_url      TEXT,
            password        TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            image_url   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(post_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS followers (
            id              TEXT PRIMARY KEY,
            follower_id     TEXT NOT NULL REFERENCES users(id),
            following_id    TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id),
            CHECK(follower_id <> following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_followers_following
            ON followers(following_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id, created_at);

        -- One row per unordered user pair: user1_id is always the
        -- lexicographically smaller id.
        CREATE TABLE IF NOT EXISTS conversations (
            id                  TEXT PRIMARY KEY,
            user1_id            TEXT NOT NULL REFERENCES users(id),
            user2_id            TEXT NOT NULL REFERENCES users(id),
            last_message_id     TEXT REFERENCES messages(id),
            last_message_time   TEXT,
            unread_count        INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at          TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user1_id, user2_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_users
            ON conversations(user1_id, user2_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
