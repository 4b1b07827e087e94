use ripple_db::Database;
use ripple_types::filter::Filter;
use uuid::Uuid;

fn db() -> Database {
    Database::open_in_memory().unwrap()
}

fn seed_user(db: &Database, id: &str, name: &str, email: &str) {
    db.create_user(id, email, name, None, "argon2-hash").unwrap();
}

fn seed_post(db: &Database, id: &str, user_id: &str, content: &str) {
    db.create_post(id, user_id, content, None).unwrap();
}

// -- Derived counts --

#[test]
fn counts_default_to_zero() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_post(&db, "p1", "u1", "primeiro post");

    assert_eq!(db.likes_count("p1").unwrap(), 0);
    assert_eq!(db.comments_count("p1").unwrap(), 0);
    assert!(!db.liked_by_user("p1", "u1").unwrap());
    assert_eq!(db.followers_count("u1").unwrap(), 0);
    assert_eq!(db.following_count("u1").unwrap(), 0);
}

#[test]
fn counts_reflect_rows() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");
    seed_post(&db, "p1", "u1", "post");

    db.toggle_like("l1", "p1", "u1").unwrap();
    db.toggle_like("l2", "p1", "u2").unwrap();
    db.create_comment("c1", "p1", "u2", "legal!").unwrap();

    assert_eq!(db.likes_count("p1").unwrap(), 2);
    assert_eq!(db.comments_count("p1").unwrap(), 1);
    assert!(db.liked_by_user("p1", "u2").unwrap());
}

// -- Like toggle --

#[test]
fn like_toggle_round_trips() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_post(&db, "p1", "u1", "post");

    assert!(db.toggle_like("l1", "p1", "u1").unwrap());
    assert_eq!(db.likes_count("p1").unwrap(), 1);

    assert!(!db.toggle_like("l2", "p1", "u1").unwrap());
    assert_eq!(db.likes_count("p1").unwrap(), 0);
    assert!(!db.liked_by_user("p1", "u1").unwrap());
}

#[test]
fn duplicate_like_insert_is_idempotent() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_post(&db, "p1", "u1", "post");

    // Two clicks racing the same toggle both take the insert path; the
    // second hits UNIQUE(post_id, user_id) and lands as a no-op.
    db.add_like("l1", "p1", "u1").unwrap();
    db.add_like("l2", "p1", "u1").unwrap();

    assert_eq!(db.likes_count("p1").unwrap(), 1);
    assert!(db.liked_by_user("p1", "u1").unwrap());
}

#[test]
fn duplicate_follow_insert_is_idempotent() {
    let db = db();
    seed_user(&db, "a", "Ana", "ana@exemplo.com");
    seed_user(&db, "b", "Bia", "bia@exemplo.com");

    db.add_follow("f1", "a", "b").unwrap();
    db.add_follow("f2", "a", "b").unwrap();

    assert_eq!(db.followers_count("b").unwrap(), 1);
}

// -- Follower edges --

#[test]
fn follow_toggle_round_trips() {
    let db = db();
    seed_user(&db, "a", "Ana", "ana@exemplo.com");
    seed_user(&db, "b", "Bia", "bia@exemplo.com");

    assert!(db.toggle_follow("f1", "a", "b").unwrap());
    assert!(db.is_following("a", "b").unwrap());
    assert_eq!(db.followers_count("b").unwrap(), 1);
    assert_eq!(db.following_count("a").unwrap(), 1);
    // The edge is directed; the reverse does not exist
    assert!(!db.is_following("b", "a").unwrap());

    assert!(!db.toggle_follow("f2", "a", "b").unwrap());
    assert!(!db.is_following("a", "b").unwrap());
    assert_eq!(db.followers_count("b").unwrap(), 0);
}

#[test]
fn self_follow_is_rejected() {
    let db = db();
    seed_user(&db, "a", "Ana", "ana@exemplo.com");

    assert!(db.toggle_follow("f1", "a", "a").is_err());
    assert_eq!(db.following_count("a").unwrap(), 0);
}

#[test]
fn follower_lists_resolve_users() {
    let db = db();
    seed_user(&db, "a", "Ana", "ana@exemplo.com");
    seed_user(&db, "b", "Bia", "bia@exemplo.com");
    seed_user(&db, "c", "Caio", "caio@exemplo.com");

    db.toggle_follow("f1", "a", "c").unwrap();
    db.toggle_follow("f2", "b", "c").unwrap();

    let followers = db.list_followers("c").unwrap();
    let names: Vec<&str> = followers.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Bia"]);

    let following = db.list_following("a").unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, "c");
}

// -- Messaging --

#[test]
fn sent_message_lands_once_with_expected_fields() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");

    db.send_message("m1", "conv1", "u1", "u2", "oi").unwrap();

    let messages = db.messages_between("u1", "u2").unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "oi");
    assert_eq!(messages[0].sender_id, "u1");
    assert_eq!(messages[0].receiver_id, "u2");
    assert!(!messages[0].is_read);
}

#[test]
fn messages_between_sees_both_directions() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");
    seed_user(&db, "u3", "Caio", "caio@exemplo.com");

    db.send_message("m1", "c1", "u1", "u2", "oi").unwrap();
    db.send_message("m2", "c2", "u2", "u1", "olá").unwrap();
    db.send_message("m3", "c3", "u1", "u3", "outro papo").unwrap();

    let messages = db.messages_between("u1", "u2").unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| {
        (m.sender_id == "u1" && m.receiver_id == "u2")
            || (m.sender_id == "u2" && m.receiver_id == "u1")
    }));
}

#[test]
fn mark_read_only_touches_inbound_unread() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");

    db.send_message("m1", "c1", "u1", "u2", "oi").unwrap();
    db.send_message("m2", "c1", "u2", "u1", "olá").unwrap();

    // u2 opens the chat with u1: only u1 -> u2 flips
    let updated = db.mark_read("u2", "u1").unwrap();
    assert_eq!(updated, 1);

    let messages = db.messages_between("u1", "u2").unwrap();
    let from_u1 = messages.iter().find(|m| m.sender_id == "u1").unwrap();
    let from_u2 = messages.iter().find(|m| m.sender_id == "u2").unwrap();
    assert!(from_u1.is_read);
    assert!(!from_u2.is_read);

    // Already-read rows are not re-counted
    assert_eq!(db.mark_read("u2", "u1").unwrap(), 0);
}

#[test]
fn conversation_row_is_unique_per_pair() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");

    // Both directions land in the same conversation row
    db.send_message("m1", "c1", "u1", "u2", "oi").unwrap();
    db.send_message("m2", "c2", "u2", "u1", "olá").unwrap();

    let for_u1 = db.list_conversations("u1").unwrap();
    let for_u2 = db.list_conversations("u2").unwrap();
    assert_eq!(for_u1.len(), 1);
    assert_eq!(for_u2.len(), 1);
    assert_eq!(for_u1[0].id, for_u2[0].id);

    assert_eq!(for_u1[0].other_user_id, "u2");
    assert_eq!(for_u2[0].other_user_id, "u1");
    let last = for_u1[0].last_message.as_ref().unwrap();
    assert_eq!(last.id, "m2");
}

#[test]
fn unread_counter_increments_and_resets() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");

    db.send_message("m1", "c1", "u1", "u2", "oi").unwrap();
    db.send_message("m2", "c1", "u1", "u2", "tudo bem?").unwrap();

    let conversations = db.list_conversations("u2").unwrap();
    assert_eq!(conversations[0].unread_count, 2);

    db.mark_read("u2", "u1").unwrap();
    let conversations = db.list_conversations("u2").unwrap();
    assert_eq!(conversations[0].unread_count, 0);
}

// -- Point lookups and search --

#[test]
fn point_lookup_distinguishes_not_found() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");

    assert!(db.get_user_by_id("u1").unwrap().is_some());
    assert!(db.get_user_by_id("missing").unwrap().is_none());
    assert!(db.get_post("missing").unwrap().is_none());
}

#[test]
fn search_matches_name_case_insensitively() {
    let db = db();
    seed_user(&db, "u1", "Jonas", "jonas@exemplo.com");
    seed_user(&db, "u2", "Pedro", "pedro@exemplo.com");

    let hits = db.search_users("jonas", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Jonas");

    let hits = db.search_users("exemplo", 10).unwrap();
    assert_eq!(hits.len(), 2);

    assert!(db.search_users("ninguém", 10).unwrap().is_empty());
}

#[test]
fn search_folds_accented_names_beyond_ascii() {
    let db = db();
    seed_user(&db, "u1", "Ágata", "agata@exemplo.com");
    seed_user(&db, "u2", "Pedro", "pedro@exemplo.com");

    // SQLite's bare LIKE would miss this; the registered ulower() folds
    // the same way the in-memory filter matching does
    let hits = db.search_users("ágata", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Ágata");

    let hits = db.search_users("ÁGATA", 10).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn generic_message_filter_lists_unread_only() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_user(&db, "u2", "Bia", "bia@exemplo.com");

    db.send_message("m1", "c1", "u1", "u2", "oi").unwrap();
    db.send_message("m2", "c1", "u2", "u1", "olá").unwrap();
    db.mark_read("u2", "u1").unwrap();

    let unread = db
        .list_messages(&Filter::eq("is_read", false))
        .unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, "m2");
}

#[test]
fn feed_lists_posts_newest_first_with_authors() {
    let db = db();
    seed_user(&db, "u1", "Ana", "ana@exemplo.com");
    seed_post(&db, "p1", "u1", "primeiro");
    // Force distinct timestamps so ordering is deterministic
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO posts (id, user_id, content, created_at) \
             VALUES ('p2', 'u1', 'segundo', datetime('now', '+1 second'))",
            [],
        )?;
        Ok(())
    })
    .unwrap();

    let posts = db.list_posts().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, "p2");
    assert_eq!(posts[0].author_name, "Ana");
}

#[test]
fn ids_are_generated_as_uuids_by_callers() {
    // The store takes ids as opaque text; handler layers pass UUIDv4 strings.
    let id = Uuid::new_v4().to_string();
    let db = db();
    db.create_user(&id, "x@exemplo.com", "X", None, "hash").unwrap();
    assert!(db.get_user_by_id(&id).unwrap().is_some());
}
