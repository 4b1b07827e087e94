pub mod auth;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod storage;
pub mod support;
pub mod users;
mod views;
