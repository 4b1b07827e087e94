mod engagement;
mod messages;
mod posts;
mod users;
