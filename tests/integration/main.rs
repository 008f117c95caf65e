mod common;

mod comments;
mod eventlog_replay;
mod privileges;
mod tags_and_categories;
mod threads_and_messages;
mod throttling;
mod users;
mod voting;
