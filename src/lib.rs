pub mod catalog;
pub mod common;
pub mod configs;
pub mod fanout;
pub mod link;
pub mod resolver;
pub mod sources;
