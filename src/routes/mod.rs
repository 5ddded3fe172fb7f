pub mod assets;
pub mod auth;
pub mod authors;
pub mod categories;
pub mod create_post;
pub mod dashboard;
pub mod debug;
pub mod feeds;
pub mod home;
pub mod intro;
pub mod publisher;
