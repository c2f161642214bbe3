pub mod comment;
pub mod file;
pub mod follow;
pub mod group;
pub mod post;
pub mod session;
pub mod user;
