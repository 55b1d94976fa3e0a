pub mod summary;
pub mod user;
