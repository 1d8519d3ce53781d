pub mod auth;
pub mod blog_detail;
pub mod blogs;
pub mod homebrew;
pub mod notifications;
