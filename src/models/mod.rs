pub mod event;
pub mod invitation;
pub mod member;
pub mod news;
pub mod tokens;
pub mod user;
