pub mod auth;
pub mod board;
pub mod card;
pub mod dashboard;
pub mod field;
pub mod response;
