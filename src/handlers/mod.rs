pub mod attachment;
pub mod auth;
pub mod board;
pub mod card;
pub mod dashboard;
pub mod field;
pub mod health;

pub use attachment::attachment_config;
pub use auth::auth_config;
pub use board::board_config;
pub use card::card_config;
pub use dashboard::dashboard_config;
pub use field::field_config;
pub use health::health_config;
