pub mod audit;
pub mod orders;
pub mod refresh_tokens;
pub mod users;
