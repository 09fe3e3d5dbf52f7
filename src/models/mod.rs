pub mod audit_event;
pub mod order;
pub mod refresh_token;
pub mod user;

pub use audit_event::AuditEvent;
pub use order::{NewFlightOrder, NewHotelOrder, Order, OrderKind, OrderStatus, Priority};
pub use refresh_token::RefreshToken;
pub use user::User;
