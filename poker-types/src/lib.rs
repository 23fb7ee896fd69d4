pub mod errors;
pub mod events;
pub mod room;
pub mod session;
pub mod user;
pub mod vote;

// Re-export all types
pub use errors::*;
pub use events::*;
pub use room::*;
pub use session::*;
pub use user::*;
pub use vote::*;
