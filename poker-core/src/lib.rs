pub mod engine;
pub mod events;
pub mod tally;

// Re-export main components
pub use engine::*;
pub use events::*;
pub use tally::*;
