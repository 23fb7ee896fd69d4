pub mod identity;
pub mod profile;

pub use identity::*;
pub use profile::*;
