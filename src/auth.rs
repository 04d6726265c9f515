//! Identity envelope: agent identifiers, act claims, assertion payloads, and normalized tokens.

pub mod act;
pub mod assertion;
pub mod id;
pub mod scope;
pub mod session;
pub mod token;

pub use act::*;
pub use assertion::*;
pub use id::*;
pub use scope::*;
pub use session::*;
pub use token::*;
