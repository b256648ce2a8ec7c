//! Repository trait definitions.
//!
//! All traits use native async fn in traits (RPITIT, Rust 2024 edition)
//! and are implemented against SQLite in charisma-infra.

mod character;
mod message;
mod relation;
mod session;
mod user;

pub use character::CharacterRepository;
pub use message::MessageRepository;
pub use relation::RelationRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
