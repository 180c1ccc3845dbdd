//! 会话层：只追加的会话记录与会话表

pub mod store;
pub mod transcript;

pub use store::{Session, SessionError, SessionStore};
pub use transcript::{Message, Role, Transcript};
