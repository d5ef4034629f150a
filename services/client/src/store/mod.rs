pub mod chat;
pub mod session;
pub mod studio;

pub use chat::ChatStore;
pub use session::SessionStore;
pub use studio::StudioStore;
