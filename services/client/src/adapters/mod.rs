pub mod auth_api;
pub mod chat_api;
pub mod studio_api;

pub use auth_api::AuthHttp;
pub use chat_api::ChatHttp;
pub use studio_api::StudioHttp;
