pub mod chat;
pub mod domain;
pub mod ports;
pub mod session;
pub mod studio;

pub use domain::{
    Chat, ChatAnswer, ChatUpdate, Citation, FileUpload, Message, MessageContent, PdfDocument,
    ProfileUpdate, Role, Source, SourceKind, SourceStatus, StructuredAnswer, User,
};
pub use ports::{AuthApi, ChatApi, PortError, PortResult, StudioApi};
pub use studio::{GenerateOutcome, StudioState, STUDIO_TOOLS};
