//! crates/sop_genius_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any wire format or HTTP library;
//! the client service maps its wire records into them.

use chrono::{DateTime, Utc};

// Represents the signed-in account - used throughout the app
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub avatar: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_email_verified: Option<bool>,  // Older accounts predate verification
}

/// A conversation thread: its uploaded documents and its message history.
///
/// Chats can exist locally before the backend knows about them (navigating
/// to a fresh id creates one optimistically); reconciliation against the
/// server list dedups by id.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub pdf_ids: Vec<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single chat message. Append-only within a chat; user messages are
/// appended before the backend confirms the assistant's reply.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
    pub citations: Vec<Citation>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Assistant answers arrive either as plain text or as a structured block
/// payload; user messages are always plain text.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    Structured(StructuredAnswer),
}

/// A structured answer: the classified intent plus renderable blocks.
#[derive(Debug, Clone)]
pub struct StructuredAnswer {
    pub intent: String,
    pub blocks: Vec<ContentBlock>,
    pub confidence: Option<f64>,
}

/// One renderable block of a structured answer. Which of the optional
/// fields is populated depends on the block kind.
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub title: Option<String>,
    pub text: Option<String>,
    pub list: Vec<String>,
    pub steps: Vec<AnswerStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Answer,
    Explanation,
    Steps,
    KeyPoints,
    Example,
    Code,
    Warning,
    Limitations,
    FollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStep {
    pub step: u32,
    pub text: String,
}

/// A pointer from an assistant answer into a source document page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub id: String,
    pub document_name: String,
    pub page_number: u32,
    pub section_title: String,
}

/// A document attached to one chat. Status moves from `Processing` to
/// `Ready` as backend ingestion completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Website,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Ready,
    Processing,
}

// A library-wide document record, independent of any single chat
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub pages: u32,
    pub size_bytes: u64,
}

/// The answer payload returned for one question.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub content: MessageContent,
    pub citations: Vec<Citation>,
}

/// A file handed to an upload operation.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fields a profile PATCH may change. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

/// Fields a chat PATCH may change.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    pub title: Option<String>,
}

/// Generated studio content for one (chat, tool) pair. The content shape
/// varies per tool, so it stays free-form JSON.
#[derive(Debug, Clone)]
pub struct StudioArtifact {
    pub tool_id: String,
    pub content: serde_json::Value,
}
