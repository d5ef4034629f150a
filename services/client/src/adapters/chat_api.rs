//! services/client/src/adapters/chat_api.rs
//!
//! This module contains the HTTP adapter for chat, message, and document
//! operations, the concrete implementation of the `ChatApi` port from the
//! `core` crate. Everything here flows through the refreshing transport.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use sop_genius_core::domain::{
    AnswerStep, BlockKind, Chat, ChatAnswer, ChatUpdate, Citation, ContentBlock, FileUpload,
    Message, MessageContent, PdfDocument, Role, Source, SourceKind, SourceStatus, StructuredAnswer,
};
use sop_genius_core::ports::{ChatApi, PortError, PortResult};

use crate::http::transport::{read_json, read_ok, PartSpec, RequestSpec, Transport};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `ChatApi` port.
#[derive(Clone)]
pub struct ChatHttp {
    base_url: String,
    transport: Arc<Transport>,
}

impl ChatHttp {
    pub fn new(base_url: impl Into<String>, transport: Arc<Transport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//=========================================================================================
// Timestamp Decoding
//=========================================================================================

/// Chat timestamps are inconsistent on the wire: RFC 3339 strings from the
/// database, epoch milliseconds from client-persisted messages, sometimes
/// null. Anything undecodable falls back to "now" rather than failing the
/// whole payload.
mod ts {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(decode(raw.as_ref()))
    }

    pub fn decode(value: Option<&Value>) -> DateTime<Utc> {
        match value {
            Some(Value::String(s)) => s.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
            _ => Utc::now(),
        }
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    title: Option<String>,
    #[serde(default)]
    pdf_ids: Vec<String>,
    #[serde(default)]
    messages: Vec<MessageRecord>,
    #[serde(deserialize_with = "ts::deserialize", default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(deserialize_with = "ts::deserialize", default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl ChatRecord {
    fn to_domain(self) -> Chat {
        Chat {
            id: self.id,
            // An empty or missing title renders as the placeholder.
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "New Chat".to_string()),
            pdf_ids: self.pdf_ids,
            messages: self.messages.into_iter().map(MessageRecord::to_domain).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    role: RoleRecord,
    content: ContentRecord,
    #[serde(default)]
    citations: Vec<CitationRecord>,
    #[serde(deserialize_with = "ts::deserialize", default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            role: self.role.to_domain(),
            content: self.content.to_domain(),
            citations: self
                .citations
                .into_iter()
                .map(CitationRecord::to_domain)
                .collect(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RoleRecord {
    User,
    Assistant,
}

impl RoleRecord {
    fn to_domain(self) -> Role {
        match self {
            RoleRecord::User => Role::User,
            RoleRecord::Assistant => Role::Assistant,
        }
    }
}

/// Answers are either a plain string or a structured block payload, with no
/// tag on the wire to tell them apart.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentRecord {
    Text(String),
    Structured(StructuredAnswerRecord),
}

impl ContentRecord {
    fn to_domain(self) -> MessageContent {
        match self {
            ContentRecord::Text(text) => MessageContent::Text(text),
            ContentRecord::Structured(answer) => MessageContent::Structured(answer.to_domain()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredAnswerRecord {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    blocks: Vec<BlockRecord>,
    confidence: Option<f64>,
}

impl StructuredAnswerRecord {
    fn to_domain(self) -> StructuredAnswer {
        StructuredAnswer {
            intent: self.intent,
            blocks: self.blocks.into_iter().map(BlockRecord::to_domain).collect(),
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockRecord {
    #[serde(rename = "type")]
    kind: BlockKindRecord,
    title: Option<String>,
    text: Option<String>,
    #[serde(default)]
    list: Vec<String>,
    #[serde(default)]
    steps: Vec<StepRecord>,
}

impl BlockRecord {
    fn to_domain(self) -> ContentBlock {
        ContentBlock {
            kind: self.kind.to_domain(),
            title: self.title,
            text: self.text,
            list: self.list,
            steps: self
                .steps
                .into_iter()
                .map(|s| AnswerStep {
                    step: s.step,
                    text: s.text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BlockKindRecord {
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

impl BlockKindRecord {
    fn to_domain(self) -> BlockKind {
        match self {
            BlockKindRecord::Answer => BlockKind::Answer,
            BlockKindRecord::Explanation => BlockKind::Explanation,
            BlockKindRecord::Steps => BlockKind::Steps,
            BlockKindRecord::KeyPoints => BlockKind::KeyPoints,
            BlockKindRecord::Example => BlockKind::Example,
            BlockKindRecord::Code => BlockKind::Code,
            BlockKindRecord::Warning => BlockKind::Warning,
            BlockKindRecord::Limitations => BlockKind::Limitations,
            BlockKindRecord::FollowUp => BlockKind::FollowUp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StepRecord {
    step: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationRecord {
    id: String,
    document_name: String,
    page_number: u32,
    section_title: String,
}

impl CitationRecord {
    fn to_domain(self) -> Citation {
        Citation {
            id: self.id,
            document_name: self.document_name,
            page_number: self.page_number,
            section_title: self.section_title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatsResponse {
    #[serde(default)]
    chats: Vec<ChatRecord>,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    chat: Option<ChatRecord>,
}

impl ChatEnvelope {
    fn into_chat(self) -> PortResult<Chat> {
        match self.chat {
            Some(record) => Ok(record.to_domain()),
            None => Err(PortError::Unexpected(
                "Response did not include a chat".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: ContentRecord,
    #[serde(default)]
    citations: Vec<CitationRecord>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    files: Vec<UploadedFileRecord>,
}

#[derive(Debug, Deserialize)]
struct UploadedFileRecord {
    id: String,
    name: String,
    status: Option<String>,
}

impl UploadedFileRecord {
    fn to_domain(self) -> Source {
        Source {
            id: self.id,
            name: self.name,
            kind: SourceKind::Pdf,
            status: match self.status.as_deref() {
                Some("ready") => SourceStatus::Ready,
                _ => SourceStatus::Processing,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatPdfsResponse {
    #[serde(default)]
    pdfs: Vec<ChatPdfRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPdfRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    pdf_name: String,
}

impl ChatPdfRecord {
    fn to_domain(self) -> Source {
        // Anything listed for a chat has finished ingestion.
        Source {
            id: self.id,
            name: self.pdf_name,
            kind: SourceKind::Pdf,
            status: SourceStatus::Ready,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AllPdfsResponse {
    #[serde(default)]
    pdfs: Vec<LibraryPdfRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryPdfRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    pdf_name: String,
    #[serde(deserialize_with = "ts::deserialize", default = "Utc::now")]
    created_at: DateTime<Utc>,
    /// Arrives as a string on the wire; parses leniently to 0.
    pdf_pages: Option<serde_json::Value>,
    #[serde(default)]
    pdf_size: u64,
}

impl LibraryPdfRecord {
    fn to_domain(self) -> PdfDocument {
        let pages = match self.pdf_pages {
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
            _ => 0,
        };
        PdfDocument {
            id: self.id,
            name: self.pdf_name,
            created_at: self.created_at,
            pages,
            size_bytes: self.pdf_size,
        }
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl ChatApi for ChatHttp {
    async fn create_chat(&self, chat_id: &str, title: &str) -> PortResult<Chat> {
        let spec = RequestSpec::post_json(
            self.url("/api/chat/"),
            json!({ "chatId": chat_id, "title": title }),
        );
        let envelope: ChatEnvelope =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        envelope.into_chat()
    }

    async fn fetch_chats(&self) -> PortResult<Vec<Chat>> {
        let spec = RequestSpec::get(self.url("/api/chat/"));
        let response: ChatsResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(response.chats.into_iter().map(ChatRecord::to_domain).collect())
    }

    async fn update_chat(&self, chat_id: &str, update: &ChatUpdate) -> PortResult<Chat> {
        let mut body = serde_json::Map::new();
        body.insert("chatId".to_string(), json!(chat_id));
        if let Some(title) = &update.title {
            body.insert("title".to_string(), json!(title));
        }
        let spec = RequestSpec::patch_json(self.url("/api/chat/"), body.into());
        let envelope: ChatEnvelope =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        envelope.into_chat()
    }

    async fn rename_chat(&self, chat_id: &str, title: &str) -> PortResult<()> {
        let spec = RequestSpec::patch_json(
            self.url("/api/chat/rename"),
            json!({ "chatId": chat_id, "title": title }),
        );
        read_ok(self.transport.send_with_refresh(spec).await?).await
    }

    async fn delete_chat(&self, chat_id: &str) -> PortResult<()> {
        // The id rides in the body, not the path.
        let spec = RequestSpec::delete_json(self.url("/api/chat/"), json!({ "chatId": chat_id }));
        read_ok(self.transport.send_with_refresh(spec).await?).await
    }

    async fn send_message(&self, chat_id: &str, question: &str) -> PortResult<ChatAnswer> {
        let spec = RequestSpec::post_json(
            self.url("/api/chat/message"),
            json!({ "chatId": chat_id, "question": question }),
        );
        let response: AnswerResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(ChatAnswer {
            content: response.answer.to_domain(),
            citations: response
                .citations
                .into_iter()
                .map(CitationRecord::to_domain)
                .collect(),
        })
    }

    async fn upload_pdfs(&self, chat_id: &str, files: Vec<FileUpload>) -> PortResult<Vec<Source>> {
        let mut parts: Vec<PartSpec> = files
            .into_iter()
            .map(|f| PartSpec::File {
                name: "pdfs".to_string(),
                file_name: f.file_name,
                bytes: Bytes::from(f.bytes),
            })
            .collect();
        parts.push(PartSpec::Text {
            name: "chatId".to_string(),
            value: chat_id.to_string(),
        });

        let spec = RequestSpec::post_multipart(self.url("/api/chat/upload"), parts);
        let response: UploadResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(response
            .files
            .into_iter()
            .map(UploadedFileRecord::to_domain)
            .collect())
    }

    async fn fetch_chat_pdfs(&self, chat_id: &str) -> PortResult<Vec<Source>> {
        let spec = RequestSpec::get(self.url(&format!("/api/chat/pdfs/{chat_id}")));
        let response: ChatPdfsResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(response.pdfs.into_iter().map(ChatPdfRecord::to_domain).collect())
    }

    async fn fetch_all_pdfs(&self) -> PortResult<Vec<PdfDocument>> {
        let spec = RequestSpec::get(self.url("/api/chat/all-pdfs"));
        let response: AllPdfsResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(response.pdfs.into_iter().map(LibraryPdfRecord::to_domain).collect())
    }
}
