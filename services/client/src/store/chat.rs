//! services/client/src/store/chat.rs
//!
//! The chat store: owns the `ChatState` snapshot and wraps every `ChatApi`
//! call with the reducer actions that keep the chat list, the active thread,
//! and the source panel consistent. Optimistic writes (chat creation, the
//! user's own message) happen before their network call is issued.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use sop_genius_core::chat::{reduce, ChatAction, ChatState};
use sop_genius_core::domain::{
    Chat, ChatUpdate, FileUpload, Message, MessageContent, Role, Source,
};
use sop_genius_core::ports::{ChatApi, PortError, PortResult};

//=========================================================================================
// The Chat Store
//=========================================================================================

pub struct ChatStore {
    api: Arc<dyn ChatApi>,
    state: RwLock<ChatState>,
}

impl ChatStore {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self {
            api,
            state: RwLock::new(ChatState::default()),
        }
    }

    pub async fn snapshot(&self) -> ChatState {
        self.state.read().await.clone()
    }

    async fn dispatch(&self, action: ChatAction) {
        let mut state = self.state.write().await;
        *state = reduce(&state, action);
    }

    //=====================================================================================
    // Chat Lifecycle
    //=====================================================================================

    /// Makes sure a chat with this id exists, locally and on the backend.
    /// Navigating to a fresh chat route calls this with a newly generated id:
    /// the chat appears immediately (optimistic) and the backend create runs
    /// behind it. A 409 means another navigation already created it, which is
    /// the same outcome. Safe to call repeatedly.
    pub async fn ensure_chat(&self, chat_id: &str) -> PortResult<()> {
        if self
            .state
            .read()
            .await
            .chats
            .iter()
            .any(|c| c.id == chat_id)
        {
            return Ok(());
        }

        let now = Utc::now();
        let optimistic = Chat {
            id: chat_id.to_string(),
            title: "New Chat".to_string(),
            pdf_ids: Vec::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.dispatch(ChatAction::ChatCreated(optimistic)).await;

        match self.api.create_chat(chat_id, "New Chat").await {
            Ok(chat) => {
                self.dispatch(ChatAction::ChatCreated(chat)).await;
                Ok(())
            }
            Err(PortError::Status { status: 409, .. }) => {
                debug!("Chat {} already existed on the backend", chat_id);
                Ok(())
            }
            Err(e) => {
                warn!("Creating chat {} failed: {}", chat_id, e);
                self.dispatch(ChatAction::CreateFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    pub async fn set_active_chat(&self, chat_id: Option<String>) {
        self.dispatch(ChatAction::SetActiveChat(chat_id)).await;
    }

    pub async fn fetch_chats(&self) -> PortResult<()> {
        self.dispatch(ChatAction::FetchStarted).await;
        match self.api.fetch_chats().await {
            Ok(chats) => {
                self.dispatch(ChatAction::ChatsFetched(chats)).await;
                Ok(())
            }
            Err(e) => {
                self.dispatch(ChatAction::FetchFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    pub async fn delete_chat(&self, chat_id: &str) -> PortResult<()> {
        self.api.delete_chat(chat_id).await?;
        self.dispatch(ChatAction::ChatDeleted(chat_id.to_string()))
            .await;
        Ok(())
    }

    pub async fn rename_chat(&self, chat_id: &str, title: &str) -> PortResult<()> {
        self.api.rename_chat(chat_id, title).await?;
        self.dispatch(ChatAction::ChatRenamed {
            chat_id: chat_id.to_string(),
            title: title.to_string(),
            updated_at: Utc::now(),
        })
        .await;
        Ok(())
    }

    pub async fn update_chat(&self, chat_id: &str, update: &ChatUpdate) -> PortResult<()> {
        let chat = self.api.update_chat(chat_id, update).await?;
        self.dispatch(ChatAction::ChatUpdated(chat)).await;
        Ok(())
    }

    //=====================================================================================
    // Messaging
    //=====================================================================================

    /// Sends a question to the assistant. The user's message is appended
    /// before the request goes out, so it always renders above the eventual
    /// reply; a failed send keeps it in place with the error alongside.
    pub async fn send_message(&self, chat_id: &str, question: &str) -> PortResult<()> {
        let user_message = Message {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: MessageContent::Text(question.to_string()),
            citations: Vec::new(),
            timestamp: Utc::now(),
        };
        self.dispatch(ChatAction::UserMessageAppended {
            chat_id: chat_id.to_string(),
            message: user_message,
        })
        .await;
        self.dispatch(ChatAction::SendStarted).await;

        match self.api.send_message(chat_id, question).await {
            Ok(answer) => {
                let reply = Message {
                    id: Uuid::new_v4().to_string(),
                    role: Role::Assistant,
                    content: answer.content,
                    citations: answer.citations,
                    timestamp: Utc::now(),
                };
                self.dispatch(ChatAction::AssistantMessageArrived {
                    chat_id: chat_id.to_string(),
                    message: reply,
                })
                .await;
                Ok(())
            }
            Err(e) => {
                self.dispatch(ChatAction::SendFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    //=====================================================================================
    // Documents
    //=====================================================================================

    pub async fn upload_pdfs(
        &self,
        chat_id: &str,
        files: Vec<FileUpload>,
    ) -> PortResult<Vec<Source>> {
        self.dispatch(ChatAction::UploadStarted).await;
        match self.api.upload_pdfs(chat_id, files).await {
            Ok(sources) => {
                self.dispatch(ChatAction::SourcesUploaded {
                    chat_id: chat_id.to_string(),
                    sources: sources.clone(),
                })
                .await;
                Ok(sources)
            }
            Err(e) => {
                self.dispatch(ChatAction::UploadFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    pub async fn fetch_chat_pdfs(&self, chat_id: &str) -> PortResult<()> {
        let sources = self.api.fetch_chat_pdfs(chat_id).await?;
        self.dispatch(ChatAction::SourcesFetched {
            chat_id: chat_id.to_string(),
            sources,
        })
        .await;
        Ok(())
    }

    pub async fn fetch_all_pdfs(&self) -> PortResult<()> {
        let documents = self.api.fetch_all_pdfs().await?;
        self.dispatch(ChatAction::AllPdfsFetched(documents)).await;
        Ok(())
    }
}
