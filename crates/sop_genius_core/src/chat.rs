//! crates/sop_genius_core/src/chat.rs
//!
//! Chat-list state as a pure reducer, plus the reconciliation merge that
//! folds a freshly fetched server list into local state. All ordering and
//! optimistic-update rules live here; the client's chat store only issues
//! network calls and dispatches these actions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::{Chat, Message, PdfDocument, Source};

//=========================================================================================
// Chat State
//=========================================================================================

/// The chat list plus the active chat's view.
///
/// `messages` and `sources` belong to the chat named by `active_chat_id`.
/// Message history is always written into the owning chat's slot in `chats`
/// first and mirrored into `messages` only while that chat is active, so a
/// reply landing after the user navigated away is kept, not dropped.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub chats: Vec<Chat>,
    pub active_chat_id: Option<String>,
    pub messages: Vec<Message>,
    pub sources: Vec<Source>,
    pub all_documents: Vec<PdfDocument>,
    pub is_loading: bool,
    pub is_uploading: bool,
    pub error: Option<String>,
}

//=========================================================================================
// Chat Actions
//=========================================================================================

#[derive(Debug, Clone)]
pub enum ChatAction {
    /// Switches the active chat context. Messages are re-derived from the
    /// owning chat's slot (empty when the id is unknown locally); sources are
    /// cleared until the next source fetch for the new chat returns.
    SetActiveChat(Option<String>),

    FetchStarted,
    /// A fresh server list arrived; reconcile it against local state.
    ChatsFetched(Vec<Chat>),
    FetchFailed(String),

    /// A chat appeared locally (optimistic create) or the backend confirmed
    /// one. Deduped by id: an existing entry is merged, never duplicated.
    ChatCreated(Chat),
    /// The backend rejected the creation outright. The optimistic entry is
    /// kept; the user already typed into it.
    CreateFailed(String),
    ChatDeleted(String),
    ChatRenamed {
        chat_id: String,
        title: String,
        updated_at: DateTime<Utc>,
    },
    /// The backend's copy of an updated chat.
    ChatUpdated(Chat),

    SendStarted,
    /// The optimistic user message, appended before the request is issued.
    UserMessageAppended { chat_id: String, message: Message },
    /// The assistant's reply. Carries the owning chat id so a reply for a
    /// background chat still lands in the right slot.
    AssistantMessageArrived { chat_id: String, message: Message },
    SendFailed(String),

    UploadStarted,
    SourcesUploaded { chat_id: String, sources: Vec<Source> },
    UploadFailed(String),
    /// The chat's full source list, as fetched (replaces, not appends).
    SourcesFetched { chat_id: String, sources: Vec<Source> },

    AllPdfsFetched(Vec<PdfDocument>),
}

/// Applies one action to a snapshot, returning the next snapshot.
pub fn reduce(state: &ChatState, action: ChatAction) -> ChatState {
    let mut next = state.clone();
    match action {
        ChatAction::SetActiveChat(chat_id) => {
            next.active_chat_id = chat_id;
            next.messages = derive_messages(&next.chats, next.active_chat_id.as_deref());
            next.sources = Vec::new();
        }

        ChatAction::FetchStarted => {
            next.is_loading = true;
            next.error = None;
        }
        ChatAction::ChatsFetched(remote) => {
            next.chats = merge_chats(&next.chats, remote);
            next.messages = derive_messages(&next.chats, next.active_chat_id.as_deref());
            next.is_loading = false;
        }
        ChatAction::FetchFailed(message) => {
            next.is_loading = false;
            next.error = Some(message);
        }

        ChatAction::ChatCreated(chat) => {
            match next.chats.iter_mut().find(|c| c.id == chat.id) {
                Some(existing) => *existing = merge_chat_pair(existing, chat),
                // Newest chats go first, matching the server's ordering.
                None => next.chats.insert(0, chat),
            }
            next.messages = derive_messages(&next.chats, next.active_chat_id.as_deref());
        }
        ChatAction::CreateFailed(message) => {
            next.error = Some(message);
        }
        ChatAction::ChatDeleted(chat_id) => {
            next.chats.retain(|c| c.id != chat_id);
            if next.active_chat_id.as_deref() == Some(chat_id.as_str()) {
                next.active_chat_id = None;
                next.messages = Vec::new();
                next.sources = Vec::new();
            }
        }
        ChatAction::ChatRenamed {
            chat_id,
            title,
            updated_at,
        } => {
            if let Some(chat) = next.chats.iter_mut().find(|c| c.id == chat_id) {
                chat.title = title;
                chat.updated_at = updated_at;
            }
        }
        ChatAction::ChatUpdated(chat) => {
            match next.chats.iter_mut().find(|c| c.id == chat.id) {
                Some(existing) => *existing = merge_chat_pair(existing, chat),
                None => next.chats.insert(0, chat),
            }
            next.messages = derive_messages(&next.chats, next.active_chat_id.as_deref());
        }

        ChatAction::SendStarted => {
            next.is_loading = true;
            next.error = None;
        }
        ChatAction::UserMessageAppended { chat_id, message } => {
            append_message(&mut next, &chat_id, message);
        }
        ChatAction::AssistantMessageArrived { chat_id, message } => {
            append_message(&mut next, &chat_id, message);
            next.is_loading = false;
        }
        ChatAction::SendFailed(message) => {
            next.is_loading = false;
            next.error = Some(message);
        }

        ChatAction::UploadStarted => {
            next.is_uploading = true;
            next.error = None;
        }
        ChatAction::SourcesUploaded { chat_id, sources } => {
            next.is_uploading = false;
            if next.active_chat_id.as_deref() == Some(chat_id.as_str()) {
                next.sources.extend(sources);
            }
        }
        ChatAction::UploadFailed(message) => {
            next.is_uploading = false;
            next.error = Some(message);
        }
        ChatAction::SourcesFetched { chat_id, sources } => {
            if next.active_chat_id.as_deref() == Some(chat_id.as_str()) {
                next.sources = sources;
            }
        }

        ChatAction::AllPdfsFetched(documents) => {
            next.all_documents = documents;
        }
    }
    next
}

/// Appends a message into the owning chat's slot and mirrors it into the
/// active view when that chat is active. A chat deleted while the request
/// was in flight has no slot left, so the message is dropped.
fn append_message(state: &mut ChatState, chat_id: &str, message: Message) {
    let Some(chat) = state.chats.iter_mut().find(|c| c.id == chat_id) else {
        return;
    };
    chat.updated_at = message.timestamp;
    chat.messages.push(message.clone());
    if state.active_chat_id.as_deref() == Some(chat_id) {
        state.messages.push(message);
    }
}

/// The active chat's messages, cloned out of its slot. Display order is
/// append order; nothing is ever re-sorted by timestamp.
fn derive_messages(chats: &[Chat], active: Option<&str>) -> Vec<Message> {
    let Some(active) = active else {
        return Vec::new();
    };
    chats
        .iter()
        .find(|c| c.id == active)
        .map(|c| c.messages.clone())
        .unwrap_or_default()
}

//=========================================================================================
// Reconciliation
//=========================================================================================

/// Folds a fetched server list into local state.
///
/// The server's list and ordering are authoritative; local-only chats
/// (optimistic creations the server has not confirmed yet) are kept ahead of
/// it. For chats both sides know, `merge_chat_pair` decides field by field.
pub fn merge_chats(local: &[Chat], remote: Vec<Chat>) -> Vec<Chat> {
    let remote_ids: HashSet<&str> = remote.iter().map(|c| c.id.as_str()).collect();
    let mut merged: Vec<Chat> = Vec::with_capacity(local.len() + remote.len());
    for chat in local {
        if !remote_ids.contains(chat.id.as_str()) {
            merged.push(chat.clone());
        }
    }
    for remote_chat in remote {
        let folded = match local.iter().find(|c| c.id == remote_chat.id) {
            Some(local_chat) => merge_chat_pair(local_chat, remote_chat),
            None => remote_chat,
        };
        merged.push(folded);
    }
    merged
}

/// Remote wins for every shared field. The one exception is the optimistic
/// message tail: local messages the server has not seen (unknown id) that
/// are strictly newer than the newest remote message stay appended, so a
/// list refresh racing a send cannot drop the just-sent message.
pub fn merge_chat_pair(local: &Chat, mut remote: Chat) -> Chat {
    let newest_remote = remote.messages.iter().map(|m| m.timestamp).max();
    let remote_message_ids: HashSet<&str> =
        remote.messages.iter().map(|m| m.id.as_str()).collect();
    let tail: Vec<Message> = local
        .messages
        .iter()
        .filter(|m| !remote_message_ids.contains(m.id.as_str()))
        .filter(|m| newest_remote.map_or(true, |newest| m.timestamp > newest))
        .cloned()
        .collect();
    remote.messages.extend(tail);
    remote
}
