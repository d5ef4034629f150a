//! services/client/src/store/studio.rs
//!
//! The studio store: triggers asynchronous content generation on the backend
//! and polls until the artifact appears or the attempt budget runs out. One
//! poll loop per (chat, tool) pair; the ticks are strictly sequential, so a
//! slow response delays the next tick instead of overlapping it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use sop_genius_core::ports::{PortResult, StudioApi};
use sop_genius_core::studio::{BeginGeneration, GenerateOutcome, StudioState};

//=========================================================================================
// The Studio Store
//=========================================================================================

pub struct StudioStore {
    api: Arc<dyn StudioApi>,
    state: RwLock<StudioState>,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl StudioStore {
    pub fn new(api: Arc<dyn StudioApi>, poll_interval: Duration, poll_attempts: u32) -> Self {
        Self {
            api,
            state: RwLock::new(StudioState::default()),
            poll_interval,
            poll_attempts,
        }
    }

    pub async fn snapshot(&self) -> StudioState {
        self.state.read().await.clone()
    }

    /// Fetches and caches everything already generated for this chat, so
    /// tools finished in a previous session reveal without regeneration.
    pub async fn load(&self, chat_id: &str) -> PortResult<()> {
        let artifacts = self.api.fetch_artifacts(chat_id).await?;
        self.state.write().await.load(chat_id, artifacts);
        Ok(())
    }

    /// Produces the tool's content for this chat. Cached content is revealed
    /// immediately; an in-flight generation for the same pair is left alone;
    /// otherwise the backend job is started and its artifact list polled
    /// until the content appears or the attempt budget is spent. A timeout is
    /// an outcome, not an error: the job may still finish server side, and a
    /// later `load` will pick it up.
    pub async fn generate(&self, chat_id: &str, tool_id: &str) -> PortResult<GenerateOutcome> {
        // Check and mark under one lock, so two racing calls cannot both
        // start a loop for the same pair.
        let begin = self.state.write().await.begin_generation(chat_id, tool_id);
        match begin {
            BeginGeneration::CachedRevealed => return Ok(GenerateOutcome::Revealed),
            BeginGeneration::AlreadyGenerating => return Ok(GenerateOutcome::AlreadyGenerating),
            BeginGeneration::Started => {}
        }

        if let Err(e) = self.api.start_generation(chat_id, tool_id).await {
            warn!("Starting {} generation for chat {} failed: {}", tool_id, chat_id, e);
            self.state.write().await.settle(chat_id, tool_id);
            return Err(e);
        }
        info!("Generating {} for chat {}, waiting for content", tool_id, chat_id);

        for attempt in 1..=self.poll_attempts {
            sleep(self.poll_interval).await;
            match self.api.fetch_artifacts(chat_id).await {
                Ok(artifacts) => {
                    if let Some(artifact) =
                        artifacts.into_iter().find(|a| a.tool_id == tool_id)
                    {
                        debug!(
                            "{} for chat {} ready after {} polls",
                            tool_id, chat_id, attempt
                        );
                        self.state
                            .write()
                            .await
                            .complete(chat_id, tool_id, artifact.content);
                        return Ok(GenerateOutcome::Ready);
                    }
                }
                Err(e) if e.is_session_expired() => {
                    self.state.write().await.settle(chat_id, tool_id);
                    return Err(e);
                }
                // A flaky poll is not fatal; the next tick may succeed.
                Err(e) => {
                    warn!(
                        "Poll {} for {} on chat {} failed: {}",
                        attempt, tool_id, chat_id, e
                    );
                }
            }
        }

        warn!(
            "Gave up waiting for {} on chat {} after {} polls",
            tool_id, chat_id, self.poll_attempts
        );
        self.state.write().await.settle(chat_id, tool_id);
        Ok(GenerateOutcome::TimedOut)
    }

    /// Deletes the tool's content on the backend and drops it from the
    /// cache; the detail view closes if it was showing this artifact.
    pub async fn delete(&self, chat_id: &str, tool_id: &str) -> PortResult<()> {
        self.api.delete_artifact(chat_id, tool_id).await?;
        self.state.write().await.delete(chat_id, tool_id);
        Ok(())
    }

    pub async fn reveal(&self, chat_id: &str, tool_id: &str) {
        self.state.write().await.reveal(chat_id, tool_id);
    }

    pub async fn close_view(&self) {
        self.state.write().await.close_view();
    }
}
