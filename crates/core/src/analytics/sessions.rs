use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalyticsAggregator, TimeWindow};
use crate::domain::conversation::{MessageRole, SessionStatus};
use crate::domain::user::UserId;
use crate::errors::EngineResult;

/// Conversation activity for one user or for everyone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub user_id: Option<UserId>,
    pub window: TimeWindow,
    /// Every status is present, zero when unused
    pub counts_by_status: BTreeMap<SessionStatus, u64>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub messages_by_role: BTreeMap<MessageRole, u64>,
    /// Zero when no session matched
    pub avg_messages_per_session: f64,
    /// Mean over messages carrying AI metadata; `None` when there are none
    pub avg_response_latency_ms: Option<f64>,
    /// Mean over metadata that reports a confidence
    pub avg_confidence: Option<f64>,
    /// Sum of the tokens reported in AI metadata
    pub total_tokens_used: u64,
    /// Mean of first-to-last message span over sessions with messages
    pub avg_session_duration_secs: Option<f64>,
}

impl<'a> AnalyticsAggregator<'a> {
    /// Sessions created inside the window, optionally for one user.
    pub fn session_stats(
        &self,
        user_id: Option<UserId>,
        window: &TimeWindow,
    ) -> EngineResult<SessionStats> {
        window.validate()?;
        if let Some(user_id) = user_id {
            self.snapshot.user(user_id)?;
        }

        let mut counts_by_status: BTreeMap<SessionStatus, u64> =
            SessionStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        let mut messages_by_role: BTreeMap<MessageRole, u64> =
            MessageRole::ALL.into_iter().map(|role| (role, 0)).collect();
        let mut total_sessions = 0u64;
        let mut total_messages = 0u64;
        let mut latency = Mean::default();
        let mut confidence = Mean::default();
        let mut duration = Mean::default();
        let mut total_tokens_used = 0u64;

        let sessions = self.snapshot.sessions().iter().filter(|session| {
            user_id.map_or(true, |user_id| session.user_id == user_id)
                && window.contains_instant(session.created_at)
        });

        for session in sessions {
            total_sessions += 1;
            *counts_by_status.entry(session.status).or_insert(0) += 1;

            let first = session.messages.iter().map(|message| message.timestamp).min();
            let last = session.messages.iter().map(|message| message.timestamp).max();
            if let (Some(first), Some(last)) = (first, last) {
                duration.add((last - first).num_milliseconds() as f64 / 1000.0);
            }

            for message in &session.messages {
                total_messages += 1;
                *messages_by_role.entry(message.role).or_insert(0) += 1;

                if let Some(metadata) = &message.ai_metadata {
                    latency.add(metadata.response_latency_ms as f64);
                    if let Some(score) = metadata.confidence_score {
                        confidence.add(score);
                    }
                    total_tokens_used += metadata.tokens_used.map_or(0, u64::from);
                }
            }
        }

        let avg_messages_per_session =
            if total_sessions == 0 { 0.0 } else { total_messages as f64 / total_sessions as f64 };

        debug!(
            event_name = "analytics.session_stats",
            user_id = ?user_id,
            total_sessions,
            total_messages,
            total_tokens_used,
            "session stats computed"
        );

        Ok(SessionStats {
            user_id,
            window: *window,
            counts_by_status,
            total_sessions,
            total_messages,
            messages_by_role,
            avg_messages_per_session,
            avg_response_latency_ms: latency.value(),
            avg_confidence: confidence.value(),
            total_tokens_used,
            avg_session_duration_secs: duration.value(),
        })
    }
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: u64,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
