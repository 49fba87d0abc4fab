// SPDX-License-Identifier: MIT

//! Context & Preamble engine (§4.9 supplement, `agent.listContext`): a
//! per-agent saved-context slot and a separate preamble slot, both
//! event-sourced like every other mutation so peers replay them too.

use thrum_core::{AgentId, Clock};
use thrum_storage::repo::context::ContextSummary;

use crate::daemon::Daemon;
use crate::error::{DaemonError, SessionError};

impl<C: Clock> Daemon<C> {
    pub fn save_context(&self, agent_id: &AgentId, content: &str) -> Result<(), DaemonError> {
        let now = self.clock.utc_now();
        thrum_storage::repo::context::save_context(&self.store, agent_id, content, now).map_err(SessionError::from)?;
        self.emit_context_updated(agent_id, now, Some(content.to_string()), false)
    }

    pub fn show_context(&self, agent_id: &AgentId) -> Result<Option<String>, DaemonError> {
        Ok(thrum_storage::repo::context::show_context(&self.store, agent_id).map_err(SessionError::from)?)
    }

    pub fn clear_context(&self, agent_id: &AgentId) -> Result<(), DaemonError> {
        let now = self.clock.utc_now();
        thrum_storage::repo::context::clear_context(&self.store, agent_id).map_err(SessionError::from)?;
        self.emit_context_updated(agent_id, now, None, false)
    }

    pub fn save_preamble(&self, agent_id: &AgentId, content: &str) -> Result<(), DaemonError> {
        let now = self.clock.utc_now();
        thrum_storage::repo::context::save_preamble(&self.store, agent_id, content, now).map_err(SessionError::from)?;
        self.emit_context_updated(agent_id, now, Some(content.to_string()), true)
    }

    pub fn show_preamble(&self, agent_id: &AgentId) -> Result<Option<String>, DaemonError> {
        Ok(thrum_storage::repo::context::show_preamble(&self.store, agent_id).map_err(SessionError::from)?)
    }

    pub fn list_context_summaries(&self) -> Result<Vec<ContextSummary>, DaemonError> {
        Ok(thrum_storage::repo::context::list_summaries(&self.store).map_err(SessionError::from)?)
    }

    fn emit_context_updated(
        &self,
        agent_id: &AgentId,
        at: chrono::DateTime<chrono::Utc>,
        content: Option<String>,
        is_preamble: bool,
    ) -> Result<(), DaemonError> {
        thrum_storage::event_log::append(
            &self.store,
            &self.daemon_id,
            &thrum_core::EventPayload::ContextUpdated { agent_id: *agent_id, updated_at: at, content, is_preamble },
            at,
        )
        .map_err(SessionError::from)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
