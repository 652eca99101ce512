//! Dispatch: given a task type, pick the lowest-priority agent that
//! declares support for it.

use std::sync::Arc;

use itin_store::DocumentStore;

use crate::agent::Agent;

pub struct AgentRegistry<S: DocumentStore> {
    agents: Vec<Arc<dyn Agent<S>>>,
}

impl<S: DocumentStore> AgentRegistry<S> {
    #[must_use]
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    pub fn register(&mut self, agent: Arc<dyn Agent<S>>) {
        self.agents.push(agent);
    }

    /// Lowest-priority agent (lower number wins) whose `supported_tasks`
    /// contains `task_type`.
    #[must_use]
    pub fn dispatch(&self, task_type: &str) -> Option<Arc<dyn Agent<S>>> {
        self.agents
            .iter()
            .filter(|a| a.capabilities().supported_tasks.contains(task_type))
            .min_by_key(|a| a.capabilities().priority)
            .cloned()
    }

    /// As [`dispatch`](Self::dispatch), but only considers agents with
    /// `chat_enabled = true`.
    #[must_use]
    pub fn dispatch_chat(&self, task_type: &str) -> Option<Arc<dyn Agent<S>>> {
        self.agents
            .iter()
            .filter(|a| a.capabilities().chat_enabled && a.capabilities().supported_tasks.contains(task_type))
            .min_by_key(|a| a.capabilities().priority)
            .cloned()
    }
}

impl<S: DocumentStore> Default for AgentRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
