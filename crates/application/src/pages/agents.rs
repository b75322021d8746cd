use fundline_core::AppResult;
use fundline_domain::{
    AgentCommand, AgentStatus, MutationAck, Page, Permission, QueryKey, RecordId, Resource,
};
use serde_json::Value;
use tracing::info;

use super::{PageContext, decode_ack};
use super::view::ResourceView;
use crate::mutation::Mutation;
use crate::query_cache::{PollHandle, QueryPolicy};

/// Agents screen: live status table and start/stop controls.
pub struct AgentsPage {
    ctx: PageContext,
    policy: QueryPolicy,
}

impl AgentsPage {
    /// Creates the controller with the live polling policy.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            policy: QueryPolicy::live(),
        }
    }

    /// Overrides the polling interval, for example from configuration.
    #[must_use]
    pub fn with_policy(mut self, policy: QueryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Agent status rows.
    pub async fn status(&self) -> ResourceView<Vec<AgentStatus>> {
        let snapshot = self
            .ctx
            .cache()
            .read(&QueryKey::root(Resource::Agents), &self.policy)
            .await;
        ResourceView::decode_with(&snapshot, |value| {
            Page::from_value(value, Resource::Agents.collection_field()).map(|page| page.items)
        })
    }

    /// Keeps the status rows fresh while the handle is alive.
    #[must_use]
    pub fn watch_status(&self) -> PollHandle {
        self.ctx
            .cache()
            .poll(&QueryKey::root(Resource::Agents), &self.policy)
    }

    /// Sends a start, stop or restart command.
    pub async fn command(&self, agent_id: &RecordId, command: AgentCommand) -> AppResult<MutationAck> {
        let value = self
            .ctx
            .mutate(
                &Permission::admin(Resource::Agents),
                Mutation::action(Resource::Agents, format!("/agents/{agent_id}/{command}")),
            )
            .await?;
        info!(%agent_id, %command, "agent command accepted");

        let ack = decode_ack(&value).map_err(|error| self.ctx.decode_failure(error))?;
        let message = ack
            .message
            .clone()
            .unwrap_or_else(|| format!("Agent {agent_id}: {command} requested"));
        self.ctx.confirm(&message);
        Ok(ack)
    }

    /// Starts an agent.
    pub async fn start(&self, agent_id: &RecordId) -> AppResult<MutationAck> {
        self.command(agent_id, AgentCommand::Start).await
    }

    /// Stops an agent.
    pub async fn stop(&self, agent_id: &RecordId) -> AppResult<MutationAck> {
        self.command(agent_id, AgentCommand::Stop).await
    }

    /// Restarts an agent.
    pub async fn restart(&self, agent_id: &RecordId) -> AppResult<MutationAck> {
        self.command(agent_id, AgentCommand::Restart).await
    }

    /// Performance counters for one agent type.
    pub async fn metrics(&self, agent_type: &str) -> ResourceView<Value> {
        let key = QueryKey::build(Resource::Agents, format!("/agents/{agent_type}/metrics"), &());
        let snapshot = self.ctx.cache().read(&key, &QueryPolicy::dashboard()).await;
        ResourceView::from_snapshot(&snapshot)
    }
}
