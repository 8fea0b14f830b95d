use anyhow::Result;
use async_trait::async_trait;

/// Narrow contract to the agent-lifecycle collaborator.
///
/// The coordinator only ever asks it to stop an agent when the agent's
/// contest ends; the call is best-effort and failures are logged, not
/// propagated.
#[async_trait]
pub trait AgentLifecycle: Send + Sync {
    async fn stop_agent(&self, agent_id: &str, reason: &str) -> Result<()>;
}
