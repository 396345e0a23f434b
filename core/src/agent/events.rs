use crate::agent::collaboration::{CollaborationResult, Stage};
use crate::agent::loop_::{RunOutcome, Step};
use crate::error::{AgentError, AgentResult};
use tokio::sync::mpsc;

pub(crate) const EVENT_BUFFER: usize = 256;

/// Progress reported at step and round boundaries.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Step(Step),
    Finished(RunOutcome),
    RoundStarted { stage: Stage },
    RoleResponded {
        stage: Stage,
        role: String,
        content: String,
    },
    Collaborated(CollaborationResult),
    Failed(String),
}

/// Optional event channel threaded through a run.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<AgentEvent>>,
}

impl EventSink {
    pub(crate) fn none() -> Self {
        Self { tx: None }
    }

    pub(crate) fn channel() -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self { tx: Some(tx) }, rx)
    }

    /// Fails with [`AgentError::Cancelled`] once the receiver is gone.
    pub(crate) fn ensure_open(&self) -> AgentResult<()> {
        match &self.tx {
            Some(tx) if tx.is_closed() => Err(AgentError::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) async fn emit(&self, event: AgentEvent) -> AgentResult<()> {
        if let Some(tx) = &self.tx {
            tx.send(event).await.map_err(|_| AgentError::Cancelled)?;
        }
        Ok(())
    }
}
