use crate::{error::AgentResult, trajectory::TrajectoryItem};
use futures::Stream;
use std::{pin::Pin,
          task::{Context, Poll}};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Items of a streamed run, in the order they were appended to the trajectory
///
/// The stream ends after a handoff, the step limit, or the first error. Dropping it early stops the
/// run at its next suspension point.
pub struct TrajectoryStream {
    receiver: mpsc::Receiver<AgentResult<TrajectoryItem>>,
    cancel: CancellationToken,
}

impl TrajectoryStream {
    pub(crate) fn new(receiver: mpsc::Receiver<AgentResult<TrajectoryItem>>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Next item, or `None` once the run has stopped
    pub async fn next_item(&mut self) -> Option<AgentResult<TrajectoryItem>> {
        self.receiver.recv().await
    }

    /// Token that stops the producing run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for TrajectoryStream {
    type Item = AgentResult<TrajectoryItem>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for TrajectoryStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
