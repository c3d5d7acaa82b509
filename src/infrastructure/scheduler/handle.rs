//! Scheduler Handle
//! What `init_scheduler` gives back: the notice stream and the scheduler task.

use getset::{Getters, MutGetters};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::{JoinError, JoinHandle},
};

use super::commands::SchedulerNotice;

/// Caller side of a running scheduler: its notices and its task
#[derive(Debug, Getters, MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct SchedulerHandle {
    notices: broadcast::Receiver<SchedulerNotice>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn new(notices: broadcast::Receiver<SchedulerNotice>, task: JoinHandle<()>) -> Self {
        Self { notices, task }
    }

    /// `None` once the scheduler is gone. Skips over notices missed by a slow reader.
    pub async fn next_notice(&mut self) -> Option<SchedulerNotice> {
        loop {
            match self.notices.recv().await {
                Ok(notice) => return Some(notice),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the first notice matching `predicate`, discarding the ones before it
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<SchedulerNotice>
    where
        F: FnMut(&SchedulerNotice) -> bool,
    {
        while let Some(notice) = self.next_notice().await {
            if predicate(&notice) {
                return Some(notice);
            }
        }
        None
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}
