//! Share grant and revoke runs.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use datashare_core::types::ShareId;
use datashare_entity::task::{Task, action};
use datashare_service::ShareProcessorDispatcher;
use datashare_service::share::ShareFlow;

use crate::executor::{TaskExecutionError, TaskHandler};

/// Runs the dispatcher for the share a task targets.
///
/// Item failures are recorded on the items themselves, so a run that
/// leaves some items failed still completes the task.
#[derive(Debug)]
pub struct ShareTaskHandler {
    dispatcher: ShareProcessorDispatcher,
    flow: ShareFlow,
}

impl ShareTaskHandler {
    /// Handler for `ecs.share.approve`.
    pub fn approve(dispatcher: ShareProcessorDispatcher) -> Self {
        Self {
            dispatcher,
            flow: ShareFlow::Share,
        }
    }

    /// Handler for `ecs.share.revoke`.
    pub fn revoke(dispatcher: ShareProcessorDispatcher) -> Self {
        Self {
            dispatcher,
            flow: ShareFlow::Revoke,
        }
    }
}

#[async_trait]
impl TaskHandler for ShareTaskHandler {
    fn action(&self) -> &str {
        match self.flow {
            ShareFlow::Share => action::SHARE_APPROVE,
            ShareFlow::Revoke => action::SHARE_REVOKE,
        }
    }

    async fn execute(&self, task: &Task) -> Result<Option<Value>, TaskExecutionError> {
        let share_id = ShareId::from(task.target_uri);
        let result = match self.flow {
            ShareFlow::Share => self.dispatcher.approve_share(share_id).await,
            ShareFlow::Revoke => self.dispatcher.revoke_share(share_id).await,
        };
        let succeeded = result.map_err(TaskExecutionError::classify)?;

        if succeeded {
            info!(task_id = %task.id, share_id = %share_id, "Share run succeeded");
        } else {
            warn!(task_id = %task.id, share_id = %share_id, "Share run finished with failed items");
        }
        Ok(Some(json!({ "shareId": share_id.to_string(), "succeeded": succeeded })))
    }
}
