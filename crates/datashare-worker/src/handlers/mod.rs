//! Task handler implementations.

pub mod dataset;
pub mod share;

use std::sync::Arc;

use datashare_cloud::CloudProviders;
use datashare_database::ShareStore;
use datashare_service::ShareProcessorDispatcher;

pub use dataset::DatasetUpdatePublisher;
pub use share::ShareTaskHandler;

use crate::executor::TaskExecutor;

/// Build an executor with every built-in handler registered.
pub fn default_executor(
    store: Arc<dyn ShareStore>,
    dispatcher: ShareProcessorDispatcher,
    cloud: &CloudProviders,
) -> TaskExecutor {
    let mut executor = TaskExecutor::new();
    executor.register(Arc::new(ShareTaskHandler::approve(dispatcher.clone())));
    executor.register(Arc::new(ShareTaskHandler::revoke(dispatcher)));
    executor.register(Arc::new(DatasetUpdatePublisher::new(
        store,
        cloud.notifications.clone(),
    )));
    executor
}
