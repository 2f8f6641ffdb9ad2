//! Share objects: state machines, managers, processing, and the request service.

pub mod context;
pub mod dispatcher;
pub mod manager;
pub mod processor;
pub mod service;
pub mod state_machine;

pub use context::ShareContext;
pub use dispatcher::ShareProcessorDispatcher;
pub use manager::{BucketShareManager, ShareManager, TableShareManager};
pub use processor::{ShareFlow, ShareProcessor};
pub use service::ShareObjectService;
pub use state_machine::{
    ShareItemAction, ShareItemStateMachine, ShareObjectAction, ShareObjectStateMachine,
};
