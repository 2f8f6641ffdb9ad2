//! # datashare-service
//!
//! Share lifecycle logic for DataShare: the item and aggregate state
//! machines, per-kind share managers, the processors and dispatcher that
//! drive approved work through the managers, and the request services
//! that users act through.
//!
//! Every operation runs inside one [`ShareSession`](datashare_database::ShareSession)
//! opened from the injected store.

pub mod context;
pub mod dataset;
pub mod share;

pub use context::RequestContext;
pub use dataset::DatasetTableService;
pub use share::{
    ShareContext, ShareItemAction, ShareItemStateMachine, ShareManager, ShareObjectAction,
    ShareObjectService, ShareObjectStateMachine, ShareProcessor, ShareProcessorDispatcher,
};
