//! PostgreSQL repositories for all DataShare entities.
//!
//! Repositories are stateless: every function runs against the connection
//! it is handed, which is the transaction of the calling session.

pub mod dataset;
pub mod environment;
pub mod resource_policy;
pub mod share;
pub mod share_item;
pub mod task;

pub use dataset::DatasetRepository;
pub use environment::EnvironmentRepository;
pub use resource_policy::ResourcePolicyRepository;
pub use share::ShareRepository;
pub use share_item::ShareItemRepository;
pub use task::TaskRepository;
