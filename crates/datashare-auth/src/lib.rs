//! # datashare-auth
//!
//! Group-based authorization for DataShare resources.
//!
//! ## Modules
//!
//! - `permissions`: Permission names and the named sets attached to groups
//! - `checker`: The permission gate consulted before privileged operations
//! - `policy`: Attaching and detaching permission sets on resources

pub mod checker;
pub mod permissions;
pub mod policy;

pub use checker::ResourcePolicyChecker;
pub use policy::ResourcePolicyStore;
