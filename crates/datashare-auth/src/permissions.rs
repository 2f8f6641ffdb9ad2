//! Permission names and the named permission sets attached to groups.

/// Submit a share request for approval.
pub const SUBMIT_SHARE_OBJECT: &str = "SUBMIT_SHARE_OBJECT";
/// Approve a submitted share request.
pub const APPROVE_SHARE_OBJECT: &str = "APPROVE_SHARE_OBJECT";
/// Reject a submitted share request.
pub const REJECT_SHARE_OBJECT: &str = "REJECT_SHARE_OBJECT";
/// Delete a share request.
pub const DELETE_SHARE_OBJECT: &str = "DELETE_SHARE_OBJECT";
/// Add an item to a share request.
pub const ADD_ITEM: &str = "ADD_ITEM";
/// Remove an item from a share request.
pub const REMOVE_ITEM: &str = "REMOVE_ITEM";
/// Revoke granted items of a share request.
pub const REVOKE_ITEMS: &str = "REVOKE_ITEMS";
/// Edit the purposes of a share request.
pub const UPDATE_SHARE_OBJECT: &str = "UPDATE_SHARE_OBJECT";
/// Read a share request and its items.
pub const GET_SHARE_OBJECT: &str = "GET_SHARE_OBJECT";

/// Update a dataset table and notify its subscribers.
pub const UPDATE_DATASET_TABLE: &str = "UPDATE_DATASET_TABLE";

/// Permissions of the group that requested a share.
pub const SHARE_OBJECT_REQUESTER: &[&str] = &[
    SUBMIT_SHARE_OBJECT,
    DELETE_SHARE_OBJECT,
    ADD_ITEM,
    REMOVE_ITEM,
    REVOKE_ITEMS,
    UPDATE_SHARE_OBJECT,
    GET_SHARE_OBJECT,
];

/// Permissions of the groups owning the shared dataset.
pub const SHARE_OBJECT_APPROVER: &[&str] = &[
    APPROVE_SHARE_OBJECT,
    REJECT_SHARE_OBJECT,
    DELETE_SHARE_OBJECT,
    REVOKE_ITEMS,
    UPDATE_SHARE_OBJECT,
    GET_SHARE_OBJECT,
];

/// Permissions of the groups owning a dataset.
pub const DATASET_OWNER: &[&str] = &[UPDATE_DATASET_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_approvers_decide() {
        assert!(SHARE_OBJECT_APPROVER.contains(&APPROVE_SHARE_OBJECT));
        assert!(!SHARE_OBJECT_REQUESTER.contains(&APPROVE_SHARE_OBJECT));
        assert!(!SHARE_OBJECT_REQUESTER.contains(&REJECT_SHARE_OBJECT));
    }

    #[test]
    fn test_only_requesters_edit_items() {
        assert!(SHARE_OBJECT_REQUESTER.contains(&ADD_ITEM));
        assert!(!SHARE_OBJECT_APPROVER.contains(&ADD_ITEM));
    }
}
