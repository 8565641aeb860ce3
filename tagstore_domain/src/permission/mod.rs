// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Permission Model
//!
//! Every namespace and tag carries a permission object: for each operation
//! defined on the entity, a policy (`Open` or `Closed`) plus an exception
//! list of user IDs.  The exceptions invert the policy: an open operation
//! denies the listed users, a closed operation grants them.
//!
//! ## Defaults and inheritance
//!
//! A new namespace starts closed-with-creator for everything except
//! `ListNamespace`, which is open.  A new tag starts closed-with-creator
//! except `ReadTagValue`, open.  When a child namespace is created it copies
//! its parent's permissions verbatim; when a tag is created each tag
//! operation inherits from a fixed parent-namespace operation.  In both
//! cases the creator is then folded in so they always retain the ability to
//! use what they created.
//!
//! ## Evaluation order
//!
//! Role shortcuts (superuser, user-manager, anonymous) are evaluated before
//! any permission object is consulted; only then do policy and exceptions
//! decide.  That ordering lives in the security layer; this module only
//! answers `allow(operation, user)` for one loaded permission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::user::UserId;
use crate::error::TagstoreError;

/// An operation that can be permissioned or checked.
///
/// The integer IDs are stable: they appear in cache payloads and must not
/// be renumbered.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Operation {
    CreateNamespace,
    UpdateNamespace,
    DeleteNamespace,
    ListNamespace,
    ControlNamespace,
    UpdateTag,
    DeleteTag,
    ControlTag,
    WriteTagValue,
    ReadTagValue,
    DeleteTagValue,
    ControlTagValue,
    CreateUser,
    DeleteUser,
    UpdateUser,
    CreateObject,
}

/// Operations defined for namespaces.
pub const NAMESPACE_OPERATIONS: &[Operation] = &[
    Operation::CreateNamespace,
    Operation::UpdateNamespace,
    Operation::DeleteNamespace,
    Operation::ListNamespace,
    Operation::ControlNamespace,
];

/// Operations defined for tags, including tag-value operations.
pub const TAG_OPERATIONS: &[Operation] = &[
    Operation::UpdateTag,
    Operation::DeleteTag,
    Operation::ControlTag,
    Operation::WriteTagValue,
    Operation::ReadTagValue,
    Operation::DeleteTagValue,
    Operation::ControlTagValue,
];

/// Operations concerning user management.
pub const USER_OPERATIONS: &[Operation] = &[
    Operation::CreateUser,
    Operation::DeleteUser,
    Operation::UpdateUser,
];

/// The operations an anonymous user may perform.
pub const ALLOWED_ANONYMOUS_OPERATIONS: &[Operation] =
    &[Operation::ListNamespace, Operation::ReadTagValue];

/// How each tag operation inherits from the parent namespace's permission
/// when a new tag is created.
pub const TAG_INHERITANCE_MAP: &[(Operation, Operation)] = &[
    (Operation::UpdateTag, Operation::CreateNamespace),
    (Operation::DeleteTag, Operation::CreateNamespace),
    (Operation::ControlTag, Operation::ControlNamespace),
    (Operation::WriteTagValue, Operation::CreateNamespace),
    (Operation::ReadTagValue, Operation::ListNamespace),
    (Operation::DeleteTagValue, Operation::CreateNamespace),
    (Operation::ControlTagValue, Operation::ControlNamespace),
];

impl Operation {
    /// The stable integer this operation is identified by in cache
    /// payloads.
    pub fn id(self) -> i64 {
        match self {
            Operation::CreateNamespace => 1,
            Operation::UpdateNamespace => 2,
            Operation::DeleteNamespace => 3,
            Operation::ListNamespace => 4,
            Operation::ControlNamespace => 5,
            Operation::UpdateTag => 6,
            Operation::DeleteTag => 7,
            Operation::ControlTag => 8,
            Operation::WriteTagValue => 9,
            Operation::ReadTagValue => 10,
            Operation::DeleteTagValue => 11,
            Operation::ControlTagValue => 12,
            Operation::CreateUser => 13,
            Operation::DeleteUser => 14,
            Operation::UpdateUser => 15,
            Operation::CreateObject => 17,
        }
    }

    /// Looks an operation up by its stable integer.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Operation::CreateNamespace),
            2 => Some(Operation::UpdateNamespace),
            3 => Some(Operation::DeleteNamespace),
            4 => Some(Operation::ListNamespace),
            5 => Some(Operation::ControlNamespace),
            6 => Some(Operation::UpdateTag),
            7 => Some(Operation::DeleteTag),
            8 => Some(Operation::ControlTag),
            9 => Some(Operation::WriteTagValue),
            10 => Some(Operation::ReadTagValue),
            11 => Some(Operation::DeleteTagValue),
            12 => Some(Operation::ControlTagValue),
            13 => Some(Operation::CreateUser),
            14 => Some(Operation::DeleteUser),
            15 => Some(Operation::UpdateUser),
            17 => Some(Operation::CreateObject),
            _ => None,
        }
    }

    /// Checks if this operation applies to namespaces
    pub fn is_namespace_operation(self) -> bool {
        NAMESPACE_OPERATIONS.contains(&self)
    }

    /// Checks if this operation applies to tags or tag values
    pub fn is_tag_operation(self) -> bool {
        TAG_OPERATIONS.contains(&self)
    }

    /// Checks if this operation concerns user management
    pub fn is_user_operation(self) -> bool {
        USER_OPERATIONS.contains(&self)
    }

    /// Checks if an anonymous user may perform this operation
    pub fn allowed_for_anonymous(self) -> bool {
        ALLOWED_ANONYMOUS_OPERATIONS.contains(&self)
    }

    /// The control operation gating access to this operation's permission
    /// data, for reporting denials on permission reads.
    pub fn control_operation(self) -> Option<Operation> {
        if self.is_namespace_operation() {
            Some(Operation::ControlNamespace)
        } else {
            match self {
                Operation::UpdateTag | Operation::DeleteTag | Operation::ControlTag => {
                    Some(Operation::ControlTag)
                }
                Operation::WriteTagValue
                | Operation::ReadTagValue
                | Operation::DeleteTagValue
                | Operation::ControlTagValue => Some(Operation::ControlTagValue),
                _ => None,
            }
        }
    }
}

/// Permission policy for a given operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Policy {
    /// Access is granted by default; listed users are denied.
    Open,
    /// Access is denied by default; listed users are granted.
    Closed,
}

impl Policy {
    /// The stable integer this policy is stored and cached as.
    pub fn id(self) -> i64 {
        match self {
            Policy::Open => 1,
            Policy::Closed => 0,
        }
    }

    /// Looks a policy up by its stored integer.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Policy::Open),
            0 => Some(Policy::Closed),
            _ => None,
        }
    }

    /// Parses a policy from its wire-level name.
    pub fn parse(name: &str) -> Result<Self, TagstoreError> {
        match name {
            "open" => Ok(Policy::Open),
            "closed" => Ok(Policy::Closed),
            other => Err(TagstoreError::InvalidPolicy(other.to_string())),
        }
    }
}

/// The permission object for one namespace or tag: a policy and exception
/// list per operation defined on the entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Permission {
    entries: BTreeMap<Operation, (Policy, Vec<UserId>)>,
}

impl Permission {
    /// The system-wide default permission for a new namespace: everything
    /// closed with the creator excepted, listing open.
    pub fn namespace_default(creator: UserId) -> Self {
        let mut permission = Permission::default();
        for &operation in NAMESPACE_OPERATIONS {
            if operation == Operation::ListNamespace {
                permission.entries.insert(operation, (Policy::Open, vec![]));
            } else {
                permission
                    .entries
                    .insert(operation, (Policy::Closed, vec![creator]));
            }
        }
        permission
    }

    /// The system-wide default permission for a new tag: everything closed
    /// with the creator excepted, value reads open.
    pub fn tag_default(creator: UserId) -> Self {
        let mut permission = Permission::default();
        for &operation in TAG_OPERATIONS {
            if operation == Operation::ReadTagValue {
                permission.entries.insert(operation, (Policy::Open, vec![]));
            } else {
                permission
                    .entries
                    .insert(operation, (Policy::Closed, vec![creator]));
            }
        }
        permission
    }

    /// Builds the permission for a new child namespace: the parent's
    /// permissions copied verbatim, then the creator folded in.
    pub fn inherit_namespace(parent: &Permission, creator: UserId) -> Self {
        let mut permission = parent.clone();
        permission.ensure_creator(creator);
        permission
    }

    /// Builds the permission for a new tag from its parent namespace's
    /// permission via the fixed inheritance map, then folds the creator in.
    pub fn inherit_tag(parent: &Permission, creator: UserId) -> Self {
        let mut permission = Permission::tag_default(creator);
        for &(tag_operation, namespace_operation) in TAG_INHERITANCE_MAP {
            if let Some((policy, exceptions)) = parent.entries.get(&namespace_operation) {
                permission
                    .entries
                    .insert(tag_operation, (*policy, exceptions.clone()));
            }
        }
        permission.ensure_creator(creator);
        permission
    }

    /// Reconstructs a permission from `(operation, policy, exceptions)`
    /// rows, as loaded from storage or the cache.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Operation, Policy, Vec<UserId>)>,
    {
        let mut permission = Permission::default();
        for (operation, policy, exceptions) in entries {
            permission.entries.insert(operation, (policy, exceptions));
        }
        permission
    }

    /// Guarantees the creator can use what they created: adds them to the
    /// exception list of closed operations and removes them from the
    /// exception list of open ones.
    pub fn ensure_creator(&mut self, creator: UserId) {
        for (policy, exceptions) in self.entries.values_mut() {
            match policy {
                Policy::Closed => {
                    if !exceptions.contains(&creator) {
                        exceptions.push(creator);
                    }
                }
                Policy::Open => {
                    exceptions.retain(|&user_id| user_id != creator);
                }
            }
        }
    }

    /// Gets the policy and exceptions list for an operation.
    ///
    /// # Errors
    /// Returns `FeatureError` if the operation is not defined for this
    /// permission.
    pub fn get(&self, operation: Operation) -> Result<(Policy, &[UserId]), TagstoreError> {
        self.entries
            .get(&operation)
            .map(|(policy, exceptions)| (*policy, exceptions.as_slice()))
            .ok_or_else(|| {
                TagstoreError::feature(format!(
                    "{:?} is an invalid operation for this permission",
                    operation
                ))
            })
    }

    /// Updates the policy and exceptions list for an operation.
    ///
    /// # Errors
    /// Returns `FeatureError` if the operation is not defined for this
    /// permission.
    pub fn set(
        &mut self,
        operation: Operation,
        policy: Policy,
        exceptions: Vec<UserId>,
    ) -> Result<(), TagstoreError> {
        if !self.entries.contains_key(&operation) {
            return Err(TagstoreError::feature(format!(
                "{:?} is an invalid operation for this permission",
                operation
            )));
        }
        self.entries.insert(operation, (policy, exceptions));
        Ok(())
    }

    /// Determines if a user can perform an operation.
    pub fn allow(&self, operation: Operation, user_id: UserId) -> Result<bool, TagstoreError> {
        let (policy, exceptions) = self.get(operation)?;
        Ok(match policy {
            Policy::Open => !exceptions.contains(&user_id),
            Policy::Closed => exceptions.contains(&user_id),
        })
    }

    /// Iterates over `(operation, policy, exceptions)` entries.
    pub fn entries(&self) -> impl Iterator<Item = (Operation, Policy, &[UserId])> {
        self.entries
            .iter()
            .map(|(operation, (policy, exceptions))| (*operation, *policy, exceptions.as_slice()))
    }

    /// The operations defined on this permission.
    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        self.entries.keys().copied()
    }
}
