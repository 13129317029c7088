// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Authorization Resolver (C7) — a pure function over precomputed access
//! tables. `spec.md` §4.7: first-hit-decides rule chain, cost is
//! O(number-of-access-rows-for-workflow).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::workflow::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Form,
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Authenticated,
    RoleBased,
}

/// A precomputed Workflow Access Row. Rebuilt by the (out-of-scope) catalog
/// at mutation time; file-sync never writes these (invariant 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRow {
    pub workflow_id: WorkflowId,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub access_level: AccessLevel,
    pub organization_id: Option<Uuid>,
}

/// The caller attempting to execute a workflow.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Option<String>,
    pub org_id: Option<Uuid>,
    pub is_superuser: bool,
    pub is_api_key: bool,
    pub api_key_id: Option<Uuid>,
    pub roles: Vec<String>,
}

impl Caller {
    pub fn system() -> Self {
        Self {
            identity: Some("system".to_string()),
            org_id: None,
            is_superuser: true,
            is_api_key: false,
            api_key_id: None,
            roles: vec![],
        }
    }
}

/// `can_execute(workflow_id, identity, org_id, is_superuser, is_api_key)`
/// from `spec.md` §4.7. `access_rows` must already be scoped to
/// `workflow_id`; `entity_roles` maps `(entity_type, entity_id)` to its
/// assigned role set for the role-based branch.
pub fn can_execute(
    caller: &Caller,
    access_rows: &[AccessRow],
    entity_roles: impl Fn(EntityType, Uuid) -> Vec<String>,
) -> bool {
    if caller.is_superuser {
        return true;
    }
    if caller.is_api_key {
        return true;
    }
    if caller.identity.is_none() {
        return false;
    }

    let scoped: Vec<&AccessRow> = access_rows
        .iter()
        .filter(|row| match (row.organization_id, caller.org_id) {
            (None, _) => true,
            (Some(row_org), Some(caller_org)) => row_org == caller_org,
            (Some(_), None) => false,
        })
        .collect();

    if scoped.is_empty() {
        return false;
    }

    if scoped.iter().any(|row| row.access_level == AccessLevel::Authenticated) {
        return true;
    }

    scoped.iter().any(|row| {
        let assigned = entity_roles(row.entity_type, row.entity_id);
        assigned.iter().any(|role| caller.roles.contains(role))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(access_level: AccessLevel, org: Option<Uuid>) -> AccessRow {
        AccessRow {
            workflow_id: WorkflowId::new(),
            entity_type: EntityType::Form,
            entity_id: Uuid::new_v4(),
            access_level,
            organization_id: org,
        }
    }

    fn caller(identity: Option<&str>) -> Caller {
        Caller {
            identity: identity.map(|s| s.to_string()),
            org_id: None,
            is_superuser: false,
            is_api_key: false,
            api_key_id: None,
            roles: vec![],
        }
    }

    #[test]
    fn superuser_always_allowed() {
        let mut c = caller(None);
        c.is_superuser = true;
        assert!(can_execute(&c, &[], |_, _| vec![]));
    }

    #[test]
    fn api_key_always_allowed() {
        let mut c = caller(None);
        c.is_api_key = true;
        assert!(can_execute(&c, &[], |_, _| vec![]));
    }

    #[test]
    fn anonymous_without_key_denied() {
        let c = caller(None);
        assert!(!can_execute(&c, &[row(AccessLevel::Authenticated, None)], |_, _| vec![]));
    }

    #[test]
    fn no_access_rows_denied() {
        let c = caller(Some("alice"));
        assert!(!can_execute(&c, &[], |_, _| vec![]));
    }

    #[test]
    fn authenticated_access_level_allows_any_identity() {
        let c = caller(Some("alice"));
        assert!(can_execute(&c, &[row(AccessLevel::Authenticated, None)], |_, _| vec![]));
    }

    #[test]
    fn role_based_requires_intersection() {
        let mut c = caller(Some("alice"));
        c.roles = vec!["editor".to_string()];
        let rows = [row(AccessLevel::RoleBased, None)];
        assert!(can_execute(&c, &rows, |_, _| vec!["editor".to_string()]));
        assert!(!can_execute(&c, &rows, |_, _| vec!["viewer".to_string()]));
    }

    #[test]
    fn org_scoped_row_requires_matching_org() {
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        let mut c = caller(Some("alice"));
        c.org_id = Some(org_b);
        let rows = [row(AccessLevel::Authenticated, Some(org_a))];
        assert!(!can_execute(&c, &rows, |_, _| vec![]));
        c.org_id = Some(org_a);
        assert!(can_execute(&c, &rows, |_, _| vec![]));
    }
}
