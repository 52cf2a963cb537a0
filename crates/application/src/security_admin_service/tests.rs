use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use gatehouse_core::{AppError, PrincipalId};
use gatehouse_domain::{
    AccessRequestStatus, Action, GrantRef, PermissionDelegation, RequestContext, ResourceKind,
    ResourceRef, ReviewDecision, Role, Scope, ScopeType,
};

use crate::test_support::{Harness, fixed_instant, harness, standard_metadata};
use crate::{
    AccessRequestQuery, AuditStreamQuery, CreateDelegationInput, CreateRoleAssignmentInput,
    ReviewAccessRequestInput, RoleAssignmentQuery, SubmitAccessRequestInput,
};

fn principal(value: &str) -> PrincipalId {
    PrincipalId::new(value).unwrap_or_else(|_| unreachable!())
}

fn assignment_input(user_id: &str, role: Role, scope: &Scope) -> CreateRoleAssignmentInput {
    CreateRoleAssignmentInput {
        user_id: user_id.to_owned(),
        role,
        scope_type: scope.scope_type(),
        scope_id: scope.scope_id().map(str::to_owned),
        expires_at: None,
    }
}

fn delegation_input(
    delegate_id: &str,
    resource: ResourceKind,
    actions: &[Action],
    expires_at: DateTime<Utc>,
) -> CreateDelegationInput {
    CreateDelegationInput {
        delegate_id: delegate_id.to_owned(),
        resource,
        actions: actions.iter().copied().collect(),
        resource_id: None,
        scope_type: ScopeType::Org,
        scope_id: Some("o1".to_owned()),
        expires_at,
        reason: "incident follow-up".to_owned(),
    }
}

fn access_request_input(action: Action) -> SubmitAccessRequestInput {
    SubmitAccessRequestInput {
        resource: ResourceKind::Memory,
        action,
        resource_id: Some("m1".to_owned()),
        scope_type: ScopeType::Team,
        scope_id: Some("t1".to_owned()),
        justification: "cleaning up stale notes".to_owned(),
        expires_at: None,
    }
}

fn approve() -> ReviewAccessRequestInput {
    ReviewAccessRequestInput {
        decision: ReviewDecision::Approve,
        reason: Some("  looks fine ".to_owned()),
    }
}

fn org_delegation(delegator: &str, delegate: &str, actions: &[Action]) -> PermissionDelegation {
    PermissionDelegation {
        delegation_id: Uuid::new_v4(),
        delegator_id: delegator.to_owned(),
        delegate_id: delegate.to_owned(),
        resource: ResourceKind::Organization,
        actions: actions.iter().copied().collect::<BTreeSet<_>>(),
        resource_id: None,
        scope: Scope::Org("o1".to_owned()),
        granted_at: fixed_instant(),
        expires_at: fixed_instant() + TimeDelta::hours(4),
        is_active: true,
        reason: "covering".to_owned(),
        revoked_by: None,
        revoked_at: None,
    }
}

async fn last_audit_error(harness: &Harness) -> Option<String> {
    harness
        .audits
        .entries()
        .await
        .last()
        .and_then(|entry| entry.request_metadata["error"].as_str().map(str::to_owned))
}

#[tokio::test]
async fn admin_cannot_grant_owner() {
    let harness = harness(standard_metadata());
    let org = Scope::Org("o1".to_owned());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, org.clone(), None)
        .await;

    let result = harness
        .admin
        .create_role_assignment(
            &principal("alice"),
            assignment_input("bob", Role::Owner, &org),
            &RequestContext::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::PrivilegeEscalation(_))));
    let entries = harness.audits.entries().await;
    assert_eq!(entries.len(), 2);
    assert!(entries[0].allowed);
    assert!(!entries[1].allowed);
    assert_eq!(entries[1].action, Action::Administer);
    assert_eq!(
        entries[1].request_metadata["operation"],
        "create_role_assignment"
    );
    assert_eq!(
        last_audit_error(&harness).await.as_deref(),
        Some("privilege_escalation")
    );
}

#[tokio::test]
async fn only_system_can_grant_system() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("olive", Role::Owner, Scope::Global, None)
        .await;
    harness
        .grants
        .seed_assignment("root", Role::System, Scope::Global, None)
        .await;

    let owner_attempt = harness
        .admin
        .create_role_assignment(
            &principal("olive"),
            assignment_input("bob", Role::System, &Scope::Global),
            &RequestContext::new(),
        )
        .await;
    assert!(matches!(
        owner_attempt,
        Err(AppError::PrivilegeEscalation(_))
    ));

    let system_attempt = harness
        .admin
        .create_role_assignment(
            &principal("root"),
            assignment_input("bob", Role::System, &Scope::Global),
            &RequestContext::new(),
        )
        .await;
    assert!(system_attempt.is_ok());
    let assignment = system_attempt.unwrap_or_else(|_| unreachable!());
    assert_eq!(assignment.granted_by, "root");
    assert_eq!(assignment.granted_at, fixed_instant());
}

#[tokio::test]
async fn member_is_stopped_at_the_gate() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("mia", Role::Member, Scope::Team("t1".to_owned()), None)
        .await;

    let result = harness
        .admin
        .create_role_assignment(
            &principal("mia"),
            assignment_input("bob", Role::Viewer, &Scope::Team("t1".to_owned())),
            &RequestContext::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let entries = harness.audits.entries().await;
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].allowed);
    assert_eq!(entries[0].resource, ResourceKind::Team);
}

#[tokio::test]
async fn duplicate_effective_assignment_conflicts() {
    let harness = harness(standard_metadata());
    let team = Scope::Team("t1".to_owned());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, team.clone(), None)
        .await;
    harness
        .grants
        .seed_assignment("bob", Role::Viewer, team.clone(), None)
        .await;

    let result = harness
        .admin
        .create_role_assignment(
            &principal("alice"),
            assignment_input("bob", Role::Member, &team),
            &RequestContext::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(last_audit_error(&harness).await.as_deref(), Some("conflict"));
}

#[tokio::test]
async fn lapsed_assignment_can_be_replaced() {
    let harness = harness(standard_metadata());
    let team = Scope::Team("t1".to_owned());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, team.clone(), None)
        .await;
    harness
        .grants
        .seed_assignment(
            "bob",
            Role::Viewer,
            team.clone(),
            Some(fixed_instant() - TimeDelta::minutes(5)),
        )
        .await;

    let result = harness
        .admin
        .create_role_assignment(
            &principal("alice"),
            assignment_input("bob", Role::Member, &team),
            &RequestContext::new(),
        )
        .await;

    assert!(result.is_ok());
    let active = harness
        .grants
        .assignments()
        .await
        .into_iter()
        .filter(|value| value.user_id == "bob" && value.is_active)
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn past_expiry_is_rejected() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, Scope::Global, None)
        .await;

    let mut input = assignment_input("bob", Role::Viewer, &Scope::Global);
    input.expires_at = Some(fixed_instant() - TimeDelta::seconds(1));
    let result = harness
        .admin
        .create_role_assignment(&principal("alice"), input, &RequestContext::new())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn malformed_scope_is_rejected_before_any_write() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("alice", Role::Owner, Scope::Global, None)
        .await;

    let input = CreateRoleAssignmentInput {
        user_id: "bob".to_owned(),
        role: Role::Viewer,
        scope_type: ScopeType::Org,
        scope_id: None,
        expires_at: None,
    };
    let result = harness
        .admin
        .create_role_assignment(&principal("alice"), input, &RequestContext::new())
        .await;

    assert!(matches!(result, Err(AppError::MalformedScope(_))));
    assert_eq!(harness.grants.assignments().await.len(), 1);
}

#[tokio::test]
async fn revocation_requires_rank_and_is_idempotent() {
    let harness = harness(standard_metadata());
    let team = Scope::Team("t1".to_owned());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, team.clone(), None)
        .await;
    let member = harness
        .grants
        .seed_assignment("bob", Role::Member, team.clone(), None)
        .await;
    let owner = harness
        .grants
        .seed_assignment("carol", Role::Owner, team.clone(), None)
        .await;

    let context = RequestContext::new();
    let first = harness
        .admin
        .revoke_role_assignment(&principal("alice"), member, &context)
        .await;
    let second = harness
        .admin
        .revoke_role_assignment(&principal("alice"), member, &context)
        .await;
    assert!(first.is_ok());
    assert!(second.is_ok());

    let revoked = harness
        .grants
        .assignments()
        .await
        .into_iter()
        .find(|value| value.assignment_id == member)
        .unwrap_or_else(|| unreachable!());
    assert!(!revoked.is_active);
    assert_eq!(revoked.revoked_by.as_deref(), Some("alice"));

    let escalation = harness
        .admin
        .revoke_role_assignment(&principal("alice"), owner, &context)
        .await;
    assert!(matches!(escalation, Err(AppError::PrivilegeEscalation(_))));
}

#[tokio::test]
async fn revoking_unknown_assignment_is_audited_as_not_found() {
    let harness = harness(standard_metadata());

    let result = harness
        .admin
        .revoke_role_assignment(&principal("alice"), Uuid::new_v4(), &RequestContext::new())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(last_audit_error(&harness).await.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn delegation_expires_after_its_window() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("dana", Role::Owner, Scope::Org("o1".to_owned()), None)
        .await;

    let created = harness
        .admin
        .create_delegation(
            &principal("dana"),
            delegation_input(
                "eli",
                ResourceKind::Memory,
                &[Action::Read, Action::Update],
                fixed_instant() + TimeDelta::hours(1),
            ),
            &RequestContext::new(),
        )
        .await;
    assert!(created.is_ok());
    let created = created.unwrap_or_else(|_| unreachable!());

    let memory = ResourceRef::new(ResourceKind::Memory, "m1");
    let decision = harness
        .authorization
        .evaluate(&principal("eli"), Action::Update, &memory, &RequestContext::new())
        .await;
    assert!(decision.allowed);
    assert!(matches!(
        decision.matched_via,
        Some(GrantRef::Delegation { delegation_id, .. }) if delegation_id == created.delegation_id
    ));

    harness.clock.advance(TimeDelta::hours(2));
    let decision = harness
        .authorization
        .evaluate(&principal("eli"), Action::Update, &memory, &RequestContext::new())
        .await;
    assert!(!decision.allowed);
}

#[tokio::test]
async fn delegation_beyond_held_rights_is_rejected() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("alice", Role::Admin, Scope::Org("o1".to_owned()), None)
        .await;

    let result = harness
        .admin
        .create_delegation(
            &principal("alice"),
            delegation_input(
                "eli",
                ResourceKind::Team,
                &[Action::Read, Action::Delete],
                fixed_instant() + TimeDelta::hours(1),
            ),
            &RequestContext::new(),
        )
        .await;

    match result {
        Err(AppError::InsufficientRights(message)) => {
            assert!(message.contains("delete"));
            assert!(!message.contains("read"));
        }
        other => panic!("expected insufficient rights, got {other:?}"),
    }
    assert_eq!(
        last_audit_error(&harness).await.as_deref(),
        Some("insufficient_rights")
    );
}

#[tokio::test]
async fn received_delegations_cannot_be_passed_on() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_delegation(org_delegation(
            "dana",
            "eli",
            &[Action::Administer, Action::Read],
        ))
        .await;

    let result = harness
        .admin
        .create_delegation(
            &principal("eli"),
            delegation_input(
                "fay",
                ResourceKind::Organization,
                &[Action::Read],
                fixed_instant() + TimeDelta::hours(1),
            ),
            &RequestContext::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::InsufficientRights(_))));
}

#[tokio::test]
async fn delegation_window_is_bounded() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("dana", Role::Owner, Scope::Org("o1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let too_long = harness
        .admin
        .create_delegation(
            &principal("dana"),
            delegation_input(
                "eli",
                ResourceKind::Memory,
                &[Action::Read],
                fixed_instant() + TimeDelta::days(31),
            ),
            &context,
        )
        .await;
    assert!(matches!(too_long, Err(AppError::Validation(_))));

    let already_over = harness
        .admin
        .create_delegation(
            &principal("dana"),
            delegation_input("eli", ResourceKind::Memory, &[Action::Read], fixed_instant()),
            &context,
        )
        .await;
    assert!(matches!(already_over, Err(AppError::Validation(_))));

    let to_self = harness
        .admin
        .create_delegation(
            &principal("dana"),
            delegation_input(
                "dana",
                ResourceKind::Memory,
                &[Action::Read],
                fixed_instant() + TimeDelta::hours(1),
            ),
            &context,
        )
        .await;
    assert!(matches!(to_self, Err(AppError::Validation(_))));

    let empty = harness
        .admin
        .create_delegation(
            &principal("dana"),
            delegation_input(
                "eli",
                ResourceKind::Memory,
                &[],
                fixed_instant() + TimeDelta::hours(1),
            ),
            &context,
        )
        .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn delegator_may_always_revoke_but_strangers_may_not() {
    let harness = harness(standard_metadata());
    let delegation = org_delegation("dana", "eli", &[Action::Read]);
    let delegation_id = delegation.delegation_id;
    harness.grants.seed_delegation(delegation).await;
    let context = RequestContext::new();

    let stranger = harness
        .admin
        .revoke_delegation(&principal("sam"), delegation_id, &context)
        .await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    let delegator = harness
        .admin
        .revoke_delegation(&principal("dana"), delegation_id, &context)
        .await;
    assert!(delegator.is_ok());

    let again = harness
        .admin
        .revoke_delegation(&principal("dana"), delegation_id, &context)
        .await;
    assert!(again.is_ok());

    let decision = harness
        .authorization
        .evaluate(
            &principal("eli"),
            Action::Read,
            &ResourceRef::new(ResourceKind::Organization, "o1"),
            &context,
        )
        .await;
    assert!(!decision.allowed);
}

#[tokio::test]
async fn approved_request_grants_exactly_the_requested_tuple() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("rita", Role::Admin, Scope::Team("t1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let submitted = harness
        .admin
        .submit_access_request(&principal("uma"), access_request_input(Action::Delete), &context)
        .await;
    assert!(submitted.is_ok());
    let submitted = submitted.unwrap_or_else(|_| unreachable!());
    assert_eq!(submitted.status, AccessRequestStatus::Pending);
    assert_eq!(submitted.expires_at, fixed_instant() + TimeDelta::days(7));

    let memory = ResourceRef::new(ResourceKind::Memory, "m1");
    let before = harness
        .authorization
        .evaluate(&principal("uma"), Action::Delete, &memory, &context)
        .await;
    assert!(!before.allowed);

    let reviewed = harness
        .admin
        .review_access_request(&principal("rita"), submitted.request_id, approve(), &context)
        .await;
    assert!(reviewed.is_ok());
    let reviewed = reviewed.unwrap_or_else(|_| unreachable!());
    assert_eq!(reviewed.status, AccessRequestStatus::Approved);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("rita"));
    assert_eq!(reviewed.review_reason.as_deref(), Some("looks fine"));

    let after = harness
        .authorization
        .evaluate(&principal("uma"), Action::Delete, &memory, &context)
        .await;
    assert!(after.allowed);
    assert!(matches!(
        after.matched_via,
        Some(GrantRef::AccessRequest { request_id, .. }) if request_id == submitted.request_id
    ));

    let other_action = harness
        .authorization
        .evaluate(&principal("uma"), Action::Share, &memory, &context)
        .await;
    assert!(!other_action.allowed);
}

#[tokio::test]
async fn submission_is_audited_without_a_gate() {
    let harness = harness(standard_metadata());

    let result = harness
        .admin
        .submit_access_request(
            &principal("uma"),
            access_request_input(Action::Update),
            &RequestContext::new(),
        )
        .await;

    assert!(result.is_ok());
    let entries = harness.audits.entries().await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].allowed);
    assert_eq!(entries[0].action, Action::Administer);
    assert_eq!(
        entries[0].request_metadata["operation"],
        "submit_access_request"
    );
}

#[tokio::test]
async fn blank_justification_is_rejected_and_audited() {
    let harness = harness(standard_metadata());
    let mut input = access_request_input(Action::Update);
    input.justification = "   ".to_owned();

    let result = harness
        .admin
        .submit_access_request(&principal("uma"), input, &RequestContext::new())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(last_audit_error(&harness).await.as_deref(), Some("validation"));
}

#[tokio::test]
async fn requesters_cannot_review_their_own_request() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("rita", Role::Admin, Scope::Team("t1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let submitted = harness
        .admin
        .submit_access_request(&principal("rita"), access_request_input(Action::Delete), &context)
        .await
        .unwrap_or_else(|_| unreachable!());
    let result = harness
        .admin
        .review_access_request(&principal("rita"), submitted.request_id, approve(), &context)
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn second_review_reports_already_reviewed() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("rita", Role::Admin, Scope::Team("t1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let submitted = harness
        .admin
        .submit_access_request(&principal("uma"), access_request_input(Action::Delete), &context)
        .await
        .unwrap_or_else(|_| unreachable!());
    let reject = ReviewAccessRequestInput {
        decision: ReviewDecision::Reject,
        reason: None,
    };
    let first = harness
        .admin
        .review_access_request(&principal("rita"), submitted.request_id, reject, &context)
        .await;
    let second = harness
        .admin
        .review_access_request(&principal("rita"), submitted.request_id, approve(), &context)
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::AlreadyReviewed(_))));
}

#[tokio::test]
async fn concurrent_reviews_produce_exactly_one_winner() {
    let harness = harness(standard_metadata());
    let team = Scope::Team("t1".to_owned());
    harness
        .grants
        .seed_assignment("rita", Role::Admin, team.clone(), None)
        .await;
    harness
        .grants
        .seed_assignment("ravi", Role::Owner, team, None)
        .await;
    let context = RequestContext::new();

    let submitted = harness
        .admin
        .submit_access_request(&principal("uma"), access_request_input(Action::Delete), &context)
        .await
        .unwrap_or_else(|_| unreachable!());

    let rita = principal("rita");
    let ravi = principal("ravi");
    let (left, right) = tokio::join!(
        harness
            .admin
            .review_access_request(&rita, submitted.request_id, approve(), &context),
        harness.admin.review_access_request(
            &ravi,
            submitted.request_id,
            ReviewAccessRequestInput {
                decision: ReviewDecision::Reject,
                reason: None,
            },
            &context,
        ),
    );

    let outcomes = [left, right];
    let winners = outcomes.iter().filter(|result| result.is_ok()).count();
    let losers = outcomes
        .iter()
        .filter(|result| matches!(result, Err(AppError::AlreadyReviewed(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 1);
}

#[tokio::test]
async fn expired_pending_request_cannot_be_approved() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("rita", Role::Admin, Scope::Team("t1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let submitted = harness
        .admin
        .submit_access_request(&principal("uma"), access_request_input(Action::Delete), &context)
        .await
        .unwrap_or_else(|_| unreachable!());
    harness.clock.advance(TimeDelta::days(8));

    let result = harness
        .admin
        .review_access_request(&principal("rita"), submitted.request_id, approve(), &context)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn bootstrap_runs_only_once() {
    let harness = harness(standard_metadata());
    let context = RequestContext::new();

    let first = harness
        .admin
        .bootstrap_system_principal(&principal("root"), &context)
        .await;
    let second = harness
        .admin
        .bootstrap_system_principal(&principal("other"), &context)
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let decision = harness
        .authorization
        .evaluate(
            &principal("root"),
            Action::Delete,
            &ResourceRef::new(ResourceKind::Organization, "o1"),
            &context,
        )
        .await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn own_rows_are_listable_without_administer() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("bob", Role::Viewer, Scope::Team("t1".to_owned()), None)
        .await;
    harness
        .grants
        .seed_assignment("carol", Role::Viewer, Scope::Team("t1".to_owned()), None)
        .await;
    let context = RequestContext::new();

    let own = harness
        .admin
        .list_role_assignments(
            &principal("bob"),
            RoleAssignmentQuery {
                user_id: Some("bob".to_owned()),
                scope: None,
                effective_at: Some(fixed_instant()),
                limit: 0,
                offset: 0,
            },
            &context,
        )
        .await;
    assert!(own.is_ok());
    assert_eq!(own.unwrap_or_default().len(), 1);

    let others = harness
        .admin
        .list_role_assignments(
            &principal("bob"),
            RoleAssignmentQuery {
                user_id: None,
                scope: Some(Scope::Team("t1".to_owned())),
                effective_at: None,
                limit: 50,
                offset: 0,
            },
            &context,
        )
        .await;
    assert!(matches!(others, Err(AppError::Forbidden(_))));

    let requests = harness
        .admin
        .list_access_requests(
            &principal("bob"),
            AccessRequestQuery {
                requester_id: Some("bob".to_owned()),
                scope: None,
                status: None,
                as_of: fixed_instant(),
                limit: 50,
                offset: 0,
            },
            &context,
        )
        .await;
    assert!(requests.is_ok());
}

#[tokio::test]
async fn audit_export_requires_audit_read() {
    let harness = harness(standard_metadata());
    harness
        .grants
        .seed_assignment("vera", Role::Viewer, Scope::Global, None)
        .await;
    harness
        .grants
        .seed_assignment("aria", Role::Admin, Scope::Global, None)
        .await;
    let context = RequestContext::new();

    let viewer = harness
        .admin
        .export_audit_stream(&principal("vera"), AuditStreamQuery::default(), &context)
        .await;
    assert!(matches!(viewer, Err(AppError::Forbidden(_))));

    let admin = harness
        .admin
        .export_audit_stream(&principal("aria"), AuditStreamQuery::default(), &context)
        .await;
    assert!(admin.is_ok());
    let records = admin.unwrap_or_default();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sequence, 1);
    assert!(!records[0].entry.allowed);
    assert!(records[1].entry.allowed);
}
