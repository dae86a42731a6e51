//! Behaviour coverage for the status request workflow: snapshotting,
//! atomic approval, rejection without side effects, and single review.

mod support;

use backend::domain::ports::{
    IssueRepository, PendingRequestFilter, RequestChangeRequest, ReviewRequest,
    StatusRequestWorkflow,
};
use backend::domain::user::Role;
use backend::domain::{ErrorCode, IssueStatus, ReviewAction, ReviewState, replays_to};

use support::{context, register, report_issue, TestContext};

async fn file_request(
    ctx: &TestContext,
    requested: IssueStatus,
) -> (backend::domain::StatusRequest, backend::domain::Principal) {
    let (_, reporter) = register(ctx, "reporter", Role::User).await;
    let (_, admin) = register(ctx, "moderator", Role::Admin).await;
    let detail = report_issue(ctx, reporter, "Leaking hydrant", 48.8566, 2.3522).await;

    let proposal = ctx
        .workflow
        .request_change(RequestChangeRequest {
            issue_id: detail.issue.id,
            principal: reporter,
            requested_status: requested,
            reason: Some("Fixed last week".to_owned()),
        })
        .await
        .expect("request succeeds");
    (proposal, admin)
}

#[tokio::test]
async fn requests_snapshot_the_status_at_filing_time() {
    let ctx = context();
    let (proposal, _) = file_request(&ctx, IssueStatus::Resolved).await;

    assert_eq!(proposal.current_status, IssueStatus::Reported);
    assert_eq!(proposal.requested_status, IssueStatus::Resolved);
    assert_eq!(proposal.state, ReviewState::Pending);
    assert!(proposal.reviewer_id.is_none());
}

#[tokio::test]
async fn approval_applies_the_status_and_appends_one_log_entry() {
    let ctx = context();
    let (proposal, admin) = file_request(&ctx, IssueStatus::Resolved).await;
    let issue_id = proposal.issue_id;
    assert_eq!(ctx.store.log_count(&issue_id), 1);

    ctx.clock.advance_seconds(300);
    let reviewed = ctx
        .workflow
        .review(ReviewRequest {
            request_id: proposal.id,
            principal: admin,
            action: ReviewAction::Approve,
            comment: Some("Confirmed on site".to_owned()),
        })
        .await
        .expect("approve succeeds");

    assert_eq!(reviewed.state, ReviewState::Approved);
    assert_eq!(reviewed.reviewer_id, Some(admin.user_id));
    assert!(reviewed.reviewed_at.is_some());

    let issue = ctx
        .store
        .find_by_id(&issue_id)
        .await
        .expect("lookup succeeds")
        .expect("issue exists");
    assert_eq!(issue.status, IssueStatus::Resolved);
    assert_eq!(ctx.store.log_count(&issue_id), 2);

    let logs = ctx.store.logs_in_creation_order(&issue_id);
    assert!(replays_to(&logs, IssueStatus::Resolved));
    let approval_entry = logs.last().expect("approval entry");
    assert_eq!(approval_entry.actor_id, admin.user_id);
    assert_eq!(approval_entry.comment.as_deref(), Some("Confirmed on site"));
}

#[tokio::test]
async fn rejection_leaves_the_issue_untouched() {
    let ctx = context();
    let (proposal, admin) = file_request(&ctx, IssueStatus::Closed).await;
    let issue_id = proposal.issue_id;

    let reviewed = ctx
        .workflow
        .review(ReviewRequest {
            request_id: proposal.id,
            principal: admin,
            action: ReviewAction::Reject,
            comment: Some("Not confirmed".to_owned()),
        })
        .await
        .expect("reject succeeds");

    assert_eq!(reviewed.state, ReviewState::Rejected);
    let issue = ctx
        .store
        .find_by_id(&issue_id)
        .await
        .expect("lookup succeeds")
        .expect("issue exists");
    assert_eq!(issue.status, IssueStatus::Reported);
    assert_eq!(ctx.store.log_count(&issue_id), 1);
}

#[tokio::test]
async fn a_request_is_reviewed_at_most_once() {
    let ctx = context();
    let (proposal, admin) = file_request(&ctx, IssueStatus::Resolved).await;

    ctx.workflow
        .review(ReviewRequest {
            request_id: proposal.id,
            principal: admin,
            action: ReviewAction::Approve,
            comment: None,
        })
        .await
        .expect("first review succeeds");

    let err = ctx
        .workflow
        .review(ReviewRequest {
            request_id: proposal.id,
            principal: admin,
            action: ReviewAction::Reject,
            comment: None,
        })
        .await
        .expect_err("conflict");
    assert_eq!(err.code(), ErrorCode::Conflict);

    // The first decision stands.
    let stored = ctx
        .workflow
        .list_requests(&PendingRequestFilter {
            search: None,
            state: Some(ReviewState::Approved),
        })
        .await
        .expect("list succeeds");
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored.first().map(|listing| listing.request.state),
        Some(ReviewState::Approved)
    );
}

#[tokio::test]
async fn only_admins_review_requests() {
    let ctx = context();
    let (proposal, _) = file_request(&ctx, IssueStatus::Resolved).await;
    let (_, citizen) = register(&ctx, "bystander", Role::User).await;

    let err = ctx
        .workflow
        .review(ReviewRequest {
            request_id: proposal.id,
            principal: citizen,
            action: ReviewAction::Approve,
            comment: None,
        })
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn pending_list_supports_text_search_over_requester_and_title() {
    let ctx = context();
    let (_, alice) = register(&ctx, "alice_smith", Role::User).await;
    let (_, bob) = register(&ctx, "bob_jones", Role::User).await;
    let pothole = report_issue(&ctx, alice, "Pothole on Main St", 40.7128, -74.0060).await;
    let light = report_issue(&ctx, bob, "Broken street light", 40.7130, -74.0055).await;

    for (issue_id, principal) in [(pothole.issue.id, alice), (light.issue.id, bob)] {
        ctx.clock.advance_seconds(60);
        ctx.workflow
            .request_change(RequestChangeRequest {
                issue_id,
                principal,
                requested_status: IssueStatus::Resolved,
                reason: None,
            })
            .await
            .expect("request succeeds");
    }

    let all = ctx
        .workflow
        .list_requests(&PendingRequestFilter::default())
        .await
        .expect("list succeeds");
    assert_eq!(all.len(), 2);
    // Newest first.
    assert_eq!(all.first().map(|l| l.issue_title.as_str()), Some("Broken street light"));

    let by_username = ctx
        .workflow
        .list_requests(&PendingRequestFilter {
            search: Some("alice".to_owned()),
            state: None,
        })
        .await
        .expect("list succeeds");
    assert_eq!(by_username.len(), 1);
    assert_eq!(
        by_username.first().map(|l| l.requester_username.as_str()),
        Some("alice_smith")
    );

    let by_title = ctx
        .workflow
        .list_requests(&PendingRequestFilter {
            search: Some("street light".to_owned()),
            state: None,
        })
        .await
        .expect("list succeeds");
    assert_eq!(by_title.len(), 1);
    assert_eq!(
        by_title.first().map(|l| l.issue_title.as_str()),
        Some("Broken street light")
    );
}
