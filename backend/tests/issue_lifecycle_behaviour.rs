//! Behaviour coverage for the issue lifecycle: audit trail pairing,
//! no-op status changes, authorisation, and cascade deletion.

mod support;

use backend::domain::ports::{
    ChangeStatusRequest, IssueLifecycle, IssueRepository, IssueRepositoryError, UpdateIssueRequest,
};
use backend::domain::user::Role;
use backend::domain::{ErrorCode, IssuePatch, IssueStatus, replays_to};

use support::{context, register, report_issue};

#[tokio::test]
async fn creation_writes_issue_location_and_first_log_entry() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;

    let detail = report_issue(&ctx, reporter, "Pothole on Main St", 40.7128, -74.0060).await;

    assert_eq!(detail.issue.status, IssueStatus::Reported);
    assert_eq!(ctx.store.log_count(&detail.issue.id), 1);

    let logs = ctx.store.logs_in_creation_order(&detail.issue.id);
    assert!(replays_to(&logs, IssueStatus::Reported));
    assert_eq!(logs.first().and_then(|log| log.old_status), None);
    assert_eq!(
        logs.first().and_then(|log| log.comment.as_deref()),
        Some("Issue reported")
    );
}

#[tokio::test]
async fn every_status_change_appends_exactly_one_log_entry() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;
    let issue_id = detail.issue.id;

    for (step, status) in [
        IssueStatus::UnderReview,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
        IssueStatus::Closed,
    ]
    .into_iter()
    .enumerate()
    {
        ctx.clock.advance_seconds(60);
        let updated = ctx
            .lifecycle
            .change_status(ChangeStatusRequest {
                issue_id,
                principal: reporter,
                new_status: status,
                comment: None,
            })
            .await
            .expect("status change succeeds");
        assert_eq!(updated.issue.status, status);
        assert_eq!(ctx.store.log_count(&issue_id), step + 2);
    }

    let logs = ctx.store.logs_in_creation_order(&issue_id);
    assert!(replays_to(&logs, IssueStatus::Closed));
}

#[tokio::test]
async fn same_status_change_succeeds_without_a_log_entry() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;

    let unchanged = ctx
        .lifecycle
        .change_status(ChangeStatusRequest {
            issue_id: detail.issue.id,
            principal: reporter,
            new_status: IssueStatus::Reported,
            comment: Some("still reported".to_owned()),
        })
        .await
        .expect("no-op succeeds");

    assert_eq!(unchanged.issue.status, IssueStatus::Reported);
    assert_eq!(ctx.store.log_count(&detail.issue.id), 1);
}

#[tokio::test]
async fn bundled_field_patch_and_status_change_apply_together() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;

    let updated = ctx
        .lifecycle
        .update_issue(UpdateIssueRequest {
            issue_id: detail.issue.id,
            principal: reporter,
            patch: IssuePatch {
                title: Some("Pothole, now marked".to_owned()),
                appended_photos: vec!["photos/after.jpg".to_owned()],
                ..IssuePatch::default()
            },
            new_status: Some(IssueStatus::UnderReview),
            status_comment: Some("Marked for triage".to_owned()),
        })
        .await
        .expect("update succeeds");

    assert_eq!(updated.issue.title, "Pothole, now marked");
    assert_eq!(updated.issue.photos, vec!["photos/after.jpg".to_owned()]);
    assert_eq!(updated.issue.status, IssueStatus::UnderReview);
    assert_eq!(ctx.store.log_count(&detail.issue.id), 2);
}

#[tokio::test]
async fn strangers_are_forbidden_and_cause_no_state_change() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let (_, stranger) = register(&ctx, "stranger", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;
    let issue_id = detail.issue.id;
    let before = ctx
        .store
        .find_by_id(&issue_id)
        .await
        .expect("lookup succeeds")
        .expect("issue exists");

    let change = ctx
        .lifecycle
        .change_status(ChangeStatusRequest {
            issue_id,
            principal: stranger,
            new_status: IssueStatus::Closed,
            comment: None,
        })
        .await
        .expect_err("forbidden");
    assert_eq!(change.code(), ErrorCode::Forbidden);

    let update = ctx
        .lifecycle
        .update_issue(UpdateIssueRequest {
            issue_id,
            principal: stranger,
            patch: IssuePatch {
                title: Some("Hijacked".to_owned()),
                ..IssuePatch::default()
            },
            new_status: None,
            status_comment: None,
        })
        .await
        .expect_err("forbidden");
    assert_eq!(update.code(), ErrorCode::Forbidden);

    let delete = ctx
        .lifecycle
        .delete_issue(&issue_id, &stranger)
        .await
        .expect_err("forbidden");
    assert_eq!(delete.code(), ErrorCode::Forbidden);

    let after = ctx
        .store
        .find_by_id(&issue_id)
        .await
        .expect("lookup succeeds")
        .expect("issue still exists");
    assert_eq!(before, after);
    assert_eq!(ctx.store.log_count(&issue_id), 1);
}

#[tokio::test]
async fn admins_may_mutate_issues_they_did_not_report() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let (_, admin) = register(&ctx, "moderator", Role::Admin).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;

    let updated = ctx
        .lifecycle
        .change_status(ChangeStatusRequest {
            issue_id: detail.issue.id,
            principal: admin,
            new_status: IssueStatus::InProgress,
            comment: Some("Crew dispatched".to_owned()),
        })
        .await
        .expect("admin change succeeds");
    assert_eq!(updated.issue.status, IssueStatus::InProgress);
}

#[tokio::test]
async fn delete_removes_the_issue_and_everything_it_owns() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let (_, other) = register(&ctx, "concerned", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;
    let issue_id = detail.issue.id;

    use backend::domain::ports::{FlagIssueRequest, ModerationQueue};
    ctx.moderation
        .flag_issue(FlagIssueRequest {
            issue_id,
            principal: other,
            reason: "duplicate".to_owned(),
        })
        .await
        .expect("flag succeeds");

    ctx.lifecycle
        .delete_issue(&issue_id, &reporter)
        .await
        .expect("delete succeeds");

    let lookup = ctx
        .lifecycle
        .get_issue(&issue_id)
        .await
        .expect_err("not found");
    assert_eq!(lookup.code(), ErrorCode::NotFound);
    assert_eq!(ctx.store.log_count(&issue_id), 0);
    assert_eq!(ctx.store.flag_count(&issue_id), 0);

    let delete_again = ctx
        .lifecycle
        .delete_issue(&issue_id, &reporter)
        .await
        .expect_err("not found");
    assert_eq!(delete_again.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn stale_status_expectation_is_a_mismatch_at_the_store() {
    let ctx = context();
    let (_, reporter) = register(&ctx, "reporter", Role::User).await;
    let detail = report_issue(&ctx, reporter, "Pothole", 40.7128, -74.0060).await;
    let issue_id = detail.issue.id;

    // A concurrent writer moves the issue on after our snapshot.
    ctx.lifecycle
        .change_status(ChangeStatusRequest {
            issue_id,
            principal: reporter,
            new_status: IssueStatus::InProgress,
            comment: None,
        })
        .await
        .expect("first change succeeds");

    use backend::domain::StatusLog;
    use backend::domain::ports::StatusTransition;
    use backend::domain::status_log::StatusLogId;
    use chrono::Utc;

    let stale = StatusTransition {
        expected_status: IssueStatus::Reported,
        log: StatusLog {
            id: StatusLogId::random(),
            issue_id,
            actor_id: reporter.user_id,
            old_status: Some(IssueStatus::Reported),
            new_status: IssueStatus::Closed,
            comment: None,
            created_at: Utc::now(),
        },
    };
    let err = ctx
        .store
        .update(&issue_id, &IssuePatch::default(), Some(stale), Utc::now())
        .await
        .expect_err("mismatch");
    assert!(matches!(
        err,
        IssueRepositoryError::StatusMismatch {
            expected: IssueStatus::Reported,
            actual: IssueStatus::InProgress,
        }
    ));
    // Nothing was written for the failed transition.
    assert_eq!(ctx.store.log_count(&issue_id), 2);
}
