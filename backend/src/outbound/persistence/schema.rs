//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They
//! are used by Diesel for compile-time query validation and type-safe
//! SQL generation.

diesel::table! {
    /// Registered accounts.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique handle (max 32 characters).
        username -> Varchar,
        /// Unique contact address.
        email -> Varchar,
        /// Opaque derived credential.
        password_hash -> Varchar,
        /// Authorisation role: `user` or `admin`.
        role -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Geographic positions, each owned by exactly one issue.
    locations (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Degrees north in [-90, 90].
        latitude -> Float8,
        /// Degrees east in [-180, 180].
        longitude -> Float8,
        /// Optional human-readable address.
        address -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Reported civic issues.
    issues (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Short summary (max 200 characters).
        title -> Varchar,
        /// Full description.
        description -> Text,
        /// Category string: road, water, electricity, waste, safety, other.
        category -> Varchar,
        /// Status string: reported, under_review, in_progress, resolved, closed.
        status -> Varchar,
        /// Opaque photo references.
        photos -> Array<Text>,
        /// Reporting account.
        reporter_id -> Uuid,
        /// Owned location row.
        location_id -> Uuid,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit records of status transitions.
    status_logs (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning issue.
        issue_id -> Uuid,
        /// Account that performed the transition.
        actor_id -> Uuid,
        /// Status before the transition; null on the creation entry.
        old_status -> Nullable<Varchar>,
        /// Status after the transition.
        new_status -> Varchar,
        /// Free-text note.
        comment -> Nullable<Text>,
        /// When the transition happened.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Abuse flags; unique per (issue, flagger).
    flags (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Flagged issue.
        issue_id -> Uuid,
        /// Account that raised the flag.
        flagger_id -> Uuid,
        /// Why the issue was flagged.
        reason -> Text,
        /// Whether a moderator has handled the flag.
        resolved -> Bool,
        /// When the flag was handled.
        resolved_at -> Nullable<Timestamptz>,
        /// When the flag was raised.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Citizen-proposed status changes awaiting review.
    status_requests (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Targeted issue.
        issue_id -> Uuid,
        /// Proposing account.
        requester_id -> Uuid,
        /// Issue status snapshotted at request time.
        current_status -> Varchar,
        /// Requested status.
        requested_status -> Varchar,
        /// Optional justification.
        reason -> Nullable<Text>,
        /// Review state string: pending, approved, rejected.
        state -> Varchar,
        /// Reviewing administrator.
        reviewer_id -> Nullable<Uuid>,
        /// Reviewer note.
        review_comment -> Nullable<Text>,
        /// When the review happened.
        reviewed_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(issues -> locations (location_id));
diesel::joinable!(issues -> users (reporter_id));
diesel::joinable!(status_logs -> issues (issue_id));
diesel::joinable!(flags -> issues (issue_id));
diesel::joinable!(status_requests -> issues (issue_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    locations,
    issues,
    status_logs,
    flags,
    status_requests,
);
