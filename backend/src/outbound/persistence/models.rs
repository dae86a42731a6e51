//! Row types mapping between the Diesel schema and domain entities.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::flag::{Flag, FlagId};
use crate::domain::geo::{Coordinates, Location, LocationId};
use crate::domain::issue::{Issue, IssueId};
use crate::domain::status_log::{StatusLog, StatusLogId};
use crate::domain::status_request::{StatusRequest, StatusRequestId};
use crate::domain::user::{Email, User, UserId, Username};

use super::schema::{flags, issues, locations, status_logs, status_requests, users};

/// Error raised when a stored string does not parse into its domain
/// enum or value object. Indicates schema drift or manual edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored value for {column} is not valid: {value}")]
pub struct RowConversionError {
    /// Column the bad value came from.
    pub column: &'static str,
    /// The offending stored value.
    pub value: String,
}

impl RowConversionError {
    fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

fn parse_column<T>(column: &'static str, value: &str) -> Result<T, RowConversionError>
where
    T: std::str::FromStr,
{
    value
        .parse()
        .map_err(|_| RowConversionError::new(column, value))
}

/// Queryable user row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RowConversionError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            username: Username::new(&row.username)
                .map_err(|_| RowConversionError::new("users.username", &row.username))?,
            email: Email::new(&row.email)
                .map_err(|_| RowConversionError::new("users.email", &row.email))?,
            password_hash: row.password_hash,
            role: parse_column("users.role", &row.role)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable user row.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    /// Borrow an insertable row from a domain user.
    pub fn from_domain(user: &'a User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            username: user.username.as_ref(),
            email: user.email.as_ref(),
            password_hash: user.password_hash.as_str(),
            role: user.role.as_str(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Queryable location row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LocationRow {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

impl TryFrom<LocationRow> for Location {
    type Error = RowConversionError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let coordinates = Coordinates::new(row.latitude, row.longitude).map_err(|_| {
            RowConversionError::new(
                "locations.latitude/longitude",
                format!("({}, {})", row.latitude, row.longitude),
            )
        })?;
        Ok(Self {
            id: LocationId::from_uuid(row.id),
            coordinates,
            address: row.address,
        })
    }
}

/// Insertable location row.
#[derive(Debug, Insertable)]
#[diesel(table_name = locations)]
pub struct NewLocationRow<'a> {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<&'a str>,
}

impl<'a> NewLocationRow<'a> {
    /// Borrow an insertable row from a domain location.
    pub fn from_domain(location: &'a Location) -> Self {
        Self {
            id: *location.id.as_uuid(),
            latitude: location.coordinates.latitude,
            longitude: location.coordinates.longitude,
            address: location.address.as_deref(),
        }
    }
}

/// Changeset for patching a location.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = locations)]
pub struct LocationChanges<'a> {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<&'a str>,
}

/// Queryable issue row (without its location).
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = issues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IssueRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub photos: Vec<String>,
    pub reporter_id: Uuid,
    pub location_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Combine an issue row with its location row into the domain aggregate.
pub fn issue_from_rows(issue: IssueRow, location: LocationRow) -> Result<Issue, RowConversionError> {
    Ok(Issue {
        id: IssueId::from_uuid(issue.id),
        category: parse_column("issues.category", &issue.category)?,
        status: parse_column("issues.status", &issue.status)?,
        title: issue.title,
        description: issue.description,
        photos: issue.photos,
        reporter_id: UserId::from_uuid(issue.reporter_id),
        location: Location::try_from(location)?,
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    })
}

/// Insertable issue row.
#[derive(Debug, Insertable)]
#[diesel(table_name = issues)]
pub struct NewIssueRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub status: &'a str,
    pub photos: &'a [String],
    pub reporter_id: Uuid,
    pub location_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewIssueRow<'a> {
    /// Borrow an insertable row from a domain issue.
    pub fn from_domain(issue: &'a Issue) -> Self {
        Self {
            id: *issue.id.as_uuid(),
            title: issue.title.as_str(),
            description: issue.description.as_str(),
            category: issue.category.as_str(),
            status: issue.status.as_str(),
            photos: &issue.photos,
            reporter_id: *issue.reporter_id.as_uuid(),
            location_id: *issue.location.id.as_uuid(),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Changeset for patching an issue row.
///
/// `updated_at` is always present, so the changeset is never empty even
/// for a status-only transition.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = issues)]
pub struct IssueChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub status: Option<&'a str>,
    pub photos: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

/// Queryable status log row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = status_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusLogRow {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StatusLogRow> for StatusLog {
    type Error = RowConversionError;

    fn try_from(row: StatusLogRow) -> Result<Self, Self::Error> {
        let old_status = row
            .old_status
            .as_deref()
            .map(|value| parse_column("status_logs.old_status", value))
            .transpose()?;
        Ok(Self {
            id: StatusLogId::from_uuid(row.id),
            issue_id: IssueId::from_uuid(row.issue_id),
            actor_id: UserId::from_uuid(row.actor_id),
            old_status,
            new_status: parse_column("status_logs.new_status", &row.new_status)?,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

/// Insertable status log row.
#[derive(Debug, Insertable)]
#[diesel(table_name = status_logs)]
pub struct NewStatusLogRow<'a> {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub old_status: Option<&'a str>,
    pub new_status: &'a str,
    pub comment: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewStatusLogRow<'a> {
    /// Borrow an insertable row from a domain status log.
    pub fn from_domain(log: &'a StatusLog) -> Self {
        Self {
            id: *log.id.as_uuid(),
            issue_id: *log.issue_id.as_uuid(),
            actor_id: *log.actor_id.as_uuid(),
            old_status: log.old_status.map(|status| status.as_str()),
            new_status: log.new_status.as_str(),
            comment: log.comment.as_deref(),
            created_at: log.created_at,
        }
    }
}

/// Queryable flag row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = flags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FlagRow {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub flagger_id: Uuid,
    pub reason: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<FlagRow> for Flag {
    fn from(row: FlagRow) -> Self {
        Self {
            id: FlagId::from_uuid(row.id),
            issue_id: IssueId::from_uuid(row.issue_id),
            flagger_id: UserId::from_uuid(row.flagger_id),
            reason: row.reason,
            resolved: row.resolved,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        }
    }
}

/// Insertable flag row.
#[derive(Debug, Insertable)]
#[diesel(table_name = flags)]
pub struct NewFlagRow<'a> {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub flagger_id: Uuid,
    pub reason: &'a str,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewFlagRow<'a> {
    /// Borrow an insertable row from a domain flag.
    pub fn from_domain(flag: &'a Flag) -> Self {
        Self {
            id: *flag.id.as_uuid(),
            issue_id: *flag.issue_id.as_uuid(),
            flagger_id: *flag.flagger_id.as_uuid(),
            reason: flag.reason.as_str(),
            resolved: flag.resolved,
            resolved_at: flag.resolved_at,
            created_at: flag.created_at,
        }
    }
}

/// Queryable status request row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = status_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusRequestRow {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub requester_id: Uuid,
    pub current_status: String,
    pub requested_status: String,
    pub reason: Option<String>,
    pub state: String,
    pub reviewer_id: Option<Uuid>,
    pub review_comment: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StatusRequestRow> for StatusRequest {
    type Error = RowConversionError;

    fn try_from(row: StatusRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StatusRequestId::from_uuid(row.id),
            issue_id: IssueId::from_uuid(row.issue_id),
            requester_id: UserId::from_uuid(row.requester_id),
            current_status: parse_column("status_requests.current_status", &row.current_status)?,
            requested_status: parse_column(
                "status_requests.requested_status",
                &row.requested_status,
            )?,
            reason: row.reason,
            state: parse_column("status_requests.state", &row.state)?,
            reviewer_id: row.reviewer_id.map(UserId::from_uuid),
            review_comment: row.review_comment,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable status request row.
#[derive(Debug, Insertable)]
#[diesel(table_name = status_requests)]
pub struct NewStatusRequestRow<'a> {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub requester_id: Uuid,
    pub current_status: &'a str,
    pub requested_status: &'a str,
    pub reason: Option<&'a str>,
    pub state: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewStatusRequestRow<'a> {
    /// Borrow an insertable row from a domain status request.
    pub fn from_domain(request: &'a StatusRequest) -> Self {
        Self {
            id: *request.id.as_uuid(),
            issue_id: *request.issue_id.as_uuid(),
            requester_id: *request.requester_id.as_uuid(),
            current_status: request.current_status.as_str(),
            requested_status: request.requested_status.as_str(),
            reason: request.reason.as_deref(),
            state: request.state.as_str(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::issue::IssueStatus;
    use crate::domain::user::Role;

    #[rstest]
    fn unknown_status_string_fails_conversion() {
        let row = StatusLogRow {
            id: Uuid::new_v4(),
            issue_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            old_status: None,
            new_status: "fixed".to_owned(),
            comment: None,
            created_at: Utc::now(),
        };
        let err = StatusLog::try_from(row).expect_err("unknown status rejected");
        assert_eq!(err.column, "status_logs.new_status");
        assert_eq!(err.value, "fixed");
    }

    #[rstest]
    fn status_log_row_round_trips() {
        let row = StatusLogRow {
            id: Uuid::new_v4(),
            issue_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            old_status: Some("reported".to_owned()),
            new_status: "in_progress".to_owned(),
            comment: Some("Crew dispatched".to_owned()),
            created_at: Utc::now(),
        };
        let log = StatusLog::try_from(row).expect("valid row");
        assert_eq!(log.old_status, Some(IssueStatus::Reported));
        assert_eq!(log.new_status, IssueStatus::InProgress);
    }

    #[rstest]
    fn user_row_parses_role() {
        let row = UserRow {
            id: Uuid::new_v4(),
            username: "ada_lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            password_hash: "hash".to_owned(),
            role: "admin".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user = User::try_from(row).expect("valid row");
        assert_eq!(user.role, Role::Admin);
    }

    #[rstest]
    fn out_of_range_location_row_is_rejected() {
        let row = LocationRow {
            id: Uuid::new_v4(),
            latitude: 120.0,
            longitude: 0.0,
            address: None,
        };
        assert!(Location::try_from(row).is_err());
    }
}
