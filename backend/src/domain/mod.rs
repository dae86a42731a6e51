//! Domain entities, ports, and services for civic issue reporting.
//!
//! The domain is transport and storage agnostic: entities carry their
//! invariants, `ports` defines the hexagonal boundary, and the service
//! modules implement the driving ports over the driven ones.

pub mod access;
pub mod error;
pub mod flag;
pub mod geo;
pub mod issue;
pub mod lifecycle;
pub mod moderation;
pub mod nearby;
pub mod ports;
pub mod status_log;
pub mod status_request;
pub mod status_workflow;
pub mod user;
pub mod users;

pub use self::access::Principal;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::flag::{Flag, FlagId, FlagValidationError};
pub use self::geo::{
    BoundingBox, Coordinates, GeoValidationError, Location, LocationId, haversine_km,
};
pub use self::issue::{
    Issue, IssueCategory, IssueId, IssuePatch, IssueStatus, IssueValidationError,
};
pub use self::lifecycle::IssueLifecycleService;
pub use self::moderation::ModerationService;
pub use self::nearby::NearbySearchService;
pub use self::status_log::{CREATION_COMMENT, StatusLog, StatusLogId, replays_to};
pub use self::status_request::{
    APPROVAL_COMMENT, ReviewAction, ReviewState, StatusRequest, StatusRequestId,
};
pub use self::status_workflow::StatusRequestService;
pub use self::user::{Email, Role, User, UserId, UserValidationError, Username};
pub use self::users::UserRegistryService;
