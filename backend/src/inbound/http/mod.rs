//! HTTP adapter: handlers, DTOs, and error mapping over actix-web.

pub mod auth;
pub mod error;
pub mod flags;
pub mod issues;
pub mod state;
pub mod status_requests;
pub mod users;

pub use error::{ApiError, ApiResult};

use actix_web::web;

/// Register every handler under the `/api/v1` scope.
///
/// `nearby_issues` is registered before `get_issue` so the literal
/// `nearby` segment is not captured by the `{id}` path parameter.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(issues::nearby_issues)
            .service(issues::create_issue)
            .service(issues::get_issue)
            .service(issues::update_issue)
            .service(issues::delete_issue)
            .service(flags::flag_issue)
            .service(flags::list_unresolved_flags)
            .service(flags::resolve_flag)
            .service(status_requests::request_status_change)
            .service(status_requests::review_status_request)
            .service(status_requests::list_status_requests)
            .service(users::register_user),
    );
}
