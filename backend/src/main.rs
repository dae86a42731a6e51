//! Backend entry-point: wires persistence, domain services, REST
//! endpoints, and OpenAPI docs.

use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use mockable::DefaultClock;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use backend::ApiDoc;
use backend::domain::{
    IssueLifecycleService, ModerationService, NearbySearchService, StatusRequestService,
    UserRegistryService,
};
use backend::inbound::http;
use backend::inbound::http::state::HttpState;
use backend::outbound::auth::StaticTableVerifier;
use backend::outbound::persistence::{
    DbPool, DieselFlagRepository, DieselIssueRepository, DieselStatusRequestRepository,
    DieselUserRepository, PoolConfig,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn run_migrations(database_url: &str) -> std::io::Result<()> {
    use diesel::Connection;

    let mut conn = diesel::PgConnection::establish(database_url)
        .map_err(|err| std::io::Error::other(format!("failed to connect for migrations: {err}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| std::io::Error::other(format!("failed to run migrations: {err}")))?;
    Ok(())
}

fn build_state(pool: DbPool, verifier: Arc<StaticTableVerifier>) -> HttpState {
    let issues = Arc::new(DieselIssueRepository::new(pool.clone()));
    let flags = Arc::new(DieselFlagRepository::new(pool.clone()));
    let requests = Arc::new(DieselStatusRequestRepository::new(pool.clone()));
    let users = Arc::new(DieselUserRepository::new(pool));
    let clock = Arc::new(DefaultClock);

    HttpState::new(
        Arc::new(IssueLifecycleService::new(issues.clone(), clock.clone())),
        Arc::new(ModerationService::new(
            flags,
            issues.clone(),
            clock.clone(),
        )),
        Arc::new(StatusRequestService::new(
            requests,
            issues.clone(),
            clock.clone(),
        )),
        Arc::new(NearbySearchService::new(issues)),
        Arc::new(UserRegistryService::new(users, clock)),
        verifier,
    )
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| std::io::Error::other("DATABASE_URL must be set"))?;
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    // Bearer verification is an external collaborator in production;
    // the static table keeps local instances usable without one.
    let token_spec = env::var("AUTH_TOKENS").unwrap_or_default();
    let verifier = StaticTableVerifier::from_spec(&token_spec)
        .map_err(|err| std::io::Error::other(format!("AUTH_TOKENS is not valid: {err}")))?;
    if verifier.is_empty() {
        warn!("AUTH_TOKENS is empty; every authenticated endpoint will reject (dev only)");
    }
    let verifier = Arc::new(verifier);

    {
        let database_url = database_url.clone();
        tokio::task::spawn_blocking(move || run_migrations(&database_url))
            .await
            .map_err(|err| std::io::Error::other(format!("migration task failed: {err}")))??;
    }

    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .map_err(|err| std::io::Error::other(format!("failed to build pool: {err}")))?;
    let state = web::Data::new(build_state(pool, verifier));

    info!(%bind_addr, "starting server");
    HttpServer::new(move || {
        let app = App::new()
            .app_data(state.clone())
            .configure(http::configure);
        #[cfg(debug_assertions)]
        let app = app.service(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
        app
    })
    .bind(bind_addr)?
    .run()
    .await
}
