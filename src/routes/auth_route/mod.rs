use std::{sync::Arc, time::Duration};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor};

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::{
    errors::{Error, Result},
    routes::auth_route::{
        password::{forgot_password, reset_password, update_password},
        user::{session, sign_in, sign_in_page, sign_out, sign_up},
    },
    state::AppState,
};

pub mod password;
pub mod user;

pub fn auth_router(config: AppState) -> Result<Router<AppState>> {
    let rate_limit = config.config.rate_limit;
    let unprotected = Router::new()
        .route("/login", post(sign_in))
        .route("/register", post(sign_up))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password));
    let unprotected = if rate_limit {
        rate_limited(unprotected)?
    } else {
        unprotected
    };

    let session_aware = Router::new()
        .route("/login", get(sign_in_page))
        .route("/logout", post(sign_out))
        .route("/session", get(session))
        .route("/profile/password", patch(update_password));

    Ok(Router::new()
        .merge(unprotected)
        .merge(session_aware)
        .with_state(config))
}

/// Per-IP limit on the credential endpoints.
fn rate_limited(router: Router<AppState>) -> Result<Router<AppState>> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(4)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| Error::Config("invalid rate limiter settings".into()))?,
    );
    let governor_limiter = governor_conf.limiter().clone();
    let interval = Duration::from_secs(60);
    // a separate background task to clean up
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(interval);
            tracing::info!("rate limiting storage size: {}", governor_limiter.len());
            governor_limiter.retain_recent();
        }
    });
    Ok(router.layer(GovernorLayer {
        config: governor_conf,
    }))
}
