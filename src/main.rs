use std::sync::Arc;

use stayfinder::config::BackendConfig;
use stayfinder::identity::{HttpIdentityService, IdentityService};
use stayfinder::listings::{self, HttpListingSource, ListingSource};
use stayfinder::SessionSynchronizer;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    // Missing backend config is non-fatal: auth is disabled and listings are empty.
    let config = match BackendConfig::from_env() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "backend not configured, running without auth or listings");
            None
        }
    };

    let identity: Option<Arc<dyn IdentityService>> = config.as_ref().and_then(|c| match HttpIdentityService::new(c) {
        Ok(service) => Some(Arc::new(service) as Arc<dyn IdentityService>),
        Err(e) => {
            tracing::warn!(error = %e, "identity client init failed");
            None
        }
    });
    let source = config.as_ref().and_then(|c| match HttpListingSource::new(c) {
        Ok(source) => Some(source),
        Err(e) => {
            tracing::warn!(error = %e, "listing client init failed");
            None
        }
    });

    let session = SessionSynchronizer::connect(identity).await;
    let current = session.current_session();
    tracing::info!(
        authenticated = current.is_authenticated(),
        user = current.identity.as_ref().map_or("-", |i| i.display_name()),
        "session ready"
    );

    let featured = listings::load_featured(source.as_ref().map(|s| s as &dyn ListingSource)).await;
    if featured.is_empty() {
        tracing::info!("no featured listings available");
    }
    for listing in &featured {
        tracing::info!(
            id = %listing.id,
            title = %listing.title,
            location = %listing.location,
            featured = listing.featured,
            "featured listing"
        );
    }

    session.dispose();
}
