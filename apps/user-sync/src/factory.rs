//! Picks the `UserPort` behind the `Api` facade.

use domain::adapters::internal_api::InternalUserApi;
use domain::service::Api;
use domain::{CoreError, SourceKind, UserPort};
use external_users::ExternalUserApi;

use crate::config::Config;

/// Build an `Api` for the source named `kind` (`internal` or `external`).
pub fn create_api(kind: &str, cfg: &Config) -> Result<Api<Box<dyn UserPort>>, CoreError> {
    let port: Box<dyn UserPort> = match SourceKind::parse(kind)? {
        SourceKind::Internal => Box::new(InternalUserApi::new()),
        SourceKind::External => Box::new(ExternalUserApi::with_timeout(
            &cfg.users_api_url,
            cfg.users_api_timeout,
        )?),
    };
    Ok(Api::new(port))
}
