use std::sync::Arc;

use sqlx::PgPool;

use schoolhub_config::{
    CorsConfig, EmailConfig, JwtConfig, OtpConfig, RateLimitConfig, SchedulerConfig, UploadConfig,
};
use schoolhub_core::{FileStorage, LocalFileStorage};

use crate::utils::notifier::{Notifier, NotifyError, notifier_from_config};

/// Shared by every handler. Collaborators sit behind trait objects so tests
/// can swap in a recording notifier and a temporary upload directory.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub otp_config: OtpConfig,
    pub upload_config: UploadConfig,
    pub scheduler_config: SchedulerConfig,
    pub storage: Arc<dyn FileStorage>,
    pub notifier: Arc<dyn Notifier>,
}

pub fn init_app_state(db: PgPool) -> Result<AppState, NotifyError> {
    let email_config = EmailConfig::from_env();
    let upload_config = UploadConfig::from_env();
    let notifier: Arc<dyn Notifier> = Arc::from(notifier_from_config(&email_config)?);

    Ok(AppState {
        db,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        otp_config: OtpConfig::from_env(),
        scheduler_config: SchedulerConfig::from_env(),
        storage: Arc::new(LocalFileStorage::new(&upload_config.dir)),
        upload_config,
        email_config,
        notifier,
    })
}
