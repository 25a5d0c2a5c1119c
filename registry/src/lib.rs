use std::sync::Arc;

use adapter::auth::{LineTokenVerifier, StaticAdminList};
use adapter::database::ConnectionPool;
use adapter::notifier::LineNotifier;
use adapter::redis::RedisClient;
use adapter::repository::{
    event::EventRepositoryImpl, health::HealthCheckRepositoryImpl,
    notification::NotificationRepositoryImpl, session::SessionRepositoryImpl,
};
use kernel::notifier::Notifier;
use kernel::repository::auth::{AuthorizationProvider, IdTokenVerifier, SessionRepository};
use kernel::repository::event::EventRepository;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::notification::NotificationRepository;
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    event_repository: Arc<dyn EventRepository>,
    notification_repository: Arc<dyn NotificationRepository>,
    session_repository: Arc<dyn SessionRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
    id_token_verifier: Arc<dyn IdTokenVerifier>,
    notifier: Arc<dyn Notifier>,
    base_url: String,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, redis_client: Arc<RedisClient>, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let event_repository = Arc::new(EventRepositoryImpl::new(pool.clone()));
        let notification_repository = Arc::new(NotificationRepositoryImpl::new(pool.clone()));
        let session_repository = Arc::new(SessionRepositoryImpl::new(
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let authorization_provider = Arc::new(StaticAdminList::new(&app_config.admin));
        let id_token_verifier = Arc::new(LineTokenVerifier::new(app_config.line.clone()));
        let notifier = Arc::new(LineNotifier::new(app_config.line.clone()));
        Self {
            health_check_repository,
            event_repository,
            notification_repository,
            session_repository,
            authorization_provider,
            id_token_verifier,
            notifier,
            base_url: app_config.web.base_url,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn event_repository(&self) -> Arc<dyn EventRepository> {
        self.event_repository.clone()
    }

    pub fn notification_repository(&self) -> Arc<dyn NotificationRepository> {
        self.notification_repository.clone()
    }

    pub fn session_repository(&self) -> Arc<dyn SessionRepository> {
        self.session_repository.clone()
    }

    pub fn authorization_provider(&self) -> Arc<dyn AuthorizationProvider> {
        self.authorization_provider.clone()
    }

    pub fn id_token_verifier(&self) -> Arc<dyn IdTokenVerifier> {
        self.id_token_verifier.clone()
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// 通知に載せるイベント詳細 URL
    pub fn event_url(&self, event_id: kernel::model::id::EventId) -> String {
        format!("{}/events#{}", self.base_url, event_id)
    }
}
