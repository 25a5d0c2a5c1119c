use crate::database::{model::notification::NotificationRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::{NotificationId, UserId},
    notification::{
        event::{CreateNotification, MarkRead},
        Notification,
    },
};
use kernel::repository::notification::NotificationRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct NotificationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl NotificationRepository for NotificationRepositoryImpl {
    async fn add(&self, event: CreateNotification) -> AppResult<NotificationId> {
        let notification_id = NotificationId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO notifications
                (notification_id, user_id, kind, event_id, title, when_label, url, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification_id.raw())
        .bind(event.user_id.as_str())
        .bind(event.kind.to_string())
        .bind(event.event_id.raw())
        .bind(&event.title)
        .bind(&event.when_label)
        .bind(&event.url)
        .bind(&event.reason)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No notification record has been created".into(),
            ));
        }

        Ok(notification_id)
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> AppResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
                SELECT
                    notification_id, user_id, kind, event_id, title,
                    when_label, url, reason, is_read, created_at
                FROM notifications
                WHERE user_id = $1
                ORDER BY is_read ASC, created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(&self, event: MarkRead) -> AppResult<()> {
        // 既読への更新は冪等。既に既読でも成功として扱う
        let res = sqlx::query(
            r#"
                UPDATE notifications
                SET is_read = TRUE
                WHERE notification_id = $1 AND user_id = $2
            "#,
        )
        .bind(event.notification_id.raw())
        .bind(event.user_id.as_str())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified notification not found".into(),
            ));
        }

        Ok(())
    }
}
