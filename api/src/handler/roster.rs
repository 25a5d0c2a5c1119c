use crate::{
    extractor::AuthorizedUser,
    model::event::{CancelResponse, ForceCancelRequest, JoinResponse, NormalizeSweepResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use garde::Validate;
use kernel::model::{
    event::{event::ForceCancel, RosterChange},
    id::{EventId, UserId},
    notification::{event::CreateNotification, NotificationKind},
};
use kernel::notifier::PromotionNotice;
use kernel::repository::event::EventNormalization;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

pub async fn join_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<JoinResponse>> {
    let joined = registry
        .event_repository()
        .join(event_id, user.id())
        .await?;
    Ok(Json(JoinResponse::from(&joined)))
}

pub async fn cancel_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<CancelResponse>> {
    let change = registry
        .event_repository()
        .cancel(event_id, user.id())
        .await?;

    // 繰り上げ通知はロスター確定後の fire-and-forget。
    // 失敗してもキャンセル自体は成功として返す
    spawn_promotion_notice(&registry, &change);

    Ok(Json(CancelResponse::from(&change)))
}

pub async fn kick_user(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<ForceCancelRequest>,
) -> AppResult<Json<CancelResponse>> {
    ensure_admin(&registry, &user)?;
    req.validate(&())?;
    let target: UserId = req.user_id.parse()?;

    let change = registry
        .event_repository()
        .force_cancel(ForceCancel::new(
            event_id,
            user.id(),
            target.clone(),
            req.promote,
        ))
        .await?;

    if req.notify {
        spawn_admin_cancelled_notice(&registry, &change, target, req.reason);
        spawn_promotion_notice(&registry, &change);
    }

    Ok(Json(CancelResponse::from(&change)))
}

pub async fn normalize_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventNormalization>> {
    ensure_admin(&registry, &user)?;
    registry
        .event_repository()
        .normalize(event_id)
        .await
        .map(Json)
}

pub async fn normalize_all_events(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<NormalizeSweepResponse>> {
    ensure_admin(&registry, &user)?;
    registry
        .event_repository()
        .normalize_all()
        .await
        .map(NormalizeSweepResponse::from)
        .map(Json)
}

fn ensure_admin(registry: &AppRegistry, user: &AuthorizedUser) -> AppResult<()> {
    if registry.authorization_provider().is_admin(&user.user_id) {
        Ok(())
    } else {
        Err(AppError::ForbiddenOperation)
    }
}

/// 繰り上がったユーザーへアプリ内通知と LINE push を送る。
/// ロスターのトランザクションは確定済みなので、ここでの失敗は
/// ログに残すだけで呼び出し元へは返さない。
fn spawn_promotion_notice(registry: &AppRegistry, change: &RosterChange) {
    let Some(promoted) = change.promoted.clone() else {
        return;
    };
    let registry = registry.clone();
    let change = change.clone();
    tokio::spawn(async move {
        let url = registry.event_url(change.event_id);

        let note = CreateNotification::new(
            promoted.clone(),
            NotificationKind::Promoted,
            change.event_id,
            change.title.clone(),
            change.when_label.clone(),
            url.clone(),
            None,
        );
        if let Err(e) = registry.notification_repository().add(note).await {
            tracing::warn!(error = %e, user_id = %promoted, "繰り上げ通知の保存に失敗しました");
        }

        let notice = PromotionNotice::new(promoted.clone(), change.title, change.when_label, url);
        if let Err(e) = registry.notifier().notify_promoted(&notice).await {
            tracing::warn!(error = %e, user_id = %promoted, "繰り上げの LINE push に失敗しました");
        }
    });
}

/// 強制キャンセルされた本人へのアプリ内通知（fire-and-forget）
fn spawn_admin_cancelled_notice(
    registry: &AppRegistry,
    change: &RosterChange,
    target: UserId,
    reason: Option<String>,
) {
    let registry = registry.clone();
    let note = CreateNotification::new(
        target.clone(),
        NotificationKind::AdminCancelled,
        change.event_id,
        change.title.clone(),
        change.when_label.clone(),
        registry.event_url(change.event_id),
        reason,
    );
    tokio::spawn(async move {
        if let Err(e) = registry.notification_repository().add(note).await {
            tracing::warn!(error = %e, user_id = %target, "強制キャンセル通知の保存に失敗しました");
        }
    });
}
