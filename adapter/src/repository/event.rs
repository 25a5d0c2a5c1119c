use crate::database::{model::event::EventRow, ConnectionPool};
use async_trait::async_trait;
use chrono::NaiveDate;
use derive_new::new;
use kernel::model::{
    event::{
        event::{CreateEvent, DeleteEvent, ForceCancel},
        Event, JoinedEvent, RosterChange,
    },
    id::{EventId, UserId},
    roster::Roster,
};
use kernel::repository::event::{EventNormalization, EventRepository};
use shared::error::{AppError, AppResult};

// ロスター更新トランザクションの再試行上限。
// 超えたら Conflict としてそのまま呼び出し元へ返す。
const MAX_TX_ATTEMPTS: u32 = 5;

const SELECT_EVENT: &str = r#"
    SELECT
        event_id, title, scheduled_at, timezone, time_label, location,
        capacity, participants, waitlist, created_by, created_at
    FROM events
    WHERE event_id = $1
"#;

// 行ロックでイベント単位の直列化を行う。
// 同じイベントへの同時 join がどちらも「空きあり」を見ることはない。
const SELECT_EVENT_FOR_UPDATE: &str = r#"
    SELECT
        event_id, title, scheduled_at, timezone, time_label, location,
        capacity, participants, waitlist, created_by, created_at
    FROM events
    WHERE event_id = $1
    FOR UPDATE
"#;

const UPDATE_LISTS: &str = r#"
    UPDATE events
    SET participants = $2, waitlist = $3
    WHERE event_id = $1
"#;

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let event_id = EventId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO events
                (event_id, title, scheduled_at, timezone, time_label,
                 location, capacity, participants, waitlist, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, '{}', '{}', $8)
            "#,
        )
        .bind(event_id.raw())
        .bind(&event.title)
        .bind(event.scheduled_at)
        .bind(event.timezone.name())
        .bind(&event.time_label)
        .bind(&event.location)
        .bind(event.capacity)
        .bind(event.created_by.as_str())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been created".into(),
            ));
        }

        Ok(event_id)
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        // 参加者・キャンセル待ちはイベント行に埋め込まれているので
        // 行の削除で従属データも一緒に消える。通知は履歴として残す。
        let res = sqlx::query("DELETE FROM events WHERE event_id = $1")
            .bind(event.event_id.raw())
            .execute(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "イベント（{}）が見つかりませんでした。",
                event.event_id
            )));
        }

        tracing::info!(
            event_id = %event.event_id,
            requested_by = %event.requested_user,
            "イベントを削除しました"
        );
        Ok(())
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(SELECT_EVENT)
            .bind(event_id.raw())
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(self.into_healed_event(row)?))
    }

    async fn find_in_month(&self, year: i32, month: u32) -> AppResult<Vec<Event>> {
        let (start, end) = month_range(year, month)?;
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
                SELECT
                    event_id, title, scheduled_at, timezone, time_label, location,
                    capacity, participants, waitlist, created_by, created_at
                FROM events
                WHERE scheduled_at >= $1 AND scheduled_at < $2
                ORDER BY scheduled_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter()
            .map(|row| self.into_healed_event(row))
            .collect()
    }

    async fn join(&self, event_id: EventId, user_id: UserId) -> AppResult<JoinedEvent> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_join(event_id, &user_id).await {
                Err(e) if is_retryable(&e) && attempt < MAX_TX_ATTEMPTS => {
                    tracing::debug!(%event_id, attempt, error = %e, "join の競合を再試行します");
                }
                Err(e) if is_retryable(&e) => {
                    return Err(AppError::TransactionConflict(format!(
                        "イベント（{event_id}）への参加申込"
                    )))
                }
                other => return other,
            }
        }
    }

    async fn cancel(&self, event_id: EventId, user_id: UserId) -> AppResult<RosterChange> {
        self.remove_with_retry(event_id, user_id, true).await
    }

    async fn force_cancel(&self, event: ForceCancel) -> AppResult<RosterChange> {
        tracing::info!(
            event_id = %event.event_id,
            acting_user = %event.acting_user,
            target_user = %event.target_user,
            promote = event.promote,
            "管理者による強制キャンセル"
        );
        self.remove_with_retry(event.event_id, event.target_user, event.promote)
            .await
    }

    async fn normalize(&self, event_id: EventId) -> AppResult<EventNormalization> {
        let mut tx = self.db.begin().await?;
        let row: Option<EventRow> = sqlx::query_as(SELECT_EVENT_FOR_UPDATE)
            .bind(event_id.raw())
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        let row = row.ok_or_else(|| {
            AppError::EntityNotFound(format!("イベント（{event_id}）が見つかりませんでした。"))
        })?;

        let raw_participants = row.participants.clone();
        let raw_waitlist = row.waitlist.clone();
        let (event, report) = row.into_event()?;

        let repaired = event
            .roster
            .differs_from(&raw_participants, &raw_waitlist);
        if repaired {
            write_lists(&mut tx, event_id, &event.roster).await?;
        }
        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(EventNormalization {
            event_id,
            report,
            repaired,
        })
    }

    async fn normalize_all(&self) -> AppResult<Vec<EventNormalization>> {
        let ids: Vec<(uuid::Uuid,)> = sqlx::query_as("SELECT event_id FROM events")
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;

        let mut results = Vec::with_capacity(ids.len());
        for (id,) in ids {
            let event_id = EventId::from(id);
            // 読めない行が 1 件あっても残りの修復は続ける
            match self.normalize(event_id).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(error = %e, %event_id, "修復できないためスキップします")
                }
            }
        }
        Ok(results)
    }
}

impl EventRepositoryImpl {
    async fn try_join(&self, event_id: EventId, user_id: &UserId) -> AppResult<JoinedEvent> {
        let mut tx = self.db.begin().await?;
        let row = fetch_for_update(&mut tx, event_id).await?;
        let (mut event, _) = row.into_event()?;

        let capacity = event.capacity.max(0) as usize;
        let outcome = event.roster.join(user_id.clone(), capacity);

        // 正規化で壊れた項目が落ちている場合もあるので常に書き戻す
        write_lists(&mut tx, event_id, &event.roster).await?;
        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(JoinedEvent {
            event,
            placement: outcome.placement,
            already_joined: outcome.already_joined,
        })
    }

    async fn remove_with_retry(
        &self,
        event_id: EventId,
        target: UserId,
        promote: bool,
    ) -> AppResult<RosterChange> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_remove(event_id, &target, promote).await {
                Err(e) if is_retryable(&e) && attempt < MAX_TX_ATTEMPTS => {
                    tracing::debug!(%event_id, attempt, error = %e, "cancel の競合を再試行します");
                }
                Err(e) if is_retryable(&e) => {
                    return Err(AppError::TransactionConflict(format!(
                        "イベント（{event_id}）のキャンセル処理"
                    )))
                }
                other => return other,
            }
        }
    }

    async fn try_remove(
        &self,
        event_id: EventId,
        target: &UserId,
        promote: bool,
    ) -> AppResult<RosterChange> {
        let mut tx = self.db.begin().await?;
        let row = fetch_for_update(&mut tx, event_id).await?;
        let (mut event, _) = row.into_event()?;

        let removal = event.roster.remove(target, promote);

        write_lists(&mut tx, event_id, &event.roster).await?;
        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(RosterChange {
            event_id,
            title: event.title.clone(),
            when_label: event.when_label(),
            was_participant: removal.was_participant,
            promoted: removal.promoted,
        })
    }

    /// 読み取り経路の自己修復。リストが壊れていたら修復済みの内容を
    /// 非同期で書き戻す。失敗してもログを残すだけで読み取りには影響しない。
    fn into_healed_event(&self, row: EventRow) -> AppResult<Event> {
        let raw_participants = row.participants.clone();
        let raw_waitlist = row.waitlist.clone();
        let event_id = EventId::from(row.event_id);
        let (event, report) = row.into_event()?;

        if event.roster.differs_from(&raw_participants, &raw_waitlist) {
            tracing::info!(
                %event_id,
                removed = report.removed(),
                "壊れたリストを検出したため自己修復します"
            );
            let pool = self.db.inner_ref().clone();
            let participants = to_raw(&event.roster.participants);
            let waitlist = to_raw(&event.roster.waitlist);
            tokio::spawn(async move {
                let res = sqlx::query(UPDATE_LISTS)
                    .bind(event_id.raw())
                    .bind(&participants)
                    .bind(&waitlist)
                    .execute(&pool)
                    .await;
                if let Err(e) = res {
                    tracing::warn!(error = ?e, %event_id, "自己修復の書き戻しに失敗しました");
                }
            });
        }

        Ok(event)
    }
}

async fn fetch_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: EventId,
) -> AppResult<EventRow> {
    let row: Option<EventRow> = sqlx::query_as(SELECT_EVENT_FOR_UPDATE)
        .bind(event_id.raw())
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
    row.ok_or_else(|| {
        AppError::EntityNotFound(format!("イベント（{event_id}）が見つかりませんでした。"))
    })
}

async fn write_lists(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: EventId,
    roster: &Roster,
) -> AppResult<()> {
    let res = sqlx::query(UPDATE_LISTS)
        .bind(event_id.raw())
        .bind(to_raw(&roster.participants))
        .bind(to_raw(&roster.waitlist))
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No event lists have been updated".into(),
        ));
    }
    Ok(())
}

fn to_raw(list: &[UserId]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

fn month_range(
    year: i32,
    month: u32,
) -> AppResult<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        AppError::UnprocessableEntity(format!("不正な年月です: {year}-{month}"))
    })?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::UnprocessableEntity(format!("不正な年月です: {year}-{month}")))?;
    Ok((
        start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
    ))
}

// シリアライズ失敗・デッドロックは再試行してよい
fn is_retryable(e: &AppError) -> bool {
    let source = match e {
        AppError::TransactionError(e) | AppError::SpecificOperationError(e) => e,
        _ => return false,
    };
    source
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "40001" || code == "40P01")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::sync::Arc;

    fn repo(pool: sqlx::PgPool) -> EventRepositoryImpl {
        EventRepositoryImpl::new(ConnectionPool::new(pool))
    }

    fn uid(s: &str) -> UserId {
        s.parse().unwrap()
    }

    async fn create_event(repo: &EventRepositoryImpl, capacity: i32) -> EventId {
        repo.create(CreateEvent::new(
            "火曜練習会".into(),
            Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
            chrono_tz::Asia::Tokyo,
            Some("18:50〜21:30".into()),
            Some("第一体育館".into()),
            capacity,
            uid("line:Uadmin"),
        ))
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn register_and_find_event(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let event_id = create_event(&repo, 10).await;

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.title, "火曜練習会");
        assert_eq!(event.capacity, 10);
        assert!(event.roster.participants.is_empty());

        let april = repo.find_in_month(2025, 4).await.unwrap();
        assert_eq!(april.len(), 1);
        assert_eq!(april[0].id, event_id);

        let may = repo.find_in_month(2025, 5).await.unwrap();
        assert!(may.is_empty());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn delete_removes_event_and_embedded_lists(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let event_id = create_event(&repo, 2).await;
        repo.join(event_id, uid("line:U1")).await.unwrap();

        repo.delete(DeleteEvent::new(event_id, uid("line:Uadmin")))
            .await
            .unwrap();
        assert!(repo.find_by_id(event_id).await.unwrap().is_none());

        let err = repo
            .delete(DeleteEvent::new(event_id, uid("line:Uadmin")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn join_fills_capacity_then_waitlists(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let event_id = create_event(&repo, 1).await;

        let first = repo.join(event_id, uid("line:U1")).await.unwrap();
        assert_eq!(
            first.placement,
            kernel::model::roster::Placement::Participant
        );
        assert!(!first.already_joined);

        let second = repo.join(event_id, uid("line:U2")).await.unwrap();
        assert_eq!(
            second.placement,
            kernel::model::roster::Placement::Waitlisted
        );

        // 同じユーザーの再申込は no-op
        let again = repo.join(event_id, uid("line:U1")).await.unwrap();
        assert!(again.already_joined);

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.roster.participants, vec![uid("line:U1")]);
        assert_eq!(event.roster.waitlist, vec![uid("line:U2")]);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn join_missing_event_is_not_found(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let err = repo
            .join(EventId::new(), uid("line:U1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn cancelling_participant_promotes_fifo(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let event_id = create_event(&repo, 2).await;
        for u in ["line:A", "line:B", "line:C", "line:D"] {
            repo.join(event_id, uid(u)).await.unwrap();
        }

        // 参加者 A のキャンセルで C（キャンセル待ち先頭）が繰り上がる
        let change = repo.cancel(event_id, uid("line:A")).await.unwrap();
        assert!(change.was_participant);
        assert_eq!(change.promoted, Some(uid("line:C")));
        assert_eq!(change.title, "火曜練習会");
        assert!(change.when_label.contains("2025/04/01"));

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(
            event.roster.participants,
            vec![uid("line:B"), uid("line:C")]
        );
        assert_eq!(event.roster.waitlist, vec![uid("line:D")]);

        // キャンセル待ちのみの D が抜けても繰り上げは起きない
        let change = repo.cancel(event_id, uid("line:D")).await.unwrap();
        assert!(!change.was_participant);
        assert_eq!(change.promoted, None);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn force_cancel_without_promote_keeps_participants(pool: sqlx::PgPool) {
        let repo = repo(pool);
        let event_id = create_event(&repo, 2).await;
        for u in ["line:A", "line:B", "line:C", "line:D"] {
            repo.join(event_id, uid(u)).await.unwrap();
        }

        let change = repo
            .force_cancel(ForceCancel::new(
                event_id,
                uid("line:Uadmin"),
                uid("line:C"),
                false,
            ))
            .await
            .unwrap();
        assert_eq!(change.promoted, None);

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(
            event.roster.participants,
            vec![uid("line:A"), uid("line:B")]
        );
        assert_eq!(event.roster.waitlist, vec![uid("line:D")]);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn normalize_repairs_corrupt_lists_once(pool: sqlx::PgPool) {
        let repo = repo(pool.clone());
        let event_id = create_event(&repo, 10).await;

        // 過去データを模した壊れたリストを直接書き込む
        sqlx::query("UPDATE events SET participants = $2, waitlist = $3 WHERE event_id = $1")
            .bind(event_id.raw())
            .bind(vec![
                "dummy-user".to_string(),
                "  line:U1  ".to_string(),
                "line:U1".to_string(),
                "bogus".to_string(),
            ])
            .bind(vec!["line:U1".to_string(), "line:U2".to_string()])
            .execute(&pool)
            .await
            .unwrap();

        let result = repo.normalize(event_id).await.unwrap();
        assert!(result.repaired);
        assert_eq!(result.report.before_participants, 4);
        assert_eq!(result.report.after_participants, 1);
        assert_eq!(result.report.before_waitlist, 2);
        assert_eq!(result.report.after_waitlist, 1);

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.roster.participants, vec![uid("line:U1")]);
        assert_eq!(event.roster.waitlist, vec![uid("line:U2")]);

        // 2 回目は何も変わらない
        let result = repo.normalize(event_id).await.unwrap();
        assert!(!result.repaired);
        assert_eq!(result.report.removed(), 0);

        let sweep = repo.normalize_all().await.unwrap();
        assert_eq!(sweep.len(), 1);
        assert!(!sweep[0].repaired);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn corrupt_creator_does_not_block_reads(pool: sqlx::PgPool) {
        let repo = repo(pool.clone());
        let event_id = create_event(&repo, 10).await;
        repo.join(event_id, uid("line:U1")).await.unwrap();

        // シード時代の行を模して作成者欄を壊す
        sqlx::query("UPDATE events SET created_by = 'dummy' WHERE event_id = $1")
            .bind(event_id.raw())
            .execute(&pool)
            .await
            .unwrap();

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.created_by.as_str(), "system:unknown");
        assert_eq!(event.roster.participants, vec![uid("line:U1")]);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn normalize_sweep_skips_unreadable_event(pool: sqlx::PgPool) {
        let repo = repo(pool.clone());
        let broken = create_event(&repo, 10).await;
        let intact = create_event(&repo, 10).await;

        sqlx::query("UPDATE events SET timezone = 'Mars/Olympus' WHERE event_id = $1")
            .bind(broken.raw())
            .execute(&pool)
            .await
            .unwrap();

        // 読めない 1 件は飛ばして残りの結果を返す
        let sweep = repo.normalize_all().await.unwrap();
        assert_eq!(sweep.len(), 1);
        assert_eq!(sweep[0].event_id, intact);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn concurrent_joins_never_exceed_capacity(pool: sqlx::PgPool) {
        let repo = Arc::new(repo(pool));
        let event_id = create_event(&repo, 10).await;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..50 {
            let repo = Arc::clone(&repo);
            tasks.spawn(async move {
                repo.join(event_id, uid(&format!("line:U{i:02}"))).await
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }

        let event = repo.find_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.roster.participants.len(), 10);
        assert_eq!(event.roster.waitlist.len(), 40);

        let mut all: Vec<&UserId> = event
            .roster
            .participants
            .iter()
            .chain(event.roster.waitlist.iter())
            .collect();
        all.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        all.dedup();
        assert_eq!(all.len(), 50, "no id may appear twice across the lists");
    }
}
