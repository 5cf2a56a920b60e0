use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use washline_core::domain::conversation::{
    BookingOutcome, ConversationId, ConversationState, ConversationStatus, ConversationThread,
    DeliveryStatus, Direction, Message, MessageId, TenantId,
};

use super::{parse_timestamp, parse_uuid, ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        customer_phone: &str,
    ) -> Result<Option<ConversationThread>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                tenant_id,
                customer_phone,
                status,
                conversation_state,
                booking_outcome,
                message_count,
                last_message_at,
                created_at
             FROM conversations
             WHERE tenant_id = ? AND customer_phone = ? AND status = 'active'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(&tenant_id.0)
        .bind(customer_phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(thread_from_row).transpose()
    }

    async fn insert(&self, thread: &ConversationThread) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (
                id,
                tenant_id,
                customer_phone,
                status,
                conversation_state,
                booking_outcome,
                message_count,
                last_message_at,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(thread.id.0.to_string())
        .bind(&thread.tenant_id.0)
        .bind(&thread.customer_phone)
        .bind(thread.status.as_str())
        .bind(thread.state.as_str())
        .bind(thread.booking_outcome.as_str())
        .bind(thread.message_count)
        .bind(thread.last_message_at.to_rfc3339())
        .bind(thread.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), RepositoryError> {
        let media_urls = if message.media_urls.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.media_urls).map_err(|error| {
                RepositoryError::Decode(format!("could not encode media urls: {error}"))
            })?)
        };

        sqlx::query(
            "INSERT INTO messages (
                id,
                conversation_id,
                direction,
                body,
                media_urls,
                status,
                provider_sid,
                error_code,
                error_message,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.0.to_string())
        .bind(message.conversation_id.0.to_string())
        .bind(message.direction.as_str())
        .bind(&message.body)
        .bind(media_urls)
        .bind(message.status.as_str())
        .bind(message.provider_sid.as_deref())
        .bind(message.error_code.as_deref())
        .bind(message.error_message.as_deref())
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                conversation_id,
                direction,
                body,
                media_urls,
                status,
                provider_sid,
                error_code,
                error_message,
                created_at
             FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn touch_activity(
        &self,
        conversation_id: &ConversationId,
        message_count: i64,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE conversations SET message_count = ?, last_message_at = ? WHERE id = ?",
        )
        .bind(message_count)
        .bind(last_message_at.to_rfc3339())
        .bind(conversation_id.0.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_state(
        &self,
        conversation_id: &ConversationId,
        state: ConversationState,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE conversations SET conversation_state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(conversation_id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_outcome(
        &self,
        conversation_id: &ConversationId,
        outcome: BookingOutcome,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE conversations SET booking_outcome = ? WHERE id = ?")
            .bind(outcome.as_str())
            .bind(conversation_id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        error_code: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE messages SET status = ?, error_code = ?, error_message = ? WHERE provider_sid = ?",
        )
        .bind(status.as_str())
        .bind(error_code)
        .bind(error_message)
        .bind(provider_sid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn thread_from_row(row: SqliteRow) -> Result<ConversationThread, RepositoryError> {
    Ok(ConversationThread {
        id: ConversationId(parse_uuid(&row.get::<String, _>("id"))?),
        tenant_id: TenantId(row.get("tenant_id")),
        customer_phone: row.get("customer_phone"),
        status: ConversationStatus::parse_or_active(&row.get::<String, _>("status")),
        state: ConversationState::parse_or_initial(&row.get::<String, _>("conversation_state")),
        booking_outcome: BookingOutcome::parse_or_not_applicable(
            &row.get::<String, _>("booking_outcome"),
        ),
        message_count: row.get("message_count"),
        last_message_at: parse_timestamp(&row.get::<String, _>("last_message_at"))?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let direction = match row.get::<String, _>("direction").as_str() {
        "inbound" => Direction::Inbound,
        "outbound" => Direction::Outbound,
        other => {
            return Err(RepositoryError::Decode(format!("invalid message direction `{other}`")))
        }
    };

    let media_urls = match row.get::<Option<String>, _>("media_urls") {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| {
            RepositoryError::Decode(format!("could not decode media urls: {error}"))
        })?,
        None => Vec::new(),
    };

    let status_raw: String = row.get("status");
    let status = DeliveryStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid delivery status `{status_raw}`"))
    })?;

    Ok(Message {
        id: MessageId(parse_uuid(&row.get::<String, _>("id"))?),
        conversation_id: ConversationId(parse_uuid(&row.get::<String, _>("conversation_id"))?),
        direction,
        body: row.get("body"),
        media_urls,
        status,
        provider_sid: row.get("provider_sid"),
        error_code: row.get("error_code"),
        error_message: row.get("error_message"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use washline_core::domain::conversation::{
        BookingOutcome, ConversationState, ConversationThread, DeliveryStatus, Direction, Message,
        TenantId,
    };

    use crate::repositories::{ConversationRepository, SqlConversationRepository};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlConversationRepository {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect sqlite memory");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlConversationRepository::new(pool)
    }

    fn tenant() -> TenantId {
        TenantId("tenant-test".to_string())
    }

    #[tokio::test]
    async fn open_thread_round_trips_with_state_and_outcome_updates() {
        let repo = repo().await;
        let thread = ConversationThread::open(tenant(), "+14165550100", Utc::now());
        repo.insert(&thread).await.expect("insert thread");

        let found = repo
            .find_open(&tenant(), "+14165550100")
            .await
            .expect("find open")
            .expect("thread exists");
        assert_eq!(found.id, thread.id);
        assert_eq!(found.state, ConversationState::Greeting);

        repo.update_state(&thread.id, ConversationState::SelectingTime)
            .await
            .expect("update state");
        repo.record_outcome(&thread.id, BookingOutcome::Booked).await.expect("record outcome");

        let found = repo
            .find_open(&tenant(), "+14165550100")
            .await
            .expect("find open")
            .expect("thread exists");
        assert_eq!(found.state, ConversationState::SelectingTime);
        assert_eq!(found.booking_outcome, BookingOutcome::Booked);
    }

    #[tokio::test]
    async fn messages_replay_in_insertion_order() {
        let repo = repo().await;
        let thread = ConversationThread::open(tenant(), "+14165550101", Utc::now());
        repo.insert(&thread).await.expect("insert thread");

        let base = Utc::now();
        for (offset, body) in ["hi", "Hey! Need a pickup?", "yes please"].iter().enumerate() {
            let mut message = Message::inbound(
                thread.id.clone(),
                *body,
                Vec::new(),
                Some(format!("SM{offset}")),
                base + Duration::seconds(offset as i64),
            );
            if offset == 1 {
                message.direction = Direction::Outbound;
                message.status = DeliveryStatus::Sending;
            }
            repo.append_message(&message).await.expect("append message");
        }

        let messages = repo.list_messages(&thread.id).await.expect("list messages");
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "Hey! Need a pickup?", "yes please"]);
    }

    #[tokio::test]
    async fn delivery_status_updates_by_provider_sid() {
        let repo = repo().await;
        let thread = ConversationThread::open(tenant(), "+14165550102", Utc::now());
        repo.insert(&thread).await.expect("insert thread");

        let message = Message::inbound(
            thread.id.clone(),
            "hello",
            Vec::new(),
            Some("SM-status".to_string()),
            Utc::now(),
        );
        repo.append_message(&message).await.expect("append message");

        repo.update_delivery_status("SM-status", DeliveryStatus::Failed, Some("30006"), Some("landline"))
            .await
            .expect("update status");

        let messages = repo.list_messages(&thread.id).await.expect("list messages");
        assert_eq!(messages[0].status, DeliveryStatus::Failed);
        assert_eq!(messages[0].error_code.as_deref(), Some("30006"));
    }

    #[tokio::test]
    async fn find_open_ignores_closed_threads_and_other_tenants() {
        let repo = repo().await;
        let mut closed = ConversationThread::open(tenant(), "+14165550103", Utc::now());
        closed.status = washline_core::domain::conversation::ConversationStatus::Closed;
        repo.insert(&closed).await.expect("insert closed thread");

        assert!(repo.find_open(&tenant(), "+14165550103").await.expect("find").is_none());

        let other_tenant_thread = ConversationThread::open(
            TenantId("someone-else".to_string()),
            "+14165550104",
            Utc::now(),
        );
        repo.insert(&other_tenant_thread).await.expect("insert thread");
        assert!(repo.find_open(&tenant(), "+14165550104").await.expect("find").is_none());
    }
}
