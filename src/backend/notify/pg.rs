/**
 * Postgres Notifier
 *
 * Persists notifications and forwards a wake-up to the push gateway. The
 * gateway is optional; without one configured, `push` is a no-op so local
 * setups work without any delivery infrastructure.
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::error::{CoreError, CoreResult};
use crate::shared::notification::NotificationKind;

use super::Notifier;

/// Notifier backed by the notifications table plus an HTTP push gateway.
#[derive(Clone)]
pub struct PgNotifier {
    pool: PgPool,
    client: Client,
    push_gateway_url: Option<String>,
}

impl PgNotifier {
    pub fn new(pool: PgPool, push_gateway_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            pool,
            client,
            push_gateway_url,
        }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(
        &self,
        actor_id: Uuid,
        recipient_id: Uuid,
        kind: NotificationKind,
        metadata: serde_json::Value,
    ) -> CoreResult<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (id, actor_id, recipient_id, kind, metadata, created_at)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(actor_id)
        .bind(recipient_id)
        .bind(kind.as_str())
        .bind(&metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn push(&self, recipient_id: Uuid) -> CoreResult<()> {
        let Some(base_url) = &self.push_gateway_url else {
            return Ok(());
        };

        self.client
            .post(format!("{}/push", base_url.trim_end_matches('/')))
            .json(&serde_json::json!({ "recipientId": recipient_id }))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| CoreError::upstream(format!("push gateway: {err}")))
            .map(|_| ())
    }
}
