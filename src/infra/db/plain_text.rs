use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{PlainTextRepo, RepoError},
    domain::{
        entities::{FieldUpdate, NodeRef, PlainTextState},
        types::ContentStage,
    },
};

use super::{PostgresPlainTextStore, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PlainTextStateRow {
    derived_text: Option<String>,
    reset_flag: bool,
    last_derived_at: Option<OffsetDateTime>,
}

impl From<PlainTextStateRow> for PlainTextState {
    fn from(row: PlainTextStateRow) -> Self {
        Self {
            derived_text: row.derived_text,
            reset_flag: row.reset_flag,
            last_derived_at: row.last_derived_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MarkedNodeRow {
    node_id: Uuid,
    node_type: String,
}

/// Build a single-statement upsert touching only the fields present in `update`.
fn build_upsert<'q>(
    node: &'q NodeRef,
    stage: ContentStage,
    update: &'q FieldUpdate,
) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO plain_text_states \
         (node_id, stage, node_type, derived_text, reset_flag, last_derived_at) VALUES (",
    );
    {
        let mut values = qb.separated(", ");
        values.push_bind(node.id);
        values.push_bind(stage);
        values.push_bind(node.node_type.as_str());
        values.push_bind(update.derived_text.clone().flatten());
        values.push_bind(update.reset_flag.unwrap_or(true));
        values.push_bind(update.last_derived_at);
    }
    qb.push(") ON CONFLICT (node_id, stage) DO UPDATE SET updated_at = now()");

    if update.derived_text.is_some() {
        qb.push(", derived_text = EXCLUDED.derived_text");
    }
    if update.reset_flag.is_some() {
        qb.push(", reset_flag = EXCLUDED.reset_flag");
    }
    if update.last_derived_at.is_some() {
        qb.push(", last_derived_at = EXCLUDED.last_derived_at");
    }
    qb
}

#[async_trait]
impl PlainTextRepo for PostgresPlainTextStore {
    async fn load_state(
        &self,
        node: &NodeRef,
        stage: ContentStage,
    ) -> Result<PlainTextState, RepoError> {
        let row = sqlx::query_as::<_, PlainTextStateRow>(
            r#"
            SELECT derived_text, reset_flag, last_derived_at
            FROM plain_text_states
            WHERE node_id = $1 AND stage = $2
            "#,
        )
        .bind(node.id)
        .bind(stage)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PlainTextState::from).unwrap_or_default())
    }

    async fn update_fields(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        update: &FieldUpdate,
    ) -> Result<(), RepoError> {
        if update.is_empty() {
            return Ok(());
        }

        build_upsert(node, stage, update)
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn purge(&self, node: &NodeRef, stage: ContentStage) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM plain_text_states WHERE node_id = $1 AND stage = $2")
            .bind(node.id)
            .bind(stage)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_marked(
        &self,
        stage: ContentStage,
        limit: u32,
    ) -> Result<Vec<NodeRef>, RepoError> {
        let rows = sqlx::query_as::<_, MarkedNodeRow>(
            r#"
            SELECT node_id, node_type
            FROM plain_text_states
            WHERE stage = $1 AND reset_flag
            ORDER BY last_derived_at ASC NULLS FIRST, node_id ASC
            LIMIT $2
            "#,
        )
        .bind(stage)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| NodeRef::new(row.node_id, row.node_type))
            .collect())
    }
}
