//! Wiring of the service from loaded settings.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{
        hooks::HookRegistry,
        markup::MarkupNormalizer,
        plain_text::PlainTextService,
        registry::{ComputedParts, NodeTypeRegistry},
        repos::{ContentSource, DependencyGraph, PlainTextRepo},
    },
    config::{DatabaseSettings, PlainTextSettings},
    infra::{
        db::PostgresPlainTextStore,
        error::InfraError,
        markup::{HtmlTextRenderer, ShortcodeRegistry},
        memory::InMemoryPlainTextStore,
    },
};

/// Open the configured store: Postgres when a URL is set, otherwise a
/// process-local store.
pub async fn connect_store(
    settings: &DatabaseSettings,
) -> Result<Arc<dyn PlainTextRepo>, InfraError> {
    let Some(url) = settings.url.as_deref() else {
        info!(
            target = "soffio_plaintext::bootstrap",
            "No database url configured; using in-memory store"
        );
        return Ok(Arc::new(InMemoryPlainTextStore::new()));
    };

    let pool = PostgresPlainTextStore::connect(url, settings.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    if settings.run_migrations {
        PostgresPlainTextStore::run_migrations(&pool)
            .await
            .map_err(|err| InfraError::migration(err.to_string()))?;
    }

    let store = PostgresPlainTextStore::new(pool);
    store
        .health_check()
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    info!(
        target = "soffio_plaintext::bootstrap",
        max_connections = settings.max_connections.get(),
        run_migrations = settings.run_migrations,
        "Connected plain text store"
    );
    Ok(Arc::new(store))
}

/// Host-provided pieces the service cannot build from settings alone.
pub struct ServiceParts {
    pub content: Arc<dyn ContentSource>,
    pub graph: Arc<dyn DependencyGraph>,
    pub computed: ComputedParts,
    pub shortcodes: ShortcodeRegistry,
    pub hooks: HookRegistry,
}

/// Assemble a service using the HTML renderer for rich markup.
pub fn build_service(
    settings: &PlainTextSettings,
    store: Arc<dyn PlainTextRepo>,
    parts: ServiceParts,
) -> PlainTextService {
    let registry = NodeTypeRegistry::from_settings(settings, &parts.computed);
    let renderer = HtmlTextRenderer::new(parts.shortcodes);
    let normalizer = MarkupNormalizer::new(Arc::new(renderer), settings.strip);

    info!(
        target = "soffio_plaintext::bootstrap",
        node_types = registry.len(),
        "Plain text service ready"
    );

    PlainTextService::new(
        Arc::new(registry),
        store,
        parts.content,
        parts.graph,
        Arc::new(normalizer),
        Arc::new(parts.hooks),
    )
    .with_sweep_batch_size(settings.sweep_batch_size)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::config::Settings;

    #[tokio::test]
    async fn missing_url_falls_back_to_memory() {
        let settings = DatabaseSettings {
            url: None,
            max_connections: NonZeroU32::new(1).unwrap(),
            run_migrations: true,
        };
        let store = connect_store(&settings).await.unwrap();
        let node = crate::domain::entities::NodeRef::new(uuid::Uuid::new_v4(), "page");
        let state = store
            .load_state(&node, crate::domain::types::ContentStage::Draft)
            .await
            .unwrap();
        assert!(state.reset_flag);
    }

    #[test]
    fn build_service_registers_configured_types() {
        let settings = Settings::default();
        let arena = Arc::new(crate::infra::memory::ContentArena::new());
        let service = build_service(
            &settings.plain_text,
            Arc::new(InMemoryPlainTextStore::new()),
            ServiceParts {
                content: arena.clone(),
                graph: arena,
                computed: ComputedParts::new(),
                shortcodes: ShortcodeRegistry::new(),
                hooks: HookRegistry::new(),
            },
        );
        assert_eq!(
            service.registry().len(),
            settings.plain_text.node_types.len()
        );
    }
}
