//! Configuration layer: typed settings with layered precedence (files → env).

use std::{collections::BTreeMap, num::NonZeroU32, path::Path, str::FromStr};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::markup::StripOptions;
use crate::domain::parts::Accessor;
use crate::domain::types::PartKind;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "plaintext";
const ENV_PREFIX: &str = "SOFFIO_PLAINTEXT";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_SWEEP_BATCH_SIZE: u32 = 100;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub plain_text: PlainTextSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Postgres URL. Without one the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct PlainTextSettings {
    pub strip: StripOptions,
    pub sweep_batch_size: NonZeroU32,
    pub node_types: BTreeMap<String, NodeTypeSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeSettings {
    pub enabled: bool,
    pub reset_on_changed_fields: Vec<String>,
    pub parts: Vec<PartSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartSettings {
    pub accessor: String,
    pub kind: PartKind,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

impl LoadError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence.
///
/// `config/default.toml` and `plaintext.toml` are optional; an explicit
/// `config_file` must exist. Environment variables prefixed with
/// `SOFFIO_PLAINTEXT__` win over every file.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            plain_text,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            plain_text: build_plain_text_settings(plain_text)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            database: DatabaseSettings {
                url: None,
                max_connections: NonZeroU32::MIN.saturating_add(DEFAULT_DB_MAX_CONNECTIONS - 1),
                run_migrations: true,
            },
            plain_text: PlainTextSettings {
                strip: StripOptions::default(),
                sweep_batch_size: NonZeroU32::MIN.saturating_add(DEFAULT_SWEEP_BATCH_SIZE - 1),
                node_types: BTreeMap::new(),
            },
        }
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        run_migrations: database.run_migrations.unwrap_or(true),
    })
}

fn build_plain_text_settings(
    plain_text: RawPlainTextSettings,
) -> Result<PlainTextSettings, LoadError> {
    let sweep_batch_size = non_zero_u32(
        plain_text
            .sweep_batch_size
            .unwrap_or(DEFAULT_SWEEP_BATCH_SIZE)
            .into(),
        "plain_text.sweep_batch_size",
    )?;

    let mut node_types = BTreeMap::new();
    for (name, raw) in plain_text.node_types {
        let key = format!("plain_text.node_types.{name}");
        if name.trim().is_empty() {
            return Err(LoadError::invalid(key, "node type name must not be empty"));
        }
        node_types.insert(name, build_node_type_settings(&key, raw)?);
    }

    Ok(PlainTextSettings {
        strip: plain_text.strip,
        sweep_batch_size,
        node_types,
    })
}

fn build_node_type_settings(
    key: &str,
    raw: RawNodeTypeSettings,
) -> Result<NodeTypeSettings, LoadError> {
    let mut parts = Vec::with_capacity(raw.parts.len());
    for (index, part) in raw.parts.into_iter().enumerate() {
        if Accessor::parse(&part.accessor).is_none() {
            tracing::warn!(
                key,
                index,
                accessor = part.accessor.as_str(),
                "ignoring part with a reserved accessor"
            );
            continue;
        }
        if let PartKind::Custom(name) = &part.kind
            && name.is_empty()
        {
            return Err(LoadError::invalid(
                format!("{key}.parts[{index}].kind"),
                "kind must not be empty",
            ));
        }
        parts.push(part);
    }

    let reset_on_changed_fields = raw
        .reset_on_changed_fields
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();

    Ok(NodeTypeSettings {
        enabled: raw.enabled.unwrap_or(true),
        reset_on_changed_fields,
        parts,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    plain_text: RawPlainTextSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    run_migrations: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPlainTextSettings {
    strip: StripOptions,
    sweep_batch_size: Option<u32>,
    node_types: BTreeMap<String, RawNodeTypeSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNodeTypeSettings {
    enabled: Option<bool>,
    reset_on_changed_fields: Vec<String>,
    parts: Vec<PartSettings>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
