use std::path::PathBuf;

use thiserror::Error;

use crate::remote::error::{FetchStage, GraphQlError};

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid repository '{0}': expected format owner/name")]
    InvalidRepository(String),

    #[error("invalid page size {0}: must be a positive integer")]
    InvalidPageSize(i64),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("failed to fetch {stage}: {message}")]
    Fetch { stage: FetchStage, message: String },

    #[error("GraphQL errors while fetching {stage}: {}", format_graphql_errors(.errors))]
    GraphQl {
        stage: FetchStage,
        errors: Vec<GraphQlError>,
    },

    #[error("malformed timestamp '{value}': {source}")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: jiff::Error,
    },

    #[error("failed to {operation} {item_type} at {}: {source}", path.display())]
    Storage {
        operation: &'static str,
        item_type: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_graphql_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, MirrorError>;
