use serde_json::{Map, Value};

use super::service::ConfigError;
use crate::rag::StoreBackend;

const SECTIONS: [&str; 10] = [
    "google",
    "embedding",
    "vector_search",
    "storage",
    "database",
    "openai",
    "ingest",
    "retrieval",
    "content",
    "server",
];

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    for section in SECTIONS {
        expect_optional_object(root, section)?;
    }

    if let Some(google) = expect_optional_object(root, "google")? {
        validate_optional_string_field(google, "google.project_id", "project_id")?;
        validate_optional_string_field(google, "google.access_token", "access_token")?;
        validate_optional_string_field(google, "google.metadata_token_url", "metadata_token_url")?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(ingest, "ingest.batch_size", "batch_size", 1, 250)?;
        validate_u64_field(ingest, "ingest.pacing_ms", "pacing_ms", 0, 3_600_000)?;
        validate_optional_string_field(ingest, "ingest.source_dir", "source_dir")?;
        validate_optional_string_field(ingest, "ingest.output_dir", "output_dir")?;

        let size = ingest
            .get("chunk_size")
            .and_then(Value::as_u64)
            .unwrap_or(1000);
        let overlap = ingest
            .get("chunk_overlap")
            .and_then(Value::as_u64)
            .unwrap_or(100);
        if overlap >= size {
            return Err(ConfigError::invalid(
                "ingest.chunk_overlap",
                format!("must be smaller than chunk_size ({})", size),
            ));
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.max_attempts", "max_attempts", 1, 20)?;
        validate_u64_field(
            embedding,
            "embedding.backoff_base_ms",
            "backoff_base_ms",
            0,
            600_000,
        )?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(vector_search) = expect_optional_object(root, "vector_search")? {
        validate_optional_string_field(
            vector_search,
            "vector_search.index_endpoint_id",
            "index_endpoint_id",
        )?;
        validate_optional_string_field(
            vector_search,
            "vector_search.deployed_index_id",
            "deployed_index_id",
        )?;
        validate_u64_field(
            vector_search,
            "vector_search.timeout_secs",
            "timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(database) = expect_optional_object(root, "database")? {
        validate_optional_string_field(database, "database.url", "url")?;
        if let Some(url) = database.get("url").and_then(Value::as_str) {
            if !url.trim().is_empty() && StoreBackend::from_url(url).is_none() {
                return Err(ConfigError::invalid(
                    "database.url",
                    "expected a sqlite: or postgres:// URL",
                ));
            }
        }
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_defaults_and_empty_config() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "ingest": { "chunk_size": 1000, "chunk_overlap": 100, "batch_size": 5 },
            "server": { "port": 8080 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = validate_config(&json!({
            "ingest": { "chunk_size": 100, "chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("ingest.chunk_overlap"));
    }

    #[test]
    fn rejects_zero_batch_and_wrong_types() {
        assert!(validate_config(&json!({ "ingest": { "batch_size": 0 } })).is_err());
        assert!(validate_config(&json!({ "embedding": { "max_attempts": 0 } })).is_err());
        assert!(validate_config(&json!({ "storage": "bucket" })).is_err());
        assert!(validate_config(&json!({ "server": { "port": "80" } })).is_err());
        assert!(validate_config(&json!({ "google": { "metadata_token_url": 80 } })).is_err());
        assert!(validate_config(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn database_url_must_name_a_supported_engine() {
        assert!(validate_config(&json!({ "database": { "url": "sqlite:///tmp/sdc.db" } })).is_ok());
        assert!(validate_config(&json!({
            "database": { "url": "postgresql://sdc:pw@/sdc?host=/cloudsql/p:r:i" }
        }))
        .is_ok());
        assert!(validate_config(&json!({ "database": { "url": "" } })).is_ok());

        let err = validate_config(&json!({ "database": { "url": "mysql://h/sdc" } })).unwrap_err();
        assert!(err.to_string().contains("database.url"));
        assert!(validate_config(&json!({ "database": { "url": 5 } })).is_err());
    }
}
