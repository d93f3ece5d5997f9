//! Startup loader: joins the three CSV exports into indexable prompt examples.
//!
//! attributes ⋈ mapper ⋈ prompt configuration:
//! `attribute_id` links attributes to mapper rows, `llm_mapper_id` links mapper
//! rows to a prompt configuration whose `arguments` column is a JSON object
//! carrying `prompt` and `system_role`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::index::AttributeIndex;
use crate::models::AttributeRecord;

const ATTRIBUTES_PREFIX: &str = "public_attributes_definition_export";
const MAPPER_PREFIX: &str = "public_llm_mapper_export";
const PROMPT_PREFIX: &str = "public_llm_prompt_configuration_export";

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeRow {
    pub attribute_id: Option<String>,
    pub attribute_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapperRow {
    pub attribute_id: Option<String>,
    pub llm_mapper_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptRow {
    pub llm_mapper_id: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptArguments {
    #[serde(default)]
    prompt: Option<serde_json::Value>,
    #[serde(default)]
    system_role: Option<serde_json::Value>,
}

/// Paths of the three exports found in the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFiles {
    pub attributes: PathBuf,
    pub mapper: PathBuf,
    pub prompts: PathBuf,
}

/// Finds the exports by filename prefix. Returns `None` unless all three exist,
/// which includes a data directory that does not exist.
pub fn discover_exports(dir: &Path) -> Result<Option<ExportFiles>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list data directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    let find = |prefix: &str| {
        names
            .iter()
            .find(|name| name.starts_with(prefix))
            .map(|name| dir.join(name))
    };

    Ok(match (find(ATTRIBUTES_PREFIX), find(MAPPER_PREFIX), find(PROMPT_PREFIX)) {
        (Some(attributes), Some(mapper), Some(prompts)) => Some(ExportFiles {
            attributes,
            mapper,
            prompts,
        }),
        _ => None,
    })
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Could not find CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (row_num, result) in reader.deserialize().enumerate() {
        let row: T = result
            .with_context(|| format!("Failed to read row {} of {}", row_num + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Reads all three exports and joins them.
pub fn load_records(files: &ExportFiles) -> Result<Vec<AttributeRecord>> {
    info!("Loading CSVs...");
    let attributes: Vec<AttributeRow> = read_rows(&files.attributes)?;
    let mappers: Vec<MapperRow> = read_rows(&files.mapper)?;
    let prompts: Vec<PromptRow> = read_rows(&files.prompts)?;

    info!("Merging data...");
    Ok(join_exports(&attributes, &mappers, &prompts))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Joins the exports into records. Duplicate keys keep their first row:
/// prompts per `llm_mapper_id`, attributes per `attribute_id`, and joined rows
/// per raw `attribute_name`. Rows without a usable prompt are dropped.
pub fn join_exports(
    attributes: &[AttributeRow],
    mappers: &[MapperRow],
    prompts: &[PromptRow],
) -> Vec<AttributeRecord> {
    let mut prompt_by_mapper: HashMap<&str, &PromptRow> = HashMap::new();
    for row in prompts {
        if let Some(key) = non_empty(&row.llm_mapper_id) {
            prompt_by_mapper.entry(key).or_insert(row);
        }
    }

    let mut attribute_by_id: HashMap<&str, &AttributeRow> = HashMap::new();
    for row in attributes {
        if let Some(key) = non_empty(&row.attribute_id) {
            attribute_by_id.entry(key).or_insert(row);
        }
    }

    let mut seen_names: HashSet<Option<&str>> = HashSet::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for mapper in mappers {
        let (Some(mapper_id), Some(attribute_id)) =
            (non_empty(&mapper.llm_mapper_id), non_empty(&mapper.attribute_id))
        else {
            continue;
        };
        let (Some(prompt_row), Some(attribute)) = (
            prompt_by_mapper.get(mapper_id),
            attribute_by_id.get(attribute_id),
        ) else {
            continue;
        };

        if !seen_names.insert(attribute.attribute_name.as_deref()) {
            continue;
        }

        let Some(name) = non_empty(&attribute.attribute_name) else {
            continue;
        };

        let (prompt, system_role) = parse_arguments(prompt_row.arguments.as_deref());
        if prompt.is_empty() {
            continue;
        }

        let id = AttributeRecord::id_for(name);
        if !seen_ids.insert(id.clone()) {
            warn!("Skipping '{name}': index id '{id}' already taken by another attribute");
            continue;
        }

        records.push(AttributeRecord {
            id,
            attribute_name: name.to_string(),
            prompt,
            system_role,
            original_id: attribute_id.to_string(),
        });
    }

    records
}

/// Extracts `(prompt, system_role)` from the `arguments` JSON. Anything
/// unparseable or non-string yields empty strings.
fn parse_arguments(raw: Option<&str>) -> (String, String) {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return (String::new(), String::new());
    };

    let args: PromptArguments = serde_json::from_str(raw).unwrap_or_default();
    let as_string = |value: Option<serde_json::Value>| match value {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    };

    (as_string(args.prompt), as_string(args.system_role))
}

/// Loads the exports into `index` if its collection is empty.
/// Missing or unreadable exports are logged and skipped; the service still starts.
pub async fn initialize_index(config: &Config, index: &AttributeIndex) -> Result<()> {
    index.ensure_embedder().await?;

    let count = index.count().await?;
    if count > 0 {
        info!("Vector DB already contains {count} items.");
        return Ok(());
    }

    info!("Vector DB is empty. Loading data from CSVs...");
    let files = match discover_exports(&config.data_dir)? {
        Some(files) => files,
        None => {
            warn!(
                "CSV files not found in {}. Skipping initial data load.",
                config.data_dir.display()
            );
            return Ok(());
        }
    };

    let records = match load_records(&files) {
        Ok(records) => records,
        Err(e) => {
            error!("Could not load CSV exports: {e:#}");
            return Ok(());
        }
    };

    info!("Found {} attributes with prompts to index.", records.len());
    index.upsert(&records).await?;
    info!("Indexing complete.");
    Ok(())
}
