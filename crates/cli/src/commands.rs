use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;

use content_catalog::patch::parse_operations;
use content_catalog::{
    content_digest, ChangeSet, ContentStore, PromotionRequest, PromotionService, ResourceEditor,
    SpaceSummary,
};
use content_core::{DocumentTree, ResourceType, Space};

/// Read a JSON file, or stdin for `-`.
pub fn read_json(path: &Path) -> Result<DocumentTree> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

pub fn hash(file: &Path) -> Result<Value> {
    let document = read_json(file)?;
    Ok(json!({ "sha256": content_digest(&document) }))
}

pub fn create<S: ContentStore>(
    editor: &ResourceEditor<S>,
    resource_type: ResourceType,
    file: &Path,
) -> Result<Value> {
    let document = read_json(file)?;
    let resource = editor.create(resource_type, document)?;
    Ok(serde_json::to_value(resource.to_record())?)
}

pub fn patch<S: ContentStore>(
    editor: &ResourceEditor<S>,
    resource_type: ResourceType,
    id: &str,
    ops_file: &Path,
) -> Result<Value> {
    let ops = parse_operations(&read_json(ops_file)?)?;
    let resource = editor.patch(resource_type, id, &ops)?;
    Ok(serde_json::to_value(resource.to_record())?)
}

pub fn delete<S: ContentStore>(
    editor: &ResourceEditor<S>,
    resource_type: ResourceType,
    id: &str,
) -> Result<Value> {
    let removed = editor.delete(resource_type, id)?;
    Ok(json!({
        "deleted": removed.id,
        "type": resource_type,
        "space": removed.space,
    }))
}

pub fn preview<S: ContentStore>(service: &PromotionService<S>, space: Space) -> Result<Value> {
    Ok(serde_json::to_value(service.preview(space)?)?)
}

pub fn promote<S: ContentStore>(
    service: &PromotionService<S>,
    space: Space,
    changes_file: Option<&Path>,
) -> Result<Value> {
    let request = match changes_file {
        Some(path) => PromotionRequest {
            space,
            changes: changes_from(read_json(path)?)
                .with_context(|| format!("{} does not hold a changeset", path.display()))?,
        },
        None => service.preview(space)?.into_request(),
    };
    let entries: usize = request.changes.values().map(Vec::len).sum();
    info!(%space, entries, "promoting");
    Ok(serde_json::to_value(service.promote(&request)?)?)
}

/// Accept a preview, a promotion request, or a bare `{"<type>": [...]}` map.
fn changes_from(document: DocumentTree) -> Result<ChangeSet> {
    let changes = match document {
        Value::Object(mut map) if map.contains_key("changes") => {
            map.shift_remove("changes").unwrap_or_default()
        }
        other => other,
    };
    Ok(serde_json::from_value(changes)?)
}

pub fn status<S: ContentStore>(store: &S, space: Option<Space>) -> Result<Value> {
    let spaces: Vec<Space> = match space {
        Some(s) => vec![s],
        None => Space::ALL.to_vec(),
    };
    let summaries = spaces
        .into_iter()
        .map(|s| SpaceSummary::collect(store, s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_value(summaries)?)
}
