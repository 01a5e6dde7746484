//! Incremental CONFIG_DB set pipeline: JSON-patch over a checkpoint, with
//! a full-config-replacement fast path (spec §4.8 "CONFIG_DB").
//!
//! Path addressing here matches `JsonDocument`'s 0-4 element scheme
//! (Table, Key, Field, Index), not `TablePath`'s Redis-key scheme: the
//! checkpoint is a structured document, not a flat keyspace, so this is
//! the natural unit for JSON-Patch synthesis (spec §4.9).

use crate::config_service::ConfigServiceClient;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sonic_gnmi_model::{json_doc::json_patch_path, GnmiError, GnmiResult, JsonDocument, TablePathOp};
use std::path::{Path, PathBuf};

/// One element of a gNMI Set request, addressed by a `JsonDocument` path
/// (already unescaped, 0-4 elements).
#[derive(Debug, Clone)]
pub struct ConfigSetOp {
    pub path: Vec<String>,
    pub op: TablePathOp,
    /// Required for `Add`; ignored for `Remove`.
    pub value: Option<Json>,
}

impl ConfigSetOp {
    pub fn delete(path: Vec<String>) -> Self {
        Self { path, op: TablePathOp::Remove, value: None }
    }

    pub fn update(path: Vec<String>, value: Json) -> Self {
        Self { path, op: TablePathOp::Add, value: Some(value) }
    }

    fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

/// A batch of Set operations already resolved to `CONFIG_DB`.
#[derive(Debug, Clone)]
pub struct ConfigSetRequest {
    pub ops: Vec<ConfigSetOp>,
}

impl ConfigSetRequest {
    /// True when this request is exactly one root delete plus one root
    /// update carrying a JSON_IETF document — the full-config-replacement
    /// shape (spec §4.8 step 1).
    pub fn is_full_replace(&self) -> bool {
        let root_deletes = self.ops.iter().filter(|o| o.is_root() && o.op == TablePathOp::Remove).count();
        let root_updates = self.ops.iter().filter(|o| o.is_root() && o.op == TablePathOp::Add).count();
        self.ops.len() == 2 && root_deletes == 1 && root_updates == 1
    }

    fn root_replacement_document(&self) -> GnmiResult<&Json> {
        self.ops
            .iter()
            .find(|o| o.is_root() && o.op == TablePathOp::Add)
            .and_then(|o| o.value.as_ref())
            .ok_or_else(|| GnmiError::invalid_argument("full-config replacement is missing its update value"))
    }
}

/// One JSON-Patch operation (RFC 6902), the shape written to
/// `<work>/gcu.patch` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum JsonPatchOp {
    Remove { path: String },
    Add { path: String, value: Json },
    Replace { path: String, value: Json },
}

/// Validates a staged full-config document. The real YANG engine is an
/// external collaborator (spec §1 "embedded script interpreter" design
/// note: model it as an RPC, not an in-process interpreter).
#[async_trait::async_trait]
pub trait YangValidator: Send + Sync {
    async fn validate(&self, document: &Json) -> GnmiResult<()>;
}

/// Stages a full-config replacement document to `<work>/config_db.json.tmp`
/// and invokes the external YANG validator. No JSON-Patch is produced
/// (spec §4.8 step 1, scenario S4).
pub async fn apply_full_replace(
    request: &ConfigSetRequest,
    work_dir: &Path,
    validator: &dyn YangValidator,
) -> GnmiResult<PathBuf> {
    let document = request.root_replacement_document()?;
    validator.validate(document).await?;

    let tmp_path = work_dir.join("config_db.json.tmp");
    let text = serde_json::to_string(document).map_err(|e| GnmiError::internal(format!("encode staged config: {e}")))?;
    std::fs::write(&tmp_path, text).map_err(|e| GnmiError::unavailable(format!("write {}: {e}", tmp_path.display())))?;
    tracing::info!(path = %tmp_path.display(), "staged full-config replacement for yang validation");
    Ok(tmp_path)
}

/// Result of building the incremental patch: the document after every op
/// has been applied, and the synthesized patch ops (spec §4.8 step 2-3).
pub struct IncrementalPatch {
    pub document: JsonDocument,
    pub patch_ops: Vec<JsonPatchOp>,
}

/// Applies each delete/replace/update in `request` against `checkpoint` in
/// order, synthesizing a JSON-Patch operation array as it goes.
///
/// Remove operations against missing nodes are tolerated (spec §4.8 step 3)
/// and contribute no patch line. Add operations against new leaves create
/// missing intermediate maps (delegated to `JsonDocument::add`).
pub fn apply_incremental(request: &ConfigSetRequest, mut checkpoint: JsonDocument) -> GnmiResult<IncrementalPatch> {
    let mut patch_ops = Vec::with_capacity(request.ops.len());

    for set_op in &request.ops {
        let patch_path = json_patch_path(&set_op.path);
        match set_op.op {
            TablePathOp::Remove => match checkpoint.remove(&set_op.path) {
                Ok(()) => patch_ops.push(JsonPatchOp::Remove { path: patch_path }),
                Err(GnmiError::NotFound(_)) => {
                    tracing::debug!(path = %patch_path, "remove against missing node tolerated, no patch line emitted");
                }
                Err(e) => return Err(e),
            },
            TablePathOp::Add => {
                let value = set_op
                    .value
                    .clone()
                    .ok_or_else(|| GnmiError::invalid_argument(format!("update at '{patch_path}' has no value")))?;
                let existed = checkpoint.get(&set_op.path).is_ok();
                checkpoint.add(&set_op.path, value.clone())?;
                patch_ops.push(if existed {
                    JsonPatchOp::Replace { path: patch_path, value }
                } else {
                    JsonPatchOp::Add { path: patch_path, value }
                });
            }
        }
    }

    Ok(IncrementalPatch { document: checkpoint, patch_ops })
}

/// Writes the synthesized patch array to `<work>/gcu.patch` (spec §6).
pub fn write_patch_file(patch_ops: &[JsonPatchOp], work_dir: &Path) -> GnmiResult<PathBuf> {
    let patch_path = work_dir.join("gcu.patch");
    let text = serde_json::to_string(patch_ops).map_err(|e| GnmiError::internal(format!("encode patch: {e}")))?;
    std::fs::write(&patch_path, text).map_err(|e| GnmiError::unavailable(format!("write {}: {e}", patch_path.display())))?;
    Ok(patch_path)
}

/// Runs the full incremental `CONFIG_DB` set pipeline end to end (spec §4.8
/// step 2): obtain a fresh checkpoint from the downstream service, apply
/// every op against it while synthesizing a JSON-Patch, write the patch
/// file, call the downstream patch-apply RPC, and on success call
/// config-save (scenario S3: patch-apply called once, then config-save).
pub async fn run_incremental_set(
    request: &ConfigSetRequest,
    config_service: &dyn ConfigServiceClient,
    work_dir: &Path,
    config_save_path: &str,
) -> GnmiResult<PathBuf> {
    let checkpoint_json = config_service.create_check_point("gnmi").await?;
    let checkpoint_value: Json = serde_json::from_str(&checkpoint_json)
        .map_err(|e| GnmiError::internal(format!("malformed checkpoint document: {e}")))?;
    let checkpoint = JsonDocument::from_json(checkpoint_value)?;

    let IncrementalPatch { patch_ops, .. } = apply_incremental(request, checkpoint)?;
    let patch_path = write_patch_file(&patch_ops, work_dir)?;
    let patch_text = serde_json::to_string(&patch_ops).map_err(|e| GnmiError::internal(format!("encode patch: {e}")))?;

    config_service.apply_patch_db(&patch_text).await?;
    config_service.config_save(config_save_path).await?;
    Ok(patch_path)
}

/// Dispatches a `CONFIG_DB` set request to the full-replace or incremental
/// pipeline, mirroring spec §4.8's two-shape decision at the top of the
/// `CONFIG_DB` dispatcher.
pub async fn run_config_db_set(
    request: &ConfigSetRequest,
    config_service: &dyn ConfigServiceClient,
    validator: &dyn YangValidator,
    work_dir: &Path,
    config_save_path: &str,
) -> GnmiResult<()> {
    if request.is_full_replace() {
        apply_full_replace(request, work_dir, validator).await?;
    } else {
        run_incremental_set(request, config_service, work_dir, config_save_path).await?;
    }
    Ok(())
}
