//! Downstream-service interface: the synchronous request/response RPCs the
//! Set engine calls out to (spec §6 "Downstream-service interface").
//!
//! All six RPCs are part of the upstream contract; `ConfigReload` is never
//! called by this crate's own pipelines but is included so the trait is a
//! complete, faithful boundary for the external caller (SPEC_FULL
//! "Supplemented features").

use async_trait::async_trait;
use sonic_gnmi_model::GnmiResult;

#[async_trait]
pub trait ConfigServiceClient: Send + Sync {
    /// Produces a fresh checkpoint of `CONFIG_DB`, returning its JSON text.
    async fn create_check_point(&self, name: &str) -> GnmiResult<String>;

    async fn delete_check_point(&self, name: &str) -> GnmiResult<()>;

    /// Applies a JSON-Patch document against the live `CONFIG_DB`.
    async fn apply_patch_db(&self, patch_text: &str) -> GnmiResult<()>;

    /// Applies a JSON-Patch document against the YANG-modelled tree only
    /// (validation path, no live write).
    async fn apply_patch_yang(&self, patch_text: &str) -> GnmiResult<()>;

    async fn config_save(&self, path: &str) -> GnmiResult<()>;

    /// Never called by this crate's Set pipelines; part of the upstream
    /// contract for the external caller.
    async fn config_reload(&self, path: &str) -> GnmiResult<()>;
}

/// In-memory fake for unit tests: records every call it receives.
#[cfg(test)]
pub mod mock {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        CreateCheckPoint(String),
        DeleteCheckPoint(String),
        ApplyPatchDb(String),
        ApplyPatchYang(String),
        ConfigSave(String),
        ConfigReload(String),
    }

    #[derive(Default)]
    pub struct FakeConfigService {
        pub checkpoint_json: Mutex<String>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeConfigService {
        pub fn new(checkpoint_json: impl Into<String>) -> Self {
            Self { checkpoint_json: Mutex::new(checkpoint_json.into()), calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ConfigServiceClient for FakeConfigService {
        async fn create_check_point(&self, name: &str) -> GnmiResult<String> {
            self.calls.lock().await.push(Call::CreateCheckPoint(name.to_string()));
            Ok(self.checkpoint_json.lock().await.clone())
        }

        async fn delete_check_point(&self, name: &str) -> GnmiResult<()> {
            self.calls.lock().await.push(Call::DeleteCheckPoint(name.to_string()));
            Ok(())
        }

        async fn apply_patch_db(&self, patch_text: &str) -> GnmiResult<()> {
            self.calls.lock().await.push(Call::ApplyPatchDb(patch_text.to_string()));
            Ok(())
        }

        async fn apply_patch_yang(&self, patch_text: &str) -> GnmiResult<()> {
            self.calls.lock().await.push(Call::ApplyPatchYang(patch_text.to_string()));
            Ok(())
        }

        async fn config_save(&self, path: &str) -> GnmiResult<()> {
            self.calls.lock().await.push(Call::ConfigSave(path.to_string()));
            Ok(())
        }

        async fn config_reload(&self, path: &str) -> GnmiResult<()> {
            self.calls.lock().await.push(Call::ConfigReload(path.to_string()));
            Ok(())
        }
    }
}
