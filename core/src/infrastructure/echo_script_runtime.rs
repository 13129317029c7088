// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `EchoScriptRuntime` (`spec.md` §6's pluggable `ScriptRuntime` collaborator)
//! — a minimal double that resolves the module through the Module Cache and
//! echoes back the call parameters as the result. A real sandboxed scripting
//! engine is an external collaborator out of scope for this crate; this type
//! lets the rest of the pipeline (admission through finalize) run end to end
//! without one.

use crate::application::worker_runtime::ScriptRuntime;
use crate::domain::execution_log::LogLevel;
use crate::infrastructure::module_cache::RedisModuleCache;

pub struct EchoScriptRuntime {
    module_cache: RedisModuleCache,
}

impl EchoScriptRuntime {
    pub fn new(module_cache: RedisModuleCache) -> Self {
        Self { module_cache }
    }
}

#[async_trait::async_trait]
impl ScriptRuntime for EchoScriptRuntime {
    async fn run(
        &self,
        path: &str,
        function_name: &str,
        parameters: &serde_json::Value,
        logs: &mut dyn FnMut(LogLevel, String),
    ) -> Result<serde_json::Value, String> {
        let module = self.module_cache.get(path).await.map_err(|e| e.to_string())?;
        let Some(module) = module else {
            return Err(format!("module not found in cache: {path}"));
        };

        logs(LogLevel::Info, format!("loaded module {path} ({} bytes, hash {})", module.content.len(), module.hash));
        logs(LogLevel::Info, format!("invoking {function_name} with parameters {parameters}"));

        Ok(parameters.clone())
    }
}
