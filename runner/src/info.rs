//! Orchestration for `space-runner workspace-info`.

use anyhow::Result;
use serde_json::json;

use crate::bus::EventBus;
use crate::core::context::RuntimeContext;
use crate::core::types::LifecycleEvent;
use crate::io::workspace::WorkspaceLoader;

/// Build the runtime context and announce it on the bus.
pub fn workspace_info(loader: &WorkspaceLoader, bus: &EventBus) -> Result<RuntimeContext> {
    let ctx = loader.build_context()?;
    bus.emit_lifecycle(
        LifecycleEvent::WorkspaceContextReady,
        &json!({"workspace": ctx.workspace}),
    );
    Ok(ctx)
}
