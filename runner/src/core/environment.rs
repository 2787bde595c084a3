//! Child-process environment contract.
//!
//! Scripts receive the merged context environment followed by the `SPACE_*`
//! variables below. Later entries win, so the `SPACE_*` values always reflect
//! the freshly loaded workspace and state.

use serde_json::Value;

use crate::core::context::RuntimeContext;
use crate::core::state_update::state_value_string;

pub const WORKSPACE_NAME: &str = "SPACE_WORKSPACE_NAME";
pub const WORKSPACE_BRANCH: &str = "SPACE_WORKSPACE_BRANCH";
pub const LAST_COMMIT: &str = "SPACE_LAST_COMMIT";
pub const LAST_RELEASE: &str = "SPACE_LAST_RELEASE";
pub const ACTIVE_TASK: &str = "SPACE_ACTIVE_TASK";
pub const TOOLS: &str = "SPACE_TOOLS";
pub const EVENT_NAME: &str = "SPACE_EVENT_NAME";
pub const EVENT_PAYLOAD: &str = "SPACE_EVENT_PAYLOAD";

/// Environment for a directly invoked agent script.
pub fn agent_env(ctx: &RuntimeContext) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = ctx
        .env
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let space = [
        (WORKSPACE_NAME, ctx.workspace.name.clone()),
        (WORKSPACE_BRANCH, ctx.workspace.branch.clone()),
        (LAST_COMMIT, state_value_string(&ctx.state, "lastCommit")),
        (LAST_RELEASE, state_value_string(&ctx.state, "lastRelease")),
        (ACTIVE_TASK, state_value_string(&ctx.state, "activeTask")),
        (TOOLS, ctx.tool_names().join(",")),
    ];
    env.extend(
        space
            .into_iter()
            .map(|(key, value)| (key.to_string(), value)),
    );
    env
}

/// Environment for a listener script triggered by `event`.
///
/// A null payload is serialized as `{}`.
pub fn listener_env(ctx: &RuntimeContext, event: &str, payload: &Value) -> Vec<(String, String)> {
    let payload = if payload.is_null() {
        "{}".to_string()
    } else {
        payload.to_string()
    };
    let mut env = agent_env(ctx);
    env.push((EVENT_NAME.to_string(), event.to_string()));
    env.push((EVENT_PAYLOAD.to_string(), payload));
    env
}
