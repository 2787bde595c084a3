//! Agent name validation.

/// Agent names become file names under `.cursor/agents/`, so they are limited
/// to `[A-Za-z0-9._-]` and must not be `.` or `..`.
pub fn validate_agent_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("agent name must not be empty".to_string());
    }
    if name.contains('/') {
        return Err(format!("agent name must not contain '/' (got '{name}')"));
    }
    if name == "." || name == ".." {
        return Err(format!("agent name must not be '{name}'"));
    }
    if name
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(format!(
            "agent name must be [A-Za-z0-9._-] only (got '{name}')"
        ));
    }
    Ok(())
}
