//! Engine-owned mutations of the state document.

use serde_json::{Map, Value};

/// How a state leaf is written after an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLeaf {
    /// Boolean flag, set to `true`.
    Flag,
    /// Completion marker, set to the current ISO-8601 timestamp.
    Timestamp,
}

/// Pluggable leaf classifier, see [`classify_state_leaf`].
pub type LeafClassifier = fn(&str) -> StateLeaf;

/// Default leaf policy: segments naming the `initialized` or `docsInSync`
/// flags are booleans, everything else records a timestamp.
pub fn classify_state_leaf(segment: &str) -> StateLeaf {
    if segment.contains("initialized") || segment.contains("docsInSync") {
        StateLeaf::Flag
    } else {
        StateLeaf::Timestamp
    }
}

/// Canonical state document used when `.cursor/state.json` is absent.
pub fn default_state() -> Value {
    serde_json::json!({
        "activeTask": null,
        "lastBranch": null,
        "lastCommit": null,
        "lastWorkspace": null,
        "lastRelease": null,
        "flags": {
            "initialized": false,
            "docsInSync": false
        }
    })
}

/// Apply one mutation per dotted key to `state`.
///
/// Intermediate segments are created as objects (replacing any non-object
/// value in the way). The leaf is written according to `classify`.
pub fn apply_state_keys(
    state: &mut Map<String, Value>,
    keys: &[String],
    classify: LeafClassifier,
    now: &str,
) {
    for key in keys {
        apply_key(state, key, classify, now);
    }
}

fn apply_key(state: &mut Map<String, Value>, key: &str, classify: LeafClassifier, now: &str) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut cur = state;
    for segment in segments {
        let slot = cur
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Some(map) = slot.as_object_mut() else {
            return;
        };
        cur = map;
    }

    let value = match classify(leaf) {
        StateLeaf::Flag => Value::Bool(true),
        StateLeaf::Timestamp => Value::String(now.to_string()),
    };
    cur.insert(leaf.to_string(), value);
}

/// Render a state value for child environments: strings as-is, null or
/// missing as empty, anything else as compact JSON.
pub fn state_value_string(state: &Value, key: &str) -> String {
    match state.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2026-10-16T12:00:00.000Z";

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn classify_flags_and_timestamps() {
        assert_eq!(classify_state_leaf("initialized"), StateLeaf::Flag);
        assert_eq!(classify_state_leaf("docsInSync"), StateLeaf::Flag);
        assert_eq!(classify_state_leaf("lastCommit"), StateLeaf::Timestamp);
        assert_eq!(classify_state_leaf("isReady"), StateLeaf::Timestamp);
    }

    #[test]
    fn flag_leaf_creates_missing_parent() {
        let mut state = Map::new();
        apply_state_keys(
            &mut state,
            &keys(&["flags.initialized"]),
            classify_state_leaf,
            NOW,
        );
        assert_eq!(Value::Object(state), json!({"flags": {"initialized": true}}));
    }

    #[test]
    fn timestamp_leaf_is_string() {
        let mut state = object(default_state());
        apply_state_keys(&mut state, &keys(&["lastCommit"]), classify_state_leaf, NOW);
        assert_eq!(state["lastCommit"], json!(NOW));
        assert_eq!(state["flags"]["initialized"], json!(false));
    }

    #[test]
    fn non_object_intermediate_is_replaced() {
        let mut state = object(json!({"release": "v1"}));
        apply_state_keys(
            &mut state,
            &keys(&["release.last.at"]),
            classify_state_leaf,
            NOW,
        );
        assert_eq!(state["release"], json!({"last": {"at": NOW}}));
    }

    #[test]
    fn custom_classifier_is_honored() {
        fn everything_is_a_flag(_: &str) -> StateLeaf {
            StateLeaf::Flag
        }
        let mut state = Map::new();
        apply_state_keys(&mut state, &keys(&["lastCommit"]), everything_is_a_flag, NOW);
        assert_eq!(state["lastCommit"], json!(true));
    }

    #[test]
    fn existing_key_order_is_preserved() {
        let mut state = object(default_state());
        apply_state_keys(&mut state, &keys(&["activeTask"]), classify_state_leaf, NOW);
        let order: Vec<&str> = state.keys().map(String::as_str).collect();
        assert_eq!(
            order,
            vec![
                "activeTask",
                "lastBranch",
                "lastCommit",
                "lastWorkspace",
                "lastRelease",
                "flags"
            ]
        );
    }

    #[test]
    fn state_value_string_handles_null_and_non_strings() {
        let state = json!({"lastCommit": null, "lastRelease": "v2", "activeTask": 7});
        assert_eq!(state_value_string(&state, "lastCommit"), "");
        assert_eq!(state_value_string(&state, "missing"), "");
        assert_eq!(state_value_string(&state, "lastRelease"), "v2");
        assert_eq!(state_value_string(&state, "activeTask"), "7");
    }
}
