// src/core/schema.rs

//! Validation of raw YAML documents into the typed task and dependency models.
//!
//! Serde's derive stops at the first mismatch, which makes a broken dependency file
//! painful to fix one error at a time. Documents are therefore walked as plain
//! `serde_yaml::Value` trees and every violation is collected before giving up.

use crate::models::{Dependency, DependencySpec, PredefinedCall, Task, TaskKind, ToolboxCall};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

const DEPENDENCY_FIELDS: &[&str] = &["name", "config_values", "configuration-values", "spec"];
const DEPENDENCY_SPEC_FIELDS: &[&str] = &["requirements", "configuration", "test", "install"];
const TASK_FIELDS: &[&str] = &["name", "type", "configuration", "spec"];
const PREDEFINED_SPEC_FIELDS: &[&str] = &["name", "args"];
const TOOLBOX_SPEC_FIELDS: &[&str] = &["group", "command", "args"];
const TASK_TYPES: &[&str] = &["shell", "ansible", "predefined", "toolbox"];

/// A validated document of a dependency file.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyDocument {
    Dependency(Dependency),
    /// A document without `spec`: default configuration values for the whole file.
    FileConfiguration(IndexMap<String, String>),
}

/// Validates a predefined-task document.
pub fn validate_task(doc: &Value) -> Result<Task, Vec<String>> {
    let mut violations = Vec::new();
    let task = task_at(doc, "", &mut violations);
    match task {
        Some(task) if violations.is_empty() => Ok(task),
        _ => Err(violations),
    }
}

/// Validates a dependency-file document.
pub fn validate_dependency(doc: &Value) -> Result<DependencyDocument, Vec<String>> {
    let mut violations = Vec::new();

    let Some(map) = doc.as_mapping() else {
        return Err(vec![format!("document: expected a mapping, found {}", kind_of(doc))]);
    };
    check_fields(map, DEPENDENCY_FIELDS, "", &mut violations);

    let config_values = match (map.get("config_values"), map.get("configuration-values")) {
        (Some(_), Some(_)) => {
            violations.push(
                "config_values: cannot be combined with its `configuration-values` alias".to_string(),
            );
            IndexMap::new()
        }
        (Some(value), None) => scalar_map(value, "config_values", &mut violations),
        (None, Some(value)) => scalar_map(value, "configuration-values", &mut violations),
        (None, None) => IndexMap::new(),
    };

    let document = match map.get("spec") {
        None | Some(Value::Null) => {
            if map.contains_key("name") {
                optional_string(map, "name", "", &mut violations);
            }
            Some(DependencyDocument::FileConfiguration(config_values))
        }
        Some(spec) => {
            let name = required_string(map, "name", "", &mut violations);
            let spec = dependency_spec(spec, &mut violations);
            match (name, spec) {
                (Some(name), Some(spec)) => Some(DependencyDocument::Dependency(Dependency {
                    name,
                    config_values,
                    spec,
                })),
                _ => None,
            }
        }
    };

    match document {
        Some(document) if violations.is_empty() => Ok(document),
        _ => Err(violations),
    }
}

fn dependency_spec(value: &Value, violations: &mut Vec<String>) -> Option<DependencySpec> {
    let Some(map) = value.as_mapping() else {
        violations.push(format!("spec: expected a mapping, found {}", kind_of(value)));
        return None;
    };
    check_fields(map, DEPENDENCY_SPEC_FIELDS, "spec.", violations);

    Some(DependencySpec {
        requirements: string_list(map.get("requirements"), "spec.requirements", violations),
        configuration: string_list(map.get("configuration"), "spec.configuration", violations),
        test: task_list(map.get("test"), "spec.test", violations),
        install: task_list(map.get("install"), "spec.install", violations),
    })
}

fn task_list(value: Option<&Value>, path: &str, violations: &mut Vec<String>) -> Vec<Task> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            violations.push(format!("{}: expected a list of tasks, found {}", path, kind_of(other)));
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        if let Some(task) = task_at(item, &item_path, violations) {
            if !seen.insert(task.name.clone()) {
                violations.push(format!(
                    "{}.name: task name '{}' is already used in {}",
                    item_path, task.name, path
                ));
            }
            tasks.push(task);
        }
    }
    tasks
}

fn task_at(value: &Value, path: &str, violations: &mut Vec<String>) -> Option<Task> {
    let prefix = if path.is_empty() { String::new() } else { format!("{}.", path) };
    let Some(map) = value.as_mapping() else {
        let at = if path.is_empty() { "document" } else { path };
        violations.push(format!("{}: expected a task mapping, found {}", at, kind_of(value)));
        return None;
    };
    check_fields(map, TASK_FIELDS, &prefix, violations);

    let name = required_string(map, "name", &prefix, violations);
    let type_name = required_string(map, "type", &prefix, violations);
    let configuration = string_list(
        map.get("configuration"),
        &format!("{}configuration", prefix),
        violations,
    );

    let spec_path = format!("{}spec", prefix);
    let Some(spec) = map.get("spec") else {
        violations.push(format!("{}: missing field", spec_path));
        return None;
    };

    let kind = match type_name.as_deref()? {
        "shell" => match spec {
            Value::String(script) => Some(TaskKind::Shell(script.clone())),
            other => {
                violations.push(format!("{}: expected a shell script string, found {}", spec_path, kind_of(other)));
                None
            }
        },
        "ansible" => ansible_tasks(spec, &spec_path, violations).map(TaskKind::Ansible),
        "predefined" => predefined_call(spec, &spec_path, violations).map(TaskKind::Predefined),
        "toolbox" => toolbox_call(spec, &spec_path, violations).map(TaskKind::Toolbox),
        unknown => {
            violations.push(format!(
                "{}type: unknown task type `{}` (expected one of: {})",
                prefix,
                unknown,
                TASK_TYPES.join(", ")
            ));
            None
        }
    }?;

    Some(Task {
        name: name?,
        kind,
        configuration,
    })
}

fn ansible_tasks(value: &Value, path: &str, violations: &mut Vec<String>) -> Option<Vec<Value>> {
    let Some(items) = value.as_sequence() else {
        violations.push(format!("{}: expected a list of Ansible tasks, found {}", path, kind_of(value)));
        return None;
    };
    let before = violations.len();
    for (i, item) in items.iter().enumerate() {
        if !item.is_mapping() {
            violations.push(format!("{}[{}]: expected an Ansible task mapping, found {}", path, i, kind_of(item)));
        }
    }
    (violations.len() == before).then(|| items.clone())
}

fn predefined_call(value: &Value, path: &str, violations: &mut Vec<String>) -> Option<PredefinedCall> {
    let Some(map) = value.as_mapping() else {
        violations.push(format!("{}: expected a mapping with `name` and `args`, found {}", path, kind_of(value)));
        return None;
    };
    let prefix = format!("{}.", path);
    check_fields(map, PREDEFINED_SPEC_FIELDS, &prefix, violations);

    let name = required_string(map, "name", &prefix, violations);
    let args = match map.get("args") {
        Some(args) => scalar_map(args, &format!("{}args", prefix), violations),
        None => IndexMap::new(),
    };
    Some(PredefinedCall { name: name?, args })
}

fn toolbox_call(value: &Value, path: &str, violations: &mut Vec<String>) -> Option<ToolboxCall> {
    let Some(map) = value.as_mapping() else {
        violations.push(format!("{}: expected a mapping with `group` and `command`, found {}", path, kind_of(value)));
        return None;
    };
    let prefix = format!("{}.", path);
    check_fields(map, TOOLBOX_SPEC_FIELDS, &prefix, violations);

    let group = required_string(map, "group", &prefix, violations);
    let command = required_string(map, "command", &prefix, violations);
    let args = scalar_list(map.get("args"), &format!("{}args", prefix), violations);
    Some(ToolboxCall {
        group: group?,
        command: command?,
        args,
    })
}

// --- FIELD HELPERS ---

fn check_fields(map: &Mapping, known: &[&str], prefix: &str, violations: &mut Vec<String>) {
    for key in map.keys() {
        match key.as_str() {
            Some(k) if known.contains(&k) => {}
            Some(k) => violations.push(format!("{}{}: unknown field", prefix, k)),
            None => violations.push(format!("{}: non-string key {:?}", prefix.trim_end_matches('.'), key)),
        }
    }
}

fn required_string(map: &Mapping, key: &str, prefix: &str, violations: &mut Vec<String>) -> Option<String> {
    if !map.contains_key(key) {
        violations.push(format!("{}{}: missing field", prefix, key));
        return None;
    }
    optional_string(map, key, prefix, violations)
}

fn optional_string(map: &Mapping, key: &str, prefix: &str, violations: &mut Vec<String>) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::String(_) => {
            violations.push(format!("{}{}: must not be empty", prefix, key));
            None
        }
        other => {
            violations.push(format!("{}{}: expected a string, found {}", prefix, key, kind_of(other)));
            None
        }
    }
}

fn string_list(value: Option<&Value>, path: &str, violations: &mut Vec<String>) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            violations.push(format!("{}: expected a list of strings, found {}", path, kind_of(other)));
            return Vec::new();
        }
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::String(s) => Some(s.clone()),
            other => {
                violations.push(format!("{}[{}]: expected a string, found {}", path, i, kind_of(other)));
                None
            }
        })
        .collect()
}

fn scalar_list(value: Option<&Value>, path: &str, violations: &mut Vec<String>) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            violations.push(format!("{}: expected a list, found {}", path, kind_of(other)));
            return Vec::new();
        }
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let text = scalar_text(item);
            if text.is_none() {
                violations.push(format!("{}[{}]: expected a scalar value, found {}", path, i, kind_of(item)));
            }
            text
        })
        .collect()
}

fn scalar_map(value: &Value, path: &str, violations: &mut Vec<String>) -> IndexMap<String, String> {
    let map = match value {
        Value::Null => return IndexMap::new(),
        Value::Mapping(map) => map,
        other => {
            violations.push(format!("{}: expected a key/value mapping, found {}", path, kind_of(other)));
            return IndexMap::new();
        }
    };

    let mut values = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        let Some(key) = scalar_text(key) else {
            violations.push(format!("{}: non-scalar key {:?}", path, key));
            continue;
        };
        match scalar_text(value) {
            Some(text) => {
                values.insert(key, text);
            }
            None => violations.push(format!(
                "{}.{}: expected a scalar value, found {}",
                path,
                key,
                kind_of(value)
            )),
        }
    }
    values
}

/// The literal text of a YAML scalar. Configuration values stay opaque strings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_shell_task_is_decoded() {
        let task = validate_task(&yaml(
            r#"
            name: has_nfd_labels
            type: shell
            configuration: [namespace]
            spec: oc get nodes -l feature.node.kubernetes.io/system-os_release.ID
            "#,
        ))
        .unwrap();
        assert_eq!(task.name, "has_nfd_labels");
        assert_eq!(task.configuration, vec!["namespace".to_string()]);
        assert!(matches!(task.kind, TaskKind::Shell(ref s) if s.starts_with("oc get nodes")));
    }

    #[test]
    fn test_predefined_args_keep_scalar_text() {
        let task = validate_task(&yaml(
            r#"
            name: scale
            type: predefined
            spec:
              name: run_toolbox
              args:
                replicas: 3
                wait: true
            "#,
        ))
        .unwrap();
        let TaskKind::Predefined(call) = task.kind else {
            panic!("Expected a predefined call");
        };
        assert_eq!(call.name, "run_toolbox");
        assert_eq!(call.args.get("replicas").map(String::as_str), Some("3"));
        assert_eq!(call.args.get("wait").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_toolbox_args_are_optional() {
        let task = validate_task(&yaml(
            r#"
            name: deploy
            type: toolbox
            spec:
              group: nfd_operator
              command: deploy_from_operatorhub
            "#,
        ))
        .unwrap();
        assert_eq!(
            task.kind,
            TaskKind::Toolbox(ToolboxCall {
                group: "nfd_operator".to_string(),
                command: "deploy_from_operatorhub".to_string(),
                args: Vec::new(),
            })
        );
    }

    #[test]
    fn test_every_task_violation_is_reported() {
        let violations = validate_task(&yaml(
            r#"
            type: kubectl
            spec: 42
            extra: field
            "#,
        ))
        .unwrap_err();

        assert!(violations.iter().any(|v| v == "extra: unknown field"), "{:?}", violations);
        assert!(violations.iter().any(|v| v == "name: missing field"), "{:?}", violations);
        assert!(
            violations.iter().any(|v| v.contains("unknown task type `kubectl`")),
            "{:?}",
            violations
        );
    }

    #[test]
    fn test_dependency_with_nested_task_errors() {
        let violations = validate_dependency(&yaml(
            r#"
            name: has_gpu_operator
            spec:
              requirements: has_nfd
              test:
              - name: check
                type: shell
                spec: [not, a, script]
              install:
              - name: step
                type: ansible
                spec:
                - shell: echo ok
                - just a string
            "#,
        ))
        .unwrap_err();

        assert_eq!(violations.len(), 3, "{:?}", violations);
        assert!(violations.contains(&"spec.requirements: expected a list of strings, found a string".to_string()));
        assert!(violations.iter().any(|v| v.starts_with("spec.test[0].spec:")));
        assert!(violations.iter().any(|v| v.starts_with("spec.install[0].spec[1]:")));
    }

    #[test]
    fn test_duplicate_task_names_are_rejected_within_a_list() {
        let violations = validate_dependency(&yaml(
            r#"
            name: has_gpu_operator
            spec:
              install:
              - {name: install_gpu_operator, type: shell, spec: "true"}
              - {name: install_gpu_operator, type: shell, spec: "true"}
            "#,
        ))
        .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("already used in spec.install"));
    }

    #[test]
    fn test_document_without_spec_is_file_configuration() {
        let doc = validate_dependency(&yaml(
            r#"
            configuration-values:
              namespace: nvidia-gpu-operator
              timeout: 600
            "#,
        ))
        .unwrap();
        let DependencyDocument::FileConfiguration(values) = doc else {
            panic!("Expected file configuration");
        };
        assert_eq!(values.get("namespace").map(String::as_str), Some("nvidia-gpu-operator"));
        assert_eq!(values.get("timeout").map(String::as_str), Some("600"));
    }

    #[test]
    fn test_nested_configuration_values_are_rejected() {
        let violations = validate_dependency(&yaml(
            r#"
            name: has_nfd
            config_values:
              labels: {a: b}
            spec: {}
            "#,
        ))
        .unwrap_err();
        assert_eq!(violations, vec!["config_values.labels: expected a scalar value, found a mapping".to_string()]);
    }
}
