//! Typed access to one kind's configuration map.

use std::cell::RefCell;
use std::collections::BTreeSet;

use serde_yaml::{Mapping, Value};

use crate::domain::AppError;
use crate::domain::target::validate_repo_slug;

/// Fields shared by every kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseOutputConfig {
    /// Cap on applied items. 0 means unlimited.
    pub max: u32,
    /// Items required before the job is scheduled unconditionally. 0 means
    /// "schedule whenever the kind is present".
    pub min: u32,
    pub github_token: Option<String>,
    pub target_repo: Option<String>,
}

/// Reads fields from a kind's map and remembers which keys were consumed so
/// that leftovers can be reported as unknown.
#[derive(Debug)]
pub struct ConfigMap<'a> {
    kind: &'a str,
    map: Option<&'a Mapping>,
    consumed: RefCell<BTreeSet<String>>,
}

impl<'a> ConfigMap<'a> {
    /// Wrap the value under a kind key. `null` (bare `kind:`) is an empty map.
    pub fn new(kind: &'a str, value: &'a Value) -> Result<Self, AppError> {
        let map = match value {
            Value::Null => None,
            Value::Mapping(map) => Some(map),
            other => {
                return Err(AppError::invalid_config(
                    kind,
                    format!("expected a mapping or no value, got {}", type_name(other)),
                ));
            }
        };
        Ok(Self { kind, map, consumed: RefCell::new(BTreeSet::new()) })
    }

    pub fn kind(&self) -> &str {
        self.kind
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.is_some_and(|m| m.contains_key(key))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.consumed.borrow_mut().insert(key.to_string());
        self.map.and_then(|m| m.get(key))
    }

    /// Untyped access for fields with their own deserializer.
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.get(key)
    }

    fn invalid(&self, key: &str, expected: &str, got: &Value) -> AppError {
        AppError::invalid_config(
            self.kind,
            format!("'{}' must be {}, got {}", key, expected, type_name(got)),
        )
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, AppError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    /// A string or a sequence of strings. Absent means empty.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, AppError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(self.invalid(key, "a list of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.invalid(key, "a string or a list of strings", other)),
        }
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>, AppError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| {
                    AppError::invalid_config(
                        self.kind,
                        format!("'{}' must be a non-negative integer, got {}", key, n),
                    )
                }),
            Some(other) => Err(self.invalid(key, "a non-negative integer", other)),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, AppError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    /// A flag that can only switch a capability on. Present with no value or
    /// `true` enables it; `false` is contradictory and rejected.
    pub fn enable_flag(&self, key: &str) -> Result<bool, AppError> {
        if !self.contains(key) {
            self.get(key);
            return Ok(false);
        }
        match self.get(key) {
            Some(Value::Null) | Some(Value::Bool(true)) => Ok(true),
            Some(Value::Bool(false)) => Err(AppError::ContradictoryFlag {
                kind: self.kind.to_string(),
                flag: key.to_string(),
            }),
            Some(other) => Err(self.invalid(key, "true or empty", other)),
            None => Ok(false),
        }
    }

    /// A string restricted to `allowed` values.
    pub fn one_of(&self, key: &str, allowed: &[&str]) -> Result<Option<String>, AppError> {
        match self.string(key)? {
            None => Ok(None),
            Some(value) if allowed.contains(&value.as_str()) => Ok(Some(value)),
            Some(value) => Err(AppError::invalid_config(
                self.kind,
                format!("'{}' must be one of {}, got '{}'", key, allowed.join(", "), value),
            )),
        }
    }

    /// `target`, which may be written as a number.
    pub fn target(&self) -> Result<Option<String>, AppError> {
        match self.get("target") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.invalid("target", "a string or an item number", other)),
        }
    }

    /// Parse the shared fields. Rejects the wildcard target repository.
    pub fn base(&self, default_max: u32) -> Result<BaseOutputConfig, AppError> {
        let max = self.u32("max")?.unwrap_or(default_max);
        let min = self.u32("min")?.unwrap_or(0);
        if max > 0 && min > max {
            return Err(AppError::invalid_config(
                self.kind,
                format!("min ({}) cannot exceed max ({})", min, max),
            ));
        }

        let target_repo = self.string("target-repo")?.map(|s| s.trim().to_string());
        if let Some(repo) = &target_repo {
            validate_repo_slug(self.kind, repo)?;
        }

        let github_token = self.string("github-token")?.filter(|t| !t.trim().is_empty());

        Ok(BaseOutputConfig { max, min, github_token, target_repo })
    }

    /// Fail on keys no accessor asked for.
    pub fn finish(&self) -> Result<(), AppError> {
        let Some(map) = self.map else {
            return Ok(());
        };
        let consumed = self.consumed.borrow();
        let unknown: Vec<String> = map
            .keys()
            .filter_map(|k| k.as_str())
            .filter(|k| !consumed.contains(*k))
            .map(str::to_string)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AppError::invalid_config(
                self.kind,
                format!("unknown field(s): {}", unknown.join(", ")),
            ))
        }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
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
