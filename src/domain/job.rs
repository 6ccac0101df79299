//! Job records emitted to the Actions runner.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::AppError;
use crate::domain::permissions::Permissions;

/// Insertion-ordered string map used for `env:` and `with:` blocks.
///
/// Order is part of the output contract, so a sorted map is not an option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap(Vec<(String, String)>);

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable. A later insert of the same name replaces the value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn extend<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.insert(k, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VarMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = VarMap::new();
        map.extend(iter);
        map
    }
}

impl Serialize for VarMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VarMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VarMapVisitor;

        impl<'de> Visitor<'de> for VarMapVisitor {
            type Value = VarMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VarMap, A::Error> {
                let mut map = VarMap::new();
                while let Some((key, value)) = access.next_entry::<String, serde_yaml::Value>()? {
                    let value = scalar_to_string(&value).ok_or_else(|| {
                        serde::de::Error::custom(format!("value of '{}' must be a scalar", key))
                    })?;
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(VarMapVisitor)
    }
}

/// Render a YAML scalar the way Actions reads it as a string.
pub fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One step of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Step {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(default, skip_serializing_if = "VarMap::is_empty")]
    pub env: VarMap,
    #[serde(default, skip_serializing_if = "VarMap::is_empty")]
    pub with: VarMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
}

impl Step {
    pub fn named(name: impl Into<String>) -> Self {
        Step { name: name.into(), ..Step::default() }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    pub fn uses(mut self, action: impl Into<String>) -> Self {
        self.uses = Some(action.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name, value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.insert(name, value);
        self
    }

    pub fn run(mut self, script: impl Into<String>) -> Self {
        self.run = Some(script.into());
        self
    }
}

/// A job record. The name is the key of the `jobs:` map, not a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Job {
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub runs_on: String,
    #[serde(default)]
    pub permissions: Permissions,
    pub timeout_minutes: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

impl Job {
    /// Serialize to the record form used inside the `jobs:` map.
    pub fn to_record(&self) -> Result<serde_yaml::Value, AppError> {
        serde_yaml::to_value(self).map_err(|e| AppError::InternalError(format!(
            "Failed to serialize job '{}': {}",
            self.name, e
        )))
    }

    /// Parse a record back into a job named `name`.
    pub fn from_record(name: &str, record: serde_yaml::Value) -> Result<Job, AppError> {
        let mut job: Job = serde_yaml::from_value(record).map_err(|e| AppError::ParseError {
            what: format!("job '{}'", name),
            details: e.to_string(),
        })?;
        job.name = name.to_string();
        Ok(job)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id.as_deref() == Some(id))
    }
}
