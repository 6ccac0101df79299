//! Pinned action references.
//!
//! The table maps an action repository to a version tag and the commit SHA
//! the tag pointed at when it was pinned. It is parsed once per cache on
//! first use and never written afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::adapters::embedded_assets;
use crate::domain::AppError;
use crate::ports::ActionResolver;

const EMBEDDED_PINS: &str = "action_pins.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionPin {
    pub version: String,
    pub sha: String,
}

/// Validated pin table and its digest.
#[derive(Debug)]
pub struct PinTable {
    pins: BTreeMap<String, ActionPin>,
    fingerprint: String,
}

impl PinTable {
    fn parse(json: &str) -> Result<Self, String> {
        let pins: BTreeMap<String, ActionPin> =
            serde_json::from_str(json).map_err(|e| e.to_string())?;

        for (repo, pin) in &pins {
            if !repo.contains('/') || repo.starts_with('/') || repo.ends_with('/') {
                return Err(format!("'{}' is not an owner/repo action reference", repo));
            }
            if !is_commit_sha(&pin.sha) {
                return Err(format!(
                    "pin for '{}' must be a 40-character lowercase hex SHA, got '{}'",
                    repo, pin.sha
                ));
            }
        }

        let mut hasher = Sha256::new();
        for (repo, pin) in &pins {
            hasher.update(format!("{}@{}\n", repo, pin.sha).as_bytes());
        }
        let fingerprint = hasher.finalize().iter().map(|byte| format!("{:02x}", byte)).collect();

        Ok(Self { pins, fingerprint })
    }

    pub fn get(&self, repo: &str) -> Option<&ActionPin> {
        self.pins.get(repo)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// SHA-256 over the sorted `repo@sha` lines.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn is_commit_sha(sha: &str) -> bool {
    sha.len() == 40 && sha.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

#[derive(Debug)]
enum PinSource {
    Embedded,
    Json { origin: String, text: String },
}

/// Lazily parsed pin table, safe to share across threads.
#[derive(Debug)]
pub struct ActionPinCache {
    source: PinSource,
    table: OnceLock<Result<PinTable, String>>,
}

/// Pins shipped with the binary.
pub static EMBEDDED: ActionPinCache = ActionPinCache::embedded();

impl ActionPinCache {
    pub const fn embedded() -> Self {
        Self { source: PinSource::Embedded, table: OnceLock::new() }
    }

    pub fn from_json(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: PinSource::Json { origin: origin.into(), text: text.into() },
            table: OnceLock::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_json(path.display().to_string(), text))
    }

    fn origin(&self) -> &str {
        match &self.source {
            PinSource::Embedded => EMBEDDED_PINS,
            PinSource::Json { origin, .. } => origin,
        }
    }

    /// The parsed table. Parsing happens on the first call only.
    pub fn table(&self) -> Result<&PinTable, AppError> {
        let loaded = self.table.get_or_init(|| {
            let text = match &self.source {
                PinSource::Embedded => {
                    embedded_assets::asset_text(EMBEDDED_PINS).map_err(|e| e.to_string())?
                }
                PinSource::Json { text, .. } => text.as_str(),
            };
            PinTable::parse(text)
        });
        loaded.as_ref().map_err(|details| AppError::ParseError {
            what: format!("action pins ({})", self.origin()),
            details: details.clone(),
        })
    }
}

impl ActionResolver for ActionPinCache {
    fn resolve(&self, repo: &str) -> Result<String, AppError> {
        let table = self.table()?;
        table
            .get(repo)
            .map(|pin| format!("{}@{}", repo, pin.sha))
            .ok_or_else(|| AppError::UnknownAction(repo.to_string()))
    }

    fn fingerprint(&self) -> Option<String> {
        self.table().ok().map(|table| table.fingerprint().to_string())
    }
}
