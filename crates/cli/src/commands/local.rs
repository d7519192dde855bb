// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use cs_core::{EntityType, KeyValueStore};
use serde_json::{Map, Value};

use crate::cli::LocalCommand;
use crate::error::{Error, Result};
use crate::sync::LocalData;

use super::Context;

/// Execute a local data subcommand.
pub fn run(start: &Path, cmd: LocalCommand) -> Result<()> {
    let ctx = Context::open(start)?;
    let local = LocalData::new(Arc::clone(&ctx.store));
    match cmd {
        LocalCommand::Show { category } => {
            let value = show(&local, category)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        LocalCommand::Set { category, json } => {
            set(&local, category, &json)?;
            println!("Updated {}", category);
        }
    }
    Ok(())
}

/// One category, or every category keyed by name.
pub(crate) fn show<K: KeyValueStore>(
    local: &LocalData<K>,
    category: Option<EntityType>,
) -> Result<Value> {
    if let Some(entity) = category {
        return Ok(local.category(entity)?);
    }
    let mut all = Map::new();
    for entity in EntityType::ALL {
        all.insert(entity.as_str().to_string(), local.category(entity)?);
    }
    Ok(Value::Object(all))
}

/// Replace a category. Every category except user progress is a list.
pub(crate) fn set<K: KeyValueStore>(
    local: &LocalData<K>,
    category: EntityType,
    json: &str,
) -> Result<()> {
    let value: Value = serde_json::from_str(json).map_err(|e| Error::InvalidValue {
        field: "json",
        reason: e.to_string(),
    })?;
    if category != EntityType::UserProgress && !value.is_array() {
        return Err(Error::InvalidValue {
            field: "json",
            reason: format!("{} must be a JSON array", category),
        });
    }
    local.set_category(category, &value)?;
    Ok(())
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
