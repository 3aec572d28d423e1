//! Normalized response cache
//!
//! Every object carrying `__typename` and `id` is stored once under
//! `"<__typename>:<id>"` and replaced by a `{"__ref": key}` link wherever it
//! appears in a query result. Values are stored under their field name plus
//! arguments, never under an alias, and reads project the stored data back
//! through the selections of the query being answered.
//!
//! Fields declared through [`InMemoryCache::extend_type`] exist only on the
//! client: their values live in a separate overlay and are added to every
//! entity of the extended type when results are read back.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::client::document::{applies, Selection};

const REF: &str = "__ref";
const TYPENAME: &str = "__typename";

/// Cache key of a stored object, `None` when it lacks `__typename` or `id`
pub fn entity_key(object: &Map<String, Value>) -> Option<String> {
    let typename = object.get(TYPENAME)?.as_str()?;
    let id = match object.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    Some(format!("{}:{}", typename, id))
}

fn typename_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

fn as_ref(value: &Value) -> Option<&str> {
    match value {
        Value::Object(object) if object.len() == 1 => object.get(REF)?.as_str(),
        _ => None,
    }
}

fn link(key: String) -> Value {
    let mut link = Map::new();
    link.insert(REF.to_owned(), Value::String(key));
    Value::Object(link)
}

/// Root fields of an answered query, with the selections needed to read them back
#[derive(Debug)]
struct CachedResult {
    selections: Vec<Selection>,
    root: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    entities: HashMap<String, Map<String, Value>>,
    results: HashMap<String, CachedResult>,
    /// typename -> client-only field -> default value
    local_fields: HashMap<String, Map<String, Value>>,
    /// entity key -> client-only field values
    overlay: HashMap<String, Map<String, Value>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a client-only field on `typename`, read as `default` until patched
    pub fn extend_type<S: Into<String>>(&mut self, typename: S, field: S, default: Value) {
        self.local_fields
            .entry(typename.into())
            .or_insert_with(Map::new)
            .insert(field.into(), default);
    }

    pub fn is_local_field(&self, key: &str, field: &str) -> bool {
        self.local_fields
            .get(typename_of(key))
            .map_or(false, |fields| fields.contains_key(field))
    }

    /// Stores the answer to a query, returning the keys of every entity it touched
    pub fn write_result(
        &mut self,
        query_key: String,
        selections: Vec<Selection>,
        data: &Value,
    ) -> Vec<String> {
        let mut touched = Vec::new();
        let root = match data {
            Value::Object(object) => self.normalize_object(&selections, object, &mut touched),
            _ => Map::new(),
        };
        self.results
            .insert(query_key, CachedResult { selections, root });
        touched
    }

    /// Merges the entities found in `data` without remembering `data` itself
    pub fn write_entities(&mut self, selections: &[Selection], data: &Value) -> Vec<String> {
        let mut touched = Vec::new();
        if let Value::Object(object) = data {
            self.normalize_object(selections, object, &mut touched);
        }
        touched
    }

    /// Answer to a stored query, in the shape its selections ask for
    pub fn read_result(&self, query_key: &str) -> Option<Value> {
        let cached = self.results.get(query_key)?;
        let mut data = Map::new();
        self.project(&cached.selections, None, &cached.root, &mut data);
        Some(Value::Object(data))
    }

    /// Cache patch: merges `fields`, keyed by field name, into the entity stored under `key`.
    ///
    /// Client-only fields land in the overlay. Returns whether anything changed.
    pub fn write_fragment<I>(&mut self, key: &str, fields: I) -> bool
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut changed = false;
        for (field, value) in fields {
            let target = if self.is_local_field(key, &field) {
                self.overlay.entry(key.to_owned()).or_insert_with(Map::new)
            } else {
                self.entities.entry(key.to_owned()).or_insert_with(Map::new)
            };
            if target.get(&field) != Some(&value) {
                target.insert(field, value);
                changed = true;
            }
        }
        changed
    }

    /// Stored fields of the entity under `key` plus its client-only fields.
    ///
    /// Nested entities stay `{"__ref": key}` links.
    pub fn read_fragment(&self, key: &str) -> Option<Value> {
        let stored = self.entities.get(key);
        if stored.is_none() && !self.overlay.contains_key(key) {
            return None;
        }
        let mut fields = stored.cloned().unwrap_or_default();
        self.add_local_fields(key, &mut fields);
        Some(Value::Object(fields))
    }

    /// Whether the result of `query_key` links to `entity`, directly or through other entities
    pub fn references(&self, query_key: &str, entity: &str) -> bool {
        let mut seen = HashSet::new();
        self.results.get(query_key).map_or(false, |cached| {
            cached
                .root
                .values()
                .any(|field| self.links_to(field, entity, &mut seen))
        })
    }

    fn links_to<'a>(&'a self, value: &'a Value, entity: &str, seen: &mut HashSet<&'a str>) -> bool {
        if let Some(key) = as_ref(value) {
            if key == entity {
                return true;
            }
            if !seen.insert(key) {
                return false;
            }
            return self.entities.get(key).map_or(false, |fields| {
                fields
                    .values()
                    .any(|field| self.links_to(field, entity, seen))
            });
        }
        match value {
            Value::Array(items) => items.iter().any(|item| self.links_to(item, entity, seen)),
            Value::Object(object) => object
                .values()
                .any(|field| self.links_to(field, entity, seen)),
            _ => false,
        }
    }

    /// Response object to stored fields, keyed by storage key
    fn normalize_object(
        &mut self,
        selections: &[Selection],
        object: &Map<String, Value>,
        touched: &mut Vec<String>,
    ) -> Map<String, Value> {
        let typename = object
            .get(TYPENAME)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let mut fields = Map::new();
        self.collect(selections, typename.as_deref(), object, &mut fields, touched);
        fields
    }

    fn collect(
        &mut self,
        selections: &[Selection],
        typename: Option<&str>,
        object: &Map<String, Value>,
        fields: &mut Map<String, Value>,
        touched: &mut Vec<String>,
    ) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    if let Some(value) = object.get(&field.response_key) {
                        let stored = self.normalize(&field.selections, value, touched);
                        fields.insert(field.storage_key.clone(), stored);
                    }
                }
                Selection::Fragment {
                    type_condition,
                    selections,
                } => {
                    if applies(type_condition.as_deref(), typename) {
                        self.collect(selections, typename, object, fields, touched);
                    }
                }
            }
        }
    }

    fn normalize(
        &mut self,
        selections: &[Selection],
        value: &Value,
        touched: &mut Vec<String>,
    ) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize(selections, item, touched))
                    .collect(),
            ),
            Value::Object(object) if !selections.is_empty() => {
                let mut fields = self.normalize_object(selections, object, touched);
                match entity_key(&fields) {
                    Some(key) => {
                        fields.retain(|name, _| !self.is_local_field(&key, name));
                        self.entities
                            .entry(key.clone())
                            .or_insert_with(Map::new)
                            .extend(fields);
                        touched.push(key.clone());
                        link(key)
                    }
                    None => Value::Object(fields),
                }
            }
            other => other.clone(),
        }
    }

    /// Stored fields back to response keys, following `selections`
    fn project(
        &self,
        selections: &[Selection],
        entity: Option<&str>,
        stored: &Map<String, Value>,
        out: &mut Map<String, Value>,
    ) {
        let typename = match entity {
            Some(key) => Some(typename_of(key)),
            None => stored.get(TYPENAME).and_then(Value::as_str),
        };
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    let value = match entity.and_then(|key| self.local_value(key, &field.name)) {
                        Some(local) => local,
                        None => stored
                            .get(&field.storage_key)
                            .map_or(Value::Null, |value| {
                                self.project_value(&field.selections, value)
                            }),
                    };
                    out.insert(field.response_key.clone(), value);
                }
                Selection::Fragment {
                    type_condition,
                    selections,
                } => {
                    if applies(type_condition.as_deref(), typename) {
                        self.project(selections, entity, stored, out);
                    }
                }
            }
        }
    }

    fn project_value(&self, selections: &[Selection], value: &Value) -> Value {
        if let Some(key) = as_ref(value) {
            return self.read_entity(key, selections);
        }
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.project_value(selections, item))
                    .collect(),
            ),
            Value::Object(object) if !selections.is_empty() => {
                let mut out = Map::new();
                self.project(selections, None, object, &mut out);
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn read_entity(&self, key: &str, selections: &[Selection]) -> Value {
        let stored = self.entities.get(key);
        if stored.is_none() && !self.overlay.contains_key(key) {
            return Value::Null;
        }
        let empty = Map::new();
        let mut out = Map::new();
        self.project(selections, Some(key), stored.unwrap_or(&empty), &mut out);
        self.add_local_fields(key, &mut out);
        Value::Object(out)
    }

    /// Client-only value of `field` on the entity under `key`, `None` for server fields
    fn local_value(&self, key: &str, field: &str) -> Option<Value> {
        let default = self.local_fields.get(typename_of(key))?.get(field)?;
        let value = self
            .overlay
            .get(key)
            .and_then(|values| values.get(field))
            .unwrap_or(default);
        Some(value.clone())
    }

    fn add_local_fields(&self, key: &str, out: &mut Map<String, Value>) {
        if let Some(local) = self.local_fields.get(typename_of(key)) {
            for name in local.keys() {
                if !out.contains_key(name) {
                    if let Some(value) = self.local_value(key, name) {
                        out.insert(name.clone(), value);
                    }
                }
            }
        }
    }
}
