//! Selection sets of an operation document
//!
//! The cache stores every field under its name plus arguments and answers
//! reads in the shape the operation asked for, so it needs the operation's
//! selections with variables already substituted.

use std::collections::{BTreeMap, HashMap};

use apollo_parser::ast::{self, AstNode};
use serde_json::{Map, Number, Value};

use crate::client::ClientError;

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Key in the response: the alias, or the field name without one
    pub response_key: String,
    pub name: String,
    /// Key in the cache: the field name followed by its arguments, if any
    pub storage_key: String,
    pub selections: Vec<Selection>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Field(Field),
    /// Inline fragment or resolved fragment spread
    Fragment {
        type_condition: Option<String>,
        selections: Vec<Selection>,
    },
}

/// Whether a fragment applies to an object; objects of unknown type match every fragment
pub fn applies(type_condition: Option<&str>, typename: Option<&str>) -> bool {
    match (type_condition, typename) {
        (Some(condition), Some(typename)) => condition == typename,
        _ => true,
    }
}

/// Selections of the first operation in `document`
pub fn parse(
    document: &str,
    variables: &Map<String, Value>,
) -> Result<Vec<Selection>, ClientError> {
    let parser = apollo_parser::Parser::new(document);
    let tree = parser.parse();

    let errors = tree
        .errors()
        .map(|err| format!("{:?}", err))
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        return Err(ClientError::Document(errors.join(", ")));
    }

    let mut operation = None;
    let mut fragments = HashMap::new();
    for definition in tree.document().definitions() {
        match definition {
            ast::Definition::OperationDefinition(definition) => {
                operation.get_or_insert(definition);
            }
            ast::Definition::FragmentDefinition(definition) => {
                if let Some(name) = definition.fragment_name().and_then(|name| name.name()) {
                    fragments.insert(name.text().to_string(), definition);
                }
            }
            _ => {}
        }
    }
    let operation =
        operation.ok_or_else(|| ClientError::Document("document holds no operation".into()))?;

    let resolver = Resolver {
        fragments,
        variables,
    };
    Ok(resolver.selection_set(operation.selection_set(), &mut Vec::new()))
}

struct Resolver<'a> {
    fragments: HashMap<String, ast::FragmentDefinition>,
    variables: &'a Map<String, Value>,
}

impl Resolver<'_> {
    fn selection_set(
        &self,
        selection_set: Option<ast::SelectionSet>,
        spreads: &mut Vec<String>,
    ) -> Vec<Selection> {
        selection_set
            .into_iter()
            .flat_map(|set| set.selections())
            .filter_map(|selection| self.selection(selection, spreads))
            .collect()
    }

    fn selection(&self, selection: ast::Selection, spreads: &mut Vec<String>) -> Option<Selection> {
        match selection {
            ast::Selection::Field(field) => {
                let name = field.name()?.text().to_string();
                let response_key = field
                    .alias()
                    .and_then(|alias| alias.name())
                    .map_or_else(|| name.clone(), |alias| alias.text().to_string());
                let storage_key = self.storage_key(&name, field.arguments());
                Some(Selection::Field(Field {
                    response_key,
                    name,
                    storage_key,
                    selections: self.selection_set(field.selection_set(), spreads),
                }))
            }
            ast::Selection::InlineFragment(fragment) => Some(Selection::Fragment {
                type_condition: type_condition(fragment.type_condition()),
                selections: self.selection_set(fragment.selection_set(), spreads),
            }),
            ast::Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name()?.name()?.text().to_string();
                // a fragment spreading itself is invalid, stop at the repeat
                if spreads.contains(&name) {
                    return None;
                }
                let fragment = self.fragments.get(&name)?;
                spreads.push(name);
                let selections = self.selection_set(fragment.selection_set(), spreads);
                spreads.pop();
                Some(Selection::Fragment {
                    type_condition: type_condition(fragment.type_condition()),
                    selections,
                })
            }
        }
    }

    fn storage_key(&self, name: &str, arguments: Option<ast::Arguments>) -> String {
        let arguments: BTreeMap<String, Value> = arguments
            .into_iter()
            .flat_map(|arguments| arguments.arguments())
            .filter_map(|argument| {
                let name = argument.name()?.text().to_string();
                Some((name, self.value(&argument.value()?)))
            })
            .collect();
        if arguments.is_empty() {
            return name.to_owned();
        }
        format!(
            "{}({})",
            name,
            serde_json::to_string(&arguments).unwrap_or_default()
        )
    }

    fn value(&self, value: &ast::Value) -> Value {
        match value {
            ast::Value::Variable(variable) => variable
                .name()
                .and_then(|name| self.variables.get(&name.text().to_string()).cloned())
                .unwrap_or(Value::Null),
            ast::Value::StringValue(string) => {
                let raw = string.syntax().to_string();
                let raw = raw.trim();
                Value::String(
                    serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_owned()),
                )
            }
            ast::Value::FloatValue(float) => float
                .syntax().to_string()
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(Value::Null, Value::Number),
            ast::Value::IntValue(int) => int
                .syntax().to_string()
                .trim()
                .parse::<i64>()
                .map_or(Value::Null, Value::from),
            ast::Value::BooleanValue(boolean) => Value::Bool(boolean.true_token().is_some()),
            ast::Value::NullValue(_) => Value::Null,
            ast::Value::EnumValue(value) => value
                .name()
                .map_or(Value::Null, |name| Value::String(name.text().to_string())),
            ast::Value::ListValue(list) => {
                Value::Array(list.values().map(|item| self.value(&item)).collect())
            }
            ast::Value::ObjectValue(object) => Value::Object(
                object
                    .object_fields()
                    .filter_map(|field| {
                        Some((field.name()?.text().to_string(), self.value(&field.value()?)))
                    })
                    .collect(),
            ),
        }
    }
}

fn type_condition(condition: Option<ast::TypeCondition>) -> Option<String> {
    Some(condition?.named_type()?.name()?.text().to_string())
}
