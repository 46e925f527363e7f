use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::data_types::{CollectionDefinition, CollectionInput, DataType, FieldDefinition, FieldInput};

use super::{CatalogError, CatalogResult};

// Postgres truncates identifiers past NAMEDATALEN - 1 bytes
const MAX_IDENTIFIER_LENGTH: usize = 63;

// Built-in namespaces of the stores we run on
const RESERVED_PREFIXES: [&str; 2] = ["sqlite_", "pg_"];

lazy_static! {
    // Collections can't start with an underscore: that's where the catalog
    // keeps its own tables
    static ref COLLECTION_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Turn a raw definition into a typed one, or explain everything that's wrong
/// with the first group of rules it breaks.
///
/// Groups are checked in order: collection name, presence of fields, each
/// field on its own, uniqueness across fields, and finally key flags. Later
/// groups assume the earlier ones hold, so they are only looked at once those
/// pass.
pub fn validate(input: &CollectionInput) -> CatalogResult<CollectionDefinition> {
    let name = check_group(validate_collection(input))?;

    let inputs = match &input.fields {
        Some(fields) if !fields.is_empty() => fields,
        Some(_) => return Err(invalid("\"fields\" must contain at least one field")),
        None => {
            return Err(invalid(
                "\"fields\" is required and must contain at least one field",
            ))
        }
    };

    let mut violations = vec![];
    let mut fields = Vec::with_capacity(inputs.len());
    for (index, field) in inputs.iter().enumerate() {
        match validate_field(index, field) {
            Ok(definition) => fields.push(definition),
            Err(mut errors) => violations.append(&mut errors),
        }
    }
    if !violations.is_empty() {
        return Err(invalid(violations.join("; ")));
    }

    check_group(check_duplicates(inputs, &fields))?;
    check_group(check_keys(&fields))?;

    Ok(CollectionDefinition {
        name,
        fields,
        note: input.note.clone(),
    })
}

/// Whether `name` can refer to a collection at all. The catalog's own tables
/// and the stores' built-in namespaces never do.
pub fn is_collection_name(name: &str) -> bool {
    validate_collection_name(Some(name)).is_ok()
}

fn invalid(reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidDefinition {
        reason: reason.into(),
    }
}

fn check_group<T>(result: Result<T, Vec<String>>) -> CatalogResult<T> {
    result.map_err(|violations| invalid(violations.join("; ")))
}

// Collection-level attributes: the name, and the note when one is given
fn validate_collection(input: &CollectionInput) -> Result<String, Vec<String>> {
    let name = validate_collection_name(input.collection.as_deref());
    let note_empty = input.note.as_deref() == Some("");

    match (name, note_empty) {
        (Ok(name), false) => Ok(name),
        (name, note_empty) => {
            let mut violations = name.err().unwrap_or_default();
            if note_empty {
                violations.push("\"note\" can't be empty, leave it out instead".to_string());
            }
            Err(violations)
        }
    }
}

fn validate_collection_name(name: Option<&str>) -> Result<String, Vec<String>> {
    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(vec!["\"collection\" is required".to_string()]),
    };

    let mut violations = vec![];
    if !COLLECTION_NAME.is_match(name) {
        violations.push(format!(
            "\"collection\" {name:?} must start with a letter and contain only letters, digits and underscores"
        ));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        violations.push(format!(
            "\"collection\" {name:?} is longer than {MAX_IDENTIFIER_LENGTH} bytes"
        ));
    }
    if let Some(prefix) = RESERVED_PREFIXES
        .iter()
        .find(|p| name.to_ascii_lowercase().starts_with(*p))
    {
        violations.push(format!(
            "\"collection\" {name:?} uses the reserved prefix {prefix:?}"
        ));
    }

    if violations.is_empty() {
        Ok(name.to_string())
    } else {
        Err(violations)
    }
}

fn validate_field(index: usize, input: &FieldInput) -> Result<FieldDefinition, Vec<String>> {
    let mut violations = vec![];
    let location = format!("fields[{index}]");

    let field = match input.field.as_deref() {
        Some(field) if !field.is_empty() => {
            if !FIELD_NAME.is_match(field) {
                violations.push(format!(
                    "{location}.field {field:?} must contain only letters, digits and underscores and not start with a digit"
                ));
            } else if field.len() > MAX_IDENTIFIER_LENGTH {
                violations.push(format!(
                    "{location}.field {field:?} is longer than {MAX_IDENTIFIER_LENGTH} bytes"
                ));
            }
            Some(field)
        }
        _ => {
            violations.push(format!("{location}.field is required"));
            None
        }
    };

    let datatype = match input.datatype.as_deref() {
        Some(token) if !token.is_empty() => match DataType::from_str(token) {
            Ok(datatype) => Some(datatype),
            Err(_) => {
                violations.push(format!(
                    "{location}.datatype {token:?} is not a known datatype"
                ));
                None
            }
        },
        _ => {
            violations.push(format!("{location}.datatype is required"));
            None
        }
    };

    let note = match input.note.as_deref() {
        Some(note) if !note.is_empty() => Some(note),
        _ => {
            violations.push(format!("{location}.note is required"));
            None
        }
    };

    let primary_key = validate_flag(&location, "primary_key", &input.primary_key, &mut violations);
    let auto_increment = validate_flag(
        &location,
        "auto_increment",
        &input.auto_increment,
        &mut violations,
    );

    match (field, datatype, note) {
        (Some(field), Some(datatype), Some(note)) if violations.is_empty() => Ok(FieldDefinition {
            field: field.to_string(),
            datatype,
            note: note.to_string(),
            primary_key,
            auto_increment,
        }),
        _ => Err(violations),
    }
}

// No coercion: "true", 1 and friends are rejected
fn validate_flag(
    location: &str,
    flag: &str,
    value: &Option<Value>,
    violations: &mut Vec<String>,
) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            violations.push(format!("{location}.{flag} must be a boolean, got {other}"));
            false
        }
    }
}

fn check_duplicates(inputs: &[FieldInput], fields: &[FieldDefinition]) -> Result<(), Vec<String>> {
    let mut violations = vec![];

    // Entries repeated verbatim
    for (j, input) in inputs.iter().enumerate() {
        if let Some(i) = inputs[..j].iter().position(|earlier| earlier == input) {
            violations.push(format!("fields[{j}] duplicates fields[{i}]"));
        }
    }

    // Same column name with a different definition. Both stores compare (at
    // least unquoted) column names case-insensitively.
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (j, field) in fields.iter().enumerate() {
        match seen.get(&field.field.to_lowercase()) {
            Some(&i) if inputs[i] != inputs[j] => violations.push(format!(
                "field {:?} is defined more than once (fields[{i}] and fields[{j}])",
                field.field
            )),
            Some(_) => {}
            None => {
                seen.insert(field.field.to_lowercase(), j);
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_keys(fields: &[FieldDefinition]) -> Result<(), Vec<String>> {
    let mut violations = vec![];

    let primary_keys: Vec<&str> = fields
        .iter()
        .filter(|f| f.primary_key)
        .map(|f| f.field.as_str())
        .collect();
    if primary_keys.len() > 1 {
        violations.push(format!(
            "only one field can be the primary key, got {}",
            primary_keys.join(", ")
        ));
    }

    for field in fields.iter().filter(|f| f.auto_increment) {
        if !field.primary_key {
            violations.push(format!(
                "field {:?} is auto_increment but not the primary key",
                field.field
            ));
        }
        if !field.datatype.is_integer() {
            violations.push(format!(
                "field {:?} is auto_increment but has datatype {}; only integer and big_integer can auto increment",
                field.field, field.datatype
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
