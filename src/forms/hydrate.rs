//! Building records from defaults, seeds and remote JSON.

use serde_json::{Map, Number, Value};

use crate::domain::document::{Attachment, FieldValue, Record, Scalar};
use crate::domain::schema::{CollectionSchema, FieldKind, RecordSchema, SchemaError};
use crate::forms::FormError;

fn mismatch(field: &str, expected: &'static str) -> FormError {
    FormError::ShapeMismatch {
        field: field.to_string(),
        expected,
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn text_from(value: &Value, path: &str) -> Result<String, FormError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(mismatch(path, "text")),
    }
}

pub(crate) fn number_from(value: &Value, default: &Number, path: &str) -> Result<Number, FormError> {
    match value {
        Value::Number(number) => Ok(number.clone()),
        // Form inputs round-trip numbers as strings.
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(default.clone());
            }
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Number::from(int));
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or_else(|| mismatch(path, "a number"))
        }
        _ => Err(mismatch(path, "a number")),
    }
}

pub(crate) fn bool_from(value: &Value, path: &str) -> Result<bool, FormError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) if text == "true" => Ok(true),
        Value::String(text) if text == "false" => Ok(false),
        _ => Err(mismatch(path, "a boolean")),
    }
}

/// Renumbers the position field of `records` to 1..N.
pub(crate) fn renumber(collection: &CollectionSchema, records: &mut [Record]) {
    if let Some(position) = &collection.position {
        for (index, record) in records.iter_mut().enumerate() {
            record.insert(
                position.as_str(),
                FieldValue::Scalar(Scalar::Number(Number::from(index as u64 + 1))),
            );
        }
    }
}

/// Materializes the seed records of a collection.
pub(crate) fn seed_records(
    collection: &CollectionSchema,
    path: &str,
) -> Result<Vec<Record>, FormError> {
    let mut records = collection
        .seed
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            let seed_path = format!("{path}[{index}]");
            match seed {
                Value::Object(fields) => hydrate_record(&collection.record, fields, &seed_path),
                _ => Err(mismatch(&seed_path, "an object")),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    renumber(collection, &mut records);
    Ok(records)
}

fn hydrate_field(kind: &FieldKind, value: Option<&Value>, path: &str) -> Result<FieldValue, FormError> {
    let value = value.filter(|v| !v.is_null());
    let field = match kind {
        FieldKind::Text { default } | FieldKind::Date { default } => {
            let text = match value {
                Some(value) => text_from(value, path)?,
                None => default.clone(),
            };
            FieldValue::Scalar(Scalar::Text(text))
        }
        FieldKind::Number { default } => {
            let number = match value {
                Some(value) => number_from(value, default, path)?,
                None => default.clone(),
            };
            FieldValue::Scalar(Scalar::Number(number))
        }
        FieldKind::Boolean { default } => {
            let flag = match value {
                Some(value) => bool_from(value, path)?,
                None => *default,
            };
            FieldValue::Scalar(Scalar::Bool(flag))
        }
        FieldKind::List { default } => match value {
            Some(Value::Array(items)) => FieldValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| text_from(item, &format!("{path}[{index}]")))
                    .collect::<Result<_, _>>()?,
            ),
            Some(_) => return Err(mismatch(path, "an array")),
            None => FieldValue::List(default.clone()),
        },
        FieldKind::Collection(collection) => match value {
            Some(Value::Array(items)) if !items.is_empty() => {
                let mut records = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let item_path = format!("{path}[{index}]");
                        match item {
                            Value::Object(fields) => {
                                hydrate_record(&collection.record, fields, &item_path)
                            }
                            _ => Err(mismatch(&item_path, "an object")),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                renumber(collection, &mut records);
                FieldValue::Records(records)
            }
            Some(Value::Array(_)) | None => FieldValue::Records(seed_records(collection, path)?),
            Some(_) => return Err(mismatch(path, "an array")),
        },
        FieldKind::Attachment(_) => match value {
            Some(Value::String(remote)) if !remote.trim().is_empty() => {
                FieldValue::Attachment(Attachment::existing(remote.clone()))
            }
            Some(Value::String(_)) | None => FieldValue::Attachment(Attachment::default()),
            Some(_) => return Err(mismatch(path, "a file path")),
        },
    };
    Ok(field)
}

/// Builds a record with every declared field present.
///
/// Declared fields missing from `remote` take their defaults; unknown keys
/// are ignored.
pub(crate) fn hydrate_record(
    schema: &RecordSchema,
    remote: &Map<String, Value>,
    path: &str,
) -> Result<Record, FormError> {
    let mut record = Record::new();
    for field in &schema.fields {
        let field_path = child_path(path, field.name.as_str());
        let value = hydrate_field(&field.kind, remote.get(field.name.as_str()), &field_path)?;
        record.insert(field.name.as_str(), value);
    }
    Ok(record)
}

/// Record built purely from field defaults, with `seed.len()` default
/// records per collection. Used only when seed hydration fails, which a
/// validated schema rules out.
pub(crate) fn fallback_record(schema: &RecordSchema) -> Record {
    let mut record = Record::new();
    for field in &schema.fields {
        let value = match &field.kind {
            FieldKind::Text { default } | FieldKind::Date { default } => {
                FieldValue::Scalar(Scalar::Text(default.clone()))
            }
            FieldKind::Number { default } => FieldValue::Scalar(Scalar::Number(default.clone())),
            FieldKind::Boolean { default } => FieldValue::Scalar(Scalar::Bool(*default)),
            FieldKind::List { default } => FieldValue::List(default.clone()),
            FieldKind::Collection(collection) => {
                let mut records = (0..collection.seed.len())
                    .map(|_| fallback_record(&collection.record))
                    .collect::<Vec<_>>();
                renumber(collection, &mut records);
                FieldValue::Records(records)
            }
            FieldKind::Attachment(_) => FieldValue::Attachment(Attachment::default()),
        };
        record.insert(field.name.as_str(), value);
    }
    record
}

/// Default record for `schema`, as `initialize` and `append_default_record` see it.
pub(crate) fn default_record(schema: &RecordSchema) -> Record {
    hydrate_record(schema, &Map::new(), "").unwrap_or_else(|err| {
        log::error!("Invalid seed data, falling back to field defaults: {err}");
        fallback_record(schema)
    })
}

/// Checks that every seed of every collection hydrates cleanly.
pub(crate) fn validate_seeds(schema: &RecordSchema) -> Result<(), SchemaError> {
    for field in &schema.fields {
        if let FieldKind::Collection(collection) = &field.kind {
            for (index, seed) in collection.seed.iter().enumerate() {
                let result = match seed {
                    Value::Object(fields) => {
                        hydrate_record(&collection.record, fields, field.name.as_str()).map(|_| ())
                    }
                    _ => Err(mismatch(field.name.as_str(), "an object")),
                };
                result.map_err(|err| SchemaError::InvalidSeed {
                    collection: field.name.to_string(),
                    index,
                    reason: err.to_string(),
                })?;
            }
            validate_seeds(&collection.record)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::schema::FormSchema;

    fn schema() -> FormSchema {
        FormSchema::from_value(json!({
            "name": "Tournament",
            "resource": "tournaments",
            "fields": [
                {"name": "title", "kind": "text", "default": "Untitled"},
                {"name": "year", "kind": "number", "default": 2024},
                {"name": "featured", "kind": "boolean"},
                {"name": "tags", "kind": "list"},
                {"name": "teams", "kind": "collection", "record": [
                    {"name": "name", "kind": "text"},
                    {"name": "flag", "kind": "attachment", "upload": "teamFlags", "required": true}
                ]}
            ]
        }))
        .unwrap()
    }

    fn hydrate(remote: Value) -> Result<Record, FormError> {
        match remote {
            Value::Object(map) => hydrate_record(&schema().fields, &map, ""),
            _ => unreachable!(),
        }
    }

    #[test]
    fn coerces_string_numbers_and_booleans() {
        let record = hydrate(json!({"year": "2025", "featured": "true", "title": 7})).unwrap();

        assert_eq!(record.scalar("year"), Some(&Scalar::from(2025)));
        assert_eq!(record.scalar("featured"), Some(&Scalar::Bool(true)));
        assert_eq!(record.scalar("title"), Some(&Scalar::from("7")));
    }

    #[test]
    fn null_and_blank_values_take_defaults() {
        let record = hydrate(json!({"title": null, "year": ""})).unwrap();

        assert_eq!(record.scalar("title"), Some(&Scalar::from("Untitled")));
        assert_eq!(record.scalar("year"), Some(&Scalar::from(2024)));
    }

    #[test]
    fn remote_attachment_paths_are_existing_references() {
        let record = hydrate(json!({"teams": [{"name": "A", "flag": "uploads/a.png"}, {"name": "B"}]}))
            .unwrap();

        let teams = record.records("teams").unwrap();
        assert_eq!(teams[0].attachment("flag").unwrap().remote(), Some("uploads/a.png"));
        assert!(!teams[1].attachment("flag").unwrap().is_present());
    }

    #[test]
    fn non_array_collection_is_a_shape_mismatch() {
        let err = hydrate(json!({"teams": {"name": "A"}})).unwrap_err();

        assert_eq!(
            err,
            FormError::ShapeMismatch {
                field: "teams".to_string(),
                expected: "an array"
            }
        );
    }

    #[test]
    fn nested_mismatch_reports_path() {
        let err = hydrate(json!({"teams": [{"name": ["x"]}]})).unwrap_err();

        assert!(matches!(err, FormError::ShapeMismatch { field, .. } if field == "teams[0].name"));
    }

    #[test]
    fn fallback_record_matches_defaults() {
        let schema = schema();
        assert_eq!(fallback_record(&schema.fields), default_record(&schema.fields));
    }
}
