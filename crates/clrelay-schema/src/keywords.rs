use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Keywords recognized across drafts 4 through 2020-12, including
/// annotation and core vocabulary keywords.
const KNOWN_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "id",
    "$ref",
    "$anchor",
    "$dynamicRef",
    "$dynamicAnchor",
    "$recursiveRef",
    "$recursiveAnchor",
    "$vocabulary",
    "$comment",
    "$defs",
    "definitions",
    "type",
    "enum",
    "const",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "maxContains",
    "minContains",
    "maxProperties",
    "minProperties",
    "required",
    "dependentRequired",
    "dependencies",
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "propertyNames",
    "dependentSchemas",
    "items",
    "prefixItems",
    "additionalItems",
    "unevaluatedItems",
    "contains",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "format",
    "contentEncoding",
    "contentMediaType",
    "contentSchema",
    "title",
    "description",
    "default",
    "deprecated",
    "readOnly",
    "writeOnly",
    "examples",
];

/// Reject keywords no draft defines, anywhere a subschema may appear.
pub(crate) fn check_known_keywords(schema: &Value) -> Result<()> {
    check_schema(schema, "")
}

fn check_schema(value: &Value, pointer: &str) -> Result<()> {
    let Value::Object(map) = value else {
        // Boolean schemas have no keywords; other shapes fail meta-validation.
        return Ok(());
    };

    if let Some(unknown) = map
        .keys()
        .find(|key| !KNOWN_KEYWORDS.contains(&key.as_str()))
    {
        let location = if pointer.is_empty() { "/" } else { pointer };
        return Err(SchemaError::CompileFailed(format!(
            "unknown keyword \"{unknown}\" at {location}"
        )));
    }

    check_children(map, pointer)
}

fn check_children(map: &Map<String, Value>, pointer: &str) -> Result<()> {
    for key in [
        "properties",
        "patternProperties",
        "dependentSchemas",
        "dependencies",
        "$defs",
        "definitions",
    ] {
        check_map_schemas(map, key, pointer)?;
    }

    for key in [
        "propertyNames",
        "additionalProperties",
        "unevaluatedProperties",
        "contains",
        "additionalItems",
        "unevaluatedItems",
        "contentSchema",
        "not",
        "if",
        "then",
        "else",
    ] {
        check_single_schema(map, key, pointer)?;
    }

    for key in ["items", "prefixItems", "allOf", "anyOf", "oneOf"] {
        check_array_schemas(map, key, pointer)?;
    }

    Ok(())
}

fn check_map_schemas(map: &Map<String, Value>, key: &str, pointer: &str) -> Result<()> {
    if let Some(Value::Object(entries)) = map.get(key) {
        for (name, value) in entries {
            // `dependencies` mixes property arrays with schemas.
            if value.is_object() {
                check_schema(value, &child_pointer(&child_pointer(pointer, key), name))?;
            }
        }
    }
    Ok(())
}

fn check_single_schema(map: &Map<String, Value>, key: &str, pointer: &str) -> Result<()> {
    match map.get(key) {
        Some(value) => check_schema(value, &child_pointer(pointer, key)),
        None => Ok(()),
    }
}

fn check_array_schemas(map: &Map<String, Value>, key: &str, pointer: &str) -> Result<()> {
    match map.get(key) {
        Some(Value::Array(items)) => {
            let base = child_pointer(pointer, key);
            for (index, item) in items.iter().enumerate() {
                check_schema(item, &child_pointer(&base, &index.to_string()))?;
            }
            Ok(())
        }
        // Draft 2020-12 `items` is a single schema.
        Some(value) => check_schema(value, &child_pointer(pointer, key)),
        None => Ok(()),
    }
}

fn child_pointer(pointer: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{pointer}/{escaped}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_standard_keywords() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": "receipt",
            "type": "object",
            "properties": {
                "trace": {
                    "type": "object",
                    "properties": { "ts": { "type": "string", "format": "date-time" } },
                    "required": ["ts"]
                },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "$defs": { "ok": { "const": true } },
            "oneOf": [{ "required": ["trace"] }, true]
        });

        assert!(check_known_keywords(&schema).is_ok());
    }

    #[test]
    fn rejects_unknown_root_keyword() {
        let err = check_known_keywords(&json!({"type": "object", "requried": ["x"]}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("\"requried\""));
        assert!(err.contains("at /"));
    }

    #[test]
    fn reports_pointer_of_nested_unknown_keyword() {
        let schema = json!({
            "type": "object",
            "properties": {
                "payload": {
                    "type": "object",
                    "properties": { "url": { "type": "string", "formt": "uri" } }
                }
            }
        });

        let err = check_known_keywords(&schema).unwrap_err().to_string();
        assert!(err.contains("/properties/payload/properties/url"));
    }

    #[test]
    fn walks_array_and_conditional_subschemas() {
        assert!(check_known_keywords(&json!({"anyOf": [{"typ": "string"}]})).is_err());
        assert!(check_known_keywords(&json!({"if": {"bogus": 1}})).is_err());
        assert!(check_known_keywords(&json!({"items": [{"nope": 1}]})).is_err());
        assert!(check_known_keywords(&json!({"items": {"nope": 1}})).is_err());
    }

    #[test]
    fn property_names_are_not_keywords() {
        let schema = json!({
            "properties": { "anything-goes": { "type": "integer" } },
            "dependencies": { "a": ["b"] }
        });
        assert!(check_known_keywords(&schema).is_ok());
    }

    #[test]
    fn pointer_segments_are_escaped() {
        let err = check_known_keywords(&json!({
            "properties": { "a/b": { "unknown": true } }
        }))
        .unwrap_err()
        .to_string();
        assert!(err.contains("/properties/a~1b"));
    }
}
