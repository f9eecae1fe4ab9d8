//! OpenAPI document assembly from registered operation specs.

use std::collections::BTreeMap;

use modkit::api::{OperationSpec, ParamLocation};
use serde_json::{json, Map, Value};
use utoipa::openapi::{schema::Schema, RefOr};

pub const TOKEN_SCHEME: &str = "tokenAuth";

/// Component schemas keyed by their `$ref` name.
#[derive(Debug, Default, Clone)]
pub struct ComponentsRegistry {
    pub schemas: BTreeMap<String, RefOr<Schema>>,
}

impl ComponentsRegistry {
    /// Insert if absent. Returns false when the name was already taken.
    pub fn register_schema(&mut self, name: &str, schema: RefOr<Schema>) -> bool {
        if self.schemas.contains_key(name) {
            return false;
        }
        self.schemas.insert(name.to_string(), schema);
        true
    }
}

fn schema_ref(components: &ComponentsRegistry, content_type: &str, name: Option<&str>) -> Value {
    match name {
        Some(name) if components.schemas.contains_key(name) => {
            json!({ "$ref": format!("#/components/schemas/{name}") })
        }
        _ if content_type.ends_with("json") => json!({ "type": "object" }),
        _ => json!({}),
    }
}

fn operation_object(spec: &OperationSpec, components: &ComponentsRegistry) -> Value {
    let mut op = Map::new();
    op.insert(
        "operationId".into(),
        json!(spec.operation_id.clone().unwrap_or_else(|| spec.handler_id.clone())),
    );
    if let Some(summary) = &spec.summary {
        op.insert("summary".into(), json!(summary));
    }
    if let Some(description) = &spec.description {
        op.insert("description".into(), json!(description));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }
    if spec.authenticated {
        op.insert("security".into(), json!([{ TOKEN_SCHEME: [] }]));
    }

    if !spec.params.is_empty() {
        let params: Vec<Value> = spec
            .params
            .iter()
            .map(|p| {
                let location = match p.location {
                    ParamLocation::Path => "path",
                    ParamLocation::Query => "query",
                };
                json!({
                    "name": p.name,
                    "in": location,
                    "required": p.location == ParamLocation::Path || p.required,
                    "description": p.description,
                    "schema": { "type": p.param_type },
                })
            })
            .collect();
        op.insert("parameters".into(), Value::Array(params));
    }

    if let Some(body) = &spec.request_body {
        op.insert(
            "requestBody".into(),
            json!({
                "description": body.description,
                "required": body.required,
                "content": {
                    body.content_type: {
                        "schema": schema_ref(components, body.content_type, body.schema_name.as_deref())
                    }
                }
            }),
        );
    }

    let mut responses = Map::new();
    for r in &spec.responses {
        let mut obj = Map::new();
        obj.insert("description".into(), json!(r.description));
        if r.schema_name.is_some() {
            let mut schema = schema_ref(components, r.content_type, r.schema_name.as_deref());
            if r.is_array {
                schema = json!({ "type": "array", "items": schema });
            }
            obj.insert(
                "content".into(),
                json!({ r.content_type: { "schema": schema } }),
            );
        }
        responses.insert(r.status.to_string(), Value::Object(obj));
    }
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

/// Build the OpenAPI 3.1 document.
pub fn build_document<'a>(
    specs: impl IntoIterator<Item = &'a OperationSpec>,
    components: &ComponentsRegistry,
) -> anyhow::Result<Value> {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for spec in specs {
        paths
            .entry(spec.path.clone())
            .or_default()
            .insert(spec.method.as_str().to_lowercase(), operation_object(spec, components));
    }

    let mut schemas = Map::new();
    for (name, schema) in &components.schemas {
        schemas.insert(name.clone(), serde_json::to_value(schema)?);
    }

    Ok(json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Recipe API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Recipes, tags and ingredients scoped to the authenticated user"
        },
        "paths": paths,
        "components": {
            "schemas": schemas,
            "securitySchemes": {
                TOKEN_SCHEME: {
                    "type": "apiKey",
                    "in": "header",
                    "name": "Authorization",
                    "description": "`Token <key>` as returned by POST /user/token"
                }
            }
        }
    }))
}
