//! Declarative platform endpoint tools
//!
//! Every platform tool is one REST endpoint. An [`EndpointSpec`] names the
//! method, a path template such as `/databases/{database_id}/collections` and
//! the extra parameters; [`EndpointTool`] turns a model call into a
//! [`PlatformRequest`].
//!
//! Path placeholders take their value from the arguments first and fall back to
//! the current selection (`database_id`, `collection_id`, `bucket_id`,
//! `function_id`). Leftover arguments go to the query string for GET/DELETE and
//! to the JSON body otherwise.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::{BoxFuture, Tool, ToolCategory};
use crate::context::AIContext;
use crate::error::ToolError;
use crate::platform::{HttpMethod, PlatformClient, PlatformRequest};

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamKind {
    fn schema(&self) -> Value {
        match self {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Object => json!({ "type": "object" }),
            ParamKind::Array => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }
}

/// A non-path parameter of an endpoint
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static description of one platform endpoint
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    pub method: HttpMethod,
    pub path: &'static str,
    pub params: &'static [ParamSpec],
}

impl EndpointSpec {
    /// Placeholder names in the path template, in order
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }
}

/// Selection that a placeholder defaults to, if any
fn context_default<'a>(placeholder: &str, context: &'a AIContext) -> Option<&'a str> {
    let resource = match placeholder {
        "database_id" => context.database.as_ref(),
        "collection_id" => context.collection.as_ref(),
        "bucket_id" => context.bucket.as_ref(),
        "function_id" => context.function.as_ref(),
        _ => None,
    };
    resource.map(|r| r.id.as_str())
}

fn selection_label(placeholder: &str) -> Option<&'static str> {
    match placeholder {
        "database_id" => Some("database"),
        "collection_id" => Some("collection"),
        "bucket_id" => Some("bucket"),
        "function_id" => Some("function"),
        _ => None,
    }
}

fn take_id(args: &mut Map<String, Value>, key: &str) -> Option<String> {
    match args.remove(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fill the path template, consuming placeholder arguments
fn render_path(
    template: &str,
    args: &mut Map<String, Value>,
    context: &AIContext,
) -> Result<String, ToolError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| ToolError::ExecutionFailed(format!("Malformed path template: {}", template)))?;
        let key = &after[..end];

        let value = take_id(args, key)
            .or_else(|| context_default(key, context).map(|s| s.to_string()))
            .ok_or_else(|| match selection_label(key) {
                Some(label) => ToolError::InvalidParams(format!(
                    "'{}' is required because no {} is selected",
                    key, label
                )),
                None => ToolError::InvalidParams(format!("'{}' is required", key)),
            })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Tool backed by one platform endpoint
pub struct EndpointTool {
    spec: &'static EndpointSpec,
    client: Arc<dyn PlatformClient>,
}

impl EndpointTool {
    pub fn new(spec: &'static EndpointSpec, client: Arc<dyn PlatformClient>) -> Self {
        Self { spec, client }
    }

    pub fn spec(&self) -> &'static EndpointSpec {
        self.spec
    }

    /// Build the request for `params` without sending it
    pub fn build_request(
        &self,
        params: Value,
        context: &AIContext,
    ) -> Result<PlatformRequest, ToolError> {
        let mut args = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidParams(format!(
                    "Expected an object of arguments, got {}",
                    other
                )))
            }
        };

        let path = render_path(self.spec.path, &mut args, context)?;

        if let Some(missing) = self
            .spec
            .params
            .iter()
            .find(|p| p.required && args.get(p.name).is_none_or(|v| v.is_null()))
        {
            return Err(ToolError::InvalidParams(format!("'{}' is required", missing.name)));
        }

        let mut request = PlatformRequest::new(context.project.id.clone(), self.spec.method, path);
        if self.spec.method.uses_query() {
            for (key, value) in args {
                match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        let key = format!("{}[]", key);
                        for item in items {
                            request = request.with_query(key.clone(), query_value(&item));
                        }
                    }
                    other => request = request.with_query(key, query_value(&other)),
                }
            }
        } else if !args.is_empty() {
            request = request.with_body(Value::Object(args));
        }
        Ok(request)
    }
}

impl Tool for EndpointTool {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description
    }

    fn category(&self) -> ToolCategory {
        self.spec.category
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for placeholder in self.spec.placeholders() {
            let description = match selection_label(placeholder) {
                Some(label) => format!("ID of the {}; defaults to the selected {}", label, label),
                None => format!("ID of the {}", placeholder.trim_end_matches("_id")),
            };
            properties.insert(
                placeholder.to_string(),
                json!({ "type": "string", "description": description }),
            );
            if selection_label(placeholder).is_none() {
                required.push(placeholder);
            }
        }

        for param in self.spec.params {
            let mut schema = param.kind.schema();
            if let Value::Object(map) = &mut schema {
                map.insert("description".to_string(), json!(param.description));
            }
            properties.insert(param.name.to_string(), schema);
            if param.required {
                required.push(param.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn execute<'a>(
        &'a self,
        params: Value,
        context: &'a AIContext,
    ) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let request = self.build_request(params, context)?;
            Ok(self.client.call(request).await?)
        })
    }
}
