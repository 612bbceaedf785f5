//! Serverless function endpoints

use super::{EndpointSpec, ParamKind, ParamSpec, ToolCategory};
use crate::platform::HttpMethod;

pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "list_functions",
        description: "List functions in the current project.",
        category: ToolCategory::Functions,
        method: HttpMethod::Get,
        path: "/functions",
        params: &[
            ParamSpec::new("queries", ParamKind::Array, "Query strings"),
            ParamSpec::string("search", "Free-text search term"),
        ],
    },
    EndpointSpec {
        name: "get_function",
        description: "Get a function by ID, including runtime and deployment.",
        category: ToolCategory::Functions,
        method: HttpMethod::Get,
        path: "/functions/{function_id}",
        params: &[],
    },
    EndpointSpec {
        name: "list_executions",
        description: "List recent executions of a function.",
        category: ToolCategory::Functions,
        method: HttpMethod::Get,
        path: "/functions/{function_id}/executions",
        params: &[ParamSpec::new("queries", ParamKind::Array, "Query strings")],
    },
    EndpointSpec {
        name: "create_execution",
        description: "Trigger a function execution.",
        category: ToolCategory::Functions,
        method: HttpMethod::Post,
        path: "/functions/{function_id}/executions",
        params: &[
            ParamSpec::string("body", "Request body passed to the function"),
            ParamSpec::new("async", ParamKind::Boolean, "Run in the background"),
            ParamSpec::string("path", "HTTP path for the execution"),
            ParamSpec::string("method", "HTTP method for the execution"),
        ],
    },
];
