//! Project user endpoints

use super::{EndpointSpec, ParamKind, ParamSpec, ToolCategory};
use crate::platform::HttpMethod;

pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "list_users",
        description: "List users of the current project.",
        category: ToolCategory::Users,
        method: HttpMethod::Get,
        path: "/users",
        params: &[
            ParamSpec::new("queries", ParamKind::Array, "Query strings"),
            ParamSpec::string("search", "Search by name, email or phone"),
        ],
    },
    EndpointSpec {
        name: "get_user",
        description: "Get a user by ID.",
        category: ToolCategory::Users,
        method: HttpMethod::Get,
        path: "/users/{user_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_user",
        description: "Create a user. Use \"unique()\" as userId to generate one.",
        category: ToolCategory::Users,
        method: HttpMethod::Post,
        path: "/users",
        params: &[
            ParamSpec::string("userId", "New user ID").required(),
            ParamSpec::string("email", "Email address"),
            ParamSpec::string("phone", "Phone number in E.164 format"),
            ParamSpec::string("password", "Plain text password"),
            ParamSpec::string("name", "Display name"),
        ],
    },
    EndpointSpec {
        name: "delete_user",
        description: "Delete a user by ID.",
        category: ToolCategory::Users,
        method: HttpMethod::Delete,
        path: "/users/{user_id}",
        params: &[],
    },
];
