//! Team and membership endpoints

use super::{EndpointSpec, ParamKind, ParamSpec, ToolCategory};
use crate::platform::HttpMethod;

pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "list_teams",
        description: "List teams of the current project.",
        category: ToolCategory::Teams,
        method: HttpMethod::Get,
        path: "/teams",
        params: &[
            ParamSpec::new("queries", ParamKind::Array, "Query strings"),
            ParamSpec::string("search", "Free-text search term"),
        ],
    },
    EndpointSpec {
        name: "get_team",
        description: "Get a team by ID.",
        category: ToolCategory::Teams,
        method: HttpMethod::Get,
        path: "/teams/{team_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_team",
        description: "Create a team.",
        category: ToolCategory::Teams,
        method: HttpMethod::Post,
        path: "/teams",
        params: &[
            ParamSpec::string("teamId", "New team ID").required(),
            ParamSpec::string("name", "Team name").required(),
            ParamSpec::new("roles", ParamKind::Array, "Roles granted to the creator"),
        ],
    },
    EndpointSpec {
        name: "list_memberships",
        description: "List memberships of a team.",
        category: ToolCategory::Teams,
        method: HttpMethod::Get,
        path: "/teams/{team_id}/memberships",
        params: &[
            ParamSpec::new("queries", ParamKind::Array, "Query strings"),
            ParamSpec::string("search", "Free-text search term"),
        ],
    },
];
