//! Database, collection and document endpoints

use super::{EndpointSpec, ParamKind, ParamSpec, ToolCategory};
use crate::platform::HttpMethod;

const QUERIES: ParamSpec = ParamSpec::new(
    "queries",
    ParamKind::Array,
    "Query strings such as limit(25), offset(0) or equal(\"status\", [\"paid\"])",
);
const SEARCH: ParamSpec = ParamSpec::string("search", "Free-text search term");
const PERMISSIONS: ParamSpec = ParamSpec::new(
    "permissions",
    ParamKind::Array,
    "Permission strings, e.g. read(\"any\")",
);

pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "list_databases",
        description: "List all databases in the current project.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases",
        params: &[QUERIES, SEARCH],
    },
    EndpointSpec {
        name: "get_database",
        description: "Get a database by ID.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases/{database_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_database",
        description: "Create a new database. Use \"unique()\" as databaseId to generate one.",
        category: ToolCategory::Database,
        method: HttpMethod::Post,
        path: "/databases",
        params: &[
            ParamSpec::string("databaseId", "New database ID").required(),
            ParamSpec::string("name", "Database name").required(),
            ParamSpec::new("enabled", ParamKind::Boolean, "Whether the database is enabled"),
        ],
    },
    EndpointSpec {
        name: "list_collections",
        description: "List collections of a database.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases/{database_id}/collections",
        params: &[QUERIES, SEARCH],
    },
    EndpointSpec {
        name: "get_collection",
        description: "Get a collection, including its attributes and indexes.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases/{database_id}/collections/{collection_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_collection",
        description: "Create a collection in a database.",
        category: ToolCategory::Database,
        method: HttpMethod::Post,
        path: "/databases/{database_id}/collections",
        params: &[
            ParamSpec::string("collectionId", "New collection ID").required(),
            ParamSpec::string("name", "Collection name").required(),
            PERMISSIONS,
            ParamSpec::new(
                "documentSecurity",
                ParamKind::Boolean,
                "Enable per-document permissions",
            ),
        ],
    },
    EndpointSpec {
        name: "list_documents",
        description: "List documents of a collection, optionally filtered with queries.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases/{database_id}/collections/{collection_id}/documents",
        params: &[QUERIES],
    },
    EndpointSpec {
        name: "get_document",
        description: "Get a document by ID.",
        category: ToolCategory::Database,
        method: HttpMethod::Get,
        path: "/databases/{database_id}/collections/{collection_id}/documents/{document_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_document",
        description: "Create a document. `data` holds the attribute values.",
        category: ToolCategory::Database,
        method: HttpMethod::Post,
        path: "/databases/{database_id}/collections/{collection_id}/documents",
        params: &[
            ParamSpec::string("documentId", "New document ID").required(),
            ParamSpec::new("data", ParamKind::Object, "Document attributes").required(),
            PERMISSIONS,
        ],
    },
    EndpointSpec {
        name: "update_document",
        description: "Update attributes of an existing document.",
        category: ToolCategory::Database,
        method: HttpMethod::Patch,
        path: "/databases/{database_id}/collections/{collection_id}/documents/{document_id}",
        params: &[
            ParamSpec::new("data", ParamKind::Object, "Attributes to change").required(),
            PERMISSIONS,
        ],
    },
    EndpointSpec {
        name: "delete_document",
        description: "Delete a document by ID.",
        category: ToolCategory::Database,
        method: HttpMethod::Delete,
        path: "/databases/{database_id}/collections/{collection_id}/documents/{document_id}",
        params: &[],
    },
];
