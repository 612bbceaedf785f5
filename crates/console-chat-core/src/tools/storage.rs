//! Storage bucket and file endpoints

use super::{EndpointSpec, ParamKind, ParamSpec, ToolCategory};
use crate::platform::HttpMethod;

const QUERIES: ParamSpec = ParamSpec::new("queries", ParamKind::Array, "Query strings");
const SEARCH: ParamSpec = ParamSpec::string("search", "Free-text search term");

pub const ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "list_buckets",
        description: "List storage buckets in the current project.",
        category: ToolCategory::Storage,
        method: HttpMethod::Get,
        path: "/storage/buckets",
        params: &[QUERIES, SEARCH],
    },
    EndpointSpec {
        name: "get_bucket",
        description: "Get a storage bucket by ID.",
        category: ToolCategory::Storage,
        method: HttpMethod::Get,
        path: "/storage/buckets/{bucket_id}",
        params: &[],
    },
    EndpointSpec {
        name: "create_bucket",
        description: "Create a storage bucket.",
        category: ToolCategory::Storage,
        method: HttpMethod::Post,
        path: "/storage/buckets",
        params: &[
            ParamSpec::string("bucketId", "New bucket ID").required(),
            ParamSpec::string("name", "Bucket name").required(),
            ParamSpec::new(
                "maximumFileSize",
                ParamKind::Integer,
                "Maximum file size in bytes",
            ),
            ParamSpec::new(
                "allowedFileExtensions",
                ParamKind::Array,
                "Allowed extensions, empty for any",
            ),
            ParamSpec::new("fileSecurity", ParamKind::Boolean, "Enable per-file permissions"),
        ],
    },
    EndpointSpec {
        name: "list_files",
        description: "List files in a bucket.",
        category: ToolCategory::Storage,
        method: HttpMethod::Get,
        path: "/storage/buckets/{bucket_id}/files",
        params: &[QUERIES, SEARCH],
    },
    EndpointSpec {
        name: "get_file",
        description: "Get file metadata by ID.",
        category: ToolCategory::Storage,
        method: HttpMethod::Get,
        path: "/storage/buckets/{bucket_id}/files/{file_id}",
        params: &[],
    },
    EndpointSpec {
        name: "delete_file",
        description: "Delete a file from a bucket.",
        category: ToolCategory::Storage,
        method: HttpMethod::Delete,
        path: "/storage/buckets/{bucket_id}/files/{file_id}",
        params: &[],
    },
];
