//! Context binding
//!
//! Turns the user's current selections (project, database, collection, bucket,
//! function) into an immutable [`AIContext`] that scopes tool calls and is
//! described to the model in its system instructions.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A selected platform resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Resource whose display name is its id
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }

    fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// Immutable snapshot of what the user has selected.
///
/// `collection` is only ever set together with `database`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AIContext {
    pub project: ResourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ResourceRef>,
}

impl AIContext {
    /// Context with only a project selected
    pub fn for_project(project: ResourceRef) -> Self {
        bind(project, None, None, None, None)
    }

    /// Human-readable summary, see [`describe`]
    pub fn describe(&self) -> String {
        describe(self)
    }
}

/// Assemble a context from the current selections.
///
/// A collection without a database is dropped.
pub fn bind(
    project: ResourceRef,
    database: Option<ResourceRef>,
    collection: Option<ResourceRef>,
    bucket: Option<ResourceRef>,
    function: Option<ResourceRef>,
) -> AIContext {
    let collection = if database.is_some() { collection } else { None };
    AIContext {
        project,
        database,
        collection,
        bucket,
        function,
    }
}

/// Comma-joined summary such as `Project: Shop, DB: main, Collection: orders`
pub fn describe(context: &AIContext) -> String {
    let mut parts = vec![format!("Project: {}", context.project.label())];
    let optional = [
        ("DB", &context.database),
        ("Collection", &context.collection),
        ("Bucket", &context.bucket),
        ("Function", &context.function),
    ];
    for (label, resource) in optional {
        if let Some(resource) = resource {
            parts.push(format!("{}: {}", label, resource.label()));
        }
    }
    parts.join(", ")
}

/// Mutable selection state behind the context.
///
/// Enforces the selection rules: a new project clears everything below it and a
/// new database clears the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    project: Option<ResourceRef>,
    database: Option<ResourceRef>,
    collection: Option<ResourceRef>,
    bucket: Option<ResourceRef>,
    function: Option<ResourceRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self) -> Option<&ResourceRef> {
        self.project.as_ref()
    }

    pub fn select_project(&mut self, project: ResourceRef) {
        *self = Self {
            project: Some(project),
            ..Self::default()
        };
    }

    pub fn clear_project(&mut self) {
        *self = Self::default();
    }

    pub fn select_database(&mut self, database: Option<ResourceRef>) {
        if self.database != database {
            self.collection = None;
        }
        self.database = database;
    }

    pub fn select_collection(
        &mut self,
        collection: Option<ResourceRef>,
    ) -> std::result::Result<(), ValidationError> {
        if collection.is_some() && self.database.is_none() {
            return Err(ValidationError::CollectionWithoutDatabase);
        }
        self.collection = collection;
        Ok(())
    }

    pub fn select_bucket(&mut self, bucket: Option<ResourceRef>) {
        self.bucket = bucket;
    }

    pub fn select_function(&mut self, function: Option<ResourceRef>) {
        self.function = function;
    }

    /// Bind the current selection, or `None` when no project is active
    pub fn context(&self) -> Option<AIContext> {
        let project = self.project.clone()?;
        Some(bind(
            project,
            self.database.clone(),
            self.collection.clone(),
            self.bucket.clone(),
            self.function.clone(),
        ))
    }
}
