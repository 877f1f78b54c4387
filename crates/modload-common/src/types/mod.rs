//! Common types used across modload
//!
//! Document databases address data through alternating collection and
//! document segments: `modules` is a collection, `modules/m1` a document,
//! `modules/m1/quizzes` a child collection of that document. The two path
//! types below keep that alternation in the type system so a collection can
//! never be written to as if it were a document.

use crate::error::{CommonError, Result};
use std::fmt;

/// Validate a single path segment (a collection id or document id)
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(CommonError::invalid_segment(segment, "must not be empty"));
    }
    if segment.contains('/') {
        return Err(CommonError::invalid_segment(segment, "must not contain '/'"));
    }
    if segment == "." || segment == ".." {
        return Err(CommonError::invalid_segment(segment, "must not be '.' or '..'"));
    }
    if segment.len() > 2 && segment.starts_with("__") && segment.ends_with("__") {
        return Err(CommonError::invalid_segment(
            segment,
            "ids of the form __id__ are reserved",
        ));
    }
    Ok(())
}

/// Path to a collection, e.g. `modules` or `modules/m1/quizzes`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

/// Path to a single document, e.g. `modules/m1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl CollectionPath {
    /// Top-level collection
    pub fn root(collection_id: &str) -> Result<Self> {
        validate_segment(collection_id)?;
        Ok(Self(collection_id.to_string()))
    }

    /// Reference to the document `id` inside this collection
    pub fn doc(&self, id: &str) -> Result<DocumentPath> {
        validate_segment(id)?;
        Ok(DocumentPath(format!("{}/{}", self.0, id)))
    }

    /// Last segment of the path
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Document owning this collection, `None` for top-level collections
    pub fn parent(&self) -> Option<DocumentPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocumentPath(parent.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocumentPath {
    /// Parse a slash-separated document path (even number of segments)
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(CommonError::invalid_segment(
                path,
                "a document path needs an even number of segments",
            ));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(path.to_string()))
    }

    /// Child collection `collection_id` of this document
    pub fn collection(&self, collection_id: &str) -> Result<CollectionPath> {
        validate_segment(collection_id)?;
        Ok(CollectionPath(format!("{}/{}", self.0, collection_id)))
    }

    /// Document id (last segment)
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection containing this document
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(self.0.clone()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
