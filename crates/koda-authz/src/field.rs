//! Requested query shape consumed by the authorization engine.
//!
//! # Key invariants
//! - A field's `requires` list holds raw role names exactly as declared by the
//!   schema annotation; names are resolved lazily by [`QueryField::required_roles`].
//! - Unknown role names are skipped with a warning, never fatal.
use crate::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<QueryField>,
}

impl QueryField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn requires<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn child(mut self, child: QueryField) -> Self {
        self.children.push(child);
        self
    }

    /// Resolve the declared role names, dropping blanks and unknown names.
    pub fn required_roles(&self) -> Vec<Role> {
        let mut roles = Vec::with_capacity(self.requires.len());
        for raw in &self.requires {
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<Role>() {
                Ok(role) => roles.push(role),
                Err(err) => {
                    tracing::warn!(field = %self.name, error = %err, "skipping role annotation");
                }
            }
        }
        roles
    }
}
