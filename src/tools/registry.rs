use crate::error::DuplicateToolError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use super::definition::ToolDefinition;

/// What happens when a tool name is registered twice in one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the first definition and fail the registration.
    #[default]
    Reject,
    /// Replace the earlier definition in place.
    Overwrite,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            other => Err(format!(
                "invalid duplicate policy '{}' (must be 'reject' or 'overwrite')",
                other
            )),
        }
    }
}

/// An immutable generation of the registry, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<Arc<ToolDefinition>>,
    index: HashMap<String, usize>,
    overwritten: Vec<String>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.tools.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDefinition>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Names replaced under [`DuplicatePolicy::Overwrite`] while this
    /// generation was built.
    pub fn overwritten(&self) -> &[String] {
        &self.overwritten
    }

    fn check(&self, name: &str, policy: DuplicatePolicy) -> Result<(), DuplicateToolError> {
        if policy == DuplicatePolicy::Reject && self.index.contains_key(name) {
            return Err(DuplicateToolError {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, tool: Arc<ToolDefinition>) {
        match self.index.get(tool.name()) {
            Some(&i) => {
                tracing::warn!(
                    tool = %tool.name(),
                    previous = %self.tools[i].source().display(),
                    source = %tool.source().display(),
                    "Overwriting previously registered tool"
                );
                self.overwritten.push(tool.name().to_string());
                self.tools[i] = tool;
            }
            None => {
                self.index.insert(tool.name().to_string(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }
}

/// Process-owned catalog of tools.
///
/// Readers take an `Arc<Catalog>` snapshot; writers build a new catalog and
/// swap it in, so a reader never sees a partly populated generation and a
/// snapshot never changes under it.
#[derive(Debug, Default)]
pub struct Registry {
    current: RwLock<Arc<Catalog>>,
    policy: DuplicatePolicy,
}

impl Registry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(Catalog::default())),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn register(&self, tool: ToolDefinition) -> Result<(), DuplicateToolError> {
        self.register_all(vec![tool]).map(|_| ())
    }

    /// Register a batch as one step: either every tool lands or none does.
    pub fn register_all(&self, tools: Vec<ToolDefinition>) -> Result<usize, DuplicateToolError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Catalog::clone(&current);
        let count = tools.len();
        for tool in tools {
            next.check(tool.name(), self.policy)?;
            next.insert(Arc::new(tool));
        }
        *current = Arc::new(next);
        Ok(count)
    }

    pub fn clear(&self) {
        self.replace(Arc::new(Catalog::default()));
    }

    /// Swap in a fully built catalog.
    pub fn replace(&self, catalog: Arc<Catalog>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = catalog;
    }

    pub fn all(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn find(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.all().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }
}
