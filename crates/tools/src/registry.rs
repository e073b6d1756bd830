//! Tool registry for managing available tools.

use crate::error::DispatchError;
use crate::types::{Tool, ToolEntry, ToolPolicy};
use std::collections::HashSet;
use std::sync::Arc;

/// Registry of available tools, in registration order.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    enabled: HashSet<String>,
    default_policy: ToolPolicy,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::with_default_policy(ToolPolicy::default())
    }

    /// Create a registry whose `register` uses the given policy.
    pub fn with_default_policy(default_policy: ToolPolicy) -> Self {
        Self {
            entries: Vec::new(),
            enabled: HashSet::new(),
            default_policy,
        }
    }

    /// Register a tool with the default policy (enabled by default).
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), DispatchError> {
        let policy = self.default_policy;
        self.register_with_policy(tool, policy)
    }

    /// Register a tool with its own timeout and retry policy.
    pub fn register_with_policy(
        &mut self,
        tool: Arc<dyn Tool>,
        policy: ToolPolicy,
    ) -> Result<(), DispatchError> {
        let name = tool.name().to_string();
        if self.entries.iter().any(|e| e.name() == name) {
            return Err(DispatchError::DuplicateTool(name));
        }
        self.entries.push(ToolEntry::new(tool, policy));
        self.enabled.insert(name);
        Ok(())
    }

    /// Enable a tool by name.
    pub fn enable(&mut self, name: &str) {
        if self.entries.iter().any(|e| e.name() == name) {
            self.enabled.insert(name.to_string());
        }
    }

    /// Disable a tool by name.
    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    /// Check if a tool is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Get a tool entry by name (only if enabled).
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        if !self.enabled.contains(name) {
            return None;
        }
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Enabled entries, ready to hand to the dispatcher.
    pub fn entries(&self) -> Vec<ToolEntry> {
        self.entries
            .iter()
            .filter(|e| self.enabled.contains(e.name()))
            .cloned()
            .collect()
    }

    /// List all registered tool names.
    pub fn list_tools(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    /// List enabled tool names in registration order.
    pub fn list_enabled(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.name())
            .filter(|name| self.enabled.contains(*name))
            .collect()
    }

    /// `(name, description)` of each enabled tool in registration order.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter(|e| self.enabled.contains(e.name()))
            .map(|e| (e.name(), e.tool.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
