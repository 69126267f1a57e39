//! Declarative lock configuration
//!
//! A manager can be described in TOML instead of code:
//!
//! ```toml
//! locks = ["catalog", "index", "queue"]
//!
//! [policy]
//! kind = "dag"
//! edges = [["catalog", "index"], ["index", "queue"]]
//! ```
//!
//! Configuration files are runtime input, so every problem is reported as an
//! error rather than the panics used for statically defined policies.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::domain::locking::{DagPolicyBuilder, Manager, NoPolicy, Policy, TotalOrderPolicy};

/// Lock manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Lock identifiers to register
    pub locks: Vec<String>,

    /// Acquisition policy
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Acquisition policy selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// No ordering constraint
    None,
    /// Strictly ascending lexicographic order
    #[default]
    TotalOrder,
    /// Edges `[from, to]` allowing `to` directly after `from`
    Dag {
        #[serde(default)]
        edges: Vec<(String, String)>,
    },
}

impl PolicyConfig {
    /// Build the configured policy
    pub fn build(&self) -> anyhow::Result<Box<dyn Policy>> {
        let policy: Box<dyn Policy> = match self {
            Self::None => Box::new(NoPolicy),
            Self::TotalOrder => Box::new(TotalOrderPolicy),
            Self::Dag { edges } => {
                let builder = edges
                    .iter()
                    .fold(DagPolicyBuilder::new(), |builder, (from, to)| {
                        builder.add(from.as_str(), to.as_str())
                    });
                Box::new(builder.try_build()?)
            }
        };
        Ok(policy)
    }
}

impl ManagerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: ManagerConfig =
            toml::from_str(contents).context("Failed to parse lock configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lock configuration: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid lock configuration: {}", path.display()))
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize lock configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.check_locks()?;
        self.policy.build().map(|_| ())
    }

    /// Structural checks that do not need the policy to be built
    fn check_locks(&self) -> anyhow::Result<()> {
        if self.locks.is_empty() {
            return Err(anyhow!("At least one lock must be declared"));
        }

        let mut declared = BTreeSet::new();
        for id in &self.locks {
            if id.is_empty() {
                return Err(anyhow!("Lock identifiers must not be empty"));
            }
            if !declared.insert(id.as_str()) {
                return Err(anyhow!("Duplicate lock: '{}' is declared more than once", id));
            }
        }

        if let PolicyConfig::Dag { edges } = &self.policy {
            for (from, to) in edges {
                for id in [from, to] {
                    if !declared.contains(id.as_str()) {
                        return Err(anyhow!(
                            "DAG edge {} -> {} references undeclared lock '{}'",
                            from,
                            to,
                            id
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Build the configured policy
    pub fn build_policy(&self) -> anyhow::Result<Box<dyn Policy>> {
        self.policy.build()
    }

    /// Build a manager from this configuration
    pub fn build_manager(&self) -> anyhow::Result<Manager> {
        self.check_locks()?;
        let policy = self.policy.build()?;
        Manager::try_new(self.locks.iter().cloned(), policy).map_err(Into::into)
    }
}
