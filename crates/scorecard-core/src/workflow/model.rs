//! Domain model of a GitHub-Actions-style workflow document.
//!
//! Only the surface the policy inspects is modeled; everything else in the
//! document (triggers, matrices, expressions) is deliberately ignored during
//! deserialization. Fields that accept several YAML shapes upstream
//! (permissions, runs-on) are modeled as untagged enums.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml_bw as serde_yaml;
use serde_yaml_bw::Value;

#[derive(Debug, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub env: Option<Value>,
    #[serde(default)]
    pub defaults: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub jobs: BTreeMap<String, Job>,
}

impl Workflow {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// `permissions:` accepts the `read-all`/`write-all` shorthand or a scope
/// map with `read`/`write`/`none` values.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Permissions {
    Shorthand(String),
    Scopes(BTreeMap<String, String>),
}

impl Permissions {
    pub fn is_write_all(&self) -> bool {
        matches!(self, Self::Shorthand(value) if value == "write-all")
    }

    /// Scopes explicitly granted `write`.
    pub fn write_scopes(&self) -> Vec<&str> {
        match self {
            Self::Shorthand(_) => Vec::new(),
            Self::Scopes(scopes) => scopes
                .iter()
                .filter(|(_, level)| level.as_str() == "write")
                .map(|(scope, _)| scope.as_str())
                .collect(),
        }
    }

    pub fn scope(&self, name: &str) -> Option<&str> {
        match self {
            Self::Shorthand(_) => None,
            Self::Scopes(scopes) => scopes.get(name).map(String::as_str),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default, rename = "runs-on")]
    pub runs_on: Option<RunsOn>,
    #[serde(default)]
    pub container: Option<Value>,
    #[serde(default)]
    pub services: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub env: Option<Value>,
    #[serde(default)]
    pub defaults: Option<Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Job {
    pub fn has_services(&self) -> bool {
        self.services.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// `runs-on:` accepts a single label, a label list, or a runner-group
/// object. The policy only ever looks at the flattened label list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
    Group {
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        labels: Option<OneOrMany>,
    },
}

impl RunsOn {
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Label(label) => vec![label.as_str()],
            Self::Labels(labels) => labels.iter().map(String::as_str).collect(),
            Self::Group { labels, .. } => match labels {
                Some(OneOrMany::One(label)) => vec![label.as_str()],
                Some(OneOrMany::Many(labels)) => labels.iter().map(String::as_str).collect(),
                None => Vec::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub with: Option<Value>,
    #[serde(default)]
    pub env: Option<Value>,
}
