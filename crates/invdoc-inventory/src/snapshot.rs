//! Node snapshots.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Read-only view of one inventory node, valid for a single render.
///
/// Attributes are already merged across precedence levels
/// (`default < normal < override < automatic`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSnapshot {
    /// Node name (usually the FQDN).
    pub name: String,
    /// Environment the node belongs to.
    pub chef_environment: String,
    /// Run list entries, e.g. `recipe[nginx]`, `role[web]`.
    pub run_list: Vec<String>,
    /// Merged attributes.
    pub attributes: Map<String, Value>,
}

/// Node document as returned by `GET /nodes/{name}`.
#[derive(Deserialize)]
struct NodeDocument {
    name: String,
    #[serde(default)]
    chef_environment: String,
    #[serde(default)]
    run_list: Vec<String>,
    #[serde(default)]
    default: Map<String, Value>,
    #[serde(default)]
    normal: Map<String, Value>,
    #[serde(default, rename = "override")]
    overrides: Map<String, Value>,
    #[serde(default)]
    automatic: Map<String, Value>,
}

impl NodeSnapshot {
    /// Create a snapshot with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chef_environment: "_default".to_owned(),
            ..Self::default()
        }
    }

    /// Set the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.chef_environment = environment.into();
        self
    }

    /// Append a run list entry.
    #[must_use]
    pub fn with_run_list_entry(mut self, entry: impl Into<String>) -> Self {
        self.run_list.push(entry.into());
        self
    }

    /// Set a top-level attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build a snapshot from a node JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is missing or a field has the wrong type.
    pub fn from_node_json(value: Value) -> Result<Self, serde_json::Error> {
        let doc: NodeDocument = serde_json::from_value(value)?;

        let mut attributes = doc.default;
        for layer in [doc.normal, doc.overrides, doc.automatic] {
            deep_merge(&mut attributes, layer);
        }

        Ok(Self {
            name: doc.name,
            chef_environment: doc.chef_environment,
            run_list: doc.run_list,
            attributes,
        })
    }

    /// Template context: merged attributes at top level, then `name`,
    /// `chef_environment`, `run_list` and the whole `attributes` object.
    ///
    /// The fixed keys shadow attributes of the same name. Keys are sorted, so
    /// the context serializes identically every time.
    #[must_use]
    pub fn to_context(&self) -> Value {
        let mut context = self.attributes.clone();
        context.insert("name".to_owned(), Value::from(self.name.clone()));
        context.insert(
            "chef_environment".to_owned(),
            Value::from(self.chef_environment.clone()),
        );
        context.insert("run_list".to_owned(), Value::from(self.run_list.clone()));
        context.insert(
            "attributes".to_owned(),
            Value::Object(self.attributes.clone()),
        );
        Value::Object(context)
    }
}

/// Merge `overlay` into `base`; nested objects merge, anything else replaces.
fn deep_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = base.get_mut(&key) {
                    deep_merge(existing, incoming);
                } else {
                    base.insert(key, Value::Object(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
