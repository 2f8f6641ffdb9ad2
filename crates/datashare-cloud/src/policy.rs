//! Bucket policy document editing.
//!
//! Statements are addressed by `Sid`. Statements this service does not own
//! are preserved as-is, including fields it does not model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{CloudError, CloudResult};

const POLICY_VERSION: &str = "2012-10-17";

/// An `Allow` statement granting a principal actions on resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Statement id.
    pub sid: String,
    /// `Allow` or `Deny`.
    pub effect: String,
    /// Principal the statement applies to.
    pub principal: Value,
    /// Allowed actions.
    pub action: Vec<String>,
    /// Resources the actions apply to.
    pub resource: Vec<String>,
}

impl PolicyStatement {
    /// Build an `Allow` statement for an IAM principal.
    pub fn allow(sid: &str, principal_arn: &str, actions: &[String], resources: &[String]) -> Self {
        Self {
            sid: sid.to_string(),
            effect: "Allow".to_string(),
            principal: json!({ "AWS": principal_arn }),
            action: actions.to_vec(),
            resource: resources.to_vec(),
        }
    }
}

/// A parsed bucket policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPolicyDocument {
    version: String,
    statements: Vec<Value>,
    extra: Map<String, Value>,
}

impl Default for BucketPolicyDocument {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statements: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl BucketPolicyDocument {
    /// Parse a stored policy. A missing policy is an empty document.
    pub fn parse(policy: Option<&str>) -> CloudResult<Self> {
        let Some(raw) = policy else {
            return Ok(Self::default());
        };

        let mut root: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| CloudError::Malformed(format!("bucket policy: {e}")))?;

        let version = match root.remove("Version") {
            Some(Value::String(v)) => v,
            _ => POLICY_VERSION.to_string(),
        };
        let statements = match root.remove("Statement") {
            Some(Value::Array(items)) => items,
            Some(single @ Value::Object(_)) => vec![single],
            None => Vec::new(),
            Some(other) => {
                return Err(CloudError::Malformed(format!(
                    "bucket policy Statement must be an array or object, got {other}"
                )));
            }
        };

        Ok(Self {
            version,
            statements,
            extra: root,
        })
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the document has no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether a statement with `sid` exists.
    pub fn contains(&self, sid: &str) -> bool {
        self.position(sid).is_some()
    }

    /// Whether any statement id starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.statements
            .iter()
            .filter_map(statement_sid)
            .any(|sid| sid.starts_with(prefix))
    }

    /// Insert or replace the statement with the same `Sid`.
    ///
    /// Returns `false` when an identical statement was already present.
    pub fn upsert_statement(&mut self, statement: &PolicyStatement) -> CloudResult<bool> {
        let value = serde_json::to_value(statement)
            .map_err(|e| CloudError::Malformed(format!("policy statement: {e}")))?;
        match self.position(&statement.sid) {
            Some(idx) if self.statements[idx] == value => Ok(false),
            Some(idx) => {
                self.statements[idx] = value;
                Ok(true)
            }
            None => {
                self.statements.push(value);
                Ok(true)
            }
        }
    }

    /// Remove the statement with `sid`. Returns `false` when it was absent.
    pub fn remove_statement(&mut self, sid: &str) -> bool {
        match self.position(sid) {
            Some(idx) => {
                self.statements.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Serialize the document for storage.
    pub fn to_json(&self) -> CloudResult<String> {
        let mut root = self.extra.clone();
        root.insert("Version".to_string(), Value::String(self.version.clone()));
        root.insert("Statement".to_string(), Value::Array(self.statements.clone()));
        serde_json::to_string(&root).map_err(|e| CloudError::Malformed(format!("bucket policy: {e}")))
    }

    fn position(&self, sid: &str) -> Option<usize> {
        self.statements
            .iter()
            .position(|s| statement_sid(s) == Some(sid))
    }
}

fn statement_sid(statement: &Value) -> Option<&str> {
    statement.get("Sid").and_then(Value::as_str)
}
