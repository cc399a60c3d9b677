//! Serde model of a SPARQL JSON query result (the subset we consume).

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub results: ResultSet,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<BTreeMap<String, BoundValue>>,
}

/// One bound value of a result row. `kind` is the SPARQL term type
/// (`uri`, `literal`, `bnode`); extra annotations like `xml:lang` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl BoundValue {
    pub fn is_uri(&self) -> bool {
        self.kind == "uri"
    }
}
