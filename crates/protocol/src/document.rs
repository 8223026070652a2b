//! JSON:API document envelope spoken by the scheduler's resource API.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Media type for every request and response body.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Top-level document: primary `data` plus side-loaded `included` resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<D> {
	pub data: D,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub included: Vec<ResourceObject<Value>>,
}

impl<D> Document<D> {
	pub fn new(data: D) -> Self {
		Self { data, included: Vec::new() }
	}

	/// Finds the side-loaded resource `ident` and decodes its attributes as `A`.
	///
	/// Returns `None` when the server did not include the resource.
	pub fn find_included<A: DeserializeOwned>(&self, ident: &ResourceIdentifier) -> Option<serde_json::Result<ResourceObject<A>>> {
		self.included
			.iter()
			.find(|resource| resource.kind == ident.kind && resource.id.as_deref() == Some(ident.id.as_str()))
			.map(ResourceObject::decode)
	}

	/// Decodes every included resource referenced by `idents`, skipping missing ones.
	pub fn collect_included<'a, A, I>(&self, idents: I) -> serde_json::Result<Vec<ResourceObject<A>>>
	where
		A: DeserializeOwned,
		I: IntoIterator<Item = &'a ResourceIdentifier>,
	{
		idents.into_iter().filter_map(|ident| self.find_included(ident)).collect()
	}
}

/// A single resource object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject<A> {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub attributes: A,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub relationships: BTreeMap<String, Relationship>,
}

impl<A> ResourceObject<A> {
	pub fn new(kind: impl Into<String>, attributes: A) -> Self {
		Self {
			kind: kind.into(),
			id: None,
			attributes,
			relationships: BTreeMap::new(),
		}
	}

	pub fn with_relationship(mut self, name: impl Into<String>, linkage: Linkage) -> Self {
		self.relationships.insert(name.into(), Relationship { data: Some(linkage) });
		self
	}

	/// Identifiers linked under `name`, empty when the relationship is absent or null.
	pub fn related(&self, name: &str) -> Vec<&ResourceIdentifier> {
		match self.relationships.get(name).and_then(|rel| rel.data.as_ref()) {
			Some(Linkage::One(ident)) => vec![ident],
			Some(Linkage::Many(idents)) => idents.iter().collect(),
			None => Vec::new(),
		}
	}

	pub fn id_or_default(&self) -> String {
		self.id.clone().unwrap_or_default()
	}
}

impl ResourceObject<Value> {
	fn decode<A: DeserializeOwned>(&self) -> serde_json::Result<ResourceObject<A>> {
		Ok(ResourceObject {
			kind: self.kind.clone(),
			id: self.id.clone(),
			attributes: serde_json::from_value(self.attributes.clone())?,
			relationships: self.relationships.clone(),
		})
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
	#[serde(default)]
	pub data: Option<Linkage>,
}

/// Resource linkage: to-one or to-many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
	One(ResourceIdentifier),
	Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
	#[serde(rename = "type")]
	pub kind: String,
	pub id: String,
}

impl ResourceIdentifier {
	pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
		Self { kind: kind.into(), id: id.into() }
	}
}

/// Error document returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDocument {
	#[serde(default)]
	pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorObject {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub detail: Option<String>,
}

impl ErrorDocument {
	/// First human readable message, preferring `detail` over `title`.
	pub fn message(&self) -> Option<String> {
		self.errors.iter().find_map(|error| error.detail.clone().or_else(|| error.title.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{EXECUTION_TYPE, ExecutionAttributes, ExecutionState, JobStepAttributes};
	use serde_json::json;

	fn step_document() -> Value {
		json!({
			"data": {
				"type": "job-steps",
				"id": "3",
				"attributes": {"arguments": ["-l"], "path": "/bin/ls", "pty": false, "submitted": true},
				"relationships": {
					"executions": {"data": [
						{"type": "executions", "id": "42.3.node1"},
						{"type": "executions", "id": "42.3.node2"}
					]},
					"job": {"data": {"type": "jobs", "id": "42"}},
					"owner": {"data": null}
				}
			},
			"included": [
				{"type": "executions", "id": "42.3.node2", "attributes": {"node": "node2", "port": 9001, "state": "PENDING"}},
				{"type": "executions", "id": "42.3.node1", "attributes": {"node": "node1", "port": 9000, "state": "RUNNING"}},
				{"type": "nodes", "id": "node1", "attributes": {"name": "node1"}}
			]
		})
	}

	#[test]
	fn related_identifiers_follow_linkage_kind() {
		let doc: Document<ResourceObject<JobStepAttributes>> = serde_json::from_value(step_document()).unwrap();

		assert_eq!(doc.data.related("executions").len(), 2);
		assert_eq!(doc.data.related("job"), vec![&ResourceIdentifier::new("jobs", "42")]);
		assert!(doc.data.related("owner").is_empty());
		assert!(doc.data.related("missing").is_empty());
	}

	#[test]
	fn included_resources_resolve_in_linkage_order() {
		let doc: Document<ResourceObject<JobStepAttributes>> = serde_json::from_value(step_document()).unwrap();

		let executions: Vec<ResourceObject<ExecutionAttributes>> = doc.collect_included(doc.data.related("executions")).unwrap();
		assert_eq!(executions.len(), 2);
		assert_eq!(executions[0].kind, EXECUTION_TYPE);
		assert_eq!(executions[0].attributes.node, "node1");
		assert_eq!(executions[0].attributes.state, ExecutionState::Running);
		assert_eq!(executions[1].attributes.port, 9001);
	}

	#[test]
	fn request_documents_omit_empty_members() {
		let resource = ResourceObject::new("job-steps", json!({"path": "/bin/ls"}))
			.with_relationship("job", Linkage::One(ResourceIdentifier::new("jobs", "7")));
		let value = serde_json::to_value(Document::new(resource)).unwrap();

		assert_eq!(
			value,
			json!({
				"data": {
					"type": "job-steps",
					"attributes": {"path": "/bin/ls"},
					"relationships": {"job": {"data": {"type": "jobs", "id": "7"}}}
				}
			})
		);
	}

	#[test]
	fn error_document_prefers_detail() {
		let doc: ErrorDocument = serde_json::from_value(json!({
			"errors": [{"title": "Not Found", "detail": "job 42 does not exist"}]
		}))
		.unwrap();
		assert_eq!(doc.message().as_deref(), Some("job 42 does not exist"));
	}
}
