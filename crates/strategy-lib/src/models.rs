//! Core data models exchanged with strategies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Resource types a strategy can recommend for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cpu,
    Memory,
}

impl ResourceType {
    pub const ALL: [ResourceType; 2] = [ResourceType::Cpu, ResourceType::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Cpu => "cpu",
            ResourceType::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended request/limit pair for one resource type
///
/// `None` on either bound means "no recommendation for this bound".
/// Nothing here enforces `limit >= request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecommendation {
    pub request: Option<Decimal>,
    pub limit: Option<Decimal>,
}

impl ResourceRecommendation {
    pub fn new(request: Option<Decimal>, limit: Option<Decimal>) -> Self {
        Self { request, limit }
    }

    /// Recommend no bound at all
    pub fn undefined() -> Self {
        Self {
            request: None,
            limit: None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.request.is_none() && self.limit.is_none()
    }
}

/// Samples per series label, in chronological order
pub type ResourceHistoryData = HashMap<String, Vec<Decimal>>;

/// History for every resource type fetched for a workload
pub type HistoryData = HashMap<ResourceType, ResourceHistoryData>;

/// One recommendation per resource type the strategy considered
pub type RunResult = HashMap<ResourceType, ResourceRecommendation>;

/// Currently configured requests and limits of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocations {
    #[serde(default)]
    pub requests: HashMap<ResourceType, Option<Decimal>>,
    #[serde(default)]
    pub limits: HashMap<ResourceType, Option<Decimal>>,
}

/// Descriptor of the workload container being sized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct K8sObjectData {
    #[serde(default)]
    pub cluster: Option<String>,
    pub name: String,
    pub container: String,
    pub namespace: String,
    pub kind: String,
    #[serde(default)]
    pub pods: Vec<String>,
    #[serde(default)]
    pub allocations: ResourceAllocations,
}

impl K8sObjectData {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            cluster: None,
            name: name.into(),
            container: container.into(),
            namespace: namespace.into(),
            kind: kind.into(),
            pods: Vec::new(),
            allocations: ResourceAllocations::default(),
        }
    }

    /// Check that the descriptor names a concrete container
    pub fn ensure_identified(&self) -> std::result::Result<(), String> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("container", &self.container),
            ("namespace", &self.namespace),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("object data is missing {}", missing.join(", ")))
        }
    }
}

impl fmt::Display for K8sObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cluster) = &self.cluster {
            write!(f, "{}/", cluster)?;
        }
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.kind, self.name, self.container
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_recommendation() {
        let rec = ResourceRecommendation::undefined();
        assert!(rec.is_undefined());
        assert!(!ResourceRecommendation::new(Some(Decimal::ONE), None).is_undefined());
    }

    #[test]
    fn test_object_display() {
        let mut object = K8sObjectData::new("default", "Deployment", "api", "server");
        assert_eq!(object.to_string(), "default/Deployment/api/server");
        object.cluster = Some("prod".to_string());
        assert_eq!(object.to_string(), "prod/default/Deployment/api/server");
    }

    #[test]
    fn test_unidentified_object_reports_fields() {
        let object = K8sObjectData::new("", "Deployment", "api", " ");
        let reason = object.ensure_identified().unwrap_err();
        assert_eq!(reason, "object data is missing container, namespace");
        assert!(K8sObjectData::new("default", "Job", "batch", "main")
            .ensure_identified()
            .is_ok());
    }

    #[test]
    fn test_history_deserializes_from_json_numbers() {
        let json = r#"{"cpu": {"pod-a": [0.1, 0.25]}, "memory": {"pod-a": []}}"#;
        let history: HistoryData = serde_json::from_str(json).unwrap();
        assert_eq!(history[&ResourceType::Cpu]["pod-a"].len(), 2);
        assert!(history[&ResourceType::Memory]["pod-a"].is_empty());
    }
}
