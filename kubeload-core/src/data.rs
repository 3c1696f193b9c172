use crate::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unexpected group-version string: {0:?}")]
pub struct GroupVersionParseError(pub String);

/// API group and version, e.g. `apps/v1`. The core group is the empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    pub fn with_resource(&self, resource: impl Into<String>) -> GroupVersionResource {
        GroupVersionResource {
            group: self.group.clone(),
            version: self.version.clone(),
            resource: resource.into(),
        }
    }
}

impl FromStr for GroupVersion {
    type Err = GroupVersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "/" {
            return Ok(Self::default());
        }

        match s.split_once('/') {
            None => Ok(Self::new("", s)),
            Some((group, version)) if !version.contains('/') => Ok(Self::new(group, version)),
            Some(_) => Err(GroupVersionParseError(s.to_string())),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Fully-qualified locator used to issue a call against one resource kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    /// Path of the collection, relative to the API server root.
    pub fn list_path(&self, namespace: Option<&str>) -> String {
        let mut path = if self.group.is_empty() {
            format!("/api/{}", self.version)
        } else {
            format!("/apis/{}/{}", self.group, self.version)
        };

        if let Some(namespace) = namespace {
            path.push_str("/namespaces/");
            path.push_str(namespace);
        }

        path.push('/');
        path.push_str(&self.resource);
        path
    }
}

/// One group-version's entry in a discovery snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub group_version: String,
    #[serde(default)]
    pub resources: Vec<ApiResource>,
}

/// A resource as advertised by the server, before any filtering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    #[serde(default)]
    pub namespaced: bool,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub verbs: Vec<String>,
}

impl ApiResource {
    pub fn new(name: impl Into<String>, namespaced: bool, verbs: &[&str]) -> Self {
        Self {
            name: name.into(),
            namespaced,
            kind: String::new(),
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

/// A listable resource kind eligible for load generation.
///
/// Only resources advertising both `list` and `get` can be turned into a `ResourceKind`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    group_version: String,
    name: String,
    namespaced: bool,
    gvr: GroupVersionResource,
}

impl ResourceKind {
    pub fn from_advertised(
        group_version: &str,
        parsed: &GroupVersion,
        resource: &ApiResource,
    ) -> Option<Self> {
        if !(resource.supports("list") && resource.supports("get")) {
            return None;
        }

        Some(Self {
            group_version: group_version.to_string(),
            name: resource.name.clone(),
            namespaced: resource.namespaced,
            gvr: parsed.with_resource(&resource.name),
        })
    }

    /// `group-version/name`, unique across the whole discovery snapshot.
    pub fn id(&self) -> String {
        format!("{}/{}", self.group_version, self.name)
    }

    pub fn group_version(&self) -> &str {
        &self.group_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn gvr(&self) -> &GroupVersionResource {
        &self.gvr
    }

    pub fn list_path(&self) -> String {
        let namespace = self.namespaced.then_some(DEFAULT_NAMESPACE);
        self.gvr.list_path(namespace)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_version, self.name)
    }
}
