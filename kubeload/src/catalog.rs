use crate::client::{Discovery, DiscoveryError};
use kubeload_core::{ApiResourceList, GroupVersion, ResourceKind};
use std::collections::HashSet;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Decides which advertised resources are eligible for load generation.
#[derive(Clone, Debug, Default)]
pub struct ResourceCatalog {
    exclusions: HashSet<String>,
}

impl ResourceCatalog {
    /// Exclusion entries match either a bare resource name (`pods`) or a
    /// `group-version/name` composite (`v1/pods`), case-insensitively.
    pub fn new<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exclusions: exclusions
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_excluded(&self, group_version: &str, name: &str) -> bool {
        if self.exclusions.is_empty() {
            return false;
        }

        let name = name.to_lowercase();
        if self.exclusions.contains(&name) {
            return true;
        }

        let composite = format!("{}/{}", group_version.to_lowercase(), name);
        self.exclusions.contains(&composite)
    }

    /// Eligible resources in snapshot order. Entries with an unparseable group-version are
    /// skipped.
    pub fn filter(&self, snapshot: &[ApiResourceList]) -> Vec<ResourceKind> {
        let mut resources = vec![];
        for list in snapshot {
            let gv: GroupVersion = match list.group_version.parse() {
                Ok(gv) => gv,
                Err(err) => {
                    debug!("Skipping discovery entry: {err}");
                    continue;
                }
            };

            for resource in &list.resources {
                if self.is_excluded(&list.group_version, &resource.name) {
                    trace!("Excluding {}/{}", list.group_version, resource.name);
                    continue;
                }

                if let Some(kind) = ResourceKind::from_advertised(&list.group_version, &gv, resource)
                {
                    resources.push(kind);
                }
            }
        }
        resources
    }

    pub async fn discover<D: Discovery>(
        &self,
        discovery: &D,
    ) -> Result<Vec<ResourceKind>, DiscoveryError> {
        let snapshot = discovery.server_preferred_resources().await?;
        let resources = self.filter(&snapshot);
        debug!(
            "{} eligible resources across {} group-versions",
            resources.len(),
            snapshot.len()
        );
        Ok(resources)
    }
}
