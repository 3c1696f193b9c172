//! Preferred-version discovery over the API server's discovery endpoints.
use crate::client::KubeClient;
use futures_util::future::try_join_all;
use kubeload::{Discovery, DiscoveryError};
use kubeload_core::ApiResourceList;
use serde::de::DeserializeOwned;
use serde::Deserialize;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// `GET /api`
#[derive(Debug, Deserialize)]
struct ApiVersions {
    #[serde(default)]
    versions: Vec<String>,
}

/// `GET /apis`
#[derive(Debug, Deserialize)]
struct ApiGroupList {
    #[serde(default)]
    groups: Vec<ApiGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroup {
    name: String,
    #[serde(default)]
    versions: Vec<GroupVersionForDiscovery>,
    preferred_version: Option<GroupVersionForDiscovery>,
}

impl ApiGroup {
    /// The advertised preferred version, or the first listed one.
    fn preferred(self) -> Option<GroupVersionForDiscovery> {
        self.preferred_version
            .or_else(|| self.versions.into_iter().next())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupVersionForDiscovery {
    group_version: String,
}

impl KubeClient {
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DiscoveryError> {
        let res = self
            .get(path)
            .await
            .map_err(|source| DiscoveryError::Request {
                path: path.to_string(),
                source,
            })?;

        res.json::<T>().await.map_err(|err| DiscoveryError::Decode {
            path: path.to_string(),
            reason: err.to_string(),
        })
    }

    /// Paths of the resource lists to fetch: the preferred core version first, then the
    /// preferred version of every named group in server order.
    async fn preferred_paths(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut paths = vec![];

        let core: ApiVersions = self.get_json("/api").await?;
        if let Some(version) = core.versions.first() {
            paths.push(format!("/api/{version}"));
        }

        let groups: ApiGroupList = self.get_json("/apis").await?;
        for group in groups.groups {
            let name = group.name.clone();
            match group.preferred() {
                Some(gv) => paths.push(format!("/apis/{}", gv.group_version)),
                None => debug!("Group {name} advertises no versions"),
            }
        }

        Ok(paths)
    }
}

impl Discovery for KubeClient {
    async fn server_preferred_resources(&self) -> Result<Vec<ApiResourceList>, DiscoveryError> {
        let paths = self.preferred_paths().await?;
        trace!("Fetching {} resource lists", paths.len());

        let lists = try_join_all(paths.iter().map(|path| self.get_json::<ApiResourceList>(path)))
            .await?;

        Ok(lists
            .into_iter()
            .map(|mut list| {
                // Subresources such as `pods/log` are not listable on their own.
                list.resources.retain(|r| !r.name.contains('/'));
                list
            })
            .collect())
    }
}
