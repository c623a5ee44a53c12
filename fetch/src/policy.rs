use crate::fetcher::ListRequest;
use crate::serialize::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Part of a request whose change triggers a new fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    Path,
    /// Compared by its serialized form, a rebuilt query which yields the same
    /// query string is no change.
    Query,
    Reload,
}

/// The dependencies a fetcher watches, chosen by whoever owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyPolicy {
    dependencies: Vec<Dependency>,
}

impl DependencyPolicy {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        let mut deduped = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if !deduped.contains(&dependency) {
                deduped.push(dependency);
            }
        }
        DependencyPolicy {
            dependencies: deduped,
        }
    }

    pub fn path_and_query() -> Self {
        Self::new(vec![Dependency::Path, Dependency::Query])
    }

    pub fn path_and_reload() -> Self {
        Self::new(vec![Dependency::Path, Dependency::Reload])
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub(crate) fn fingerprint(
        &self,
        request: &ListRequest,
        serializer: &Serializer,
    ) -> Fingerprint {
        Fingerprint(
            self.dependencies
                .iter()
                .map(|dependency| match dependency {
                    Dependency::Path => Component::Path(request.path.clone()),
                    Dependency::Query => match serializer.serialize(&request.query) {
                        Ok(serialized) => Component::Query(serialized.encode()),
                        // still has to differ from every other broken query
                        Err(_) => Component::Unserializable(format!("{:?}", request.query)),
                    },
                    Dependency::Reload => Component::Reload(request.reload_key),
                })
                .collect(),
        )
    }
}

impl Default for DependencyPolicy {
    fn default() -> Self {
        Self::path_and_query()
    }
}

impl Display for DependencyPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = self
            .dependencies
            .iter()
            .map(|d| match d {
                Dependency::Path => "path",
                Dependency::Query => "query",
                Dependency::Reload => "reload",
            })
            .collect::<Vec<_>>();
        f.write_str(&names.join("+"))
    }
}

/// What happens to responses which settle out of order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Only the most recently issued request may settle the state.
    #[default]
    LatestOnly,
    /// Whatever settles last wins, even if a newer request is outstanding.
    LastSettled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Fingerprint(Vec<Component>);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Component {
    Path(String),
    Query(String),
    Unserializable(String),
    Reload(u64),
}
