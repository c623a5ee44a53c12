//! Fetching of lists from the storefront api.
//!
//! A [`QueryListFetcher`] turns a path and a structured [`value::Query`] into
//! a GET request, serializing the query deterministically (see [`serialize`]),
//! and exposes the outcome as a [`FetchState`] which re-fetches whenever the
//! dependencies chosen through its [`DependencyPolicy`] change.

mod config;
mod fetcher;
mod policy;
mod serialize;
mod state;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RequestConfig;
pub use fetcher::{FetcherOptions, ListRequest, QueryListFetcher};
pub use policy::{Dependency, DependencyPolicy, Resolution};
pub use serialize::{ArrayEncoding, SerializedQuery, Serializer, build_url, serialize};
pub use state::FetchState;
pub use transport::{HttpTransport, TOKEN_KEY, Transport};

pub use error::FetchError;
