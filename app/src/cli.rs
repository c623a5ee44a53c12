use crate::catalog::{CATEGORIES_PATH, PRODUCTS_PATH, ProductQuery, Sort, product_path};
use crate::config::Settings;
use anyhow::{Context as _, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use fetch::{
    FetchState, HttpTransport, ListRequest, QueryListFetcher, RequestConfig, TOKEN_KEY, Transport,
};
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io};
use tracing::{debug, info};
use util::claims::{Identity, remap_claims};
use util::{FileStore, KeyValueStore, RecentlyViewed};
use value::{Dict, Query, Value};

#[derive(Parser, Debug)]
#[command(name = "storefront", version, about = "Query lists of the bakery storefront api")]
pub struct Cli {
    /// Settings file, `storefront.toml` is used when present.
    #[arg(short, long, global = true, env = "STOREFRONT_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch any list endpoint, `-p Filter.CategoryId=c1` nests one level.
    List(ListArgs),
    /// List products.
    Products(ProductArgs),
    /// List categories.
    Categories,
    /// Show a product and remember it as recently viewed.
    View {
        id: String,
        /// Also list products of the same category.
        #[arg(long)]
        related: bool,
    },
    /// Recently viewed product ids, most recent first.
    Recent {
        #[arg(long)]
        clear: bool,
    },
    /// Store the token sent with every request.
    Login { token: String },
    Logout,
    /// Remap a json claims object (file or stdin) onto short names.
    Claims { file: Option<PathBuf> },
    /// Re-evaluate a list request a few times, fetching only when its dependencies change.
    Watch {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long, default_value_t = 3)]
        times: u32,
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
        /// Bump the reload key every round.
        #[arg(long)]
        reload: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    pub path: String,
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
    /// Query as json object, params are applied on top.
    #[arg(long)]
    pub query: Option<String>,
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct ProductArgs {
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long)]
    pub except: Vec<String>,
    #[arg(long, value_enum)]
    pub sort: Option<Sort>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl ProductArgs {
    pub fn to_product_query(&self, default_page_size: u32) -> ProductQuery {
        let mut query = ProductQuery::new(self.page_size.unwrap_or(default_page_size))
            .price(self.min_price, self.max_price)
            .page(self.page);
        if let Some(search) = &self.search {
            query = query.search(search);
        }
        if let Some(category) = &self.category {
            query = query.category(category);
        }
        for id in &self.except {
            query = query.except(id);
        }
        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }
        query
    }
}

/// `key=value`, values which look like numbers or booleans are typed.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {raw}"));
    }
    Ok((key.to_string(), typed(value)))
}

fn typed(raw: &str) -> Value {
    match raw {
        "true" => return Value::bool(true),
        "false" => return Value::bool(false),
        "null" => return Value::null(),
        _ => {}
    }
    // only when the text survives the round trip, `007` stays text
    if let Ok(int) = raw.parse::<i64>() {
        if int.to_string() == raw {
            return Value::int(int);
        }
    }
    if let Ok(float) = raw.parse::<f64>() {
        if float.is_finite() && float.to_string() == raw {
            return Value::float(float);
        }
    }
    Value::text(raw)
}

pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {raw}"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// Builds a query, `outer.inner` keys land in a nested dict.
pub fn query_from_params(base: Query, params: &[(String, Value)]) -> anyhow::Result<Query> {
    let mut query = base;
    for (key, value) in params {
        match key.split_once('.') {
            Some((outer, inner)) if !outer.is_empty() && !inner.is_empty() => {
                if !query.contains_key(outer) {
                    query.insert(outer, Dict::new());
                }
                match query.get_mut(outer) {
                    Some(Value::Dict(nested)) => nested.insert(inner, value.clone()),
                    _ => bail!("{outer} is already set to a value, can not nest {key} below it"),
                }
            }
            _ => query.insert(key.as_str(), value.clone()),
        }
    }
    Ok(query)
}

impl ListArgs {
    pub fn to_request(&self) -> anyhow::Result<ListRequest> {
        let base = match &self.query {
            None => Dict::new(),
            Some(json) => {
                let json: serde_json::Value =
                    serde_json::from_str(json).context("--query is not valid json")?;
                match json.as_object() {
                    Some(object) => Dict::from(object),
                    None => bail!("--query must be a json object, got {json}"),
                }
            }
        };
        let query = query_from_params(base, &self.params)?;

        let mut config = RequestConfig::new();
        for (name, value) in &self.headers {
            config = config.header(name.as_str(), value.as_str());
        }

        Ok(ListRequest::new(self.path.as_str())
            .query(query)
            .config(config))
    }
}

/// What every command runs against.
pub struct Context {
    settings: Settings,
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
}

impl Context {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let store = FileStore::open(&settings.store)
            .with_context(|| format!("could not open store {}", settings.store.display()))?;
        Self::with_store(settings, Arc::new(store))
    }

    pub fn with_store(settings: Settings, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let transport =
            HttpTransport::configured(&settings.base_url, settings.timeout(), &settings.headers)?
                .with_store(store.clone());
        Ok(Self::with_transport(settings, store, Arc::new(transport)))
    }

    pub fn with_transport(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Context {
            settings,
            store,
            transport,
        }
    }

    fn fetcher(&self) -> QueryListFetcher {
        QueryListFetcher::new(self.transport.clone(), self.settings.fetcher_options())
    }

    fn recent(&self) -> RecentlyViewed {
        RecentlyViewed::with_capacity(self.store.clone(), self.settings.recent_capacity)
    }

    async fn fetch_once(&self, request: &ListRequest) -> anyhow::Result<serde_json::Value> {
        let mut fetcher = self.fetcher();
        fetcher.fetch(request);
        match fetcher.settled().await {
            FetchState::Success(payload) => Ok(payload.unwrap_or(serde_json::Value::Null)),
            FetchState::Failure(message) => Err(anyhow!(message)),
            state => bail!("request of {} ended {}", request.path, state),
        }
    }

    pub async fn execute(&self, command: Command) -> anyhow::Result<serde_json::Value> {
        match command {
            Command::List(args) => self.fetch_once(&args.to_request()?).await,
            Command::Products(args) => {
                let query = args.to_product_query(self.settings.page_size).to_query();
                self.fetch_once(&ListRequest::new(PRODUCTS_PATH).query(query))
                    .await
            }
            Command::Categories => self.fetch_once(&ListRequest::new(CATEGORIES_PATH)).await,
            Command::View { id, related } => self.view(&id, related).await,
            Command::Recent { clear } => {
                let recent = self.recent();
                if clear {
                    recent.clear()?;
                }
                Ok(json!(recent.list()))
            }
            Command::Login { token } => {
                self.store.set(TOKEN_KEY, token)?;
                info!("token stored");
                Ok(json!({"loggedIn": true}))
            }
            Command::Logout => {
                self.store.remove(TOKEN_KEY)?;
                Ok(json!({"loggedIn": false}))
            }
            Command::Claims { file } => claims(file),
            Command::Watch {
                list,
                times,
                interval_secs,
                reload,
            } => {
                self.watch(&list.to_request()?, times, Duration::from_secs(interval_secs), reload)
                    .await
            }
        }
    }

    async fn view(&self, id: &str, related: bool) -> anyhow::Result<serde_json::Value> {
        let product = self.fetch_once(&ListRequest::new(product_path(id)?)).await?;
        self.recent().push(id)?;

        if !related {
            return Ok(product);
        }

        let category = product
            .get("categoryId")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow!("product {id} has no categoryId"))?;
        let query = ProductQuery::related(category, id, self.settings.page_size).to_query();
        let related = self
            .fetch_once(&ListRequest::new(PRODUCTS_PATH).query(query))
            .await?;

        Ok(json!({"product": product, "related": related}))
    }

    async fn watch(
        &self,
        request: &ListRequest,
        times: u32,
        interval: Duration,
        reload: bool,
    ) -> anyhow::Result<serde_json::Value> {
        let mut fetcher = self.fetcher();
        let mut rounds = vec![];

        for round in 0..times {
            let request = request
                .clone()
                .reload_key(if reload { round as u64 } else { 0 });

            let fetched = match fetcher.update(&request) {
                Some(token) => {
                    info!("round {round}: fetching {} ({token})", request.path);
                    true
                }
                None => {
                    info!("round {round}: dependencies unchanged");
                    false
                }
            };

            let state = fetcher.settled().await;
            rounds.push(json!({
                "round": round,
                "fetched": fetched,
                "state": state.to_string(),
                "payload": state.payload(),
            }));

            if round + 1 < times {
                tokio::time::sleep(interval).await;
            }
        }

        debug!("watched {} rounds", rounds.len());
        Ok(serde_json::Value::Array(rounds))
    }
}

fn claims(file: Option<PathBuf>) -> anyhow::Result<serde_json::Value> {
    let raw = match file {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;
            raw
        }
    };

    let claims: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).context("claims must be a json object")?;

    Ok(json!({
        "identity": Identity::from_claims(&claims),
        "claims": remap_claims(&claims),
    }))
}
