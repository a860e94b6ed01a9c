//! Shared fixtures for integration tests
#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use parking_lot::Mutex;
use statedash::cache::{CacheClient, InMemoryCacheTier, NodeConnector, TopologyError};
use statedash::{
    CacheTopology, CellValue, Dialect, FailurePolicy, FetchOrchestrator, NameResolver, PanelId,
    QueryEngine, QueryError, ResultCache, Table,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TTL: Duration = Duration::from_secs(3600);
pub const RESYNC: Duration = Duration::from_secs(10);

pub fn node(last: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last], 11211))
}

/// Panel a query belongs to, judged by the dataset it reads
pub fn panel_of(query: &str) -> Option<PanelId> {
    if query.contains("epa_historical_air_quality") {
        Some(PanelId::Air)
    } else if query.contains("noaa_gsod") {
        Some(PanelId::Temperature)
    } else if query.contains("census_bureau_usa") {
        Some(PanelId::Population)
    } else if query.contains("ghcn_d") {
        Some(PanelId::Precipitation)
    } else {
        None
    }
}

/// Query engine that answers every panel with a small fixed table
///
/// Counts executions per panel, can delay every answer, and can be told to
/// fail a given panel.
#[derive(Default)]
pub struct StubEngine {
    delay: Mutex<Duration>,
    failing: Mutex<HashMap<PanelId, QueryError>>,
    calls: Mutex<HashMap<PanelId, usize>>,
    total: AtomicUsize,
}

impl StubEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        let engine = Self::new();
        *engine.delay.lock() = delay;
        engine
    }

    pub fn fail(&self, panel: PanelId, error: QueryError) {
        self.failing.lock().insert(panel, error);
    }

    pub fn recover(&self, panel: PanelId) {
        self.failing.lock().remove(&panel);
    }

    pub fn calls(&self, panel: PanelId) -> usize {
        self.calls.lock().get(&panel).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for StubEngine {
    async fn execute(&self, query: &str, _dialect: Dialect) -> Result<Table, QueryError> {
        let panel = panel_of(query).ok_or_else(|| QueryError::Malformed(query.to_string()))?;
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(panel).or_default() += 1;

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failing.lock().get(&panel).cloned() {
            return Err(error);
        }
        Ok(raw_table(panel, query))
    }
}

/// The raw engine answer for `panel`; the state code is read back out of
/// the query so different selections give different data
pub fn raw_table(panel: PanelId, query: &str) -> Table {
    let code = state_code_in(query).unwrap_or("??").to_string();
    match panel {
        PanelId::Air => Table::from_rows(
            ["year", "pm10", "pm25_frm", "pm25_nonfrm", "lead"],
            vec![
                vec![2014i64.into(), 24.1f64.into(), 10.2f64.into(), 9.8f64.into(), 1.4f64.into()],
                vec![2015i64.into(), 22.7f64.into(), 9.9f64.into(), 9.1f64.into(), 1.1f64.into()],
            ],
        ),
        PanelId::Temperature => Table::from_rows(
            ["year", "month", "day", "max_temp", "min_temp", "avg_temp", "state"],
            vec![
                vec![
                    "2016".into(),
                    "02".into(),
                    "01".into(),
                    64.9f64.into(),
                    41.0f64.into(),
                    52.3f64.into(),
                    code.clone().into(),
                ],
                vec![
                    "2016".into(),
                    "01".into(),
                    "31".into(),
                    61.0f64.into(),
                    39.9f64.into(),
                    50.0f64.into(),
                    code.into(),
                ],
            ],
        ),
        PanelId::Population => Table::from_rows(
            ["zipcode", "population", "city", "state_code"],
            vec![
                vec!["90011".into(), 103_892i64.into(), "Los Angeles".into(), code.clone().into()],
                vec!["90650".into(), 105_549i64.into(), "Norwalk".into(), code.into()],
            ],
        ),
        PanelId::Precipitation => Table::from_rows(
            ["year", "month", "day", "prcp"],
            vec![
                vec![2016i64.into(), 1i64.into(), 5i64.into(), 12.5f64.into()],
                vec![2016i64.into(), 1i64.into(), 6i64.into(), CellValue::Null],
            ],
        ),
    }
    .expect("fixture tables are rectangular")
}

fn state_code_in(query: &str) -> Option<&str> {
    for marker in ["state_code = '", "state = '"] {
        if let Some(start) = query.find(marker) {
            let rest = &query[start + marker.len()..];
            return rest.split('\'').next();
        }
    }
    None
}

/// Resolver whose answer can be changed, or made to fail, between calls
pub struct ScriptedResolver {
    answer: Mutex<Result<Vec<SocketAddr>, String>>,
    lookups: AtomicUsize,
}

impl ScriptedResolver {
    pub fn with_nodes(nodes: Vec<SocketAddr>) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(nodes)),
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn set_nodes(&self, nodes: Vec<SocketAddr>) {
        *self.answer.lock() = Ok(nodes);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.answer.lock() = Err(reason.to_string());
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for ScriptedResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, TopologyError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .clone()
            .map_err(|reason| TopologyError::ResolutionFailed {
                host: host.to_string(),
                port,
                reason,
            })
    }
}

/// Full fetch stack over an in-memory cache tier
pub struct Harness {
    pub tier: Arc<InMemoryCacheTier>,
    pub resolver: Arc<ScriptedResolver>,
    pub engine: Arc<StubEngine>,
    pub cache: ResultCache,
    pub orchestrator: FetchOrchestrator,
}

impl Harness {
    pub fn new(nodes: Vec<SocketAddr>, policy: FailurePolicy) -> Self {
        Self::with_engine(nodes, policy, StubEngine::new())
    }

    pub fn with_engine(nodes: Vec<SocketAddr>, policy: FailurePolicy, engine: Arc<StubEngine>) -> Self {
        let tier = InMemoryCacheTier::new();
        let resolver = ScriptedResolver::with_nodes(nodes);
        let topology = Arc::new(CacheTopology::new(
            "memcached.test.svc",
            11211,
            RESYNC,
            resolver.clone(),
        ));
        let client = CacheClient::new(topology, NodeConnector::InMemory(tier.clone()), None);
        let cache = ResultCache::new(Arc::new(client), TTL);
        let orchestrator = FetchOrchestrator::new(
            cache.clone(),
            engine.clone(),
            Some(Duration::from_secs(120)),
            policy,
        );
        Self {
            tier,
            resolver,
            engine,
            cache,
            orchestrator,
        }
    }
}
