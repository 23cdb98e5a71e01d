use std::sync::Arc;
use std::time::Duration;

use common::{TraceId, child_span, root_span};
use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, warn};

use super::CycleSettings;
use super::ingest::{SourceOutcome, ingest_source};
use super::snapshot::{CycleSnapshot, CycleStatus, SourceStatus};
use crate::config::AppConfig;
use crate::error::CycleTimeout;
use crate::history::{HistoryRecord, HistoryStore, UpsertSummary};
use crate::market::{FxQuote, MetalQuote, MetalSource};
use crate::metrics::Counters;
use crate::pricing::{CompositeOutcome, CompositePricer, QuoteUnit};
use crate::resolve::ColumnResolver;
use crate::source::{Fetcher, SourceConfig};
use crate::time;

/// Order in which pricing bases are tried when choosing what to record.
const RECORDING_ORDER: [MetalSource; 2] = [MetalSource::Lme, MetalSource::Westmetall];

/// One ingestion cycle: fetch every source concurrently, join, price,
/// record. Holds no state between cycles apart from counters.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    sources: Arc<Vec<SourceConfig>>,
    resolver: ColumnResolver,
    pricer: CompositePricer,
    store: Option<HistoryStore>,
    settings: Arc<CycleSettings>,
    counters: Counters,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sources: Vec<SourceConfig>,
        resolver: ColumnResolver,
        pricer: CompositePricer,
    ) -> Self {
        Self {
            fetcher,
            sources: Arc::new(sources),
            resolver,
            pricer,
            store: None,
            settings: Arc::new(CycleSettings::default()),
            counters: Counters::default(),
        }
    }

    pub fn from_config(cfg: &AppConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let resolver = ColumnResolver::new(Arc::new(cfg.vocabulary.clone()));
        Self::new(
            fetcher,
            cfg.sources.clone(),
            resolver,
            CompositePricer::new(cfg.formulas.clone()),
        )
        .with_settings(CycleSettings::from(cfg))
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_settings(mut self, settings: CycleSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub async fn run_cycle(&self) -> CycleSnapshot {
        let trace_id = TraceId::new();
        let span = root_span("ingestion_cycle", &trace_id);
        self.cycle(trace_id).instrument(span).await
    }

    /// Like [`Pipeline::run_cycle`], but gives up after `deadline`.
    ///
    /// Dropping the cycle aborts every in-flight fetch; an uncommitted
    /// history batch is rolled back with its transaction.
    pub async fn run_cycle_with_timeout(&self, deadline: Duration) -> Result<CycleSnapshot, CycleTimeout> {
        match tokio::time::timeout(deadline, self.run_cycle()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(_) => {
                Counters::bump(&self.counters.cycles_timed_out, 1);
                warn!(deadline_ms = deadline.as_millis() as u64, "ingestion cycle abandoned");
                Err(CycleTimeout(deadline))
            }
        }
    }

    async fn cycle(&self, trace_id: TraceId) -> CycleSnapshot {
        let started_at = time::now();
        info!(sources = self.sources.len(), "ingestion cycle started");

        let outcomes = self.fetch_all().await;

        let mut sources = Vec::with_capacity(outcomes.len());
        let mut metal_quotes: Vec<MetalQuote> = Vec::new();
        let mut fx_quotes: Vec<FxQuote> = Vec::new();
        for o in outcomes {
            if !o.status.ok {
                Counters::bump(&self.counters.source_failures, 1);
            }
            if o.parse_failed {
                Counters::bump(&self.counters.parse_failures, 1);
            }
            Counters::bump(&self.counters.validation_rejections, o.rejected as u64);
            metal_quotes.extend(o.metal_quotes);
            fx_quotes.extend(o.fx_quotes);
            sources.push(o.status);
        }

        let ok = sources.iter().filter(|s| s.ok).count();
        let status = CycleStatus::from_counts(ok, sources.len());

        let mid_rate = self.mid_rate(&fx_quotes);
        let composites = self.price_all(&metal_quotes, mid_rate);
        let unavailable = composites.iter().filter(|c| c.available().is_none()).count();
        Counters::bump(&self.counters.composites_unavailable, unavailable as u64);

        let (recorded, history_error) = if status == CycleStatus::AllSourcesFailed {
            (None, None)
        } else {
            self.record(&composites, &metal_quotes).await
        };

        Counters::bump(&self.counters.cycles, 1);
        if status == CycleStatus::AllSourcesFailed {
            Counters::bump(&self.counters.cycles_all_failed, 1);
            error!(sources = sources.len(), "all sources failed this cycle");
        }

        let snapshot = CycleSnapshot {
            trace_id: *trace_id.as_uuid(),
            started_at,
            finished_at: time::now(),
            sources,
            metal_quotes,
            fx_quotes,
            mid_rate,
            composites,
            status,
            recorded,
            history_error,
        };

        info!(
            status = ?snapshot.status,
            sources_ok = ok,
            metal_quotes = snapshot.metal_quotes.len(),
            fx_quotes = snapshot.fx_quotes.len(),
            composites_available = snapshot.available_composites(),
            "ingestion cycle finished"
        );
        snapshot
    }

    /// Join point: one task per source, all awaited before pricing.
    async fn fetch_all(&self) -> Vec<SourceOutcome> {
        let mut set = JoinSet::new();
        for (idx, source) in self.sources.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let source = source.clone();
            let resolver = self.resolver.clone();
            let settings = Arc::clone(&self.settings);

            set.spawn(
                async move {
                    let out = ingest_source(fetcher.as_ref(), &source, &resolver, &settings).await;
                    (idx, out)
                }
                .instrument(child_span("ingest_source")),
            );
        }

        let mut slots: Vec<Option<SourceOutcome>> = (0..self.sources.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, out)) => slots[idx] = Some(out),
                Err(e) => error!(error = %e, "source task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(self.sources.iter())
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| SourceOutcome {
                    status: SourceStatus::failed(&source.name, source.kind, "task aborted"),
                    metal_quotes: Vec::new(),
                    fx_quotes: Vec::new(),
                    rejected: 0,
                    parse_failed: false,
                })
            })
            .collect()
    }

    fn mid_rate(&self, fx: &[FxQuote]) -> Option<Decimal> {
        let code = &self.settings.pricing_currency;
        let found = fx.iter().find(|q| &q.currency_code == code).map(|q| q.mid_rate);
        if found.is_none() {
            warn!(currency = %code, "mid rate unavailable");
        }
        found
    }

    /// Composites per basis that produced quotes; the live basis is always
    /// reported so consumers see why it is missing.
    fn price_all(&self, quotes: &[MetalQuote], mid_rate: Option<Decimal>) -> Vec<CompositeOutcome> {
        let computed_at = time::now();
        let mut bases: Vec<MetalSource> = RECORDING_ORDER
            .into_iter()
            .filter(|b| quotes.iter().any(|q| q.source == *b))
            .collect();
        if bases.is_empty() {
            bases.push(MetalSource::Lme);
        }

        bases
            .into_iter()
            .flat_map(|b| self.pricer.price(quotes, b, mid_rate, computed_at))
            .collect()
    }

    async fn record(
        &self,
        composites: &[CompositeOutcome],
        quotes: &[MetalQuote],
    ) -> (Option<UpsertSummary>, Option<String>) {
        let Some(store) = &self.store else {
            return (None, None);
        };
        let records = self.history_records(composites, quotes);
        if records.is_empty() {
            info!("no available composites; history untouched");
            return (None, None);
        }

        match store.upsert_batch(&records).await {
            Ok(summary) => {
                Counters::bump(&self.counters.history_inserted, summary.inserted as u64);
                Counters::bump(&self.counters.history_replaced, summary.replaced as u64);
                (Some(summary), None)
            }
            Err(e) => {
                Counters::bump(&self.counters.history_write_failures, 1);
                error!(error = ?e, "history write failed");
                (None, Some(format!("{e:#}")))
            }
        }
    }

    /// Rows for the first basis, in [`RECORDING_ORDER`], with any available
    /// composite. Dated by the source's published date when known.
    fn history_records(&self, composites: &[CompositeOutcome], quotes: &[MetalQuote]) -> Vec<HistoryRecord> {
        let Some(basis) = RECORDING_ORDER
            .into_iter()
            .find(|b| composites.iter().any(|c| c.basis_source() == *b && c.available().is_some()))
        else {
            return Vec::new();
        };

        let date = quotes
            .iter()
            .filter(|q| q.source == basis)
            .find_map(|q| q.as_of)
            .unwrap_or_else(time::today_local);

        composites
            .iter()
            .filter_map(CompositeOutcome::available)
            .filter(|p| p.basis.source == basis)
            .map(|p| HistoryRecord {
                date,
                item: p.history_item.clone(),
                price: p.quoted_price.round_dp(2),
                currency: match p.quote_unit {
                    QuoteUnit::LocalPerKg => self.settings.local_currency.clone(),
                    QuoteUnit::UsdPerTon => "USD".to_string(),
                },
                source: basis.as_str().to_string(),
            })
            .collect()
    }
}
