//! Demo command - memoizes a slow computation and calls it around its expiry

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use tracing::info;

use crate::config::{AppConfig, CacheBackend};
use crate::domain::DomainError;
use crate::domain::cache::{Cache, MemoizerFactory, TtlOptions};
use crate::infrastructure::cache::CacheFactory;
use crate::infrastructure::metrics::init_metrics;

/// Arguments for the demo command
#[derive(Args, Clone, Debug)]
pub struct DemoArgs {
    /// Cache backend (`in_memory` or `redis`), overrides config
    #[arg(long)]
    pub backend: Option<CacheBackend>,

    /// Redis URL, overrides config
    #[arg(long)]
    pub redis_url: Option<String>,

    /// How long results stay cached
    #[arg(long, default_value_t = 3000)]
    pub ttl_ms: u64,

    /// Simulated cost of each computation
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    /// Record Prometheus metrics and print them at the end
    #[arg(long)]
    pub metrics: bool,
}

/// Outcome of one call in the demo
#[derive(Debug, Clone, PartialEq)]
pub struct CallReport {
    pub result: u64,
    pub elapsed: Duration,
    /// Whether the computation ran rather than being served from cache
    pub computed: bool,
}

/// Run the demo
pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    super::init_logging(&config);

    let metrics = if args.metrics { init_metrics() } else { None };

    let mut settings = config.cache;

    if let Some(backend) = args.backend {
        settings.backend = backend;
    }

    if let Some(url) = &args.redis_url {
        settings.redis_url = url.clone();
    }

    let cache = CacheFactory::create(&settings).await?;

    println!("=== {} cache example ===", settings.backend);

    let reports = run_scenario(cache, &args).await?;
    let labels = [
        "1st call -> executing operation",
        "2nd call -> returning cached result",
        "3rd call -> executing operation",
    ];

    for (label, report) in labels.iter().zip(&reports) {
        println!(
            "{}. Result is {}. Total time: {}ms",
            label,
            report.result,
            report.elapsed.as_millis()
        );
    }

    if let Some(metrics) = metrics {
        println!("{}", metrics.render());
    }

    Ok(())
}

/// Calls `heavy_computation(2, 3)` twice, waits past the TTL, then calls it again
pub async fn run_scenario(
    cache: Arc<dyn Cache>,
    args: &DemoArgs,
) -> Result<Vec<CallReport>, DomainError> {
    let computations = Arc::new(AtomicUsize::new(0));
    let counter = computations.clone();
    let delay = Duration::from_millis(args.delay_ms);

    let heavy_computation = MemoizerFactory::new(cache)
        .memoizer(TtlOptions::from_millis(args.ttl_ms).only_if_absent())
        .wrap(
            "ExpensiveOperations",
            "heavy_computation",
            move |(a, b): (u64, u64)| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(delay).await;
                    let res = a + b;
                    info!(a, b, res, "Heavy computation");
                    Ok::<_, DomainError>(res)
                }
            },
        );

    let mut reports = Vec::with_capacity(3);

    for call in 0..3 {
        if call == 2 {
            println!("Waiting until cache expires");
            tokio::time::sleep(Duration::from_millis(args.ttl_ms + 1)).await;
        }

        let before = computations.load(Ordering::SeqCst);
        let start = Instant::now();

        let result = heavy_computation
            .call((2, 3))
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        reports.push(CallReport {
            result,
            elapsed: start.elapsed(),
            computed: computations.load(Ordering::SeqCst) > before,
        });
    }

    Ok(reports)
}
