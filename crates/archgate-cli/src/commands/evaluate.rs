use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use archgate_cache::{ArchCache, ArchCacheConfig};
use archgate_core::{ArchgateConfig, MachineDescriptor, WorkloadDescriptor};
use archgate_scheduler::{
    ArchFilter, ArchLookup, DecisionContext, Evaluation, Framework, RawArgs, StaticNodeLister,
    WeightArgs,
};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::info;

pub async fn evaluate(
    config: &ArchgateConfig,
    workload_path: &Path,
    nodes_path: &Path,
    args_path: Option<&Path>,
    format: &str,
) -> anyhow::Result<()> {
    let workload: WorkloadDescriptor = read_json(workload_path)?;
    let nodes: Vec<MachineDescriptor> = read_json(nodes_path)?;

    let cache = Arc::new(ArchCache::new(ArchCacheConfig {
        ttl: config.cache_ttl()?,
    }));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if let Some(interval) = config.sweep_interval()? {
        let sweeper = cache.clone();
        tokio::spawn(async move { sweeper.run_sweeper(interval, shutdown_rx).await });
    }

    let resolver = Arc::new(super::build_resolver(config)?);
    let lookup = ArchLookup::new(cache.clone(), resolver);
    let lister = Arc::new(StaticNodeLister::new(nodes.clone()));
    let plugin = Arc::new(match args_path {
        Some(path) => {
            let args = read_args(path)?;
            ArchFilter::new(Some(&args), lister, lookup)
                .with_context(|| format!("decoding plugin args {}", path.display()))?
        }
        None => ArchFilter::with_weights(WeightArgs::new(config.weights.clone()), lister, lookup),
    });

    let framework = Framework::new()
        .with_filter(plugin.clone())
        .with_score(plugin, 1);

    let ctx = DecisionContext::with_timeout(config.resolve_timeout()?);
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling evaluation");
            canceller.cancel();
        }
    });

    let evaluation = framework.evaluate(&ctx, &workload, &nodes).await;
    let _ = shutdown_tx.send(true);

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        "arch cache stats"
    );

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        _ => print!("{}", format_evaluation(&workload, &evaluation)),
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&content).with_context(|| format!("parsing {}", path.display()))
}

fn read_args(path: &Path) -> anyhow::Result<RawArgs> {
    let content =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    Ok(if yaml {
        RawArgs::yaml(content)
    } else {
        RawArgs::json(content)
    })
}

fn format_evaluation(workload: &WorkloadDescriptor, evaluation: &Evaluation) -> String {
    let mut out = format!("workload {}\n", workload.key());
    if evaluation.ranked.is_empty() {
        out.push_str("  no schedulable nodes\n");
    }
    for (rank, node) in evaluation.ranked.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<24} {:<10} score {}\n",
            rank + 1,
            node.node,
            node.architecture,
            node.score
        ));
    }
    for rejection in &evaluation.rejected {
        out.push_str(&format!(
            "   ✗ {:<24} {}\n",
            rejection.node, rejection.status
        ));
    }
    out
}
