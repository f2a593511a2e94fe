use anyhow::bail;
use archgate_core::ArchgateConfig;
use archgate_registry::Resolver;
use archgate_scheduler::DecisionContext;
use serde::Serialize;

#[derive(Serialize)]
struct ResolveOutcome {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    architectures: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn resolve(config: &ArchgateConfig, images: &[String], format: &str) -> anyhow::Result<()> {
    let resolver = super::build_resolver(config)?;
    let timeout = config.resolve_timeout()?;

    let mut outcomes = Vec::with_capacity(images.len());
    for image in images {
        let ctx = DecisionContext::with_timeout(timeout);
        let outcome = match ctx.run(resolver.resolve(image)).await {
            Ok(architectures) => ResolveOutcome {
                image: image.clone(),
                architectures: Some(architectures),
                error: None,
            },
            Err(e) => ResolveOutcome {
                image: image.clone(),
                architectures: None,
                error: Some(e.to_string()),
            },
        };
        outcomes.push(outcome);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        _ => {
            for outcome in &outcomes {
                match (&outcome.architectures, &outcome.error) {
                    (Some(archs), _) if archs.is_empty() => {
                        println!("{}\t(no platforms)", outcome.image)
                    }
                    (Some(archs), _) => println!("{}\t{}", outcome.image, archs.join(", ")),
                    (None, Some(error)) => println!("{}\terror: {error}", outcome.image),
                    (None, None) => {}
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        bail!("{failed} of {} images failed to resolve", outcomes.len());
    }
    Ok(())
}
