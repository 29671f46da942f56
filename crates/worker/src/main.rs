mod config;

use anyhow::Context;
use depositor_catalog::ArticleMetaClient;
use depositor_core::xml::{MetadataRewriter, SchemaValidator, CROSSREF_NAMESPACE};
use depositor_pipeline::{
    BatchRequest, BatchRunner, DeferredSubmission, DepositPipeline, PgDepositStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{RunMode, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depositor_worker=info,depositor_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        collection = %config.collection,
        prefix = %config.prefix,
        test_mode = config.test_mode,
        credentials = config.api_user.is_some() && config.api_password.is_some(),
        "Worker starting",
    );

    // --- Schema ---
    let validator = SchemaValidator::from_file(&config.schema_path).with_context(|| {
        format!("Failed to load deposit schema {}", config.schema_path.display())
    })?;
    tracing::info!(path = %config.schema_path.display(), "Deposit schema loaded");

    // --- Database ---
    let pool = depositor_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    depositor_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    depositor_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let namespace = validator
        .target_namespace()
        .unwrap_or(CROSSREF_NAMESPACE)
        .to_string();
    let rewriter = MetadataRewriter::new(
        namespace,
        config.depositor_name.clone(),
        config.depositor_email.clone(),
    );
    let pipeline = DepositPipeline::new(
        ArticleMetaClient::new(config.articlemeta_url.clone()),
        PgDepositStore::new(pool),
        validator,
        rewriter,
        config.prefix.clone(),
    )
    .with_sink(DeferredSubmission::new(config.test_mode));
    let runner = BatchRunner::new(pipeline);

    // --- Run ---
    match &config.mode {
        RunMode::DateRange {
            issns,
            from_date,
            until_date,
        } => {
            let request = BatchRequest {
                collection: config.collection.clone(),
                issns: issns.clone(),
                from_date: *from_date,
                until_date: *until_date,
            };
            runner.run(&request).await;
        }
        RunMode::Pids(pids) => {
            runner.run_pids(&config.collection, pids).await;
        }
    }

    Ok(())
}
