use clap::Parser;
use json_mapping_etl::core::Pipeline;
use json_mapping_etl::utils::error::ErrorSeverity;
use json_mapping_etl::utils::{logger, validation::Validate};
use json_mapping_etl::{
    CliConfig, DataTransformer, EtlEngine, EtlError, JobConfig, JsonMappingStore, LocalStorage,
    MappingPipeline,
};

fn exit_with(e: &EtlError) -> ! {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

fn load_job(cli: &CliConfig) -> json_mapping_etl::Result<(JobConfig, JsonMappingStore)> {
    let mut job = JobConfig::from_file(&cli.config)?;
    cli.apply_overrides(&mut job);
    job.validate()?;

    let store = match &job.mapping.config_file {
        Some(path) => JsonMappingStore::from_file(path)?,
        None => JsonMappingStore::default(),
    };
    Ok((job, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting json-mapping-etl CLI");
    tracing::debug!("CLI config: {:?}", cli);

    let (job, store) = match load_job(&cli) {
        Ok(loaded) => loaded,
        Err(e) => exit_with(&e),
    };
    let policy = match job.coercion_policy() {
        Ok(policy) => policy,
        Err(e) => exit_with(&e),
    };

    let transformer = DataTransformer::new(store)
        .with_context(job.function_context())
        .with_policy(policy);
    let sink = LocalStorage::new(&job.load.output_path);
    let pipeline = MappingPipeline::new(LocalStorage::new("."), sink, job, transformer);

    if cli.dry_run {
        let outcome: json_mapping_etl::Result<_> = async {
            let payload = pipeline.extract().await?;
            pipeline.transform(payload).await
        }
        .await;

        match outcome {
            Ok(result) => {
                println!("{}", serde_json::to_string_pretty(&result.report)?);
                println!(
                    "🔎 Dry run: {} records would be written for job '{}'",
                    result.processed_records.len(),
                    pipeline.job().job.name
                );
            }
            Err(e) => exit_with(&e),
        }
        return Ok(());
    }

    let engine = EtlEngine::new(pipeline);
    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}
