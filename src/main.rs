use clap::Parser;
use risk_etl::utils::error::ErrorSeverity;
use risk_etl::utils::{logger, validation::Validate};
use risk_etl::{CliConfig, CsvRiskPipeline, EtlEngine, LocalStorage, RiskConfig};

fn main() {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting risk-etl");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match RiskConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = args
        .apply_overrides(&mut config)
        .and_then(|_| config.validate())
    {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No data will be read");
        return;
    }

    let storage = LocalStorage::new(String::new());
    let result = CsvRiskPipeline::new(storage, config)
        .and_then(|pipeline| EtlEngine::new(pipeline).run());

    match result {
        Ok(report_path) => {
            match std::fs::read_to_string(&report_path) {
                Ok(report) => print!("{}", report),
                Err(e) => tracing::warn!("Could not echo report: {}", e),
            }
            println!("📁 Report saved to: {}", report_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Risk analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            if let Some(record) = e.record_id() {
                tracing::error!("Offending record: {}", record);
            }

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

fn display_config_summary(config: &RiskConfig, args: &CliConfig) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Formula: {}", config.formula().display_name());
    println!("  Input: {}", config.data.input_file);
    println!("  Output: {}", config.output.path);

    // validate() already built the table once
    if let Ok(table) = config.threshold_table() {
        println!("  Risk tiers:");
        for tier in table.tiers() {
            println!(
                "    [{}, {}) {}{}",
                tier.lower,
                tier.upper,
                tier.label,
                if tier.priority { " *priority*" } else { "" }
            );
        }
        println!("  High risk from: {}", table.high_risk_from());
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
