use clap::Parser;
use permit_watch::core::exporter::summary_json;
use permit_watch::core::ConfigProvider;
use permit_watch::utils::error::ErrorSeverity;
use permit_watch::utils::{chart, logger, validation::Validate};
use permit_watch::{CliConfig, EtlEngine, LocalStorage, PermitPipeline, RunConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting permit-watch");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let dry_run = cli.dry_run;
    let today = chrono::Local::now().date_naive();
    let config = match cli.into_run_config(today) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);
    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        return Ok(());
    }

    let source = LocalStorage::new(".".to_string());
    let output_path = config.output_path().to_string();
    let sink = LocalStorage::new(output_path.clone());
    let title = config.settings.report.title.clone();
    let engine = EtlEngine::new(PermitPipeline::new(source, sink, config));

    match engine.run().await {
        Ok(outcome) => {
            println!("📊 {}", title);
            for row in outcome.summary.rows() {
                println!("  {:<12} {:>6} {:>6}", row.region, row.started, row.upcoming);
            }
            if !outcome.summary.skipped_rows.is_empty() {
                println!(
                    "  ⚠️ rows without start address: {:?}",
                    outcome.summary.skipped_rows
                );
            }
            println!();
            print!("{}", chart::render_bar_chart(&outcome.summary));
            tracing::debug!("Summary JSON: {}", summary_json(&outcome.summary)?);

            println!();
            println!("✅ Report completed successfully!");
            for file in &outcome.files {
                println!("📁 {}/{}", output_path, file);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed in {} stage: {} (Category: {:?}, Severity: {:?})",
                e.stage(),
                e,
                e.category(),
                e.severity()
            );

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依錯誤嚴重程度決定退出碼
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

    Ok(())
}

fn display_config_summary(config: &RunConfig) {
    let settings = &config.settings;
    println!("📋 Configuration Summary:");
    println!("  Input: {} ({:?})", config.input_path, settings.input.format);
    if let Some(sheet) = &settings.input.sheet {
        println!("  Sheet: {}", sheet);
    }
    println!("  Reference date: {}", config.today);
    println!("  Exclude (공사명): {}", settings.filter.exclude.join(", "));
    println!("  Include (광케이블): {}", settings.filter.include.join(", "));
    if !settings.filter.name_include.is_empty() {
        println!("  Include (공사명): {}", settings.filter.name_include.join(", "));
    }
    println!("  Address policy: {:?}", settings.aggregate.address_policy);
    println!(
        "  Output: {} ({})",
        config.output_path,
        settings.output.format.extension()
    );
    if settings.output.bundle {
        println!("  Bundle: {}", settings.output.bundle_file);
    }
    println!();
}
