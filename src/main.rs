use blob_lister::adapters::azure::default_endpoint;
use blob_lister::core::ContainerRef;
use blob_lister::utils::{logger, validation::Validate};
use blob_lister::{AppConfig, AppError, CliArgs, RunOptions, RunReport, Runner};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting blob-lister");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入並驗證 YAML 配置
    let config = match AppConfig::from_file(&args.config).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            let e = AppError::from(e);
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No listing requests will be sent");
        perform_dry_run(&config);
        return Ok(());
    }

    let runner = Runner::with_options(
        config,
        RunOptions {
            fail_fast: args.fail_fast,
        },
    );
    let report = runner.run().await;

    display_report(&report);

    let exit_code = report.exit_code();
    if exit_code > 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(empty)".to_string()
    } else {
        format!("******** ({} chars)", secret.chars().count())
    }
}

fn display_config_summary(config: &AppConfig) {
    println!("📋 Configuration Summary:");
    println!("  Logfile Storage Directory: {}", config.global.logfile_directory);
    println!(
        "  Sendgrid API Key: {}",
        mask_secret(&config.global.sendgrid_api_key)
    );
    println!("  To Mail Addresses: {:?}", config.global.to_mail);

    for (idx, account) in config.storage_accounts.iter().enumerate() {
        println!("\nStorage Account {}:", idx + 1);
        println!("  Account Name: {}", account.storage_account_name);
        println!("  Tenant ID: {}", account.tenant_id);
        println!("  Client ID: {}", account.client_id);
        println!("  Client Secret: {}", mask_secret(&account.client_secret));
        println!("  Download Path: {}", account.dl_path);
    }
    println!();
}

fn perform_dry_run(config: &AppConfig) {
    println!("🔍 Dry Run - Listing Plan:");

    for account in &config.storage_accounts {
        let endpoint = account
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&account.storage_account_name));

        match ContainerRef::for_account(&account.storage_account_name) {
            Ok(container) => println!(
                "  {} → container '{}' at {}",
                account.storage_account_name,
                container.container_name(),
                endpoint
            ),
            Err(e) => println!("  {} → skipped: {}", account.storage_account_name, e),
        }
    }
}

fn display_report(report: &RunReport) {
    println!("\n📊 Summary:");
    for outcome in &report.outcomes {
        match outcome.failure_message() {
            None => println!("  ✅ {}: {} blob(s)", outcome.account, outcome.blob_count()),
            Some(message) => println!(
                "  ❌ {}: {} blob(s) before failure - {}",
                outcome.account,
                outcome.blob_count(),
                message
            ),
        }
    }
    println!(
        "  {} succeeded, {} failed, {} blob(s) listed",
        report.succeeded(),
        report.failed(),
        report.total_blobs()
    );
}
