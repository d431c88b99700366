use clap::Parser;
use ddp_launch::core::report::{save_report, summarize};
use ddp_launch::domain::model::SearchOutcome;
use ddp_launch::utils::{logger, validation::validate_path, validation::Validate};
use ddp_launch::{
    resolve_plan, AutoConfirm, CliConfig, DryRunLauncher, EnvSnapshot, LaunchFile, LaunchPlan,
    PortSearch, ProcessLauncher, Result, StdinConfirm,
};
use std::io::IsTerminal;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose, config.log_format);

    tracing::info!("Starting ddp-launch");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let exit_code = match run(&config).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!(
                "❌ Launch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run(config: &CliConfig) -> Result<SearchOutcome> {
    // 載入 TOML 配置
    let file = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            Some(LaunchFile::from_file(path)?)
        }
        None => None,
    };

    let env = EnvSnapshot::from_process();
    let mut plan = resolve_plan(file.as_ref(), &env, &config.overrides())?;
    plan.validate()?;

    if let Some(report) = &config.report {
        validate_path("report", &report.to_string_lossy())?;
    }

    let interactive = std::io::stdin().is_terminal();
    let policy = plan.prompt_policy.for_terminal(interactive);
    if policy != plan.prompt_policy {
        tracing::info!("stdin is not a terminal, failed ports will be retried without asking");
    }
    plan.prompt_policy = policy;

    display_plan_summary(&plan, config.dry_run);

    let outcome = if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be launched");
        let mut search = PortSearch::new(DryRunLauncher::new(), AutoConfirm::new(true));
        search.run(&plan).await?
    } else {
        let mut search = PortSearch::new(ProcessLauncher::new(), StdinConfirm::new());
        search.run(&plan).await?
    };

    println!("{}", summarize(&outcome));

    if let Some(report) = &config.report {
        if save_report(&outcome, report) {
            println!("📁 Report saved to: {}", report.display());
        }
    }

    Ok(outcome)
}

fn display_plan_summary(plan: &LaunchPlan, dry_run: bool) {
    println!("📋 Launch Plan:");
    println!("  Launcher: {}", plan.launcher.join(" "));
    println!("  Entry: {}", plan.entry);
    println!(
        "  Devices: {} ({} process(es) per node)",
        plan.devices,
        plan.nproc_per_node()
    );
    println!("  OMP_NUM_THREADS: {}", plan.omp_num_threads);
    println!("  Ports: {} ({} candidates)", plan.ports, plan.ports.len());
    println!("  Prompt: {:?}", plan.prompt_policy);

    if plan.skip_busy_ports {
        println!("  Busy ports are skipped before launching");
    }
    if !plan.params.is_empty() {
        println!("  Params: {}", plan.params.join(" "));
    }
    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
