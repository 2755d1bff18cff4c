use clap::{Args, Parser, Subcommand};
use cr_app::{
    AppError, AppResult, EngineSettings, RunProgressEvent, RunRequest, RunStage, config_service,
    run_service,
};
use cr_project::OutputKind;
use cr_results::{RunResult, RunSlot, UNKNOWN_VERSION, engine_version};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cr-cli")]
#[command(about = "cloudyrun CLI - configure, run and collect photoionization simulations", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for engine settings; take precedence over CLOUDYRUN_* variables.
#[derive(Args)]
struct EngineArgs {
    /// Engine installation directory
    #[arg(long, global = true)]
    install_dir: Option<PathBuf>,
    /// Engine archive URL or local path
    #[arg(long, global = true)]
    archive_url: Option<String>,
    /// Directory holding run workspaces
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,
}

impl EngineArgs {
    fn settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::from_env();
        if let Some(dir) = &self.install_dir {
            settings.install_dir = dir.clone();
        }
        if let Some(url) = &self.archive_url {
            settings.archive_source = url.clone();
        }
        if let Some(dir) = &self.work_dir {
            settings.work_root = dir.clone();
        }
        tracing::debug!("Engine settings: {settings:?}");
        settings
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file holding the defaults
    Init {
        /// Path of the new configuration YAML file
        config_path: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Print the engine script a configuration compiles to
    Script {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Normalize a two-column spectrum file
    Sed {
        /// Spectrum file (energy in Rydberg, flux)
        input: PathBuf,
        /// Write the normalized table here (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download and unpack the engine if it is not installed yet
    Install,
    /// Run a simulation
    Run {
        /// Path to the configuration YAML file
        config_path: PathBuf,
        /// Export the collected files to this directory
        #[arg(long)]
        export: Option<PathBuf>,
        /// Reuse one fixed workspace instead of a fresh directory per run
        #[arg(long)]
        shared_workspace: bool,
    },
    /// Show an exported run
    Show {
        /// Directory written by `run --export`
        export_dir: PathBuf,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing; RUST_LOG selects the level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.engine.settings();

    match cli.command {
        Commands::Init { config_path } => cmd_init(&config_path),
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Script { config_path } => cmd_script(&config_path),
        Commands::Sed { input, output } => cmd_sed(&input, output.as_deref()),
        Commands::Install => cmd_install(&settings),
        Commands::Run {
            config_path,
            export,
            shared_workspace,
        } => cmd_run(&config_path, &settings, export.as_deref(), shared_workspace),
        Commands::Show { export_dir } => cmd_show(&export_dir),
    }
}

fn cmd_init(config_path: &Path) -> AppResult<()> {
    config_service::init_config(config_path)?;
    println!("Wrote default configuration: {}", config_path.display());
    Ok(())
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = config_service::load_config(config_path)?;
    config_service::preview_script(&config)?;
    println!("✓ Configuration is valid");
    Ok(())
}

fn cmd_script(config_path: &Path) -> AppResult<()> {
    let config = config_service::load_config(config_path)?;
    let (script, outputs) = config_service::preview_script(&config)?;

    println!("{}", script);
    println!();
    println!("Expected files:");
    for (kind, name) in outputs.iter() {
        println!("  {:<20} {}", kind.label(), name);
    }
    Ok(())
}

fn cmd_sed(input: &Path, output: Option<&Path>) -> AppResult<()> {
    let (table, summary) = config_service::normalize_spectrum(input, output)?;

    match output {
        Some(path) => {
            println!("Normalized spectrum written to {}", path.display());
        }
        None => {
            print!("{}", table.to_engine_text());
        }
    }

    // summary goes to stderr so stdout stays a clean table
    eprintln!(
        "{} points, energy {:.4e} - {:.4e} Ryd ({} duplicate energies dropped)",
        summary.points, summary.energy_range.0, summary.energy_range.1, summary.duplicates_dropped
    );
    Ok(())
}

fn cmd_install(settings: &EngineSettings) -> AppResult<()> {
    println!("Checking engine in {}", settings.install_dir.display());
    let install = run_service::install_engine(settings)?;
    println!("✓ Engine ready");
    println!("  Executable: {}", install.executable().display());
    println!("  Data:       {}", install.data_dir().display());
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    settings: &EngineSettings,
    export: Option<&Path>,
    shared_workspace: bool,
) -> AppResult<()> {
    let config = config_service::load_config(config_path)?;
    println!("Running simulation: {}", config.title);

    let request = RunRequest {
        config: &config,
        settings,
        shared_workspace,
        cancel: None,
    };

    let mut slot = RunSlot::default();
    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::execute_in_slot(
        &mut slot,
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let Some(result) = slot.result() else {
        return Err(AppError::Results(format!(
            "run {} finished without a result",
            response.run_id
        )));
    };

    println!("Run {}: {}", response.run_id, result.status_label());
    println!("  Engine:    {}", response.engine_version());
    println!("  Workspace: {}", response.workspace.display());
    print_files(result);
    print_timing_summary(&response.timing);

    if let Some(dir) = export {
        let written = run_service::export_response(dir, &response)?;
        println!("\nExported {} files to {}", written.len(), dir.display());
    }

    if !result.success {
        print_diagnostics(result);
        return Err(AppError::Engine(format!(
            "run {} {}",
            response.run_id,
            result.status_label().to_lowercase()
        )));
    }

    Ok(())
}

fn cmd_show(export_dir: &Path) -> AppResult<()> {
    let slot = RunSlot::restore(export_dir);
    let Some(result) = slot.result() else {
        println!("No complete run export in {}", export_dir.display());
        return Ok(());
    };

    let (manifest, _) = run_service::load_export(export_dir)?;
    println!("Run {}: {}", result.run_id, result.status_label());
    println!("  Recorded:    {}", manifest.timestamp);
    println!(
        "  Engine:      {}",
        result
            .main_output()
            .and_then(engine_version)
            .unwrap_or(UNKNOWN_VERSION)
    );
    println!("  Fingerprint: {}", manifest.fingerprint);
    println!("  Elapsed:     {:.1}s", result.elapsed_s);
    print_files(result);

    if !result.success {
        print_diagnostics(result);
    }
    Ok(())
}

fn print_files(result: &RunResult) {
    println!("\nFiles:");
    for kind in OutputKind::ALL {
        if let Some(text) = result.file(kind) {
            println!(
                "  {:<20} {:>8} lines",
                kind.label(),
                text.lines().count()
            );
        }
    }
}

fn print_diagnostics(result: &RunResult) {
    println!("\nEngine log:");
    match result.log() {
        Some(log) if !log.trim().is_empty() => {
            for line in log.lines() {
                println!("  {}", line);
            }
        }
        _ => println!("  (empty)"),
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.engine) {
        (RunStage::RunningEngine, Some(engine)) => {
            let width = 28usize;
            let head = (engine.pulse_pct as usize * width / 100).min(width - 1);
            let bar: String = (0..width)
                .map(|i| if i == head { '#' } else { '-' })
                .collect();
            print!(
                "\r[{}] {}  engine={}s  elapsed={:.1}s",
                bar,
                event.stage.label(),
                engine.elapsed_s,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_timing_summary(timing: &cr_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    println!("\nTiming summary:");
    println!(
        "  Provision: {:.3}s ({:.1}%)",
        timing.provision_time_s,
        pct(timing.provision_time_s)
    );
    if timing.spectrum_time_s > 0.0 {
        println!(
            "  Spectrum:  {:.3}s ({:.1}%)",
            timing.spectrum_time_s,
            pct(timing.spectrum_time_s)
        );
    }
    println!(
        "  Compile:   {:.3}s ({:.1}%)",
        timing.compile_time_s,
        pct(timing.compile_time_s)
    );
    println!(
        "  Engine:    {:.3}s ({:.1}%)",
        timing.engine_time_s,
        pct(timing.engine_time_s)
    );
    println!(
        "  Collect:   {:.3}s ({:.1}%)",
        timing.collect_time_s,
        pct(timing.collect_time_s)
    );
    println!("  Total:     {:.3}s", timing.total_time_s);
}
