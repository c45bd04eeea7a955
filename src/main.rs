//! EmoCollab agent CLI
//!
//! Presence heuristics, mock stress analysis and the dashboard API.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use emocollab::{
    activity::create_shared_log_with_persistence,
    capture::{CaptureSession, DeviceBehavior, FramePattern, SyntheticCamera},
    config::Config,
    core::{source_from_config, AnalysisResult, DetectionLoop, PresencePolicy, ScanWorkflow},
    SCAN_NOTICE, VERSION,
};

#[cfg(feature = "client")]
use emocollab::client::{AnalysisClientConfig, BlockingAnalysisClient};

#[derive(Parser)]
#[command(name = "emocollab")]
#[command(author = "EmoCollab")]
#[command(version = VERSION)]
#[command(about = "Presence heuristics and mock stress analysis for EmoCollab", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mock analysis and chat API
    Serve {
        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Artificial analysis delay in milliseconds (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Run one scan against the synthetic camera
    Scan {
        /// Frame pattern: black, gray, skin, noise or "r,g,b"
        #[arg(long, default_value = "gray")]
        pattern: String,

        /// Presence policy: brightness or skin
        #[arg(long)]
        policy: Option<String>,

        /// Simulated device failure: deny, missing or busy
        #[arg(long)]
        device: Option<String>,

        /// Use a random presence draw instead of the frame heuristic
        #[arg(long)]
        random_presence: bool,

        /// Send the frame to a remote analysis endpoint instead
        #[arg(long)]
        remote: Option<String>,

        /// Bearer key for the remote endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll presence continuously until Ctrl+C
    Watch {
        /// Frame pattern: black, gray, skin, noise or "r,g,b"
        #[arg(long, default_value = "gray")]
        pattern: String,

        /// Presence policy: brightness or skin
        #[arg(long)]
        policy: Option<String>,

        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Show configuration and activity counts
    Status,

    /// Show configuration
    Config,

    /// Display what the scan does and does not do
    Notice,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, delay_ms } => {
            cmd_serve(port, delay_ms);
        }
        Commands::Scan {
            pattern,
            policy,
            device,
            random_presence,
            remote,
            api_key,
            json,
        } => {
            let options = ScanOptions {
                pattern,
                policy,
                device,
                random_presence,
                remote,
                api_key,
                json,
            };
            cmd_scan(options);
        }
        Commands::Watch {
            pattern,
            policy,
            interval_ms,
        } => {
            cmd_watch(&pattern, policy.as_deref(), interval_ms);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Notice => {
            cmd_notice();
        }
    }
}

/// Install the log subscriber. `RUST_LOG` wins over the `info` default.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>, delay_ms: Option<u64>) {
    use emocollab::server::{run, ServerConfig};

    let config = load_config();
    let activity = create_shared_log_with_persistence(config.activity_path());

    let mut server_config = ServerConfig::from_config(&config).with_activity_log(activity.clone());
    if let Some(port) = port {
        server_config.port = port;
    }
    if let Some(delay) = delay_ms {
        server_config.analysis_delay = Duration::from_millis(delay);
    }

    println!("EmoCollab Agent v{VERSION}");
    println!();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error creating runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let (addr, shutdown_tx) = match run(server_config).await {
            Ok(bound) => bound,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("Listening on http://{addr}");
        println!("  POST /api/analyze-face");
        println!("  POST /api/face/analyze");
        println!("  GET  /api/contacts");
        println!("  GET  /api/chats/:contact_id");
        println!();
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error waiting for Ctrl+C: {e}");
        }
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity stats: {e}");
    }
    println!();
    println!("{}", activity.summary());
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: Option<u16>, _delay_ms: Option<u64>) {
    eprintln!("Error: serve requires the server feature");
    std::process::exit(1);
}

struct ScanOptions {
    pattern: String,
    policy: Option<String>,
    device: Option<String>,
    random_presence: bool,
    remote: Option<String>,
    api_key: Option<String>,
    json: bool,
}

fn cmd_scan(options: ScanOptions) {
    let mut config = load_config();
    apply_policy(&mut config, options.policy.as_deref());
    if options.random_presence {
        config.detector.use_random_presence = true;
    }

    let mut camera = SyntheticCamera::new(parse_pattern(&options.pattern));
    if let Some(ref device) = options.device {
        match DeviceBehavior::parse(device) {
            Some(behavior) => camera = camera.with_behavior(behavior),
            None => {
                eprintln!("Error: Unknown device behavior '{device}' (use deny, missing or busy)");
                std::process::exit(1);
            }
        }
    }

    if let Some(endpoint) = options.remote {
        scan_remote(&config, camera, endpoint, options.api_key, options.json);
        return;
    }

    let activity = create_shared_log_with_persistence(config.activity_path());
    let mut workflow =
        ScanWorkflow::from_config(&config, Box::new(camera)).with_activity_log(activity.clone());

    if let Err(e) = workflow.start_camera() {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    let detected = match workflow.poll_presence() {
        Ok(detected) => detected,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };
    println!(
        "Presence: {}",
        if detected { "detected ✓" } else { "not detected ✗" }
    );

    let outcome = workflow.analyze(|progress| {
        print!("\rAnalyzing... {progress:>3.0}%");
        let _ = std::io::stdout().flush();
    });

    let succeeded = match outcome {
        Ok(result) => {
            println!();
            println!();
            if options.json {
                print_json(result);
            } else {
                print_result(result);
            }
            true
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            false
        }
    };

    workflow.stop();
    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity stats: {e}");
    }
    if !succeeded {
        std::process::exit(1);
    }
}

#[cfg(feature = "client")]
fn scan_remote(
    config: &Config,
    camera: SyntheticCamera,
    endpoint: String,
    api_key: Option<String>,
    json: bool,
) {
    let mut session = CaptureSession::new(Box::new(camera), config.capture.clone());
    let frame = match session.start().and_then(|_| session.frame()) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };
    session.stop();

    let mut client_config = AnalysisClientConfig::new(endpoint);
    client_config.recommendations = config.recommendations.clone();
    if let Some(key) = api_key {
        client_config = client_config.with_api_key(key);
    }

    let client = match BlockingAnalysisClient::new(client_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating client: {e}");
            std::process::exit(1);
        }
    };

    match client.analyze_frame(&frame) {
        Ok(analysis) => {
            if json {
                print_json(&analysis);
            } else {
                println!("Source: {:?}", analysis.source);
                if let (Some(age), Some(gender)) = (analysis.age, analysis.gender) {
                    println!("Age/gender estimate: {age} / {gender:?}");
                }
                print_result(&analysis.result);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "client"))]
fn scan_remote(
    _config: &Config,
    _camera: SyntheticCamera,
    _endpoint: String,
    _api_key: Option<String>,
    _json: bool,
) {
    eprintln!("Error: --remote requires the client feature");
    std::process::exit(1);
}

fn cmd_watch(pattern: &str, policy: Option<&str>, interval_ms: Option<u64>) {
    let mut config = load_config();
    apply_policy(&mut config, policy);
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or(config.detector.poll_interval);

    println!("EmoCollab Agent v{VERSION}");
    println!();
    println!("Watching for presence every {}ms", interval.as_millis());
    println!("Press Ctrl+C to stop");
    println!();

    let activity = create_shared_log_with_persistence(config.activity_path());
    let camera = SyntheticCamera::new(parse_pattern(pattern));
    let session = CaptureSession::new(Box::new(camera), config.capture.clone());

    let mut detection = match DetectionLoop::spawn_with_log(
        session,
        source_from_config(&config.detector),
        interval,
        Some(activity.clone()),
    ) {
        Ok(detection) => detection,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let receiver = detection.receiver().clone();
    let mut last = None;
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                // Only print changes
                if last != Some(event.detected) {
                    println!(
                        "[{}] {}",
                        event.at.format("%H:%M:%S"),
                        if event.detected {
                            "Subject detected"
                        } else {
                            "No subject"
                        }
                    );
                    last = Some(event.detected);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Detection loop stopped unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping...");
    detection.stop();

    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity stats: {e}");
    }
    println!();
    println!("{}", activity.summary());
}

fn cmd_status() {
    let config = load_config();

    println!("EmoCollab Agent Status");
    println!("======================");
    println!();

    println!("Configuration:");
    println!("  Presence policy: {:?}", config.detector.policy);
    println!("  Sample stride: {}", config.detector.sample_stride);
    println!(
        "  Random presence: {}",
        if config.detector.use_random_presence {
            format!(
                "enabled (p = {})",
                config.detector.random_presence_probability
            )
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Confidence range: {:.2} - {:.2}",
        config.engine.confidence_bounds().0,
        config.engine.confidence_bounds().1
    );
    println!("  Server port: {}", config.server.port);
    println!();

    let stats_path = config.activity_path();
    if stats_path.exists() {
        match std::fs::read_to_string(&stats_path)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        {
            Some(stats) => {
                println!("Cumulative Statistics:");
                for key in [
                    "frames_sampled",
                    "presence_hits",
                    "analyses_completed",
                    "analyses_rejected",
                    "messages_sent",
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {}: {value}", key.replace('_', " "));
                    }
                }
            }
            None => eprintln!("Warning: Could not read {stats_path:?}"),
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_notice() {
    println!("{SCAN_NOTICE}");
}

/// Load the config file, warning (not failing) when it is unreadable.
fn load_config() -> Config {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    config
}

fn apply_policy(config: &mut Config, policy: Option<&str>) {
    if let Some(name) = policy {
        match PresencePolicy::parse(name) {
            Some(policy) => config.detector.policy = policy,
            None => {
                eprintln!("Error: Unknown presence policy '{name}' (use brightness or skin)");
                std::process::exit(1);
            }
        }
    }
}

fn parse_pattern(pattern: &str) -> FramePattern {
    FramePattern::parse(pattern).unwrap_or_else(|| {
        eprintln!("Error: Unknown frame pattern '{pattern}'");
        std::process::exit(1);
    })
}

fn print_result(result: &AnalysisResult) {
    let (dominant, score) = result.emotions.dominant();

    println!("Stress level: {} ({})", result.stress_level, result.tier());
    println!("Confidence: {:.0}%", result.confidence * 100.0);
    println!("Dominant emotion: {dominant} ({:.0}%)", score * 100.0);
    println!();
    println!("Emotions:");
    for (name, value) in result.emotions.as_pairs() {
        println!("  {name:<10} {:>5.1}%", value * 100.0);
    }
    println!();
    println!("Recommendations:");
    for recommendation in &result.recommendations {
        println!("  • {recommendation}");
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing: {e}"),
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}

