use anyhow::{anyhow, bail, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tenant_probe::{
    output::ValidSink,
    proxy::{CheckerConfig, Proxy, ProxyChecker, ProxyParser, ProxyPool, ProxyType},
    runner::{load_addresses, BatchRunner},
    Config, ProbeConfig, DEFAULT_ENDPOINT,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Enumerates valid Microsoft 365 accounts without submitting login attempts
#[derive(Parser)]
#[command(name = "tenant-probe", version)]
#[command(about = "Enumerates valid Microsoft 365 accounts without submitting login attempts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug information including API responses
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one address or a list of addresses
    Probe(ProbeArgs),
    /// Check proxies against the identity host and save results
    Check {
        /// Input file containing proxies
        input: PathBuf,
        /// Output file for good proxies
        #[arg(short, long)]
        good: Option<PathBuf>,
        /// Output file for bad proxies
        #[arg(short, long)]
        bad: Option<PathBuf>,
        /// Proxy type for entries without a scheme (http, https, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
        /// Number of concurrent checks
        #[arg(short = 'n', long, default_value = "10")]
        threads: usize,
        /// Timeout in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
        /// URL to test proxies against
        #[arg(long, default_value = "https://login.microsoftonline.com/")]
        test_url: String,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["email", "file"])))]
struct ProbeArgs {
    /// Single email address to validate
    #[arg(short, long)]
    email: Option<String>,
    /// List of email addresses to validate, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Append valid email addresses to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Delay in seconds between addresses
    #[arg(short, long, default_value = "0.5")]
    delay: f64,
    /// File containing proxies, one per line
    #[arg(short, long)]
    proxy_file: Option<PathBuf>,
    /// Proxy type for entries without a scheme (http, https, socks5)
    #[arg(short = 't', long, default_value = "http")]
    proxy_type: String,
    /// Check proxies before probing and drop the unreachable ones
    #[arg(long)]
    check_proxies: bool,
    /// Timeout in seconds for each request
    #[arg(long, default_value = "20")]
    timeout: u64,
    /// Direct-connection retries before an address is reported undetermined
    #[arg(long, default_value = "3")]
    max_direct_retries: u32,
    /// Credential-type endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Print one JSON object per address instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Probe(args) => probe(args).await?,
        Commands::Check {
            input,
            good,
            bad,
            proxy_type,
            threads,
            timeout,
            test_url,
        } => {
            let ptype = parse_proxy_type(&proxy_type)?;
            let proxies = ProxyParser::parse_file(&input, ptype)?;

            println!("Loaded {} proxies from {:?}", proxies.len(), input);
            println!("Checking with {} threads, timeout: {}s", threads, timeout);
            println!("Test URL: {}", test_url);
            println!();

            let config = CheckerConfig::new()
                .with_concurrency(threads)
                .with_timeout(Duration::from_secs(timeout))
                .with_test_url(test_url);

            let checker = ProxyChecker::with_config(config);
            let (good_results, bad_results) = checker.check_and_separate(proxies).await;

            println!(
                "Results: {} good, {} bad",
                good_results.len(),
                bad_results.len()
            );

            if let Some(good_path) = good {
                let good_proxies: Vec<_> = good_results.iter().map(|r| r.proxy.clone()).collect();
                ProxyParser::save_to_file(&good_proxies, &good_path)?;
                println!(
                    "Saved {} good proxies to {:?}",
                    good_proxies.len(),
                    good_path
                );
            }

            if let Some(bad_path) = bad {
                let bad_proxies: Vec<_> = bad_results.iter().map(|r| r.proxy.clone()).collect();
                ProxyParser::save_to_file(&bad_proxies, &bad_path)?;
                println!("Saved {} bad proxies to {:?}", bad_proxies.len(), bad_path);
            }

            if !good_results.is_empty() {
                println!("\nWorking proxies:");
                for result in &good_results {
                    if let Some(time) = result.response_time_ms {
                        println!("  {} ({}ms)", result.proxy, time);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn probe(args: ProbeArgs) -> Result<()> {
    let delay = Duration::try_from_secs_f64(args.delay)
        .map_err(|e| anyhow!("Invalid delay {}: {}", args.delay, e))?;

    let addresses = match (&args.email, &args.file) {
        (Some(email), _) => vec![email.trim().to_string()],
        (None, Some(path)) => load_addresses(path)?,
        (None, None) => bail!("You must specify either --email or --file"),
    };
    if addresses.iter().all(|a| a.is_empty()) {
        warn!("No addresses to validate");
        return Ok(());
    }

    let proxies = load_proxies(&args).await?;

    let config = Config::new().with_delay(delay).with_probe(
        ProbeConfig::new()
            .with_endpoint(args.endpoint.clone())
            .with_timeout(Duration::from_secs(args.timeout))
            .with_max_direct_retries(args.max_direct_retries),
    );

    if proxies.is_empty() {
        info!(
            addresses = addresses.len(),
            delay_secs = args.delay,
            "processing addresses over a direct connection"
        );
    } else {
        info!(
            addresses = addresses.len(),
            delay_secs = args.delay,
            proxies = proxies.len(),
            "processing addresses with proxy rotation on throttle or error"
        );
    }

    let mut sink = args.output.as_ref().map(ValidSink::append).transpose()?;
    let runner = BatchRunner::with_config(config);
    let mut pool = ProxyPool::new(proxies);
    let json = args.json;

    let summary = runner
        .run(&addresses, &mut pool, |record| {
            if json {
                println!("{}", serde_json::to_string(record)?);
            } else {
                println!("{}", record);
            }
            if let Some(sink) = sink.as_mut() {
                sink.record(record)?;
            }
            Ok(())
        })
        .await?;

    if !json {
        println!(
            "Results: {} valid, {} invalid, {} could not validate",
            summary.valid, summary.invalid, summary.undetermined
        );
    }
    if let (Some(sink), Some(path)) = (&sink, &args.output) {
        info!(written = sink.written(), path = ?path, "saved valid addresses");
    }

    Ok(())
}

async fn load_proxies(args: &ProbeArgs) -> Result<Vec<Proxy>> {
    let Some(path) = &args.proxy_file else {
        return Ok(Vec::new());
    };

    let ptype = parse_proxy_type(&args.proxy_type)?;
    let mut proxies = ProxyParser::parse_file(path, ptype)?;
    info!(count = proxies.len(), path = ?path, "loaded proxies");

    if args.check_proxies && !proxies.is_empty() {
        let checker = ProxyChecker::with_config(
            CheckerConfig::new().with_timeout(Duration::from_secs(args.timeout)),
        );
        let (good, bad) = checker.check_and_separate(proxies).await;
        info!(working = good.len(), failed = bad.len(), "proxy pre-flight finished");
        proxies = good.into_iter().map(|r| r.proxy).collect();
    }

    if proxies.is_empty() {
        warn!("No valid proxies loaded, continuing without proxy");
    }

    Ok(proxies)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tenant_probe={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_proxy_type(s: &str) -> Result<ProxyType> {
    ProxyParser::parse_type(s).ok_or_else(|| {
        anyhow!("Invalid proxy type: {}. Use: http, https, socks5", s)
    })
}
