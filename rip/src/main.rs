use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::instrument;

use common::batch::{Outcome, PipedInput, Report};

/// Process exit codes
mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const STDIN_INSPECTION: i32 = 2;
    pub const PARTIAL_FAILURE: i32 = 3;
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rip",
    disable_version_flag = true,
    override_usage = "rip [OPTIONS] <host>[:<port>] <tcp|udp> [<file_path>...]",
    about = "Sends a text file line by line to a remote host/port",
    long_about = "`rip` sends text files line by line to a remote host/port over TCP or UDP.

Every line is sent as its own write (TCP) or datagram (UDP), without the line terminator.
If data is piped into `rip` it is sent first, in addition to any files listed.

EXIT CODES:
    0 - All data sent
    1 - Usage error (missing arguments, or no data piped in or specified)
    2 - Failed to inspect standard input
    3 - Some sources failed to send

EXAMPLES:
    # Send a log file to a TCP listener
    rip localhost:5140 tcp /var/log/app.log

    # Replay syslog lines over UDP at 100 messages per second
    cat messages | rip -r 100 10.0.0.5:514 udp"
)]
struct Args {
    // Transfer options
    /// Message rate allowed per second, use -1 for no limit
    #[arg(
        short = 'r',
        long,
        default_value = "-1",
        value_name = "N",
        allow_hyphen_values = true,
        help_heading = "Transfer options"
    )]
    rate_limit: throttle::RateLimit,

    // Progress & output
    /// Quiet mode, don't show progress and only report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    /// Sets the delay between progress updates, e.g. "100ms", "1s"
    #[arg(long, default_value = "100ms", value_name = "DELAY", hide = true)]
    progress_delay: String,

    /// Write debug messages to console
    #[arg(short = 'D', long, hide = true)]
    debug: bool,

    /// Show the version and exit
    #[arg(short = 'V', long)]
    version: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(long, default_value = "0", value_name = "N", hide = true)]
    max_workers: usize,

    // ARGUMENTS
    /// Destination host and port
    #[arg(value_name = "HOST[:PORT]")]
    address: Option<String>,

    /// Transport to send with
    #[arg(value_name = "PROTOCOL", ignore_case = true)]
    protocol: Option<common::Protocol>,

    /// Text file(s) to send
    #[arg(value_name = "FILE_PATH")]
    files: Vec<std::path::PathBuf>,
}

fn usage_error(message: &str) -> i32 {
    tracing::warn!("{}", message);
    eprintln!("{}", Args::command().render_usage());
    exit_code::USAGE
}

#[instrument(skip(args))]
async fn async_main(
    args: Args,
    destination: common::Destination,
    progress: common::ProgressSettings,
    stdin: Option<PipedInput>,
) -> Result<Report> {
    tracing::info!("Sending data to {}", destination);
    let limiter = throttle::Limiter::new(args.rate_limit);
    tracing::debug!("rate limit: {}", args.rate_limit);
    let stdin = stdin.map(|piped| common::transfer::Source::stdin(piped.total_size));
    let report =
        common::batch::run_batch(&destination, &limiter, &progress, stdin, &args.files).await?;
    Ok(report)
}

fn run(args: Args) -> i32 {
    if args.version {
        println!("{}", common::version::BuildVersion::current().report("rip"));
        return exit_code::SUCCESS;
    }
    let output = common::OutputConfig {
        quiet: args.quiet,
        debug: args.debug,
    };
    common::init_logging(&output);
    let (Some(address), Some(protocol)) = (args.address.clone(), args.protocol) else {
        return usage_error("A destination address and protocol (tcp|udp) are required.");
    };
    let delay = match common::ProgressSettings::parse_delay(&args.progress_delay) {
        Ok(delay) => delay,
        Err(error) => return usage_error(&format!("{error:#}")),
    };
    let progress = common::ProgressSettings {
        enabled: !args.quiet,
        delay,
    };
    let stdin = match common::batch::detect_piped_stdin() {
        Ok(stdin) => stdin,
        Err(error) => {
            tracing::error!("Failed to inspect standard input: {}", error);
            return exit_code::STDIN_INSPECTION;
        }
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
    };
    let destination = common::Destination::new(protocol, address);
    let func = move || async_main(args, destination, progress, stdin);
    let report = match common::run(&output, &runtime, func) {
        Ok(report) => report,
        Err(error) => {
            return match error.downcast_ref::<common::Error>() {
                Some(common::Error::Usage(message)) => usage_error(message),
                _ => {
                    tracing::error!("{:#}", error);
                    exit_code::PARTIAL_FAILURE
                }
            };
        }
    };
    tracing::debug!("\n{}", report);
    match report.outcome() {
        Outcome::Success => {
            tracing::info!("All files successfully sent.");
            exit_code::SUCCESS
        }
        Outcome::PartialFailure { errors } => {
            tracing::warn!(
                "There were some errors while sending files ({} of {} failed).",
                errors,
                report.outcomes.len()
            );
            exit_code::PARTIAL_FAILURE
        }
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            // --help lands here too, it is not a failure
            let code = if error.use_stderr() {
                exit_code::USAGE
            } else {
                exit_code::SUCCESS
            };
            let _ = error.print();
            std::process::exit(code);
        }
    };
    std::process::exit(run(args));
}
