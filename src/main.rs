use color_eyre::eyre::{Result, WrapErr};
use lineecho::tcp::connect;
use lineecho::{
    ClientConfig, DetachOptions, DuplexClient, LineEchoServer, PidFile, ServerConfig,
    detach_from_terminal, resolve,
};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line usage error (sysexits.h)
const EX_USAGE: i32 = 64;
/// Service unavailable (sysexits.h)
const EX_UNAVAILABLE: i32 = 69;

struct ServerArgs {
    host: String,
    service: String,
    daemon: bool,
    change_dir: bool,
    redirect_stdio: bool,
    pid_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

enum Command {
    Server(ServerArgs),
    Client { host: String, service: String },
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("lineecho");

    match parse_args(args.get(1..).unwrap_or_default()) {
        Some(Command::Server(server_args)) => run_server(server_args),
        Some(Command::Client { host, service }) => run_client(&host, &service),
        None => {
            usage(program);
            process::exit(EX_USAGE);
        }
    }
}

fn parse_args(args: &[String]) -> Option<Command> {
    let (mode, rest) = args.split_first()?;
    let [host, service, flags @ ..] = rest else {
        return None;
    };

    match mode.as_str() {
        "client" if flags.is_empty() => Some(Command::Client {
            host: host.clone(),
            service: service.clone(),
        }),
        "server" => {
            let mut server_args = ServerArgs {
                host: host.clone(),
                service: service.clone(),
                daemon: false,
                change_dir: true,
                redirect_stdio: true,
                pid_file: None,
                log_file: None,
            };
            let mut flags = flags.iter();
            while let Some(flag) = flags.next() {
                match flag.as_str() {
                    "-d" | "--daemon" => server_args.daemon = true,
                    "--no-chdir" => server_args.change_dir = false,
                    "--no-close" => server_args.redirect_stdio = false,
                    "--pid-file" => server_args.pid_file = Some(flags.next()?.into()),
                    "--log-file" => server_args.log_file = Some(flags.next()?.into()),
                    _ => return None,
                }
            }
            Some(Command::Server(server_args))
        }
        _ => None,
    }
}

fn usage(program: &str) {
    eprintln!("Usage: {program} server <host> <port|service> [options]");
    eprintln!("       {program} client <host> <port|service>");
    eprintln!();
    eprintln!("Server options:");
    eprintln!("  -d, --daemon        Detach from the terminal and run in the background");
    eprintln!("  --no-chdir          Keep the working directory when detaching");
    eprintln!("  --no-close          Keep stdin/stdout/stderr when detaching");
    eprintln!("  --pid-file <path>   Write the server's pid to <path>");
    eprintln!("  --log-file <path>   Append logs to <path> instead of stderr");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program} server 0.0.0.0 7000            # Serve in the foreground");
    eprintln!("  {program} server 127.0.0.1 echo --daemon  # Serve the 'echo' port in the background");
    eprintln!("  {program} client localhost 7000           # Type lines, see replies");
}

/// Logs go to stderr or a log file, never to stdout
fn init_logging(log_file: Option<File>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lineecho=info"));

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn run_server(args: ServerArgs) -> Result<()> {
    let log_file = args
        .log_file
        .as_ref()
        .map(|path| OpenOptions::new().create(true).append(true).open(path))
        .transpose()
        .wrap_err("Failed to open log file")?;
    let log_fd = log_file.as_ref().map(AsRawFd::as_raw_fd);
    init_logging(log_file);

    let pid_path = args
        .pid_file
        .as_deref()
        .map(std::path::absolute)
        .transpose()
        .wrap_err("Invalid pid file path")?;

    let addr = resolve(&args.host, &args.service).unwrap_or_else(|e| {
        error!(error = %e, "Address resolution failed");
        process::exit(EX_UNAVAILABLE);
    });

    let server = LineEchoServer::new(ServerConfig::new(addr));
    let listener = server.bind().unwrap_or_else(|e| {
        error!(error = %e, "Failed to create server socket");
        process::exit(EX_UNAVAILABLE);
    });
    info!(address = %listener.local_addr()?, "Ready for accept");

    if args.daemon {
        let mut options = DetachOptions::default()
            .with_change_dir(args.change_dir)
            .with_redirect_stdio(args.redirect_stdio)
            .keep_fd(listener.as_raw_fd());
        if let Some(fd) = log_fd {
            options = options.keep_fd(fd);
        }
        detach_from_terminal(&options).wrap_err("Failed to detach from terminal")?;
        info!(pid = process::id(), "Detached from terminal");
    }

    // Built after detaching: a fork only carries the calling thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to build runtime")?;

    runtime.block_on(async {
        // The pid file only appears once SIGTERM is handled, so it is always removed.
        let mut terminate = signal(SignalKind::terminate())?;
        let listener = lineecho::network::into_tokio(listener)?;
        let _pid_file = pid_path.map(PidFile::create).transpose()?;

        let serving = server.serve(listener);
        tokio::pin!(serving);
        tokio::select! {
            biased;
            result = &mut serving => result,
            _ = terminate.recv() => {
                info!("Received SIGTERM, stopping after the current session");
                let _ = server.shutdown_signal().send(());
                serving.await
            }
        }
    })?;

    Ok(())
}

fn run_client(host: &str, service: &str) -> Result<()> {
    init_logging(None);

    let addr = resolve(host, service).unwrap_or_else(|e| {
        error!(error = %e, "Address resolution failed");
        process::exit(EX_UNAVAILABLE);
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to build runtime")?;

    let socket = runtime.block_on(connect(addr)).unwrap_or_else(|e| {
        error!(error = %e, "Connection failed");
        process::exit(EX_UNAVAILABLE);
    });
    info!(address = %addr, "Connected");

    let mut client = DuplexClient::new(
        socket,
        tokio::io::stdin(),
        tokio::io::stdout(),
        ClientConfig::default(),
    );
    match runtime.block_on(client.run()) {
        Ok(termination) => info!(?termination, "Session finished"),
        Err(e) => error!(error = %e, "Session failed"),
    }
    drop(client);

    // A blocking stdin read cannot be cancelled; do not wait for it.
    runtime.shutdown_background();
    Ok(())
}
