use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::sync::Arc;

use chordring_core::node::RingNode;
use chordring_core::node::RingNodeBuilder;
use chordring_core::transport::connections::TcpTransport;
use chordring_node::config;
use chordring_node::console::parse_line;
use chordring_node::console::PrintHandler;
use chordring_node::logging::init_logging;
use chordring_node::logging::LogLevel;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tokio::io;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, value_enum, env, help = "Overrides log_level of the config file")]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a config file for a new node.")]
    Init(InitCommand),
    #[command(about = "Creates or joins a ring and opens the message console.")]
    Run(RunCommand),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(
        long,
        short = 'c',
        env,
        default_value = config::DEFAULT_CONFIG_PATH,
        help = "Config file location"
    )]
    pub config: String,
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = config::DEFAULT_CONFIG_PATH,
        help = "The location of config file"
    )]
    pub location: String,

    #[arg(long, help = "Node name, hashed into its ring id")]
    pub name: String,

    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, help = "Ring member to join through")]
    pub bootstrap: Option<SocketAddrV4>,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[arg(long, env, help = "Node name. If not provided, use name in config file")]
    pub name: Option<String>,

    #[arg(long, env, help = "Listen ip. If not provided, use bind_ip in config file")]
    pub bind_ip: Option<Ipv4Addr>,

    #[arg(
        long,
        short = 'p',
        env,
        help = "Listen port. If not provided, use port in config file"
    )]
    pub port: Option<u16>,

    #[arg(
        long,
        short = 'b',
        env,
        help = "Ring member to join through. If neither this nor the config file has one, a new ring is created"
    )]
    pub bootstrap: Option<SocketAddrV4>,

    #[arg(long, env, help = "Address advertised to other nodes")]
    pub external_ip: Option<Ipv4Addr>,

    #[arg(long, help = "Ignore the config file and use defaults plus flags")]
    pub no_config: bool,

    #[command(flatten)]
    config_args: ConfigArgs,
}

fn get_value<V>(value: Option<V>, default_value: V) -> V {
    value.unwrap_or(default_value)
}

async fn daemon_run(args: RunCommand, log_level: Option<LogLevel>) -> anyhow::Result<()> {
    let c = if args.no_config {
        let name = args
            .name
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--name is required with --no-config"))?;
        config::Config::new(&name)
    } else {
        config::Config::read_fs(&args.config_args.config)?
    };
    init_logging(get_value(log_level, c.log_level));

    let name = get_value(args.name, c.name);
    let bind_ip = get_value(args.bind_ip, c.bind_ip);
    let port = get_value(args.port, c.port);
    let bootstrap = args.bootstrap.or(c.bootstrap);
    let mut ring = c.ring;
    ring.external_ip = args.external_ip.or(ring.external_ip);

    let node = RingNodeBuilder::new(&name, Arc::new(TcpTransport::new(bind_ip)))
        .listen_port(port)
        .config(ring)
        .app_message_handler(Arc::new(PrintHandler))
        .build()
        .await?;
    println!("Node: {} ({})", name, node.node_info());

    match bootstrap {
        Some(peer) => {
            let successor = node.network_join(peer).await?;
            println!("Joined via {}, successor {}", peer, successor);
        }
        None => {
            node.network_create()?;
            println!("Created a new ring");
        }
    }

    console_loop(&node).await?;
    node.shutdown()?;
    Ok(())
}

async fn console_loop(node: &RingNode) -> anyhow::Result<()> {
    let mut stdin = io::BufReader::new(io::stdin()).lines();
    println!("Enter `<name> <message>` to send, Ctrl-D to quit");

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                let out = match parse_line(&line) {
                    Ok(out) => out,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        continue;
                    }
                };
                match node.route_message(out.target, out.text).await {
                    Ok(owner) => {
                        println!("sent to {} (owner of {} {})", owner, out.name, out.target)
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => daemon_run(args, cli.log_level).await,
        Command::Init(args) => {
            let mut config = config::Config::new(&args.name);
            config.port = args.port;
            config.bootstrap = args.bootstrap;
            if let Some(level) = cli.log_level {
                config.log_level = level;
            }
            let p = config.write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
    }
}
