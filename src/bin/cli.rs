//! memlink CLI
//!
//! Inspect payload encodings and run a scripted session against the
//! in-memory engine.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use memlink::client::Client;
use memlink::codec::{Flags, PayloadCodec, Structured, Value};
use memlink::config::Config;
use memlink::protocol::{Behavior, ClientOption};
use memlink::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// memlink CLI
#[derive(Parser, Debug)]
#[command(name = "memlink-cli")]
#[command(about = "Payload codec and client tooling for memlink")]
#[command(version)]
struct Args {
    /// Upper bound on decompression buffer doublings
    #[arg(long, default_value = "16")]
    max_decompress_attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a value and print its flags and bytes
    Encode {
        /// How to interpret the input
        #[arg(short, long, value_enum, default_value = "str")]
        kind: Kind,

        /// The value to encode
        value: String,

        /// Compress string payloads
        #[arg(short, long)]
        compress: bool,
    },

    /// Decode hex payload bytes stored with the given flags
    Decode {
        /// Flags stored next to the payload
        #[arg(short, long, default_value = "0")]
        flags: u32,

        /// Payload bytes as hex
        hex: String,
    },

    /// Run a short client session against the in-memory engine
    Demo {
        /// Disable compression for the session
        #[arg(long)]
        no_compression: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Str,
    Int,
    Float,
    Bool,
    /// Comma-separated list stored as a structured value
    List,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,memlink=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    let codec = PayloadCodec::new().with_max_decompress_attempts(args.max_decompress_attempts);

    let outcome = match args.command {
        Commands::Encode {
            kind,
            value,
            compress,
        } => encode(&codec, kind, &value, compress),
        Commands::Decode { flags, hex } => decode(&codec, flags, &hex),
        Commands::Demo { no_compression } => demo(!no_compression, args.max_decompress_attempts),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn parse_value(kind: Kind, raw: &str) -> std::result::Result<Value, String> {
    match kind {
        Kind::Str => Ok(Value::from(raw)),
        Kind::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("not an integer: {}", e)),
        Kind::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("not a float: {}", e)),
        Kind::Bool => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| format!("not a bool: {}", e)),
        Kind::List => Ok(Value::Structured(Structured::List(
            raw.split(',')
                .map(|item| Structured::Text(item.trim().to_string()))
                .collect(),
        ))),
    }
}

fn encode(codec: &PayloadCodec, kind: Kind, raw: &str, compress: bool) -> Result<()> {
    let value = parse_value(kind, raw).map_err(memlink::MemlinkError::InvalidArgument)?;
    let payload = codec.encode(&value, compress)?;

    println!("flags: {:#06x} ({:?})", payload.flags().bits(), payload.flags());
    println!("length: {}", payload.len());
    println!("bytes: {}", hex::encode(payload.bytes()));
    Ok(())
}

fn decode(codec: &PayloadCodec, flags: u32, input: &str) -> Result<()> {
    let bytes = hex::decode(input.trim())
        .map_err(|e| memlink::MemlinkError::InvalidArgument(format!("bad hex: {}", e)))?;
    let value = codec.decode(&bytes, Flags::from_wire(flags))?;

    println!("{}: {:?}", value.kind(), value);
    Ok(())
}

fn demo(compression: bool, max_decompress_attempts: u32) -> Result<()> {
    let config = Config::builder()
        .compression(compression)
        .max_decompress_attempts(max_decompress_attempts)
        .server("127.0.0.1", 11211)
        .build();
    let mut client = Client::in_memory(config)?;

    tracing::info!("memlink v{} demo (compression={})", memlink::VERSION, compression);

    client.set("greeting", "hello world", 0)?;
    client.set("visits", 41_i64, 0)?;
    client.set("ratio", 0.25_f64, 0)?;
    client.increment("visits", 1)?;

    let (values, tokens) = client.get_multi_with_cas(["greeting", "visits", "ratio", "missing"])?;
    let mut keys: Vec<_> = values.keys().cloned().collect();
    keys.sort();
    for key in keys {
        println!("{} = {:?} (cas {})", key, values[&key], tokens.get(&key).copied().unwrap_or(0));
    }

    let (_, token) = client.get_with_cas("greeting")?;
    client.cas(token, "greeting", "hello again", 0)?;
    match client.cas(token, "greeting", "stale write", 0) {
        Ok(()) => println!("stale cas unexpectedly stored"),
        Err(e) => println!("stale cas rejected: {}", e),
    }

    client.get_delayed(["greeting", "ratio"], false)?;
    for item in client.fetch_all()? {
        println!("delayed {} = {:?}", item.key, item.value);
    }

    println!(
        "support_cas = {:?}, last result = {}",
        client.get_option(ClientOption::Behavior(Behavior::SupportCas))?,
        client.result_code()
    );
    Ok(())
}
