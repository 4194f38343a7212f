//! predexp - build, check and encode predicate expression programs

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use log::{debug, info};
use predexp::predexp::DEFAULT_MAX_PROGRAM_SIZE;
use predexp::{Limits, PredExp, PredExpList};

/// Encode a postfix predicate program given as tokens
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Program tokens in evaluation order, e.g. `int_bin:c int:11 int_ge`
    #[arg(required = true)]
    tokens: Vec<String>,

    /// Maximum encoded program size in bytes
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_PROGRAM_SIZE)]
    max_size: u32,

    /// Skip structural validation
    #[arg(long)]
    no_validate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut list = PredExpList::with_limits(args.tokens.len(), Limits::new(args.max_size));
    for token in &args.tokens {
        let node: PredExp = token
            .parse()
            .with_context(|| format!("Failed to parse token '{}'", token))?;
        list.add(node)?;
    }

    if args.no_validate {
        debug!("Validation skipped");
    } else {
        list.validate().context("Program failed validation")?;
        info!("Program is well formed");
    }

    let size = list.size().context("Failed to size program")?;
    let bytes = list.encode().context("Failed to encode program")?;

    println!("nodes: {}", size.node_count);
    println!("bytes: {}", size.total_bytes);
    for (i, node) in list.iter().enumerate() {
        println!(
            "  #{:<3} tag {:>3}  {:>4} bytes  {}",
            i,
            node.opcode().tag(),
            node.encoded_size(),
            node
        );
    }
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    println!("hex: {}", hex);

    list.destroy();
    Ok(())
}
