// CLI module for replycache
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;

/// replycache - bounded, TTL-aware response cache for a chat assistant backend
#[derive(Parser, Debug)]
#[command(name = "replycache", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.replycache/config.toml)
    #[arg(long, short, env = "REPLYCACHE_CONFIG")]
    pub config: Option<String>,

    /// Override the listening port
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Skip seeding the cache with canned greetings
    #[arg(long)]
    pub no_preload: bool,
}
