//! Address diagnostics: app URL normalization and local address selection

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use vbook_common::netselect::DEFAULT_PREFIX_HINT;
use vbook_common::{normalize_vbook_url, parse_vbook_url, select_local_address, Error};

use crate::config::CliConfig;

#[derive(Parser)]
pub struct NormalizeArgs {
    /// App address as typed, e.g. 192.168.1.7 or https://10.0.0.5
    pub url: String,
}

#[derive(Parser)]
pub struct LocalIpArgs {
    /// File server port to put in the URL
    #[arg(long)]
    pub port: Option<u16>,

    /// Address prefix to prefer, e.g. 192.168.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Derive port and prefix from this app address; overrides --prefix
    #[arg(long, env = "VBOOK_APP_URL")]
    pub app_url: Option<String>,
}

pub fn normalize(args: NormalizeArgs) -> Result<()> {
    let normalized =
        normalize_vbook_url(&args.url).ok_or_else(|| Error::InvalidUrl(args.url.clone()))?;
    println!("{}", normalized);
    Ok(())
}

pub fn local_ip(args: LocalIpArgs, config: &CliConfig) -> Result<()> {
    let (app_port, prefix) = match &args.app_url {
        Some(url) => {
            let target = parse_vbook_url(url)?;
            (target.port, target.interface_prefix())
        }
        None => (
            config.default_port,
            args.prefix.unwrap_or_else(|| DEFAULT_PREFIX_HINT.to_string()),
        ),
    };

    let port = match args.port {
        Some(port) => port,
        None => config
            .server_port(app_port)
            .ok_or_else(|| anyhow!("app port {} leaves no file server port", app_port))?,
    };

    let url = select_local_address(port, &prefix).context("failed to get local IP")?;
    println!("{}", url);
    Ok(())
}
