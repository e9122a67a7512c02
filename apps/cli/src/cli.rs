use std::path::PathBuf;

use clap::Parser;

/// Upload files to a remote host and run commands around the upload.
#[derive(Parser, Debug)]
#[command(name = "sshdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Deployment config (TOML, or JSON when the extension is .json)
    #[arg(short, long, default_value = "deploy.toml")]
    pub config: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    pub silent: bool,

    /// Override the remote host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the remote port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the remote user
    #[arg(short, long)]
    pub user: Option<String>,

    /// Read the password from this environment variable
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Diagnostic verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default tracing filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
