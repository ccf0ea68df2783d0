//! forcecmd: retrieve and deploy Salesforce metadata.
//!
//! Run from a directory containing `forcecmd.json`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use forcecmd::{
    connect, deploy_sources, export_data, retrieve_metadata, write_test_report, ClientConfig, Config,
    DeployOptions, DeployRequest, JobPoller, MetadataClient, Transport,
};
use tracing::{error, info};
use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "forcecmd", version, about = "Retrieve and deploy Salesforce metadata")]
struct Cli {
    /// Log the details of every step
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replace src/ and data/ with the org's metadata and custom settings
    Retrieve,

    /// Deploy files below src/
    Deploy {
        /// Delete the named components instead of deploying them
        #[arg(long)]
        destroy: bool,

        /// Deploy options as a JSON object, e.g. '{"checkOnly": true}'
        #[arg(long, value_name = "JSON")]
        options: Option<String>,

        /// Write the test results to TEST-result.xml
        #[arg(long)]
        save_test_result: bool,

        /// Files to deploy; a trailing / names a folder
        #[arg(required = true)]
        files: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,forcecmd=debug,forcecmd_auth=debug,forcecmd_client=debug,forcecmd_metadata=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(uptime())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = Path::new(".");
    let result = match cli.command {
        Command::Retrieve => retrieve(root).await,
        Command::Deploy {
            destroy,
            options,
            save_test_result,
            files,
        } => deploy(root, files, destroy, options.as_deref(), save_test_result).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn login(root: &Path) -> anyhow::Result<(Config, MetadataClient)> {
    let config = Config::load(root)?;
    let transport = Transport::new(ClientConfig::default())?;
    let connection = connect(&config, transport).await?;
    Ok((config, MetadataClient::new(connection)))
}

/// Metadata and data run side by side; a failure of one does not stop the
/// other.
async fn retrieve(root: &Path) -> anyhow::Result<()> {
    let (config, client) = login(root).await?;
    let poller = JobPoller::new();

    let (metadata, data) = tokio::join!(
        retrieve_metadata(&client, &poller, &config.exclude_dirs, root),
        export_data(client.connection(), &config.objects, root),
    );

    match (metadata, data) {
        (Ok(_), Ok(objects)) => {
            info!(objects = objects.len(), "Retrieve complete");
            Ok(())
        }
        (Err(e), Ok(_)) => Err(e).context("Metadata retrieve failed"),
        (Ok(_), Err(e)) => Err(e).context("Data export failed"),
        (Err(metadata), Err(data)) => {
            error!("Data export failed: {data}");
            Err(metadata).context("Metadata retrieve failed")
        }
    }
}

async fn deploy(
    root: &Path,
    files: Vec<String>,
    destroy: bool,
    options: Option<&str>,
    save_test_result: bool,
) -> anyhow::Result<()> {
    let options = match options {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--options is not valid JSON")?;
            DeployOptions::from_json(&value)?
        }
        None => DeployOptions::new(),
    };
    let request = DeployRequest {
        files,
        destroy,
        options,
    };

    let (_, client) = login(root).await?;
    let result = deploy_sources(&client, &JobPoller::new(), &request, root).await?;

    if save_test_result {
        let hostname = &client.connection().session().instance_host;
        write_test_report(&result, hostname, root).await?;
    }

    match result.into_summary() {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            if let Some(summary) = e.deploy_summary() {
                eprintln!("{}", serde_json::to_string_pretty(summary)?);
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "forcecmd",
            "deploy",
            "--destroy",
            "--options={\"checkOnly\":true}",
            "src/classes/Foo.cls",
            "src/documents/Shared/",
        ])
        .unwrap();

        match cli.command {
            Command::Deploy {
                destroy,
                options,
                save_test_result,
                files,
            } => {
                assert!(destroy);
                assert!(!save_test_result);
                assert_eq!(options.as_deref(), Some("{\"checkOnly\":true}"));
                assert_eq!(files, vec!["src/classes/Foo.cls", "src/documents/Shared/"]);
            }
            Command::Retrieve => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_parse_retrieve_verbose() {
        let cli = Cli::try_parse_from(["forcecmd", "retrieve", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Retrieve));
    }

    #[test]
    fn test_unknown_argument_rejected() {
        assert!(Cli::try_parse_from(["forcecmd", "retrieve", "--bogus"]).is_err());
        assert!(Cli::try_parse_from(["forcecmd", "deploy"]).is_err());
        assert!(Cli::try_parse_from(["forcecmd", "frobnicate"]).is_err());
    }
}
