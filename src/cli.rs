//! Command line interface
//!
//! `labmate serve` runs the HTTP server (the default when no subcommand is
//! given). `labmate optimize` runs one optimization from the terminal.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::FutureExt;
use tracing::info;

use crate::catalog::{self, GENERAL_WET_LAB, PROTOCOL_TYPES};
use crate::config::Config;
use crate::models::AppState;
use crate::optimize::{optimize, OptimizeOutcome};
use crate::protocol::{PlasmidClient, ProtocolBuffer};
use crate::types::AppError;

#[derive(Debug, Parser)]
#[command(name = "labmate", version, about = "AI copilot for wet lab protocols")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Override PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Optimize one protocol file and print the result
    Optimize(OptimizeArgs),
    /// List the known protocol types
    Types,
}

#[derive(Debug, Args)]
pub struct OptimizeArgs {
    /// Protocol file (.txt, .md or .pdf)
    #[arg(long)]
    pub protocol: PathBuf,

    /// Protocol type whose default instruction is used
    #[arg(long, default_value = GENERAL_WET_LAB)]
    pub protocol_type: String,

    /// Instruction template file; overrides the protocol type default
    #[arg(long)]
    pub instruction: Option<PathBuf>,

    /// Addgene plasmid id to add as context
    #[arg(long)]
    pub plasmid: Option<String>,

    /// Write the result here as well as to stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn list_types() {
    for protocol_type in PROTOCOL_TYPES {
        println!("{}", protocol_type);
    }
}

pub async fn run_optimize(config: Config, args: OptimizeArgs) -> Result<()> {
    if !catalog::is_known_type(&args.protocol_type) {
        bail!(
            "unknown protocol type {:?} (run `labmate types` for the list)",
            args.protocol_type
        );
    }

    let filename = args
        .protocol
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid protocol path {}", args.protocol.display()))?
        .to_string();
    let bytes = tokio::fs::read(&args.protocol)
        .await
        .with_context(|| format!("failed to read {}", args.protocol.display()))?;

    let mut buffer = ProtocolBuffer::default();
    buffer.import_file(&filename, &bytes)?;

    // Nothing below can succeed without a key, the plasmid lookup included
    if config.llm.active_api_key().is_none() {
        return Err(AppError::MissingCredential.into());
    }

    if let Some(plasmid_id) = &args.plasmid {
        let plasmids = PlasmidClient::with_base_url(&config.scraper.addgene_base_url);
        let record = plasmids.fetch(plasmid_id).await?;
        info!(plasmid = %record.name, url = %record.url, "Adding plasmid context");
        buffer.append_plasmid_context(&record);
    }

    let instruction = match &args.instruction {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => catalog::default_instruction(&args.protocol_type).to_string(),
    };

    let max_prompt_chars = config.prompt.max_prompt_chars;
    let state = AppState::new(config);

    let interrupted = tokio::signal::ctrl_c().map(|_| ());

    let outcome = optimize(
        state.completion.as_deref(),
        buffer.text(),
        &instruction,
        max_prompt_chars,
        interrupted,
    )
    .await?;

    match outcome {
        OptimizeOutcome::Warning { message } => bail!(message),
        OptimizeOutcome::Result {
            text,
            prompt_warning,
            download_name,
            ..
        } => {
            if let Some(warning) = prompt_warning {
                eprintln!("warning: {}", warning);
            }
            println!("{}", text);

            if let Some(path) = args.output {
                let path = if path.is_dir() { path.join(download_name) } else { path };
                tokio::fs::write(&path, &text)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "Result written");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optimize_args() {
        let cli = Cli::try_parse_from([
            "labmate",
            "optimize",
            "--protocol",
            "digest.txt",
            "--protocol-type",
            "PCR",
            "--plasmid",
            "12345",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Optimize(args)) => {
                assert_eq!(args.protocol, PathBuf::from("digest.txt"));
                assert_eq!(args.protocol_type, "PCR");
                assert_eq!(args.plasmid.as_deref(), Some("12345"));
                assert!(args.instruction.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_protocol_type() {
        let cli = Cli::try_parse_from(["labmate", "optimize", "--protocol", "p.pdf"]).unwrap();
        match cli.command {
            Some(Command::Optimize(args)) => assert_eq!(args.protocol_type, GENERAL_WET_LAB),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["labmate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_plasmid_lookup() {
        let mut server = mockito::Server::new_async().await;
        let registry = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

        let protocol = std::env::temp_dir().join(format!("labmate-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&protocol, "Step 1: transform cells").unwrap();

        let mut config = Config::default();
        config.scraper.addgene_base_url = server.url();
        let args = OptimizeArgs {
            protocol: protocol.clone(),
            protocol_type: GENERAL_WET_LAB.to_string(),
            instruction: None,
            plasmid: Some("12345".to_string()),
            output: None,
        };

        let err = run_optimize(config, args).await.unwrap_err();
        std::fs::remove_file(&protocol).ok();

        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::MissingCredential)));
        registry.assert_async().await;
    }
}
