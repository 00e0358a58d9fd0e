// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use easel::{
    EaselError, ErrorReporter, MessageInput, MessageMetadata, PipelineConfig, RenderPipeline,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "easel-render", about = "Turn a response text into chart and table specs")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// File holding the message text; stdin when omitted.
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// The user's question, used for chart-type cues.
    #[arg(long, global = true)]
    query: Option<String>,

    #[arg(long, global = true)]
    file_name: Option<String>,

    #[arg(long, global = true)]
    content_type: Option<String>,

    /// YAML pipeline config; falls back to EASEL_CONFIG_PATH, then defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    pretty: bool,

    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Full pipeline: classification, sections, chart and table.
    Render,
    /// Classification only.
    Classify,
    /// Print the effective configuration as YAML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let reporter = if cli.no_color {
        ErrorReporter::plain()
    } else {
        ErrorReporter::new()
    };

    let pipeline = match load_config(cli.config.as_deref())
        .map_err(EaselError::from)
        .and_then(RenderPipeline::with_config)
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{}", reporter.report(&e));
            std::process::exit(1);
        }
    };

    match cli.cmd.clone().unwrap_or(Command::Render) {
        Command::Config => {
            print!("{}", serde_yaml::to_string(pipeline.config())?);
            Ok(())
        }
        Command::Classify => {
            let message = read_message(&cli)?;
            let classification = pipeline.classify(&message);
            println!("{}", to_json(&classification, cli.pretty)?);
            Ok(())
        }
        Command::Render => {
            let message = read_message(&cli)?;
            let outcome = pipeline.render(&message, cli.query.as_deref());
            info!(
                category = %outcome.classification.category,
                chart = outcome.chart.as_ref().map(|c| c.family.as_str()).unwrap_or("none"),
                table = outcome.table.is_some(),
                "rendered message"
            );
            match outcome.to_json(cli.pretty) {
                Ok(json) => {
                    println!("{json}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{}", reporter.report(&e));
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_yaml_file(path),
        None => PipelineConfig::from_env(),
    }
}

fn read_message(cli: &Cli) -> Result<MessageInput> {
    let content = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading message from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading message from stdin")?;
            buf
        }
    };
    let metadata = MessageMetadata {
        file_name: cli.file_name.clone(),
        content_type: cli.content_type.clone(),
        ..MessageMetadata::default()
    };
    Ok(MessageInput::new(content).with_metadata(metadata))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
