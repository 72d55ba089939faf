#![warn(clippy::unwrap_used, clippy::expect_used)]

mod config;
mod errors;
mod loader;
mod script;
mod util;

use crate::config::{Config, LogFormat, LogLevel, MutateCommand};
use crate::errors::{AppError, Result};
use crate::loader::Collections;
use crate::script::{register_audit_callbacks, ScriptRunner};
use forms::{FormConfig, FormWrapper, FragmentRegistry};
use gateway::{callbacks::Callbacks, Context};
use std::{
    fs::File,
    io::{self, BufReader, Write},
    sync::Arc,
};
use store::MemoryStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new()?;
    setup_tracing(config.log_level, config.log_format)?;

    let collections_dir =
        util::get_collections_dir(&config.root_dir, config.collections_dir.as_deref())
            .ok_or(AppError::CollectionsDir)?;
    let collections = loader::load_collections(&collections_dir)?;

    match config.command {
        Some(MutateCommand::Run { script }) => run_script(&collections, &script).await,
        Some(MutateCommand::Form {
            collection,
            document_id,
            fields,
            added_fields,
        }) => {
            let collection = collections
                .get(&collection)
                .cloned()
                .ok_or(AppError::CollectionNotFound(collection))?;

            let mut form = FormConfig::new(collection).added_fields(added_fields);
            if let Some(id) = document_id {
                form = form.document_id(id);
            }
            if let Some(fields) = fields {
                form = form.fields(fields);
            }

            print_form(&FormWrapper::build(&form, &FragmentRegistry::new())?)
        }
        None => {
            warn!("no command given, run with --help for usage");
            Ok(())
        }
    }
}

fn setup_tracing(log_level: LogLevel, log_format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::builder().parse(log_level.as_directive()))?;

    // stdout carries results, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    match log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
    }

    Ok(())
}

async fn run_script(collections: &Collections, script: &str) -> Result<()> {
    let callbacks = Callbacks::new();
    register_audit_callbacks(&callbacks, collections)?;
    let context = Context::new(MemoryStore::new()).with_callbacks(Arc::new(callbacks));

    let mut runner = ScriptRunner::new(collections, context);
    let mut stdout = io::stdout().lock();
    let summary = if script == "-" {
        runner.run(io::stdin().lock(), &mut stdout).await?
    } else {
        runner
            .run(BufReader::new(File::open(script)?), &mut stdout)
            .await?
    };
    stdout.flush()?;

    info!(script, succeeded = summary.succeeded, failed = summary.failed, "done");
    Ok(())
}

fn print_form(wrapper: &FormWrapper) -> Result<()> {
    let output = serde_json::json!({
        "form": wrapper,
        "graphql": {
            "query": wrapper.query_fragment().to_graphql(),
            "mutation": wrapper.mutation_fragment().to_graphql(),
        },
    });

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)?;
    writeln!(stdout)?;
    Ok(())
}
