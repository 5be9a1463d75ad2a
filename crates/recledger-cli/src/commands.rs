use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use recledger_core::{
    default_records, Dispatcher, Function, Invocation, LedgerLayout, Response, SeedPolicy,
};
use recledger_store::DurableWorldState;
use serde_json::Value;
use tracing::debug;

use crate::cli::*;
use crate::config::AppConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?.with_data_dir(cli.data_dir);
    let layout = config.ledger.layout()?;
    debug!(
        data_dir = %config.storage.data_dir.display(),
        prefix = layout.keys.prefix(),
        "configuration loaded"
    );
    let state = DurableWorldState::open(&config.storage)
        .with_context(|| format!("opening {}", config.storage.log_path().display()))?;

    let format = cli.format;
    let force = matches!(&cli.command, Command::Init(args) if args.force);
    let invocation = match cli.command {
        Command::Compact => return cmd_compact(&state, format),
        Command::Init(_) => Invocation::new(Function::InitLedger.name(), Vec::<String>::new()),
        Command::Create(args) => create_invocation(&layout, args)?,
        Command::Read(args) => Invocation::new(Function::QueryRecord.name(), [args.key]),
        Command::List(args) => list_invocation(args),
        Command::Update(args) => Invocation::new(
            Function::ChangeRecordField.name(),
            [args.key, args.field, args.value],
        ),
        Command::Invoke(args) => Invocation::from_json(&args.invocation)?,
    };

    let response = dispatcher(&state, &layout, &config, force)?.invoke(&invocation);
    report(&invocation.function, response, format)
}

/// Dispatcher seeding the `[seed]` record set with the `[seed]` policy.
/// `force` (from `init --force`) switches the policy to overwrite.
fn dispatcher<'a>(
    state: &'a DurableWorldState,
    layout: &'a LedgerLayout,
    config: &AppConfig,
    force: bool,
) -> anyhow::Result<Dispatcher<'a, DurableWorldState>> {
    let policy = if force {
        SeedPolicy::Overwrite
    } else {
        config.ledger.seed.policy
    };
    let records = config.seed_records()?.unwrap_or_else(default_records);
    Ok(Dispatcher::new(state, layout).with_seed(records, policy))
}

fn cmd_compact(state: &DurableWorldState, format: OutputFormat) -> anyhow::Result<ExitCode> {
    state.compact()?;
    let keys = state.len()?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "ok", "keys": keys }))
        }
        OutputFormat::Text => {
            println!("{} Commit log compacted ({} keys)", "✓".green().bold(), keys)
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// `create` takes `field=value` pairs; `CreateRecord` takes the values in
/// schema order.
fn create_invocation(layout: &LedgerLayout, args: CreateArgs) -> anyhow::Result<Invocation> {
    let mut given = BTreeMap::new();
    for pair in &args.fields {
        let Some((field, value)) = pair.split_once('=') else {
            bail!("expected field=value, got {pair:?}");
        };
        if given.insert(field, value).is_some() {
            bail!("field {field} given twice");
        }
    }

    let mut values = vec![args.index.clone()];
    for field in layout.schema.fields() {
        match given.remove(field.as_str()) {
            Some(value) => values.push(value.to_string()),
            None => bail!("missing field {field}"),
        }
    }
    if let Some(field) = given.keys().next() {
        bail!("unknown field {field}");
    }
    Ok(Invocation::new(Function::CreateRecord.name(), values))
}

fn list_invocation(args: ListArgs) -> Invocation {
    if args.start.is_none() && args.end.is_none() {
        return Invocation::new(Function::QueryAllRecords.name(), Vec::<String>::new());
    }
    Invocation::new(
        Function::QueryRecordsByRange.name(),
        [args.start.unwrap_or_default(), args.end.unwrap_or_default()],
    )
}

fn report(function: &str, response: Response, format: OutputFormat) -> anyhow::Result<ExitCode> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        let code = if response.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
        return Ok(code);
    }

    match response {
        Response::Ok { payload } => {
            print_payload(function, &payload);
            Ok(ExitCode::SUCCESS)
        }
        Response::Error { error } => {
            eprintln!(
                "{} {}: {}",
                "error:".red().bold(),
                error.kind.to_string().yellow(),
                error.message
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_payload(function: &str, payload: &Value) {
    match payload {
        Value::Null => println!("{} {}", "✓".green().bold(), function),
        Value::Array(results) if results.is_empty() => println!("No records."),
        Value::Array(results) => {
            for result in results {
                println!("{}", result["Key"].as_str().unwrap_or_default().yellow().bold());
                print_fields(&result["Record"]);
            }
        }
        Value::Object(map) if map.contains_key("seeded") => {
            if map["skipped"] == true {
                println!("Ledger already populated; nothing seeded.");
            } else {
                println!("{} Seeded {} records", "✓".green().bold(), map["seeded"]);
            }
        }
        Value::Object(_) => print_fields(payload),
        other => println!("{other}"),
    }
}

fn print_fields(record: &Value) {
    if let Some(fields) = record.as_object() {
        for (field, value) in fields {
            println!("  {}: {}", field.cyan(), value.as_str().unwrap_or_default());
        }
    }
}
