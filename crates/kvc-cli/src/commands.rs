use std::io::Write;

use anyhow::{bail, Context};
use colored::Colorize;

use kvc_connector::Connector;
use kvc_metadata::{DirectoryResources, EmbeddedResources, LayeredResources, PayloadKind};
use kvc_store::RedisClientFactory;
use kvc_types::{
    CollectingResponse, ConnectorConfig, ItemId, ObjectDataItem, ObjectIdItem, OperationResult,
    OperationStatus, OperationType, Request, Role, Verb, PROP_FIELD, PROP_KEY, PROP_TTL,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => ConnectorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConnectorConfig::default(),
    };
    if let Some(hosts) = cli.hosts {
        config.hosts = hosts;
    }
    let connector = build_connector(&config)?;
    let mut out = std::io::stdout().lock();
    dispatch(&connector, cli.command, &mut out)
}

fn build_connector(config: &ConnectorConfig) -> anyhow::Result<Connector> {
    let mut resources = LayeredResources::new();
    if let Some(dir) = &config.metadata_dir {
        resources = resources.with_layer(DirectoryResources::new(dir));
    }
    let resources = resources.with_layer(EmbeddedResources);
    Ok(Connector::new(config.properties(), RedisClientFactory, resources)?)
}

pub fn dispatch(connector: &Connector, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Types => cmd_types(connector, out),
        Command::Definitions(args) => cmd_definitions(connector, args, out),
        Command::Ping => cmd_ping(connector, out),
        Command::Get(args) => cmd_get(connector, args, out),
        Command::Upsert(args) => cmd_upsert(connector, args, out),
        Command::Delete(args) => cmd_delete(connector, args, out),
    }
}

fn cmd_types(connector: &Connector, out: &mut impl Write) -> anyhow::Result<()> {
    for info in connector.browser().object_types()? {
        writeln!(out, "{}  {}", info.id.to_string().bold(), info.label)?;
        if let Some(help) = &info.help_text {
            writeln!(out, "  {}", help.dimmed())?;
        }
    }
    Ok(())
}

fn cmd_definitions(
    connector: &Connector,
    args: DefinitionsArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let operation: OperationType = args.operation.parse()?;
    let definitions = connector.browser().object_definitions(
        &args.object_type,
        operation,
        args.custom.as_deref(),
        &Role::BOTH,
    )?;
    for def in definitions {
        let kind = match def.payload_kind() {
            PayloadKind::Json => "json".green(),
            PayloadKind::Binary => "binary".yellow(),
        };
        writeln!(out, "{:<7} {}", def.role.value(), kind)?;
        if let Some(schema) = def.schema.schema() {
            writeln!(out, "{}", indent(&format!("{schema:#}")))?;
        }
    }
    Ok(())
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cmd_ping(connector: &Connector, out: &mut impl Write) -> anyhow::Result<()> {
    connector.browser().test_connection()?;
    writeln!(out, "{} {}", "✓".green().bold(), connector.topology())?;
    Ok(())
}

fn cmd_get(connector: &Connector, args: GetArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let items = id_items(&args.ids, args.field.as_deref());
    run(connector, &args.object_type, Verb::Get, Request::Get(items), out)
}

fn cmd_upsert(connector: &Connector, args: UpsertArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let data = match (&args.data, &args.file) {
        (Some(data), _) => data.clone().into_bytes(),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => bail!("one of --data or --file is required"),
    };
    let mut item = ObjectDataItem::new(ItemId(1), data).with_property(PROP_KEY, &args.key);
    if let Some(ttl) = &args.ttl {
        item = item.with_property(PROP_TTL, ttl);
    }
    run(connector, &args.object_type, Verb::Upsert, Request::Upsert(vec![item]), out)
}

fn cmd_delete(connector: &Connector, args: DeleteArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let items = id_items(&args.ids, args.field.as_deref());
    run(connector, &args.object_type, Verb::Delete, Request::Delete(items), out)
}

fn id_items(ids: &[String], field: Option<&str>) -> Vec<ObjectIdItem> {
    ids.iter()
        .zip(1u64..)
        .map(|(id, n)| {
            let item = ObjectIdItem::new(ItemId(n), id.clone());
            match field {
                Some(field) => item.with_property(PROP_FIELD, field),
                None => item,
            }
        })
        .collect()
}

fn run(
    connector: &Connector,
    object_type: &str,
    verb: Verb,
    request: Request,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let operation = connector.operation(object_type, verb)?;
    let mut sink = CollectingResponse::new();
    operation.execute(request, &mut sink)?;
    for result in sink.results() {
        writeln!(out, "{}", render(result))?;
    }
    Ok(())
}

fn render(result: &OperationResult) -> String {
    let status = match result.status {
        OperationStatus::Success => result.code.to_string().green(),
        OperationStatus::ApplicationError => result.code.to_string().yellow(),
        OperationStatus::Failure => result.code.to_string().red(),
    };
    let mut line = format!("{} {}", result.item.to_string().dimmed(), status.bold());
    if let Some(message) = &result.message {
        line.push_str(&format!(" {message}"));
    }
    if let Some(payload) = &result.payload {
        if let Some(ttl) = payload.ttl() {
            line.push_str(&format!(" (ttl {ttl}s)"));
        }
        line.push_str(&format!(" {}", payload.text()));
    }
    line
}
