//! CLI entry point for opengin-x.
//!
//! Explore the knowledge graph behind the read API, browse the legislative
//! acts dataset and run the analysis service from the terminal.

use acts::ActStore;
use anyhow::{Context, Result, bail};
use api_client::{
    AnalysisClient, CallLog, CancellationToken, QueryParams, QueryType, ReadApiClient,
    analysis_file_name, to_pretty_json,
};
use clap::{Parser, Subcommand};
use core_types::{AttributeValueData, Config, ExploreResult};
use protobuf_values::{decode_protobuf_values, has_protobuf_values};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use web_types::ActFilter;

/// opengin: explorer and acts viewer for OpenGIN data
#[derive(Parser)]
#[command(name = "opengin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Read API base URL (overrides config and OPENGIN_UPSTREAM_URL)
    #[arg(long, global = true)]
    upstream_url: Option<String>,

    /// Analysis service base URL
    #[arg(long, global = true)]
    analysis_url: Option<String>,

    /// Acts dataset JSON file
    #[arg(long, global = true)]
    acts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to bind, e.g. 127.0.0.1:3000
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory of a prebuilt front end
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Directory holding <doc_id>.pdf files
        #[arg(long)]
        pdf_dir: Option<PathBuf>,
    },

    /// Decode wrapped protobuf string values in a JSON document
    Decode {
        /// JSON file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Only report whether the document contains wrapped values
        #[arg(long)]
        check: bool,
    },

    /// Run a query against the read API
    Query {
        /// Query type (search, metadata, attributes, relations, explore)
        query_type: QueryType,

        /// Entity ID
        #[arg(short, long)]
        entity: Option<String>,

        /// Kind major (search)
        #[arg(long)]
        kind_major: Option<String>,

        /// Kind minor (search)
        #[arg(long)]
        kind_minor: Option<String>,

        /// Entity name (search)
        #[arg(short, long)]
        name: Option<String>,

        /// Attribute name (attributes)
        #[arg(short, long)]
        attribute: Option<String>,

        #[arg(long)]
        start_time: Option<String>,

        #[arg(long)]
        end_time: Option<String>,

        /// Attribute fields to return (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Relation ID (relations)
        #[arg(long)]
        relation_id: Option<String>,

        /// Related entity ID (relations)
        #[arg(long)]
        related_entity: Option<String>,

        /// Relation name (relations)
        #[arg(long)]
        relation_name: Option<String>,

        /// Relation direction (relations)
        #[arg(long)]
        direction: Option<String>,

        /// Point in time the relation must be active at (relations)
        #[arg(long)]
        active_at: Option<String>,

        /// Print the response as received, without decoding
        #[arg(long)]
        raw: bool,

        /// Print the cURL command of every call made
        #[arg(long)]
        curl: bool,
    },

    /// Discover the attribute categories of an entity
    Explore {
        /// Entity ID
        id: String,

        /// Also fetch and print this attribute's table
        #[arg(short, long)]
        attribute: Option<String>,

        /// Print the cURL command of every call made
        #[arg(long)]
        curl: bool,
    },

    /// Browse the acts dataset
    Acts {
        #[command(subcommand)]
        command: ActsCommand,
    },

    /// Analyse an act with the analysis service
    Analyze {
        /// Document ID of the act
        doc_id: String,

        /// API key forwarded to the analysis service
        #[arg(long, env = "OPENGIN_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Save the result as <doc_id>-analysis-<date>.json in this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ActsCommand {
    /// List acts
    List {
        /// Text to look for in id, number and description
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        year: Option<String>,

        #[arg(short, long)]
        domain: Option<String>,

        #[arg(short = 't', long)]
        doc_type: Option<String>,
    },

    /// Show a single act
    Show {
        /// Document ID
        id: String,
    },

    /// Show dataset totals
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warn".parse()?)
                .add_directive("server=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_unvalidated().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Serve { .. } => {
            server::serve(config).await?;
        }
        Commands::Decode { file, check } => {
            decode_document(file.as_deref(), check)?;
        }
        Commands::Query {
            query_type,
            entity,
            kind_major,
            kind_minor,
            name,
            attribute,
            start_time,
            end_time,
            fields,
            relation_id,
            related_entity,
            relation_name,
            direction,
            active_at,
            raw,
            curl,
        } => {
            let params = QueryParams {
                query_type,
                entity_id: entity,
                kind_major,
                kind_minor,
                entity_name: name,
                attribute_name: attribute,
                start_time,
                end_time,
                fields,
                relation_id,
                related_entity_id: related_entity,
                relation_name,
                direction,
                active_at,
            };
            run_query(&config, &params, raw, curl).await?;
        }
        Commands::Explore {
            id,
            attribute,
            curl,
        } => {
            explore(&config, &id, attribute.as_deref(), curl).await?;
        }
        Commands::Acts { command } => {
            let store = ActStore::load(&config.acts.data_file)?;
            match command {
                ActsCommand::List {
                    search,
                    year,
                    domain,
                    doc_type,
                } => list_acts(
                    &store,
                    &ActFilter {
                        search,
                        year,
                        domain,
                        doc_type,
                    },
                ),
                ActsCommand::Show { id } => show_act(&store, &config, &id)?,
                ActsCommand::Stats => show_stats(&store),
            }
        }
        Commands::Analyze {
            doc_id,
            api_key,
            save,
        } => {
            analyze(&config, &doc_id, &api_key, save.as_deref()).await?;
        }
    }

    Ok(())
}

/// Apply the global command line overrides on top of file and env config.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref url) = cli.upstream_url {
        config.upstream.base_url = url.clone();
    }
    if let Some(ref url) = cli.analysis_url {
        config.analysis.base_url = url.clone();
    }
    if let Some(ref file) = cli.acts_file {
        config.acts.data_file = file.clone();
    }

    if let Commands::Serve {
        bind,
        static_dir,
        pdf_dir,
    } = &cli.command
    {
        if let Some(bind) = bind {
            config.server.bind = bind.clone();
        }
        if static_dir.is_some() {
            config.server.static_dir = static_dir.clone();
        }
        if let Some(dir) = pdf_dir {
            config.acts.pdf_dir = dir.clone();
        }
    }
}

fn read_client(config: &Config) -> Result<ReadApiClient> {
    ReadApiClient::with_log(
        &config.upstream.base_url,
        Duration::from_secs(config.upstream.timeout_secs),
        CallLog::new(config.upstream.call_log_capacity),
    )
    .with_context(|| format!("Invalid read API URL: {}", config.upstream.base_url))
}

fn decode_document(file: Option<&Path>, check: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let value: Value = serde_json::from_str(&text).context("Input is not valid JSON")?;

    if check {
        println!("{}", has_protobuf_values(&value));
    } else {
        println!("{}", serde_json::to_string_pretty(&decode_protobuf_values(value))?);
    }
    Ok(())
}

async fn run_query(config: &Config, params: &QueryParams, raw: bool, curl: bool) -> Result<()> {
    let client = read_client(config)?;
    let response = client.run_query(params).await?;

    println!("{} {}", response.method, response.endpoint);
    println!("Status: {}", response.status);
    if let Some(ref body) = response.request_body {
        println!("Request body: {}", serde_json::to_string(body)?);
    }
    if let Some(ref error) = response.error {
        println!("Error: {error}");
    }
    println!();

    let data = if raw {
        response.data
    } else {
        if has_protobuf_values(&response.data) {
            println!("(protobuf values decoded)");
        }
        decode_protobuf_values(response.data)
    };
    println!("{}", serde_json::to_string_pretty(&data)?);

    if curl {
        print_calls(client.call_log()).await;
    }
    if response.error.is_some() {
        bail!("Query failed");
    }
    Ok(())
}

async fn explore(config: &Config, id: &str, attribute: Option<&str>, curl: bool) -> Result<()> {
    let client = read_client(config)?;

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("Exploring {id}...");
    let result = client.explore_entity(id, Some(&token)).await;
    print_explore(&result);

    if let Some(attribute) = attribute
        && result.error.is_none()
    {
        println!();
        match client.get_attribute_value(id, attribute).await {
            Some(table) => print_table(attribute, &table)?,
            None => println!("Attribute {attribute}: no data"),
        }
    }

    if curl {
        print_calls(client.call_log()).await;
    }
    if let Some(error) = result.error {
        bail!("Explore failed: {error}");
    }
    Ok(())
}

fn print_explore(result: &ExploreResult) {
    if result.categories.is_empty() {
        println!("No categories found for {}", result.entity_id);
        return;
    }

    println!(
        "{} categories ({} relations):",
        result.categories.len(),
        result.relations.len()
    );
    for category in &result.categories {
        let kind = match category.kind.minor {
            Some(ref minor) => format!("{}/{}", category.kind.major, minor),
            None => category.kind.major.clone(),
        };
        println!(
            "  {:<40} {:<24} {} since {}",
            category.name, kind, category.id, category.start_time
        );
    }
}

fn print_table(attribute: &str, table: &AttributeValueData) -> Result<()> {
    println!("Attribute {attribute}:");
    if !table.is_tabular() {
        println!("{}", serde_json::to_string_pretty(&table.raw)?);
        return Ok(());
    }

    println!("  {}", table.columns.join(" | "));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }
    Ok(())
}

async fn print_calls(log: &CallLog) {
    let mut calls = log.list().await;
    // oldest first reads like a transcript
    calls.reverse();

    println!();
    println!("=== API calls ({}) ===", calls.len());
    for call in calls {
        let outcome = match (call.status, call.error) {
            (Some(status), _) => status.to_string(),
            (None, Some(error)) => format!("error: {error}"),
            (None, None) => "pending".to_string(),
        };
        println!(
            "# {} {} -> {} ({} ms)",
            call.method,
            call.url,
            outcome,
            call.duration_ms.unwrap_or_default()
        );
        println!("{}", call.curl);
    }
}

fn list_acts(store: &ActStore, filter: &ActFilter) {
    let acts = store.list(filter);
    println!("Found {} acts:", acts.len());
    println!();

    for act in acts {
        println!(
            "  {:<12} {:<12} {:<16} {}",
            act.doc_id,
            act.year().unwrap_or("-"),
            act.domain,
            act.description
        );
    }
}

fn show_act(store: &ActStore, config: &Config, id: &str) -> Result<()> {
    let act = store
        .get(id)
        .with_context(|| format!("Act not found: {id}"))?;
    let pdfs = acts::PdfLibrary::new(&config.acts.pdf_dir);

    println!("=== {} ===", act.doc_id);
    println!("Number:      {}", act.num);
    println!("Type:        {}", act.doc_type);
    println!("Date:        {}", act.date_str);
    println!("Domain:      {}", act.domain);
    println!("Language:    {}", act.lang);
    println!();
    println!("{}", act.description);
    println!();
    println!("Metadata:    {}", act.url_metadata);
    println!("Source PDF:  {}", act.url_pdf);
    match pdfs.path_for(&act.doc_id).filter(|p| p.is_file()) {
        Some(path) => println!("Local PDF:   {}", path.display()),
        None => println!("Local PDF:   (missing) {}", acts::pdf_url(&act.doc_id)),
    }

    Ok(())
}

fn show_stats(store: &ActStore) {
    let stats = store.stats();
    println!("Total acts: {}", stats.total);

    for (title, entries) in [
        ("By year", &stats.by_year),
        ("By domain", &stats.by_domain),
        ("By type", &stats.by_doc_type),
    ] {
        println!();
        println!("{title}:");
        for entry in entries {
            println!("  {:<24} {}", entry.key, entry.count);
        }
    }
}

async fn analyze(config: &Config, doc_id: &str, api_key: &str, save: Option<&Path>) -> Result<()> {
    if api_key.trim().is_empty() {
        bail!("API key is required");
    }

    let client = AnalysisClient::new(&config.analysis)?;
    println!("Analyzing {doc_id} via {}...", client.base_url());
    let result = client.analyze(doc_id, api_key.trim()).await?;

    if let Some(ref summary) = result.summary {
        println!();
        println!("Summary:");
        println!("{summary}");
    }
    if !result.referenced_acts.is_empty() {
        println!();
        println!("Referenced acts:");
        for act in &result.referenced_acts {
            println!("  - {act}");
        }
    }
    if let Some(ref sections) = result.sections {
        println!();
        println!("Sections ({}):", sections.len());
        for section in sections {
            println!("  [{}] {}", section.section_number, section.content);
            for note in &section.footnotes {
                println!("      * {note}");
            }
        }
    } else if result.is_legacy() {
        println!();
        println!(
            "Amendment type: {}",
            result.amendment_type.as_deref().unwrap_or("-")
        );
        if let Some(ref amended) = result.amended_sections {
            println!("Amended sections: {}", serde_json::to_string_pretty(amended)?);
        }
    }

    if let Some(dir) = save {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(analysis_file_name(doc_id, chrono::Local::now().date_naive()));
        std::fs::write(&path, to_pretty_json(&result)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!();
        println!("Saved analysis to {}", path.display());
    }

    Ok(())
}
