//! # xds
//!
//! Command-line front end for the XML Document Store. Documents live in a
//! JSON store file; every `node` subcommand maps onto one
//! [`NodeOperation`].

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xds_db::{
    DbError, DocumentId, DocumentPatch, FileDocumentStore, Lookup, NodeOperation, OperationOutput,
    XmlService,
};
use xds_query::Locator;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "xds")]
#[command(about = "XML Document Store: keep XML documents and edit them node by node")]
#[command(version)]
struct Cli {
    /// Store file
    #[arg(long, env = "XDS_STORE", default_value = "xds-store.json", global = true)]
    store: PathBuf,

    /// Log filter (e.g. `debug`, `xds_db=trace`)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new document
    Create {
        title: String,
        /// Inline XML content
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        xml: Option<String>,
        /// Read the content from a file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, short, default_value = "")]
        description: String,
    },
    /// Print a document, indented
    Show {
        #[arg(required_unless_present = "title", conflicts_with = "title")]
        id: Option<u64>,
        #[arg(long)]
        title: Option<String>,
        /// Print the stored form instead of the indented one
        #[arg(long)]
        raw: bool,
    },
    /// List all documents
    List,
    /// Change title, description or content
    Modify {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, conflicts_with = "file")]
        xml: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete one document
    Delete { id: u64 },
    /// Delete every document
    DeleteAll,
    /// Number of stored documents
    Count,
    /// Check that the store is reachable
    Ping,
    /// Read or edit nodes of one document
    Node(NodeArgs),
}

#[derive(Args)]
struct NodeArgs {
    /// Document id
    id: u64,
    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: NodeCommand,
}

#[derive(Subcommand)]
enum NodeCommand {
    /// Whether the locator matches anything
    Exists { locator: String },
    /// XML of all matches, concatenated
    Xml { locator: String },
    /// Text of the first match
    Text { locator: String },
    /// XML of each match
    AllXml { locator: String },
    /// Text of each match
    AllText { locator: String },
    /// Attributes of the first match
    Attributes { locator: String },
    /// One record per match, fields given as relative locators
    Structured {
        locator: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// One attribute of the first match
    Attribute { locator: String, name: String },
    /// Matches carrying an attribute (optionally with a value)
    WithAttribute {
        locator: String,
        name: String,
        value: Option<String>,
    },
    /// Append XML as the last child of the first match
    Add { parent: String, xml: String },
    /// Replace the text of the first match
    EditText { locator: String, text: String },
    /// Rename the first match
    Rename { locator: String, name: String },
    /// Set an attribute on the first match
    AddAttribute {
        locator: String,
        name: String,
        value: String,
    },
    /// Remove an attribute from the first match
    RemoveAttribute { locator: String, name: String },
    /// Delete every match
    Delete { locator: String },
}

impl From<NodeCommand> for NodeOperation {
    fn from(command: NodeCommand) -> Self {
        match command {
            NodeCommand::Exists { locator } => NodeOperation::Exists { locator },
            NodeCommand::Xml { locator } => NodeOperation::GetXml { locator },
            NodeCommand::Text { locator } => NodeOperation::GetText { locator },
            NodeCommand::AllXml { locator } => NodeOperation::GetAllXml { locator },
            NodeCommand::AllText { locator } => NodeOperation::GetAllText { locator },
            NodeCommand::Attributes { locator } => NodeOperation::GetAttributes { locator },
            NodeCommand::Structured { locator, fields } => {
                NodeOperation::GetStructured { locator, fields }
            }
            NodeCommand::Attribute { locator, name } => NodeOperation::GetAttribute { locator, name },
            NodeCommand::WithAttribute { locator, name, value } => {
                NodeOperation::GetWithAttribute { locator, name, value }
            }
            NodeCommand::Add { parent, xml } => NodeOperation::AddNode { parent, xml },
            NodeCommand::EditText { locator, text } => NodeOperation::EditText { locator, text },
            NodeCommand::Rename { locator, name } => NodeOperation::Rename { locator, name },
            NodeCommand::AddAttribute { locator, name, value } => {
                NodeOperation::AddAttribute { locator, name, value }
            }
            NodeCommand::RemoveAttribute { locator, name } => {
                NodeOperation::RemoveAttribute { locator, name }
            }
            NodeCommand::Delete { locator } => NodeOperation::Delete { locator },
        }
    }
}

// ─── Output helpers ────────────────────────────────────────────────────────

fn ok(text: &str) {
    println!("{} {}", "✓".bright_green().bold(), text);
}

fn no(text: &str) {
    println!("{} {}", "✗".bright_yellow().bold(), text);
}

fn print_output(output: &OperationOutput) {
    match output {
        OperationOutput::Bool(true) => ok("yes"),
        OperationOutput::Bool(false) => no("no match"),
        OperationOutput::Value(value) => println!("{}", value),
        OperationOutput::Text(lookup) => match lookup {
            Lookup::Found(text) => println!("{}", text),
            Lookup::Empty => no("(empty)"),
            Lookup::NotFound => no("no match"),
        },
        OperationOutput::List(lookup) => match lookup {
            Lookup::Found(items) => {
                for (i, item) in items.iter().enumerate() {
                    println!("{} {}", format!("[{}]", i + 1).dimmed(), item);
                }
            }
            Lookup::Empty => no("(none pass the filter)"),
            Lookup::NotFound => no("no match"),
        },
        OperationOutput::Attributes(lookup) => match lookup {
            Lookup::Found(attributes) => {
                for (name, value) in attributes {
                    println!("{} = {}", name.bright_cyan(), value);
                }
            }
            Lookup::Empty => no("(no attributes)"),
            Lookup::NotFound => no("no match"),
        },
        OperationOutput::Records(records) => {
            for (i, record) in records.iter().enumerate() {
                println!("{}", format!("#{}", i + 1).bold());
                for (field, value) in record {
                    println!("  {} = {}", field.bright_cyan(), value);
                }
            }
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────

fn run(cli: Cli) -> Result<(), DbError> {
    let service = XmlService::new(FileDocumentStore::new(&cli.store));
    debug!(store = %cli.store.display(), "store opened");

    match cli.command {
        Commands::Create {
            title,
            xml,
            file,
            description,
        } => {
            let id = match (xml, file) {
                (_, Some(path)) => service.create_document_from_file(&title, &description, path)?,
                (xml, None) => {
                    service.create_document(&title, &description, &xml.unwrap_or_default())?
                }
            };
            ok(&format!("created document {}", id.to_string().bold()));
        }
        Commands::Show { id, title, raw } => {
            let document = match (id, title) {
                (_, Some(title)) => service.get_document_by_title(&title)?,
                (id, None) => service.get_document(DocumentId(id.unwrap_or_default()))?,
            };
            println!(
                "{} {}  {}",
                format!("#{}", document.id).bright_cyan().bold(),
                document.title.bold(),
                format!("v{}", document.version).dimmed()
            );
            if !document.description.is_empty() {
                println!("{}", document.description.dimmed());
            }
            if raw {
                println!("{}", document.content);
            } else {
                print!("{}", service.pretty_content(document.id)?);
            }
        }
        Commands::List => {
            let documents = service.get_all_documents()?;
            if documents.is_empty() {
                println!("{}", "(no documents)".dimmed());
            }
            for doc in documents {
                println!(
                    "{:>5}  {}  {}  {}",
                    doc.id.to_string().bright_cyan(),
                    doc.title.bold(),
                    format!("v{}", doc.version).dimmed(),
                    doc.description
                );
            }
        }
        Commands::Modify {
            id,
            title,
            description,
            xml,
            file,
        } => {
            let content = match (xml, file) {
                (_, Some(path)) => Some(std::fs::read_to_string(path)?),
                (xml, None) => xml,
            };
            let patch = DocumentPatch {
                title,
                description,
                content,
            };
            service.modify_document(DocumentId(id), patch)?;
            ok(&format!("modified document {}", id));
        }
        Commands::Delete { id } => {
            if service.delete_document(DocumentId(id))? {
                ok(&format!("deleted document {}", id));
            } else {
                no(&format!("no document {}", id));
            }
        }
        Commands::DeleteAll => {
            let removed = service.delete_all_documents()?;
            ok(&format!("deleted {} document(s)", removed));
        }
        Commands::Count => println!("{}", service.count_documents()?),
        Commands::Ping => {
            if service.check_connection() {
                ok(&format!("store reachable at {}", cli.store.display()));
            } else {
                no(&format!("store unreachable at {}", cli.store.display()));
                process::exit(2);
            }
        }
        Commands::Node(args) => {
            let operation = NodeOperation::from(args.command);
            if let Err(err) = Locator::parse(operation.locator()) {
                eprintln!(
                    "{} locator {:?} does not parse ({}); it matches nothing",
                    "!".bright_yellow().bold(),
                    operation.locator(),
                    err
                );
            }
            let output = service.execute(DocumentId(args.id), operation)?;
            if args.json {
                let json = serde_json::to_string_pretty(&output)
                    .map_err(|err| DbError::Io(err.to_string()))?;
                println!("{}", json);
            } else {
                print_output(&output);
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {}", "error:".bright_red().bold(), err);
        process::exit(1);
    }
}
