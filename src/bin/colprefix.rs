//! colprefix: column lists from the command line
//!
//! Renders prefixed column lists for models described in a catalog file.
//!
//! # Usage
//!
//! ```bash
//! # Column list for a model
//! colprefix --catalog models.toml render User --alias u
//!
//! # Only the Address join, aliased, inside a query
//! colprefix render User -a u -j 'Address:a' -t 'SELECT {columns} FROM users u'
//!
//! # Inspect the normalized schema tree
//! colprefix explain Order --format json
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use colprefix::config::Config;
use colprefix::introspect::Introspector;
use colprefix::prelude::*;
use colprefix::render::trim_separator;
use colprefix::{SchemaNode, TypeInfo};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "colprefix")]
#[command(version)]
#[command(about = "Prefixed SQL column lists from nested models", long_about = None)]
#[command(after_help = "EXAMPLES:
    colprefix --catalog models.toml render User --alias u
    colprefix render User -a u -j 'Address:a' -t 'SELECT {columns} FROM users u'
    colprefix render Order -a o --custom 'COUNT(*) AS total'
    colprefix explain Order --format json")]
struct Cli {
    /// Model catalog file (TOML or JSON)
    #[arg(short, long, global = true, env = "COLPREFIX_CATALOG")]
    catalog: Option<PathBuf>,

    /// Config file [default: ./colprefix.toml, then the user config dir]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the column list of a model
    Render {
        /// Model name in the catalog
        model: String,

        /// Table alias of the model [default: lowercased model name]
        #[arg(short, long)]
        alias: Option<String>,

        /// Join directives, e.g. 'Address:a,Profile' (repeatable)
        #[arg(short, long)]
        join: Vec<String>,

        /// Raw column expressions appended to the list (repeatable)
        #[arg(long)]
        custom: Vec<String>,

        /// Query template; every {columns} is replaced by the list
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Show the normalized schema tree of a model
    Explain {
        /// Model name in the catalog
        model: String,

        /// Table alias of the model [default: lowercased model name]
        #[arg(short, long)]
        alias: Option<String>,
    },
    /// List the models in the catalog
    Models,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(cli.verbose, config.log.as_deref());

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.clone())
        .ok_or_else(|| anyhow!("No model catalog. Use --catalog, set COLPREFIX_CATALOG, or add `catalog` to colprefix.toml"))?;

    if cli.verbose {
        eprintln!("{} {}", "Catalog:".dimmed(), catalog_path.display());
    }

    let catalog = ModelCatalog::load(&catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let output = match &cli.command {
        Commands::Render {
            model,
            alias,
            join,
            custom,
            template,
        } => {
            let request = RenderRequest {
                model,
                alias: alias.clone().unwrap_or_else(|| default_alias(model)),
                joins: join,
                custom,
                template: template.as_deref(),
            };
            render(&catalog, &request, config.debug, cli.format)?
        }
        Commands::Explain { model, alias } => {
            let alias = alias.clone().unwrap_or_else(|| default_alias(model));
            explain(&catalog, model, &alias, cli.format)?
        }
        Commands::Models => list_models(&catalog, cli.format)?,
    };

    print!("{}", output);
    Ok(())
}

/// `--verbose` wins over the config file, which wins over `RUST_LOG`.
fn init_logging(verbose: bool, filter: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("colprefix=debug")
    } else if let Some(filter) = filter {
        EnvFilter::new(filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_alias(model: &str) -> String {
    model.to_lowercase()
}

struct RenderRequest<'a> {
    model: &'a str,
    alias: String,
    joins: &'a [String],
    custom: &'a [String],
    template: Option<&'a str>,
}

fn render(catalog: &ModelCatalog, request: &RenderRequest<'_>, debug: bool, format: OutputFormat) -> Result<String> {
    let info = catalog.type_info(request.model)?;

    let mut directives = Vec::new();
    for spec in request.joins {
        directives.extend(parse_directives(spec).with_context(|| format!("Invalid join directive '{spec}'"))?);
    }

    let mut prefixer = Prefixer::new();
    prefixer
        .set_debug(debug)
        .columns_of(&info, &request.alias, &directives);
    for custom in request.custom {
        prefixer.custom_columns(custom);
    }

    let tree = schema_tree(&prefixer, &info, &request.alias);
    for directive in unused_directives(&tree, &directives) {
        eprintln!(
            "{} join directive '{}' matches no model under {}",
            "⚠".yellow(),
            directive.model.yellow(),
            tree.name.cyan()
        );
    }

    let columns = trim_separator(prefixer.buffered()).to_string();
    let query = request.template.map(|template| prefixer.bind_columns(template));

    let out = match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "model": request.model,
                "alias": request.alias,
                "joins": directives.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
                "columns": columns,
                "query": query,
            });
            format!("{}\n", serde_json::to_string_pretty(&out)?)
        }
        OutputFormat::Text => format!("{}\n", query.unwrap_or(columns)),
    };

    Ok(out)
}

/// Directives that match no model in the tree. Legal, but usually typos.
fn unused_directives<'d>(tree: &SchemaNode, directives: &'d [JoinDirective]) -> Vec<&'d JoinDirective> {
    let mut names = HashSet::new();
    tree.walk(&mut |node| {
        names.insert(node.name.clone());
    });

    directives
        .iter()
        .filter(|d| !d.model.is_empty() && !names.contains(&d.model))
        .collect()
}

fn schema_tree(prefixer: &Prefixer, info: &TypeInfo, alias: &str) -> Arc<SchemaNode> {
    prefixer
        .cache()
        .get_or_build(info.key(), |excluded| Introspector::new(excluded).introspect_root(info, alias))
}

fn explain(catalog: &ModelCatalog, model: &str, alias: &str, format: OutputFormat) -> Result<String> {
    let info = catalog.type_info(model)?;
    let prefixer = Prefixer::new();
    let tree = schema_tree(&prefixer, &info, alias);

    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&*tree)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{} {}", tree.name.cyan().bold(), format!("(alias {})", alias).dimmed())?;
            write_fields(&mut out, &tree, 1)?;
            writeln!(out)?;
            writeln!(
                out,
                "{} column(s), {} type(s) kept as single columns",
                tree.leaf_count().to_string().cyan(),
                prefixer.cache_stats().excluded.to_string().cyan()
            )?;
        }
    }

    Ok(out)
}

fn write_fields(out: &mut String, node: &SchemaNode, depth: usize) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    for field in &node.fields {
        match &field.child {
            Some(child) => {
                writeln!(
                    out,
                    "{}▸ {} → {} {}",
                    indent,
                    field.column.white().bold(),
                    child.name.cyan(),
                    format!("(alias {}, path {})", child.table_alias, child.path_prefix).dimmed()
                )?;
                write_fields(out, child, depth + 1)?;
            }
            None => writeln!(out, "{}• {}", indent, field.column.white())?,
        }
    }
    Ok(())
}

fn list_models(catalog: &ModelCatalog, format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            let names: Vec<&str> = catalog.model_names().collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&names)?)?;
        }
        OutputFormat::Text => {
            if catalog.models.is_empty() {
                writeln!(out, "{}", "(no models)".dimmed())?;
            }
            for (name, spec) in &catalog.models {
                writeln!(out, "{:24} {}", name.cyan().bold(), format!("{} field(s)", spec.fields.len()).dimmed())?;
            }
        }
    }

    Ok(out)
}
