//! celsql: filter expressions to GoogleSQL
//!
//! # Usage
//!
//! ```bash
//! # Convert with variables declared inline
//! celsql 'name.startsWith("a") && age >= 18' --var name=string --var age=int
//!
//! # Use a config file and emit named parameters
//! celsql 'tags.existsEqualsCI(["rust", "go"])' --config celsql.toml --params
//!
//! # Show the typed tree
//! celsql explain 'pages.map(p, p.title)' --config celsql.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use celsql::ast::{Expr, ExprKind};
use celsql::filters::FilterFunction;
use celsql::prelude::*;
use celsql::transpiler::calls::builtin_functions;

#[derive(Parser)]
#[command(name = "celsql")]
#[command(version)]
#[command(about = "Convert typed filter expressions into BigQuery / Spanner SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    celsql 'name.startsWith(\"a\")' --var name=string
    celsql 'created_at == timestamp(0)' --var created_at=timestamp --dialect spanner
    celsql 'tags.existsEquals([\"a\", \"b\", \"c\", \"d\"])' --var 'tags=list<string>' --params")]
struct Cli {
    /// The expression to convert
    expression: Option<String>,

    /// Config file (defaults to <config dir>/celsql/config.toml)
    #[arg(short, long, env = "CELSQL_CONFIG")]
    config: Option<PathBuf>,

    /// Target dialect: bigquery or spanner
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// Declare a variable, e.g. `tags=list<string>`
    #[arg(long = "var", value_name = "NAME=TYPE")]
    vars: Vec<String>,

    /// Longest list the filter functions expand into OR'ed tests
    #[arg(long)]
    max_expand: Option<usize>,

    /// Emit named parameters and print their bindings
    #[arg(short, long)]
    params: bool,

    /// Print the variable and field paths the SQL reads
    #[arg(short, long)]
    idents: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, check and print the typed expression tree
    Explain {
        /// The expression to explain
        expression: String,
    },
    /// List the functions that have a SQL translation
    Functions,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { expression }) => explain(expression, &cli),
        Some(Commands::Functions) => {
            show_functions();
            Ok(())
        }
        None => match &cli.expression {
            Some(expression) => run(expression, &cli),
            None => {
                println!("{}", "celsql: filter expressions to GoogleSQL".cyan().bold());
                println!();
                println!("Usage: celsql <EXPRESSION> [OPTIONS]");
                println!();
                println!("Try: celsql --help");
                Ok(())
            }
        },
    };
    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "celsql=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The config named on the command line, or the default one, and the
/// directory its relative paths resolve against.
fn load_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            Ok((config, base))
        }
        None => {
            let base = Config::default_path()
                .and_then(|p| p.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            Ok((Config::load_default()?, base))
        }
    }
}

fn build_env(config: &Config, base_dir: &Path, cli: &Cli) -> Result<Env> {
    let mut env = config.env(base_dir)?;
    for spec in &cli.vars {
        let Some((name, ty)) = spec.split_once('=') else {
            bail!("invalid --var '{}', expected NAME=TYPE", spec);
        };
        let ty: Type = ty.parse()?;
        env.declare(name.trim(), ty);
    }
    Ok(env)
}

fn run(expression: &str, cli: &Cli) -> Result<()> {
    if cli.verbose {
        println!("{} {}", "Input:".dimmed(), expression.yellow());
    }

    let (config, base_dir) = load_config(cli)?;
    let env = build_env(&config, &base_dir, cli)?;
    let dialect = cli.dialect.unwrap_or(config.dialect);
    let filters = config
        .filter_extension()
        .with_max_arguments_to_expand(cli.max_expand.unwrap_or(config.max_arguments_to_expand));
    let named = cli.params || config.named_parameters;

    let expr = env.compile(expression)?;
    let mut params = NamedParams::new();
    let mut paths = PathSet::new();
    let mut options = ConvertOptions::new()
        .with_dialect(dialect)
        .with_extension(&filters)
        .with_ident_tracker(&mut paths);
    if named {
        options = options.with_value_tracker(&mut params);
    }
    let sql = convert(&expr, options)?;

    println!("{}", "Generated SQL:".green().bold());
    println!("{}", sql.white());

    if named && !params.is_empty() {
        println!();
        println!("{}", "Bindings:".cyan());
        println!("{}", serde_json::to_string_pretty(&params.to_json())?);
    }
    if cli.idents {
        println!();
        println!("{}", "Identifiers:".cyan());
        for path in paths.iter() {
            println!("  • {}", path.white());
        }
    }
    Ok(())
}

fn explain(expression: &str, cli: &Cli) -> Result<()> {
    println!("{} {}", "Expression:".dimmed(), expression.yellow());
    println!();

    let (config, base_dir) = load_config(cli)?;
    let env = build_env(&config, &base_dir, cli)?;
    let expr = env.compile(expression)?;

    println!("{}", "Typed Tree:".green().bold());
    print_tree(&expr, "", 1);
    Ok(())
}

fn print_tree(expr: &Expr, label: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    let ty = expr
        .ty
        .as_ref()
        .map_or_else(|| "?".to_string(), |t| t.to_string());
    let node = match &expr.kind {
        ExprKind::Literal(value) => format!("literal {}", value),
        ExprKind::Ident(name) => format!("ident {}", name),
        ExprKind::Select {
            field, test_only, ..
        } => {
            if *test_only {
                format!("has .{}", field)
            } else {
                format!("select .{}", field)
            }
        }
        ExprKind::Index { safe: true, .. } => "index (safe)".to_string(),
        ExprKind::Index { .. } => "index".to_string(),
        ExprKind::Unary { op, .. } => format!("unary {}", op),
        ExprKind::Binary { op, .. } => format!("binary {}", op),
        ExprKind::Conditional { .. } => "conditional".to_string(),
        ExprKind::Call {
            function, target, ..
        } => match target {
            Some(_) => format!("call .{}()", function),
            None => format!("call {}()", function),
        },
        ExprKind::List(items) => format!("list [{}]", items.len()),
        ExprKind::Map(entries) => format!("map {{{}}}", entries.len()),
        ExprKind::Comprehension(c) => format!("{} {}", c.kind.macro_name(), c.iter_var),
    };
    println!("{}{}{} {}", indent, label.dimmed(), node.white(), format!(": {}", ty).cyan());

    let child = |e: &Expr, label: &str| print_tree(e, label, depth + 1);
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
        ExprKind::Select { operand, .. } => child(operand, ""),
        ExprKind::Index { operand, index, .. } => {
            child(operand, "");
            child(index, "key ");
        }
        ExprKind::Unary { operand, .. } => child(operand, ""),
        ExprKind::Binary { lhs, rhs, .. } => {
            child(lhs, "");
            child(rhs, "");
        }
        ExprKind::Conditional {
            cond,
            then,
            otherwise,
        } => {
            child(cond, "if ");
            child(then, "then ");
            child(otherwise, "else ");
        }
        ExprKind::Call { target, args, .. } => {
            if let Some(target) = target {
                child(target, "target ");
            }
            for arg in args {
                child(arg, "");
            }
        }
        ExprKind::List(items) => items.iter().for_each(|item| child(item, "")),
        ExprKind::Map(entries) => {
            for entry in entries {
                child(&entry.key, "key ");
                child(&entry.value, "value ");
            }
        }
        ExprKind::Comprehension(c) => {
            child(&c.range, "range ");
            if let Some(predicate) = &c.predicate {
                child(predicate, "where ");
            }
            if let Some(result) = &c.result {
                child(result, "select ");
            }
        }
    }
}

fn show_functions() {
    println!("{}", "Built-in functions".cyan().bold());
    for chunk in builtin_functions().chunks(6) {
        println!("  {}", chunk.join(", ").white());
    }
    println!();
    println!("{}", "Filter functions".cyan().bold());
    for name in FilterFunction::names() {
        println!("  {}", name.white());
    }
}
