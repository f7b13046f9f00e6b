//! relopt CLI
//!
//! Reads a workload document (relation statistics plus one query) and prints
//! the canonical plan, its estimated cost, and optionally the optimized plan.
//!
//! ```json
//! {
//!   "relations": [
//!     { "name": "Person", "tuples": 400,
//!       "attributes": [{ "name": "persid", "distinct": 400 }] }
//!   ],
//!   "query": "SELECT persid FROM Person",
//!   "optimizer": { "join_rounding": "ceiling" }
//! }
//! ```
//!
//! `query` may also be a structured object with `relations`, `predicates`
//! and `projection` fields.

use clap::{Parser, Subcommand};
use relopt::logging::init_logging;
use relopt::{
    explain, AttributeMatching, CanonicalQuery, Catalogue, Error, Estimator, JoinRounding,
    Optimizer, OptimizerConfig, PlanNode, Result,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Hard ceiling for --max-joins; 12! orderings is already ~479 million plans
const MAX_JOIN_CEILING: usize = 12;

#[derive(Parser)]
#[command(name = "relopt-cli")]
#[command(about = "Estimate and optimize relational query plans", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Identify attributes by relation and name instead of name alone
    #[arg(long, global = true)]
    qualified: bool,

    /// Truncate join cardinalities instead of rounding up
    #[arg(long, global = true)]
    truncate_joins: bool,

    /// Largest number of join predicates to search exhaustively
    #[arg(long, global = true)]
    max_joins: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical plan and its estimated cost
    Estimate {
        /// Workload document (JSON)
        file: PathBuf,
    },

    /// Optimize the query and compare both plans
    Optimize {
        /// Workload document (JSON)
        file: PathBuf,
    },
}

#[derive(Deserialize)]
struct Workload {
    relations: Vec<RelationEntry>,
    query: QueryInput,
    #[serde(default)]
    optimizer: OptimizerConfig,
}

#[derive(Deserialize)]
struct RelationEntry {
    name: String,
    tuples: u64,
    #[serde(default)]
    attributes: Vec<AttributeEntry>,
}

#[derive(Deserialize)]
struct AttributeEntry {
    name: String,
    distinct: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryInput {
    Text(String),
    Structured(CanonicalQuery),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.json_logs);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.error_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let (file, optimize) = match &cli.command {
        Commands::Estimate { file } => (file.as_path(), false),
        Commands::Optimize { file } => (file.as_path(), true),
    };

    let workload = load_workload(file)?;
    let config = apply_flags(workload.optimizer.clone(), &cli)?;
    let catalogue = build_catalogue(&workload.relations)?;
    let query = match &workload.query {
        QueryInput::Text(text) => CanonicalQuery::parse(text)?,
        QueryInput::Structured(query) => query.clone(),
    };

    let mut plan = query.build(&catalogue)?;
    let mut estimator = Estimator::with_config(&config);
    let cost = estimator.estimate(&mut plan)?;
    print_plan("Canonical plan", &plan, cost);

    if optimize {
        let mut optimized = Optimizer::with_config(config).optimize(&plan)?;
        let optimized_cost = estimator.estimate(&mut optimized)?;
        println!();
        print_plan("Optimized plan", &optimized, optimized_cost);
    }
    Ok(())
}

fn load_workload(path: &Path) -> Result<Workload> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn apply_flags(mut config: OptimizerConfig, cli: &Cli) -> Result<OptimizerConfig> {
    if cli.qualified {
        config.attribute_matching = AttributeMatching::Qualified;
    }
    if cli.truncate_joins {
        config.join_rounding = JoinRounding::Truncate;
    }
    if let Some(max) = cli.max_joins {
        config.max_join_predicates = max;
    }
    if config.max_join_predicates > MAX_JOIN_CEILING {
        return Err(Error::Config(format!(
            "max_join_predicates {} exceeds {}",
            config.max_join_predicates, MAX_JOIN_CEILING
        )));
    }
    Ok(config)
}

fn build_catalogue(relations: &[RelationEntry]) -> Result<Catalogue> {
    let mut catalogue = Catalogue::new();
    for relation in relations {
        catalogue.declare_relation(&relation.name, relation.tuples);
        for attribute in &relation.attributes {
            catalogue.declare_attribute(&relation.name, &attribute.name, attribute.distinct)?;
        }
    }
    Ok(catalogue)
}

fn print_plan(title: &str, plan: &PlanNode, cost: u64) {
    println!("{}:", title);
    println!("  {}", plan);
    for line in explain(plan).lines() {
        println!("  {}", line);
    }
    println!("  total cost: {}", cost);
}
