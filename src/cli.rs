//! Command-line interface.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use miniblog_api::app::load_policy_engine;
use miniblog_core::config::AppConfig;
use miniblog_core::error::AppError;
use miniblog_database::DatabasePool;
use miniblog_database::migration::run_migrations;
use miniblog_database::repositories::policy::PolicyRepository;

/// Miniblog resource server.
#[derive(Debug, Parser)]
#[command(name = "miniblog-server", version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/default.toml` plus the `MINIBLOG_ENV` overlay.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Manage authorization rules in the durable store.
    Policy(PolicyArgs),
}

/// Arguments for the policy command.
#[derive(Debug, Args)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy subcommands. A running server picks changes up on its next reload.
#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Grant `subject` the actions matching `action` on objects matching `object`.
    Add(RuleArgs),
    /// Revoke a rule.
    Remove(RuleArgs),
    /// Print every stored rule.
    List,
}

/// A rule triple.
#[derive(Debug, Args)]
pub struct RuleArgs {
    /// Identity the rule applies to.
    pub subject: String,
    /// Object pattern, e.g. `/v1/users/alice` or `/v1/posts/*`.
    pub object: String,
    /// Action regular expression, e.g. `(GET)|(POST)`.
    pub action: String,
}

impl Cli {
    /// Runs the selected command.
    pub async fn execute(self, config: AppConfig) -> Result<(), AppError> {
        match self.command.unwrap_or(Command::Serve) {
            Command::Serve => miniblog_api::run_server(config).await,
            Command::Policy(args) => execute_policy(args.command, config).await,
        }
    }
}

async fn execute_policy(command: PolicyCommand, config: AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    run_migrations(db.pool()).await?;

    let adapter = Arc::new(PolicyRepository::new(db.pool().clone()));
    let engine = load_policy_engine(&config.policy, adapter).await?;

    let result = match command {
        PolicyCommand::Add(rule) => engine
            .add_rule(&rule.subject, &rule.object, &rule.action)
            .await
            .map(|added| {
                if added {
                    println!("Added rule: {}, {}, {}", rule.subject, rule.object, rule.action);
                } else {
                    println!("Rule already exists");
                }
            }),
        PolicyCommand::Remove(rule) => engine
            .remove_rule(&rule.subject, &rule.object, &rule.action)
            .await
            .map(|removed| {
                if removed {
                    println!("Removed rule: {}, {}, {}", rule.subject, rule.object, rule.action);
                } else {
                    println!("No such rule");
                }
            }),
        PolicyCommand::List => {
            for rule in engine.rules() {
                println!("{rule}");
            }
            Ok(())
        }
    };

    db.close().await;
    result
}
