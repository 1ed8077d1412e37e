//! `iam-bindings`: grant or revoke a service account's roles on a policy file.

mod file_store;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use iam_bindings_core::{ApplyOptions, BindingsService, Condition, Policy, PolicyDelta};
use log::{debug, LevelFilter};
use std::path::PathBuf;

use file_store::FilePolicyStore;

#[derive(Parser, Debug)]
#[command(
    name = "iam-bindings",
    version,
    about = "Grant or revoke service account roles on an IAM policy file"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add the service account to each role
    Grant(ChangeArgs),
    /// Remove the service account from each role
    Revoke(ChangeArgs),
}

#[derive(Args, Debug)]
struct ChangeArgs {
    /// JSON policy file; a missing file is treated as an empty policy
    #[arg(long, env = "IAM_BINDINGS_POLICY_FILE")]
    policy_file: PathBuf,

    /// Service account email, without the `serviceAccount:` prefix
    #[arg(long)]
    email: String,

    /// Role to grant or revoke (repeatable)
    #[arg(long = "role", required = true)]
    roles: Vec<String>,

    #[command(flatten)]
    condition: ConditionArgs,

    /// Print the resulting policy without writing it
    #[arg(long)]
    dry_run: bool,

    /// Retries after the policy file changed underneath us
    #[arg(
        long,
        env = "IAM_BINDINGS_MAX_RETRIES",
        default_value_t = ApplyOptions::default().max_retries
    )]
    max_retries: u32,
}

/// Bindings only match when their condition equals the one given here
#[derive(Args, Debug)]
struct ConditionArgs {
    #[arg(long)]
    condition_title: Option<String>,

    #[arg(long)]
    condition_description: Option<String>,

    #[arg(long)]
    condition_expression: Option<String>,
}

impl ConditionArgs {
    fn to_condition(&self) -> Option<Condition> {
        if self.condition_title.is_none()
            && self.condition_description.is_none()
            && self.condition_expression.is_none()
        {
            return None;
        }
        Some(Condition::new(
            self.condition_title.clone().unwrap_or_default(),
            self.condition_description.clone().unwrap_or_default(),
            self.condition_expression.clone().unwrap_or_default(),
        ))
    }
}

impl ChangeArgs {
    fn delta(&self) -> PolicyDelta {
        PolicyDelta::new(self.email.clone(), self.roles.iter().cloned())
            .with_condition(self.condition.to_condition())
    }

    fn resource(&self) -> Result<&str> {
        self.policy_file.to_str().with_context(|| {
            format!(
                "Policy file path is not valid UTF-8: {}",
                self.policy_file.display()
            )
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Grant,
    Revoke,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_policy(policy: &Policy) -> Result<()> {
    let json = serde_json::to_string_pretty(policy).context("Failed to serialize policy")?;
    println!("{json}");
    Ok(())
}

async fn run_change(direction: Direction, args: &ChangeArgs) -> Result<()> {
    let resource = args.resource()?;
    let delta = args.delta();
    let (to_add, to_remove) = match direction {
        Direction::Grant => (Some(&delta), None),
        Direction::Revoke => (None, Some(&delta)),
    };
    debug!("{:?} {:?} on {}", direction, delta, resource);

    let service = BindingsService::new(FilePolicyStore);

    if args.dry_run {
        let plan = service
            .plan(resource, to_add, to_remove)
            .await
            .with_context(|| format!("Failed to plan change for {resource}"))?;
        print_policy(&plan.proposed)?;
        if plan.changed {
            eprintln!("Dry run: policy would change");
        } else {
            eprintln!("Dry run: no change");
        }
        return Ok(());
    }

    let options = ApplyOptions {
        max_retries: args.max_retries,
    };
    let result = service
        .apply(resource, to_add, to_remove, options)
        .await
        .with_context(|| format!("Failed to update {resource}"))?;
    print_policy(&result.policy)?;
    if result.changed {
        eprintln!("Policy updated");
    } else {
        eprintln!("No change");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Grant(args) => run_change(Direction::Grant, args).await,
        Command::Revoke(args) => run_change(Direction::Revoke, args).await,
    }
}
