#[macro_use]
extern crate tracing;

use cert_manager_webhook_infoblox::{
    dns::infoblox::WapiConnector,
    reconcile::{
        Presence,
        Removal,
    },
    resources::{
        ChallengeRequest,
        ChallengeReview,
    },
    solver::Solver,
};
use clap::Parser;
use eyre::{
    bail,
    Context as _,
    Result,
};
use serde_json::value::RawValue;
use std::{
    io,
    path::PathBuf,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
enum Command {
    /// Print the solver name and the API group it is registered under
    Name(ArgsCommon),
    /// Read a ChallengeReview from stdin, run it and print the answered review to stdout
    Review(ArgsCommon),
    /// Present a single challenge record
    Present(ArgsChallenge),
    /// Clean up a single challenge record
    Cleanup(ArgsChallenge),
}

#[derive(Parser)]
struct ArgsCommon {
    #[clap(long, env = "GROUP_NAME", help = "API group this solver is registered under")]
    group_name: String,

    #[clap(
        long,
        env = "INFOBLOX_TIMEOUT",
        help = "Timeout for requests to the Infoblox API [default: 60s]",
        value_parser = humantime::parse_duration
    )]
    timeout: Option<Duration>,
}

#[derive(Parser)]
struct ArgsChallenge {
    #[command(flatten)]
    common: ArgsCommon,

    #[clap(long, help = "Record name, e.g. _acme-challenge.example.com.")]
    fqdn: String,

    #[clap(long, help = "Expected TXT record value")]
    key: String,

    #[clap(long, default_value = "default", help = "Namespace of the referenced credential secrets")]
    namespace: String,

    #[clap(long, help = "JSON file with the solver config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Command::parse() {
        Command::Name(args) => {
            check_group_name(&args)?;
            println!("{} ({})", cert_manager_webhook_infoblox::solver::SOLVER_NAME, args.group_name);
        }
        Command::Review(args) => {
            let solver = initialize(&args).await?;
            let review: ChallengeReview =
                serde_json::from_reader(io::stdin().lock()).context("unable to decode ChallengeReview")?;
            let review = solver.review(review).await;
            println!("{}", serde_json::to_string_pretty(&review)?);
        }
        Command::Present(args) => {
            let solver = initialize(&args.common).await?;
            match solver.present(&challenge_request(args)?).await? {
                Presence::Created(reference) => println!("created {reference}"),
                Presence::AlreadyPresent(reference) => println!("already present {reference}"),
            }
        }
        Command::Cleanup(args) => {
            let solver = initialize(&args.common).await?;
            match solver.cleanup(&challenge_request(args)?).await? {
                Removal::Deleted(reference) => println!("deleted {reference}"),
                Removal::NotFound => println!("no matching record"),
            }
        }
    }

    Ok(())
}

fn check_group_name(args: &ArgsCommon) -> Result<()> {
    if args.group_name.is_empty() {
        error!("No value specified for environment variable 'GROUP_NAME'");
        bail!("GROUP_NAME must be specified");
    }
    Ok(())
}

async fn initialize(args: &ArgsCommon) -> Result<Solver> {
    check_group_name(args)?;
    let config = kube::Config::infer().await.context("unable to load kubernetes config")?;
    let solver = Solver::initialize(config, args.timeout.map(WapiConnector::new).unwrap_or_default())?;
    info!(group = %args.group_name, solver = solver.name(), "solver ready");
    Ok(solver)
}

fn challenge_request(
    ArgsChallenge {
        fqdn, key, namespace, config, ..
    }: ArgsChallenge,
) -> Result<ChallengeRequest> {
    let config = match config {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("unable to read {}", path.display()))?;
            Some(RawValue::from_string(raw).context("config is not valid JSON")?)
        }
        None => None,
    };

    Ok(ChallengeRequest {
        key,
        resolved_fqdn: fqdn,
        resource_namespace: namespace,
        config,
        ..Default::default()
    })
}
