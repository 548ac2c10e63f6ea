use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use shared::{
    github::GithubClient, metrics::ApiMetrics, ClientConfig, ContributionAggregator, Credential, GitService, PlatformId,
    RepoIdentity, RepositorySummary,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

const ENV_PREFIX: &str = "GIT_PULSE_";

#[derive(Deserialize)]
struct Env {
    platform: String,
    token: String,
    /// Extra `platform=token` pairs, comma separated.
    #[serde(default)]
    connections: Option<String>,
}

impl Env {
    fn credentials(&self) -> anyhow::Result<Vec<Credential>> {
        let mut credentials = vec![Credential::new(
            PlatformId::parse(&self.platform)?,
            self.token.clone(),
        )];
        for pair in self
            .connections
            .iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
        {
            credentials.push(pair.parse()?);
        }
        Ok(credentials)
    }
}

#[derive(Parser)]
#[command(name = "git-pulse", version, about = "Repository activity across GitHub, GitLab and Bitbucket")]
struct Cli {
    /// Print request metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the account behind the primary token
    Whoami,
    /// List repositories for every configured connection
    Repos,
    /// Statistics for one repository of the primary connection
    Stats {
        /// `owner/repo`, a GitLab project id or path, or a repository URL
        repo: String,
    },
    /// Contributors, languages and activity of one GitHub repository
    Analyze {
        /// `owner/repo` or a GitHub URL
        repo: String,
    },
    /// Daily contribution estimate over the last year, across all connections
    Calendar,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionListing {
    platform: PlatformId,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    repositories: Vec<RepositorySummary>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let env = envy::prefixed(ENV_PREFIX).from_env::<Env>()?;
    let config = envy::prefixed(ENV_PREFIX).from_env::<ClientConfig>()?;

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;

    let metrics: Arc<ApiMetrics> = Default::default();
    let service = GitService::new(config, metrics.clone());

    tokio::select! {
        result = run(&service, &env, cli.command) => result?,
        _ = signal::ctrl_c() => {
            warn!("Received SIGINT. Exiting.");
        }
    }

    if cli.metrics {
        eprintln!("{}", metrics.encode()?);
    }
    Ok(())
}

async fn run(service: &GitService, env: &Env, command: Command) -> anyhow::Result<()> {
    let credentials = env.credentials()?;
    let primary = &credentials[0];

    match command {
        Command::Whoami => {
            let (_, profile) = service.connect(primary).await?;
            print_json(&profile)
        }
        Command::Repos => {
            let listings: Vec<_> = service
                .list_repositories_for(&credentials)
                .await
                .into_iter()
                .zip(&credentials)
                .map(|(result, credential)| match result {
                    Ok(connection) => ConnectionListing {
                        platform: credential.platform,
                        error: None,
                        repositories: connection.repositories,
                    },
                    Err(e) => ConnectionListing {
                        platform: credential.platform,
                        error: Some(e.to_string()),
                        repositories: Vec::new(),
                    },
                })
                .collect();
            print_json(&listings)
        }
        Command::Stats { repo } => {
            let identity = RepoIdentity::parse(primary.platform, &repo)?;
            let client = service.client(primary)?;
            let stats = client.get_repository_stats(&identity).await?;
            print_json(&stats)
        }
        Command::Analyze { repo } => {
            anyhow::ensure!(
                primary.platform == PlatformId::GitHub,
                "repository analysis needs a GitHub token, got {}",
                primary.platform
            );
            let identity = RepoIdentity::parse(PlatformId::GitHub, &repo)?;
            let client = GithubClient::new(
                primary.token.clone(),
                service.config(),
                service.metrics().clone(),
            )?;
            let analysis = client.analyze_repository(&identity).await?;
            print_json(&analysis)
        }
        Command::Calendar => {
            let mut connections = Vec::new();
            for (result, credential) in service
                .list_repositories_for(&credentials)
                .await
                .into_iter()
                .zip(&credentials)
            {
                match result {
                    Ok(connection) => connections.push(connection),
                    Err(e) => warn!(platform = %credential.platform, "skipping connection: {e}"),
                }
            }
            info!(
                repositories = connections.iter().map(|c| c.repositories.len()).sum::<usize>(),
                "building contribution calendar"
            );
            let calendar = ContributionAggregator::new(service.config().aggregation_concurrency())
                .aggregate(&connections)
                .await;
            print_json(&calendar)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
