use std::{fs, path::PathBuf, process};

use serde_json::{json, Value};
use structopt::StructOpt;
use tracing::{error, warn};
use tracing_subscriber::FmtSubscriber;

use privcompute_sdk::{
    client::{new_client, Client},
    models::{Computation, ComputationDefinition, Project},
    router::{GroupedAggregation, Identity, Routed},
    settings::{ApiSettings, LifecycleSettings, OutputSettings, Settings},
    Error,
    LifecycleManager,
    ResultRouter,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "privcompute")]
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Submit the computation defined in a JSON file, wait for it and print its results
    Run {
        /// Path of the computation definition
        #[structopt(parse(from_os_str))]
        definition: PathBuf,
        /// Identifier of the project the computation belongs to. The project
        /// then has no default query and no differential privacy policy
        #[structopt(long, conflicts_with = "project-file")]
        project: Option<String>,
        /// Path of a JSON file describing the project the computation belongs to,
        /// with its default query and differential privacy policy
        #[structopt(long, parse(from_os_str))]
        project_file: Option<PathBuf>,
    },
    /// Wait for an existing computation and print its results
    Wait {
        /// Identifier of the computation
        computation_id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opt = Opt::from_args();

    let settings = Settings::new(opt.config_path).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let Settings {
        api: api_settings,
        lifecycle: lifecycle_settings,
        output: output_settings,
        log: log_settings,
    } = settings;

    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(log_settings.filter)
        .with_ansi(true)
        .init();

    if let Err(err) = run(
        opt.command,
        api_settings,
        lifecycle_settings,
        output_settings,
    )
    .await
    {
        error!("{}", err);
        process::exit(1);
    }
}

async fn run(
    command: Command,
    api_settings: ApiSettings,
    lifecycle_settings: LifecycleSettings,
    output_settings: OutputSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = new_client(&api_settings.url, api_settings.token.as_deref())?;
    let mut manager = LifecycleManager::new(client, lifecycle_settings);

    match command {
        Command::Run {
            definition,
            project,
            project_file,
        } => {
            let model: ComputationDefinition = serde_json::from_slice(&fs::read(definition)?)?;
            let mut builder = manager.definition_builder();
            if let Some(project) = load_project(project, project_file)? {
                builder = builder.project(project);
            }
            let definition = builder.build(model)?;
            let computation = hint_on_timeout(manager.run(&definition).await)?;

            match GroupedAggregation::for_definition(&definition, output_settings.float_precision)
            {
                Some(hook) => {
                    let routed = ResultRouter::new(hook)
                        .route(manager.api_mut(), &computation)
                        .await?;
                    print(routed.value, |decoded| json!(decoded.records()))?;
                }
                None => route_identity(&mut manager, &computation).await?,
            }
        }
        Command::Wait { computation_id } => {
            let computation = hint_on_timeout(manager.attach(&computation_id).await)?;
            route_identity(&mut manager, &computation).await?;
        }
    }
    Ok(())
}

async fn route_identity(
    manager: &mut LifecycleManager<Client<reqwest::Client>>,
    computation: &Computation,
) -> Result<(), Box<dyn std::error::Error>> {
    let routed = ResultRouter::new(Identity)
        .route(manager.api_mut(), computation)
        .await?;
    print(routed.value, |contents| json!(contents))?;
    Ok(())
}

fn load_project(
    id: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<Project>, Box<dyn std::error::Error>> {
    match (id, file) {
        (_, Some(file)) => Ok(Some(serde_json::from_slice(&fs::read(file)?)?)),
        (Some(id), None) => Ok(Some(Project::new(id))),
        (None, None) => Ok(None),
    }
}

fn hint_on_timeout(result: Result<Computation, Error>) -> Result<Computation, Error> {
    if let Err(err) = &result {
        if let Some(snapshot) = err.timed_out_snapshot() {
            warn!(
                "computation {} is still running, wait for it with `privcompute wait {}`",
                snapshot.id, snapshot.id
            );
        }
    }
    result
}

fn print<T, F>(routed: Routed<T>, plaintext: F) -> Result<(), serde_json::Error>
where
    F: FnOnce(T) -> Value,
{
    let value = match routed {
        Routed::Plaintext(value) => plaintext(value),
        Routed::Encrypted(contents) => json!({ "encrypted": contents }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn project_file_carries_policy_and_query() {
        let path = env::temp_dir().join(format!("privcompute-project-{}.json", process::id()));
        fs::write(
            &path,
            serde_json::to_vec(&json!({
                "id": "p-1",
                "dataSourceQuery": {"select": ["age"]},
                "dpPolicy": {"useDifferentialPrivacy": true, "epsilon": 1.0},
            }))
            .unwrap(),
        )
        .unwrap();

        let project = load_project(None, Some(path.clone())).unwrap().unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(project.id, "p-1");
        assert!(project.enforces_dp());
        assert!(project.data_source_query.is_some());
    }

    #[test]
    fn project_id_only() {
        let project = load_project(Some("p-2".into()), None).unwrap().unwrap();
        assert_eq!(project, Project::new("p-2"));
        assert!(load_project(None, None).unwrap().is_none());
    }
}
