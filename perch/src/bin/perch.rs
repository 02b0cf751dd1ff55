use std::{path::Path, sync::Arc};

use anyhow::Context as _;
use perch::{config::Config, router::Router};
use perch_config::persist::{self, Yaml};
use perch_permission::{Authority, FileStore};

async fn load_configuration() -> anyhow::Result<Config> {
    let config: Config = persist::load::<Yaml, _>(Path::new("config"))
        .await
        .context("cannot load config.yml")?;
    config.validate().context("invalid config.yml")?;
    Ok(config)
}

async fn write_default_configuration() -> anyhow::Result<()> {
    persist::save::<Yaml, _>(&Config::default_config(), Path::new("default_config"))
        .await
        .context("cannot write default_config.yml")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    simple_env_load::load_env_from([".dev.env", ".log.env"]);
    alto_logger::TermLogger::new(
        alto_logger::Options::default()
            .with_time(alto_logger::TimeConfig::relative_now())
            .with_style(alto_logger::StyleConfig::SingleLine),
    )?
    .init()?;

    log::info!("loading configuration");
    let config = match load_configuration().await {
        Ok(config) => config,
        Err(err) => {
            write_default_configuration().await?;
            log::error!("an example configuration was written to default_config.yml");
            return Err(err);
        }
    };

    log::info!("loading permissions");
    let store = FileStore::open(&config.permissions_path).await?;
    let authority = Arc::new(Authority::new(
        Arc::new(store),
        config.max_permission_level,
    ));

    let router = Arc::new(
        Router::new(&config, authority)
            .register(perch::Help)
            .register(perch::Source)
            .register(perch::Permission),
    );

    let clients = config
        .clients
        .into_iter()
        .map(|client| {
            log::debug!("starting {}", client.server_name);
            let server_name = client.server_name.clone();
            let task = tokio::task::spawn(perch::run_client(client, Arc::clone(&router)));
            (server_name, task)
        })
        .collect::<Vec<_>>();

    for (server_name, task) in clients {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("{server_name}: {err:#}"),
            Err(err) => log::error!("{server_name}: task failed: {err}"),
        }
    }

    Ok(())
}
