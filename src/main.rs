use clap::Parser;
use log::{error, info};
use recmirror::configuration::config::Config;
use recmirror::controller::controller_handler::Controller;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recmirror")]
#[command(version)]
#[command(about = "Mirrors session recordings from a remote host and serves them as playable videos")]
struct Args {
    /// TOML configuration file
    #[arg(env = "RECMIRROR_CONFIG")]
    config_file: PathBuf,

    /// Overrides `web.port`
    #[arg(long)]
    web_port: Option<u16>,

    /// Overrides `web.bind_address`
    #[arg(long)]
    bind_address: Option<String>,

    /// Do not sync with the remote host before serving
    #[arg(long)]
    no_startup_sync: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.web_port {
            config.web.port = port;
        }
        if let Some(address) = &self.bind_address {
            config.web.bind_address = address.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
==============================================================================
                 recmirror v{}: recording mirror and video cache
==============================================================================
",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    info!("Importing configuration from {}", args.config_file.display());
    let mut config = match Config::from_file(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);
    info!("Configuration imported successfully");

    let mut controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };
    if args.no_startup_sync {
        controller.skip_startup_sync();
    }

    let result = tokio::spawn(async move {
        info!("Spawning the controller");
        controller.run().await
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Error joining at the end of execution: {:?}", e);
            std::process::exit(1);
        }
    }
}
