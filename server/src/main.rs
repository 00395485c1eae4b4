use anyhow::{bail, Context};
use clap::Parser;
use http_bridge::bridge::HttpBridge;
use http_bridge::model::JobResponse;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::{ConfigOverrides, RelayConfig, ResponseMode};
use workflow::runner::{JobRequest, Runner};

mod http_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Click-to-track video relay")]
struct Args {
    /// Load the relay config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Directory holding one sub-directory per job
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Endpoint of the hosted tracking service
    #[arg(long)]
    tracker_url: Option<String>,
    /// Answer with position/velocity series instead of the raw track
    #[arg(long, default_value_t = false)]
    kinematics: bool,
    /// Serve the HTTP API until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Run a single job from the command line and print the response
    #[arg(long, default_value_t = false, requires_all = ["video", "x", "y"])]
    offline: bool,
    #[arg(long)]
    video: Option<PathBuf>,
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,
    #[arg(long)]
    pixel_to_meter: Option<f64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind,
            output_dir: self.output_dir.clone(),
            tracker_url: self.tracker_url.clone(),
            kinematics: self.kinematics,
        }
    }

    fn job_request(&self, mode: ResponseMode) -> anyhow::Result<JobRequest> {
        let video = self.video.clone().context("--offline needs --video")?;
        let x = self.x.context("--offline needs --x")?;
        let y = self.y.context("--offline needs --y")?;
        if mode == ResponseMode::Kinematics && self.pixel_to_meter.is_none() {
            bail!("kinematics output needs --pixel-to-meter");
        }
        Ok(JobRequest {
            video,
            x,
            y,
            pixel_to_meter: self.pixel_to_meter,
        })
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let relay_config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    }
    .with_overrides(&args.overrides());

    let runner = Arc::new(Runner::from_config(relay_config.clone())?);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;

    if args.offline {
        let request = args.job_request(relay_config.response)?;
        let outcome = runtime
            .block_on(runner.execute(&request))
            .with_context(|| format!("processing {}", request.video.display()))?;
        let response = JobResponse::from(outcome);
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    if args.serve {
        let bridge = HttpBridge::new(runner.clone());
        runtime.block_on(bridge.serve(relay_config.bind))?;
    }
    if !args.offline && !args.serve {
        info!("nothing to do; pass --serve or --offline");
    }

    Ok(())
}
