use clap::{App, Arg};
use rangefinder_bridge::sensor::{Scene, SyntheticRangeFinder};
use rangefinder_bridge::transport::{ArtifactSink, FrameSummary};
use rangefinder_bridge::{
    BridgeError, CameraInfo, DepthImage, PointCloud, RangeFinderAdapter, RangeFinderConfig, StepOutcome,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::time;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: &str = "8090";
const FRAME_BROADCAST_BUFFER_SIZE: usize = 64;
const STATS_INTERVAL_MS: u64 = 5000;

/// Streams one JSON frame summary per line to every connected consumer.
/// Connected consumers are the demand signal for the depth image.
struct TcpSink {
    frames: broadcast::Sender<String>,
    camera_info: watch::Sender<Option<String>>,
}

impl TcpSink {
    fn broadcast(&self, summary: &FrameSummary) -> rangefinder_bridge::Result<()> {
        let line = serde_json::to_string(summary).map_err(|e| BridgeError::Transport(e.to_string()))?;
        // Sending with no consumer connected is expected, not a failure
        let _ = self.frames.send(line);
        Ok(())
    }
}

impl ArtifactSink for TcpSink {
    fn publish_image(&mut self, image: &DepthImage) -> rangefinder_bridge::Result<()> {
        self.broadcast(&FrameSummary::from_image(image))
    }

    fn publish_camera_info(&mut self, info: &CameraInfo) -> rangefinder_bridge::Result<()> {
        let line = serde_json::to_string(&FrameSummary::from_camera_info(info))
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        // Latched: replayed to each consumer on connect
        self.camera_info.send_replace(Some(line));
        Ok(())
    }

    fn publish_point_cloud(&mut self, cloud: &PointCloud) -> rangefinder_bridge::Result<()> {
        self.broadcast(&FrameSummary::from_point_cloud(cloud))
    }

    fn image_subscriber_count(&self) -> usize {
        self.frames.receiver_count()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = App::new("rangefinder-sim")
        .version("0.1.0")
        .about("Synthetic range finder streaming depth frames to TCP consumers")
        .arg(Arg::with_name("port").short("p").long("port").takes_value(true).default_value(DEFAULT_PORT))
        .arg(Arg::with_name("name").long("name").takes_value(true).default_value("range_finder"))
        .arg(Arg::with_name("width").long("width").takes_value(true).default_value("160"))
        .arg(Arg::with_name("height").long("height").takes_value(true).default_value("120"))
        .arg(
            Arg::with_name("fov")
                .long("fov")
                .takes_value(true)
                .default_value("1.0472")
                .help("Horizontal field of view in radians"),
        )
        .arg(
            Arg::with_name("max-range")
                .long("max-range")
                .takes_value(true)
                .default_value("8.0")
                .help("Readings beyond this distance are reported as +inf"),
        )
        .arg(
            Arg::with_name("timestep")
                .long("timestep")
                .takes_value(true)
                .default_value("32")
                .help("Basic simulation timestep in milliseconds"),
        )
        .arg(
            Arg::with_name("rate")
                .long("rate")
                .takes_value(true)
                .help("Publish rate in Hz (defaults to every timestep)"),
        )
        .arg(Arg::with_name("always-on").long("always-on").help("Sample even without consumers"))
        .get_matches();

    let port: u16 = matches.value_of("port").unwrap_or(DEFAULT_PORT).parse()?;
    let width: u32 = matches.value_of("width").unwrap_or("160").parse()?;
    let height: u32 = matches.value_of("height").unwrap_or("120").parse()?;
    let fov: f64 = matches.value_of("fov").unwrap_or("1.0472").parse()?;
    let max_range: f32 = matches.value_of("max-range").unwrap_or("8.0").parse()?;
    let timestep_ms: u32 = matches.value_of("timestep").unwrap_or("32").parse()?;

    let mut config = RangeFinderConfig::new(matches.value_of("name").unwrap_or("range_finder"));
    config.always_on = matches.is_present("always-on");
    config.update_rate = matches.value_of("rate").map(str::parse::<f64>).transpose()?;

    let scene = Scene::Oscillating {
        mean: 3.0,
        amplitude: 1.5,
        period_ms: 4000,
    };
    let sensor = SyntheticRangeFinder::new(width, height, fov, scene).with_max_range(max_range);

    let (frames_tx, _) = broadcast::channel(FRAME_BROADCAST_BUFFER_SIZE);
    let (camera_info_tx, camera_info_rx) = watch::channel(None);
    let sink = TcpSink {
        frames: frames_tx.clone(),
        camera_info: camera_info_tx,
    };

    let mut adapter = RangeFinderAdapter::init(Some(sensor), sink, config, timestep_ms, 0)?;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "accepting depth consumers");
    let server = tokio::spawn(serve(listener, frames_tx, camera_info_rx));

    let mut interval = time::interval(Duration::from_millis(u64::from(timestep_ms)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut now_ms: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
        }

        now_ms += u64::from(timestep_ms);
        adapter.sensor_mut().advance(timestep_ms);

        if adapter.step(now_ms) == StepOutcome::Published {
            debug!(now_ms, "frame published");
        }

        if now_ms % STATS_INTERVAL_MS < u64::from(timestep_ms) {
            let stats = adapter.stats();
            info!(
                sampling = adapter.is_sampling(),
                consumers = adapter.sink().image_subscriber_count(),
                frames = stats.frames_published,
                unavailable = stats.ticks_unavailable,
                "range finder status"
            );
        }
    }

    server.abort();
    info!("range finder simulator stopped");

    Ok(())
}

async fn serve(
    listener: TcpListener,
    frames: broadcast::Sender<String>,
    camera_info: watch::Receiver<Option<String>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!(%addr, "consumer connected");
                let frames_rx = frames.subscribe();
                let latched = camera_info.borrow().clone();

                tokio::spawn(async move {
                    if let Err(e) = stream_frames(stream, latched, frames_rx).await {
                        warn!(%addr, error = %e, "consumer stream ended with error");
                    }
                    info!(%addr, "consumer disconnected");
                });
            }
            Err(e) => {
                error!(error = %e, "failed to accept consumer");
            }
        }
    }
}

async fn stream_frames(
    mut stream: TcpStream,
    latched: Option<String>,
    mut frames: broadcast::Receiver<String>,
) -> std::io::Result<()> {
    if let Some(line) = latched {
        write_line(&mut stream, &line).await?;
    }

    loop {
        match frames.recv().await {
            Ok(line) => write_line(&mut stream, &line).await?,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "consumer lagging, frames dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_line(stream: &mut TcpStream, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await
}
