use clap::{App, Arg};
use colored::*;
use rangefinder_bridge::transport::{ArtifactKind, FrameSummary};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8090";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("rangefinder-monitor")
        .version("0.1.0")
        .about("Subscribe to a range finder simulator and print its frames")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Simulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Simulator port")
                .takes_value(true)
                .default_value(DEFAULT_PORT),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["compact", "json"])
                .default_value("compact"),
        )
        .arg(
            Arg::with_name("count")
                .short("n")
                .long("count")
                .value_name("FRAMES")
                .help("Disconnect after this many depth images")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Frame count must be a whole number".into()),
                }),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap_or(DEFAULT_HOST);
    let port = matches.value_of("port").unwrap_or(DEFAULT_PORT);
    let json = matches.value_of("format") == Some("json");
    let limit = matches.value_of("count").map(str::parse::<u64>).transpose()?;

    let stream = TcpStream::connect(format!("{}:{}", host, port)).await.map_err(|e| {
        eprintln!("{} {}:{} ({})", "Cannot reach simulator at".red().bold(), host, port, e);
        e
    })?;
    println!("{} {}:{}", "Subscribed to".green().bold(), host, port);

    let mut lines = BufReader::new(stream).lines();
    let mut images: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        let summary: FrameSummary = match serde_json::from_str(&line) {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("{} {}", "Unreadable frame:".yellow(), e);
                continue;
            }
        };

        if json {
            println!("{}", line);
        } else {
            print_compact(&summary);
        }

        if summary.kind == ArtifactKind::DepthImage {
            images += 1;
            if limit.map_or(false, |n| images >= n) {
                break;
            }
        }
    }

    println!("{} {} depth images", "Received".bold(), images);
    Ok(())
}

fn print_compact(summary: &FrameSummary) {
    let kind = match summary.kind {
        ArtifactKind::DepthImage => "image      ".cyan(),
        ArtifactKind::PointCloud => "points     ".green(),
        ArtifactKind::CameraInfo => "camera_info".yellow(),
    };

    let range = match summary.finite_range {
        Some((near, far)) => format!("{:.3}..{:.3} m", near, far),
        None => "no finite range".dimmed().to_string(),
    };

    let center = match summary.center {
        Some([x, y, z]) => format!("({:.3}, {:.3}, {:.3})", x, y, z),
        None => "-".to_string(),
    };

    println!(
        "{} {:>10.3}s  {}  {}x{}  {:>8} B  center {}  {}",
        kind,
        summary.stamp.as_secs_f64(),
        summary.frame_id.as_str().bold(),
        summary.width,
        summary.height,
        summary.bytes,
        center,
        range
    );
}
