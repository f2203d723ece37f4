//! Watch an MJPEG camera stream from the command line
//!
//! Run with: cargo run --example watch <URL> [NAME]
//!
//! Examples:
//!   cargo run --example watch http://192.168.1.20/video.mjpg
//!   cargo run --example watch http://localhost:8080/stream porch
//!
//! Prints one line per received frame. Ctrl+C stops the camera and exits.

use mjpeg_rs::{Camera, CameraConfig};

fn print_usage() {
    eprintln!("Usage: watch <URL> [NAME]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  URL     MJPEG stream URL (multipart/x-mixed-replace)");
    eprintln!("  NAME    Label attached to frames (default: camera)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_rs=debug".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let Some(url) = args.get(1) else {
        print_usage();
        std::process::exit(1);
    };
    let name = args.get(2).map(String::as_str).unwrap_or("camera");

    let camera = Camera::new(
        CameraConfig::new(name, url)
            .reconnect(true)
            .log(true),
    );
    let mut sub = camera.subscribe().await?;

    println!("Watching {} as '{}'", url, name);

    loop {
        tokio::select! {
            frame = sub.recv() => match frame {
                Some(frame) => println!(
                    "[{}] frame {} ({} bytes)",
                    frame.camera, frame.number, frame.size()
                ),
                None => {
                    println!("Stream closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                camera.stop().await;
                break;
            }
        }
    }

    let stats = camera.stats();
    println!(
        "Received {} frames ({} bytes), {} reconnects, {} dropped",
        stats.frames, stats.bytes, stats.reconnects, stats.dropped_frames
    );

    Ok(())
}
