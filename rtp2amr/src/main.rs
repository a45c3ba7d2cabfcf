//! Converts RTP AMR / AMR-WB bandwidth-efficient payloads into an AMR storage file.
//!
//! Per-payload skip reasons are logged at `debug`, which `release_max_level_info`
//! compiles out of release builds. The `info` summary at the end of a run carries
//! the same information as counters in every build.

use std::process::exit;

use anyhow::{Context, Result};
use log::{error, info};

use rtp_amr::{Stats, StorageWriter};

mod config;
mod source;

use config::{cli, Config};
use source::PayloadSource;

fn run(config: &Config) -> Result<Stats> {
    info!("Input file is: {}", config.input.display());

    let mut writer = StorageWriter::create(config.variant, &config.output)
        .with_context(|| format!("Failed to create {}", config.output.display()))?;

    let payloads = source::open(&config.input)?;
    if let PayloadSource::Rtpdump(rtpdump) = &payloads {
        let hdr = rtpdump.header();
        info!("rtpdump recorded from {}:{}", hdr.ip, hdr.port);
    }

    for payload in payloads {
        let payload =
            payload.with_context(|| format!("Failed to read {}", config.input.display()))?;
        writer
            .submit(&payload)
            .with_context(|| format!("Failed to write {}", config.output.display()))?;
    }

    let stats = writer.stats();
    writer
        .finish()
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    info!("Output file is: {}", config.output.display());
    info!(
        "{} {} frames written, {} unsupported frame types, {} truncated payloads",
        stats.accepted, config.variant, stats.skipped, stats.truncated
    );
    for (frame_type, count) in stats.skipped_frame_types() {
        info!("  frame type {}: {} payloads skipped", frame_type, count);
    }
    if stats.followed > 0 {
        info!(
            "{} payloads had the F bit set, only their first frame was written",
            stats.followed
        );
    }
    Ok(stats)
}

fn main() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let args = cli().get_matches();
    let code = match Config::from_matches(&args).and_then(|config| run(&config)) {
        Ok(_) => 0,
        Err(err) => {
            error!("{:#}", err);
            1
        }
    };
    exit(code)
}
