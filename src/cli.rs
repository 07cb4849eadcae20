use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use netlens::config::Config;
use netlens::intel::{IntelCache, IntelPipeline, IntelRecord};
use netlens::{classify, CancelToken, CaptureAnalyzer, CaptureReport};

#[derive(Parser)]
#[command(name = "netlens")]
#[command(author, version, about = "PCAP-NG capture analyzer with IP intelligence enrichment")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a capture, index its endpoints, and enrich public addresses
    Analyze {
        /// PCAP-NG capture file
        file: PathBuf,

        /// Skip geolocation/threat enrichment
        #[arg(long)]
        no_enrich: bool,

        /// Intelligence cache file (overrides config)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Primary provider API key (overrides config)
        #[arg(long)]
        api_key: Option<String>,

        /// Delay between provider requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Write the full report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up intelligence for a single address
    Intel {
        /// IPv4 address to investigate
        ip: Ipv4Addr,

        /// Force refresh (don't use cached data)
        #[arg(short, long)]
        refresh: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            file,
            no_enrich,
            cache,
            api_key,
            delay_ms,
            output,
        } => {
            if no_enrich {
                config.intel.enabled = false;
            }
            if let Some(cache) = cache {
                config.intel.cache_path = Some(cache);
            }
            if let Some(api_key) = api_key {
                config.intel.api_key = Some(api_key);
            }
            if let Some(delay_ms) = delay_ms {
                config.intel.request_delay_ms = delay_ms;
            }

            let data = std::fs::read(&file)
                .with_context(|| format!("failed to read capture file: {}", file.display()))?;

            let analyzer = CaptureAnalyzer::new(config).with_progress(Arc::new(
                |offset, total, count| {
                    if count % 500 == 0 {
                        debug!("decoded {count} blocks ({offset}/{total} bytes)");
                    }
                },
            ));

            let report = analyzer.analyze(&data).await?;
            print_report(&report);

            if let Some(output) = output {
                let json = serde_json::to_string_pretty(&report)
                    .context("failed to serialize report")?;
                std::fs::write(&output, json)
                    .with_context(|| format!("failed to write report: {}", output.display()))?;
                println!("\nReport written to {}", output.display());
            }
        }

        Commands::Intel { ip, refresh, json } => {
            let cache = match &config.intel.cache_path {
                Some(path) if path.exists() => IntelCache::load_from_disk(path)?,
                _ => IntelCache::new(),
            }
            .shared();

            if refresh {
                cache.write().invalidate(ip);
            }

            let pipeline =
                IntelPipeline::new(&config.intel, cache.clone(), CancelToken::new())?;
            pipeline.enrich(&[ip]).await;

            let cache = cache.read();
            let record = cache
                .get(ip)
                .context("no record produced; this should not happen")?;

            if json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                print!("{}", format_record(ip, record));
            }
        }
    }

    Ok(())
}

fn print_report(report: &CaptureReport) {
    let summary = &report.summary;
    println!("Capture summary");
    println!("  Blocks:     {}", summary.total_blocks);
    println!("  Packets:    {}", summary.total_packets);
    println!("  Interfaces: {}", summary.total_interfaces);
    println!("  Unique IPs: {}", summary.unique_ips);
    println!("  File size:  {} bytes", summary.file_size);

    let mut counts: Vec<_> = summary.block_counts.iter().collect();
    counts.sort_by(|a, b| a.0.cmp(b.0));
    println!("  Block types:");
    for (name, count) in counts {
        println!("    {name}: {count}");
    }

    let mut flagged: Vec<_> = report
        .ip_cache
        .iter()
        .filter(|(_, record)| record.threat_level() > netlens::ThreatLevel::Safe)
        .collect();
    flagged.sort_by(|a, b| b.1.threat_level().cmp(&a.1.threat_level()).then(a.0.cmp(b.0)));

    if !flagged.is_empty() {
        println!("\nFlagged endpoints:");
        for (ip, record) in flagged {
            match record {
                IntelRecord::Enriched(intel) => println!(
                    "  {} - {} ({}, {})",
                    ip,
                    intel.threat_level.label(),
                    intel.city,
                    intel.country
                ),
                other => println!("  {} - {}", ip, other.threat_level().label()),
            }
        }
    }
}

fn format_record(ip: Ipv4Addr, record: &IntelRecord) -> String {
    let mut output = String::new();
    output.push_str(&format!("IP: {}\n", ip));

    match record {
        IntelRecord::Private { .. } => output.push_str("Private address, not enriched\n"),
        IntelRecord::Multicast { .. } => output.push_str("Multicast address, not enriched\n"),
        IntelRecord::Special { .. } => {
            output.push_str("Reserved/special address, not enriched\n")
        }
        IntelRecord::Error { message, .. } => {
            output.push_str(&format!("Lookup failed: {}\n", message))
        }
        IntelRecord::Enriched(intel) => {
            output.push_str(&format!(
                "Location: {}, {}, {}\n",
                intel.city, intel.region, intel.country
            ));
            output.push_str(&format!(
                "Coordinates: {:.4}, {:.4}\n",
                intel.latitude, intel.longitude
            ));
            output.push_str(&format!("ISP: {}\n", intel.isp));
            if let Some(asn) = &intel.asn {
                output.push_str(&format!("ASN: {}", asn));
                if let Some(number) = intel.asn_number {
                    output.push_str(&format!(" (AS{})", number));
                }
                output.push('\n');
            }
            if let Some(timezone) = &intel.timezone {
                output.push_str(&format!("Timezone: {}\n", timezone));
            }
            output.push_str(&format!("Threat level: {}\n", intel.threat_level.label()));
            let flags = &intel.security;
            for (set, label) in [
                (flags.is_abuse, "abuse source"),
                (flags.is_tor, "Tor exit"),
                (flags.is_proxy, "proxy"),
                (flags.is_vpn, "VPN"),
                (flags.is_hosting, "hosting/datacenter"),
                (flags.is_relay, "relay"),
                (flags.is_mobile, "mobile network"),
            ] {
                if set {
                    output.push_str(&format!("  flagged: {}\n", label));
                }
            }
            if let Some(map_url) = &intel.map_url {
                output.push_str(&format!("Map: {}\n", map_url));
            }
        }
    }

    // Keep the classification visible even for cached records.
    if classify::is_public(ip) {
        output.push_str("Scope: public\n");
    } else {
        output.push_str("Scope: special\n");
    }

    output
}
