#![deny(clippy::all, clippy::cargo)]

#[macro_use]
extern crate log;
extern crate clap;

use crate::config::Configuration;
use crate::probe::{client_context, run_probe, ProbeRequest};
use crate::prometheus_metrics::PrometheusMetrics;
use clap::{value_parser, Arg, ArgAction, Command};
use env_logger::Builder;
use log::LevelFilter;
use policy_client::LocalNode;
use std::process;

mod config;
mod probe;
mod prometheus_metrics;

const POLICY_PROBE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cmdline = Command::new("Policy Probe")
        .version(POLICY_PROBE_VERSION)
        .about("Runs one quota check through the proxy policy client")
        .arg(
            Arg::new("config_from_env")
                .short('E')
                .long("use-env-vars")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["POLICY_CONFIG_FILE", "url", "timeout", "node_uid"])
                .help("Sets the probe up from ENV VARS instead of these options"),
        )
        .arg(
            Arg::new("POLICY_CONFIG_FILE")
                .help("The policy client config file to use")
                .required_unless_present("config_from_env")
                .index(1),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("service-control-url")
                .display_order(1)
                .help("The service control endpoint, overriding the config file"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout-ms")
                .value_parser(value_parser!(u64))
                .display_order(2)
                .help("Timeout of the quota call in milliseconds"),
        )
        .arg(
            Arg::new("node_uid")
                .long("node-uid")
                .default_value("")
                .display_order(3)
                .help("UID of the local workload"),
        )
        .arg(
            Arg::new("node_namespace")
                .long("node-namespace")
                .default_value("")
                .display_order(4)
                .help("Namespace of the local workload"),
        )
        .arg(
            Arg::new("node_ip")
                .long("node-ip")
                .default_value("")
                .display_order(5)
                .help("IP of the local workload"),
        )
        .arg(
            Arg::new("service")
                .short('s')
                .long("service")
                .default_value("")
                .display_order(6)
                .help("Destination service, the default one when empty or unknown"),
        )
        .arg(
            Arg::new("selector")
                .short('m')
                .long("method")
                .default_value("probe.Check")
                .display_order(7)
                .help("Selector of the API method being called"),
        )
        .arg(
            Arg::new("api_key")
                .short('k')
                .long("api-key")
                .default_value("")
                .display_order(8)
                .help("API key of the caller"),
        )
        .arg(
            Arg::new("allow_unregistered")
                .short('a')
                .long("allow-unregistered-calls")
                .action(ArgAction::SetTrue)
                .display_order(9)
                .help("Lets callers without an API key through"),
        )
        .arg(
            Arg::new("client_ip")
                .long("client-ip")
                .default_value("")
                .display_order(10)
                .help("IP of the caller"),
        )
        .arg(
            Arg::new("metrics")
                .long("metrics")
                .action(ArgAction::SetTrue)
                .display_order(11)
                .help("Prints the Prometheus metrics after the check"),
        )
        .arg(
            Arg::new("v")
                .short('v')
                .action(ArgAction::Count)
                .display_order(12)
                .help("Sets the level of verbosity"),
        );
    let matches = cmdline.get_matches();
    let arg = |name: &str| {
        matches
            .get_one::<String>(name)
            .cloned()
            .unwrap_or_default()
    };

    let config = if matches.get_flag("config_from_env") {
        match Configuration::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1)
            }
        }
    } else {
        Configuration::with(
            arg("POLICY_CONFIG_FILE"),
            matches.get_one::<String>("url").cloned(),
            matches.get_one::<u64>("timeout").copied(),
            LocalNode {
                uid: arg("node_uid"),
                namespace: arg("node_namespace"),
                ip: arg("node_ip"),
            },
        )
    };

    let level_filter = match matches.get_count("v") {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = Builder::new();

    builder
        .filter(None, level_filter)
        .parse_default_env()
        .init();

    info!("Using config: {:?}", config);

    let prometheus_metrics = if matches.get_flag("metrics") {
        match PrometheusMetrics::new() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                eprintln!("Failed to install the metrics recorder: {}", e);
                process::exit(1)
            }
        }
    } else {
        None
    };

    let ctx = match client_context(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1)
        }
    };

    let request = ProbeRequest {
        service: arg("service"),
        selector: arg("selector"),
        api_key: arg("api_key"),
        allow_unregistered_calls: matches.get_flag("allow_unregistered"),
        client_ip: arg("client_ip"),
    };

    let report = run_probe(&ctx, &request).await;
    println!("{}", report);

    if let Some(metrics) = prometheus_metrics {
        println!();
        print!("{}", metrics.gather_metrics());
    }

    if !report.admitted {
        process::exit(2)
    }
}
