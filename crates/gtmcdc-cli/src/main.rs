use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod cli;
mod filter;
mod io;
mod logging;
mod metrics;

use cli::Cli;
use filter::FilterPipeline;
use gtmcdc_config::{config_file_path, FilterConfig};
use gtmcdc_kafka::{KafkaChannel, KafkaConfig};
use metrics::{serve_metrics, FilterMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dev_mode = cli.dev_mode();

    let conf_path = config_file_path(cli.conf.as_deref());
    let mut config = FilterConfig::load(Some(&conf_path), dev_mode)
        .with_context(|| format!("Failed to load config: {}", conf_path.display()))?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    logging::init_logging(&config.log_file, &config.log_level)?;

    info!(
        dev = config.dev_mode,
        conf = %conf_path.display(),
        input = %config.input_file,
        output = %config.output_file,
        log = %config.log_file,
        log_level = %config.log_level,
        brokers = %config.kafka_brokers,
        topic = %config.kafka_topic,
        prom = %config.prom_http_addr,
        "Starting filter"
    );

    let metrics = Arc::new(FilterMetrics::new().context("Failed to register metrics")?);

    if let Some(addr) = config.prom_addr()? {
        serve_metrics(&addr, metrics.clone())
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", addr))?;
    }

    let channel = if config.kafka_enabled() {
        let kafka_config = KafkaConfig::new(
            config.broker_list(),
            &config.kafka_topic,
            config.kafka_timeout(),
        )?;
        Some(KafkaChannel::new(&kafka_config).context("Failed to create Kafka producer")?)
    } else {
        info!("Kafka publishing is off");
        None
    };

    let input = io::open_input(&config).await?;
    let mut output = io::open_output(&config).await?;

    let pipeline = FilterPipeline::new(channel.as_ref(), &metrics);
    pipeline
        .run(input, &mut output)
        .await
        .context("Failed to read input")?;

    io::close_output(&mut output, &config.output_file).await;

    if let Some(channel) = &channel {
        if let Err(e) = channel.flush() {
            warn!(error = %e, topic = channel.topic(), "Failed to flush Kafka producer");
        }
    }

    Ok(())
}
