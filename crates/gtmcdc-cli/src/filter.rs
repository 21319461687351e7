use std::io;
use std::time::Instant;

use gtmcdc_core::{serialize, JournalParser};
use gtmcdc_kafka::MessageChannel;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::metrics::{Counter, FilterMetrics};

/// Per-run line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub lines_read: u64,
    pub parse_errors: u64,
    pub parsed: u64,
    pub serialize_errors: u64,
    pub published: u64,
    pub not_published: u64,
    pub written: u64,
    pub write_errors: u64,
}

impl FilterSummary {
    fn record(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::LinesRead => &mut self.lines_read,
            Counter::LinesParseError => &mut self.parse_errors,
            Counter::LinesParsed => &mut self.parsed,
            Counter::LinesSerializeError => &mut self.serialize_errors,
            Counter::LinesParsedAndPublished => &mut self.published,
            Counter::LinesParsedButNotPublished => &mut self.not_published,
            Counter::LinesOutputWritten => &mut self.written,
            Counter::LinesOutputWriteError => &mut self.write_errors,
        };
        *slot += 1;
    }
}

/// Reads journal lines, publishes their change events and echoes each
/// decodable line to the output.
pub struct FilterPipeline<'a, C: MessageChannel> {
    parser: JournalParser,
    channel: Option<&'a C>,
    metrics: &'a FilterMetrics,
}

impl<'a, C: MessageChannel> FilterPipeline<'a, C> {
    /// `channel` is `None` when publishing is disabled.
    pub fn new(channel: Option<&'a C>, metrics: &'a FilterMetrics) -> Self {
        Self {
            parser: JournalParser::new(),
            channel,
            metrics,
        }
    }

    /// Process `input` until end of stream.
    ///
    /// Per-line failures are counted and skipped. Only a read error ends the
    /// run early.
    pub async fn run<R, W>(&self, mut input: R, output: &mut W) -> io::Result<FilterSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut summary = FilterSummary::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            self.process_line(&line, output, &mut summary).await;
        }

        info!(
            lines_read = summary.lines_read,
            parse_errors = summary.parse_errors,
            parsed = summary.parsed,
            serialize_errors = summary.serialize_errors,
            published = summary.published,
            not_published = summary.not_published,
            written = summary.written,
            write_errors = summary.write_errors,
            "End of input"
        );

        Ok(summary)
    }

    async fn process_line<W>(&self, line: &str, output: &mut W, summary: &mut FilterSummary)
    where
        W: AsyncWrite + Unpin,
    {
        self.count(summary, Counter::LinesRead);

        let record = match self.parser.parse(line) {
            Ok(record) => record,
            Err(e) => {
                self.count(summary, Counter::LinesParseError);
                warn!(journal = line, error = %e, "Failed to parse journal line");
                return;
            }
        };
        self.count(summary, Counter::LinesParsed);

        match serialize(&record) {
            Ok(payload) => {
                debug!(
                    journal = line,
                    payload = %payload,
                    time = ?record.datetime(),
                    "Line parsed to json"
                );
                if let Some(channel) = self.channel {
                    self.publish(channel, payload, summary).await;
                }
            }
            Err(e) => {
                self.count(summary, Counter::LinesSerializeError);
                warn!(journal = line, error = %e, "Failed to serialize journal record");
                if self.channel.is_some() {
                    self.count(summary, Counter::LinesParsedButNotPublished);
                }
            }
        }

        match write_line(output, line).await {
            Ok(()) => self.count(summary, Counter::LinesOutputWritten),
            Err(e) => {
                self.count(summary, Counter::LinesOutputWriteError);
                warn!(error = %e, "Failed to write output line");
            }
        }
    }

    async fn publish(&self, channel: &C, payload: String, summary: &mut FilterSummary) {
        let start = Instant::now();

        match channel.publish(payload).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.metrics.observe_publish_latency(elapsed);
                self.count(summary, Counter::LinesParsedAndPublished);
                debug!(elapsed_us = elapsed.as_micros() as u64, "Published change event");
            }
            Err(e) => {
                self.count(summary, Counter::LinesParsedButNotPublished);
                warn!(error = %e, retryable = e.is_retryable(), "Failed to publish change event");
            }
        }
    }

    fn count(&self, summary: &mut FilterSummary, counter: Counter) {
        self.metrics.incr(counter);
        summary.record(counter);
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
