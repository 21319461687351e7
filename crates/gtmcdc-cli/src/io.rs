use std::io;

use anyhow::{Context, Result};
use gtmcdc_config::FilterConfig;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;
pub type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Open the configured input, or stdin.
pub async fn open_input(config: &FilterConfig) -> Result<Input> {
    if config.reads_stdin() {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = File::open(&config.input_file)
        .await
        .with_context(|| format!("Failed to open input file: {}", config.input_file))?;
    debug!(path = %config.input_file, "Input file opened");
    Ok(Box::new(BufReader::new(file)))
}

/// Open the configured output for appending, or stdout.
pub async fn open_output(config: &FilterConfig) -> Result<Output> {
    if config.writes_stdout() {
        return Ok(Box::new(tokio::io::stdout()));
    }

    let file = append(&config.output_file)
        .await
        .with_context(|| format!("Failed to open output file: {}", config.output_file))?;
    debug!(path = %config.output_file, "Output file opened");
    Ok(Box::new(file))
}

/// Flush and close the output. A failure is logged and reported as `false`.
pub async fn close_output<W: AsyncWrite + Unpin>(output: &mut W, path: &str) -> bool {
    match output.shutdown().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, output = path, "Failed to close output");
            false
        }
    }
}

async fn append(path: &str) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tempfile::TempDir;
    use tokio::io::AsyncBufReadExt;

    struct UnclosableWriter;

    impl AsyncWrite for UnclosableWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
    }

    #[tokio::test]
    async fn test_close_output_reports_failure() {
        assert!(!close_output(&mut UnclosableWriter, "out.txt").await);
        assert!(close_output(&mut Vec::<u8>::new(), "out.txt").await);
    }

    #[tokio::test]
    async fn test_output_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let config = FilterConfig {
            output_file: path.display().to_string(),
            ..Default::default()
        };
        let mut output = open_output(&config).await.unwrap();
        output.write_all(b"appended\n").await.unwrap();
        assert!(close_output(&mut output, &config.output_file).await);
        drop(output);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nappended\n");
    }

    #[tokio::test]
    async fn test_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let config = FilterConfig {
            input_file: path.display().to_string(),
            ..Default::default()
        };
        let mut lines = open_input(&config).await.unwrap().lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = FilterConfig {
            input_file: dir.path().join("absent.txt").display().to_string(),
            ..Default::default()
        };
        let err = open_input(&config).await.err().unwrap();
        assert!(err.to_string().contains("Failed to open input file"));
    }
}
