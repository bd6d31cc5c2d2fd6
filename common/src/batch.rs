use std::os::unix::fs::FileTypeExt;
use tracing::instrument;

use crate::config::{Destination, ProgressSettings};
use crate::error::Error;
use crate::transfer::{self, Source, Summary};

/// Standard input that carries data rather than a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipedInput {
    /// Known only when stdin is redirected from a regular file
    pub total_size: u64,
}

/// Checks whether stdin is a pipe, socket or redirected file
///
/// Terminals and other character devices (including `/dev/null`) are not considered input.
///
/// # Errors
///
/// Returns an error if stdin cannot be inspected.
pub fn detect_piped_stdin() -> std::io::Result<Option<PipedInput>> {
    use std::os::fd::AsFd;
    let fd = std::io::stdin().as_fd().try_clone_to_owned()?;
    let metadata = std::fs::File::from(fd).metadata()?;
    let file_type = metadata.file_type();
    if file_type.is_file() {
        return Ok(Some(PipedInput {
            total_size: metadata.len(),
        }));
    }
    if file_type.is_fifo() || file_type.is_socket() {
        return Ok(Some(PipedInput { total_size: 0 }));
    }
    Ok(None)
}

/// What a batch run amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every source was sent
    Success,
    /// Every source was attempted, some failed
    PartialFailure { errors: usize },
}

/// Tally of a batch run
#[derive(Debug, Default)]
pub struct Report {
    pub sent: usize,
    pub errors: usize,
    pub pipe_used: bool,
    /// Per source results, in the order the sources were processed
    pub outcomes: Vec<(String, Result<Summary, Error>)>,
}

impl Report {
    fn record(&mut self, name: String, result: Result<Summary, Error>) {
        match &result {
            Ok(_) => self.sent += 1,
            Err(_) => self.errors += 1,
        }
        self.outcomes.push((name, result));
    }

    pub fn outcome(&self) -> Outcome {
        if self.errors == 0 {
            Outcome::Success
        } else {
            Outcome::PartialFailure {
                errors: self.errors,
            }
        }
    }

    /// Combined summary of all sources that were sent successfully
    pub fn total(&self) -> Summary {
        self.outcomes
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .fold(Summary::default(), |total, summary| total + *summary)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "sources sent: {}\n\
            sources failed: {}\n\
            {}",
            self.sent,
            self.errors,
            self.total()
        )
    }
}

/// Sends piped stdin (first) and then each path, one after another
///
/// A source that fails to open, connect or send is logged and counted; the remaining sources are
/// still attempted. Each source gets its own connection.
///
/// # Errors
///
/// Returns [`Error::Usage`] if there is neither piped input nor any path. Nothing is opened or
/// connected in that case.
#[instrument(skip(limiter, stdin))]
pub async fn run_batch(
    destination: &Destination,
    limiter: &throttle::Limiter,
    progress: &ProgressSettings,
    stdin: Option<Source>,
    paths: &[std::path::PathBuf],
) -> Result<Report, Error> {
    if stdin.is_none() && paths.is_empty() {
        return Err(Error::Usage(
            "No data was piped into or specified on the command line.".to_string(),
        ));
    }
    let mut report = Report::default();
    if let Some(stdin) = stdin {
        tracing::debug!("Pipe input detected, sending");
        report.pipe_used = true;
        let name = stdin.name().to_string();
        let result = transfer::transfer(stdin, destination, limiter, progress).await;
        if let Err(error) = &result {
            tracing::error!("Failed to send piped data to {}: {}", destination, error);
        }
        report.record(name, result);
    }
    for path in paths {
        let name = path.display().to_string();
        let result = match Source::open(path).await {
            Ok(source) => transfer::transfer(source, destination, limiter, progress).await,
            Err(error) => Err(error),
        };
        if let Err(error) = &result {
            tracing::error!("Failed to send '{}' to {}: {}", name, destination, error);
        }
        report.record(name, result);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::testutils;
    use tracing_test::traced_test;

    fn quiet() -> ProgressSettings {
        ProgressSettings {
            enabled: false,
            ..Default::default()
        }
    }

    async fn wait_for_connections(
        received: &tokio::sync::Mutex<Vec<Vec<u8>>>,
        count: usize,
    ) -> Vec<Vec<u8>> {
        for _ in 0..500 {
            {
                let received = received.lock().await;
                if received.len() >= count {
                    return received.clone();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("expected {count} connections");
    }

    #[tokio::test]
    #[traced_test]
    async fn nothing_to_send_is_a_usage_error() {
        // the destination is never contacted, port 9 is the discard service
        let destination = Destination::new(Protocol::Tcp, "127.0.0.1:9");
        let result = run_batch(
            &destination,
            &throttle::Limiter::unlimited(),
            &quiet(),
            None,
            &[],
        )
        .await;
        assert!(matches!(result, Err(Error::Usage(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn continues_past_missing_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.txt");
        let missing = dir.path().join("missing.txt");
        let third = dir.path().join("third.txt");
        tokio::fs::write(&first, "a\nb\n").await?;
        tokio::fs::write(&third, "c\n").await?;
        let (address, received, server) = testutils::tcp_collector().await?;
        let destination = Destination::new(Protocol::Tcp, address);
        let report = run_batch(
            &destination,
            &throttle::Limiter::unlimited(),
            &quiet(),
            None,
            &[first, missing, third],
        )
        .await?;
        assert_eq!(report.sent, 2);
        assert_eq!(report.errors, 1);
        assert!(!report.pipe_used);
        assert_eq!(report.outcome(), Outcome::PartialFailure { errors: 1 });
        assert!(matches!(report.outcomes[1].1, Err(Error::Open { .. })));
        assert_eq!(report.total().lines_sent, 3);
        // engine ran for the first and third file only
        let received = wait_for_connections(&received, 2).await;
        assert_eq!(received, vec![b"ab".to_vec(), b"c".to_vec()]);
        server.abort();
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn piped_input_goes_first() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("file.txt");
        tokio::fs::write(&file, "from file\n").await?;
        let (address, received, server) = testutils::tcp_collector().await?;
        let destination = Destination::new(Protocol::Tcp, address);
        let piped: &'static [u8] = b"from pipe\n";
        let stdin = Source::new("stdin", Box::new(piped), 0);
        let report = run_batch(
            &destination,
            &throttle::Limiter::unlimited(),
            &quiet(),
            Some(stdin),
            &[file],
        )
        .await?;
        assert!(report.pipe_used);
        assert_eq!(report.outcome(), Outcome::Success);
        assert_eq!(report.outcomes[0].0, "stdin");
        let received = wait_for_connections(&received, 2).await;
        assert_eq!(received, vec![b"from pipe".to_vec(), b"from file".to_vec()]);
        server.abort();
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn unreachable_destination_fails_every_source() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        tokio::fs::write(&first, "a\n").await?;
        tokio::fs::write(&second, "b\n").await?;
        let destination = Destination::new(Protocol::Tcp, testutils::unused_tcp_address().await?);
        let report = run_batch(
            &destination,
            &throttle::Limiter::unlimited(),
            &quiet(),
            None,
            &[first, second],
        )
        .await?;
        assert_eq!(report.errors, 2);
        assert_eq!(report.outcome(), Outcome::PartialFailure { errors: 2 });
        assert!(
            report
                .outcomes
                .iter()
                .all(|(_, result)| matches!(result, Err(Error::Connect { .. })))
        );
        assert!(logs_contain("Failed to send"));
        Ok(())
    }
}
