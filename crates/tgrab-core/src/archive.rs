//! The download driver: sequences one full archival run over a
//! conversation's message history.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    classify::{classify, Classification},
    domain::{ChatTarget, DownloadFailure, RunSummary},
    ports::{MediaFetcher, MessageSource},
    utils::{RunEvent, RunLog},
    Result,
};

/// Drives one archival run: pulls messages, classifies, downloads, counts.
///
/// Messages are processed strictly one at a time; the counters are owned by
/// the single control flow, so there is nothing to lock.
pub struct Archiver {
    output_dir: PathBuf,
    cancel: CancellationToken,
    run_log: Option<RunLog>,
}

impl Archiver {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            cancel: CancellationToken::new(),
            run_log: None,
        }
    }

    /// External stop signal, observed between message iterations.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Archive every image of `target`'s history into the output directory.
    ///
    /// Only setup failures (unresolvable conversation, unreadable output
    /// directory, source breakdown) propagate as errors; per-item fetch
    /// failures are absorbed into the summary.
    pub async fn run(
        &self,
        source: &mut dyn MessageSource,
        fetcher: &dyn MediaFetcher,
        target: &ChatTarget,
    ) -> Result<RunSummary> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await?;

        let conversation = source.resolve(target).await?;
        info!(
            chat = %conversation.title,
            chat_id = conversation.id,
            output_dir = %output_dir.display(),
            "archiving group images"
        );

        let mut summary = RunSummary::new(&output_dir);
        let mut without_media: usize = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("stop requested, finishing early");
                break;
            }

            let Some(message) = source.next_message(&conversation).await? else {
                break;
            };

            match classify(&message) {
                Classification::NoMedia => without_media += 1,

                Classification::NonImageDocument => {
                    summary.skipped += 1;
                    debug!(message_id = message.id.0, "skipping non-image document");
                    self.log_event(RunEvent::skipped(message.id));
                }

                Classification::Image { kind, file_name } => {
                    let dest = output_dir.join(&file_name);
                    match fetcher.download(&message, &dest).await {
                        Ok(()) => {
                            summary.downloaded += 1;
                            info!(
                                message_id = message.id.0,
                                kind = kind.as_str(),
                                file = %dest.display(),
                                "downloaded"
                            );
                            self.log_event(RunEvent::downloaded(message.id, &file_name, kind));
                        }
                        Err(e) => {
                            // One bad item must never abort the run.
                            summary.errored += 1;
                            let reason = e.to_string();
                            warn!(
                                message_id = message.id.0,
                                error = %reason,
                                "failed to download media"
                            );
                            self.log_event(RunEvent::failed(message.id, &reason));
                            summary.failures.push(DownloadFailure {
                                message_id: message.id,
                                reason,
                            });
                        }
                    }
                }
            }

            // Best-effort progress heartbeat; assumes dense sequential ids.
            if message.id.0 % 100 == 0 {
                info!(
                    message_id = message.id.0,
                    downloaded = summary.downloaded,
                    "progress"
                );
            }
        }

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            errored = summary.errored,
            without_media,
            output_dir = %summary.output_dir.display(),
            "run finished"
        );
        self.log_event(RunEvent::summary(&summary));

        Ok(summary)
    }

    fn log_event(&self, event: RunEvent) {
        let Some(log) = &self.run_log else {
            return;
        };
        if let Err(e) = log.write(event) {
            warn!(error = %e, "failed to write run log entry");
        }
    }
}
