use tgrab_core::{archive::Archiver, config::Config, utils::RunLog, Error};
use tgrab_telegram::TelegramMessageSource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tgrab_core::logging::init("tgrab")?;

    let cfg = Config::load()?;

    let client = tgrab_telegram::client::connect(&cfg)
        .await
        .map_err(|e| Error::External(format!("telegram connect failed: {e}")))?;

    // Ctrl-C is a graceful stop: finish the current item, then summarize.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted by user, stopping after the current message");
                cancel.cancel();
            }
        }
    });

    let mut source = TelegramMessageSource::new(client.clone(), cfg.message_limit);
    let fetcher = source.fetcher();

    let archiver = Archiver::new(&cfg.output_dir)
        .with_cancel(cancel)
        .with_run_log(RunLog::new(&cfg.run_log_path, cfg.run_log_json));

    let result = archiver.run(&mut source, &fetcher, &cfg.chat).await;

    // Persist the session on every exit path before surfacing the outcome.
    if let Err(e) = tgrab_telegram::client::save_session(&client, &cfg.session_file) {
        warn!(error = %e, "failed to save session file");
    }

    let summary = result?;
    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        errored = summary.errored,
        output_dir = %summary.output_dir.display(),
        "tgrab finished"
    );

    Ok(())
}
