//! Connection and interactive login against the Telegram API.

use std::{
    io::{self, BufRead, Write},
    path::Path,
};

use anyhow::{bail, Context};
use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use tracing::info;

use tgrab_core::config::Config;

/// Connect with the stored session, running the interactive login flow
/// (code prompt, optional 2FA password) when the session is not authorized.
pub async fn connect(cfg: &Config) -> anyhow::Result<Client> {
    let session =
        Session::load_file_or_create(&cfg.session_file).context("failed to load session file")?;

    let client = Client::connect(ClientConfig {
        session,
        api_id: cfg.api_id,
        api_hash: cfg.api_hash.clone(),
        params: InitParams::default(),
    })
    .await
    .context("failed to connect to Telegram")?;

    if !client.is_authorized().await? {
        info!("session not authorized, starting interactive login");
        let token = client.request_login_code(&cfg.phone).await?;
        let code = prompt("Enter the login code sent by Telegram: ")?;
        match client.sign_in(&token, code.trim()).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("Enter your 2FA password: ")?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .context("2FA password check failed")?;
            }
            Err(e) => bail!("sign in failed: {e}"),
        }
        save_session(&client, &cfg.session_file)?;
        info!("signed in, session saved");
    }

    Ok(client)
}

/// Persist the MTProto session. Called again after the run so reconnect
/// state survives the process.
pub fn save_session(client: &Client, path: &Path) -> anyhow::Result<()> {
    client
        .session()
        .save_to_file(path)
        .context("failed to save session file")
}

fn prompt(message: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(message.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
