use std::time::Duration;

use anyhow::{Context, Result, bail};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    http: reqwest::Client,
    api_url: String,
    token: String,
    user_key: String,
}

impl PushoverNotifier {
    pub fn new(token: String, user_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build pushover http client")?;

        Ok(Self {
            http,
            api_url: PUSHOVER_URL.to_string(),
            token,
            user_key,
        })
    }

    /// One alert per call. Delivery failures are the caller's to log; there
    /// is no retry here.
    pub async fn send(&self, title: &str, message: &str) -> Result<()> {
        let resp = self
            .http
            .post(&self.api_url)
            .form(&[
                ("token", self.token.as_str()),
                ("user", self.user_key.as_str()),
                ("title", title),
                ("message", message),
            ])
            .send()
            .await
            .context("pushover request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("read response body failed")?;

        if !status.is_success() {
            bail!("pushover http error {status}: {text}");
        }

        Ok(())
    }
}
