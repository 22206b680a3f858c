use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::Result;
use crate::audio_client::{AudioClient, AudioPayload, DownloadError};
use crate::opts::FetchPolicy;

/// Blocking HTTP transport for the pronunciation service.
///
/// One client is built per run and reused for every request, carrying the policy's
/// User-Agent and per-request timeout.
pub struct HttpAudioClient {
    client: Client,
}

impl HttpAudioClient {
    pub fn new(policy: &FetchPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(policy.user_agent.clone())
            .timeout(policy.request_timeout)
            .build()
            .map_err(|e| crate::Error::Other(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl AudioClient for HttpAudioClient {
    fn fetch(&self, url: &str) -> std::result::Result<AudioPayload, DownloadError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = resp
            .bytes()
            .map_err(|e| DownloadError::Network(e.to_string()))?
            .to_vec();

        Ok(AudioPayload { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_policy() -> anyhow::Result<()> {
        HttpAudioClient::new(&FetchPolicy::default())?;
        Ok(())
    }
}
