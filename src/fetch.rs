use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::FetchOptions;
use crate::error::HarvestError;

pub trait ImageFetcher {
    /// Raw response body for `url`. Non-success statuses are errors.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&options.user_agent)
                .map_err(|err| HarvestError::ConfigParse(format!("invalid user agent: {err}")))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|err| HarvestError::ConfigParse(format!("http client: {err}")))?;
        Ok(Self { client })
    }

    fn handle_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(HarvestError::FetchStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let to_error = |err: reqwest::Error| HarvestError::FetchHttp {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = self.client.get(url).send().map_err(to_error)?;
        let response = Self::handle_status(url, response)?;
        let bytes = response.bytes().map_err(to_error)?;
        Ok(bytes.to_vec())
    }
}
