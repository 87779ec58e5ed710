use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use log::debug;
use reqwest::blocking::Client;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalendarSource {
    CalendarUrl(Url),
    CalendarFile(PathBuf),
}

impl fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarSource::CalendarUrl(url) => write!(f, "{}", url),
            CalendarSource::CalendarFile(path) => write!(f, "{}", path.display()),
        }
    }
}

impl CalendarSource {
    /// Classify a configured source as a url or a file path
    ///
    /// Relative file paths are resolved against `base_dir`.
    pub fn new(source: &str, base_dir: &Path) -> Result<CalendarSource> {
        if let Ok(url) = Url::parse(source) {
            return match url.scheme() {
                "http" | "https" => Ok(CalendarSource::CalendarUrl(url)),
                "file" => url
                    .to_file_path()
                    .map(CalendarSource::CalendarFile)
                    .map_err(|_| eyre!("not a usable file url: {}", source)),
                scheme => bail!("unsupported url scheme {:?} in: {}", scheme, source),
            };
        };
        let path = base_dir.join(source);
        if path.exists() {
            Ok(CalendarSource::CalendarFile(path))
        } else {
            bail!("could not create CalendarSource from: {}", source);
        }
    }
}

/// Reads the raw iCalendar text of a source
pub trait SourceReader {
    fn read(&self, source: &CalendarSource) -> Result<String>;
}

/// Downloads urls with a blocking HTTP client and reads files from disk
#[derive(Debug)]
pub struct DefaultReader {
    client: Client,
}

impl DefaultReader {
    pub fn new() -> Result<DefaultReader> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("could not create the HTTP client")?;
        Ok(DefaultReader { client })
    }
}

impl SourceReader for DefaultReader {
    fn read(&self, source: &CalendarSource) -> Result<String> {
        match source {
            CalendarSource::CalendarUrl(url) => {
                debug!("downloading {}", url);
                let body = self
                    .client
                    .get(url.clone())
                    .send()
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.text())
                    .wrap_err_with(|| format!("failed to download {}", url))?;
                Ok(body)
            }
            CalendarSource::CalendarFile(path) => {
                debug!("reading {:?}", path);
                fs::read_to_string(path).wrap_err_with(|| format!("failed to read {:?}", path))
            }
        }
    }
}
