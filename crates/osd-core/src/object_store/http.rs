//! curl-backed object-store client speaking plain HTTP.
//!
//! Maps `(bucket, object)` onto `<endpoint>/<bucket>/<object>`. Metadata
//! comes from a HEAD probe (`Content-Length` + `Last-Modified`); part bytes
//! come from a ranged GET buffered per part, so memory use is bounded by the
//! configured part size per worker.

use super::{ObjectMetadata, ObjectStore};
use crate::part::Part;
use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::str;
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(3600);

/// Object store over plain HTTP (e.g. an S3-style gateway or static server).
pub struct HttpObjectStore {
    endpoint: Url,
}

impl HttpObjectStore {
    /// Create a client for the given endpoint base URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).context("invalid endpoint URL")?;
        Ok(HttpObjectStore { endpoint })
    }

    fn object_url(&self, bucket: &str, object: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("endpoint cannot be a base URL"))?;
            segments.pop_if_empty().push(bucket);
            // Objects may contain '/'; keep each component a real path segment.
            for component in object.split('/') {
                segments.push(component);
            }
        }
        Ok(url)
    }
}

impl ObjectStore for HttpObjectStore {
    fn get_metadata(&self, bucket: &str, object: &str) -> Result<ObjectMetadata> {
        let url = self.object_url(bucket, object)?;
        let mut header_lines: Vec<String> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).context("invalid object URL")?;
        easy.nobody(true)?; // HEAD request
        easy.follow_location(true)?;
        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.timeout(METADATA_TIMEOUT)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform().context("HEAD request failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("HEAD {} returned HTTP {}", url, code);
        }

        parse_metadata(&header_lines)
    }

    fn get_object_range(
        &self,
        bucket: &str,
        object: &str,
        part: &Part,
    ) -> Result<Box<dyn Read + Send>> {
        let url = self.object_url(bucket, object)?;
        let mut body: Vec<u8> = Vec::with_capacity(part.len() as usize);

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).context("invalid object URL")?;
        easy.follow_location(true)?;
        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.timeout(TRANSFER_TIMEOUT)?;
        easy.range(&format!("{}-{}", part.start, part.end))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("ranged GET failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("GET {} ({}) returned HTTP {}", url, part.range_header_value(), code);
        }

        let expected = part.len();
        if body.len() as u64 != expected {
            anyhow::bail!(
                "short range response for {}: expected {} bytes, got {}",
                part.range_header_value(),
                expected,
                body.len()
            );
        }

        Ok(Box::new(Cursor::new(body)))
    }
}

/// Parse collected HEAD response header lines into object metadata.
/// `Content-Length` is required; a missing `Last-Modified` becomes empty.
fn parse_metadata(lines: &[String]) -> Result<ObjectMetadata> {
    let mut size = None;
    let mut last_modified = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            if let Ok(n) = value.parse::<u64>() {
                size = Some(n);
            }
        }
        if name.eq_ignore_ascii_case("last-modified") {
            last_modified = Some(value.to_string());
        }
    }

    let size = size.context("response had no usable Content-Length")?;
    Ok(ObjectMetadata {
        size,
        last_modified: last_modified.unwrap_or_default(),
    })
}
