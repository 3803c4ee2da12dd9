//! HTTP(S) object store.
//!
//! Objects live under the same sharded path as on disk:
//! `HEAD`/`GET`/`PUT <endpoint>/<first 2 chars>/<remaining chars>`.

use crate::error::{Error, Result};
use crate::hash::Address;
use crate::store::ObjectStore;
use std::fmt;
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// An object store reached over HTTP.
#[derive(Clone)]
pub struct HttpRemote {
    endpoint: Url,
    location: String,
    agent: ureq::Agent,
}

impl HttpRemote {
    /// Create a remote for `endpoint`, optionally bounding each request by `timeout`.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let location = endpoint.as_str().to_string();
        Self {
            endpoint,
            location,
            agent: builder.build(),
        }
    }

    /// URL of the object stored under `address`.
    pub fn object_url(&self, address: &Address) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            address.prefix(),
            address.suffix()
        )
    }
}

impl fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemote")
            .field("endpoint", &self.location)
            .finish()
    }
}

fn transport_error(url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(code, response) => {
            Error::transport(url, format!("HTTP {} {}", code, response.status_text()))
        }
        ureq::Error::Transport(transport) => Error::transport(url, transport.to_string()),
    }
}

impl ObjectStore for HttpRemote {
    fn location(&self) -> &str {
        &self.location
    }

    fn exists(&self, address: &Address) -> Result<bool> {
        let url = self.object_url(address);
        match self.agent.head(&url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(e) => Err(transport_error(&url, e)),
        }
    }

    fn put(&self, address: &Address, reader: &mut dyn Read) -> Result<()> {
        if self.exists(address)? {
            debug!(%address, endpoint = %self.location, "object already present");
            return Ok(());
        }

        let url = self.object_url(address);
        self.agent
            .put(&url)
            .set("Content-Type", "application/octet-stream")
            .send(reader)
            .map_err(|e| transport_error(&url, e))?;

        debug!(%address, %url, "uploaded object");
        Ok(())
    }

    fn get(&self, address: &Address) -> Result<Box<dyn Read>> {
        let url = self.object_url(address);
        match self.agent.get(&url).call() {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(404, _)) => {
                Err(Error::object_not_found(address.to_key(), &self.location))
            }
            Err(e) => Err(transport_error(&url, e)),
        }
    }
}
