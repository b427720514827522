//! The requests issued against the key-value service.

use std::fmt;

use reqwest::Method;
use url::Url;

use crate::error::Result;

/// Identity of a virtual user, starting at 1.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct VuId(pub u32);

impl fmt::Display for VuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of operation, used to group metrics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// `GET /read`
    Read,
    /// `POST /create`
    Create,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("READ"),
            Self::Create => f.write_str("CREATE"),
        }
    }
}

/// The single outbound call produced by one iteration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Read the value stored under `key`.
    Read {
        /// The key to look up.
        key: u64,
    },
    /// Create or overwrite `key` with `value`.
    Create {
        /// The key to write.
        key: u64,
        /// The value to store.
        value: String,
    },
}

impl Request {
    /// The key this request targets.
    pub fn key(&self) -> u64 {
        match self {
            Self::Read { key } | Self::Create { key, .. } => *key,
        }
    }

    /// The kind of operation.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Read { .. } => Operation::Read,
            Self::Create { .. } => Operation::Create,
        }
    }

    /// HTTP method used for this request.
    pub fn method(&self) -> Method {
        match self {
            Self::Read { .. } => Method::GET,
            Self::Create { .. } => Method::POST,
        }
    }

    /// Path of the endpoint, relative to the service origin.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Read { .. } => "/read",
            Self::Create { .. } => "/create",
        }
    }

    /// Builds the full request URL on top of `base`.
    ///
    /// Any path already present on `base` is kept as a prefix.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let prefix = base.path().trim_end_matches('/');
        let mut url = base.clone();
        url.set_path(&format!("{prefix}{}", self.path()));
        url.set_fragment(None);

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.append_pair("key", &self.key().to_string());
            if let Self::Create { value, .. } = self {
                query.append_pair("value", value);
            }
        }

        Ok(url)
    }
}
