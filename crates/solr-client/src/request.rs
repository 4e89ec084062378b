//! HTTP request building for the Solr search handler.

use std::collections::HashMap;

/// Query strings longer than this are sent as a form POST instead of a GET.
pub const MAX_GET_QUERY_LENGTH: usize = 1024;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Builder for a single search handler request.
#[derive(Debug)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) form: Option<Vec<(String, String)>>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            form: None,
        }
    }

    /// Build a search request for `params`.
    ///
    /// Parameters go on the query string unless the encoded form exceeds
    /// [`MAX_GET_QUERY_LENGTH`], in which case they are posted as a form.
    pub fn search(url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        let encoded_len = serde_urlencoded::to_string(&params)
            .map(|s| s.len())
            .unwrap_or(usize::MAX);

        if encoded_len > MAX_GET_QUERY_LENGTH {
            RequestBuilder::new(RequestMethod::Post, url).form(params)
        } else {
            let mut builder = RequestBuilder::new(RequestMethod::Get, url);
            builder.query_params = params;
            builder
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set form body.
    pub fn form(mut self, data: Vec<(String, String)>) -> Self {
        self.form = Some(data);
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        self
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
