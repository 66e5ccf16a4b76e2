use crate::dav::endpoints::DavEndpoints;
use crate::dav::error::{DavError, DavResult};
use crate::dav::propfind::{parse_multistatus, PROPFIND_BODY};
use crate::dav::transport::DavTransport;
use crate::dav::types::{DavAccount, FileMetadata, RequestOptions, HEADER_DESTINATION, HEADER_OVERWRITE};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, RequestBuilder, Response};
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

const PROPFIND: &str = "PROPFIND";
const MKCOL: &str = "MKCOL";
const MOVE: &str = "MOVE";

/// WebDAV extension method; a name that is not a valid token is an error
fn dav_method(name: &str) -> DavResult<Method> {
    Method::from_bytes(name.as_bytes()).map_err(|_| DavError::InvalidMethod(name.to_string()))
}

/// WebDAV client for one account.
///
/// Cloning is cheap and clones share the underlying connection pool, so a
/// single client can serve any number of concurrent upload sessions.
#[derive(Clone)]
pub struct DavClient {
    http: Client,
    account: Arc<DavAccount>,
}

impl DavClient {
    /// `request_timeout` bounds connecting and each wait for data, not a
    /// whole transfer; a chunk PUT may take as long as it keeps moving.
    pub fn new(account: DavAccount) -> DavResult<Self> {
        let http = Client::builder()
            .user_agent(account.user_agent.clone())
            .connect_timeout(account.request_timeout)
            .read_timeout(account.request_timeout)
            .build()
            .map_err(|e| DavError::Request(e.to_string()))?;

        Ok(Self {
            http,
            account: Arc::new(account),
        })
    }

    pub fn account(&self) -> &DavAccount {
        &self.account
    }

    pub fn endpoints(&self) -> DavEndpoints {
        DavEndpoints::new(&self.account.base_url, &self.account.user_id)
    }

    /// Build a request carrying the standard headers followed by the caller's
    fn request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        extra: &[(&str, String)],
    ) -> DavResult<RequestBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert("OCS-APIRequest", HeaderValue::from_static("true"));

        let custom = options
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));
        let extra = extra.iter().map(|(name, value)| (*name, value.as_str()));
        for (name, value) in custom.chain(extra) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DavError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| DavError::InvalidHeader(format!("{name}: {value}")))?;
            headers.insert(name, value);
        }

        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&self.account.user, Some(&self.account.password))
            .headers(headers);

        // Whole-request deadline, only for calls that ask for one
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        Ok(request)
    }

    /// Send and turn non-2xx answers into errors
    async fn send(&self, method: &Method, url: &str, request: RequestBuilder) -> DavResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DavError::from_reqwest(e, url))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(DavError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(DavError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!("{} {} -> {}", method, url, status);
        Ok(response)
    }
}

impl DavTransport for DavClient {
    async fn read_metadata(&self, url: &str, options: &RequestOptions) -> DavResult<FileMetadata> {
        let method = dav_method(PROPFIND)?;
        let request = self
            .request(
                method.clone(),
                url,
                options,
                &[("Depth", "0".to_string())],
            )?
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);

        let response = self.send(&method, url, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DavError::from_reqwest(e, url))?;

        parse_multistatus(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| DavError::EmptyMultistatus(url.to_string()))
    }

    async fn create_collection(&self, url: &str, options: &RequestOptions) -> DavResult<()> {
        let method = dav_method(MKCOL)?;
        let request = self.request(method.clone(), url, options, &[])?;
        self.send(&method, url, request).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        url: &str,
        options: &RequestOptions,
    ) -> DavResult<()> {
        let file = tokio::fs::File::open(local_path).await?;
        let length = file.metadata().await?.len();

        let method = Method::PUT;
        let request = self
            .request(method.clone(), url, options, &[])?
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)));

        self.send(&method, url, request).await?;
        Ok(())
    }

    async fn move_resource(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        options: &RequestOptions,
    ) -> DavResult<()> {
        let method = dav_method(MOVE)?;
        let overwrite = if overwrite { "T" } else { "F" };
        let request = self.request(
            method.clone(),
            source,
            options,
            &[
                (HEADER_DESTINATION, destination.to_string()),
                (HEADER_OVERWRITE, overwrite.to_string()),
            ],
        )?;

        self.send(&method, source, request).await?;
        Ok(())
    }
}
