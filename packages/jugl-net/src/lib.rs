//! Template loading (HTTP, filesystem, Data URIs) for Jugl
//!
//! Fetches markup and hands it back as a loaded [`Template`]. Responses are parsed as XML first
//! and reparsed as HTML when they are not well-formed.

use data_url::DataUrl;
use jugl::{Template, TemplateConfig};
use jugl_html::TemplateDocument;
use tokio::runtime::Handle;
use url::Url;

const USER_AGENT: &str = concat!("jugl/", env!("CARGO_PKG_VERSION"));

pub type LoadCallback = Box<dyn FnOnce(Result<Template, LoadError>) + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid data url: {0:?}")]
    DataUrl(data_url::DataUrlError),
    #[error("invalid base64 in data url")]
    DataUrlBase64(data_url::forgiving_base64::InvalidBase64),
    #[error("response is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("no template element could be parsed from {url}")]
    Unparsable { url: String },
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

impl From<data_url::DataUrlError> for LoadError {
    fn from(value: data_url::DataUrlError) -> Self {
        Self::DataUrl(value)
    }
}

impl From<data_url::forgiving_base64::InvalidBase64> for LoadError {
    fn from(value: data_url::forgiving_base64::InvalidBase64) -> Self {
        Self::DataUrlBase64(value)
    }
}

impl LoadError {
    /// Whether the document never arrived, as opposed to arriving in a form that could not be
    /// turned into a template.
    pub fn is_fetch_error(&self) -> bool {
        !matches!(self, Self::Utf8(_) | Self::Unparsable { .. })
    }
}

/// Parse fetched markup into a template. XML is tried first; markup that is not well-formed XML
/// is reparsed as HTML, which must contain at least one element in its body.
pub fn parse_template(markup: &str, config: &TemplateConfig) -> Option<Template> {
    let template = match TemplateDocument::from_xml(markup) {
        Ok(document) => {
            let root = document.template_root()?;
            Template::new(document, root)
        }
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Reparsing as HTML: {_err}");

            let document = TemplateDocument::from_html(markup);
            let root = document.template_root()?;
            // Only the implied <html> wrapper, nothing the author wrote
            if Some(root) == document.root_element_id() {
                return None;
            }
            Template::new(document, root)
        }
    };
    Some(template.with_config(config.clone()))
}

/// Fetches templates on a tokio runtime.
pub struct Provider {
    rt: Handle,
    client: reqwest::Client,
    config: TemplateConfig,
}

impl Provider {
    /// A provider spawning onto the current tokio runtime. Panics outside of one.
    pub fn new(config: TemplateConfig) -> Self {
        Self::with_handle(Handle::current(), config)
    }

    pub fn with_handle(rt: Handle, config: TemplateConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { rt, client, config }
    }

    /// The configuration given to every template this provider loads.
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    async fn fetch_inner(client: reqwest::Client, url: Url) -> Result<(String, Vec<u8>), LoadError> {
        Ok(match url.scheme() {
            "data" => {
                let data_url = DataUrl::process(url.as_str())?;
                let decoded = data_url.decode_to_vec()?;
                (url.to_string(), decoded.0)
            }
            "file" => {
                let path = url.to_file_path().map_err(|()| {
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("not a local file path: {url}"),
                    )
                })?;
                let file_content = std::fs::read(path)?;
                (url.to_string(), file_content)
            }
            "http" | "https" => {
                let response = client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status(status.as_u16()));
                }
                let response_url = response.url().to_string();
                (response_url, response.bytes().await?.to_vec())
            }
            scheme => return Err(LoadError::UnsupportedScheme(scheme.to_string())),
        })
    }

    /// Fetch the raw markup at `url`, returning the final url (after redirects) and its text.
    pub async fn fetch_markup(&self, url: Url) -> Result<(String, String), LoadError> {
        #[cfg(feature = "tracing")]
        let start = std::time::Instant::now();
        #[cfg(feature = "tracing")]
        tracing::info!("Fetching {url}");

        let result = Self::fetch_inner(self.client.clone(), url.clone()).await;

        #[cfg(feature = "tracing")]
        match &result {
            Ok((response_url, _)) => {
                tracing::info!("Loaded {} in: {}ms", response_url, start.elapsed().as_millis())
            }
            Err(e) => tracing::warn!("Error fetching {url}: {e}"),
        }

        let (response_url, bytes) = result?;
        Ok((response_url, String::from_utf8(bytes)?))
    }

    /// Fetch and parse the template at `url`.
    pub async fn load_template(&self, url: Url) -> Result<Template, LoadError> {
        let (response_url, markup) = self.fetch_markup(url).await?;
        parse_template(&markup, &self.config).ok_or(LoadError::Unparsable { url: response_url })
    }

    /// Load `url` into a pending `template`, keeping the template's own configuration.
    ///
    /// The template reports [`Template::is_loading`] while the fetch is in flight and is left
    /// unloaded if it fails.
    pub async fn load_into(&self, template: &mut Template, url: Url) -> Result<(), LoadError> {
        template.begin_loading();
        let loaded = match self.load_template(url).await {
            Ok(loaded) => loaded,
            Err(e) => {
                template.abort_loading();
                return Err(e);
            }
        };

        let node = loaded.node();
        match (node, loaded.into_document()) {
            (Some(node), Some(document)) => {
                template.finish_loading(document, node);
                Ok(())
            }
            // parse_template never hands back an unloaded template
            _ => {
                template.abort_loading();
                Err(LoadError::Unparsable {
                    url: String::from("<unknown>"),
                })
            }
        }
    }

    /// Load `url` in the background and call `callback` once with the outcome.
    pub fn load_with_callback(&self, url: Url, callback: LoadCallback) {
        let client = self.client.clone();
        let config = self.config.clone();
        let rt = self.rt.clone();
        self.rt.spawn(async move {
            let provider = Provider { rt, client, config };
            callback(provider.load_template(url).await);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider::new(TemplateConfig::default())
    }

    fn data_url(markup: &str) -> Url {
        let encoded: String = markup
            .bytes()
            .map(|b| match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => (b as char).to_string(),
                _ => format!("%{b:02X}"),
            })
            .collect();
        Url::parse(&format!("data:text/html,{encoded}")).unwrap()
    }

    #[test]
    fn well_formed_markup_parses_as_xml() {
        let template = parse_template("<list><item/></list>", &TemplateConfig::default()).unwrap();
        assert!(template.document().unwrap().is_xml());
    }

    #[test]
    fn malformed_markup_is_reparsed_as_html() {
        let template = parse_template("<ul><li>a<li>b</ul>", &TemplateConfig::default()).unwrap();
        let document = template.document().unwrap();
        assert!(!document.is_xml());
        assert_eq!(document.node_debug_str(template.node().unwrap()), "<ul>");
    }

    #[test]
    fn text_without_elements_is_unparsable() {
        assert!(parse_template("just words", &TemplateConfig::default()).is_none());
    }

    #[tokio::test]
    async fn loads_data_urls() {
        let url = data_url(r#"<p xmlns:jugl="http://namespace.jugl.org/" jugl:content="1 + 2"/>"#);
        let mut template = provider().load_template(url).await.unwrap();
        assert!(template.document().unwrap().is_xml());
        assert!(template.render(jugl::Scope::new()).unwrap().ends_with(">3</p>"));
    }

    #[tokio::test]
    async fn rejects_unsupported_schemes() {
        let url = Url::parse("ftp://example.com/template.html").unwrap();
        let err = provider().load_template(url).await.unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedScheme(ref scheme) if scheme == "ftp"));
        assert!(err.is_fetch_error());
    }

    #[tokio::test]
    async fn remote_file_urls_are_not_found() {
        let url = Url::parse("file://fileserver/templates/list.xml").unwrap();
        let err = provider().load_template(url).await.unwrap_err();
        assert!(matches!(err, LoadError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn failed_loads_leave_the_template_pending() {
        let mut template = Template::pending();
        let url = Url::parse("data:text/html,plain%20text").unwrap();
        let err = provider().load_into(&mut template, url).await.unwrap_err();
        assert!(matches!(err, LoadError::Unparsable { .. }));
        assert!(!err.is_fetch_error());
        assert!(!template.is_loaded());
        assert!(!template.is_loading());
    }

    #[tokio::test]
    async fn callbacks_receive_the_template() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        provider().load_with_callback(
            data_url("<a/>"),
            Box::new(move |result| {
                let _ = tx.send(result.map(|template| template.node().is_some()));
            }),
        );
        assert!(rx.await.unwrap().unwrap());
    }
}
