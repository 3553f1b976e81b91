use std::io::Write;

use jugl::{Scope, Template, TemplateConfig};
use jugl_net::{LoadError, Provider};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const XML_TEMPLATE: &str = r#"<?xml version="1.0"?>
<list xmlns:jugl="http://namespace.jugl.org/"><item jugl:repeat="x items" jugl:content="x"/></list>"#;

fn context() -> Scope {
    Scope::from_json(json!({"items": ["a", "b"]})).unwrap()
}

async fn serve(route: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).unwrap()
}

#[tokio::test]
async fn loads_xml_over_http() {
    let server = serve("/list.xml", XML_TEMPLATE).await;
    let provider = Provider::new(TemplateConfig::default());

    let mut template = provider.load_template(url(&server, "/list.xml")).await.unwrap();
    assert!(template.document().unwrap().is_xml());
    assert_eq!(
        template.render(context()).unwrap(),
        r#"<list xmlns:jugl="http://namespace.jugl.org/"><item>a</item><item>b</item></list>"#
    );
}

#[tokio::test]
async fn falls_back_to_html() {
    let body = r#"<ul><li jugl:repeat="x items" jugl:content="x"><br></li></ul>"#;
    let server = serve("/list.html", body).await;
    let provider = Provider::new(TemplateConfig::default());

    let mut template = provider.load_template(url(&server, "/list.html")).await.unwrap();
    assert!(!template.document().unwrap().is_xml());
    assert_eq!(template.render(context()).unwrap(), "<li>a</li><li>b</li>");
}

#[tokio::test]
async fn error_statuses_are_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let provider = Provider::new(TemplateConfig::default());

    let err = provider
        .load_template(url(&server, "/missing.html"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Status(404)));
    assert!(err.is_fetch_error());
}

#[tokio::test]
async fn unreachable_hosts_are_network_errors() {
    let provider = Provider::new(TemplateConfig::default());
    let err = provider
        .load_template(Url::parse("http://127.0.0.1:1/template.html").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Network(_)));
}

#[tokio::test]
async fn unparsable_responses_are_not_fetch_errors() {
    let server = serve("/empty", "   ").await;
    let provider = Provider::new(TemplateConfig::default());

    let err = provider.load_template(url(&server, "/empty")).await.unwrap_err();
    match &err {
        LoadError::Unparsable { url } => assert!(url.ends_with("/empty")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_fetch_error());
}

#[tokio::test]
async fn loads_files() {
    let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    file.write_all(XML_TEMPLATE.as_bytes()).unwrap();
    let file_url = Url::from_file_path(file.path()).unwrap();

    let provider = Provider::new(TemplateConfig::default());
    let mut template = provider.load_template(file_url).await.unwrap();
    assert!(template.render(context()).unwrap().contains("<item>b</item>"));
}

#[tokio::test]
async fn file_urls_are_percent_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("my list.xml");
    std::fs::write(&path, XML_TEMPLATE).unwrap();
    let file_url = Url::from_file_path(&path).unwrap();
    assert!(file_url.as_str().ends_with("/my%20list.xml"));

    let provider = Provider::new(TemplateConfig::default());
    let mut template = provider.load_template(file_url).await.unwrap();
    assert!(template.render(context()).unwrap().contains("<item>a</item>"));
}

#[tokio::test]
async fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file_url = Url::from_file_path(dir.path().join("nope.xml")).unwrap();

    let provider = Provider::new(TemplateConfig::default());
    let err = provider.load_template(file_url).await.unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[tokio::test]
async fn load_into_keeps_the_pending_configuration() {
    let server = serve("/greeting.html", r#"<p t:content="greeting"><br></p>"#).await;
    let provider = Provider::new(TemplateConfig::default());

    let mut template = Template::pending().with_config(TemplateConfig::default().with_prefix("t"));
    assert!(!template.is_loaded());

    provider
        .load_into(&mut template, url(&server, "/greeting.html"))
        .await
        .unwrap();
    assert!(template.is_loaded());
    assert!(!template.is_loading());

    let context = Scope::from_json(json!({"greeting": "hi"})).unwrap();
    // HTML output is the root's children
    assert_eq!(template.render(context).unwrap(), "hi");
}

#[tokio::test(flavor = "multi_thread")]
async fn callbacks_run_on_the_runtime() {
    let server = serve("/list.xml", XML_TEMPLATE).await;
    let provider = Provider::new(TemplateConfig::default());

    let (tx, rx) = tokio::sync::oneshot::channel();
    provider.load_with_callback(
        url(&server, "/list.xml"),
        Box::new(move |result| {
            let rendered = result.map(|mut template| template.render(context()));
            let _ = tx.send(rendered);
        }),
    );

    let rendered = rx.await.unwrap().unwrap().unwrap();
    assert!(rendered.starts_with("<list"));
}
