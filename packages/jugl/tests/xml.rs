use jugl::{ProcessOptions, Scope, Template, TemplateConfig, TemplateError};
use jugl_dom::MarkupError;
use serde_json::json;

const JUGL_NS: &str = r#"xmlns:jugl="http://namespace.jugl.org/""#;

fn scope(context: serde_json::Value) -> Scope {
    Scope::from_json(context).unwrap()
}

#[test]
fn namespaced_statements_are_processed() {
    let mut template = Template::parse_xml(&format!(
        r#"<list {JUGL_NS}><item jugl:repeat="x items" jugl:content="x"/></list>"#
    ))
    .unwrap();
    assert_eq!(
        template.render(scope(json!({"items": ["a", "b"]}))).unwrap(),
        format!("<list {JUGL_NS}><item>a</item><item>b</item></list>")
    );
}

#[test]
fn foreign_namespaces_fall_back_to_literal_names() {
    // Declared, but not with the configured URI
    let mut template = Template::parse_xml(
        r#"<list xmlns:jugl="urn:elsewhere"><item jugl:content="1 + 1"/></list>"#,
    )
    .unwrap();
    assert_eq!(
        template.render(Scope::new()).unwrap(),
        r#"<list xmlns:jugl="urn:elsewhere"><item>2</item></list>"#
    );
}

#[test]
fn statements_in_other_namespaces_are_left_alone() {
    let mut template = Template::parse_xml(&format!(
        r#"<list {JUGL_NS} xmlns:other="urn:other"><item other:content="x" jugl:content="'y'"/></list>"#
    ))
    .unwrap();
    let output = template.render(Scope::new()).unwrap();
    assert!(output.contains(r#"<item other:content="x">y</item>"#), "{output}");
}

#[test]
fn structure_content_parses_as_xml() {
    let mut template = Template::parse_xml(&format!(
        r#"<doc {JUGL_NS}><body jugl:content="structure markup"/></doc>"#
    ))
    .unwrap();
    let output = template
        .render(scope(json!({"markup": "<p a=\"1\">x<br/></p>"})))
        .unwrap();
    assert_eq!(
        output,
        format!(r#"<doc {JUGL_NS}><body><p a="1">x<br/></p></body></doc>"#)
    );
}

#[test]
fn malformed_structure_falls_back_to_html() {
    let markup = format!(r#"<doc {JUGL_NS}><body jugl:content="structure '&lt;br&gt;x'"/></doc>"#);

    let mut template = Template::parse_xml(&markup).unwrap();
    assert_eq!(
        template.render(Scope::new()).unwrap(),
        format!("<doc {JUGL_NS}><body><br/>x</body></doc>")
    );

    let mut strict = Template::parse_xml(&markup)
        .unwrap()
        .with_config(TemplateConfig::default().strict_xml(true));
    let err = strict.render(Scope::new()).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Markup {
            source: MarkupError::Malformed { .. },
            ..
        }
    ));
}

#[test]
fn xml_output_is_serialized_as_a_whole() {
    let mut template = Template::parse_xml(&format!(
        r#"<?xml version="1.0"?><entry {JUGL_NS} jugl:attributes="id n"><empty/></entry>"#
    ))
    .unwrap();
    let processed = template
        .process(
            ProcessOptions::new()
                .with_context(scope(json!({"n": 7})))
                .as_string(),
        )
        .unwrap();
    assert_eq!(
        processed.into_markup().unwrap(),
        format!(r#"<entry {JUGL_NS} id="7"><empty/></entry>"#)
    );
}

#[test]
fn sniffing_picks_the_parser() {
    let template = Template::parse(r#"<?xml version="1.0"?><a/>"#).unwrap();
    assert!(template.document().unwrap().is_xml());
    let template = Template::parse("<a></a>").unwrap();
    assert!(!template.document().unwrap().is_xml());

    assert!(matches!(
        Template::parse_xml("<a><b></a>"),
        Err(TemplateError::Markup { .. })
    ));
}
