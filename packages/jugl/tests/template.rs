use std::sync::{Arc, Mutex};

use jugl::{
    ConditionFaultPolicy, Document, EvalError, ProcessOptions, Processed, ReflowHook, Scope,
    Template, TemplateConfig, TemplateDocument, TemplateError, Value,
};
use serde_json::json;

fn scope(context: serde_json::Value) -> Scope {
    Scope::from_json(context).unwrap()
}

fn render(markup: &str, context: serde_json::Value) -> String {
    let mut template = Template::parse_html(markup).unwrap();
    template.render(scope(context)).unwrap()
}

fn texts(template: &Template, nodes: &[usize]) -> Vec<String> {
    let doc = template.document().unwrap();
    nodes.iter().map(|id| doc.text_content(*id)).collect()
}

#[test]
fn repeated_root_produces_one_node_per_item() {
    let mut template =
        Template::parse_html(r#"<p jugl:repeat="item items" jugl:content="item">x</p>"#).unwrap();
    let processed = template
        .process(ProcessOptions::new().with_context(scope(json!({"items": ["a", "b"]}))))
        .unwrap();

    let nodes = processed.nodes().to_vec();
    assert_eq!(texts(&template, &nodes), ["a", "b"]);
    let doc = template.document().unwrap();
    assert_eq!(doc.outer_html(nodes[0]), "<p>a</p>");
}

#[test]
fn false_condition_removes_the_root() {
    let mut template = Template::parse_html(r#"<div jugl:condition="false">gone</div>"#).unwrap();
    let processed = template.process(ProcessOptions::new()).unwrap();
    assert_eq!(processed, Processed::Nodes(Vec::new()));

    let mut template = Template::parse_html(r#"<div jugl:condition="false">gone</div>"#).unwrap();
    let processed = template.process(ProcessOptions::new().as_string()).unwrap();
    assert_eq!(processed, Processed::Markup(String::new()));
}

#[test]
fn later_definitions_see_earlier_ones() {
    assert_eq!(
        render(
            r#"<div jugl:define="x 2; y x+3"><span jugl:content="y"></span></div>"#,
            json!({})
        ),
        "<span>5</span>"
    );
}

#[test]
fn definitions_do_not_leak_to_siblings() {
    let markup = r#"<div>
        <p jugl:define="a 1" jugl:content="a"></p>
        <p jugl:condition="a" id="second">still here</p>
    </div>"#;
    // `a` is undefined for the second paragraph, the fault fails closed and removes it
    let output = render(markup, json!({}));
    assert!(output.contains("<p>1</p>"));
    assert!(!output.contains("second"));
}

#[test]
fn condition_faults_can_propagate() {
    let mut template = Template::parse_html(r#"<div><p jugl:condition="missing.flag">x</p></div>"#)
        .unwrap()
        .with_config(TemplateConfig::default().with_condition_faults(ConditionFaultPolicy::Propagate));
    let err = template.render(Scope::new()).unwrap_err();
    assert_eq!(
        err.eval_error(),
        Some(&EvalError::UndefinedVariable("missing".into()))
    );
    let message = err.to_string();
    assert!(message.contains("jugl:condition"), "{message}");
    assert!(message.contains("missing.flag"), "{message}");
}

#[test]
fn condition_faults_can_fail_open() {
    let mut template = Template::parse_html(r#"<div><p jugl:condition="nope">kept</p></div>"#)
        .unwrap()
        .with_config(TemplateConfig::default().with_condition_faults(ConditionFaultPolicy::FailOpen));
    assert_eq!(template.render(Scope::new()).unwrap(), "<p>kept</p>");
}

#[test]
fn expression_faults_abort_processing() {
    let mut template =
        Template::parse_html(r#"<div><span jugl:content="1 +"></span></div>"#).unwrap();
    let err = template.render(Scope::new()).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Expression {
            source: EvalError::Syntax { .. },
            ..
        }
    ));
}

#[test]
fn repeat_exposes_loop_status() {
    let output = render(
        r#"<ul><li jugl:repeat="x items"
                   jugl:content="repeat.x.number + '/' + repeat.x.length + (repeat.x.end ? '!' : '')"
                   jugl:attributes="class repeat.x.odd ? 'odd' : 'even'"></li></ul>"#,
        json!({"items": ["a", "b", "c"]}),
    );
    assert_eq!(
        output,
        r#"<li class="even">1/3</li><li class="odd">2/3</li><li class="even">3/3!</li>"#
    );
}

#[test]
fn repeat_over_objects_and_nested_loops() {
    let output = render(
        r#"<table><tbody><tr jugl:repeat="row rows"><td jugl:repeat="cell row" jugl:content="cell"></td></tr></tbody></table>"#,
        json!({"rows": [[1, 2], {"a": 3, "b": 4}]}),
    );
    // Objects repeat over their keys
    assert_eq!(
        output,
        "<tbody><tr><td>1</td><td>2</td></tr><tr><td>a</td><td>b</td></tr></tbody>"
    );
}

#[test]
fn repeat_clones_drop_the_id() {
    let output = render(
        r#"<ul><li id="proto" jugl:repeat="x items" jugl:content="x"></li></ul>"#,
        json!({"items": [1]}),
    );
    assert_eq!(output, "<li>1</li>");
}

#[test]
fn malformed_repeat_is_reported() {
    let mut template =
        Template::parse_html(r#"<ul><li jugl:repeat="items"></li></ul>"#).unwrap();
    let err = template.render(scope(json!({"items": [1]}))).unwrap_err();
    assert!(matches!(err, TemplateError::MalformedStatement { .. }));
}

#[test]
fn attributes_set_and_remove() {
    let output = render(
        r##"<div><a title="old" href="#" jugl:attributes="href url; title false; data-n n + 1">x</a></div>"##,
        json!({"url": "/home", "n": 1}),
    );
    assert_eq!(output, r#"<a href="/home" data-n="2">x</a>"#);
}

#[test]
fn escaped_semicolons_survive_statement_lists() {
    let output = render(
        r#"<div><a jugl:attributes="title 'a;;b'; rel 'c'">x</a></div>"#,
        json!({}),
    );
    assert_eq!(output, r#"<a title="a;b" rel="c">x</a>"#);
}

#[test]
fn text_content_is_escaped_and_structure_is_parsed() {
    let context = json!({"html": "<b>bold</b> & more"});
    assert_eq!(
        render(r#"<div><p jugl:content="html"></p></div>"#, context.clone()),
        "<p>&lt;b&gt;bold&lt;/b&gt; &amp; more</p>"
    );
    assert_eq!(
        render(r#"<div><p jugl:content="structure html"></p></div>"#, context.clone()),
        "<p><b>bold</b> &amp; more</p>"
    );
    assert_eq!(
        render(r#"<div><p jugl:content="text html"></p></div>"#, context),
        "<p>&lt;b&gt;bold&lt;/b&gt; &amp; more</p>"
    );
}

#[test]
fn content_skips_children_processing() {
    assert_eq!(
        render(
            r#"<div><p jugl:content="'new'"><span jugl:content="missing">old</span></p></div>"#,
            json!({})
        ),
        "<p>new</p>"
    );
}

#[test]
fn replace_swaps_the_element() {
    assert_eq!(
        render(
            r#"<div><span jugl:replace="'plain'">x</span>|<i jugl:replace="structure '<b>1</b><b>2</b>'"></i></div>"#,
            json!({})
        ),
        "plain|<b>1</b><b>2</b>"
    );
}

#[test]
fn content_wins_over_replace() {
    assert_eq!(
        render(
            r#"<div><p jugl:replace="'r'" jugl:content="'c'">x</p></div>"#,
            json!({})
        ),
        "<p>c</p>"
    );
}

#[test]
fn omit_tag_keeps_children() {
    assert_eq!(
        render(
            r#"<div><span jugl:omit-tag="">a<b jugl:content="n">?</b></span><em jugl:omit-tag="n > 5">kept</em></div>"#,
            json!({"n": 1})
        ),
        "a<b>1</b><em>kept</em>"
    );
}

#[test]
fn statement_attributes_never_reach_the_output() {
    let output = render(
        r#"<div jugl:define="a 1"><p jugl:condition="true" jugl:attributes="x a" jugl:reflow="">t</p></div>"#,
        json!({}),
    );
    assert_eq!(output, r#"<p x="1">t</p>"#);
}

#[derive(Clone, Default)]
struct RecordReflow(Arc<Mutex<Vec<String>>>);

impl ReflowHook for RecordReflow {
    fn reflow(&self, doc: &mut Document, node_id: usize) {
        self.0.lock().unwrap().push(doc.node_debug_str(node_id));
    }
}

#[test]
fn reflow_hook_sees_flagged_elements() {
    let hook = RecordReflow::default();
    let mut template = Template::parse_html(
        r#"<div><p class="a" jugl:reflow="">1</p><p class="b" jugl:reflow="false">2</p></div>"#,
    )
    .unwrap()
    .with_config(TemplateConfig::default().with_reflow(hook.clone()));
    template.render(Scope::new()).unwrap();

    let calls = hook.0.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("class=\"a\""), "{calls:?}");
}

#[test]
fn cloned_processing_leaves_the_template_reusable() {
    let mut template =
        Template::parse_html(r#"<div id="t"><b jugl:content="name"></b></div>"#).unwrap();
    assert_eq!(
        template.render(scope(json!({"name": "one"}))).unwrap(),
        "<b>one</b>"
    );
    assert_eq!(
        template.render(scope(json!({"name": "two"}))).unwrap(),
        "<b>two</b>"
    );

    let doc = template.document().unwrap();
    let root = template.node().unwrap();
    assert_eq!(doc.inner_html(root), r#"<b jugl:content="name"></b>"#);
}

#[test]
fn in_place_processing_consumes_a_repeated_root() {
    let mut template =
        Template::parse_html(r#"<p jugl:repeat="x items" jugl:content="x"></p>"#).unwrap();
    template
        .process(ProcessOptions::new().with_context(scope(json!({"items": [1]}))))
        .unwrap();
    assert!(matches!(
        template.process(ProcessOptions::new()),
        Err(TemplateError::RootConsumed(_))
    ));
}

#[test]
fn element_lookup_by_id() {
    let doc = TemplateDocument::from_html(r#"<div><ul id="list"><li>1</li></ul></div>"#);
    let template = Template::from_element_id(doc, "list").unwrap();
    let doc = template.document().unwrap();
    assert_eq!(doc.node_debug_str(template.node().unwrap()), r#"<ul id="list">"#);

    let doc = TemplateDocument::from_html("<div></div>");
    let err = Template::from_element_id(doc, "nope").err().unwrap();
    assert_eq!(err.to_string(), "Element id not found: nope");
}

#[test]
fn pending_templates_are_not_processable_until_loaded() {
    let mut template = Template::pending();
    assert!(!template.is_loaded());
    assert!(matches!(
        template.process(ProcessOptions::new()),
        Err(TemplateError::NotLoaded)
    ));

    template.begin_loading();
    assert!(template.is_loading());
    let doc = TemplateDocument::from_html(r#"<p jugl:content="1 + 1"></p>"#);
    let root = doc.template_root().unwrap();
    template.finish_loading(doc, root);
    assert!(template.is_loaded());
    assert!(!template.is_loading());
    assert_eq!(template.render(Scope::new()).unwrap(), "2");
}

#[test]
fn results_can_be_appended_to_another_document() {
    let mut target = TemplateDocument::from_html(r#"<main id="out"></main>"#);
    let out = target.get_element_by_id("out").unwrap();

    let mut template = Template::parse_html(
        r#"<li jugl:repeat="x items" jugl:content="upper(x)"></li>"#,
    )
    .unwrap();
    let imported = template
        .process_into(
            ProcessOptions::new()
                .with_context(scope(json!({"items": ["a", "b"]})))
                .cloned(),
            &mut target,
            out,
        )
        .unwrap();
    assert_eq!(imported.len(), 2);
    assert_eq!(target.inner_html(out), "<li>A</li><li>B</li>");

    // The template itself is untouched and can be appended as-is
    template.append_to(&mut target, out).unwrap();
    assert_eq!(target.get_node(out).unwrap().children.len(), 3);
}

#[test]
fn custom_prefix_and_globals() {
    let config = TemplateConfig::default()
        .with_prefix("tpl")
        .with_global("site", "Jugl");
    let mut template =
        Template::parse_html(r#"<div><h1 tpl:content="site + ' ' + len(items)"></h1><p jugl:content="x">keep</p></div>"#)
            .unwrap()
            .with_config(config);
    assert_eq!(
        template.render(scope(json!({"items": [1, 2]}))).unwrap(),
        r#"<h1>Jugl 2</h1><p jugl:content="x">keep</p>"#
    );
}

#[test]
fn context_values_can_be_built_by_hand() {
    let context = Scope::new()
        .with("user", Value::object([("name", Value::from("Ada"))]))
        .with(
            "shout",
            Value::function("shout", |args| Ok(Value::from(format!("{}!", args[0])))),
        );
    let mut template =
        Template::parse_html(r#"<div><b jugl:content="shout(user.name)"></b></div>"#).unwrap();
    assert_eq!(template.render(context).unwrap(), "<b>Ada!</b>");
}

#[test]
fn defaulted_statements_are_ignored() {
    use jugl_dom::{LocalName, QualName, ns};

    let mut template = Template::parse_html("<div><p>kept</p></div>").unwrap();
    let root = template.node().unwrap();
    let doc = template.document_mut().unwrap();
    let p = doc.child_elements(root).next().unwrap();
    doc.get_node_mut(p)
        .and_then(|node| node.element_data_mut())
        .unwrap()
        .add_default_attr(
            QualName::new(None, ns!(), LocalName::from("jugl:condition")),
            "false",
        );

    // Only written-out attributes are statements
    let output = template.render(Scope::new()).unwrap();
    assert!(output.starts_with("<p"), "{output}");
    assert!(output.contains(">kept</p>"), "{output}");
}

#[test]
fn released_copies_leave_the_document() {
    let mut template = Template::parse_html(
        r#"<ul><li jugl:repeat="x items" jugl:content="x"></li></ul>"#,
    )
    .unwrap();
    let initial = template.document().unwrap().tree().len();

    for _ in 0..100 {
        let processed = template
            .process_with(scope(json!({"items": [1, 2, 3]})))
            .unwrap();
        let list = processed.nodes()[0];
        assert_eq!(template.document().unwrap().inner_html(list), "<li>1</li><li>2</li><li>3</li>");
        assert!(template.release(&processed));
        assert!(!template.release(&processed));
    }
    assert_eq!(template.document().unwrap().tree().len(), initial);

    // Rendering never keeps a copy around
    template.render(scope(json!({"items": [1]}))).unwrap();
    assert_eq!(template.document().unwrap().tree().len(), initial);
}

#[test]
fn empty_repeat_leaves_nothing_behind() {
    for items in [json!([]), json!({}), json!(""), json!(null)] {
        let output = render(
            r#"<ul><li jugl:repeat="x items" jugl:content="x">original</li><li>after</li></ul>"#,
            json!({ "items": items }),
        );
        assert_eq!(output, "<li>after</li>");
    }
}

#[test]
fn markup_without_statements_is_unchanged() {
    let inner = r#"<p class="a" title="x y">one <b>two</b><br>three</p><!-- note --><table><tbody><tr><td>1</td></tr></tbody></table>"#;
    let mut template = Template::parse_html(&format!("<div id=\"t\">{inner}</div>")).unwrap();
    assert_eq!(template.render(Scope::new()).unwrap(), inner);
    // Twice, from the same template
    assert_eq!(template.render(Scope::new()).unwrap(), inner);
}

#[test]
fn deeply_nested_expressions_are_syntax_errors() {
    let expression = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
    let mut template = Template::parse_html(&format!(
        r#"<div><p jugl:content="{expression}"></p></div>"#
    ))
    .unwrap();
    let err = template.render(Scope::new()).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Expression {
            source: EvalError::Syntax { .. },
            ..
        }
    ));
}

#[test]
fn oversized_ranges_are_type_errors() {
    let mut template = Template::parse_html(
        r#"<div><p jugl:content="len(range(1e17, 1e17 + 1e9))"></p></div>"#,
    )
    .unwrap();
    let err = template.render(Scope::new()).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Expression {
            source: EvalError::Type(_),
            ..
        }
    ));
}
