use modbox_core::{
    DomAdapter, DomBinding, DomEvent, DomHandler, ElementConfig, HttpMethod, LoopbackTransport,
    MemoryDocument, ModuleRegistry, Sandbox, SandboxError, IN_PLACE_CLASS,
};
use std::cell::Cell;
use std::rc::Rc;

struct Page {
    doc: Rc<MemoryDocument>,
    transport: Rc<LoopbackTransport>,
    registry: ModuleRegistry,
}

fn page() -> Page {
    let doc = Rc::new(MemoryDocument::new());
    let body = doc.body().expect("body");
    let widget = doc.insert_element(body, "div", &[("id", "widget")]);
    let list = doc.insert_element(widget, "ul", &[("class", "entries")]);
    doc.insert_element(list, "li", &[("class", "entry")]);
    doc.insert_element(list, "li", &[("class", "entry")]);
    doc.insert_element(body, "li", &[("class", "entry outside")]);

    let transport = Rc::new(LoopbackTransport::new());
    let registry = ModuleRegistry::with_transport(doc.clone(), transport.clone());
    Page {
        doc,
        transport,
        registry,
    }
}

#[test]
fn parent_is_the_container_resolved_by_id() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    assert_eq!(sandbox.parent(), page.doc.element_by_id("widget"));
    assert_eq!(sandbox.module_id(), "widget");

    assert_eq!(sandbox.require_parent().ok(), sandbox.parent());

    let orphan = Sandbox::new(&page.registry, "missing");
    assert!(orphan.parent().is_none());
    assert_eq!(
        orphan.require_parent(),
        Err(SandboxError::MissingContainer("missing".to_string()))
    );
    assert!(orphan.find("li").is_empty());
}

#[test]
fn find_is_scoped_to_the_container() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    assert_eq!(sandbox.find(".entry").len(), 2);
    assert_eq!(sandbox.find("ul").query("li").len(), 2);
    assert!(sandbox.find("#widget").is_empty());
}

#[test]
fn find_with_non_ascii_selector_matches_nothing() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    assert!(sandbox.find("*é").is_empty());
    assert!(sandbox.find("ul").query("*é").is_empty());
}

#[test]
fn add_event_defaults_bare_handlers_to_click() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let container = sandbox.parent().expect("container");
    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    let handler: DomHandler = Rc::new(move |event: &DomEvent| {
        assert_eq!(event.event_type, "click");
        counter.set(counter.get() + 1);
    });

    sandbox
        .add_event(container, Rc::clone(&handler))
        .expect("bind click");
    assert_eq!(page.doc.dispatch(container, "click"), 1);
    assert_eq!(clicks.get(), 1);

    sandbox
        .remove_event(container, Rc::clone(&handler))
        .expect("unbind click");
    assert_eq!(page.doc.dispatch(container, "click"), 0);
}

#[test]
fn add_event_honours_explicit_type_and_rejects_blank_type() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let container = sandbox.parent().expect("container");
    let handler: DomHandler = Rc::new(|_: &DomEvent| {});

    sandbox
        .add_event(container, ("keyup", Rc::clone(&handler)))
        .expect("bind keyup");
    assert_eq!(page.doc.listener_count(container, "keyup"), 1);
    assert_eq!(page.doc.listener_count(container, "click"), 0);

    let err = sandbox
        .add_event(container, DomBinding::new(" ", handler))
        .expect_err("blank type must fail");
    assert_eq!(err, SandboxError::EmptyEventType);
}

#[test]
fn class_helpers_edit_the_class_attribute() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let container = sandbox.parent().expect("container");

    sandbox.add_class(container, "foo");
    sandbox.add_class(container, "foo");
    sandbox.add_class(container, "bar");
    assert_eq!(
        page.doc.attribute(container, "class").as_deref(),
        Some("foo bar")
    );
    assert!(sandbox.has_class(container, "foo"));

    sandbox.remove_class(container, "foo");
    assert_eq!(page.doc.attribute(container, "class").as_deref(), Some("bar"));
    assert!(!sandbox.has_class(container, "foo"));
}

#[test]
fn drag_return_clears_marker_or_resets_position() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let item = sandbox.find(".entry").first().expect("entry");

    sandbox.add_class(item, IN_PLACE_CLASS);
    sandbox.drag_return(item);
    assert!(!sandbox.has_class(item, IN_PLACE_CLASS));
    assert!(page.doc.style(item, "top").is_none());

    sandbox.drag_return(item);
    assert_eq!(page.doc.style(item, "top").as_deref(), Some("0"));
    assert_eq!(page.doc.style(item, "left").as_deref(), Some("0"));
}

#[test]
fn open_connection_accepts_lowercase_get_and_post_only() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");

    let connection = sandbox
        .open_connection("get", "/api/items")
        .expect("get connection");
    assert_eq!(connection.method(), HttpMethod::Get);
    assert_eq!(connection.href(), "/api/items");
    assert!(!connection.is_sent());

    let mut post = sandbox
        .open_connection("post", "/api/items")
        .expect("post connection");
    post.send(Some("name=x".to_string())).expect("send post");
    assert_eq!(page.transport.sent().len(), 1);

    assert_eq!(
        sandbox.open_connection("GET", "/api/items").err(),
        Some(SandboxError::UnsupportedMode("GET".to_string()))
    );
    assert_eq!(
        sandbox.open_connection("put", "/api/items").err(),
        Some(SandboxError::UnsupportedMode("put".to_string()))
    );
    assert_eq!(
        sandbox.open_connection("get", "").err(),
        Some(SandboxError::MissingHref)
    );
}

#[test]
fn create_element_appends_children_then_text_then_attributes() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let first = sandbox.create_element("span", ElementConfig::new().text("one"));
    let second = sandbox.create_element("span", ElementConfig::new());

    let element = sandbox.create_element(
        "p",
        ElementConfig::new()
            .child(first)
            .child(second)
            .text("tail")
            .attribute("id", "made")
            .attribute("class", "note"),
    );

    let children = page.doc.children(element);
    assert_eq!(children.len(), 3);
    assert_eq!(&children[..2], &[first, second]);
    assert_eq!(page.doc.text_content(element), "onetail");
    assert_eq!(page.doc.attribute(element, "id").as_deref(), Some("made"));
    assert_eq!(page.doc.attribute(element, "class").as_deref(), Some("note"));
    assert_eq!(page.doc.tag_name(element).as_deref(), Some("p"));
    assert!(page.doc.parent_of(element).is_none());
}

#[test]
fn create_element_skips_empty_text() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    let element = sandbox.create_element("div", ElementConfig::new().text(""));
    assert!(page.doc.children(element).is_empty());
}

#[test]
fn array_return_doubles_lists_repeated_values() {
    let page = page();
    let sandbox = Sandbox::new(&page.registry, "widget");
    assert_eq!(
        sandbox.array_return_doubles(&["b", "a", "b", "c", "a"]),
        vec!["a", "b"]
    );
}
