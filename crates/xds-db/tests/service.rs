//! Service contract tests against the in-memory store.

use std::collections::BTreeMap;
use xds_db::{
    DbError, DocumentId, DocumentPatch, Lookup, MemoryDocumentStore, NodeOperation,
    OperationOutput, XmlService,
};
use xds_query::QueryBuilder;
use xds_xml::XmlError;

const CATALOG: &str = r#"<catalog>
    <book id="1">
        <title>Lalka</title>
        <author>Boleslaw Prus</author>
    </book>
    <book id="2">
        <title>Pan Tadeusz</title>
        <author>Adam Mickiewicz</author>
    </book>
</catalog>"#;

fn setup() -> (XmlService<MemoryDocumentStore>, DocumentId) {
    let service = XmlService::new(MemoryDocumentStore::new());
    let id = service.create_document("books", "testing", CATALOG).unwrap();
    (service, id)
}

fn found<T>(lookup: Lookup<T>) -> T {
    match lookup {
        Lookup::Found(value) => value,
        Lookup::Empty => panic!("expected a value, got Empty"),
        Lookup::NotFound => panic!("expected a value, got NotFound"),
    }
}

// === Documents ===

#[test]
fn test_create_and_read_back() {
    let (service, id) = setup();
    let doc = service.get_document(id).unwrap();
    assert_eq!(doc.title, "books");
    assert_eq!(doc.description, "testing");
    assert_eq!(doc.version, 1);
    // stored content is the normalized form: whitespace-only text dropped
    assert_eq!(
        doc.content,
        r#"<catalog><book id="1"><title>Lalka</title><author>Boleslaw Prus</author></book><book id="2"><title>Pan Tadeusz</title><author>Adam Mickiewicz</author></book></catalog>"#
    );
    assert_eq!(service.get_document_by_title("books").unwrap().id, id);
}

#[test]
fn test_compact_content_round_trips_byte_identical() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let xml = r#"<a k="v"><b>t &amp; u</b><c/></a>"#;
    let id = service.create_document("a", "", xml).unwrap();
    assert_eq!(service.get_document(id).unwrap().content, xml);
}

#[test]
fn test_create_rejects_invalid_xml() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let err = service
        .create_document("title", "description", "<book><title>Lalka</title></boook>")
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidXml(_)));
    assert_eq!(service.count_documents().unwrap(), 0);
}

#[test]
fn test_create_rejects_bad_names_and_chars() {
    let service = XmlService::new(MemoryDocumentStore::new());
    assert_eq!(
        service.create_document("t", "", "<1a/>"),
        Err(DbError::InvalidXml(XmlError::InvalidName("1a".to_string())))
    );
    assert!(matches!(
        service.create_document("t", "", "<a>\u{1}</a>"),
        Err(DbError::InvalidXml(XmlError::InvalidChar { code: 1, .. }))
    ));
    assert!(matches!(
        service.create_document("t", "", "<a b=\"\u{8}\"/>"),
        Err(DbError::InvalidXml(XmlError::InvalidChar { code: 8, .. }))
    ));
    assert_eq!(service.count_documents().unwrap(), 0);
}

#[test]
fn test_duplicate_title() {
    let (service, id) = setup();
    let err = service.create_document("books", "other", "<x/>").unwrap_err();
    assert_eq!(err, DbError::DuplicateTitle("books".to_string()));

    let first = service.get_document(id).unwrap();
    assert_eq!(first.description, "testing");
    assert_eq!(service.count_documents().unwrap(), 1);
}

#[test]
fn test_missing_documents() {
    let (service, _) = setup();
    assert!(matches!(
        service.get_document(DocumentId(123)),
        Err(DbError::DocumentNotFound(_))
    ));
    assert!(matches!(
        service.get_document_by_title("titleThatNotExist"),
        Err(DbError::DocumentNotFound(_))
    ));
    assert!(matches!(
        service.modify_document(DocumentId(123), DocumentPatch::new().title("x")),
        Err(DbError::DocumentNotFound(_))
    ));
    assert!(matches!(
        service.modify_document(DocumentId(123), DocumentPatch::new()),
        Err(DbError::DocumentNotFound(_))
    ));
}

#[test]
fn test_modify_document() {
    let (service, id) = setup();
    service
        .modify_document(id, DocumentPatch::new().title("newBook"))
        .unwrap();
    let doc = service.get_document(id).unwrap();
    assert_eq!(doc.title, "newBook");
    assert_eq!(doc.description, "testing");
    assert_eq!(doc.version, 2);

    let err = service
        .modify_document(id, DocumentPatch::new().content("<book></boook>"))
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidXml(_)));

    service
        .modify_document(id, DocumentPatch::new().content("<list>\n  <item/>\n</list>"))
        .unwrap();
    assert_eq!(service.get_document(id).unwrap().content, "<list><item/></list>");
}

#[test]
fn test_delete_documents() {
    let (service, id) = setup();
    assert!(!service.delete_document(DocumentId(999)).unwrap());
    assert!(service.delete_document(id).unwrap());
    assert!(!service.delete_document(id).unwrap());
    assert!(service.get_document(id).is_err());

    service.create_document("a", "", "<a/>").unwrap();
    service.create_document("b", "", "<b/>").unwrap();
    assert_eq!(service.delete_all_documents().unwrap(), 2);
    assert_eq!(service.count_documents().unwrap(), 0);
    assert_eq!(service.delete_all_documents().unwrap(), 0);
    assert_eq!(service.count_documents().unwrap(), 0);
}

#[test]
fn test_listing_and_connection() {
    let (service, id) = setup();
    let second = service.create_document("more", "", "<a/>").unwrap();
    let listing = service.get_all_documents().unwrap();
    let ids: Vec<_> = listing.iter().map(|d| d.id).collect();
    assert_eq!(ids, [id, second]);
    assert!(service.check_connection());
}

#[test]
fn test_pretty_content() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let id = service.create_document("p", "", "<a><b>t</b></a>").unwrap();
    assert_eq!(service.pretty_content(id).unwrap(), "<a>\n  <b>t</b>\n</a>\n");
}

// === Reads ===

#[test]
fn test_get_node_xml() {
    let (service, id) = setup();
    assert_eq!(
        found(service.get_node_xml(id, "catalog/book/title").unwrap()),
        "<title>Lalka</title><title>Pan Tadeusz</title>"
    );
    assert_eq!(
        found(service.get_node_xml(id, "//book[@id=2]").unwrap()),
        r#"<book id="2"><title>Pan Tadeusz</title><author>Adam Mickiewicz</author></book>"#
    );
    assert_eq!(service.get_node_xml(id, "catalog/title").unwrap(), Lookup::NotFound);
}

#[test]
fn test_get_node_text() {
    let (service, id) = setup();
    assert_eq!(
        found(service.get_node_text(id, "/catalog/book[2]/author").unwrap()),
        "Adam Mickiewicz"
    );
    assert_eq!(service.get_node_text(id, "/catalog/magazine").unwrap(), Lookup::NotFound);

    service.add_node(id, "/catalog", "<note/>").unwrap();
    assert_eq!(service.get_node_text(id, "/catalog/note").unwrap(), Lookup::Empty);
}

#[test]
fn test_all_matching_text_in_document_order() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let id = service
        .create_document(
            "ab",
            "",
            "<catalog><book><title>A</title></book><book><title>B</title></book></catalog>",
        )
        .unwrap();
    assert_eq!(
        found(service.get_all_matching_text(id, "//book/title").unwrap()),
        ["A", "B"]
    );
    assert_eq!(
        found(service.get_all_matching_xml(id, "//book/title").unwrap()),
        ["<title>A</title>", "<title>B</title>"]
    );
    assert_eq!(service.get_all_matching_text(id, "//magazine").unwrap(), Lookup::NotFound);
    assert_eq!(service.get_all_matching_xml(id, "//magazine").unwrap(), Lookup::NotFound);
}

#[test]
fn test_get_all_attributes() {
    let (service, id) = setup();
    let attributes = found(service.get_all_attributes(id, "/catalog/book[1]").unwrap());
    assert_eq!(attributes, BTreeMap::from([("id".to_string(), "1".to_string())]));

    // present node without attributes vs missing node
    assert_eq!(service.get_all_attributes(id, "/catalog").unwrap(), Lookup::Empty);
    assert!(matches!(
        service.get_all_attributes(id, "/catalog/magazine"),
        Err(DbError::NodeNotFound(_))
    ));
}

#[test]
fn test_get_structured_nodes() {
    let (service, id) = setup();
    let records = service
        .get_structured_nodes(id, "//book", &["author", "title", "isbn"])
        .unwrap();
    assert_eq!(
        records,
        vec![
            BTreeMap::from([
                ("author".to_string(), "Boleslaw Prus".to_string()),
                ("title".to_string(), "Lalka".to_string()),
            ]),
            BTreeMap::from([
                ("author".to_string(), "Adam Mickiewicz".to_string()),
                ("title".to_string(), "Pan Tadeusz".to_string()),
            ]),
        ]
    );
    assert!(matches!(
        service.get_structured_nodes(id, "//magazine", &["title"]),
        Err(DbError::NoMatches(_))
    ));
}

#[test]
fn test_get_attribute_value() {
    let (service, id) = setup();
    assert_eq!(service.get_attribute_value(id, "//book[2]", "id").unwrap(), "2");
    assert!(matches!(
        service.get_attribute_value(id, "//book[2]", "lang"),
        Err(DbError::AttributeNotFound { .. })
    ));
    assert!(matches!(
        service.get_attribute_value(id, "//magazine", "id"),
        Err(DbError::AttributeNotFound { .. })
    ));
}

#[test]
fn test_get_nodes_with_attribute() {
    let (service, id) = setup();
    service.add_attribute(id, "//book[2]", "lang", "pl").unwrap();

    assert_eq!(found(service.get_nodes_with_attribute(id, "//book", "id", None).unwrap()).len(), 2);
    let polish = found(service.get_nodes_with_attribute(id, "//book", "lang", Some("pl")).unwrap());
    assert_eq!(polish.len(), 1);
    assert!(polish[0].contains("Pan Tadeusz"));

    assert_eq!(
        service.get_nodes_with_attribute(id, "//book", "lang", Some("en")).unwrap(),
        Lookup::Empty
    );
    assert_eq!(
        service.get_nodes_with_attribute(id, "//magazine", "lang", None).unwrap(),
        Lookup::NotFound
    );
}

#[test]
fn test_node_exists() {
    let (service, id) = setup();
    assert!(service.node_exists(id, "/catalog/book[2]/title"));
    assert!(!service.node_exists(id, "/catalog/book[3]"));
    assert!(!service.node_exists(DocumentId(77), "/catalog"));
    assert!(!service.node_exists(id, "/catalog/"));
}

#[test]
fn test_query_builder_locators() {
    let (service, id) = setup();
    let query = QueryBuilder::root("catalog")
        .go_to("book")
        .with_attribute("id", Some("2"))
        .go_to("title");
    assert_eq!(found(service.get_node_text(id, &query).unwrap()), "Pan Tadeusz");

    let search = QueryBuilder::search("book").at(1).go_to("author");
    assert_eq!(found(service.get_node_text(id, search).unwrap()), "Boleslaw Prus");
}

#[test]
fn test_builder_and_rendered_text_agree() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let id = service.create_document("mixed", "", "<a>x<b/>y</a>").unwrap();

    // go_to does no escaping, so a slash in a segment becomes a step
    let query = QueryBuilder::new().go_to("a/b");
    assert_eq!(query.render(), "/a/b");
    assert_eq!(
        service.get_node_xml(id, &query).unwrap(),
        Lookup::Found("<b/>".to_string())
    );
    assert_eq!(
        service.get_node_xml(id, &query).unwrap(),
        service.get_node_xml(id, query.render()).unwrap()
    );

    let dangling = QueryBuilder::new().at(1).go_to("a");
    assert_eq!(
        service.get_node_xml(id, &dangling).unwrap(),
        service.get_node_xml(id, dangling.render()).unwrap()
    );
}

#[test]
fn test_unparsable_locator_matches_nothing() {
    let (service, id) = setup();
    assert_eq!(service.get_node_xml(id, "count(//book)").unwrap(), Lookup::NotFound);
    assert!(!service.edit_node_text(id, "//book[", "x").unwrap());
    assert!(matches!(
        service.get_all_attributes(id, "//"),
        Err(DbError::NodeNotFound(_))
    ));
}

#[test]
fn test_reads_degrade_when_store_is_offline() {
    let (service, id) = setup();
    service.store().set_reachable(false);
    assert!(!service.node_exists(id, "/catalog"));
    assert_eq!(service.get_node_xml(id, "/catalog").unwrap(), Lookup::NotFound);
    assert_eq!(service.get_all_matching_text(id, "//title").unwrap(), Lookup::NotFound);
    // writes and value reads propagate
    assert!(matches!(
        service.edit_node_text(id, "//title", "x"),
        Err(DbError::Store(_))
    ));
    assert!(matches!(
        service.create_document("x", "", "<x/>"),
        Err(DbError::Store(_))
    ));
    assert!(service.get_attribute_value(id, "//book", "id").is_err());
    assert!(!service.check_connection());
}

#[test]
fn test_unknown_document_for_reads() {
    let (service, _) = setup();
    assert!(matches!(
        service.get_node_xml(DocumentId(9), "/catalog"),
        Err(DbError::DocumentNotFound(_))
    ));
}

// === Mutations ===

#[test]
fn test_add_node() {
    let (service, id) = setup();
    assert!(service
        .add_node(id, "/catalog", r#"<book id="3"><title>Potop</title></book>"#)
        .unwrap());
    assert_eq!(
        found(service.get_all_matching_text(id, "//book/title").unwrap()),
        ["Lalka", "Pan Tadeusz", "Potop"]
    );
    assert!(!service.add_node(id, "/catalog/magazine", "<x/>").unwrap());
}

#[test]
fn test_add_node_validates_before_lookup() {
    let (service, id) = setup();
    for parent in ["/catalog", "/catalog/magazine"] {
        let err = service.add_node(id, parent, "<book><title>x</book>").unwrap_err();
        assert!(matches!(err, DbError::InvalidXml(_)), "{}: {:?}", parent, err);
    }
    // even for a document that does not exist
    assert!(matches!(
        service.add_node(DocumentId(404), "/catalog", "<a>"),
        Err(DbError::InvalidXml(_))
    ));
    assert!(matches!(
        service.add_node(id, "/catalog", "plain text"),
        Err(DbError::InvalidXml(XmlError::EmptyFragment))
    ));
    assert_eq!(service.get_document(id).unwrap().version, 1);
}

#[test]
fn test_edit_node_text() {
    let (service, id) = setup();
    assert!(service.edit_node_text(id, "/catalog/book[1]/title", "Emancypantki").unwrap());
    assert_eq!(
        found(service.get_node_text(id, "/catalog/book[1]/title").unwrap()),
        "Emancypantki"
    );
    assert!(!service.edit_node_text(id, "/catalog/book[9]/title", "x").unwrap());

    // special characters are escaped in storage
    service.edit_node_text(id, "/catalog/book[2]/title", "A & <B>").unwrap();
    assert_eq!(
        found(service.get_node_text(id, "/catalog/book[2]/title").unwrap()),
        "A & <B>"
    );
}

#[test]
fn test_edits_reject_chars_outside_xml() {
    let service = XmlService::new(MemoryDocumentStore::new());
    let id = service.create_document("doc", "", "<a><b/></a>").unwrap();

    assert!(matches!(
        service.edit_node_text(id, "/a/b", "x\u{1}y"),
        Err(DbError::InvalidXml(XmlError::InvalidChar { code: 1, .. }))
    ));
    assert!(matches!(
        service.add_attribute(id, "/a/b", "k", "\u{1F}"),
        Err(DbError::InvalidXml(XmlError::InvalidChar { code: 0x1F, .. }))
    ));
    assert!(matches!(
        service.add_node(id, "/a", "<c>\u{2}</c>"),
        Err(DbError::InvalidXml(XmlError::InvalidChar { code: 2, .. }))
    ));
    assert!(matches!(
        service.add_node(id, "/a", "<2c/>"),
        Err(DbError::InvalidXml(XmlError::InvalidName(_)))
    ));

    let document = service.get_document(id).unwrap();
    assert_eq!(document.content, "<a><b/></a>");
    assert_eq!(document.version, 1);
}

#[test]
fn test_edit_node_name() {
    let (service, id) = setup();
    assert!(service.edit_node_name(id, "/catalog/book[1]/title", "name").unwrap());
    assert!(!service.node_exists(id, "/catalog/book[1]/title"));
    assert_eq!(
        found(service.get_node_text(id, "/catalog/book[1]/name").unwrap()),
        "Lalka"
    );
    assert!(!service.edit_node_name(id, "/catalog/book[9]", "x").unwrap());
    assert!(matches!(
        service.edit_node_name(id, "/catalog", "bad name"),
        Err(DbError::InvalidXml(XmlError::InvalidName(_)))
    ));
}

#[test]
fn test_attribute_edits() {
    let (service, id) = setup();
    assert!(service.add_attribute(id, "/catalog/book[1]", "lang", "pl").unwrap());
    assert_eq!(service.get_attribute_value(id, "/catalog/book[1]", "lang").unwrap(), "pl");
    // overwrite
    assert!(service.add_attribute(id, "/catalog/book[1]", "lang", "en").unwrap());
    assert_eq!(service.get_attribute_value(id, "/catalog/book[1]", "lang").unwrap(), "en");
    assert!(!service.add_attribute(id, "/catalog/book[5]", "lang", "en").unwrap());

    assert!(service.remove_attribute(id, "/catalog/book[1]", "lang").unwrap());
    assert!(!service.remove_attribute(id, "/catalog/book[1]", "lang").unwrap());
    assert!(!service.remove_attribute(id, "/catalog/book[5]", "id").unwrap());
}

#[test]
fn test_delete_node() {
    let (service, id) = setup();
    assert!(service.delete_node(id, "//book[@id=1]").unwrap());
    assert_eq!(found(service.get_all_matching_text(id, "//title").unwrap()), ["Pan Tadeusz"]);
    assert!(!service.delete_node(id, "//book[@id=1]").unwrap());

    // every match goes
    assert!(service.delete_node(id, "//author").unwrap());
    assert!(!service.node_exists(id, "//author"));
}

#[test]
fn test_deleting_root_is_rejected() {
    let (service, id) = setup();
    assert!(matches!(
        service.delete_node(id, "/catalog"),
        Err(DbError::InvalidXml(XmlError::NoRootElement))
    ));
    assert!(service.node_exists(id, "/catalog"));
}

#[test]
fn test_failed_edit_leaves_version_untouched() {
    let (service, id) = setup();
    service.edit_node_text(id, "//nothing", "x").unwrap();
    assert_eq!(service.get_document(id).unwrap().version, 1);
    service.edit_node_text(id, "//title", "x").unwrap();
    assert_eq!(service.get_document(id).unwrap().version, 2);
}

// === Dispatch ===

#[test]
fn test_execute_dispatch() {
    let (service, id) = setup();
    let out = service
        .execute(id, NodeOperation::Exists { locator: "//book".into() })
        .unwrap();
    assert_eq!(out, OperationOutput::Bool(true));

    let out = service
        .execute(id, NodeOperation::GetAllText { locator: "//author".into() })
        .unwrap();
    assert_eq!(
        out,
        OperationOutput::List(Lookup::Found(vec![
            "Boleslaw Prus".to_string(),
            "Adam Mickiewicz".to_string()
        ]))
    );

    let out = service
        .execute(
            id,
            NodeOperation::Rename {
                locator: "//author".into(),
                name: "writer".into(),
            },
        )
        .unwrap();
    assert_eq!(out, OperationOutput::Bool(true));

    let out = service
        .execute(
            id,
            NodeOperation::GetAttribute {
                locator: "//book[1]".into(),
                name: "id".into(),
            },
        )
        .unwrap();
    assert_eq!(out, OperationOutput::Value("1".into()));

    let out = service
        .execute(
            id,
            NodeOperation::GetStructured {
                locator: "//book".into(),
                fields: vec!["writer".into()],
            },
        )
        .unwrap();
    match out {
        OperationOutput::Records(records) => assert_eq!(records.len(), 2),
        other => panic!("unexpected output {:?}", other),
    }

    assert!(service
        .execute(id, NodeOperation::GetAttributes { locator: "//magazine".into() })
        .is_err());
}
