//! End-to-end session tests against the scripted mock back-end.

use std::sync::Arc;

use zgate_core::backend::{QueryDialect, ScanTerm};
use zgate_core::config::GatewayConfig;
use zgate_core::diag::bib1;
use zgate_core::mock::{MockConnector, MockRecord, MockScript};
use zgate_core::rpn::{Attribute, RpnNode, Term};
use zgate_query::SortKeyRequest;
use zgate_server::proto::*;
use zgate_server::{Gateway, Session};

const CONFIG: &str = r#"
    [database.books]
    zurl = "http://backend.example.com/sru"

    [database.books.search]
    querytype = "cql"
    [database.books.search.map.4]
    index = "title"

    [[database.books.record.usmarc]]
    xpath = "/doc/str[@name='marcxml']"
    content = "full"

    [database.cdrom]
    zurl = "http://backend.example.com/solr/select"

    [database.cdrom.search]
    querytype = "solr"
    [database.cdrom.search.map.30]
    index = "year"

    [database.locked]
    zurl = "http://backend.example.com/sru"
    nonamedresultsets = true
"#;

const ENVELOPE: &str = r#"<doc><str name="marcxml">&lt;record&gt;&lt;leader&gt;00000nam a22000002a 4500&lt;/leader&gt;&lt;controlfield tag="001"&gt;7&lt;/controlfield&gt;&lt;/record&gt;</str></doc>"#;

fn gateway(script: MockScript) -> (Arc<Gateway>, MockConnector) {
    let config: GatewayConfig = toml::from_str(CONFIG).expect("test config parses");
    let connector = MockConnector::new(script);
    let gateway = Arc::new(Gateway::new(config, Arc::new(connector.clone())));
    (gateway, connector)
}

fn rpn_term(text: &str, attrs: Vec<Attribute>) -> RpnNode {
    RpnNode::Term(Term::new(text, attrs))
}

async fn do_search(session: &mut Session, db: &str, setname: &str, query: RpnNode) -> SearchResponse {
    let request = Request::Search(SearchRequest {
        setname: setname.to_string(),
        databases: vec![db.to_string()],
        query,
    });
    match session.dispatch(request).await.expect("search dispatch") {
        Response::Search(reply) => reply,
        other => panic!("expected search response, got {:?}", other),
    }
}

async fn do_fetch(session: &mut Session, setname: &str, offset: u64, syntax: &str) -> FetchResponse {
    let request = Request::Fetch(FetchRequest {
        setname: setname.to_string(),
        offset,
        syntax: syntax.to_string(),
        schema: None,
    });
    match session.dispatch(request).await.expect("fetch dispatch") {
        Response::Fetch(reply) => reply,
        other => panic!("expected fetch response, got {:?}", other),
    }
}

#[tokio::test]
async fn simple_search_compiles_cql_and_reports_hits() {
    let (gateway, connector) = gateway(MockScript {
        hits: 42,
        ..Default::default()
    });
    let mut session = gateway.session();

    let reply = do_search(
        &mut session,
        "books",
        "default",
        rpn_term(
            "war",
            vec![
                Attribute::new(1, 4),
                Attribute::new(2, 3),
                Attribute::new(5, 1),
            ],
        ),
    )
    .await;

    assert!(reply.diag.is_none());
    assert_eq!(reply.hits, 42);

    let searches = connector.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].dialect, QueryDialect::Cql);
    assert_eq!(searches[0].query, "title = war*");
    assert_eq!(session.result_set("default").unwrap().hits, 42);
}

#[tokio::test]
async fn solr_database_compiles_range_query() {
    let (gateway, connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    do_search(
        &mut session,
        "cdrom",
        "default",
        rpn_term("2000", vec![Attribute::new(1, 30), Attribute::new(2, 2)]),
    )
    .await;

    let searches = connector.searches();
    assert_eq!(searches[0].dialect, QueryDialect::Solr);
    assert_eq!(searches[0].query, "year:[* TO 2000]");
}

#[tokio::test]
async fn rsid_reuse_emits_result_set_id_clause() {
    let (gateway, connector) = gateway(MockScript {
        hits: 42,
        result_set_id: Some("rs42".to_string()),
        ..Default::default()
    });
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    let followup = RpnNode::and(
        RpnNode::Rsid("default".to_string()),
        rpn_term("peace", vec![Attribute::new(1, 4)]),
    );
    do_search(&mut session, "books", "default", followup).await;

    let searches = connector.searches();
    assert_eq!(
        searches[1].query,
        "(cql.resultSetId=\"rs42\" and title = peace)"
    );
}

#[tokio::test]
async fn sort_on_sru_11_re_searches_with_yaz_sortspec() {
    let (gateway, connector) = gateway(MockScript {
        hits: 7,
        ..Default::default()
    });
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "A",
        rpn_term("war", vec![Attribute::new(1, 4), Attribute::new(5, 1)]),
    )
    .await;
    do_search(
        &mut session,
        "books",
        "B",
        rpn_term("peace", vec![Attribute::new(1, 4)]),
    )
    .await;

    let reply = session
        .dispatch(Request::Sort(SortRequest {
            input: vec!["A".to_string(), "B".to_string()],
            output: "C".to_string(),
            sequence: vec![SortKeyRequest {
                sortfield: Some("title".to_string()),
                ..Default::default()
            }],
        }))
        .await
        .expect("sort dispatch");
    assert!(reply.diagnostic().is_none());

    let searches = connector.searches();
    assert_eq!(searches.len(), 3);
    assert_eq!(searches[2].query, "((title = war*) or (title = peace))");
    assert_eq!(searches[2].yaz_sort.as_deref(), Some("title <s"));

    let output = session.result_set("C").unwrap();
    assert_eq!(output.hits, 7);
    assert_eq!(output.db_name, "books");
}

#[tokio::test]
async fn sort_on_sru_12_appends_cql_sortby() {
    let mut script = MockScript {
        hits: 3,
        result_set_id: Some("R1".to_string()),
        ..Default::default()
    };
    script
        .options
        .insert("sruVersion".to_string(), "1.2".to_string());
    let (gateway, connector) = gateway(script);
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "A",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    session
        .dispatch(Request::Sort(SortRequest {
            input: vec!["A".to_string()],
            output: "C".to_string(),
            sequence: vec![SortKeyRequest {
                attrs: vec![Attribute::new(1, 4)],
                relation: 1,
                ..Default::default()
            }],
        }))
        .await
        .expect("sort dispatch");

    let searches = connector.searches();
    assert_eq!(
        searches[1].query,
        "cql.resultSetId=\"R1\" sortby title/sort.descending/sort.respectCase"
    );
    assert!(searches[1].yaz_sort.is_none());
}

#[tokio::test]
async fn unsupported_syntax_lists_sorted_alternatives() {
    let mut script = MockScript {
        hits: 1,
        ..Default::default()
    };
    script
        .records
        .insert(0, MockRecord::Xml(ENVELOPE.to_string()));
    let (gateway, _connector) = gateway(script);
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    let reply = do_fetch(&mut session, "default", 1, "grs-1").await;
    let diag = reply.diag.expect("diagnostic expected");
    assert_eq!(diag.code, bib1::SYNTAX_UNSUPPORTED);
    assert_eq!(diag.addinfo, "usmarc,xml");
}

#[tokio::test]
async fn virtual_database_without_address_is_diagnostic_1() {
    let (gateway, _connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    let reply = do_search(
        &mut session,
        "cfg:timeout=30",
        "default",
        rpn_term("war", vec![]),
    )
    .await;
    let diag = reply.diag.expect("diagnostic expected");
    assert_eq!(diag.code, bib1::PERMANENT_SYSTEM_ERROR);
    assert!(diag.addinfo.contains("cfg:timeout=30"));
}

#[tokio::test]
async fn virtual_database_connects_to_given_address() {
    let (gateway, connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    let reply = do_search(
        &mut session,
        "cfg:address=http://ad-hoc.example.com/sru&timeout=30",
        "default",
        rpn_term("war", vec![]),
    )
    .await;
    assert!(reply.diag.is_none());

    connector.inspect(|log| {
        assert_eq!(log.connects.len(), 1);
        assert_eq!(log.connects[0].0, "http://ad-hoc.example.com/sru");
        let options = &log.connects[0].1;
        assert!(options.contains(&("timeout".to_string(), "30".to_string())));
        assert!(options.contains(&("sru".to_string(), "get".to_string())));
    });
}

#[tokio::test]
async fn fetch_full_spec_returns_binary_marc() {
    let mut script = MockScript {
        hits: 1,
        ..Default::default()
    };
    script
        .records
        .insert(0, MockRecord::Xml(ENVELOPE.to_string()));
    let (gateway, _connector) = gateway(script);
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    let reply = do_fetch(&mut session, "default", 1, "usmarc").await;
    assert!(reply.diag.is_none());
    assert_eq!(reply.syntax, Some(RecordSyntax::Usmarc));
    assert_eq!(*reply.record.last().unwrap(), 0x1d);
    let length: usize = std::str::from_utf8(&reply.record[0..5])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(length, reply.record.len());
    assert!(reply.record.contains(&0x1e));
}

#[tokio::test]
async fn fetch_surrogate_diagnostic_is_translated() {
    let mut script = MockScript {
        hits: 1,
        ..Default::default()
    };
    script.records.insert(
        0,
        MockRecord::Xml(
            r#"<record><diagnostic xmlns="http://www.loc.gov/zing/srw/diagnostic/">
                <uri>info:srw/diagnostic/1/61</uri><message>out of range</message>
            </diagnostic></record>"#
                .to_string(),
        ),
    );
    let (gateway, _connector) = gateway(script);
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    let reply = do_fetch(&mut session, "default", 1, "xml").await;
    let diag = reply.diag.expect("diagnostic expected");
    assert_eq!(diag.code, bib1::PRESENT_OUT_OF_RANGE);
    assert_eq!(diag.addinfo, "out of range");
}

#[tokio::test]
async fn present_out_of_range_is_13() {
    let (gateway, connector) = gateway(MockScript {
        hits: 5,
        ..Default::default()
    });
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;

    let reply = session
        .dispatch(Request::Present(PresentRequest {
            setname: "default".to_string(),
            start: 4,
            number: 5,
        }))
        .await
        .expect("present dispatch");
    assert_eq!(reply.diagnostic().unwrap().code, bib1::PRESENT_OUT_OF_RANGE);

    let reply = session
        .dispatch(Request::Present(PresentRequest {
            setname: "default".to_string(),
            start: 2,
            number: 4,
        }))
        .await
        .expect("present dispatch");
    assert!(reply.diagnostic().is_none());
    connector.inspect(|log| assert_eq!(log.presents, vec![(1, 4)]));
}

#[tokio::test]
async fn named_sets_rejected_when_disabled() {
    let (gateway, _connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    let reply = do_search(
        &mut session,
        "locked",
        "myset",
        rpn_term("war", vec![]),
    )
    .await;
    let diag = reply.diag.expect("diagnostic expected");
    assert_eq!(diag.code, bib1::NAMED_RESULT_SETS_UNSUPPORTED);

    let reply = do_search(&mut session, "locked", "default", rpn_term("war", vec![])).await;
    assert!(reply.diag.is_none());
}

#[tokio::test]
async fn multiple_databases_are_111() {
    let (gateway, _connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    let reply = session
        .dispatch(Request::Search(SearchRequest {
            setname: "default".to_string(),
            databases: vec!["books".to_string(), "cdrom".to_string()],
            query: rpn_term("war", vec![]),
        }))
        .await
        .expect("search dispatch");
    assert_eq!(reply.diagnostic().unwrap().code, bib1::TOO_MANY_DATABASES);
}

#[tokio::test]
async fn unknown_database_is_235_and_refused_connect_is_109() {
    let (gateway1, _connector) = gateway(MockScript::default());
    let mut session = gateway1.session();
    let reply = do_search(&mut session, "nosuch", "default", rpn_term("war", vec![])).await;
    assert_eq!(reply.diag.unwrap().code, bib1::DATABASE_DOES_NOT_EXIST);

    let (gateway2, _connector) = gateway(MockScript {
        refuse_connect: Some("connection refused".to_string()),
        ..Default::default()
    });
    let mut session = gateway2.session();
    let reply = do_search(&mut session, "books", "default", rpn_term("war", vec![])).await;
    let diag = reply.diag.expect("diagnostic expected");
    assert_eq!(diag.code, bib1::DATABASE_UNAVAILABLE);
    assert_eq!(diag.addinfo, "connection refused");
}

#[tokio::test]
async fn rebinding_a_set_name_replaces_the_result_set() {
    let (gateway, connector) = gateway(MockScript {
        hits: 9,
        ..Default::default()
    });
    let mut session = gateway.session();

    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("war", vec![Attribute::new(1, 4)]),
    )
    .await;
    do_search(
        &mut session,
        "books",
        "default",
        rpn_term("peace", vec![Attribute::new(1, 4)]),
    )
    .await;

    assert_eq!(session.result_sets().count(), 1);
    assert_eq!(session.result_set("default").unwrap().qtext, "title = peace");
    // One connection serves both searches.
    connector.inspect(|log| assert_eq!(log.connects.len(), 1));

    // Every result set's database has an open connection.
    let connected = session.connected_databases();
    for rs in session.result_sets() {
        assert!(connected.contains(&rs.db_name));
    }
}

#[tokio::test]
async fn connection_options_follow_initialization_order() {
    let (gateway, connector) = gateway(MockScript::default());
    let mut session = gateway.session();

    session
        .dispatch(Request::Init(InitRequest {
            username: Some("alice".to_string()),
            password: Some("sesame".to_string()),
        }))
        .await
        .expect("init dispatch");

    do_search(&mut session, "books", "default", rpn_term("war", vec![])).await;

    connector.inspect(|log| {
        let options = &log.connects[0].1;
        assert_eq!(options[0], ("presentChunk".to_string(), "10".to_string()));
        assert_eq!(
            options[1],
            ("preferredRecordSyntax".to_string(), "xml".to_string())
        );
        assert!(options.contains(&("user".to_string(), "alice".to_string())));
        assert!(options.contains(&("password".to_string(), "sesame".to_string())));
        // The search itself disables piggyback presents.
        assert!(log
            .options_set
            .contains(&("presentChunk".to_string(), "0".to_string())));
    });
}

#[tokio::test]
async fn scan_reports_partial_when_short() {
    let (gateway, connector) = gateway(MockScript {
        scan_terms: vec![
            ScanTerm {
                term: "war".to_string(),
                occurrences: 12,
            },
            ScanTerm {
                term: "warble".to_string(),
                occurrences: 1,
            },
        ],
        ..Default::default()
    });
    let mut session = gateway.session();

    let reply = session
        .dispatch(Request::Scan(ScanRequest {
            databases: vec!["books".to_string()],
            query: rpn_term("war", vec![Attribute::new(1, 4)]),
            number: 5,
            position: 1,
            step_size: 0,
        }))
        .await
        .expect("scan dispatch");
    match reply {
        Response::Scan(scan) => {
            assert_eq!(scan.status, ScanStatus::Partial);
            assert_eq!(scan.entries.len(), 2);
            assert_eq!(scan.entries[0].term, "war");
        }
        other => panic!("expected scan response, got {:?}", other),
    }
    connector.inspect(|log| {
        assert_eq!(log.scans.len(), 1);
        assert_eq!(log.scans[0].0.query, "title = war");
        assert_eq!(log.scans[0].1.number, 5);
    });
}

#[tokio::test]
async fn init_requires_credentials_when_auth_configured() {
    let mut config: GatewayConfig = toml::from_str(CONFIG).unwrap();
    config.authentication = Some("http://auth.invalid/check?u={user}&p={pass}".to_string());
    let connector = MockConnector::new(MockScript::default());
    let gateway = Arc::new(Gateway::new(config, Arc::new(connector)));
    let mut session = gateway.session();

    let reply = session
        .dispatch(Request::Init(InitRequest::default()))
        .await
        .expect("init dispatch");
    let diag = reply.diagnostic().expect("diagnostic expected");
    assert_eq!(diag.code, bib1::AUTHENTICATION_FAILED);
    assert_eq!(diag.addinfo, "credentials not supplied");
}

#[tokio::test]
async fn delete_reports_success_and_close_tears_down() {
    let (gateway, _connector) = gateway(MockScript {
        hits: 1,
        ..Default::default()
    });
    let mut session = gateway.session();

    do_search(&mut session, "books", "default", rpn_term("war", vec![])).await;

    let reply = session
        .dispatch(Request::Delete(DeleteRequest {
            setnames: vec!["default".to_string()],
        }))
        .await
        .expect("delete dispatch");
    match reply {
        Response::Delete(del) => assert!(del.success),
        other => panic!("expected delete response, got {:?}", other),
    }
    // Delete is a no-op upstream; the set survives.
    assert!(session.result_set("default").is_some());

    session
        .dispatch(Request::Close)
        .await
        .expect("close dispatch");
    assert_eq!(session.result_sets().count(), 0);
    assert!(session.connected_databases().is_empty());
}
