use serde_json::json;

use info_indexer::subgraph::{build_query, parse_response};

#[test]
fn query_requests_newest_records_first() {
    let query = build_query(10);
    assert!(query.contains("infoStoreds(first: 10"));
    assert!(query.contains("orderBy: timestamp"));
    assert!(query.contains("orderDirection: desc"));
    for field in ["id", "sender", "name", "data", "timestamp", "blockNumber"] {
        assert!(query.contains(field), "query must select `{field}`");
    }
}

#[test]
fn well_formed_response_is_parsed() {
    let body = json!({
        "data": {
            "infoStoreds": [
                {
                    "id": format!("0x{}-0", "a".repeat(64)),
                    "sender": "0xf7e9260e03ca2ff3f20307e8cfba480ad1ad6175",
                    "name": "user info",
                    "data": "{\"name\": \"张三\"}",
                    "timestamp": "1764140000",
                    "blockNumber": "7200123"
                }
            ]
        }
    });

    let records = parse_response(&body).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "user info");
    assert_eq!(records[0].block_number, "7200123");
    // BigInt-as-string timestamps must still convert to wall-clock time
    let recorded_at = records[0].recorded_at().unwrap();
    assert_eq!(recorded_at.timestamp(), 1_764_140_000);
}

#[test]
fn empty_result_set_is_not_an_error() {
    let body = json!({ "data": { "infoStoreds": [] } });
    assert!(parse_response(&body).unwrap().is_empty());
}

#[test]
fn graphql_errors_surface_as_failures() {
    // GraphQL transports errors in-band with HTTP 200
    let body = json!({
        "errors": [ { "message": "subgraph not found" } ]
    });

    let err = parse_response(&body).unwrap_err();
    assert!(err.to_string().contains("subgraph not found"));
}

#[test]
fn missing_data_section_is_an_error() {
    let body = json!({ "something": "else" });
    assert!(parse_response(&body).is_err());
}
