//! End-to-end integration tests for the Crownwell chat client.
//!
//! These tests exercise the full pipeline from an HTTP chat response to the
//! snapshots and deliveries the CLI consumes, plus the records client.

use std::sync::Arc;
use std::time::Duration;

use crownwell_core::delivery::{Delivery, DeliveryTracker};
use crownwell_core::error::{RecordsError, TransportError};
use crownwell_core::message::ChatMessage;
use crownwell_core::model::SupportedModel;
use crownwell_core::records::{RecordKind, RecordQuery, RecordStore};
use crownwell_core::snapshot::{Snapshot, ToolCallState};
use crownwell_records::{InMemoryRecordStore, RestRecordStore};
use crownwell_stream::{HttpChatTransport, RequestState, StreamReassembler};
use mockito::Matcher;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const CHAT_PATH: &str = "/functions/v1/chat";

fn runner(server: &mockito::Server) -> StreamReassembler {
    let transport =
        HttpChatTransport::new(server.url(), CHAT_PATH, "anon-key", Duration::from_secs(5))
            .unwrap();
    StreamReassembler::new(Arc::new(transport))
}

async fn collect(runner: &StreamReassembler, history: &[ChatMessage]) -> (Vec<Snapshot>, RequestState) {
    let mut stream = runner
        .run(history, SupportedModel::Gpt51, CancellationToken::new())
        .await
        .unwrap();
    let mut snapshots = Vec::new();
    while let Some(item) = stream.recv().await {
        snapshots.push(item.unwrap());
    }
    (snapshots, stream.state())
}

// ── Chat pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_text_tool_result_text() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "0:\"Hello \"\n",
        "9:{\"toolCallId\":\"t1\",\"toolName\":\"lookup\",\"args\":{}}\n",
        "a:{\"result\":{\"rows\":[1,2]}}\n",
        "0:\"done\"\n",
    );
    let _m = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let (snapshots, state) = collect(&runner(&server), &[ChatMessage::user("hi")]).await;

    assert_eq!(snapshots.len(), 5);
    assert_eq!(state, RequestState::Completed);
    assert!(snapshots[..4].iter().all(|s| !s.is_complete()));

    let last = snapshots.last().unwrap();
    assert!(last.is_complete());
    assert_eq!(last.text(), "Hello done");
    let call = last.tool_calls().next().unwrap();
    assert_eq!(call.id, "t1");
    assert_eq!(call.state, ToolCallState::Complete);
    assert_eq!(call.result, Some(json!({"rows": [1, 2]})));
}

#[tokio::test]
async fn e2e_request_carries_history_and_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .match_header("authorization", "Bearer anon-key")
        .match_body(Matcher::Json(json!({
            "messages": [
                {"role": "user", "content": "Status of 8D-1042?"},
                {"role": "assistant", "content": "Open."},
                {"role": "user", "content": "Who owns it?"}
            ],
            "model": "gpt-5.1-nano"
        })))
        .with_status(200)
        .with_body("0:\"QA team\"\n")
        .create_async()
        .await;

    let first = ChatMessage::user("Status of 8D-1042?");
    let reply = ChatMessage::assistant_from(&Snapshot::build(
        "Open.",
        &[],
        crownwell_core::snapshot::SnapshotStatus::Complete,
    ));
    let history = [first, reply, ChatMessage::user("Who owns it?")];

    let stream = runner(&server)
        .run(&history, SupportedModel::Gpt51Nano, CancellationToken::new())
        .await
        .unwrap();
    let last = stream.final_snapshot().await.unwrap();
    assert_eq!(last.text(), "QA team");
    mock.assert_async().await;
}

#[tokio::test]
async fn e2e_tool_data_is_delivered_once() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "9:{\"toolCallId\":\"q1\",\"toolName\":\"query_work_orders\",\"args\":{\"status\":\"open\"}}\n",
        "a:{\"result\":{\"success\":true,\"data\":[{\"wo_number\":\"WO-7\"}]}}\n",
        "0:\"One open work order.\"\n",
    );
    let _m = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let (snapshots, _) = collect(&runner(&server), &[ChatMessage::user("open WOs")]).await;

    let mut tracker = DeliveryTracker::new();
    let mut deliveries = Vec::new();
    for snapshot in &snapshots {
        deliveries.extend(tracker.collect("m1", snapshot));
    }
    // A repeated completion must not deliver again.
    deliveries.extend(tracker.collect("m1", snapshots.last().unwrap()));

    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.contains(&Delivery::AssistantText {
        message_id: "m1".into(),
        text: "One open work order.".into(),
    }));
    assert!(deliveries.contains(&Delivery::ToolData {
        tool_call_id: "q1".into(),
        tool_name: "query_work_orders".into(),
        data: json!([{"wo_number": "WO-7"}]),
    }));
}

#[tokio::test]
async fn e2e_malformed_lines_do_not_stop_the_turn() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "0:\"Checking \"\n",
        "9:{\"toolName\":\n",
        "9:{\"toolName\":\"sql\",\"args\":{}}\n",
        "a:not json\n",
        "e:{\"finishReason\":\"stop\"}\n",
        "0:raw tail",
    );
    let _m = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let (snapshots, state) = collect(&runner(&server), &[ChatMessage::user("go")]).await;
    assert_eq!(state, RequestState::Completed);

    let last = snapshots.last().unwrap();
    assert_eq!(last.text(), "Checking raw tail");
    let calls: Vec<_> = last.tool_calls().collect();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].id.starts_with("tool-"));
    let result = calls[0].result.as_ref().unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "ParseError");
    assert_eq!(result["raw"], "not json");
}

#[tokio::test]
async fn e2e_empty_body_yields_single_completion() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let (snapshots, state) = collect(&runner(&server), &[ChatMessage::user("?")]).await;
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].is_complete());
    assert!(snapshots[0].parts.is_empty());
    assert_eq!(state, RequestState::Completed);
}

#[tokio::test]
async fn e2e_server_error_produces_no_snapshots() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", CHAT_PATH)
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let result = runner(&server)
        .run(&[ChatMessage::user("hi")], SupportedModel::Gpt51, CancellationToken::new())
        .await;
    match result {
        Err(TransportError::ApiError { status_code, .. }) => assert_eq!(status_code, 500),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected the request to fail"),
    }
}

#[tokio::test]
async fn e2e_cancel_before_open_completes_empty() {
    let server = mockito::Server::new_async().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stream = runner(&server)
        .run(&[ChatMessage::user("hi")], SupportedModel::Gpt51, cancel)
        .await
        .unwrap();
    let last = stream.final_snapshot().await.unwrap();
    assert!(last.is_complete());
    assert!(last.parts.is_empty());
}

// ── Records ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_records_list_then_patch() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/rest/v1/rca_8d_reports")
        .match_query(Matcher::UrlEncoded(
            "or".into(),
            "(rca_id.ilike.*8D-10*,part_number.ilike.*8D-10*,problem_description.ilike.*8D-10*)".into(),
        ))
        .with_status(200)
        .with_header("content-range", "0-0/1")
        .with_body(r#"[{"id": 5, "rca_id": "8D-1005", "qa_approved": false}]"#)
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/rest/v1/rca_8d_reports")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.5".into()))
        .match_body(Matcher::Json(json!({"qa_approved": true})))
        .with_status(200)
        .with_body(r#"[{"id": 5, "rca_id": "8D-1005", "qa_approved": true}]"#)
        .create_async()
        .await;

    let store: Arc<dyn RecordStore> = Arc::new(RestRecordStore::new(server.url(), "anon-key").unwrap());
    let query = RecordQuery {
        search: Some("8D-10".into()),
        ..RecordQuery::default()
    };
    let page = store.list(RecordKind::RcaReports, &query).await.unwrap();
    assert_eq!(page.total, 1);
    let record = &page.records[0];
    assert_eq!(record.name, "8D-1005");

    let updated = store
        .patch(RecordKind::RcaReports, record.id, json!({"qa_approved": true}))
        .await
        .unwrap();
    assert_eq!(updated.content["qa_approved"], true);
    patch.assert_async().await;
}

#[tokio::test]
async fn e2e_records_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/rest/v1/work_orders")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let store = RestRecordStore::new(server.url(), "anon-key").unwrap();
    let err = store
        .list(RecordKind::WorkOrders, &RecordQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::ApiError { status_code: 503, .. }));
}

#[tokio::test]
async fn e2e_in_memory_store_behaves_like_rest() {
    let store = InMemoryRecordStore::new();
    store
        .insert(
            RecordKind::WorkOrders,
            json!({"id": 1, "wo_number": "WO-1", "customer_name": "Acme", "created_at": "2025-02-01T00:00:00Z"}),
        )
        .await
        .unwrap();
    store
        .insert(
            RecordKind::WorkOrders,
            json!({"id": 2, "wo_number": "WO-2", "customer_name": "Borealis", "created_at": "2025-02-02T00:00:00Z"}),
        )
        .await
        .unwrap();

    let store: Arc<dyn RecordStore> = Arc::new(store);
    let query = RecordQuery {
        search: Some("acme".into()),
        ..RecordQuery::default()
    };
    let page = store.list(RecordKind::WorkOrders, &query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].name, "WO-1");

    let err = store
        .patch(RecordKind::WorkOrders, 9, json!({"status": "closed"}))
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::NotFound { .. }));
}
