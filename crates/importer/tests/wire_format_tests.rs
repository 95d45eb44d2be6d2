//! Table-driven tests for decoding backend payloads.

use importer::model::{JobStatus, JobTicket, TaskListResponse};

/// Represents a single progress payload test case.
struct TicketCase {
    /// Test case name for identification.
    name: &'static str,
    /// Body of a `GET /progress` response.
    body: &'static str,
    /// Expected decoded fields, or `None` if decoding should fail.
    expected: Option<(JobStatus, u64, u64, f64)>,
}

const TICKET_CASES: &[TicketCase] = &[
    TicketCase {
        name: "typed_fields",
        body: r#"{"job_id": "j1", "status": "processing", "processed": 10, "total": 40, "percent": 25.0}"#,
        expected: Some((JobStatus::Processing, 10, 40, 25.0)),
    },
    TicketCase {
        name: "string_hash_fields",
        body: r#"{"job_id": "j1", "status": "complete", "processed": "499980", "total": "500000", "percent": "99.996"}"#,
        expected: Some((JobStatus::Complete, 499_980, 500_000, 99.996)),
    },
    TicketCase {
        name: "empty_record",
        body: "{}",
        expected: Some((JobStatus::Created, 0, 0, 0.0)),
    },
    TicketCase {
        name: "completed_alias",
        body: r#"{"status": "Completed", "processed": 5, "total": 5, "percent": 100}"#,
        expected: Some((JobStatus::Complete, 5, 5, 100.0)),
    },
    TicketCase {
        name: "queued_alias",
        body: r#"{"status": " queued "}"#,
        expected: Some((JobStatus::Created, 0, 0, 0.0)),
    },
    TicketCase {
        name: "parsing_alias",
        body: r#"{"status": "parsing", "total": ""}"#,
        expected: Some((JobStatus::Processing, 0, 0, 0.0)),
    },
    TicketCase {
        name: "unknown_status_keeps_polling",
        body: r#"{"status": "validating"}"#,
        expected: Some((JobStatus::Processing, 0, 0, 0.0)),
    },
    TicketCase {
        name: "percent_out_of_range",
        body: r#"{"status": "processing", "percent": 140}"#,
        expected: Some((JobStatus::Processing, 0, 0, 100.0)),
    },
    TicketCase {
        name: "non_numeric_count",
        body: r#"{"status": "processing", "processed": "many"}"#,
        expected: None,
    },
    TicketCase {
        name: "not_an_object",
        body: r#""j1""#,
        expected: None,
    },
];

#[test]
fn test_progress_payloads() {
    for case in TICKET_CASES {
        let result = serde_json::from_str::<JobTicket>(case.body);
        match (case.expected, result) {
            (Some((status, processed, total, percent)), Ok(ticket)) => {
                assert_eq!(ticket.status, status, "case {}", case.name);
                assert_eq!(ticket.processed, processed, "case {}", case.name);
                assert_eq!(ticket.total, total, "case {}", case.name);
                assert!(
                    (ticket.percent - percent).abs() < 1e-9,
                    "case {}: percent {}",
                    case.name,
                    ticket.percent
                );
            }
            (None, Err(_)) => {}
            (Some(_), Err(e)) => panic!("case {} should decode: {}", case.name, e),
            (None, Ok(ticket)) => panic!("case {} should fail, got {:?}", case.name, ticket),
        }
    }
}

#[test]
fn test_task_list_payload() {
    let body = r#"{
        "tasks": [
            {"job_id": "j2", "filename": "b.csv", "status": "processing",
             "processed": "10", "total": "20", "updated_at": "1700000100", "retries": "0"},
            {"id": "j1", "filename": "a.csv", "status": "failed",
             "error": "bad encoding", "updated_at": 1700000000, "retries": 2}
        ]
    }"#;

    let list: TaskListResponse = serde_json::from_str(body).unwrap();
    assert_eq!(list.tasks.len(), 2);
    assert_eq!(list.tasks[0].job_id, "j2");
    assert_eq!(list.tasks[0].processed, 10);
    assert_eq!(list.tasks[1].job_id, "j1");
    assert_eq!(list.tasks[1].status, JobStatus::Failed);
    assert_eq!(list.tasks[1].error, "bad encoding");
    assert_eq!(list.tasks[1].retries, 2);
    assert!(list.tasks[0].updated_at > list.tasks[1].updated_at);
}

#[test]
fn test_task_row_with_both_id_keys() {
    let body = r#"{"tasks": [
        {"id": 7, "job_id": "j0", "status": "processing"},
        {"id": "j1", "job_id": "", "status": "failed"}
    ]}"#;

    let list: TaskListResponse = serde_json::from_str(body).unwrap();
    assert_eq!(list.tasks.len(), 2);
    assert_eq!(list.tasks[0].job_id, "j0");
    assert_eq!(list.tasks[1].job_id, "j1");
}
