use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_oai-set-scan"))
        .args(args)
        .output()
        .expect("binary runs")
}

#[test]
fn no_arguments_prints_usage_and_exits_1() {
    let out = run(&[]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Usage:"), "stdout was: {stdout}");
}

#[test]
fn two_positionals_are_rejected() {
    let out = run(&["https://example.org/oai", "https://example.org/other"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage:"));
}

#[test]
fn malformed_url_is_rejected_without_network() {
    for bad in ["not-a-url", "ftp://example.org/oai"] {
        let out = run(&[bad]);
        assert_eq!(out.status.code(), Some(1), "{bad}");
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("Usage:"), "stdout was: {stdout}");
        assert!(stdout.contains("invalid repository base URL"));
    }
}

#[test]
fn bad_from_datestamp_is_rejected() {
    let out = run(&["https://example.org/oai", "--from", "last tuesday"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage:"));
}

#[test]
fn help_exits_0() {
    let out = run(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("REPOSITORY_BASE_URL"));
}

#[test]
fn fragment_url_is_rejected() {
    let out = run(&["https://example.org/oai#top"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage:"));
}

#[test]
fn discovery_failure_exits_nonzero_with_empty_stdout() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let out = run(&[&format!("http://127.0.0.1:{port}/oai"), "--timeout-ms", "2000"]);

    assert_ne!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty(), "stdout was: {}", String::from_utf8_lossy(&out.stdout));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("set discovery failed"), "stderr was: {stderr}");
    assert!(stderr.contains("scan aborted"));
}

#[tokio::test(flavor = "multi_thread")]
async fn output_file_matches_stdout() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListSets"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<OAI-PMH><ListSets><set><setSpec>A</setSpec></set><set><setSpec>B</setSpec></set></ListSets></OAI-PMH>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListIdentifiers"))
        .and(query_param("set", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<OAI-PMH><ListIdentifiers><header/><resumptionToken completeListSize="10">t</resumptionToken></ListIdentifiers></OAI-PMH>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListIdentifiers"))
        .and(query_param("set", "B"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let base = format!("{}/oai", server.uri());

    let out = tokio::process::Command::new(env!("CARGO_BIN_EXE_oai-set-scan"))
        .arg(&base)
        .arg("--output")
        .arg(&report_path)
        .output()
        .await
        .expect("binary runs");

    assert_eq!(out.status.code(), Some(0));
    let printed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(printed, written);
    assert_eq!(printed["base_url"], base.as_str());
    assert_eq!(printed["sets"]["A"]["size"], 10);
    assert_eq!(printed["sets"]["B"]["status_code"], 500);
    assert!(printed["sets"]["B"]["size"].is_null());
}
