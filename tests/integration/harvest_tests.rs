//! Integration tests for the harvester
//!
//! These tests use wiremock to serve search and profile pages and run both
//! harvest phases end-to-end against real CSV files and a real journal.

use profile_harvester::config::{
    Config, FetcherConfig, HarvesterConfig, OutputConfig, SearchConfig, SiteConfig,
};
use profile_harvester::harvester::{Harvester, Phase, TaskOutcome};
use profile_harvester::storage::{OutcomeStatus, RunJournal, RunStatus, SqliteJournal};
use profile_harvester::HarvestError;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &Path, keywords: &[&str], max_attempts: u32) -> Config {
    let file = |name: &str| dir.join(name).display().to_string();
    Config {
        harvester: HarvesterConfig {
            worker_count: 3,
            max_attempts,
            batch_threshold: 2,
        },
        fetcher: FetcherConfig {
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..FetcherConfig::default()
        },
        proxy: None,
        site: SiteConfig {
            base_url: base_url.to_string(),
        },
        search: SearchConfig {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        },
        output: OutputConfig {
            search_path: file("search.csv"),
            profile_path: file("profiles.csv"),
            journal_path: file("journal.db"),
            summary_path: None,
        },
    }
}

fn search_card(base_url: &str, slug: &str, display_name: &str, location: &str) -> String {
    format!(
        r#"<li><a href="{base}/in/{slug}?trk=people-guest_people_search-card">
            <div class="base-search-card__info">
                <h3 class="base-search-card__title">{display}</h3>
                <p class="people-search-card__location">{location}</p>
            </div>
        </a></li>"#,
        base = base_url,
        slug = slug,
        display = display_name,
        location = location
    )
}

fn search_page(cards: &[String]) -> String {
    format!(
        "<html><body><ul class=\"people-search-results\">{}</ul></body></html>",
        cards.concat()
    )
}

fn profile_page(company: &str, job_title: &str, followers: i64) -> String {
    format!(
        r#"<html><head><script type="application/ld+json">
        {{"@context":"http://schema.org","@graph":[
            {{"@type":"Person","jobTitle":["{job}"],
              "worksFor":[{{"@type":"Organization","name":"{company}","url":"https://www.linkedin.com/company/x"}}],
              "interactionStatistic":{{"@type":"InteractionCounter","name":"Follows","userInteractionCount":{followers}}}}}
        ]}}
        </script></head><body></body></html>"#,
        job = job_title,
        company = company,
        followers = followers
    )
}

async fn mount_search(server: &MockServer, first_name: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/pub/dir"))
        .and(query_param("firstName", first_name))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, slug: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/in/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV");
    let headers = reader
        .headers()
        .expect("Failed to read headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("Failed to read row").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_full_harvest_both_phases() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        "bill",
        search_page(&[
            search_card(&base, "williamhgates", "Bill Gates", "Seattle, WA"),
            search_card(&base, "bill-gates-2", "Bill Gates", "  "),
        ]),
    )
    .await;
    // Second search lists a profile the first one already found
    mount_search(
        &server,
        "ada",
        search_page(&[
            search_card(&base, "ada", "Ada Lovelace", "London"),
            search_card(&base, "williamhgates", "Bill Gates", "Seattle, WA"),
        ]),
    )
    .await;
    mount_profile(&server, "williamhgates", profile_page("Gates Foundation", "Co-chair", 35_000_000)).await;
    mount_profile(&server, "bill-gates-2", profile_page("Contoso", "Engineer", 12)).await;
    mount_profile(&server, "ada", profile_page("Analytical Engines", "Mathematician", 1815)).await;

    let config = create_test_config(&base, dir.path(), &["bill gates", "ada lovelace"], 1);
    let harvester = Harvester::new(config);

    let summary = harvester
        .run(&[Phase::Search, Phase::Profiles], "test-hash")
        .await
        .expect("Harvest should succeed");

    assert_eq!(summary.phases.len(), 2);
    assert_eq!(summary.items_failed(), 0);

    let search = &summary.phases[0];
    assert_eq!(search.report.succeeded(), 2);
    assert_eq!(search.stats.admitted, 3);
    assert_eq!(search.stats.duplicates, 1);
    assert_eq!(search.stats.persisted, 3);

    let (headers, rows) = read_csv(&dir.path().join("search.csv"));
    assert_eq!(headers, vec!["name", "display_name", "url", "location", "companies"]);
    assert_eq!(rows.len(), 3);
    let gates = rows.iter().find(|r| r[0] == "williamhgates").unwrap();
    assert_eq!(gates[2], format!("{}/in/williamhgates", base));
    assert_eq!(gates[4], "n/a");
    let other = rows.iter().find(|r| r[0] == "bill-gates-2").unwrap();
    assert_eq!(other[3], "No location");

    let profiles = &summary.phases[1];
    assert_eq!(profiles.report.items.len(), 3);
    assert_eq!(profiles.stats.persisted, 3);

    let (headers, rows) = read_csv(&dir.path().join("profiles.csv"));
    assert_eq!(headers, vec!["name", "company", "company_profile", "job_title", "followers"]);
    assert_eq!(rows.len(), 3);
    let ada = rows.iter().find(|r| r[0] == "ada").unwrap();
    assert_eq!(ada[1], "Analytical Engines");
    assert_eq!(ada[3], "Mathematician");
    assert_eq!(ada[4], "1815");

    let journal = SqliteJournal::new(&dir.path().join("journal.db")).unwrap();
    let run = journal.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.records_persisted, 6);
    assert_eq!(journal.get_outcomes(run.id).unwrap().len(), 5);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/pub/dir"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_search(
        &server,
        "bill",
        search_page(&[search_card(&base, "williamhgates", "Bill Gates", "Seattle")]),
    )
    .await;

    let config = create_test_config(&base, dir.path(), &["bill gates"], 2);
    let summary = Harvester::new(config)
        .run(&[Phase::Search], "hash")
        .await
        .unwrap();

    let outcome = &summary.phases[0].report.items[0].outcome;
    assert_eq!(
        outcome,
        &TaskOutcome::Succeeded {
            attempts: 3,
            admitted: 1,
            duplicates: 0
        }
    );
    assert_eq!(summary.records_persisted(), 1);
}

#[tokio::test]
async fn test_exhausted_item_does_not_stop_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(
        dir.path().join("search.csv"),
        format!(
            "name,display_name,url,location,companies\n\
             ada,Ada,{base}/in/ada,London,n/a\n\
             gone,Gone,{base}/in/gone,Nowhere,n/a\n",
            base = base
        ),
    )
    .unwrap();
    mount_profile(&server, "ada", profile_page("Analytical Engines", "Mathematician", 1815)).await;
    Mock::given(method("GET"))
        .and(path("/in/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&base, dir.path(), &["ada lovelace"], 1);
    let summary = Harvester::new(config)
        .run(&[Phase::Profiles], "hash")
        .await
        .unwrap();

    let report = &summary.phases[0].report;
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    let failed = report.failures().next().unwrap();
    assert_eq!(failed.item.key, "gone");
    assert_eq!(failed.outcome.attempts(), 2);

    let (_, rows) = read_csv(&dir.path().join("profiles.csv"));
    assert_eq!(rows.len(), 1);

    let journal = SqliteJournal::new(&dir.path().join("journal.db")).unwrap();
    let run = journal.get_latest_run().unwrap().unwrap();
    assert_eq!(
        journal.count_outcomes(run.id, OutcomeStatus::Exhausted).unwrap(),
        1
    );
}

#[tokio::test]
async fn test_rerun_appends_without_second_header() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        "bill",
        search_page(&[
            search_card(&base, "williamhgates", "Bill Gates", "Seattle"),
            search_card(&base, "bill-gates-2", "Bill Gates", "Austin"),
        ]),
    )
    .await;

    for _ in 0..2 {
        let config = create_test_config(&base, dir.path(), &["bill gates"], 0);
        Harvester::new(config)
            .run(&[Phase::Search], "hash")
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(dir.path().join("search.csv")).unwrap();
    assert_eq!(content.matches("name,display_name").count(), 1);
    let (_, rows) = read_csv(&dir.path().join("search.csv"));
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn test_storage_failure_fails_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();

    mount_search(
        &server,
        "bill",
        search_page(&[search_card(&base, "williamhgates", "Bill Gates", "Seattle")]),
    )
    .await;

    let mut config = create_test_config(&base, dir.path(), &["bill gates"], 3);
    // A directory cannot be opened for appending
    config.output.search_path = dir.path().display().to_string();

    let result = Harvester::new(config).run(&[Phase::Search], "hash").await;
    assert!(matches!(result, Err(HarvestError::Pipeline(_))));

    let journal = SqliteJournal::new(&dir.path().join("journal.db")).unwrap();
    let run = journal.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}
