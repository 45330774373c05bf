use affiliation_graph::collabs::{build_collaborations, CollabsArgs, Collaborations, NameMapping};
use affiliation_graph::scrape::{DocumentSource, SourceArgs};
use affiliation_graph::{CanonicalEntity, Document, Universities};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entity(init_names: &[&str], count: u64) -> CanonicalEntity {
    CanonicalEntity {
        init_names: init_names.iter().map(|s| s.to_string()).collect(),
        count,
    }
}

fn universities() -> Universities {
    let mut universities = Universities::new();
    universities.insert("X University".to_string(), entity(&["Dept 1, X University", "Dept 2, X University"], 3));
    universities.insert("Y Institute".to_string(), entity(&["Y Institute"], 1));
    universities.insert("Z College".to_string(), entity(&["Lab, Z College"], 1));
    universities
}

fn document(affiliations: &[&str], subjects: &[&str]) -> Document {
    Document {
        affiliations: affiliations.iter().map(|s| s.to_string()).collect(),
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
    }
}

struct StaticSource {
    articles: HashMap<String, Document>,
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch_listing(&self, _page: u32) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn fetch_article(&self, href: &str) -> Result<Document> {
        self.articles
            .get(href)
            .cloned()
            .ok_or_else(|| anyhow!("HTTP 404 for {}", href))
    }
}

#[test]
fn test_three_entities_two_subjects_gives_six_increments() {
    let mapping = NameMapping::from_universities(&universities());
    let doc = document(
        &["Dept 1, X University", "Y Institute", "Lab, Z College"],
        &["math", "cs"],
    );

    let mut collabs = Collaborations::new();
    assert_eq!(collabs.record_document(&mapping, &doc), 6);

    let pairs = [
        ("X University", "Y Institute"),
        ("X University", "Z College"),
        ("Y Institute", "Z College"),
    ];
    for (a, b) in pairs {
        for subject in ["math", "cs"] {
            assert_eq!(collabs.weight(a, b, subject), 1);
            assert_eq!(collabs.weight(b, a, subject), 1);
        }
    }

    assert_eq!(collabs.record_document(&mapping, &doc), 6);
    for (a, b) in pairs {
        for subject in ["math", "cs"] {
            assert_eq!(collabs.weight(a, b, subject), 2);
        }
    }

    let stats = collabs.stats();
    assert_eq!(stats.links, 3);
    assert_eq!(stats.links_with_fields, 6);
}

#[test]
fn test_authors_from_same_entity_count_once() {
    let mapping = NameMapping::from_universities(&universities());
    let doc = document(
        &["Dept 1, X University", "Dept 2, X University", "Y Institute"],
        &["physics"],
    );

    let mut collabs = Collaborations::new();
    assert_eq!(collabs.record_document(&mapping, &doc), 1);
    assert_eq!(collabs.weight("X University", "Y Institute", "physics"), 1);
}

#[test]
fn test_unmapped_affiliations_are_skipped() {
    let mapping = NameMapping::from_universities(&universities());
    let doc = document(&["Dept 1, X University", "Unknown Place"], &["math"]);

    let mut collabs = Collaborations::new();
    assert_eq!(collabs.record_document(&mapping, &doc), 0);

    // The mapped entity is still a node of the graph.
    let stats = collabs.stats();
    assert_eq!(stats.nodes, 1);
    assert_eq!(stats.links, 0);
}

#[test]
fn test_pair_keeps_first_orientation() {
    let mapping = NameMapping::from_universities(&universities());
    let mut collabs = Collaborations::new();

    collabs.record_document(&mapping, &document(&["Y Institute", "Dept 1, X University"], &["math"]));
    collabs.record_document(&mapping, &document(&["Dept 1, X University", "Y Institute"], &["math", "cs"]));

    let json = serde_json::to_value(&collabs).unwrap();
    assert_eq!(json["Y Institute"]["X University"]["math"], 2);
    assert_eq!(json["Y Institute"]["X University"]["cs"], 1);
    assert!(json["X University"].as_object().unwrap().is_empty());
    assert_eq!(collabs.total_weight("X University", "Y Institute"), 3);
}

#[tokio::test]
async fn test_build_collaborations_skips_failed_articles() {
    let mapping = NameMapping::from_universities(&universities());
    let mut articles = HashMap::new();
    articles.insert(
        "/articles/1".to_string(),
        document(&["Dept 2, X University", "Lab, Z College"], &["math"]),
    );
    let source = StaticSource { articles };

    let hrefs = vec!["/articles/missing".to_string(), "/articles/1".to_string()];
    let collabs = build_collaborations(&source, &mapping, &hrefs).await.unwrap();

    assert_eq!(collabs.weight("X University", "Z College", "math"), 1);
}

#[tokio::test]
async fn test_collabs_command_processes_saved_links() {
    let temp_dir = TempDir::new().unwrap();
    serde_json::to_writer(
        File::create(temp_dir.path().join("universities.json")).unwrap(),
        &universities(),
    )
    .unwrap();
    serde_json::to_writer(
        File::create(temp_dir.path().join("links.json")).unwrap(),
        &vec!["/articles/s1"],
    )
    .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta name="dc.subject" content="Applied mathematics"></head><body>
               <p class="c-article-author-affiliation__address">Dept 1, X University</p>
               <p class="c-article-author-affiliation__address">Y Institute</p>
               </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let args = CollabsArgs {
        input: temp_dir.path().to_path_buf(),
        output: temp_dir.path().to_path_buf(),
        from_links: true,
        source: SourceArgs {
            base_url: server.uri(),
            journal: "srep".to_string(),
            article_type: "research".to_string(),
            subject: "mathematics-and-computing".to_string(),
            date_range: "last_year".to_string(),
            order: "relevance".to_string(),
            sample_rate: 0.5,
            seed: None,
            max_pages: None,
            timeout: 5,
        },
    };
    affiliation_graph::collabs::run_async(args).await.unwrap();

    let collabs: Collaborations =
        serde_json::from_reader(File::open(temp_dir.path().join("collabs.json")).unwrap()).unwrap();
    assert_eq!(collabs.weight("X University", "Y Institute", "Applied mathematics"), 1);
}
