// Integration tests for resumatch
use resumatch_core::{
    CandidateRecord, EducationEntry, ExperienceEntry, GeoTables, Profile, Region, StructuredQuery,
};
use resumatch_engine::{IngestOutcome, Ingestor, Matcher, MatcherConfig, TimeoutSettings};
use resumatch_services::{FixedStructurer, HashEmbedder};
use resumatch_similarity::{SectionWeights, TopN};
use resumatch_storage::{MemoryStore, SnapshotStore, StoreConfig};
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 128;

fn profile(name: &str, location: &str, title: &str, skills: &[&str]) -> Profile {
    Profile {
        name: Some(name.to_string()),
        location: Some(location.to_string()),
        current_job_title: Some(title.to_string()),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn data_analyst_query(location: &str) -> StructuredQuery {
    StructuredQuery {
        job_title: "Data Analyst".to_string(),
        required_skills: vec!["SQL".to_string(), "Excel".to_string(), "Tableau".to_string()],
        required_experience: "Analyst at Acme - Built sales dashboards".to_string(),
        required_education: "B.Com in Statistics from Mumbai University".to_string(),
        location: location.to_string(),
    }
}

struct Pipeline {
    store: Arc<MemoryStore>,
    ingestor: Ingestor<HashEmbedder, FixedStructurer>,
    matcher: Matcher<HashEmbedder, FixedStructurer, MemoryStore>,
}

fn pipeline(query: StructuredQuery, store: Arc<MemoryStore>) -> Pipeline {
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let structurer = Arc::new(FixedStructurer::new().with_query(query));
    let tables = Arc::new(GeoTables::india());

    Pipeline {
        ingestor: Ingestor::new(
            embedder.clone(),
            structurer.clone(),
            store.clone(),
            tables.clone(),
            TimeoutSettings::default(),
        ),
        matcher: Matcher::new(
            embedder,
            structurer,
            store.clone(),
            tables,
            SectionWeights::default(),
            MatcherConfig::default(),
        ),
        store,
    }
}

fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(StoreConfig {
        dimension: Some(DIM),
        ..Default::default()
    }))
}

async fn ingest_sample(p: &Pipeline) {
    let candidates = [
        profile("Meera", "Pune", "Data Analyst", &["SQL", "Excel", "Tableau"]),
        profile("Karan", "Ahmedabad", "Business Analyst", &["Excel", "SQL"]),
        profile("Divya", "Hyderabad", "Data Engineer", &["Spark", "SQL", "Airflow"]),
        profile("Rohit", "Panaji, Goa", "Chef", &["Baking", "Menu Planning"]),
        profile("Sana", "Kolkata", "Data Analyst", &["SQL", "Excel", "Tableau"]),
        profile("Imran", "Lucknow", "Data Analyst", &["SQL", "Excel"]),
    ];
    for candidate in candidates {
        let outcome = p.ingestor.ingest_profile(candidate).await.unwrap();
        assert!(outcome.is_inserted());
    }
}

#[test]
fn test_mumbai_eligible_regions() {
    let tables = GeoTables::india();
    let eligible = tables.eligible_regions("Mumbai, India").unwrap();
    let names: Vec<&str> = eligible.iter().map(Region::as_str).collect();
    assert_eq!(
        names,
        vec![
            "maharashtra",
            "gujarat",
            "madhya pradesh",
            "chhattisgarh",
            "telangana",
            "karnataka",
            "goa"
        ]
    );
}

#[tokio::test]
async fn test_end_to_end_ranking() {
    let p = pipeline(data_analyst_query("Mumbai, India"), new_store());
    ingest_sample(&p).await;

    let ranked = p.matcher.rank("Hiring a data analyst in Mumbai", TopN::All).await.unwrap();

    // Kolkata and Lucknow are outside Maharashtra's neighbourhood.
    let names: Vec<&str> = ranked.iter().map(|r| r.profile.name()).collect();
    assert_eq!(names.len(), 4);
    assert!(!names.contains(&"Sana"));
    assert!(!names.contains(&"Imran"));
    assert_eq!(names[0], "Meera");
    assert_eq!(*names.last().unwrap(), "Rohit");

    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(ranked.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
    for r in &ranked {
        let sum: f32 = r.section_scores.values().sum();
        assert!((sum - r.score).abs() < 1e-4);
    }
}

#[tokio::test]
async fn test_top_n_truncates() {
    let p = pipeline(data_analyst_query("Pune"), new_store());
    ingest_sample(&p).await;

    assert_eq!(p.matcher.rank("jd", TopN::Count(2)).await.unwrap().len(), 2);
    assert_eq!(p.matcher.rank("jd", TopN::Count(100)).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_identical_candidate_scores_one() {
    let p = pipeline(data_analyst_query("Mumbai"), new_store());
    let twin = Profile {
        name: Some("Twin".into()),
        location: Some("Mumbai".into()),
        current_job_title: Some("Data Analyst".into()),
        skills: vec!["SQL".into(), "Excel".into(), "Tableau".into()],
        experience: vec![ExperienceEntry {
            title: Some("Analyst".into()),
            company: Some("Acme".into()),
            description: Some("Built sales dashboards".into()),
            ..Default::default()
        }],
        education: vec![EducationEntry {
            degree: Some("B.Com".into()),
            field: Some("Statistics".into()),
            institution: Some("Mumbai University".into()),
            ..Default::default()
        }],
        ..Default::default()
    };
    p.ingestor.ingest_profile(twin).await.unwrap();

    let ranked = p.matcher.rank("jd", TopN::Count(1)).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert!((ranked[0].score - 1.0).abs() < 1e-4, "score {}", ranked[0].score);
}

#[tokio::test]
async fn test_empty_pool_and_empty_location() {
    let p = pipeline(data_analyst_query("Mumbai"), new_store());
    assert!(p.matcher.rank("jd", TopN::Count(5)).await.unwrap().is_empty());

    let p = pipeline(data_analyst_query(""), new_store());
    ingest_sample(&p).await;
    assert!(p.matcher.rank("jd", TopN::Count(5)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_ingest() {
    let p = pipeline(data_analyst_query("Mumbai"), new_store());
    let candidate = profile("Meera", "Pune", "Data Analyst", &["SQL"]);

    let first = p.ingestor.ingest_profile(candidate.clone()).await.unwrap();
    let second = p.ingestor.ingest_profile(candidate).await.unwrap();
    assert_eq!(second, IngestOutcome::Duplicate(first.id()));
    assert_eq!(p.store.len(), 1);
}

#[tokio::test]
async fn test_snapshot_roundtrip_preserves_ranking() {
    let temp_dir = TempDir::new().unwrap();
    let snapshots = SnapshotStore::new(temp_dir.path()).unwrap();

    let p = pipeline(data_analyst_query("Mumbai"), new_store());
    ingest_sample(&p).await;
    let before = p.matcher.rank("jd", TopN::All).await.unwrap();
    snapshots.save(&p.store).unwrap();

    let restored = new_store();
    assert_eq!(snapshots.load_into(&restored).unwrap(), 6);
    let q = pipeline(data_analyst_query("Mumbai"), restored);
    let after = q.matcher.rank("jd", TopN::All).await.unwrap();

    let ids = |r: &[resumatch_engine::RankedCandidate]| r.iter().map(|c| c.id).collect::<Vec<_>>();
    assert_eq!(ids(&before), ids(&after));
}

#[tokio::test]
async fn test_backfill_makes_candidates_eligible() {
    let store = new_store();
    let p = pipeline(data_analyst_query("Nagpur"), store.clone());

    // A legacy record stored before region inference existed.
    let embedder = HashEmbedder::new(DIM);
    let legacy = profile("Legacy", "Andheri East, Mumbai", "Data Analyst", &["SQL", "Excel"]);
    let vectors = resumatch_core::Section::ALL
        .iter()
        .map(|s| (*s, embedder.embed_sync(&legacy.section_text(*s))))
        .collect();
    store
        .insert(CandidateRecord::new(legacy, None, vectors))
        .unwrap();

    assert!(p.matcher.rank("jd", TopN::All).await.unwrap().is_empty());

    let report = store.backfill_regions(&GeoTables::india());
    assert_eq!(report.updated, 1);
    assert_eq!(report.unresolved, 0);

    let ranked = p.matcher.rank("jd", TopN::All).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].region, Some(Region::new("maharashtra")));
}
