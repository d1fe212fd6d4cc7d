use std::collections::BTreeSet;
use std::fs;

use jobnotes_harvest::{PostingRecord, VocabularyPaths, VocabularyStore};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn learn_filters_stop_words_short_and_punctuated() {
    let mut store = VocabularyStore::default();

    let added = store.learn(["熟悉", "Python", "A", "Docker、"]);

    assert_eq!(added, set(&["Python"]));
    assert_eq!(store.len(), 1);
}

#[test]
fn learn_returns_only_new_terms() {
    let mut store = VocabularyStore::with_terms(["Docker", "SQL"]);

    let added = store.learn(["docker", " Airflow ", "SQL", "Airflow"]);

    assert_eq!(added, set(&["Airflow"]));
    assert_eq!(store.len(), 3);
    assert_eq!(store.annotate("use docker"), "use [[Docker]]");
}

#[test]
fn missing_files_give_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = VocabularyStore::load(VocabularyPaths {
        seed: Some(dir.path().join("nope.yaml")),
        learned: Some(dir.path().join("learned.yaml")),
    });

    assert!(store.is_empty());
}

#[test]
fn seed_categories_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("tech_keywords.yaml");
    fs::write(
        &seed,
        "languages:\n  - Python\n  - Rust\ndata:\n  - Apache Spark\n  - Kafka\nversion: 3\n",
    )
    .unwrap();

    let store = VocabularyStore::load(VocabularyPaths {
        seed: Some(seed),
        learned: None,
    });

    assert_eq!(store.len(), 4);
    assert!(store.contains("apache spark"));
    assert_eq!(
        store.annotate("Python feeds Apache Spark via Kafka"),
        "[[Python]] feeds [[Apache Spark]] via [[Kafka]]"
    );
}

#[test]
fn learned_terms_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let learned = dir.path().join("data").join("learned_keywords.yaml");
    let paths = VocabularyPaths {
        seed: None,
        learned: Some(learned.clone()),
    };

    let mut store = VocabularyStore::load(paths.clone());
    store.learn(["Terraform", "Airflow"]);
    store.learn(["dbt", "Airflow"]);
    drop(store);

    let content = fs::read_to_string(&learned).unwrap();
    assert_eq!(content, "auto_learned:\n- Airflow\n- Terraform\n- dbt\n");

    let store = VocabularyStore::load(paths);
    let terms: BTreeSet<String> = store.terms().map(String::from).collect();
    assert_eq!(terms, set(&["Airflow", "Terraform", "dbt"]));
}

#[test]
fn unwritable_learned_file_keeps_terms_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = VocabularyStore::load(VocabularyPaths {
        seed: None,
        // A directory cannot be replaced by the learned document.
        learned: Some(dir.path().to_path_buf()),
    });

    let added = store.learn(["Grafana"]);

    assert_eq!(added, set(&["Grafana"]));
    assert!(store.contains("Grafana"));

    let err = store.flush().unwrap_err();
    assert!(format!("{err:#}").contains(&dir.path().display().to_string()));
}

#[test]
fn process_links_description_and_requirements() {
    let mut store = VocabularyStore::with_terms(["SQL"]);
    let mut record = PostingRecord {
        description: "Build Kubernetes jobs in SQL".to_string(),
        requirement: "kubernetes".to_string(),
        other_requirement: "Nice to have: Go".to_string(),
        specialties: vec!["Kubernetes".to_string(), "工具".to_string(), "Go".to_string()],
        title: "SQL Engineer".to_string(),
        ..PostingRecord::new("r1")
    };

    store.process(&mut record);

    assert_eq!(record.description, "Build [[Kubernetes]] jobs in [[SQL]]");
    assert_eq!(record.requirement, "[[Kubernetes]]");
    assert_eq!(record.other_requirement, "Nice to have: [[Go]]");
    assert_eq!(record.title, "SQL Engineer");
    assert!(!store.contains("工具"));
}

#[test]
fn processing_twice_does_not_nest_links() {
    let mut store = VocabularyStore::with_terms(["Spark", "Apache Spark"]);
    let mut record = PostingRecord {
        description: "uses Apache Spark daily".to_string(),
        ..PostingRecord::new("r2")
    };

    store.process(&mut record);
    store.process(&mut record);

    assert_eq!(record.description, "uses [[Apache Spark]] daily");
}
