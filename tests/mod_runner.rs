mod common;

use async_trait::async_trait;
use bookstore_queries::book::Book;
use bookstore_queries::errors::QueryError;
use bookstore_queries::query::{
    DeleteReport, Filter, FindOptions, IndexSpec, Stage, UpdateDoc, UpdateReport,
};
use bookstore_queries::runner::{Outcome, QueryRunner, bookstore_script};
use bookstore_queries::store::{BookStore, MemoryStore};
use bson::Document;

#[tokio::test]
async fn end_to_end_two_records() {
    let store = common::store_with(&[
        Book::new("1984", "George Orwell", "Dystopian", 1949, 10.0, true),
        Book::new("Moby Dick", "Herman Melville", "Adventure", 1851, 12.5, false),
    ]);
    QueryRunner::new().run(&store, &mut std::io::sink()).await.unwrap();

    let b = store.find_one(&Filter::eq("title", "1984")).await.unwrap().unwrap();
    assert_eq!(b.get_f64("price").unwrap(), 15.99);
    assert!(store.find_one(&Filter::eq("title", "Moby Dick")).await.unwrap().is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn full_script_over_fixture() {
    let store = common::seeded_store();
    let mut out = Vec::new();
    let report = QueryRunner::new().run_and_close(&store, &mut out).await.unwrap();
    assert_eq!(report.steps.len(), 17);
    assert!(store.is_closed());

    let fiction = report.outcome("Books in Fiction genre").unwrap().documents();
    assert_eq!(fiction.len(), 3);
    assert!(fiction.iter().all(|d| d.get_str("genre").unwrap() == "Fiction"));

    let after = report.outcome("Books published after 1940").unwrap().documents();
    assert_eq!(after.len(), 4);
    assert!(after.iter().all(|d| d.get_i32("published_year").unwrap() > 1940));

    let orwell = report.outcome("Books by George Orwell").unwrap().documents();
    assert_eq!(common::titles(orwell), vec!["1984", "Animal Farm"]);

    match report.outcome("Updating price").unwrap() {
        Outcome::Updated { report, current } => {
            assert_eq!(report, &UpdateReport { matched: 1, modified: 1 });
            assert_eq!(current.as_ref().unwrap().get_f64("price").unwrap(), 15.99);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match report.outcome("Deleting book").unwrap() {
        Outcome::Deleted { report, remaining } => {
            assert_eq!(report, &DeleteReport { deleted: 1 });
            assert!(remaining.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let stocked = report.outcome("Books in stock").unwrap().documents();
    assert_eq!(
        common::titles(stocked),
        vec!["To Kill a Mockingbird", "1984", "The Hobbit", "The Catcher in the Rye"]
    );

    let projected = report.outcome("Projection").unwrap().documents();
    assert_eq!(projected.len(), 9);
    for d in projected {
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "title", "author", "price"]);
    }

    let asc = report.outcome("Books sorted by price (ascending)").unwrap().documents();
    let desc = report.outcome("Books sorted by price (descending)").unwrap().documents();
    let mut reversed = desc.to_vec();
    reversed.reverse();
    assert_eq!(asc, reversed.as_slice());
    assert_eq!(asc[0].get_str("title").unwrap(), "Pride and Prejudice");
    assert_eq!(desc[0].get_str("title").unwrap(), "1984");

    let p1 = report.outcome("Pagination (Page 1").unwrap().documents();
    let p2 = report.outcome("Pagination (Page 2").unwrap().documents();
    assert_eq!(p1.len(), 5);
    assert_eq!(p2.len(), 4);

    let top = report.outcome("Author with the most books").unwrap().documents();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].get_str("_id").unwrap(), "George Orwell");
    assert_eq!(top[0].get_i32("count").unwrap(), 2);

    let decades = report.outcome("Books grouped by publication decade").unwrap().documents();
    let buckets: Vec<(f64, i32)> = decades
        .iter()
        .map(|d| (d.get_f64("_id").unwrap(), d.get_i32("count").unwrap()))
        .collect();
    assert_eq!(
        buckets,
        vec![
            (1810.0, 1),
            (1840.0, 1),
            (1920.0, 1),
            (1930.0, 2),
            (1940.0, 2),
            (1950.0, 1),
            (1960.0, 1),
        ]
    );

    assert_eq!(
        report.outcome("Creating index on title").unwrap(),
        &Outcome::IndexReady("title_1".into())
    );
    assert_eq!(
        report.outcome("Creating compound index").unwrap(),
        &Outcome::IndexReady("author_1_published_year_-1".into())
    );
    match report.outcome("Explain query").unwrap() {
        Outcome::Plan(plan) => {
            let winning =
                plan.get_document("queryPlanner").unwrap().get_document("winningPlan").unwrap();
            assert_eq!(
                winning.get_document("inputStage").unwrap().get_str("indexName").unwrap(),
                "title_1"
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\nBooks in Fiction genre:\n["));
    assert!(text.contains("Deleted. Checking: null"));
    assert!(text.ends_with("\nConnection closed\n"));
}

#[tokio::test]
async fn second_run_is_idempotent_for_indexes() {
    let store = common::seeded_store();
    let runner = QueryRunner::new();
    runner.run(&store, &mut std::io::sink()).await.unwrap();
    let report = runner.run(&store, &mut std::io::sink()).await.unwrap();
    // Nothing left to delete the second time.
    match report.outcome("Deleting book").unwrap() {
        Outcome::Deleted { report, .. } => assert_eq!(report.deleted, 0),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        store.index_names().await.unwrap(),
        vec!["_id_", "author_1_published_year_-1", "title_1"]
    );
}

/// Delegates to a memory store but rejects every aggregation.
struct RejectAggregates {
    inner: MemoryStore,
}

#[async_trait]
impl BookStore for RejectAggregates {
    fn describe(&self) -> String {
        self.inner.describe()
    }
    async fn find(&self, f: &Filter, o: &FindOptions) -> Result<Vec<Document>, QueryError> {
        self.inner.find(f, o).await
    }
    async fn find_one(&self, f: &Filter) -> Result<Option<Document>, QueryError> {
        self.inner.find_one(f).await
    }
    async fn update_one(&self, f: &Filter, u: &UpdateDoc) -> Result<UpdateReport, QueryError> {
        self.inner.update_one(f, u).await
    }
    async fn delete_one(&self, f: &Filter) -> Result<DeleteReport, QueryError> {
        self.inner.delete_one(f).await
    }
    async fn aggregate(&self, _p: &[Stage]) -> Result<Vec<Document>, QueryError> {
        Err(QueryError::Operation("$group is not allowed".into()))
    }
    async fn create_index(&self, i: &IndexSpec) -> Result<String, QueryError> {
        self.inner.create_index(i).await
    }
    async fn index_names(&self) -> Result<Vec<String>, QueryError> {
        self.inner.index_names().await
    }
    async fn explain(&self, f: &Filter) -> Result<Document, QueryError> {
        self.inner.explain(f).await
    }
    async fn close(&self) -> Result<(), QueryError> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn failing_step_aborts_and_still_closes() {
    let store = RejectAggregates { inner: common::seeded_store() };
    let mut out = Vec::new();
    let err = QueryRunner::new().run_and_close(&store, &mut out).await.unwrap_err();

    match &err {
        QueryError::Step { index, step, .. } => {
            assert_eq!(*index, 12);
            assert_eq!(step, "Average price by genre:");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(err.root(), QueryError::Operation(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(store.inner.is_closed());

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Pagination (Page 2, 5 books):"));
    assert!(!text.contains("Creating index on title"));
    assert!(text.ends_with("\nConnection closed\n"));
}

#[tokio::test]
async fn step_error_outranks_broken_output() {
    let store = RejectAggregates { inner: common::seeded_store() };
    let script: Vec<_> = bookstore_script().into_iter().skip(11).take(1).collect();
    let err = QueryRunner::with_script(script)
        .run_and_close(&store, &mut common::FailWriter)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Step { index: 1, .. }));
    assert!(store.inner.is_closed());
}

#[tokio::test]
async fn broken_output_surfaces_after_clean_run() {
    let store = common::seeded_store();
    let err = QueryRunner::with_script(Vec::new())
        .run_and_close(&store, &mut common::FailWriter)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Io(_)));
    assert!(store.is_closed());
}

#[tokio::test]
async fn library_entry_point_closes_on_broken_output() {
    use bookstore_queries::config::{Backend, PartialConfig, RunnerConfig};
    let layer = PartialConfig {
        backend: Some(Backend::Memory),
        fixture: Some(common::fixture_path()),
        ..PartialConfig::default()
    };
    let cfg = RunnerConfig::resolve(layer).unwrap();
    let err = bookstore_queries::run(&cfg, &mut common::FailWriter).await.unwrap_err();
    assert!(matches!(err, QueryError::Io(_)));
}

#[tokio::test]
async fn runner_accepts_trait_objects_and_custom_scripts() {
    let store: Box<dyn BookStore> = Box::new(common::seeded_store());
    let script: Vec<_> = bookstore_script().into_iter().take(3).collect();
    let report = QueryRunner::with_script(script).run(store.as_ref(), &mut std::io::sink()).await.unwrap();
    assert_eq!(report.steps.len(), 3);
}

#[tokio::test]
async fn library_entry_point_runs_memory_backend() {
    use bookstore_queries::config::{Backend, PartialConfig, RunnerConfig};
    let layer = PartialConfig {
        backend: Some(Backend::Memory),
        fixture: Some(common::fixture_path()),
        ..PartialConfig::default()
    };
    let cfg = RunnerConfig::resolve(layer).unwrap();
    let mut out = Vec::new();
    let report = bookstore_queries::run(&cfg, &mut out).await.unwrap();
    assert_eq!(report.steps.len(), 17);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Connected to in-memory store (plp_bookstore.books)\n"));
}

#[tokio::test]
async fn missing_fixture_fails_before_connecting() {
    use bookstore_queries::config::{Backend, PartialConfig, RunnerConfig};
    let layer = PartialConfig {
        backend: Some(Backend::Memory),
        fixture: Some(std::env::temp_dir().join("bookstore_no_such_fixture.json")),
        ..PartialConfig::default()
    };
    let cfg = RunnerConfig::resolve(layer).unwrap();
    let mut out: Vec<u8> = Vec::new();
    let err = bookstore_queries::run(&cfg, &mut out).await.unwrap_err();
    assert!(matches!(err, QueryError::Fixture(_)));
    assert!(out.is_empty());
}
