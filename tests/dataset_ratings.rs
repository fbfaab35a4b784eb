use std::path::PathBuf;

use hint_rating::{
    HintRatingSet, MatchType, RatingSettings,
    data::GoldStandard,
    dataset::Dataset,
    rating::{Rater, RatingOptions},
    report::{hint_rows, request_rows},
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("ratings")
        .join(name)
}

fn rate_all(parallel: bool) -> Vec<HintRatingSet> {
    let dataset = Dataset::load(&fixture("snap_dataset.json")).expect("load dataset");
    let standard = dataset.gold_standard().expect("gold standard");
    let settings = RatingSettings::snap();
    let rater = Rater::builder()
        .config(&settings)
        .options(RatingOptions::builder().parallel(parallel).build())
        .build();
    dataset
        .hint_sets()
        .expect("hint sets")
        .iter()
        .map(|set| rater.rate(&standard, set).expect("rating"))
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn gold_standard_loads_every_request() {
    let dataset = Dataset::load(&fixture("snap_dataset.json")).expect("load dataset");
    let standard = dataset.gold_standard().expect("gold standard");
    assert_eq!(standard.assignment_ids(), ["polygon", "squiral"]);
    assert_eq!(standard.request_ids("squiral"), ["r1", "r2", "r3"]);
    assert_eq!(standard.valid_hints("squiral", "r1").len(), 2);
    assert_eq!(standard.len(), 5);

    let rendered = standard.render_request_nodes(&RatingSettings::snap());
    assert!(rendered.contains("r2\nscript:\n  forward"));
}

#[test]
fn alpha_matches_fully_and_partially() {
    let sets = rate_all(true);
    let alpha = &sets[0];
    assert_eq!(alpha.name, "alpha");

    // r3 only has a single-tutor hint and is not rated.
    let ids: Vec<_> = alpha.requests.iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(ids, ["p1", "r1", "r2"]);

    let r1 = &alpha.requests[1];
    let verdicts: Vec<_> = r1
        .ratings()
        .iter()
        .map(|r| (r.outcome.id.as_str(), r.match_type, r.matched.as_ref().map(|h| h.hint_id)))
        .collect();
    assert_eq!(
        verdicts,
        [
            ("a1", MatchType::Full, Some(1)),
            ("a2", MatchType::Full, Some(2)),
            ("a3", MatchType::None, None),
        ]
    );
    assert_close(&r1.validity_array(), &[0.75, 0.75, 0.5, 0.5, 0.0, 0.0]);
    assert!((r1.priority_score(false) - 1.75).abs() < 1e-9);

    let r2 = &alpha.requests[2];
    assert_eq!(r2.ratings()[0].match_type, MatchType::Partial);
    assert_close(&r2.validity_array(), &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

    let p1 = &alpha.requests[0];
    assert!(p1.ratings()[0].is_too_soon());
    assert_eq!(p1.ratings()[0].match_type, MatchType::Full);
    assert_close(&p1.validity_array(), &[0.0; 6]);

    let summary = alpha.assignment_summary("squiral").expect("summary");
    assert_eq!(summary.requests, 2);
    assert_close(&summary.validity, &[0.375, 0.875, 0.25, 0.75, 0.0, 0.5]);
    assert!((summary.priority_full - 0.875).abs() < 1e-9);
    assert!((summary.priority_partial - 1.875).abs() < 1e-9);
}

#[test]
fn empty_requests_count_towards_averages() {
    let sets = rate_all(true);
    let beta = &sets[1];
    assert_eq!(beta.name, "beta");

    let r1 = beta
        .requests
        .iter()
        .find(|r| r.request_id == "r1")
        .expect("r1 is rated");
    assert!(r1.is_empty());

    let summary = beta.assignment_summary("squiral").expect("summary");
    assert_close(&summary.validity, &[0.0, 0.5, 0.0, 0.5, 0.0, 0.5]);
    assert!((summary.priority_partial - 1.0).abs() < 1e-9);
}

#[test]
fn rows_flatten_every_rating() {
    let sets = rate_all(false);
    let settings = RatingSettings::snap();

    let alpha_rows = hint_rows(&sets[0], &settings);
    assert_eq!(alpha_rows.len(), 5);
    let a1 = alpha_rows
        .iter()
        .find(|row| row.hint_id == "a1")
        .expect("a1 row");
    assert_eq!(a1.properties.get("p_distance").map(String::as_str), Some("1"));
    assert_eq!(a1.properties.get("p_source").map(String::as_str), Some("model"));
    assert!((a1.weight_norm - 0.5).abs() < 1e-9);

    let beta_rows = hint_rows(&sets[1], &settings);
    assert_eq!(beta_rows.len(), 3);
    assert!(beta_rows.iter().any(|row| row.hint_id.is_empty()));

    let requests = request_rows(&sets[1]);
    assert_eq!(requests.len(), 3);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let parallel = rate_all(true);
    let sequential = rate_all(false);
    for (p, s) in parallel.iter().zip(&sequential) {
        assert_eq!(p.summaries(), s.summaries());
    }
}
