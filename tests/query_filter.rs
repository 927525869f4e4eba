use pcaview::{DashboardConfig, DashboardSession, Entity};

fn session() -> DashboardSession {
    let entities = vec![
        Entity::new("de", vec![0.0, 0.0])
            .with_attr("region", "Europe")
            .with_attr("year", 2010.0),
        Entity::new("fr", vec![1.0, 1.0])
            .with_attr("region", "Europe")
            .with_attr("year", 1995.0),
        Entity::new("it", vec![2.0, 2.0])
            .with_attr("region", "Europe")
            .with_attr("year", 2005.0),
        Entity::new("jp", vec![3.0, 3.0])
            .with_attr("region", "Asia")
            .with_attr("year", 2015.0),
        Entity::new("xx", vec![4.0, 4.0]).with_attr("year", 2020.0),
    ];
    DashboardSession::new(
        entities,
        vec!["PC1".to_string(), "PC2".to_string()],
        DashboardConfig::default(),
    )
    .unwrap()
}

#[test]
fn conjunction_of_string_and_numeric_comparisons() {
    let mut s = session();
    s.filter_by_query("attr.region == 'Europe' and attr.year > 2000")
        .unwrap();
    assert_eq!(s.export_selection(), vec!["de", "it"]);
}

#[test]
fn membership_and_negation() {
    let mut s = session();
    s.filter_by_query("region in ['Asia'] or year >= 2020").unwrap();
    assert_eq!(s.export_selection(), vec!["jp", "xx"]);

    // Negation inverts the comparison, so an entity missing the
    // attribute (which never matches the comparison) is included.
    s.filter_by_query("not region == 'Europe'").unwrap();
    assert_eq!(s.export_selection(), vec!["jp", "xx"]);
}

#[test]
fn id_is_queryable_like_an_attribute() {
    let mut s = session();
    s.filter_by_query("id == 'fr'").unwrap();
    assert_eq!(s.export_selection(), vec!["fr"]);
}

#[test]
fn invalid_queries_leave_the_selection_untouched() {
    let mut s = session();
    s.filter_by_query("region == 'Europe'").unwrap();
    let before = s.export_selection();

    assert!(s.filter_by_query("region == ").is_err());
    assert!(s.filter_by_query("no_such_attr > 3").is_err());
    assert_eq!(s.export_selection(), before);
}

#[test]
fn query_results_flow_through_the_views() {
    let mut s = session();
    let outcome = s.filter_by_query("year < 2000").unwrap();
    // System-origin updates have no origin view to acknowledge them.
    assert_eq!(outcome.renders, s.views().len());
    assert_eq!(outcome.acks, 0);
    assert_eq!(s.export_selection(), vec!["fr"]);
}
