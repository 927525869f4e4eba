use pcaview::{
    DashboardConfig, DashboardSession, Entity, InteractionEvent, ViewKind,
};

fn entities() -> Vec<Entity> {
    vec![
        Entity::new("A", vec![0.1, 0.2, 0.3])
            .with_attr("region", "Europe")
            .with_geo(48.8, 2.3)
            .with_time(100.0),
        Entity::new("B", vec![0.4, 0.5, 0.6])
            .with_attr("region", "Europe")
            .with_geo(52.5, 13.4)
            .with_time(200.0),
        Entity::new("C", vec![0.7, 0.8, 0.9])
            .with_attr("region", "Asia")
            .with_geo(35.7, 139.7)
            .with_time(300.0),
        Entity::new("D", vec![1.0, 1.1, 1.2])
            .with_attr("region", "Asia")
            .with_geo(1.3, 103.8)
            .with_time(400.0),
    ]
}

fn pcs() -> Vec<String> {
    vec!["PC1".to_string(), "PC2".to_string(), "PC3".to_string()]
}

fn session() -> DashboardSession {
    let _ = env_logger::builder().is_test(true).try_init();
    DashboardSession::new(entities(), pcs(), DashboardConfig::default()).unwrap()
}

#[test]
fn map_region_then_table_click_keeps_all_views_consistent() {
    let mut s = session();
    assert_eq!(s.views().len(), 4);

    // Lasso around Paris and Berlin on the map: selection becomes {A, B}.
    let outcome = s
        .handle_interaction(
            ViewKind::Map,
            &InteractionEvent::Region {
                x0: 0.0,
                x1: 20.0,
                y0: 45.0,
                y1: 55.0,
            },
        )
        .unwrap();
    assert_eq!(s.selection().generation, 1);
    assert_eq!(s.export_selection(), vec!["A", "B"]);
    // The origin view only acknowledges; every other view updates once.
    assert_eq!(outcome.acks, 1);
    assert_eq!(outcome.renders, 3);

    // Clicking row C replaces the selection entirely.
    let outcome = s
        .handle_interaction(
            ViewKind::Table,
            &InteractionEvent::RowClick { id: "C".to_string() },
        )
        .unwrap();
    assert_eq!(s.selection().generation, 2);
    assert_eq!(s.export_selection(), vec!["C"]);
    assert_eq!(outcome.acks, 1);
    assert_eq!(outcome.renders, 3);

    // All views now agree on the selection marks.
    let table_fig = s.render_view(ViewKind::Table).unwrap();
    let selected: Vec<&str> = table_fig
        .rows
        .iter()
        .filter(|r| r.selected)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(selected, vec!["C"]);

    let scatter_fig = s.render_view(ViewKind::Scatter).unwrap();
    let marked: usize = scatter_fig.traces.iter().map(|t| t.selected.len()).sum();
    assert_eq!(marked, 1);

    let hist_fig = s.render_view(ViewKind::Histogram).unwrap();
    let marked: usize = hist_fig.bins.iter().map(|b| b.selected).sum();
    assert_eq!(marked, 1);
}

#[test]
fn broadcasts_terminate_after_one_round() {
    let mut s = session();
    let outcome = s
        .handle_interaction(
            ViewKind::Table,
            &InteractionEvent::RowToggle {
                id: "A".to_string(),
                selected: true,
            },
        )
        .unwrap();
    // One generation touches each view exactly once: no echo, no loop.
    assert_eq!(outcome.renders + outcome.acks, 4);
    assert_eq!(outcome.skips, 0);
    // With the queue drained, pumping again does nothing at all.
    let idle = s.pump();
    assert_eq!(idle.renders + idle.acks + idle.skips, 0);
}

#[test]
fn repeating_an_identical_selection_still_advances_the_generation() {
    let mut s = session();
    let event = InteractionEvent::RowToggle {
        id: "B".to_string(),
        selected: true,
    };
    s.handle_interaction(ViewKind::Table, &event).unwrap();
    let gen_before = s.selection().generation;
    // Same ids again: the id set is unchanged but the update still counts.
    s.handle_interaction(ViewKind::Table, &event).unwrap();
    assert_eq!(s.selection().generation, gen_before + 1);
    assert_eq!(s.export_selection(), vec!["B"]);
}

#[test]
fn unknown_ids_are_dropped_from_imported_selections() {
    let mut s = session();
    s.import_selection(vec!["A".to_string(), "ghost".to_string()]);
    assert_eq!(s.export_selection(), vec!["A"]);
}

#[test]
fn clear_and_select_all() {
    let mut s = session();
    s.select_all();
    assert_eq!(s.selection().len(), 4);
    s.clear_selection();
    assert!(s.selection().is_empty());
    // An empty selection still renders a complete, unhighlighted figure.
    let fig = s.render_view(ViewKind::Scatter).unwrap();
    assert!(!fig.selection_active);
    let points: usize = fig.traces.iter().map(|t| t.len()).sum();
    assert_eq!(points, 4);
}

#[test]
fn preset_selection_is_applied_at_startup() {
    let config = DashboardConfig {
        preset_selection: vec!["A".to_string(), "D".to_string()],
        ..DashboardConfig::default()
    };
    let s = DashboardSession::new(entities(), pcs(), config).unwrap();
    assert_eq!(s.export_selection(), vec!["A", "D"]);
    assert_eq!(s.selection().origin, ViewKind::System);
}

#[test]
fn histogram_range_selection_is_inclusive_at_both_ends() {
    let mut s = session();
    s.handle_interaction(
        ViewKind::Histogram,
        &InteractionEvent::Range {
            min: 100.0,
            max: 300.0,
        },
    )
    .unwrap();
    assert_eq!(s.export_selection(), vec!["A", "B", "C"]);
}

#[test]
fn legend_click_selects_the_whole_group() {
    let mut s = session();
    s.handle_interaction(
        ViewKind::Scatter,
        &InteractionEvent::LegendClick {
            group: "Asia".to_string(),
        },
    )
    .unwrap();
    assert_eq!(s.export_selection(), vec!["C", "D"]);
}
