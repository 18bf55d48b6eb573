//! Sessions opened from the same registry never share catalog or visibility state.

use signal_panes::catalog::SignalId;
use signal_panes::config::AppConfig;
use signal_panes::ingest::RawTable;
use signal_panes::layout::LayoutMode;
use signal_panes::registry::SessionRegistry;

fn table(headers: &[&str]) -> RawTable {
    RawTable::new(
        headers.iter().map(|h| h.to_string()).collect(),
        vec![headers.iter().map(|_| "0".to_string()).collect()],
    )
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let registry = SessionRegistry::new(AppConfig::default());
    let a = registry.open();
    let b = registry.open();

    a.handle
        .ingest_file("a.csv", table(&["Time", "X"]))
        .await
        .unwrap();
    a.handle
        .edit_cell(SignalId::new("a.csv", "X"), "plot1", false)
        .await
        .unwrap();

    // Same file name is new to the other session.
    let outcome = b
        .handle
        .ingest_file("a.csv", table(&["Time", "X", "Y"]))
        .await
        .unwrap();
    assert!(!outcome.rejected);
    assert_eq!(outcome.added_signals, vec!["X", "Y"]);

    let model_a = a.handle.snapshot().await.unwrap();
    let model_b = b.handle.snapshot().await.unwrap();
    assert_eq!(model_a.row_data.len(), 2);
    assert_eq!(model_b.row_data.len(), 3);
    assert!(!model_a.row_data[1].plot1);
    assert!(model_b.row_data[1].plot1);

    registry.close_all().await;
}

#[tokio::test]
async fn test_selection_belongs_to_its_session() {
    let registry = SessionRegistry::new(AppConfig::default());
    let a = registry.open();
    let b = registry.open();
    for opened in [&a, &b] {
        opened
            .handle
            .ingest_file("a.csv", table(&["Time", "X"]))
            .await
            .unwrap();
    }

    a.selection.set(vec![SignalId::new("a.csv", "X")]);
    a.handle
        .bulk_action(
            signal_panes::bridge::BulkTarget::SelectedSignals,
            signal_panes::bridge::PaneTarget::AllPanes,
            false,
        )
        .await
        .unwrap();

    let result = b
        .handle
        .bulk_action(
            signal_panes::bridge::BulkTarget::SelectedSignals,
            signal_panes::bridge::PaneTarget::AllPanes,
            false,
        )
        .await;
    assert!(result.is_err());

    registry.close_all().await;
}

#[tokio::test]
async fn test_reset_and_layout_are_per_session() {
    let mut config = AppConfig::default();
    config.layout.default = LayoutMode::Grid;
    let registry = SessionRegistry::new(config);
    let mut a = registry.open();
    let b = registry.open();

    a.handle
        .ingest_file("a.csv", table(&["Time", "X"]))
        .await
        .unwrap();
    b.handle
        .ingest_file("a.csv", table(&["Time", "X"]))
        .await
        .unwrap();

    a.handle.reset().await.unwrap();
    a.handle.set_layout(LayoutMode::Single).await.unwrap();

    assert_eq!(a.handle.snapshot().await.unwrap().row_data.len(), 1);
    assert_eq!(b.handle.snapshot().await.unwrap().row_data.len(), 2);

    // After a reset the same file can be uploaded again.
    let outcome = a
        .handle
        .ingest_file("a.csv", table(&["Time", "X"]))
        .await
        .unwrap();
    assert!(!outcome.rejected);

    let layout_event = loop {
        match a.events.recv().await {
            Some(signal_panes::commands::SessionEvent::LayoutChanged { mode, visible_panes }) => {
                break (mode, visible_panes)
            }
            Some(_) => continue,
            None => panic!("session stopped"),
        }
    };
    assert_eq!(layout_event.0, LayoutMode::Single);
    assert_eq!(layout_event.1.len(), 1);

    registry.close_all().await;
}
