//! Cross-pane zoom synchronization through a running session.

use serde_json::json;
use signal_panes::bridge::SharedSelection;
use signal_panes::config::AppConfig;
use signal_panes::pane::{
    render_channel, ChannelPane, PaneIndex, RenderCommand, RenderReceiver, ZoomRange,
};
use signal_panes::sync::ZoomEvent;
use signal_panes::{PlotSession, SessionHandle};
use std::sync::Arc;

async fn session_with_panes() -> (SessionHandle, Vec<RenderReceiver>) {
    let (handle, _events, _task) =
        PlotSession::spawn(AppConfig::default(), Arc::new(SharedSelection::new()));
    let mut receivers = Vec::new();
    for pane in PaneIndex::ALL {
        let (tx, rx) = render_channel();
        handle
            .attach_pane(pane, Arc::new(ChannelPane::new(tx)))
            .await
            .unwrap();
        receivers.push(rx);
    }
    (handle, receivers)
}

fn zooms(rx: &mut RenderReceiver) -> Vec<Option<ZoomRange>> {
    let mut ranges = Vec::new();
    while let Ok(command) = rx.try_recv() {
        if let RenderCommand::ZoomRange { range, .. } = command {
            ranges.push(range);
        }
    }
    ranges
}

fn pane(i: usize) -> PaneIndex {
    PaneIndex::ALL[i]
}

#[tokio::test]
async fn test_range_reaches_synced_sibling_only() {
    let (handle, mut panes) = session_with_panes().await;
    handle.set_sync(pane(0), true).await.unwrap();
    handle.set_sync(pane(1), true).await.unwrap();

    let range = ZoomRange::new(10.0, 20.0).unwrap();
    let updated = handle
        .zoom_changed(pane(0), ZoomEvent::Range(range))
        .await
        .unwrap();
    assert_eq!(updated, vec![pane(1)]);

    assert_eq!(zooms(&mut panes[1]), vec![Some(range)]);
    // The trigger is never rewritten by its own event.
    assert!(zooms(&mut panes[0]).is_empty());
    assert!(zooms(&mut panes[2]).is_empty());
    assert!(zooms(&mut panes[3]).is_empty());
}

#[tokio::test]
async fn test_reset_clears_synced_siblings() {
    let (handle, mut panes) = session_with_panes().await;
    for i in [0, 2, 3] {
        handle.set_sync(pane(i), true).await.unwrap();
    }

    let updated = handle.zoom_changed(pane(2), ZoomEvent::Reset).await.unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(zooms(&mut panes[0]), vec![None]);
    assert_eq!(zooms(&mut panes[3]), vec![None]);
    assert!(zooms(&mut panes[1]).is_empty());
}

#[tokio::test]
async fn test_unsynced_trigger_changes_nothing() {
    let (handle, mut panes) = session_with_panes().await;
    handle.set_sync(pane(0), true).await.unwrap();
    handle.set_sync(pane(1), true).await.unwrap();

    let range = ZoomRange::new(0.0, 5.0).unwrap();
    let updated = handle
        .zoom_changed(pane(2), ZoomEvent::Range(range))
        .await
        .unwrap();
    assert!(updated.is_empty());
    for rx in panes.iter_mut() {
        assert!(zooms(rx).is_empty());
    }
}

#[tokio::test]
async fn test_unsync_removes_pane_from_group() {
    let (handle, mut panes) = session_with_panes().await;
    handle.set_sync(pane(0), true).await.unwrap();
    handle.set_sync(pane(1), true).await.unwrap();
    handle.set_sync(pane(1), false).await.unwrap();

    let range = ZoomRange::new(1.0, 2.0).unwrap();
    let updated = handle
        .zoom_changed(pane(0), ZoomEvent::Range(range))
        .await
        .unwrap();
    assert!(updated.is_empty());
    assert!(zooms(&mut panes[1]).is_empty());
}

#[tokio::test]
async fn test_relayout_payloads() {
    let (handle, mut panes) = session_with_panes().await;
    handle.set_sync(pane(0), true).await.unwrap();
    handle.set_sync(pane(3), true).await.unwrap();

    let updated = handle
        .relayout(pane(3), &json!({"xaxis.range[0]": 2.5, "xaxis.range[1]": 7.5}))
        .await
        .unwrap();
    assert_eq!(updated, vec![pane(0)]);
    assert_eq!(
        zooms(&mut panes[0]),
        vec![Some(ZoomRange::new(2.5, 7.5).unwrap())]
    );

    // y-axis only relayouts are not zoom events.
    let updated = handle
        .relayout(pane(3), &json!({"yaxis.range[0]": 0.0}))
        .await
        .unwrap();
    assert!(updated.is_empty());
}

#[tokio::test]
async fn test_late_attach_receives_synced_range() {
    let (handle, _events, _task) =
        PlotSession::spawn(AppConfig::default(), Arc::new(SharedSelection::new()));
    handle.set_sync(pane(0), true).await.unwrap();
    handle.set_sync(pane(1), true).await.unwrap();

    let range = ZoomRange::new(3.0, 4.0).unwrap();
    handle
        .zoom_changed(pane(0), ZoomEvent::Range(range))
        .await
        .unwrap();

    let (tx, mut rx) = render_channel();
    handle
        .attach_pane(pane(1), Arc::new(ChannelPane::new(tx)))
        .await
        .unwrap();
    assert_eq!(zooms(&mut rx), vec![Some(range)]);
}
