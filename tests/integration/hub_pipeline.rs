//! End-to-end hub behavior: ticking, fan-out, and ordering guarantees
//!
//! These tests run under paused time, so interval behavior is deterministic.

use std::sync::Arc;
use std::time::Duration;

use hostwatch::actors::{hub::HubHandle, messages::ServerMessage};

use super::helpers::*;

#[tokio::test(start_paused = true)]
async fn five_tick_run_skips_failed_tick() {
    // Sample 1 is the admission push; samples 2..=6 are ticks 1..=5.
    // Failing sample 4 = tick 3.
    let probe = Arc::new(ScriptedProbe::failing_on(vec![4]));
    let hub = HubHandle::spawn(probe.clone(), &hub_config(4));

    let mut subscription = hub.admit().await.unwrap();
    subscription.receiver.recv().await.unwrap();
    subscription.receiver.recv().await.unwrap();

    hub.start(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5500)).await;
    hub.stop().await.unwrap();

    let mut delivered = Vec::new();
    while let Ok(message) = subscription.receiver.try_recv() {
        if let ServerMessage::SystemStatus(status) = message {
            delivered.push(status.snapshot.cpu_percent);
        }
    }

    // Ticks 1, 2, 4, 5 delivered; tick 3 skipped without dropping anyone.
    assert_eq!(delivered, vec![2.0, 3.0, 5.0, 6.0]);
    assert_eq!(hub.subscriber_count().await.unwrap(), 1);
    assert_eq!(probe.calls(), 6);

    hub.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn subscribers_in_one_tick_see_the_same_sample() {
    let probe = Arc::new(ScriptedProbe::new());
    let hub = HubHandle::spawn(probe, &hub_config(4));

    let mut first = hub.admit().await.unwrap();
    let mut second = hub.admit().await.unwrap();

    for subscription in [&mut first, &mut second] {
        subscription.receiver.recv().await.unwrap();
        subscription.receiver.recv().await.unwrap();
    }

    hub.start(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let ServerMessage::SystemStatus(status_a) = first.receiver.recv().await.unwrap() else {
        panic!("expected system-status first");
    };
    let ServerMessage::SystemStatus(status_b) = second.receiver.recv().await.unwrap() else {
        panic!("expected system-status first");
    };

    // One probe sample per tick, fanned out to both.
    assert_eq!(status_a.snapshot.cpu_percent, status_b.snapshot.cpu_percent);
    assert_eq!(status_a.snapshot.cpu_percent, 2.0);

    // The vm-data projection carries the same sample's figures.
    let ServerMessage::VmData(vms) = first.receiver.recv().await.unwrap() else {
        panic!("expected vm-data after system-status");
    };
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0].id, "vm-main");
    assert_eq!(vms[0].cpu, status_a.snapshot.cpu_percent);
    assert_eq!(vms[0].ram, status_a.snapshot.memory.percent);

    hub.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn tick_samples_arrive_in_order() {
    let probe = Arc::new(ScriptedProbe::new());
    let hub = HubHandle::spawn(probe, &hub_config(4));

    let mut subscription = hub.admit().await.unwrap();
    subscription.receiver.recv().await.unwrap();
    subscription.receiver.recv().await.unwrap();

    hub.start(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let mut snapshots = Vec::new();
    while let Ok(message) = subscription.receiver.try_recv() {
        if let ServerMessage::SystemStatus(status) = message {
            snapshots.push(status.snapshot);
        }
    }

    assert_eq!(snapshots.len(), 3);
    for pair in snapshots.windows(2) {
        assert!(pair[0].cpu_percent < pair[1].cpu_percent);
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }

    hub.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hung_up_subscriber_is_dropped_without_disturbing_others() {
    let probe = Arc::new(ScriptedProbe::new());
    let hub = HubHandle::spawn(probe, &hub_config(4));

    let mut kept = hub.admit().await.unwrap();
    let hung_up = hub.admit().await.unwrap();

    kept.receiver.recv().await.unwrap();
    kept.receiver.recv().await.unwrap();

    // Simulate a client that went away without a clean disconnect.
    drop(hung_up.receiver);

    hub.start(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // The live subscriber still got its tick...
    let message = kept.receiver.recv().await.unwrap();
    assert!(matches!(message, ServerMessage::SystemStatus(_)));

    // ...and the dead one was removed during fan-out.
    assert_eq!(hub.subscriber_count().await.unwrap(), 1);

    hub.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn history_ring_records_broadcast_samples() {
    let probe = Arc::new(ScriptedProbe::new());
    let hub = HubHandle::spawn(probe, &hub_config(4));

    let mut subscription = hub.admit().await.unwrap();
    subscription.receiver.recv().await.unwrap();
    subscription.receiver.recv().await.unwrap();

    hub.start(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    // Admission push + 3 ticks, newest first.
    let recent = hub.recent(10).await;
    assert_eq!(recent.len(), 4);
    assert_eq!(recent[0].cpu_percent, 4.0);
    assert_eq!(recent[3].cpu_percent, 1.0);

    let limited = hub.recent(2).await;
    assert_eq!(limited.len(), 2);

    hub.shutdown().await;
}
