//! The async runtime driving a simulated cube.
//!
//! Same session as the synchronous simulation, but executed by
//! [`cubelink_app::Runtime`] on a paused tokio clock, observed through the
//! per-kind event streams a host would use.

use std::time::Duration;

use cubelink_app::{Runtime, RuntimeConfig, SystemEnv};
use cubelink_client::{HostCommand, HostEvent, HostEventKind, LinkState};
use cubelink_harness::{SimCube, SimLink};
use cubelink_proto::{Face, GanVersion, Move, Power, Protocol, parse_sequence};
use tokio::sync::mpsc;

async fn next_state(rx: &mut mpsc::Receiver<HostEvent>) -> LinkState {
    match rx.recv().await {
        Some(HostEvent::LinkState(state)) => state,
        other => panic!("expected a link state, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn runtime_follows_the_cube_across_a_dropout() {
    let link = SimLink::new(SimCube::new(Protocol::Gan(GanVersion::Gen3)), 9);
    let cube = link.clone();
    let (runtime, mut handle) = Runtime::new(link, SystemEnv::new(), RuntimeConfig::default());
    let mut states = handle.events.take(HostEventKind::LinkState).unwrap();
    let mut moves = handle.events.take(HostEventKind::Move).unwrap();
    let mut resets = handle.events.take(HostEventKind::FullStateReset).unwrap();
    let task = tokio::spawn(runtime.run());

    handle.commands.send(HostCommand::Connect(None)).await.unwrap();
    assert_eq!(next_state(&mut states).await, LinkState::Connecting);
    assert_eq!(next_state(&mut states).await, LinkState::Connected);
    // Let the baseline snapshot land first.
    tokio::time::sleep(Duration::from_millis(100)).await;

    cube.turn(Move::new(Face::R, Power::Clockwise));
    let Some(HostEvent::Move { mv, facelets, .. }) = moves.recv().await else {
        panic!("expected a move");
    };
    assert_eq!(mv, Move::new(Face::R, Power::Clockwise));
    assert_eq!(facelets.to_string(), "UUFUUFUUFRRRRRRRRRFFDFFDFFDDDBDDBDDBLLLLLLLLLUBBUBBUBB");

    cube.sever();
    assert_eq!(next_state(&mut states).await, LinkState::Reconnecting);
    for mv in parse_sequence("U2 F'").unwrap() {
        cube.turn_offline(mv);
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
    cube.restore();
    assert_eq!(next_state(&mut states).await, LinkState::Connected);

    // Attach resets to solved, then the snapshot brings back the real cube.
    let expected = cube.cube_facelets();
    loop {
        let Some(HostEvent::FullStateReset { facelets }) = resets.recv().await else {
            panic!("reset stream closed");
        };
        if facelets == expected {
            break;
        }
    }

    drop(handle.commands);
    let runtime = task.await.unwrap();
    assert_eq!(runtime.session().display_facelets(), expected);
    assert!(!cube.is_subscribed());
}

#[tokio::test(start_paused = true)]
async fn battery_request_round_trips() {
    let link = SimLink::new(SimCube::new(Protocol::MoYu32), 4);
    link.with_cube(|cube| cube.set_battery(64));
    let (runtime, mut handle) = Runtime::new(link, SystemEnv::new(), RuntimeConfig::default());
    let mut states = handle.events.take(HostEventKind::LinkState).unwrap();
    let mut battery = handle.events.take(HostEventKind::Battery).unwrap();
    let task = tokio::spawn(runtime.run());

    handle.commands.send(HostCommand::Connect(None)).await.unwrap();
    assert_eq!(next_state(&mut states).await, LinkState::Connecting);
    assert_eq!(next_state(&mut states).await, LinkState::Connected);

    handle.commands.send(HostCommand::RequestBattery).await.unwrap();
    assert_eq!(battery.recv().await, Some(HostEvent::Battery { level: 64 }));

    drop(handle.commands);
    task.await.unwrap();
}
