//! Registry selection and command pacing properties.

use std::time::{Duration, Instant};

use cubelink_client::{
    Advertisement, CommandQueue, CommandQueueConfig, ErrorKind, REGISTRY, match_device,
    resolve_identifier,
};
use cubelink_proto::{Command, GanVersion, Protocol};
use proptest::prelude::*;

#[test]
fn service_match_beats_name_prefix() {
    // A GAN-looking name with the MoYu service is a MoYu cube.
    let adv = Advertisement {
        name: Some("GAN356".into()),
        services: vec!["0783b03e-7735-b5a0-1760-a305d2795cb0".into()],
        ..Default::default()
    };
    assert_eq!(match_device(&adv).unwrap().protocol, Protocol::MoYu32);
}

#[test]
fn unique_name_prefix_is_accepted() {
    let adv = Advertisement { name: Some("WCU_MY32_4A7E".into()), ..Default::default() };
    assert_eq!(match_device(&adv).unwrap().protocol, Protocol::MoYu32);
}

#[test]
fn ambiguous_name_prefix_is_unknown() {
    // Every GAN generation shares the same prefixes.
    let adv = Advertisement { name: Some("GAN12ui".into()), ..Default::default() };
    assert_eq!(match_device(&adv).unwrap_err().kind(), ErrorKind::UnknownDriver);
}

#[test]
fn unknown_device_is_unknown() {
    let nameless = Advertisement::default();
    let foreign = Advertisement { name: Some("Giiker_i3s".into()), ..Default::default() };
    assert_eq!(match_device(&nameless).unwrap_err().kind(), ErrorKind::UnknownDriver);
    assert_eq!(match_device(&foreign).unwrap_err().kind(), ErrorKind::UnknownDriver);
}

#[test]
fn moyu_needs_an_identifier() {
    let adv = Advertisement { name: Some("WCU_MY32".into()), ..Default::default() };
    let err = resolve_identifier(Protocol::MoYu32, &adv, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IdentifierUnavailable);
}

#[test]
fn prop_every_service_selects_its_entry() {
    proptest!(|(index in 0usize..REGISTRY.len(), upper in any::<bool>())| {
        let entry = &REGISTRY[index];
        let service = if upper { entry.service.to_ascii_uppercase() } else { entry.service.to_owned() };
        let adv = Advertisement {
            name: Some("GAN".into()),
            services: vec!["0000180f-0000-1000-8000-00805f9b34fb".into(), service],
            ..Default::default()
        };

        // PROPERTY: the advertised service decides, whatever the name says
        prop_assert_eq!(match_device(&adv).unwrap().protocol, entry.protocol);
    });
}

#[test]
fn history_capable_entries_are_gen3_and_gen4() {
    for entry in &REGISTRY {
        assert_eq!(
            entry.protocol.supports_history(),
            matches!(entry.protocol, Protocol::Gan(GanVersion::Gen3 | GanVersion::Gen4)),
        );
    }
}

fn any_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::RequestFullState),
        Just(Command::RequestBattery),
        Just(Command::RequestDeviceInfo),
        (any::<u8>(), 1u8..20).prop_map(|(newest, count)| Command::RequestHistory { newest, count }),
    ]
}

#[test]
fn prop_writes_are_never_closer_than_interval() {
    proptest!(|(
        steps in prop::collection::vec((prop::option::of(any_command()), 0u64..80), 1..100),
        interval_ms in 1u64..100,
    )| {
        let interval = Duration::from_millis(interval_ms);
        let mut queue: CommandQueue<Instant> =
            CommandQueue::new(CommandQueueConfig { write_interval: interval, max_pending: 8 });
        let mut now = Instant::now();
        let mut last_write: Option<Instant> = None;

        for (command, advance_ms) in steps {
            if let Some(command) = command {
                queue.enqueue(command);
            }
            now += Duration::from_millis(advance_ms);
            if queue.poll(now).is_some() {
                // PROPERTY: writes are spaced by at least the interval
                if let Some(last) = last_write {
                    prop_assert!(now - last >= interval);
                }
                last_write = Some(now);
            }
            prop_assert!(queue.len() <= 8);
        }
    });
}
