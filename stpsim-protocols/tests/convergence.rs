//! Multi-device scenarios driven through the network tick loop

use parking_lot::Mutex;
use std::sync::Arc;

use stpsim_core::{
    Device, Event, MacAddr, ManualTime, Network, NetworkConfig, PortRole, PortState,
    SpanningTreeParticipant, TestOutcome,
};
use stpsim_protocols::{topology, Host, Hub, StpSwitch, Switch};

fn bridge_mac(last: u8) -> MacAddr {
    MacAddr([0x02, 0, 0, 0, 0, last])
}

fn stp_switch(name: &str, last: u8, ports: usize) -> StpSwitch {
    let mut switch = StpSwitch::with_ports(name, ports).unwrap();
    switch.set_bridge_mac(bridge_mac(last)).unwrap();
    switch
}

fn manual_network() -> (Network, ManualTime) {
    let time = ManualTime::new();
    let mut net = Network::manual(NetworkConfig::default(), &time).unwrap();
    net.start().unwrap();
    (net, time)
}

/// Tick at t, t+step, ... up to and including `until`
fn run_until(net: &mut Network, time: &ManualTime, until: f64, step: f64) {
    loop {
        net.tick();
        if time.reading() + step > until + 1e-9 {
            break;
        }
        time.advance(step);
    }
}

fn capture(net: &mut Network) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    net.subscribe(move |event| sink.lock().push(event.clone()));
    events
}

fn stp<'a>(net: &'a Network, name: &str) -> &'a dyn SpanningTreeParticipant {
    net.device(name).unwrap().as_spanning_tree().unwrap()
}

/// s1 (lowest id) at the top; s2 and s3 below it and linked to each other
fn triangle(net: &mut Network) {
    net.add(stp_switch("s1", 1, 2)).unwrap();
    net.add(stp_switch("s2", 2, 3)).unwrap();
    net.add(stp_switch("s3", 3, 3)).unwrap();
    net.add_link(("s1", "eth0"), ("s2", "eth0")).unwrap();
    net.add_link(("s1", "eth1"), ("s3", "eth0")).unwrap();
    net.add_link(("s2", "eth1"), ("s3", "eth1")).unwrap();
}

fn blocking_ports(net: &Network) -> Vec<String> {
    let mut blocked = Vec::new();
    for device in net.devices() {
        let Some(stp) = device.as_spanning_tree() else {
            continue;
        };
        for iface in device.core().interface_names() {
            if stp.port_role(&iface) == Some(PortRole::Blocking) {
                blocked.push(format!("{}.{}", device.name(), iface));
            }
        }
    }
    blocked
}

/// Every non-root switch has one root port and no link is blocked on both ends
fn assert_tree_shape(net: &Network) {
    for device in net.devices() {
        let Some(stp) = device.as_spanning_tree() else {
            continue;
        };
        let names = device.core().interface_names();
        let roots = names
            .iter()
            .filter(|iface| stp.port_role(iface) == Some(PortRole::Root))
            .count();
        let expected = if stp.is_root() { 0 } else { 1 };
        assert_eq!(roots, expected, "root ports on {}", device.name());
    }

    let role = |device: &str, iface: &str| {
        net.device(device)
            .ok()
            .and_then(|d| d.as_spanning_tree())
            .and_then(|stp| stp.port_role(iface))
    };
    for (a, b) in net.links() {
        let both_blocked = role(&a.device, &a.interface) == Some(PortRole::Blocking)
            && role(&b.device, &b.interface) == Some(PortRole::Blocking);
        assert!(!both_blocked, "{} <-> {} blocked on both ends", a, b);
    }
}

#[test]
fn test_triangle_converges_with_one_blocked_port() {
    let (mut net, time) = manual_network();
    triangle(&mut net);
    run_until(&mut net, &time, 60.0, 1.0);

    assert!(stp(&net, "s1").is_root());
    assert!(!stp(&net, "s2").is_root());
    assert!(!stp(&net, "s3").is_root());
    assert_eq!(stp(&net, "s2").root_port(), Some("eth0"));
    assert_eq!(stp(&net, "s3").root_port(), Some("eth0"));
    assert_eq!(stp(&net, "s1").port_role("eth0"), Some(PortRole::Designated));
    assert_eq!(stp(&net, "s1").port_role("eth1"), Some(PortRole::Designated));
    assert_eq!(stp(&net, "s2").port_role("eth1"), Some(PortRole::Designated));

    assert_eq!(blocking_ports(&net), vec!["s3.eth1".to_string()]);
    assert_eq!(stp(&net, "s3").port_state("eth1"), Some(PortState::Blocking));
    assert_tree_shape(&net);
    for (device, iface) in [("s1", "eth0"), ("s1", "eth1"), ("s2", "eth0"), ("s2", "eth1"), ("s3", "eth0")] {
        assert_eq!(
            stp(&net, device).port_state(iface),
            Some(PortState::Forwarding),
            "{}.{}",
            device,
            iface
        );
    }
}

#[test]
fn test_triangle_stays_converged() {
    let (mut net, time) = manual_network();
    triangle(&mut net);
    run_until(&mut net, &time, 60.0, 1.0);
    let before = blocking_ports(&net);

    run_until(&mut net, &time, 200.0, 1.0);
    assert_eq!(blocking_ports(&net), before);
    assert!(stp(&net, "s1").is_root());
    assert_tree_shape(&net);
}

#[test]
fn test_priority_moves_root() {
    let (mut net, time) = manual_network();
    triangle(&mut net);
    net.device_mut("s3")
        .unwrap()
        .as_spanning_tree_mut()
        .unwrap()
        .set_bridge_priority(4096);
    run_until(&mut net, &time, 60.0, 1.0);

    assert!(stp(&net, "s3").is_root());
    assert!(!stp(&net, "s1").is_root());
    assert_eq!(blocking_ports(&net).len(), 1);
    assert_tree_shape(&net);
}

#[test]
fn test_self_loop_blocks_second_port() {
    let (mut net, time) = manual_network();
    net.add(stp_switch("s1", 1, 2)).unwrap();
    net.add_link(("s1", "eth0"), ("s1", "eth1")).unwrap();
    run_until(&mut net, &time, 60.0, 1.0);

    let s1 = stp(&net, "s1");
    assert!(s1.is_root());
    assert_eq!(s1.port_role("eth0"), Some(PortRole::Designated));
    assert_eq!(s1.port_role("eth1"), Some(PortRole::Blocking));
    assert_eq!(s1.port_state("eth0"), Some(PortState::Forwarding));
    assert_eq!(s1.port_state("eth1"), Some(PortState::Blocking));

    run_until(&mut net, &time, 200.0, 1.0);
    let s1 = stp(&net, "s1");
    assert_eq!(s1.port_role("eth1"), Some(PortRole::Blocking));
    assert_eq!(s1.port_state("eth1"), Some(PortState::Blocking));
    assert_eq!(s1.port_state("eth0"), Some(PortState::Forwarding));
}

#[test]
fn test_pair_state_timing() {
    let (mut net, time) = manual_network();
    net.add(stp_switch("s1", 1, 1)).unwrap();
    net.add(stp_switch("s2", 2, 1)).unwrap();
    net.add_link(("s1", "eth0"), ("s2", "eth0")).unwrap();

    run_until(&mut net, &time, 3.0, 1.0);
    assert_eq!(stp(&net, "s2").port_role("eth0"), Some(PortRole::Root));
    for name in ["s1", "s2"] {
        assert_eq!(stp(&net, name).port_state("eth0"), Some(PortState::Listening));
    }

    run_until(&mut net, &time, 20.0, 1.0);
    for name in ["s1", "s2"] {
        assert_eq!(stp(&net, name).port_state("eth0"), Some(PortState::Learning));
    }

    run_until(&mut net, &time, 40.0, 1.0);
    for name in ["s1", "s2"] {
        assert_eq!(stp(&net, name).port_state("eth0"), Some(PortState::Forwarding));
    }
}

#[test]
fn test_root_failure_ages_out() {
    let (mut net, time) = manual_network();
    net.add(stp_switch("s1", 1, 1)).unwrap();
    net.add(stp_switch("s2", 2, 1)).unwrap();
    net.add_link(("s1", "eth0"), ("s2", "eth0")).unwrap();
    run_until(&mut net, &time, 10.0, 1.0);
    assert!(!stp(&net, "s2").is_root());

    net.remove_device("s1").unwrap();
    run_until(&mut net, &time, 40.0, 1.0);
    assert!(stp(&net, "s2").is_root());
}

#[test]
fn test_learning_switch_delivery() {
    let (mut net, time) = manual_network();
    net.add(Host::with_interface("h1").unwrap()).unwrap();
    net.add(Switch::with_ports("sw", 3).unwrap()).unwrap();
    net.add(Host::with_interface("h2").unwrap()).unwrap();
    net.add_link(("h1", "eth0"), ("sw", "eth0")).unwrap();
    net.add_link(("h2", "eth0"), ("sw", "eth1")).unwrap();
    let events = capture(&mut net);

    let h1_mac = net.downcast::<Host>("h1").unwrap().mac().unwrap();
    let h2_mac = net.downcast::<Host>("h2").unwrap().mac().unwrap();
    net.invoke::<Host, _, _>("h1", |host, ctx| host.start_test(ctx, h2_mac))
        .unwrap()
        .unwrap();
    run_until(&mut net, &time, 3.0, 0.5);

    let h1 = net.downcast::<Host>("h1").unwrap();
    assert_eq!(h1.last_outcome(), Some((h2_mac, TestOutcome::Success)));

    let sw = net.device("sw").unwrap().as_learning_bridge().unwrap();
    assert_eq!(sw.lookup(&h1_mac), Some("eth0"));
    assert_eq!(sw.lookup(&h2_mac), Some("eth1"));

    // request flooded (eth2 is unconnected), reply forwarded to eth0 only
    let sent_by_switch: Vec<String> = events
        .lock()
        .iter()
        .filter_map(|e| match e {
            Event::PacketSent(obs) if obs.device == "sw" => Some(obs.interface.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(sent_by_switch, vec!["eth1", "eth0"]);

    let replies = events
        .lock()
        .iter()
        .filter(|e| matches!(e, Event::PacketSent(obs) if obs.device == "h2"))
        .count();
    assert_eq!(replies, 1);
}

#[test]
fn test_host_test_times_out() {
    let (mut net, time) = manual_network();
    net.add(Host::with_interface("h1").unwrap()).unwrap();
    net.add(Hub::with_ports("hub", 2).unwrap()).unwrap();
    net.add_link(("h1", "eth0"), ("hub", "eth0")).unwrap();
    let events = capture(&mut net);

    let nobody = bridge_mac(0x99);
    net.invoke::<Host, _, _>("h1", |host, ctx| host.start_test(ctx, nobody))
        .unwrap()
        .unwrap();

    run_until(&mut net, &time, 4.5, 0.5);
    assert!(net.downcast::<Host>("h1").unwrap().pending_test().is_some());

    run_until(&mut net, &time, 5.0, 0.5);
    let h1 = net.downcast::<Host>("h1").unwrap();
    assert_eq!(h1.last_outcome(), Some((nobody, TestOutcome::Timeout)));
    assert!(events.lock().iter().any(|e| matches!(
        e,
        Event::LinkTest { outcome: TestOutcome::Timeout, .. }
    )));
}

#[test]
fn test_hosts_across_spanning_tree() {
    let (mut net, time) = manual_network();
    triangle(&mut net);
    net.add(Host::with_interface("h1").unwrap()).unwrap();
    net.add(Host::with_interface("h2").unwrap()).unwrap();
    net.add_link(("h1", "eth0"), ("s2", "eth2")).unwrap();
    net.add_link(("h2", "eth0"), ("s3", "eth2")).unwrap();
    run_until(&mut net, &time, 40.0, 1.0);

    let h2_mac = net.downcast::<Host>("h2").unwrap().mac().unwrap();
    net.invoke::<Host, _, _>("h1", |host, ctx| host.start_test(ctx, h2_mac))
        .unwrap()
        .unwrap();
    run_until(&mut net, &time, 44.0, 1.0);

    let h1 = net.downcast::<Host>("h1").unwrap();
    assert_eq!(h1.last_outcome(), Some((h2_mac, TestOutcome::Success)));

    // the blocked port neither learned nor passed the frames
    let s3 = net.device("s3").unwrap().as_learning_bridge().unwrap();
    assert_eq!(s3.lookup(&h2_mac), Some("eth2"));
    assert!(s3.entries().iter().all(|(_, port)| port != "eth1"));
}

#[test]
fn test_saved_topology_converges_the_same() {
    let (mut net, time) = manual_network();
    triangle(&mut net);
    let json = topology::save(&net).unwrap();

    let (mut copy, copy_time) = manual_network();
    topology::load(&mut copy, &json).unwrap();
    assert_eq!(copy.links().len(), 3);

    run_until(&mut net, &time, 60.0, 1.0);
    run_until(&mut copy, &copy_time, 60.0, 1.0);
    assert_eq!(blocking_ports(&copy), blocking_ports(&net));
    assert_eq!(topology::save(&copy).unwrap(), topology::save(&net).unwrap());
}

#[test]
fn test_fifo_discipline_converges() {
    let time = ManualTime::new();
    let config = NetworkConfig {
        queue_discipline: stpsim_core::QueueDiscipline::Fifo,
        ..NetworkConfig::default()
    };
    let mut net = Network::manual(config, &time).unwrap();
    net.start().unwrap();
    triangle(&mut net);
    run_until(&mut net, &time, 60.0, 1.0);
    assert_eq!(blocking_ports(&net), vec!["s3.eth1".to_string()]);
}
