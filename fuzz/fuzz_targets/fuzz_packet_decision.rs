#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use libfuzzer_sys::fuzz_target;

use domain::common::entity::UserHash;
use domain::firewall::clock::Clock;
use domain::firewall::engine::{Direction, FirewallEngine};
use domain::routes::entity::Rule;
use ebpf_common::routes::{
    POLICY_PUBLIC, POLICY_RANGE, POLICY_SINGLE, PolicyEntry, RouteKey,
};

struct FixedClock(AtomicU64);

impl Clock for FixedClock {
    fn now_ns(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// Build a small rule set from the first bytes, then throw the rest of the
// input at the decision engine as raw packets in both directions. The
// engine must never panic, whatever the bytes.
fuzz_target!(|data: &[u8]| {
    if data.len() < 24 {
        return;
    }

    let engine = FirewallEngine::new(Arc::new(FixedClock(AtomicU64::new(1))));
    let user = UserHash::from_username("fuzz");

    let mut rules = Vec::new();
    for chunk in data[..16].chunks_exact(8) {
        let key = RouteKey {
            prefix_len: u32::from(chunk[0]) % 33,
            addr: [chunk[1], chunk[2], chunk[3], chunk[4]],
        };
        let base = if chunk[5] & 1 != 0 { POLICY_PUBLIC } else { 0 };
        let operator = if chunk[5] & 2 != 0 {
            POLICY_RANGE
        } else {
            POLICY_SINGLE
        };
        let lower = u16::from(chunk[6]);
        rules.push(Rule {
            keys: vec![key],
            policies: vec![PolicyEntry {
                policy_type: base | operator,
                proto: u16::from(chunk[5] >> 2) % 18,
                lower_port: lower,
                upper_port: lower.saturating_add(u16::from(chunk[7])),
            }],
        });
    }
    engine
        .tables()
        .set_user_policies(user, &rules)
        .expect("small rule sets always fit");
    engine
        .devices()
        .insert(std::net::Ipv4Addr::new(192, 168, 1, 2), user);

    let packet = &data[16..];
    let _ = engine.evaluate(Direction::Egress, packet);
    let _ = engine.evaluate(Direction::Ingress, packet);
});
