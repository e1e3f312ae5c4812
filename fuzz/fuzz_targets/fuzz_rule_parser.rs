#![no_main]

use std::net::Ipv4Addr;

use libfuzzer_sys::fuzz_target;

use domain::routes::error::RouteError;
use domain::routes::parser::{AddressResolver, acls_to_routes, compile};

/// Resolver that never performs I/O: even-length names resolve to two
/// fixed addresses, odd-length names are unresolvable.
struct FixedResolver;

impl AddressResolver for FixedResolver {
    fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, RouteError> {
        if name.len() % 2 == 0 {
            Ok(vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
            ])
        } else {
            Err(RouteError::Unresolvable(name.to_string()))
        }
    }
}

// Split fuzz data into rule lines and feed both lists of the compiler.
// The parser must never panic, and successful compiles must round-trip
// through acls_to_routes without error.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let lines: Vec<String> = text.lines().take(16).map(str::to_string).collect();
    let split = lines.len() / 2;
    let (mfa, public) = lines.split_at(split);

    let resolver = FixedResolver;
    if compile(mfa, public, &resolver).is_ok() {
        // Anything the compiler accepts must also render as routes.
        let _ = acls_to_routes(mfa, &resolver).expect("compiled mfa rules must render");
        let _ = acls_to_routes(public, &resolver).expect("compiled public rules must render");
    }
});
