//! Decode fuzz target: feed arbitrary bytes to the Ethernet stack decoder.
//! The decoder must not panic; it returns Ok(()) or a data error.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let mut frame = wiregram::net::ether::EthernetII::default();
    let _ = wiregram::decode(data, &mut frame);

    let mut messages: Vec<wiregram::net::bgp::Message> = Vec::new();
    let _ = wiregram::decode(data, &mut messages);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
