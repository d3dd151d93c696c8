#![no_main]

use estado::event::read_events;
use estado::replay::Replayer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must either parse and replay, or fail with an error
    let mut replayer = Replayer::default();
    for event in read_events(data) {
        let Ok(event) = event else { return };
        if replayer.apply(&event).is_err() {
            return;
        }
    }
    let _ = replayer.finish(None);
});
