#![no_main]

use featuretour::Tour;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(tour) = Tour::from_json(text) else {
        return;
    };

    // Validation never panics, whatever the definition holds.
    let valid = tour.validate().is_ok();

    // A parsed tour serializes and reads back with the same shape. Payloads
    // are left out: float text need not survive a round trip bit for bit.
    let json = tour.to_json().expect("parsed tour must serialize");
    let again = Tour::from_json(&json).expect("serialized tour must parse");
    assert_eq!(again.name(), tour.name());
    assert_eq!(again.steps().len(), tour.steps().len());
    for (a, b) in again.steps().iter().zip(tour.steps()) {
        assert_eq!(a.element_id(), b.element_id());
        assert_eq!(a.id(), b.id());
        assert_eq!(a.next_button(), b.next_button());
    }
    assert_eq!(again.validate().is_ok(), valid);
});
