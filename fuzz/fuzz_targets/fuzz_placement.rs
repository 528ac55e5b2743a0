#![no_main]

use arbitrary::Arbitrary;
use featuretour_core::placement::{self, Placement};
use featuretour_core::{Point, Rect, Size};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    target: (u16, u16, u16, u16),
    popup: (u16, u16),
    viewport: (u16, u16),
    desired: u8,
    moved: (i16, i16),
}

fuzz_target!(|input: Input| {
    let (tx, ty, tw, th) = input.target;
    let target = Rect::new(f64::from(tx), f64::from(ty), f64::from(tw), f64::from(th));
    let popup = Size::new(f64::from(input.popup.0), f64::from(input.popup.1));
    let viewport = Rect::new(0.0, 0.0, f64::from(input.viewport.0), f64::from(input.viewport.1));
    let desired = Placement::ALL[usize::from(input.desired) % Placement::ALL.len()];

    let chosen = placement::choose(target, popup, viewport, desired);
    assert!(
        desired.fallbacks().contains(&chosen.placement),
        "chose {:?} outside the fallbacks of {desired:?}",
        chosen.placement
    );
    assert!(chosen.offset.x.is_finite() && chosen.offset.y.is_finite());

    // Detection is total and never invents a placement outside {p, flip(p)}.
    let popup_origin = Point::new(
        target.x + f64::from(input.moved.0),
        target.y + f64::from(input.moved.1),
    );
    let actual = placement::actual_placement(desired, target.origin(), popup_origin);
    assert!(actual == desired || actual == desired.flip());
});
