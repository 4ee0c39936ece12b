#![no_main]

use floatpane_core::geometry::Viewport;
use floatpane_layout::persist::{PersistedLayout, RepairAction, rehydrate};
use floatpane_layout::LayoutTuning;
use libfuzzer_sys::fuzz_target;

/// Pixel magnitudes past this are outside any real viewport.
const MAX_PIXELS: f64 = 1.0e6;

fuzz_target!(|data: &[u8]| {
    // First byte picks the live viewport; the rest is the stored JSON.
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let Ok(json) = std::str::from_utf8(payload) else {
        return;
    };
    let Ok(layout) = PersistedLayout::from_json(json) else {
        return;
    };
    if layout.validate().is_err() || !in_range(&layout) {
        return;
    }

    let live = match selector % 4 {
        0 => Viewport::ZERO,
        1 => layout.window_size,
        2 => Viewport::new(640.0, 480.0),
        _ => Viewport::new(2560.0, 1440.0),
    };
    let tuning = LayoutTuning::default();
    let outcome = rehydrate(layout, live, &tuning);

    let violations = outcome.state.check_invariants();
    assert!(violations.is_empty(), "invariants broken: {violations:?}");

    // Structural repair is a fixpoint; only rectangles may still move.
    let again = rehydrate(
        PersistedLayout::capture(&outcome.state),
        outcome.state.window_size(),
        &tuning,
    );
    let structural: Vec<_> = again
        .actions
        .iter()
        .filter(|a| !matches!(a, RepairAction::ReflowRect { .. }))
        .collect();
    assert!(structural.is_empty(), "second pass repaired: {structural:?}");
});

fn in_range(layout: &PersistedLayout) -> bool {
    let ok = |v: f64| v.abs() <= MAX_PIXELS;
    ok(layout.window_size.width)
        && ok(layout.window_size.height)
        && layout.containers.values().all(|c| {
            ok(c.button_width)
                && c.rect
                    .is_none_or(|r| ok(r.top) && ok(r.left) && ok(r.right) && ok(r.bottom))
        })
}
