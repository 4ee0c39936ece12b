#![no_main]

use arbitrary::Arbitrary;
use floatpane_core::geometry::{EdgeRect, PointerPosition, Viewport};
use floatpane_layout::{ContainerState, LayoutTuning, Nonce, ResizeToContent, Window, WindowManagerState};
use libfuzzer_sys::fuzz_target;

const WINDOWS: [&str; 5] = ["w0", "w1", "w2", "w3", "w4"];
const CONTAINERS: [&str; 4] = ["c0", "c1", "c2", "c3"];

#[derive(Debug, Arbitrary)]
enum Op {
    Register { window: u8, container: Option<u8>, activate: bool },
    Unregister { window: u8, stale: bool },
    RemoveFromContainer { window: u8 },
    SetDimension { container: u8, rect: [u16; 4], neighbours: bool },
    ResizeByUser { container: u8, rect: [u16; 4] },
    SetState { container: u8, state: u8 },
    Activate { container: u8, window: u8 },
    Focus { container: u8 },
    WindowSize { width: u16, height: u16 },
    Lock { container: u8, locked: bool },
    AutoResize { container: u8, mode: u8 },
    Drag { window: u8, x: u16, y: u16, rect: [u16; 4], ignored: Option<u8> },
    Move { window: u8, container: u8, index: u8 },
    ClearDragging,
}

fn window(i: u8) -> &'static str {
    WINDOWS[i as usize % WINDOWS.len()]
}

fn container(i: u8) -> &'static str {
    CONTAINERS[i as usize % CONTAINERS.len()]
}

fn rect(edges: [u16; 4]) -> EdgeRect {
    let [top, left, right, bottom] = edges.map(|e| f64::from(e % 2048));
    EdgeRect::new(top, left, right, bottom)
}

fuzz_target!(|ops: Vec<Op>| {
    let tuning = LayoutTuning::default();
    let mut state = WindowManagerState::new(Viewport::new(1280.0, 800.0));

    for op in ops.into_iter().take(256) {
        match op {
            Op::Register { window: w, container: c, activate } => {
                state.register_window(Window::new(window(w), window(w)), c.map(container), activate);
            }
            Op::Unregister { window: w, stale } => {
                let nonce = stale.then(|| Nonce::from_raw(u64::MAX));
                state.unregister_window(window(w), nonce);
            }
            Op::RemoveFromContainer { window: w } => {
                state.remove_window_from_container(window(w));
            }
            Op::SetDimension { container: c, rect: r, neighbours } => {
                state.set_container_dimension(container(c), Some(rect(r)), neighbours, &tuning);
            }
            Op::ResizeByUser { container: c, rect: r } => {
                state.resize_container_by_user(container(c), rect(r), &tuning);
            }
            Op::SetState { container: c, state: s } => {
                let next = match s % 4 {
                    0 => ContainerState::Normal,
                    1 => ContainerState::Minimized,
                    2 => ContainerState::Maximized,
                    _ => ContainerState::Popup,
                };
                state.set_container_state(container(c), next);
            }
            Op::Activate { container: c, window: w } => {
                state.set_active_window_in_container(container(c), window(w));
            }
            Op::Focus { container: c } => {
                state.set_active_container(container(c));
            }
            Op::WindowSize { width, height } => {
                let viewport = Viewport::new(f64::from(width % 4096), f64::from(height % 4096));
                state.set_window_size(viewport, &tuning);
            }
            Op::Lock { container: c, locked } => {
                state.set_container_is_locked(container(c), locked);
            }
            Op::AutoResize { container: c, mode } => {
                let mode = match mode % 4 {
                    0 => ResizeToContent::None,
                    1 => ResizeToContent::Both,
                    2 => ResizeToContent::Width,
                    _ => ResizeToContent::Height,
                };
                state.set_should_resize_to_content(container(c), mode);
            }
            Op::Drag { window: w, x, y, rect: r, ignored } => {
                let pointer = PointerPosition::new(f64::from(x % 4096), f64::from(y % 4096));
                state.update_dragging(window(w), pointer, rect(r), ignored.map(container), &tuning);
            }
            Op::Move { window: w, container: c, index } => {
                state.move_window(window(w), container(c), usize::from(index % 8));
            }
            Op::ClearDragging => {
                state.clear_dragging_window();
            }
        }

        let violations = state.check_invariants();
        assert!(violations.is_empty(), "invariants broken: {violations:?}");
    }
});
