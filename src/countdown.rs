use crate::core::Action;
use crate::mixer::Shared;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

// One countdown step. Returns false once there is nothing left to count.
fn step(shared: &Shared) -> bool {
    let remaining = match shared.timer.borrow().as_ref() {
        Some(timer) => timer.remaining(Instant::now()),
        None => return false,
    };
    if remaining.is_zero() {
        shared.expire_timer();
        return false;
    }
    shared.dispatch(Action::UpdateTimer {
        remaining_ms: remaining.as_millis() as u64,
    });
    true
}

/// Drive the sleep timer from `requestAnimationFrame` until it expires or is
/// cancelled. Calling again while a loop is running is a no-op.
pub fn start_loop(shared: Rc<Shared>) {
    if shared.countdown_running.replace(true) {
        return;
    }
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if !step(&shared) {
            shared.countdown_running.set(false);
            return;
        }
        if let Some(w) = web::window() {
            if let Some(cb) = tick_clone.borrow().as_ref() {
                _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        }
    }) as Box<dyn FnMut()>));
    if let Some(w) = web::window() {
        if let Some(cb) = tick.borrow().as_ref() {
            _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }
}
