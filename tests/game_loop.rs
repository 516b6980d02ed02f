use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use engine2d_core::prelude::*;

fn counter() -> (Arc<AtomicUsize>, impl FnMut(f32) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move |_| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_catch_up_runs_three_fixed_steps() -> Result<()> {
    let clock = Arc::new(ManualClock::new());
    let game_loop = GameLoop::with_clock(clock.clone());
    let (fixed, on_fixed) = counter();
    let (variable, on_update) = counter();
    game_loop.set_fixed_update_callback(on_fixed);
    game_loop.set_update_callback(on_update);

    game_loop.do_frame()?;
    let before = fixed.load(Ordering::SeqCst);

    clock.advance_secs(0.05);
    game_loop.do_frame()?;
    assert_eq!(fixed.load(Ordering::SeqCst) - before, 3);
    assert_eq!(variable.load(Ordering::SeqCst), 2);
    assert!(game_loop.interpolation_alpha() < 1.0);
    Ok(())
}

#[test]
fn test_paused_time_reports_zero_delta() {
    let clock = Arc::new(ManualClock::new());
    let mut time = Time::with_clock(clock.clone());
    time.start();
    time.update();

    clock.advance_secs(0.1);
    time.update();
    let total = time.total();

    time.pause();
    clock.advance_secs(5.0);
    time.update();
    assert_eq!(time.delta(), 0.0);
    assert_eq!(time.total(), total);

    time.resume();
    clock.advance_secs(0.02);
    time.update();
    assert!((time.unscaled_delta() - 0.02).abs() < 1e-9);
}

#[test]
fn test_time_scale_and_clamp() {
    let clock = Arc::new(ManualClock::new());
    let mut time = Time::with_clock(clock.clone());
    time.start();
    time.update();
    time.set_time_scale(0.5);
    clock.advance_secs(0.04);
    time.update();
    assert!((time.delta_f64() - 0.02).abs() < 1e-9);

    time.set_time_scale(1.0);
    clock.advance_secs(3.0);
    time.update();
    assert_eq!(time.delta_f64(), time.max_delta());
}

#[test]
fn test_background_thread_runs_and_stops() -> Result<()> {
    let game_loop = GameLoop::new();
    let (frames, on_render) = counter();
    game_loop.set_render_callback(on_render);

    assert!(game_loop.start()?);
    let deadline = Instant::now() + Duration::from_secs(2);
    while frames.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(frames.load(Ordering::SeqCst) >= 3);

    assert!(game_loop.pause());
    thread::sleep(Duration::from_millis(50));
    let paused_at = frames.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(frames.load(Ordering::SeqCst), paused_at);

    assert!(game_loop.stop());
    assert_eq!(game_loop.state(), LoopState::Stopped);
    Ok(())
}
