use altime_core::engine::Engine;
use altime_core::error::ImeError;
use altime_core::ime::{ImeController, NoopKeyboard};
use altime_core::watcher::EventLoop;
use altime_core::{
    KeyDirection, KeyEvent, KeyId, RawKeyEvent, Settings, SettingsStore, WatcherOptions,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

struct NoopIme;

impl ImeController for NoopIme {
    fn set_enabled(&self, _enabled: bool) -> Result<(), ImeError> {
        Ok(())
    }
}

fn event_loop() -> EventLoop {
    let store = Arc::new(SettingsStore::new(running()));
    EventLoop::new(
        store,
        Arc::new(NoopIme),
        Arc::new(NoopKeyboard),
        WatcherOptions::default(),
    )
}

fn running() -> Settings {
    Settings {
        is_running: true,
        ..Settings::default()
    }
}

fn bench_engine_trigger_press(c: &mut Criterion) {
    let settings = running();
    let mut engine = Engine::new();
    let down = KeyEvent::pressed(KeyId::RightAlt);
    let up = KeyEvent::released(KeyId::RightAlt);
    c.bench_function("engine/trigger_press_release", |b| {
        b.iter(|| {
            black_box(engine.process(&down, &settings));
            black_box(engine.process(&up, &settings));
        });
    });
}

fn bench_loop_unrecognized(c: &mut Criterion) {
    let mut el = event_loop();
    let down = RawKeyEvent::new(0x41, KeyDirection::Pressed); // A
    let up = RawKeyEvent::new(0x41, KeyDirection::Released);
    c.bench_function("loop/unrecognized_key", |b| {
        b.iter(|| {
            black_box(el.handle(&down));
            black_box(el.handle(&up));
        });
    });
}

fn bench_loop_trigger(c: &mut Criterion) {
    let mut el = event_loop();
    let down = RawKeyEvent::new(0xA5, KeyDirection::Pressed); // RightAlt
    let up = RawKeyEvent::new(0xA5, KeyDirection::Released);
    c.bench_function("loop/trigger_key_with_snapshot", |b| {
        b.iter(|| {
            black_box(el.handle(&down));
            black_box(el.handle(&up));
        });
    });
}

criterion_group!(
    benches,
    bench_engine_trigger_press,
    bench_loop_unrecognized,
    bench_loop_trigger
);
criterion_main!(benches);
