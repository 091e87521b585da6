//! # Control Cycle Benchmark
//!
//! Times one full control cycle: an obstacle snapshot update, speed control
//! and steering control.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use veh_lib::{
    speed_ctrl::{self, SpeedCtrl},
    steer_ctrl::{self, SteerCtrl},
};

fn ctrl_cycle_benchmark(c: &mut Criterion) {
    // ---- Build the controllers ----

    let mut speed_ctrl = SpeedCtrl::new(speed_ctrl::Params {
        k_p: 0.6,
        k_i: 0.05,
        k_d: 0.0,
        target_ms: 1.5,
        windup_lower: Some(-100.0),
        windup_upper: Some(100.0),
        zero_cross_reset: true,
        sample_time_s: None,
        max_speed_ms: 3.0,
        wheel_circumference_m: 2.055,
        vehicle_half_width_px: 100.0,
        speed_mod_scalar: 0.1,
        max_throttle_v: 12.0,
        throttle_scalar: 0.5,
    })
    .unwrap();

    let mut steer_ctrl = SteerCtrl::new(steer_ctrl::Params {
        k_p: 1.2,
        k_i: 0.0,
        k_d: 0.05,
        target_rad: 0.0,
        windup_lower: Some(-100.0),
        windup_upper: Some(100.0),
        zero_cross_reset: true,
        sample_time_s: None,
    })
    .unwrap();

    // ---- Build a busy obstacle snapshot ----

    let num_obstacles = 20;
    let pos_px: Vec<f64> = (0..num_obstacles).map(|i| 40.0 * i as f64).collect();
    let half_width_px: Vec<f64> = (0..num_obstacles).map(|i| 10.0 + (i % 5) as f64 * 20.0).collect();
    let depth_m: Vec<f64> = (0..num_obstacles).map(|i| 3.0 + 0.6 * i as f64).collect();

    let mut obstacles = speed_ctrl.new_obstacle_field();

    c.bench_function("ctrl_cycle", |b| {
        b.iter(|| {
            obstacles
                .update(
                    pos_px.clone(),
                    half_width_px.clone(),
                    depth_m.clone(),
                    black_box(400.0),
                )
                .unwrap();

            let speed_out = speed_ctrl.feed(black_box(0.8), &obstacles).unwrap();
            let steer_out = steer_ctrl.feed(black_box(0.2), 0.0, 5.0).unwrap();

            (speed_out, steer_out)
        })
    });
}

criterion_group!(benches, ctrl_cycle_benchmark);
criterion_main!(benches);
