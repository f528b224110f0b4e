// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Two live plots fed from a producer thread.
//!
//! ```text
//! cargo build -p vtils-srv --bins && cargo run -p vtils-srv --example sine_demo
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use vtils_config::load_config_or_default;
use vtils_observability::{init_logging_default, parse_debug_flags};
use vtils_srv::{CircularSeriesBuffer, SrvOptions};

fn main() -> Result<()> {
    let _logging = init_logging_default(&parse_debug_flags())?;
    let base = SrvOptions::from_config(&load_config_or_default(None, None)?)?;

    let size = 1000;
    let mut first = CircularSeriesBuffer::new(
        base.clone()
            .with_capacity(size)
            .with_window_title("SRV Example-1")
            .with_plot_title("Demo plot-1")
            .with_x_label("x-label")
            .with_y_label("y-label")
            .with_x_limits(-1.0, 100.0)
            .with_y_limits(-2.0, 3.0),
    )?;
    let mut second = CircularSeriesBuffer::new(
        base.with_capacity(size)
            .with_window_title("SRV Example-2")
            .with_plot_title("Demo plot-2"),
    )?;

    // Static content first
    let xs: Vec<f64> = (0..size).map(|i| i as f64 / 100.0).collect();
    let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
    let neg: Vec<f64> = ys.iter().map(|y| -y).collect();
    second.update("data", &xs, &ys)?;
    first.update("data", &xs, &neg)?;
    thread::sleep(Duration::from_secs(3));

    let running = Arc::new(AtomicBool::new(true));
    let producer_running = Arc::clone(&running);
    let producer = thread::spawn(move || -> vtils_srv::SrvResult<()> {
        let mut t = 0.0f64;
        while producer_running.load(Ordering::Relaxed) {
            let s = (2.0 * std::f64::consts::PI * t).sin();
            t += 0.01;
            first.append(t, s)?;
            second.append(t, -s)?;
            thread::sleep(Duration::from_millis(1));
        }
        first.close()?;
        second.close()
    });

    println!("Press Enter to quit.");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    running.store(false, Ordering::Relaxed);

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    println!("All viewers closed.");
    Ok(())
}
