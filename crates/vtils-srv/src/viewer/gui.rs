// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Windowed viewer on eframe/egui_plot

use std::time::Duration;

use anyhow::anyhow;
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints};
use tracing::{info, warn};

use super::frame::{finite_segments, plot_bounds, FrameSource, MAX_READ_RETRIES};
use super::ViewerArgs;

struct SrvApp {
    source: FrameSource,
    refresh: Duration,
    plot_title: Option<String>,
    x_label: Option<String>,
    y_label: Option<String>,
    x_limits: Option<(f64, f64)>,
    y_limits: Option<(f64, f64)>,
}

impl eframe::App for SrvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.source.should_exit() {
            Ok(false) => {}
            Ok(true) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
            Err(e) => {
                warn!("Lost the control region: {}", e);
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        }

        let frame = match self.source.read_frame(MAX_READ_RETRIES) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Frame read failed: {}", e);
                None
            }
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(title) = &self.plot_title {
                ui.vertical_centered(|ui| ui.heading(title));
            }

            let mut plot = Plot::new("srv_plot")
                .legend(Legend::default())
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false);
            if let Some(label) = &self.x_label {
                plot = plot.x_axis_label(label.clone());
            }
            if let Some(label) = &self.y_label {
                plot = plot.y_axis_label(label.clone());
            }

            plot.show(ui, |plot_ui| {
                let Some(frame) = &frame else {
                    return;
                };
                let (min, max) = plot_bounds(frame, self.x_limits, self.y_limits);
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));

                for series in &frame.series {
                    let color =
                        egui::Color32::from_rgb(series.color.r, series.color.g, series.color.b);
                    for segment in finite_segments(&series.x, &series.y) {
                        plot_ui.line(
                            Line::new(PlotPoints::from(segment))
                                .color(color)
                                .name(&series.name),
                        );
                    }
                }
            });
        });

        ctx.request_repaint_after(self.refresh);
    }
}

/// Open the window and block until it closes.
pub fn run_window(source: FrameSource, args: &ViewerArgs) -> anyhow::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(args.title.clone())
            .with_inner_size([args.width as f32, args.height as f32]),
        ..Default::default()
    };

    let app = SrvApp {
        source,
        refresh: Duration::from_millis(args.refresh_ms),
        plot_title: args.plot_title.clone(),
        x_label: args.x_label.clone(),
        y_label: args.y_label.clone(),
        x_limits: args.x_limits,
        y_limits: args.y_limits,
    };

    info!("Opening viewer window '{}'", args.title);
    eframe::run_native(
        &args.title,
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("Viewer window failed: {}", e))
}
