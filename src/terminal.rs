// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end for the camera screen
//!
//! Renders the preview with Unicode half-block characters (two vertical
//! pixels per cell) and keeps the bottom line for the status bar and toasts.

use crate::app::{CameraScreen, input};
use crate::backends::camera::types::CameraFrame;
use crate::constants::timing;
use crate::media::sample_pixel_rgb;

use crossterm::{
    event::{
        self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
        supports_keyboard_enhancement,
    },
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Run the screen in the terminal until the user quits
pub fn run(screen: &mut CameraScreen) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Volume keys are only reported with the enhancement protocol
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    debug!(enhanced, "Keyboard enhancement");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, screen);

    // Restore terminal
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    screen: &mut CameraScreen,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut frame_widget = FrameWidget::new();

    loop {
        screen.poll();
        if let Some(frame) = screen.session().latest_frame() {
            frame_widget.update_frame(frame);
        }
        let status_message = screen.status_line(Instant::now());

        // Draw
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_TICK)?
            && let Event::Key(key) = event::read()?
            && let Some(message) = input::map_key(&key)
            && screen.update(message) == ControlFlow::Break(())
        {
            break;
        }
    }

    // Report captures that finished while quitting
    screen.poll();
    info!(pending = screen.pending_captures(), "Terminal screen closed");
    Ok(())
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: Arc<CameraFrame>) {
        self.frame = Some(frame);
    }
}

/// Cells (columns, rows) of the largest frame-shaped box inside `area`
fn fit_frame(frame_width: u32, frame_height: u32, area: Rect) -> (u16, u16) {
    if frame_width == 0 || frame_height == 0 || area.width == 0 || area.height == 0 {
        return (0, 0);
    }
    let frame_aspect = frame_width as f64 / frame_height as f64;
    let term_width = area.width as f64;
    // Two pixels per cell vertically
    let term_height = (area.height as f64) * 2.0;

    if term_width / term_height > frame_aspect {
        let h = term_height;
        let w = h * frame_aspect;
        (w as u16, (h / 2.0) as u16)
    } else {
        let w = term_width;
        let h = w / frame_aspect;
        (w as u16, (h / 2.0) as u16)
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        let (display_width, display_height) = fit_frame(frame.width, frame.height, area);
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height as f64 * 2.0);

        // Upper pixel is the foreground of '▀', lower pixel the background
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (r, g, b) = sample_pixel_rgb(frame, src_x, src_y_top);
                let top_color = Color::Rgb(r, g, b);
                let (r, g, b) = sample_pixel_rgb(frame, src_x, src_y_bottom);
                let bottom_color = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
