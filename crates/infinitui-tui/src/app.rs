//! Application core — event loop, key handling, dashboard rendering.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use infinitui_core::{
    BlowerStatus, FanMode, HeatpumpStatus, OperatingMode, Panel, PanelCommand, StreamDiagnostics,
    StreamState, TstatStatus, ZoneStatus,
};

use crate::action::Action;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;

/// Most systems expose at most four zones; keys 1-4 select them.
const MAX_ZONES: u8 = 4;

/// Top-level application state and event loop.
pub struct App {
    panel: Panel,
    running: bool,
    /// 1-based zone targeted by setpoint/fan/hold keys.
    selected_zone: u8,
    tstat: Option<Arc<TstatStatus>>,
    blower: Option<Arc<BlowerStatus>>,
    heatpump: Option<Arc<HeatpumpStatus>>,
    diagnostics: StreamDiagnostics,
    stream_status: StreamState,
    /// When the panel last heard from the stream (sampled on Tick).
    last_update: Option<DateTime<Utc>>,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(panel: Panel) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            panel,
            running: true,
            selected_zone: 1,
            tstat: None,
            blower: None,
            heatpump: None,
            diagnostics: StreamDiagnostics::default(),
            stream_status: StreamState::Disconnected,
            last_update: None,
            help_visible: false,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let bridge_cancel = CancellationToken::new();
        let bridge = tokio::spawn(spawn_data_bridge(
            self.panel.clone(),
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key) {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action);

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        bridge_cancel.cancel();
        let _ = bridge.await;

        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action.
    fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if self.help_visible {
            // In help mode, Esc or ? closes help
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            };
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            (_, KeyCode::Char('q')) => Some(Action::Quit),

            (_, KeyCode::Char('?')) => Some(Action::ToggleHelp),

            (_, KeyCode::Char(c @ '1'..='4')) => {
                Some(Action::SelectZone(c as u8 - b'0'))
            }

            (_, KeyCode::Char('+') | KeyCode::Char('=')) => Some(Action::IncCool(1)),
            (_, KeyCode::Char('-')) => Some(Action::IncCool(-1)),
            (_, KeyCode::Char(']')) => Some(Action::IncHeat(1)),
            (_, KeyCode::Char('[')) => Some(Action::IncHeat(-1)),

            (_, KeyCode::Char('f')) => Some(Action::CycleFan),
            (_, KeyCode::Char('m')) => Some(Action::CycleMode),
            (_, KeyCode::Char('h')) => Some(Action::ToggleHold),
            (_, KeyCode::Char('r')) => Some(Action::Refresh),

            _ => None,
        }
    }

    /// Process a single action — update app state or submit a command.
    fn process_action(&mut self, action: &Action) {
        match action {
            Action::Quit => self.running = false,

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::SelectZone(zone) => {
                if (1..=MAX_ZONES).contains(zone) {
                    self.selected_zone = *zone;
                }
            }

            Action::IncCool(delta) => self.submit(PanelCommand::IncCoolSetpoint {
                zone: self.selected_zone,
                delta: *delta,
            }),
            Action::IncHeat(delta) => self.submit(PanelCommand::IncHeatSetpoint {
                zone: self.selected_zone,
                delta: *delta,
            }),

            Action::CycleFan => {
                let speed = self
                    .selected_zone_status()
                    .and_then(|z| FanMode::from_wire(&z.fan_mode))
                    .map_or(FanMode::Auto, FanMode::next);
                self.submit(PanelCommand::SetFanSpeed {
                    zone: self.selected_zone,
                    speed,
                });
            }

            Action::CycleMode => {
                let mode = self
                    .tstat
                    .as_ref()
                    .map_or(OperatingMode::Unknown, |t| {
                        OperatingMode::from_wire(&t.mode)
                    })
                    .next_settable();
                self.submit(PanelCommand::SetMode { mode });
            }

            Action::ToggleHold => {
                let hold = self
                    .selected_zone_status()
                    .and_then(|z| z.hold)
                    .unwrap_or(false);
                self.submit(PanelCommand::SetHold {
                    zone: self.selected_zone,
                    hold: !hold,
                });
            }

            Action::Refresh => self.submit(PanelCommand::RefreshState),

            Action::TstatUpdated(s) => self.tstat = Some(s.clone()),
            Action::BlowerUpdated(s) => self.blower = Some(s.clone()),
            Action::HeatpumpUpdated(s) => self.heatpump = Some(s.clone()),
            Action::DiagnosticsUpdated(d) => self.diagnostics = d.clone(),
            Action::StreamStateChanged(s) => self.stream_status = s.clone(),

            Action::Tick => {
                self.last_update = self.panel.state().last_stream_update();
            }

            Action::Render | Action::Resize(..) => {}
        }
    }

    fn submit(&self, cmd: PanelCommand) {
        if let Err(e) = self.panel.submit(cmd) {
            warn!(error = %e, "could not submit command");
        }
    }

    fn selected_zone_status(&self) -> Option<&ZoneStatus> {
        self.tstat.as_ref()?.zone(self.selected_zone)
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let [content_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

        let [zones_area, equipment_area] =
            Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)])
                .areas(content_area);

        self.render_zones(frame, zones_area);
        self.render_equipment(frame, equipment_area);
        self.render_status_bar(frame, status_area);

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    fn render_zones(&self, frame: &mut Frame, area: Rect) {
        let Some(tstat) = self.tstat.as_ref() else {
            let block = Block::default()
                .title(" Thermostat ")
                .title_style(theme::title_style())
                .borders(Borders::ALL)
                .border_style(theme::border_default());
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " waiting for status…",
                    theme::label_style(),
                ))),
                inner,
            );
            return;
        };

        let count = tstat.zones.len().max(1);
        let constraints = vec![Constraint::Ratio(1, count as u32); count];
        let rows = Layout::vertical(constraints).split(area);

        for (i, zone) in tstat.zones.iter().enumerate() {
            let zone_number = if zone.zone_number > 0 {
                zone.zone_number
            } else {
                (i + 1) as u8
            };
            self.render_zone_card(frame, rows[i], zone, zone_number);
        }
    }

    fn render_zone_card(&self, frame: &mut Frame, area: Rect, zone: &ZoneStatus, number: u8) {
        let selected = number == self.selected_zone;

        let title = if zone.zone_name.is_empty() {
            format!(" Zone {number} ")
        } else {
            format!(" Zone {number} · {} ", zone.zone_name.trim())
        };

        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(if selected {
                BorderType::Thick
            } else {
                BorderType::Rounded
            })
            .border_style(if selected {
                theme::border_selected()
            } else {
                theme::border_default()
            });

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = vec![
            Line::from(vec![
                Span::styled(format!(" {}°", zone.current_temp), theme::temp_style()),
                Span::styled(
                    format!("  {}% rh", zone.current_humidity),
                    theme::label_style(),
                ),
            ]),
            Line::from(vec![
                Span::styled(" heat ", theme::label_style()),
                Span::styled(format!("{}°", zone.heat_setpoint), theme::heat_style()),
                Span::styled("  cool ", theme::label_style()),
                Span::styled(format!("{}°", zone.cool_setpoint), theme::cool_style()),
            ]),
            Line::from(vec![
                Span::styled(" fan ", theme::label_style()),
                Span::styled(zone.fan_mode.clone(), theme::value_style()),
                Span::styled("  hold ", theme::label_style()),
                Span::styled(
                    if zone.hold == Some(true) { "on" } else { "off" },
                    if zone.hold == Some(true) {
                        theme::heat_style()
                    } else {
                        theme::value_style()
                    },
                ),
            ]),
        ];

        if !zone.preset.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(" preset ", theme::label_style()),
                Span::styled(zone.preset.clone(), theme::value_style()),
            ]));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_equipment(&self, frame: &mut Frame, area: Rect) {
        let [system_area, blower_area, heatpump_area] = Layout::vertical([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .areas(area);

        self.render_system_pane(frame, system_area);
        self.render_blower_pane(frame, blower_area);
        self.render_heatpump_pane(frame, heatpump_area);
    }

    fn render_system_pane(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block(" System ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(tstat) = self.tstat.as_ref() else {
            return;
        };

        let action_style = match tstat.action.as_str() {
            "heating" => theme::heat_style(),
            "cooling" => theme::cool_style(),
            _ => theme::value_style(),
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(" mode ", theme::label_style()),
                Span::styled(tstat.mode.clone(), theme::value_style()),
                Span::styled("  stage ", theme::label_style()),
                Span::styled(tstat.stage.to_string(), theme::value_style()),
            ]),
            Line::from(vec![
                Span::styled(" action ", theme::label_style()),
                Span::styled(
                    if tstat.action.is_empty() {
                        "idle".into()
                    } else {
                        tstat.action.clone()
                    },
                    action_style,
                ),
            ]),
            Line::from(vec![
                Span::styled(" outdoor ", theme::label_style()),
                Span::styled(format!("{}°", tstat.outdoor_temp), theme::value_style()),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_blower_pane(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block(" Blower ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(blower) = self.blower.as_ref() else {
            return;
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(" rpm ", theme::label_style()),
                Span::styled(blower.blower_rpm.to_string(), theme::value_style()),
                Span::styled("  cfm ", theme::label_style()),
                Span::styled(blower.air_flow_cfm.to_string(), theme::value_style()),
            ]),
            Line::from(vec![
                Span::styled(" static ", theme::label_style()),
                Span::styled(
                    format!("{:.2} inH₂O", blower.static_pressure),
                    theme::value_style(),
                ),
            ]),
            Line::from(vec![
                Span::styled(" heat stage ", theme::label_style()),
                Span::styled(blower.heat_stage.to_string(), theme::value_style()),
                Span::styled("  elec ", theme::label_style()),
                Span::styled(
                    if blower.elec_heat { "on" } else { "off" },
                    theme::value_style(),
                ),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_heatpump_pane(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block(" Heat Pump ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(hp) = self.heatpump.as_ref() else {
            return;
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(" coil ", theme::label_style()),
                Span::styled(format!("{:.1}°", hp.coil_temp), theme::value_style()),
                Span::styled("  outside ", theme::label_style()),
                Span::styled(format!("{:.1}°", hp.outside_temp), theme::value_style()),
            ]),
            Line::from(vec![
                Span::styled(" stage ", theme::label_style()),
                Span::styled(hp.stage.to_string(), theme::value_style()),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection = match &self.stream_status {
            StreamState::Connected => {
                Span::styled("● connected", Style::default().fg(theme::SUCCESS_GREEN))
            }
            StreamState::Connecting => {
                Span::styled("◐ connecting", Style::default().fg(theme::WARN_YELLOW))
            }
            StreamState::Reconnecting { attempt } => Span::styled(
                format!("◐ reconnecting (attempt {})", attempt + 1),
                Style::default().fg(theme::WARN_YELLOW),
            ),
            StreamState::Failed => {
                Span::styled("✕ failed", Style::default().fg(theme::ERROR_RED))
            }
            StreamState::Disconnected => {
                Span::styled("○ disconnected", Style::default().fg(theme::ERROR_RED))
            }
        };

        let mut spans = vec![Span::raw(" "), connection];

        if self.diagnostics.parse_failures > 0 {
            spans.push(Span::styled(
                format!("  ⚠ {} bad frames", self.diagnostics.parse_failures),
                Style::default().fg(theme::WARN_YELLOW),
            ));
        }

        if let Some(t) = self.last_update {
            let age = (Utc::now() - t).num_seconds().max(0);
            spans.push(Span::styled(
                format!("  updated {age}s ago"),
                theme::key_hint(),
            ));
        }

        spans.push(Span::styled(
            format!("  zone {}", self.selected_zone),
            theme::key_hint_key(),
        ));
        spans.push(Span::styled(" │ ? help  q quit", theme::key_hint()));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 46u16.min(area.width.saturating_sub(4));
        let help_height = 16u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_selected());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let hint = |key: &str, desc: &str| {
            Line::from(vec![
                Span::styled(format!("  {key:<9}"), theme::key_hint_key()),
                Span::styled(desc.to_owned(), theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            hint("1-4", "Select zone"),
            hint("+ / -", "Cool setpoint up / down"),
            hint("] / [", "Heat setpoint up / down"),
            hint("f", "Cycle fan speed"),
            hint("m", "Cycle operating mode"),
            hint("h", "Toggle hold"),
            hint("r", "Refresh from daemon"),
            Line::from(""),
            hint("?", "This help"),
            hint("q", "Quit"),
            Line::from(""),
            Line::from(Span::styled(
                "                    Esc or ? to close",
                theme::key_hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }
}

fn pane_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_default())
}

// ── Tests ────────────────────────────────────────────────────────────
