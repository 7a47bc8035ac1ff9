use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Instant;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use ratatui::Terminal;

use crate::config::Catalog;
use crate::core::{CredentialForm, EnvironmentRegistry, TapGestureConfig, TapOutcome, TapRecognizer};
use crate::models::EnvironmentConfig;
use crate::storage::JsonFileStore;

/// 界面模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 显示当前环境，标题栏是隐藏的点击区域
    Normal,
    /// 底部弹出的环境选择列表
    Selecting,
    /// 填写凭据
    Credentials,
}

/// TUI 应用状态
pub struct App {
    registry: EnvironmentRegistry,
    recognizer: TapRecognizer,
    triggered: Rc<Cell<bool>>,
    tap_feedback: Rc<Cell<u32>>,
    changes: Rc<Cell<u32>>,
    mode: Mode,
    selected: usize,
    form: Option<CredentialForm>,
    input_field: usize,
    status_message: String,
    running: bool,
    title_area: Cell<Rect>,
}

impl App {
    /// 按目录打开文件存储并初始化注册表
    pub fn new(catalog: &Catalog) -> crate::error::Result<Self> {
        let store = JsonFileStore::open(&catalog.store_path())?;
        let mut registry = EnvironmentRegistry::new(store);
        registry.initialize(catalog.environments.clone(), catalog.default_env())?;
        Ok(Self::with_registry(registry, catalog.gesture.to_config()))
    }

    /// 从已初始化的注册表创建（用于测试）
    pub fn with_registry(mut registry: EnvironmentRegistry, gesture: TapGestureConfig) -> Self {
        let triggered = Rc::new(Cell::new(false));
        let tap_feedback = Rc::new(Cell::new(0));
        let changes = Rc::new(Cell::new(0));

        let t = Rc::clone(&triggered);
        let f = Rc::clone(&tap_feedback);
        let recognizer = TapRecognizer::new(gesture)
            .on_trigger(move || t.set(true))
            .on_tap(move |n| f.set(n));

        let c = Rc::clone(&changes);
        registry.subscribe(move || c.set(c.get() + 1));

        Self {
            registry,
            recognizer,
            triggered,
            tap_feedback,
            changes,
            mode: Mode::Normal,
            selected: 0,
            form: None,
            input_field: 0,
            status_message: "Ready".to_string(),
            running: true,
            title_area: Cell::new(Rect::default()),
        }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn form(&self) -> Option<&CredentialForm> {
        self.form.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 注册表变更通知次数
    pub fn change_count(&self) -> u32 {
        self.changes.get()
    }

    pub fn set_gesture_enabled(&mut self, enabled: bool) {
        self.recognizer.set_enabled(enabled);
        self.tap_feedback.set(0);
    }

    /// 隐藏区域被点击
    pub fn tap_at(&mut self, now: Instant) {
        if self.mode != Mode::Normal {
            return;
        }
        if let TapOutcome::Ignored = self.recognizer.tap(now) {
            return;
        }
        if self.triggered.replace(false) {
            self.tap_feedback.set(0);
            self.open_selector();
        }
    }

    fn open_selector(&mut self) {
        self.selected = self
            .registry
            .available()
            .iter()
            .position(|e| self.registry.is_current(e))
            .unwrap_or(0);
        self.mode = Mode::Selecting;
        self.set_status("Select environment: ↑↓ move, Enter confirm, Esc close");
    }

    /// 启动 TUI 事件循环
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key.code),
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left)
                        && self.in_title(mouse.column, mouse.row)
                    {
                        self.tap_at(Instant::now());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn in_title(&self, x: u16, y: u16) -> bool {
        let area = self.title_area.get();
        x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
    }

    fn handle_key(&mut self, code: KeyCode) {
        match self.mode {
            Mode::Normal => self.handle_normal_key(code),
            Mode::Selecting => self.handle_select_key(code),
            Mode::Credentials => self.handle_credential_key(code),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.running = false,
            // 键盘上的隐藏点击
            KeyCode::Char('.') => self.tap_at(Instant::now()),
            KeyCode::Char('c') => match self.registry.clear_saved() {
                Ok(()) => self.set_status("Saved environment cleared (applies on next start)"),
                Err(e) => self.set_status(format!("Error: {}", e)),
            },
            _ => {}
        }
    }

    fn handle_select_key(&mut self, code: KeyCode) {
        let len = self.registry.available().len();
        match code {
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => self.confirm_selection(),
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.set_status("Cancelled");
            }
            _ => {}
        }
    }

    fn confirm_selection(&mut self) {
        let Some(target) = self.registry.available().get(self.selected).cloned() else {
            return;
        };

        if target.requires_credentials {
            let mut form = CredentialForm::new(&target);
            if let Some(saved) = self.registry.load_credentials(&target) {
                form = form.with_saved(&saved);
            }
            self.form = Some(form);
            self.input_field = 0;
            self.mode = Mode::Credentials;
            self.set_status(format!(
                "{} requires credentials: Tab=next field, Enter=submit, Esc=back",
                target.display_name
            ));
            return;
        }

        self.apply_switch(&target);
    }

    fn apply_switch(&mut self, target: &EnvironmentConfig) {
        match self.registry.switch_environment(target) {
            Ok(()) => self.set_status(format!("Switched to {}", target.display_name)),
            Err(e) => self.set_status(format!("Error: {}", e)),
        }
        self.mode = Mode::Normal;
        self.form = None;
    }

    fn handle_credential_key(&mut self, code: KeyCode) {
        let Some(form) = self.form.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };
        match code {
            KeyCode::Esc => {
                self.form = None;
                self.mode = Mode::Selecting;
                self.set_status("Select environment: ↑↓ move, Enter confirm, Esc close");
            }
            KeyCode::Tab => {
                if !form.is_empty() {
                    self.input_field = (self.input_field + 1) % form.len();
                }
            }
            KeyCode::BackTab => {
                if self.input_field > 0 {
                    self.input_field -= 1;
                }
            }
            KeyCode::Backspace => {
                if let Some(value) = form.value_at_mut(self.input_field) {
                    value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(value) = form.value_at_mut(self.input_field) {
                    value.push(c);
                }
            }
            KeyCode::Enter => self.submit_credentials(),
            _ => {}
        }
    }

    /// 校验通过才保存凭据并切换
    fn submit_credentials(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let target = form.environment().clone();
        match form.validate() {
            Ok(values) => {
                if let Err(e) = self.registry.save_credentials(&target, &values) {
                    tracing::warn!(environment = target.key(), "failed to save credentials: {}", e);
                }
                self.apply_switch(&target);
            }
            Err(e) => self.set_status(format!("Error: {}", e)),
        }
    }

    /// 渲染整个界面
    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(area);

        self.title_area.set(outer[0]);
        self.render_title(frame, outer[0]);
        self.render_current(frame, outer[1]);
        self.render_status(frame, outer[2]);

        match self.mode {
            Mode::Normal => {}
            Mode::Selecting => self.render_selector(frame, bottom_sheet(area, 50)),
            Mode::Credentials => self.render_form(frame, bottom_sheet(area, 60)),
        }
    }

    fn render_title(&self, frame: &mut ratatui::Frame, area: Rect) {
        let taps = self.tap_feedback.get();
        let mut spans = vec![Span::styled(
            "Env Switcher",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )];
        if taps > 0 {
            spans.push(Span::styled(
                format!("  {}", "·".repeat(taps as usize)),
                Style::default().fg(Color::DarkGray),
            ));
        }
        let title = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn render_current(&self, frame: &mut ratatui::Frame, area: Rect) {
        let block = Block::default()
            .title(" Current Environment ")
            .borders(Borders::ALL);

        let Some(env) = self.registry.current() else {
            frame.render_widget(Paragraph::new("Not initialized").block(block), area);
            return;
        };

        let label = Style::default().fg(Color::DarkGray);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Name:     ", label),
                Span::styled(
                    env.display_name.as_str(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" ({})", env.name)),
            ]),
            Line::from(vec![
                Span::styled("Base URL: ", label),
                Span::raw(env.base_url.as_str()),
            ]),
            Line::from(vec![
                Span::styled("Storage:  ", label),
                Span::raw(if env.is_permanent() { "permanent" } else { "session only" }),
            ]),
        ];

        if !env.extras.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Extras:", label)));
            let mut keys: Vec<&String> = env.extras.keys().collect();
            keys.sort();
            for key in keys {
                lines.push(Line::from(format!("  {} = {}", key, env.extras[key])));
            }
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_selector(&self, frame: &mut ratatui::Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .registry
            .available()
            .iter()
            .enumerate()
            .map(|(i, env)| {
                let style = if i == self.selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let prefix = if i == self.selected { "> " } else { "  " };
                let marker = if self.registry.is_current(env) { " ✓" } else { "" };
                let lock = if env.requires_credentials { " 🔒" } else { "" };
                ListItem::new(format!(
                    "{}{} | {}{}{}",
                    prefix, env.display_name, env.base_url, lock, marker
                ))
                .style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title(" Select Environment ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(list, area);
    }

    fn render_form(&self, frame: &mut ratatui::Frame, area: Rect) {
        let Some(form) = self.form.as_ref() else {
            return;
        };

        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(Span::styled(
            format!("Credentials for {}:", form.environment().display_name),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));

        for (i, field) in form.fields().iter().enumerate() {
            let is_active = i == self.input_field;
            let indicator = if is_active { "▶ " } else { "  " };
            let label_style = if is_active {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let required = if field.is_required { "*" } else { "" };
            let value = form.display_value(i).unwrap_or_default();
            let shown = if value.is_empty() && !is_active {
                Span::styled(
                    field.hint.clone().unwrap_or_default(),
                    Style::default().fg(Color::DarkGray),
                )
            } else {
                Span::styled(value, Style::default().fg(Color::White))
            };
            lines.push(Line::from(vec![
                Span::raw(indicator),
                Span::styled(format!("{}{}: ", field.label, required), label_style),
                shown,
                if is_active {
                    Span::styled("█", Style::default().fg(Color::Cyan))
                } else {
                    Span::raw("")
                },
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Tab=next field  Enter=submit  Esc=back",
            Style::default().fg(Color::DarkGray),
        )));

        let content = Paragraph::new(lines).block(
            Block::default()
                .title(" Credentials ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(content, area);
    }

    fn render_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let status = Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(&self.status_message, Style::default().fg(Color::Green)),
            Span::raw(" | "),
            Span::styled("q:Quit  c:Clear saved", Style::default().fg(Color::DarkGray)),
        ]);
        let bar = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
        frame.render_widget(bar, area);
    }
}

/// 底部弹出区域，占屏幕高度的 `percent`%
fn bottom_sheet(area: Rect, percent: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(100 - percent),
            Constraint::Percentage(percent),
        ])
        .split(area);
    rows[1]
}
