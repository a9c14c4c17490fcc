//! 终端模板工作台
//!
//! 使用 crossterm 和 ratatui 构建：左侧编辑模板与变量定义，右侧实时显示渲染结果。
//! 每次按键修改内容后都会重新诊断，错误/警告显示在对应行的行首标记（`E`/`W`）和状态行中。
//!
//! # 用法
//!
//! ```bash
//! cargo run -p tui-workbench -- [url]
//! ```
//!
//! `url` 可以是分享链接（带 `#token`），此时从链接载入模板和变量。
//!
//! # 配置
//!
//! 配置文件为 `<config_dir>/template-workbench/config.toml`（或 `TEMPLATE_WORKBENCH_CONFIG`），
//! 环境变量 `TEMPLATE_WORKBENCH_*` 可覆盖其中的值。日志写入状态文件旁的 `workbench.log`。
//!
//! # 快捷键
//!
//! - 方向键: 移动光标
//! - Home/End: 行首/行尾
//! - Tab: 切换模板/变量面板
//! - Backspace/Delete: 删除字符
//! - Enter: 插入换行
//! - Ctrl+L: 显示分享链接
//! - Ctrl+X: 退出

mod telemetry;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::{
    env,
    io::{self, stdout},
    process,
    time::Duration,
};
use unicode_width::UnicodeWidthStr;
use workbench_core::{
    Annotation, BufferSurface, FileStore, InitialSource, Location, MemoryStore, Severity,
    StateStore, SurfaceId, Surfaces, Workbench, WorkbenchConfig,
};
use workbench_core_jinja::{DynVariables, JinjaTemplates, engine};

type AppWorkbench = Workbench<BufferSurface, JinjaTemplates, DynVariables, Box<dyn StateStore>>;

/// 行首标记宽度（标记 + 空格）
const GUTTER_WIDTH: u16 = 2;

/// 输入面板的光标（字符偏移）和滚动位置
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    offset: usize,
    scroll_top: usize,
}

/// 应用状态
struct App {
    workbench: AppWorkbench,
    /// 当前焦点面板（Template 或 Variables）
    focus: SurfaceId,
    template_cursor: Cursor,
    variables_cursor: Cursor,
    should_quit: bool,
    /// 状态消息（下一次按键时清除）
    status_message: String,
}

impl App {
    fn new(workbench: AppWorkbench) -> Self {
        Self {
            workbench,
            focus: SurfaceId::Template,
            template_cursor: Cursor::default(),
            variables_cursor: Cursor::default(),
            should_quit: false,
            status_message: String::new(),
        }
    }

    fn cursor(&self) -> Cursor {
        match self.focus {
            SurfaceId::Variables => self.variables_cursor,
            _ => self.template_cursor,
        }
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        match self.focus {
            SurfaceId::Variables => &mut self.variables_cursor,
            _ => &mut self.template_cursor,
        }
    }

    fn focused(&self) -> &BufferSurface {
        self.workbench.surfaces().get(self.focus)
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        self.status_message.clear();

        match (key.modifiers, key.code) {
            // Ctrl+X: 退出
            (KeyModifiers::CONTROL, KeyCode::Char('x')) => {
                self.should_quit = true;
            }

            // Ctrl+L: 分享链接
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => {
                self.status_message = format!("Share link: {}", self.workbench.share_link());
            }

            (_, KeyCode::Tab | KeyCode::BackTab) => self.toggle_focus(),

            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => {
                self.insert_text(c.encode_utf8(&mut [0; 4]));
            }
            (_, KeyCode::Enter) => self.insert_text("\n"),
            (_, KeyCode::Backspace) => self.backspace(),
            (_, KeyCode::Delete) => self.delete(),

            (_, KeyCode::Left) => self.move_horizontal(-1),
            (_, KeyCode::Right) => self.move_horizontal(1),
            (_, KeyCode::Up) => self.move_vertical(-1),
            (_, KeyCode::Down) => self.move_vertical(1),
            (_, KeyCode::Home) => self.move_to_line_edge(false),
            (_, KeyCode::End) => self.move_to_line_edge(true),

            _ => {}
        }

        // 每个变更事件对应一次诊断
        let passes = self.workbench.pump();
        if passes > 0 {
            tracing::trace!(passes, "applied edit");
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            SurfaceId::Template => SurfaceId::Variables,
            _ => SurfaceId::Template,
        };
    }

    fn insert_text(&mut self, text: &str) {
        let offset = self.cursor().offset;
        self.workbench.surface_mut(self.focus).insert(offset, text);
        self.cursor_mut().offset = offset + text.chars().count();
    }

    fn backspace(&mut self) {
        let offset = self.cursor().offset;
        if offset == 0 {
            return;
        }
        self.workbench.surface_mut(self.focus).remove(offset - 1, offset);
        self.cursor_mut().offset = offset - 1;
    }

    fn delete(&mut self) {
        let offset = self.cursor().offset;
        if offset < self.focused().char_count() {
            self.workbench.surface_mut(self.focus).remove(offset, offset + 1);
        }
    }

    fn move_horizontal(&mut self, delta: isize) {
        let max = self.focused().char_count();
        let cursor = self.cursor_mut();
        cursor.offset = cursor.offset.saturating_add_signed(delta).min(max);
    }

    fn move_vertical(&mut self, delta: isize) {
        let target = vertical_target(self.focused(), self.cursor().offset, delta);
        self.cursor_mut().offset = target;
    }

    fn move_to_line_edge(&mut self, end: bool) {
        let surface = self.focused();
        let (line, _) = surface.offset_to_position(self.cursor().offset);
        let target = surface.position_to_offset(line, if end { usize::MAX } else { 0 });
        self.cursor_mut().offset = target;
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // 面板区域
                Constraint::Length(1), // 状态行
                Constraint::Length(1), // 快捷键提示
            ])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[0]);

        let inputs = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        self.render_input(frame, inputs[0], SurfaceId::Template);
        self.render_input(frame, inputs[1], SurfaceId::Variables);
        self.render_output(frame, columns[1]);
        self.render_status_line(frame, chunks[1]);
        self.render_shortcuts(frame, chunks[2]);
    }

    fn render_input(&mut self, frame: &mut Frame, area: Rect, id: SurfaceId) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let focused = self.focus == id;
        let mut cursor = match id {
            SurfaceId::Variables => self.variables_cursor,
            _ => self.template_cursor,
        };

        let surface = self.workbench.surfaces().get(id);
        let (cursor_line, cursor_column) = surface.offset_to_position(cursor.offset);
        cursor.scroll_top = scroll_to_show(cursor.scroll_top, cursor_line, inner_height);

        let mut display_lines = Vec::with_capacity(inner_height);
        for row in cursor.scroll_top..(cursor.scroll_top + inner_height).min(surface.line_count()) {
            let text = surface.line(row).unwrap_or_default();
            display_lines.push(Line::from(vec![
                marker_span(row_severity(surface.annotations_on_row(row))),
                Span::raw(" "),
                Span::raw(text.to_string()),
            ]));
        }

        let title = match id {
            SurfaceId::Variables => " Variables ",
            _ => " Template ",
        };
        let border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        if focused && inner_height > 0 {
            let line_text = surface.line(cursor_line).unwrap_or_default();
            let prefix: String = line_text.chars().take(cursor_column).collect();
            let max_x = area.right().saturating_sub(2);
            let x = (area.x + 1 + GUTTER_WIDTH)
                .saturating_add(prefix.width() as u16)
                .min(max_x);
            let y = area.y + 1 + (cursor_line - cursor.scroll_top) as u16;
            frame.set_cursor_position((x, y));
        }

        frame.render_widget(Paragraph::new(display_lines).block(block), area);

        match id {
            SurfaceId::Variables => self.variables_cursor = cursor,
            _ => self.template_cursor = cursor,
        }
    }

    fn render_output(&self, frame: &mut Frame, area: Rect) {
        let fatal = self.workbench.last_result().fatal;
        let style = if fatal {
            Style::default().fg(Color::LightRed)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Output ")
            .border_style(Style::default().fg(Color::DarkGray));

        let output = Paragraph::new(self.workbench.surfaces().output.text().to_string())
            .style(style)
            .block(block)
            .wrap(Wrap { trim: false });

        frame.render_widget(output, area);
    }

    fn render_status_line(&self, frame: &mut Frame, area: Rect) {
        let surface = self.focused();
        let (line, column) = surface.offset_to_position(self.cursor().offset);
        let notes: Vec<String> = surface
            .annotations_on_row(line)
            .map(|annotation| {
                let label = match annotation.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                };
                format!("{label}: {}", annotation.message)
            })
            .collect();

        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if !notes.is_empty() {
            notes.join(" | ")
        } else {
            format!(
                "{} Ln {}, Col {} | passes: {} | loaded from: {}",
                self.focus.name(),
                line + 1,
                column + 1,
                self.workbench.passes(),
                source_label(self.workbench.initial_source())
            )
        };

        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

        frame.render_widget(status_line, area);
    }

    /// 渲染快捷键提示
    fn render_shortcuts(&self, frame: &mut Frame, area: Rect) {
        let shortcuts = "Tab:Switch pane  Ctrl-L:Share link  Ctrl-X:Quit";
        let shortcuts_line =
            Paragraph::new(shortcuts).style(Style::default().bg(Color::Blue).fg(Color::White));

        frame.render_widget(shortcuts_line, area);
    }
}

/// 上下移动 `delta` 行后的偏移（尽量保持列）
fn vertical_target(surface: &BufferSurface, offset: usize, delta: isize) -> usize {
    let (line, column) = surface.offset_to_position(offset);
    let last_line = surface.line_count().saturating_sub(1);
    let target = line.saturating_add_signed(delta).min(last_line);
    surface.position_to_offset(target, column)
}

/// 保证 `line` 在可见范围内的 scroll_top
fn scroll_to_show(scroll_top: usize, line: usize, height: usize) -> usize {
    if height == 0 || line < scroll_top {
        line
    } else if line >= scroll_top + height {
        line + 1 - height
    } else {
        scroll_top
    }
}

/// 一行中最严重的标注
fn row_severity<'a>(annotations: impl Iterator<Item = &'a Annotation>) -> Option<Severity> {
    let mut worst = None;
    for annotation in annotations {
        match annotation.severity {
            Severity::Error => return Some(Severity::Error),
            Severity::Warning => worst = Some(Severity::Warning),
        }
    }
    worst
}

fn marker_span(severity: Option<Severity>) -> Span<'static> {
    match severity {
        Some(Severity::Error) => Span::styled(
            "E",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        ),
        Some(Severity::Warning) => Span::styled("W", Style::default().fg(Color::Yellow)),
        None => Span::raw(" "),
    }
}

fn source_label(source: InitialSource) -> &'static str {
    match source {
        InitialSource::Link => "link",
        InitialSource::Persisted => "saved state",
        InitialSource::Defaults => "defaults",
    }
}

fn open_store(config: &WorkbenchConfig) -> Box<dyn StateStore> {
    let Some(path) = &config.state_path else {
        return Box::new(MemoryStore::new());
    };
    match FileStore::open(path.clone()) {
        Ok(store) => Box::new(store),
        Err(err) => {
            eprintln!(
                "warning: cannot use state file {} ({err}); changes will not be saved",
                path.display()
            );
            Box::new(MemoryStore::new())
        }
    }
}

fn main() -> io::Result<()> {
    let config = match WorkbenchConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            process::exit(1);
        }
    };

    if let Some(log_path) = config.resolved_log_path()
        && let Err(err) = telemetry::initialise(&config.log_filter, &log_path)
    {
        eprintln!("warning: logging disabled: {err}");
    }

    let location = match env::args().nth(1) {
        Some(url) => Location::parse(&url).unwrap_or_else(|err| {
            eprintln!("invalid url {url:?}: {err}");
            process::exit(1);
        }),
        None => config.location().unwrap_or_else(|err| {
            eprintln!("configuration error: {err}");
            process::exit(1);
        }),
    };

    let workbench = Workbench::start(
        Surfaces::buffers(),
        engine(config.variables_syntax),
        open_store(&config),
        location,
        config.default_state(),
    );
    let mut app = App::new(workbench);

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("error: {err}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
        {
            app.handle_key_event(key);
        }
    }

    Ok(())
}
