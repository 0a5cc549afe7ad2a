use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use indoc::indoc;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{Level, info};

use overlay_keys::drivers::OutputDriver;
use overlay_keys::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use overlay_keys::event_loop::{ControlFlow, EventLoop};
use overlay_keys::popup::KeyLogPopup;
use overlay_keys::{
    DispatcherConfig, Document, KeyboardDispatcher, KeyboardEvent, ListenerHost, NodeId,
    OverlayHandle, Phase, tracing_sub,
};

const MAX_POPUPS: usize = 8;

const HELP: &str = indoc! {"
    Ctrl+N  open a popup
    Tab     move focus (workspace, then each popup)
    Esc     close the focused popup (handled by the popup itself)
    Ctrl+Q  quit

    Keys typed in the workspace go to the newest popup.
"};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PhaseArg {
    Capture,
    Bubble,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Capture => Phase::Capture,
            PhaseArg::Bubble => Phase::Bubble,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "overlay-keys",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive demo of keyboard routing across stacked popups"
)]
struct Cli {
    /// Append logs to this file. Without it nothing is logged, since the
    /// terminal is busy drawing.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Maximum log level written to the log file.
    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = Level::DEBUG)]
    log_level: Level,

    /// Popups to open at startup.
    #[arg(short = 'p', long = "popups", value_name = "COUNT", default_value_t = 2)]
    popups: usize,

    /// Phase the dispatcher's keydown listener binds in.
    #[arg(long = "phase", value_enum, default_value_t = PhaseArg::Capture)]
    phase: PhaseArg,
}

struct DemoConfig {
    log_file: Option<PathBuf>,
    log_level: Level,
    popups: usize,
    dispatcher: DispatcherConfig,
}

impl TryFrom<&Cli> for DemoConfig {
    type Error = String;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        if cli.popups > MAX_POPUPS {
            return Err(format!("at most {MAX_POPUPS} popups can be open"));
        }
        Ok(Self {
            log_file: cli.log_file.clone(),
            log_level: cli.log_level,
            popups: cli.popups,
            dispatcher: DispatcherConfig::new()
                .with_phase(cli.phase.into())
                .with_scope("demo"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    OpenPopup,
    CycleFocus,
    Quit,
}

fn command_for(key: &KeyEvent) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('n') if ctrl => Some(Command::OpenPopup),
        KeyCode::Char('q') if ctrl => Some(Command::Quit),
        KeyCode::Tab => Some(Command::CycleFocus),
        _ => None,
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let config = DemoConfig::try_from(&cli)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
    if let Some(path) = &config.log_file {
        tracing_sub::set_log_file(path)?;
        tracing_sub::init(config.log_level);
    }

    let mut app = App::new(config.dispatcher.clone())?;
    for _ in 0..config.popups {
        app.open_popup()?;
    }

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut event_loop = EventLoop::new(ConsoleInputDriver::new(), Duration::from_millis(16));
    let result = event_loop.run(|_, event| {
        match event {
            None => output.draw(|frame| app.render(frame))?,
            Some(Event::Key(key)) => {
                app.document.dispatch_key(app.focus, key);
                if app.apply_commands()? == ControlFlow::Quit {
                    return Ok(ControlFlow::Quit);
                }
            }
            Some(_) => {}
        }
        app.prune_closed();
        Ok(ControlFlow::Continue)
    });
    output.exit()?;

    info!(
        dropped_releases = event_loop.driver().dropped_releases(),
        popups_left = app.popups.len(),
        "demo finished"
    );
    app.dispatcher.teardown();
    result
}

struct App {
    document: Rc<Document>,
    dispatcher: KeyboardDispatcher<NodeId>,
    workspace: NodeId,
    layer: NodeId,
    popups: Vec<Rc<KeyLogPopup>>,
    focus: NodeId,
    commands: Rc<RefCell<Vec<Command>>>,
    opened: usize,
}

impl App {
    fn new(config: DispatcherConfig) -> io::Result<Self> {
        let document = Rc::new(Document::new());
        let body = document.body();
        let workspace = document
            .create_labeled(body, "workspace")
            .map_err(io::Error::other)?;
        let layer = document
            .create_labeled(body, "overlay-layer")
            .map_err(io::Error::other)?;
        let dispatcher =
            KeyboardDispatcher::with_config(document.clone(), document.clone(), config);

        // Global accelerators see every keydown after the overlays have.
        let commands = Rc::new(RefCell::new(Vec::new()));
        let queue = commands.clone();
        document.add_key_listener(
            Phase::Bubble,
            Rc::new(move |event: &KeyboardEvent<NodeId>| {
                if let Some(command) = command_for(&event.key) {
                    queue.borrow_mut().push(command);
                }
            }),
        );

        Ok(Self {
            document,
            dispatcher,
            workspace,
            layer,
            popups: Vec::new(),
            focus: workspace,
            commands,
            opened: 0,
        })
    }

    fn open_popup(&mut self) -> io::Result<()> {
        if self.popups.len() >= MAX_POPUPS {
            return Ok(());
        }
        self.opened += 1;
        let title = format!("popup {}", self.opened);
        let popup = KeyLogPopup::open(&self.document, self.layer, title, &self.dispatcher)
            .map_err(io::Error::other)?;
        self.focus = popup.input();
        self.popups.push(popup);
        Ok(())
    }

    fn apply_commands(&mut self) -> io::Result<ControlFlow> {
        let pending = std::mem::take(&mut *self.commands.borrow_mut());
        for command in pending {
            match command {
                Command::OpenPopup => self.open_popup()?,
                Command::CycleFocus => self.cycle_focus(),
                Command::Quit => return Ok(ControlFlow::Quit),
            }
        }
        Ok(ControlFlow::Continue)
    }

    fn focus_order(&self) -> Vec<NodeId> {
        std::iter::once(self.workspace)
            .chain(self.popups.iter().map(|p| p.input()))
            .collect()
    }

    fn cycle_focus(&mut self) {
        let order = self.focus_order();
        let next = order
            .iter()
            .position(|n| *n == self.focus)
            .map_or(0, |i| (i + 1) % order.len());
        self.focus = order[next];
    }

    fn prune_closed(&mut self) {
        let (closed, open): (Vec<_>, Vec<_>) =
            self.popups.drain(..).partition(|p| p.is_closed());
        self.popups = open;
        for popup in closed {
            self.document.remove_node(popup.root());
        }
        if !self.document.is_attached(self.focus) {
            self.focus = self
                .popups
                .last()
                .map_or(self.workspace, |p| p.input());
        }
    }

    fn render(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        if area.height < 2 {
            return;
        }
        let main = Rect {
            height: area.height - 1,
            ..area
        };
        let status = Rect {
            y: area.bottom() - 1,
            height: 1,
            ..area
        };

        let workspace_style = if self.focus == self.workspace {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let workspace = Paragraph::new(HELP).block(
            Block::default()
                .title(" workspace ")
                .borders(Borders::ALL)
                .border_style(workspace_style),
        );
        frame.render_widget(workspace, main);

        for (index, popup) in self.popups.iter().enumerate() {
            popup.render(frame, main, index, popup.input() == self.focus);
        }

        let line = format!(
            " focus {} ({}) | overlays {} | listeners {} ",
            self.focus,
            self.document.label(self.focus).unwrap_or_default(),
            self.dispatcher.len(),
            self.document.listener_count(),
        );
        frame.render_widget(
            Paragraph::new(line).style(Style::default().fg(Color::Black).bg(Color::Gray)),
            status,
        );
    }
}
