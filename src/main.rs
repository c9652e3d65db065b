// atnstep: step through an ANTLR grammar's parse of an input in the terminal

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use atnstep::grammar::GrammarInfo;
use atnstep::interpreter::{Debugger, DebuggerConfig};
use atnstep::loader::{AtnCache, InterpreterData, LoaderOptions};
use atnstep::symbols::GrammarSymbols;
use atnstep::ui::App;

#[derive(Parser, Debug)]
#[command(name = "atnstep")]
#[command(about = "Step through a grammar's parse of an input")]
struct Args {
    /// Interpreter data (.interp) of the parser grammar
    #[arg(value_name = "PARSER")]
    parser: PathBuf,

    /// Input text to parse
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Interpreter data (.interp) of the lexer grammar
    #[arg(long)]
    lexer: PathBuf,

    /// Grammar source (.g4) used for breakpoints and the source pane
    #[arg(long)]
    grammar: Option<PathBuf>,

    /// Start rule; defaults to the first rule
    #[arg(long)]
    rule: Option<String>,

    /// Load the ATNs without the optimizer
    #[arg(long)]
    no_optimize: bool,

    /// Stop on entry to the start rule instead of running
    #[arg(long)]
    stop_on_entry: bool,

    /// File receiving the log, filtered by RUST_LOG
    #[arg(long, default_value = "atnstep.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn read_interp(path: &Path) -> Result<InterpreterData, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    InterpreterData::parse(&text).map_err(|e| format!("{}: {}", path.display(), e).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut cache = AtnCache::new(LoaderOptions::default().with_optimize(!args.no_optimize));

    let parser_data = read_interp(&args.parser)?;
    let lexer_data = read_interp(&args.lexer)?;
    let parser_atn = parser_data.load_cached(&mut cache, &args.parser.display().to_string())?;
    let lexer_atn = lexer_data.load_cached(&mut cache, &args.lexer.display().to_string())?;
    info!(
        parser_states = parser_atn.states.len(),
        lexer_states = lexer_atn.states.len(),
        "loaded ATNs"
    );

    let vocabulary = parser_data.vocabulary();
    let (grammar_source, mut grammar) = match &args.grammar {
        Some(path) => {
            let source = fs::read_to_string(path)
                .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
            let name = path.display().to_string();
            let grammar =
                GrammarInfo::from_source(name, &source, &parser_data.rule_names, vocabulary);
            (source, grammar)
        }
        None => (
            String::new(),
            GrammarInfo::without_source(&parser_data.rule_names, vocabulary),
        ),
    };
    grammar.channel_names = lexer_data.channel_names.clone();
    grammar.mode_names = lexer_data.mode_names.clone();

    let start_rule = match &args.rule {
        Some(name) => grammar
            .rule_index(name)
            .ok_or_else(|| format!("unknown rule '{}'", name))?,
        None => 0,
    };

    let input = fs::read_to_string(&args.input)
        .map_err(|e| format!("cannot read '{}': {}", args.input.display(), e))?;

    let symbols = GrammarSymbols::with_rules(grammar.source_name.clone(), &parser_data.rule_names);
    let debugger = Debugger::new(
        parser_atn,
        lexer_atn,
        Arc::new(grammar),
        Arc::new(symbols),
        DebuggerConfig {
            stop_on_entry: args.stop_on_entry,
        },
    )?;

    let mut app = App::new(debugger, grammar_source, input, start_rule);
    app.start()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
