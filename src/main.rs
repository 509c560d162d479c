use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use lpp::{
    cli::{Args, Commands},
    error::Result,
    new_root_environment,
    object::Object,
    parser::parse,
    repl::{is_exit_command, REPLPrompt, REPLValidator, Session, SyntaxHighlighter},
    runtime::Evaluator,
    tokenizer::tokenize,
};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use std::{fs, path::PathBuf};

fn report(message: impl std::fmt::Display) {
    eprintln!("{}", Color::Red.paint(message.to_string()));
}

fn run_file(file: PathBuf, max_call_depth: usize) -> Result<()> {
    let source = fs::read_to_string(file)?;

    let env = new_root_environment();
    match Evaluator::with_max_call_depth(max_call_depth).interpret(&source, &env)? {
        Object::Null => {}
        Object::Error(err) => report(format!("Error: {}", err)),
        value => println!("{}", value),
    }

    Ok(())
}

fn check_file(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(file)?;

    let (program, errors) = parse(&source);
    debug!("parsed {} statements", program.statements.len());

    for err in &errors {
        report(format!("parser error: {}", err));
    }
    if errors.is_empty() {
        println!("ok");
    }

    Ok(())
}

fn dump_tokens(file: PathBuf) -> Result<()> {
    let source = fs::read_to_string(file)?;

    for token in tokenize(&source) {
        println!("{}", token);
    }

    Ok(())
}

fn run_repl(max_call_depth: usize) -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    if let Some(history) = home_dir()
        .map(|home| home.join(".lpp_history"))
        .and_then(|path| FileBackedHistory::with_file(20, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    let mut session = Session::new(max_call_depth);

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) if is_exit_command(&buffer) => break Ok(()),
            Signal::Success(buffer) => match session.eval(&buffer) {
                Ok(Object::Null) => {}
                Ok(Object::Error(err)) => report(format!("Error: {}", err)),
                Ok(value) => println!("{}", value),
                Err(err) => report(err),
            },
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    debug!("max call depth: {}", args.max_call_depth);

    let result = match args.command {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            run_file(file, args.max_call_depth)
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(file)
        }
        Commands::Tokens { file } => {
            info!("TOKENS MODE");
            debug!("file: {:?}", file);

            dump_tokens(file)
        }
        Commands::Repl => {
            info!("REPL MODE");

            run_repl(args.max_call_depth)
        }
    };

    result.inspect_err(|err| report(err)).ok();
    Ok(())
}
