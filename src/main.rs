/// Horn - Prolog interpreter CLI
use std::env;
use std::fs;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use horn::Machine;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Horn v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    horn [OPTIONS] [FILES...]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help           Print this help message");
    eprintln!("    -v, --version        Print version information");
    eprintln!("    -g, --goal <GOAL>    Run a goal and exit (solutions on stdout)");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    [FILES...]           Prolog source files to consult");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    horn family.pl");
    eprintln!("    horn -g 'app(X, Y, [1,2,3]).' lists.pl");
    eprintln!("    horn");
}

struct Options {
    files: Vec<String>,
    goal: Option<String>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut files = Vec::new();
    let mut goal = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                println!("Horn {}", VERSION);
                process::exit(0);
            }
            "-g" | "--goal" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing goal after -g".to_string());
                }
                goal = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => files.push(arg.to_string()),
        }
        i += 1;
    }
    Ok(Options { files, goal })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(2);
        }
    };

    let mut machine = Machine::new();
    for file in &opts.files {
        let source = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", file, e);
                process::exit(1);
            }
        };
        if let Err(e) = machine.consult(&source) {
            eprintln!("Error: {}: {}", file, machine.format(e.term()));
            process::exit(1);
        }
    }

    if let Some(goal) = opts.goal {
        run_goal(&mut machine, &goal);
        return;
    }

    repl(&mut machine);
}

/// Run one goal, printing every solution.
fn run_goal(machine: &mut Machine, goal: &str) {
    let goal = ensure_terminated(goal);
    let sols = match machine.query(&goal) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let mut any = false;
    let mut lines = Vec::new();
    for sol in sols {
        match sol {
            Ok(sol) => {
                any = true;
                lines.push(render_solution(&sol));
            }
            Err(e) => {
                for line in &lines {
                    println!("{}", line);
                }
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
    for line in &lines {
        println!("{}", line);
    }
    if !any {
        println!("false.");
        process::exit(1);
    }
}

fn render_solution(sol: &horn::Bindings) -> String {
    if sol.is_empty() {
        return "true.".to_string();
    }
    let parts: Vec<String> =
        sol.iter().map(|(name, term)| format!("{} = {}", name, term)).collect();
    parts.join(", ")
}

/// The interactive query loop: one query per line, `;` for more solutions.
fn repl(machine: &mut Machine) {
    println!("Horn v{} - ?- to query, halt. to exit", VERSION);
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: cannot start line editor: {}", e);
            process::exit(1);
        }
    };
    loop {
        let line = match editor.readline("?- ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);
        let query = ensure_terminated(line);
        let mut sols = match machine.query(&query) {
            Ok(s) => s,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };
        loop {
            match sols.next() {
                None => {
                    println!("false.");
                    break;
                }
                Some(Err(e)) => {
                    println!("error: {}", e);
                    break;
                }
                Some(Ok(sol)) => {
                    print!("{}", render_solution(&sol));
                    if !ask_for_more(&mut editor) {
                        println!(".");
                        break;
                    }
                }
            }
        }
    }
}

/// After a solution, `;` asks for the next one.
fn ask_for_more(editor: &mut DefaultEditor) -> bool {
    match editor.readline(" ") {
        Ok(l) => l.trim_start().starts_with(';'),
        Err(_) => false,
    }
}

fn ensure_terminated(goal: &str) -> String {
    let trimmed = goal.trim_end();
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}
