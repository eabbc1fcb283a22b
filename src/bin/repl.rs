use dictless::ast::TopForm;
use dictless::evaluator::{GlobalEnv, Value, eval_top_form};
use dictless::parser::parse_top_form;
use dictless::rewrite::{dict_helper_definition, rewrite_top_form};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("dictless - L32 interpreter with dict elimination");
    println!("Enter top-level forms like: ((dict (a 1) (b 2)) 'a)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut globals = GlobalEnv::new();
    let mut show_lowered = false;

    loop {
        match rl.readline("dictless> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&globals);
                        continue;
                    }
                    ":lower" => {
                        show_lowered = !show_lowered;
                        if show_lowered {
                            println!("Lowering display enabled:");
                            println!("  • dict forms show their L3 rewrite (→)");
                            println!("  • the lowered program also needs this helper:");
                            println!("    {}", dict_helper_definition());
                        } else {
                            println!("Lowering display disabled.");
                        }
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let result = match parse_top_form(line) {
                    Ok(form) => {
                        if show_lowered && top_form_contains_dict(&form) {
                            println!("→ {}", rewrite_top_form(&form));
                        }
                        eval_top_form(&form, &mut globals)
                    }
                    Err(e) => Err(e),
                };

                match result {
                    // Definitions evaluate to no printable value
                    Ok(Some(value)) => println!("{value}"),
                    Ok(None) => {}
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn top_form_contains_dict(form: &TopForm) -> bool {
    match form {
        TopForm::Define { value, .. } => value.contains_dict(),
        TopForm::Expr(e) => e.contains_dict(),
    }
}

fn print_help() {
    println!("L32 interpreter with dict elimination:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show current global definitions");
    println!("  :lower - Toggle display of the L3 rewrite of dict forms");
    println!("  :quit  - Exit the interpreter");
    println!("  :exit  - Exit the interpreter");
    println!("  Ctrl+C - Exit the interpreter");
    println!();
    println!("Supported forms:");
    println!("  Numbers: 42, -5");
    println!("  Booleans: #t/#f");
    println!("  Strings: \"hello\"");
    println!("  Quoted data: 'a, '(1 2), '(a . 1)");
    println!("  Conditionals: (if (< x 0) 1 2)");
    println!("  Procedures: (lambda (x y) (+ x y))");
    println!("  Definitions: (define square (lambda (x) (* x x)))");
    println!("  Dictionaries: ((dict (a 1) (b 2)) 'b)");
    println!();
    println!("Examples:");
    println!("  ((dict (a 1) (b 2)) 'a)");
    println!("  (define d (dict (x 10) (y 20)))");
    println!("  (d 'y)");
    println!();
}

fn print_environment(globals: &GlobalEnv) {
    let mut bindings: Vec<(&String, &Value)> = globals.bindings().collect();
    bindings.sort_by(|a, b| a.0.cmp(b.0));

    if bindings.is_empty() {
        println!("No global definitions.");
        return;
    }

    println!("Global definitions ({} total):", bindings.len());
    for (name, value) in bindings {
        println!("  {name} = {value}");
    }
}
