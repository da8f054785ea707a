//! Interactive prompt over a sheet.
//!
//! `A1 = (+ 1 2)` sets a cell, `A1 =` clears it, `:`-commands inspect the
//! sheet and anything else is evaluated against it.

use sheetlisp_core::Sheet;
use sheetlisp_engine::builtins::BUILTINS;
use sheetlisp_engine::engine::{CellRange, CellRef, check_range_size, format_result};

pub enum Outcome {
    Output(String),
    Silent,
    Quit,
}

const HELP: &str = "\
Commands:
  KEY = EXPR     set a cell (e.g. A1 = (+ 1 2))
  KEY =          clear a cell
  :get KEY       show a cell value (or KEY:KEY for a range)
  :cells         list defined cells
  :builtins      list default bindings
  :help          show this help
  :quit          exit
Anything else is evaluated; cells are referenced as A1 or A1:B2.";

pub fn handle_line(sheet: &Sheet, line: &str) -> Outcome {
    let line = line.trim();
    if line.is_empty() {
        return Outcome::Silent;
    }

    if let Some(command) = line.strip_prefix(':') {
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));
        return match name {
            "q" | "quit" => Outcome::Quit,
            "h" | "help" => Outcome::Output(HELP.to_string()),
            "cells" => Outcome::Output(list_cells(sheet)),
            "builtins" => Outcome::Output(
                BUILTINS
                    .iter()
                    .map(|b| format!("{:<6} {}", b.name, b.description))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            "get" => Outcome::Output(get(sheet, arg)),
            _ => Outcome::Output(format!("Unknown command: :{name} (try :help)")),
        };
    }

    if let Some((key, source)) = line.split_once('=')
        && let Some(cell) = CellRef::from_str(key.trim())
    {
        let source = source.trim();
        sheet.set_cell(&cell, (!source.is_empty()).then_some(source));
        return if source.is_empty() {
            Outcome::Silent
        } else {
            Outcome::Output(format!("{} = {}", cell, sheet.display(&cell)))
        };
    }

    Outcome::Output(format_result(&sheet.evaluate(line)))
}

/// Display a cell, or each cell of a range on its own line.
pub fn get(sheet: &Sheet, key: &str) -> String {
    if let Some(range) = CellRange::parse(key) {
        if let Err(e) = check_range_size(&range) {
            return format_result(&Err(e));
        }
        return range
            .cells()
            .map(|cell| sheet.display(&cell))
            .collect::<Vec<_>>()
            .join("\n");
    }
    match CellRef::from_str(key) {
        Some(cell) => sheet.display(&cell),
        None => format!("#ERR: Invalid cell reference: {key}"),
    }
}

fn list_cells(sheet: &Sheet) -> String {
    sheet
        .cells()
        .iter()
        .map(|cell| {
            let source = sheet.source(cell).unwrap_or_default();
            format!("{cell} = {source}  => {}", sheet.display(cell))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(feature = "repl")]
pub fn run(sheet: &Sheet) -> anyhow::Result<()> {
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    println!("sheetlisp - type :help for commands, Ctrl+D to exit.");
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("sheetlisp> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match handle_line(sheet, &line) {
                    Outcome::Output(text) => println!("{text}"),
                    Outcome::Silent => {}
                    Outcome::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(not(feature = "repl"))]
pub fn run(sheet: &Sheet) -> anyhow::Result<()> {
    use std::io::BufRead;

    for line in std::io::stdin().lock().lines() {
        match handle_line(sheet, &line?) {
            Outcome::Output(text) => println!("{text}"),
            Outcome::Silent => {}
            Outcome::Quit => break,
        }
    }
    Ok(())
}
