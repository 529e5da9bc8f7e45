//! Line-oriented terminal front end.
//!
//! Stands in for the grid widget and the bulk-select overlay: each command
//! turns into the same event the widget would emit.

use std::fmt::{Display, Write as _};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::fetcher::{PageFetcher, Record};
use crate::grid::{submit_select_count, GridSnapshot, Paginator};
use crate::selection::{NavigateOutcome, SelectionStore};

const HELP: &str = "\
commands:
  page <n>          go to page n
  next | prev       move one page
  show              redraw the current page
  check <row...>    set the checked rows of this page (none clears it)
  toggle <row>      flip one row on this page
  select <count>    select the first <count> records of the dataset
  selected          list everything selected, across pages
  unselect <k>      drop entry k of the selected list
  clear             drop the whole selection
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Page(usize),
    Next,
    Prev,
    Show,
    Check(Vec<usize>),
    Toggle(usize),
    /// Raw text from the count box; validated at submit time.
    Select(String),
    Selected,
    Unselect(usize),
    Clear,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        let command = match word.to_ascii_lowercase().as_str() {
            "page" | "p" => Command::Page(parse_number(rest)?),
            "next" | "n" => Command::Next,
            "prev" => Command::Prev,
            "show" | "ls" => Command::Show,
            "check" => Command::Check(
                rest.split_whitespace()
                    .map(parse_number)
                    .collect::<Result<Vec<_>>>()?,
            ),
            "toggle" | "t" => Command::Toggle(parse_number(rest)?),
            "select" => Command::Select(rest.to_string()),
            "selected" => Command::Selected,
            "unselect" => Command::Unselect(parse_number(rest)?),
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => bail!("Empty command"),
            other => bail!("Unknown command '{}', try 'help'", other),
        };
        Ok(command)
    }
}

fn parse_number(text: &str) -> Result<usize> {
    text.parse::<usize>()
        .with_context(|| format!("Expected a number, got '{}'", text))
}

/// Drives one selection session from text commands.
pub struct Console<F: PageFetcher> {
    store: SelectionStore<F>,
}

impl<F> Console<F>
where
    F: PageFetcher,
    F::Record: Display,
{
    pub fn new(store: SelectionStore<F>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SelectionStore<F> {
        &self.store
    }

    /// Read commands until `quit` or end of input, then close the session.
    pub async fn run<I, O>(&self, input: I, mut output: O) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let opening = self.execute(Command::Page(1)).await;
        output.write_all(opening.as_bytes()).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let reply = match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(e) => format!("{}\n", e),
            };
            output.write_all(reply.as_bytes()).await?;
        }

        self.store.close();
        output.flush().await?;
        info!("Console session ended with {} selected", self.store.selection_len());
        Ok(())
    }

    /// Run one command and return the text to print.
    pub async fn execute(&self, command: Command) -> String {
        match command {
            Command::Page(page) => self.go_to(page).await,
            Command::Next => {
                match self.store.grid_snapshot().paginator.next_page() {
                    Some(page) => self.go_to(page).await,
                    None => "Already on the last page\n".to_string(),
                }
            }
            Command::Prev => {
                let paginator = self.store.grid_snapshot().paginator;
                if !paginator.has_prev() {
                    return "Already on the first page\n".to_string();
                }
                self.go_to(paginator.page_index - 1).await
            }
            Command::Show => render(&self.store.grid_snapshot()),
            Command::Check(rows) => self.check(&rows),
            Command::Toggle(row) => self.toggle(row),
            Command::Select(text) => match submit_select_count(&self.store, &text).await {
                Some(report) if report.is_partial() => format!(
                    "Selected {} new records (stopped at page {}, could not be loaded)\n{}",
                    report.added,
                    report.failed_page.unwrap_or_default(),
                    render(&self.store.grid_snapshot())
                ),
                Some(report) => format!(
                    "Selected {} new records\n{}",
                    report.added,
                    render(&self.store.grid_snapshot())
                ),
                None => String::new(),
            },
            Command::Selected => self.list_selected(),
            Command::Unselect(k) => {
                let selection = self.store.selection();
                match k.checked_sub(1).and_then(|i| selection.get(i)) {
                    Some(record) => {
                        self.store.deselect(&record.id());
                        format!("Unselected {}\n", record)
                    }
                    None => format!("No selected entry {}\n", k),
                }
            }
            Command::Clear => {
                self.store.clear_selection();
                format!("Selection cleared\n{}", render(&self.store.grid_snapshot()))
            }
            Command::Help => format!("{}\n", HELP),
            Command::Quit => String::new(),
        }
    }

    async fn go_to(&self, page: usize) -> String {
        match self.store.navigate(page).await {
            Ok(NavigateOutcome::Applied) => render(&self.store.grid_snapshot()),
            Ok(NavigateOutcome::Superseded) => String::new(),
            Ok(NavigateOutcome::Closed) => "Session closed\n".to_string(),
            Err(e) => format!("Could not load page {}: {}\n", page, e),
        }
    }

    fn check(&self, rows: &[usize]) -> String {
        let snapshot = self.store.grid_snapshot();
        let mut checked = Vec::with_capacity(rows.len());
        for &row in rows {
            match row.checked_sub(1).and_then(|i| snapshot.rows.get(i)) {
                Some(grid_row) => checked.push(grid_row.record.clone()),
                None => return format!("No row {} on this page\n", row),
            }
        }
        self.store.apply_page_selection(&checked);
        render(&self.store.grid_snapshot())
    }

    fn toggle(&self, row: usize) -> String {
        let snapshot = self.store.grid_snapshot();
        let Some(index) = row.checked_sub(1).filter(|&i| i < snapshot.rows.len()) else {
            return format!("No row {} on this page\n", row);
        };
        let checked: Vec<F::Record> = snapshot
            .rows
            .iter()
            .enumerate()
            .filter(|(i, grid_row)| grid_row.checked != (*i == index))
            .map(|(_, grid_row)| grid_row.record.clone())
            .collect();
        self.store.apply_page_selection(&checked);
        render(&self.store.grid_snapshot())
    }

    fn list_selected(&self) -> String {
        let selection = self.store.selection();
        if selection.is_empty() {
            return "Nothing selected\n".to_string();
        }
        let mut out = format!("{} selected:\n", selection.len());
        for (i, record) in selection.iter().enumerate() {
            let _ = writeln!(out, "{:>4}. {}", i + 1, record);
        }
        out
    }
}

fn render<R: Display>(snapshot: &GridSnapshot<R>) -> String {
    let Paginator {
        page_index,
        total_records,
        ..
    } = snapshot.paginator;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Page {}/{} ({} records, {} selected)",
        page_index,
        snapshot.paginator.total_pages(),
        total_records,
        snapshot.selected_total
    );
    for (i, row) in snapshot.rows.iter().enumerate() {
        let mark = if row.checked { "[x]" } else { "[ ]" };
        let _ = writeln!(out, "{:>3} {} {}", i + 1, mark, row.record);
    }
    out
}
