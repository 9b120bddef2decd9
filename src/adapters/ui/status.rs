//! Short user-facing messages for a finished load and a plain day overview.

use crate::domain::{LoadReport, LoadResult, LoadStatus, MenuSnapshot};
use crate::ports::LoadListener;
use chrono::NaiveDate;
use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{Write, stdout};

/// Message shown for each status classification.
pub fn status_message(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::DownloadCompleted => "Downloaded this week's menus.",
        LoadStatus::DownloadFailedUsedCache => {
            "Could not download new menus; showing the saved ones."
        }
        LoadStatus::NoUpdateNeeded => "Menus are up to date.",
        LoadStatus::TotalFailure => "Menus could not be loaded.",
    }
}

fn status_color(status: LoadStatus) -> Color {
    match status {
        LoadStatus::DownloadCompleted | LoadStatus::NoUpdateNeeded => Color::Green,
        LoadStatus::DownloadFailedUsedCache => Color::Yellow,
        LoadStatus::TotalFailure => Color::Red,
    }
}

/// Prints the status message of every finished load.
#[derive(Debug, Default)]
pub struct StatusLine;

impl LoadListener for StatusLine {
    fn on_load_finished(&self, report: &LoadReport) {
        let mut out = stdout();
        let _ = out.execute(SetForegroundColor(status_color(report.status)));
        let _ = out.execute(Print(status_message(report.status)));
        if let LoadResult::Success {
            has_ratings: false, ..
        } = report.result
        {
            let _ = out.execute(Print(" (ratings unavailable)"));
        }
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
        let _ = out.flush();
    }
}

/// Prints the menus served on `day`, favorites first.
pub fn print_day_overview(snapshot: &MenuSnapshot, day: NaiveDate) {
    let mut out = stdout();
    let entries = snapshot.menus_on(day);
    if entries.is_empty() {
        let _ = writeln!(out, "No menus on {}.", day.format("%A, %d.%m.%Y"));
        return;
    }

    let _ = writeln!(out, "{}", day.format("%A, %d.%m.%Y"));
    let mut current: Option<i64> = None;
    for (mensa, menu) in entries {
        if current != Some(mensa.id) {
            current = Some(mensa.id);
            let marker = if mensa.is_favorite { "*" } else { " " };
            let _ = out.execute(SetForegroundColor(Color::Cyan));
            let _ = out.execute(Print(format!("{} {}\r\n", marker, mensa.name)));
            let _ = out.execute(ResetColor);
        }
        let rating = menu
            .rating
            .map(|r| format!(" [{:.1}/5, {} votes]", r.average, r.votes))
            .unwrap_or_default();
        let _ = writeln!(out, "    {}{}", menu.title, rating);
        for line in menu.description.lines() {
            let _ = writeln!(out, "      {}", line.trim());
        }
    }
    let _ = out.flush();
}
