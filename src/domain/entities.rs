//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/SQL types here; adapters map their payloads and rows into these.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// ISO week-of-year (1..=53) of a calendar day.
///
/// Only compared, never used for arithmetic. Ordering carries no year, so
/// week 1 of January sorts before week 52 of the previous December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekIdentifier(u32);

impl WeekIdentifier {
    pub fn new(week: u32) -> Self {
        Self(week)
    }

    /// Week containing `day`. Weeks start on Monday (ISO 8601), which is also
    /// how the German locale counts them.
    pub fn of(day: NaiveDate) -> Self {
        Self(day.iso_week().week())
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WeekIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{:02}", self.0)
    }
}

/// Rating metadata attached by the ratings backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuRating {
    /// Average stars, 0.0 to 5.0.
    pub average: f64,
    pub votes: u32,
}

/// A single dish offered on one day at one mensa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub rating: Option<MenuRating>,
}

impl Menu {
    pub fn new(
        id: i64,
        title: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            date,
            rating: None,
        }
    }
}

// Ids are assigned by whichever store produced the menu; ratings are attached later.
impl PartialEq for Menu {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.date == other.date
    }
}

/// Menus served on one day at one mensa. All menus share the same date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMenuplan {
    date: NaiveDate,
    menus: Vec<Menu>,
}

impl DailyMenuplan {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            menus: Vec::new(),
        }
    }

    /// Adds a menu. Menus of another day are rejected and handed back.
    pub fn add(&mut self, menu: Menu) -> Result<(), Menu> {
        if menu.date != self.date {
            return Err(menu);
        }
        self.menus.push(menu);
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn menus(&self) -> &[Menu] {
        &self.menus
    }

    pub fn menus_mut(&mut self) -> &mut [Menu] {
        &mut self.menus
    }
}

/// One mensa's menus for a calendar week, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMenuplan {
    days: BTreeMap<NaiveDate, DailyMenuplan>,
}

impl WeeklyMenuplan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the menu under its day, creating the day on first use.
    pub fn add(&mut self, menu: Menu) {
        let date = menu.date;
        let plan = self
            .days
            .entry(date)
            .or_insert_with(|| DailyMenuplan::new(date));
        // Keyed by the menu's own date, so the day always matches.
        let _ = plan.add(menu);
    }

    /// Week of the first day in the plan, `None` for an empty plan.
    pub fn week(&self) -> Option<WeekIdentifier> {
        self.days.keys().next().map(|d| WeekIdentifier::of(*d))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn menus_for(&self, day: NaiveDate) -> &[Menu] {
        self.days.get(&day).map(|p| p.menus()).unwrap_or(&[])
    }

    pub fn menus(&self) -> impl Iterator<Item = &Menu> {
        self.days.values().flat_map(|p| p.menus().iter())
    }

    pub fn menus_mut(&mut self) -> impl Iterator<Item = &mut Menu> {
        self.days.values_mut().flat_map(|p| p.menus_mut().iter_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// A university cafeteria and its current weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mensa {
    pub id: i64,
    pub name: String,
    pub street: String,
    pub zip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_favorite: bool,
    /// Last change of the mensa entry on the web service (unix seconds).
    pub timestamp: i64,
    pub menuplan: WeeklyMenuplan,
}

/// Everything one source produced: all mensas with their weekly plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub mensas: Vec<Mensa>,
    /// Week of the contained menus; `None` when no mensa has a plan.
    pub week: Option<WeekIdentifier>,
}

impl MenuSnapshot {
    /// Builds a snapshot and derives its week from the first non-empty plan.
    pub fn new(mensas: Vec<Mensa>) -> Self {
        let week = mensas.iter().find_map(|m| m.menuplan.week());
        Self { mensas, week }
    }

    pub fn mensa(&self, id: i64) -> Option<&Mensa> {
        self.mensas.iter().find(|m| m.id == id)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &Mensa> {
        self.mensas.iter().filter(|m| m.is_favorite)
    }

    /// Union of all days any mensa serves, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.mensas.iter().flat_map(|m| m.menuplan.days()).collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Menus served on `day`, paired with their mensa. Favorites come first.
    pub fn menus_on(&self, day: NaiveDate) -> Vec<(&Mensa, &Menu)> {
        let mut out: Vec<(&Mensa, &Menu)> = self
            .mensas
            .iter()
            .flat_map(|m| m.menuplan.menus_for(day).iter().map(move |menu| (m, menu)))
            .collect();
        out.sort_by_key(|(m, _)| !m.is_favorite);
        out
    }

    pub fn rated_menus(&self) -> usize {
        self.mensas
            .iter()
            .flat_map(|m| m.menuplan.menus())
            .filter(|menu| menu.rating.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.mensas.is_empty()
    }
}
