use std::collections::HashMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::models::{TIME_FORMAT, Tournament};

pub const DEFAULT_GRADIENT: &str = "from-gray-400 to-gray-600";

static GAME_GRADIENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut gradients = HashMap::new();

    gradients.insert("Pokemon", "from-yellow-400 to-orange-500");
    gradients.insert("One Piece", "from-blue-400 to-cyan-500");
    gradients.insert("Yu-Gi-Oh", "from-purple-500 to-pink-500");
    gradients.insert("Magic", "from-red-500 to-orange-600");

    gradients
});

pub fn game_gradient(game: &str) -> &'static str {
    GAME_GRADIENTS.get(game).copied().unwrap_or(DEFAULT_GRADIENT)
}

/// One tournament as the listing grid shows it.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentCard {
    pub id: i64,
    pub store_name: String,
    pub location: String,
    pub date_label: String,
    pub time: String,
    pub prize: Option<String>,
    pub game: String,
    pub category: String,
    pub format: String,
    pub image: Option<String>,
    pub upcoming: bool,
    pub badge_label: &'static str,
    pub badge_class: &'static str,
    pub gradient: &'static str,
}

impl TournamentCard {
    /// Tournaments dated today still count as upcoming.
    pub fn new(tournament: &Tournament, today: NaiveDate) -> Self {
        let upcoming = tournament.date >= today;

        Self {
            id: tournament.id,
            store_name: tournament.store_name.clone(),
            location: tournament.location.clone(),
            date_label: tournament.date.format("%d %b").to_string(),
            time: tournament.time.format(TIME_FORMAT).to_string(),
            prize: tournament.prize.clone(),
            game: tournament.game.clone(),
            category: tournament.category.clone(),
            format: tournament.format.clone(),
            image: tournament.image.clone(),
            upcoming,
            badge_label: if upcoming { "PROX" } else { "PAST" },
            badge_class: if upcoming { "bg-red-500" } else { "bg-gray-400" },
            gradient: game_gradient(&tournament.game),
        }
    }
}

pub fn build_cards(tournaments: &[Tournament], today: NaiveDate) -> Vec<TournamentCard> {
    tournaments
        .iter()
        .map(|t| TournamentCard::new(t, today))
        .collect()
}
