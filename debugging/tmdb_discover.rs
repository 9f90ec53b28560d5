//! Run the discover + details pipeline for one or two genres and print the cards.
//! Usage:
//!   cargo run --bin tmdb_discover -- comedy
//!   cargo run --bin tmdb_discover -- comedy romance
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use dotenvy::dotenv;
use movie_match::config::Config;
use movie_match::genre::Genre;
use movie_match::recommend::{build_card, discover_movies, FilterOverrides, Filters};
use movie_match::scoring::GenreResult;
use movie_match::tmdb::TmdbClient;
use std::env;

fn parse_genre(input: &str) -> Result<Genre> {
    let genre = match input.to_lowercase().as_str() {
        "drama" | "드라마" => Genre::Drama,
        "romance" | "로맨스" => Genre::Romance,
        "comedy" | "코미디" => Genre::Comedy,
        "action" | "액션" => Genre::Action,
        "scifi" | "sf" | "sci-fi" => Genre::SciFi,
        "fantasy" | "판타지" => Genre::Fantasy,
        other => return Err(anyhow!("unknown genre '{}'", other)),
    };
    Ok(genre)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.as_slice() {
        [one] => GenreResult::Single(parse_genre(one)?),
        [one, two] => GenreResult::Composite(parse_genre(one)?, parse_genre(two)?),
        _ => return Err(anyhow!("usage: tmdb_discover <genre> [second_genre]")),
    };

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?.context("TMDB_API_KEY not set")?;
    let filters = Filters::resolve(&config.filters, &FilterOverrides::default());

    let (items, relaxed) = discover_movies(&client, &result, &filters, Utc::now().date_naive())
        .await?;
    println!("{} -> {} result(s), relaxed: {}", result.label(), items.len(), relaxed);

    for item in items {
        let card = build_card(&client, item, &filters).await;
        println!("{}", serde_json::to_string_pretty(&card)?);
    }
    Ok(())
}
