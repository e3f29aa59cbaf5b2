pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;

use std::sync::Arc;

use clients::{ClaudeClient, GuardianClient, TmdbClient};
pub use config::Config;
use db::Store;
use domain::{TitleKind, TmdbId, UserId};
use services::{
    DefaultRecommendationService, RecommendationService, SeaOrmWatchService, WatchError,
    WatchService,
};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args: Vec<String> = std::env::args().collect();

    let user = UserId::new(
        take_flag(&mut args, "--user").unwrap_or_else(|| config.general.default_user.clone()),
    );

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "recommend" | "rec" => {
            let mut rest: Vec<String> = args[2..].to_vec();
            let limit = take_flag(&mut rest, "--limit").and_then(|v| v.parse().ok());
            let kind = match rest.first() {
                Some(raw) => match raw.parse() {
                    Ok(kind) => kind,
                    Err(_) => {
                        println!("Unknown kind '{}'. Use 'film' or 'series'.", raw);
                        return Ok(());
                    }
                },
                None => TitleKind::Film,
            };
            cmd_recommend(&config, &user, kind, limit).await
        }

        "search" | "s" => {
            let mut rest: Vec<String> = args[2..].to_vec();
            let kind = match take_flag(&mut rest, "--kind") {
                Some(raw) => match raw.parse() {
                    Ok(kind) => Some(kind),
                    Err(_) => {
                        println!("Unknown kind '{}'. Use 'film' or 'series'.", raw);
                        return Ok(());
                    }
                },
                None => None,
            };
            if rest.is_empty() {
                println!("Usage: watchnext search <query> [--kind film|series]");
                return Ok(());
            }
            cmd_search(&config, &rest.join(" "), kind).await
        }

        "watched" | "w" => {
            if args.len() < 5 {
                println!("Usage: watchnext watched <tmdb_id> <film|series> <rating 1-5> [notes...]");
                println!("Example: watchnext watched 27205 film 5 mind-bending");
                return Ok(());
            }
            let Some(tmdb_id) = parse_tmdb_id(&args[2]) else {
                println!("Invalid TMDB ID: {}", args[2]);
                return Ok(());
            };
            let Ok(kind) = args[3].parse::<TitleKind>() else {
                println!("Unknown kind '{}'. Use 'film' or 'series'.", args[3]);
                return Ok(());
            };
            let Ok(rating) = args[4].parse::<i32>() else {
                println!("Invalid rating '{}'. Use a number from 1 to 5.", args[4]);
                return Ok(());
            };
            let notes = if args.len() > 5 {
                Some(args[5..].join(" "))
            } else {
                None
            };
            cmd_watched(&config, &user, tmdb_id, kind, rating, notes).await
        }

        "history" | "h" => {
            let limit = args
                .get(2)
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::limits::DEFAULT_HISTORY_LIMIT);
            cmd_history(&config, &user, limit).await
        }

        "watchlist" | "wl" => {
            if args.len() < 3 {
                println!("Usage: watchnext watchlist <subcommand>");
                println!("Subcommands: add, list, remove");
                return Ok(());
            }
            match args[2].as_str() {
                "add" => {
                    if args.len() < 5 {
                        println!("Usage: watchnext watchlist add <tmdb_id> <film|series>");
                        return Ok(());
                    }
                    let Some(tmdb_id) = parse_tmdb_id(&args[3]) else {
                        println!("Invalid TMDB ID: {}", args[3]);
                        return Ok(());
                    };
                    let Ok(kind) = args[4].parse::<TitleKind>() else {
                        println!("Unknown kind '{}'. Use 'film' or 'series'.", args[4]);
                        return Ok(());
                    };
                    cmd_watchlist_add(&config, &user, tmdb_id, kind).await
                }
                "list" | "ls" => cmd_watchlist_list(&config, &user).await,
                "remove" | "rm" => {
                    if args.len() < 4 {
                        println!("Usage: watchnext watchlist remove <tmdb_id>");
                        return Ok(());
                    }
                    let Some(tmdb_id) = parse_tmdb_id(&args[3]) else {
                        println!("Invalid TMDB ID: {}", args[3]);
                        return Ok(());
                    };
                    cmd_watchlist_remove(&config, &user, tmdb_id).await
                }
                _ => {
                    println!("Unknown watchlist subcommand: {}", args[2]);
                    println!("Use: add, list, remove");
                    Ok(())
                }
            }
        }

        "dismiss" => {
            if args.len() < 4 {
                println!("Usage: watchnext dismiss <tmdb_id> <film|series>");
                return Ok(());
            }
            let Some(tmdb_id) = parse_tmdb_id(&args[2]) else {
                println!("Invalid TMDB ID: {}", args[2]);
                return Ok(());
            };
            let Ok(kind) = args[3].parse::<TitleKind>() else {
                println!("Unknown kind '{}'. Use 'film' or 'series'.", args[3]);
                return Ok(());
            };
            cmd_dismiss(&config, &user, tmdb_id, kind).await
        }

        "undismiss" => {
            if args.len() < 3 {
                println!("Usage: watchnext undismiss <tmdb_id>");
                return Ok(());
            }
            let Some(tmdb_id) = parse_tmdb_id(&args[2]) else {
                println!("Invalid TMDB ID: {}", args[2]);
                return Ok(());
            };
            cmd_undismiss(&config, &user, tmdb_id).await
        }

        "dismissed" => cmd_dismissed(&config, &user).await,

        "init" | "--init" => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Add your API keys to config.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("WatchNext - Personal Watch Tracker");
    println!("Tracks what you watch and recommends what to watch next");
    println!();
    println!("USAGE:");
    println!("  watchnext <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  recommend [film|series]  Build ranked recommendations (--limit N)");
    println!("  search <query>           Search the TMDB catalog (--kind film|series)");
    println!("  watched <id> <kind> <rating> [notes]");
    println!("                           Rate a title you have watched (1-5 stars)");
    println!("  history [n]              Show recent watch history (default: 10)");
    println!("  watchlist <subcommand>   Manage the watchlist");
    println!("  dismiss <id> <kind>      Keep a title out of recommendations");
    println!("  undismiss <id>           Allow a dismissed title again");
    println!("  dismissed                Show dismissed titles");
    println!("  init                     Create default config file");
    println!("  help                     Show this help message");
    println!();
    println!("WATCHLIST SUBCOMMANDS:");
    println!("  watchlist add <id> <kind>   Add a title to the watchlist");
    println!("  watchlist list              Show the watchlist");
    println!("  watchlist remove <id>       Remove a title from the watchlist");
    println!();
    println!("OPTIONS:");
    println!("  --user <id>              Act as another user (default from config.toml)");
    println!();
    println!("EXAMPLES:");
    println!("  watchnext search inception            # Find a title's TMDB ID");
    println!("  watchnext watched 27205 film 5        # Rate Inception 5 stars");
    println!("  watchnext recommend film --limit 10   # Top 10 film recommendations");
    println!("  watchnext watchlist add 603 film      # Save The Matrix for later");
    println!("  watchnext dismiss 299534 film         # Stop recommending Endgame");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to set API keys (TMDB, Guardian, Anthropic).");
    println!("  Keys can also come from WATCHNEXT_TMDB_API_KEY,");
    println!("  WATCHNEXT_GUARDIAN_API_KEY and WATCHNEXT_ANTHROPIC_API_KEY.");
}

fn parse_tmdb_id(raw: &str) -> Option<TmdbId> {
    raw.parse::<i32>().ok().filter(|id| *id > 0).map(TmdbId::new)
}

/// Removes `name <value>` from the argument list and returns the value.
fn take_flag(args: &mut Vec<String>, name: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == name)?;
    if idx + 1 >= args.len() {
        args.remove(idx);
        return None;
    }
    let value = args.remove(idx + 1);
    args.remove(idx);
    Some(value)
}

fn format_date(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

async fn watch_service(config: &Config) -> anyhow::Result<SeaOrmWatchService> {
    let store = open_store(config).await?;
    Ok(SeaOrmWatchService::new(
        store,
        Arc::new(TmdbClient::new(&config.tmdb)),
        Arc::new(GuardianClient::new(&config.guardian)),
        config.recommendations.clone(),
    ))
}

async fn recommendation_service(config: &Config) -> anyhow::Result<DefaultRecommendationService> {
    let store = open_store(config).await?;
    Ok(DefaultRecommendationService::new(
        store,
        Arc::new(TmdbClient::new(&config.tmdb)),
        Arc::new(GuardianClient::new(&config.guardian)),
        Arc::new(ClaudeClient::new(&config.claude)),
        config.recommendations.clone(),
    ))
}

/// Conflicts and bad input print as plain messages; everything else bubbles up.
fn report_or_bail(err: WatchError) -> anyhow::Result<()> {
    match err {
        WatchError::NotFound(_)
        | WatchError::AlreadyInWatchlist(_)
        | WatchError::AlreadyDismissed(_)
        | WatchError::InvalidRating(_) => {
            println!("{err}");
            Ok(())
        }
        other => Err(other.into()),
    }
}

async fn cmd_recommend(
    config: &Config,
    user: &UserId,
    kind: TitleKind,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let service = recommendation_service(config).await?;

    println!("Building {} recommendations...", kind);
    let recommendations = service.recommend(user, kind, limit).await?;

    if recommendations.is_empty() {
        println!("No recommendations available yet.");
        println!();
        println!("Rate a few titles first: watchnext watched <tmdb_id> {} 5", kind);
        return Ok(());
    }

    println!();
    println!("Recommendations ({} total)", recommendations.len());
    println!("{:-<70}", "");

    for (i, rec) in recommendations.iter().enumerate() {
        let year = rec
            .release_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();

        println!("{}. {}{}  [score {:.0}]", i + 1, rec.title, year, rec.score);

        let mut ratings = format!("TMDB {:.1}/10", rec.vote_average);
        if let Some(stars) = rec.review_rating {
            ratings.push_str(&format!(" | Guardian {}/5", stars));
        }
        println!("   {} | ID: {}", ratings, rec.tmdb_id);
        println!("   {}", rec.reasoning);
        if let Some(url) = &rec.review_url {
            println!("   Review: {}", url);
        }
        println!();
    }

    println!("Not interested in one? watchnext dismiss <tmdb_id> {}", kind);

    Ok(())
}

async fn cmd_search(config: &Config, query: &str, kind: Option<TitleKind>) -> anyhow::Result<()> {
    println!("Searching for: {}", query);

    let service = watch_service(config).await?;
    let results = service.search(query, kind).await?;

    if results.is_empty() {
        println!("No titles found matching '{}'", query);
        return Ok(());
    }

    println!();
    println!("Search Results:");
    println!("{:-<60}", "");

    for title in results.iter().take(constants::limits::MAX_SEARCH_RESULTS) {
        let year = title
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        let kind_label = kind.map(|k| k.as_str()).unwrap_or_else(|| {
            match title.media_type.as_deref() {
                Some("tv") => "series",
                _ => "film",
            }
        });

        println!("• {} ({})", title.title, year);
        println!(
            "  Kind: {} | TMDB {:.1}/10 | ID: {}",
            kind_label, title.vote_average, title.id
        );
        if let Some(overview) = &title.overview {
            let short: String = overview.chars().take(120).collect();
            if short.chars().count() < overview.chars().count() {
                println!("  {}...", short);
            } else {
                println!("  {}", short);
            }
        }
        println!();
    }

    println!("Track one: watchnext watchlist add <tmdb_id> <film|series>");

    Ok(())
}

async fn cmd_watched(
    config: &Config,
    user: &UserId,
    tmdb_id: TmdbId,
    kind: TitleKind,
    rating: i32,
    notes: Option<String>,
) -> anyhow::Result<()> {
    let service = watch_service(config).await?;

    match service.mark_watched(user, tmdb_id, kind, rating, notes).await {
        Ok(item) => {
            let year = item
                .release_year
                .map(|y| format!(" ({})", y))
                .unwrap_or_default();
            println!("✓ Marked '{}'{} as watched - {}/5", item.title, year, item.rating);
            Ok(())
        }
        Err(err) => report_or_bail(err),
    }
}

async fn cmd_history(config: &Config, user: &UserId, limit: u64) -> anyhow::Result<()> {
    let service = watch_service(config).await?;
    let items = service.history(user, None, Some(limit)).await?;

    if items.is_empty() {
        println!("No watch history yet.");
        println!();
        println!("Rate something with: watchnext watched <tmdb_id> film 5");
        return Ok(());
    }

    println!("Watch History (last {})", items.len());
    println!("{:-<70}", "");

    for item in &items {
        let year = item
            .release_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        let stars = "★".repeat(item.rating.clamp(0, 5) as usize);

        println!("• {}{}  {} {}/5", item.title, year, stars, item.rating);
        println!(
            "  {} | watched {} | ID: {}",
            item.kind,
            format_date(&item.watched_at),
            item.tmdb_id
        );
        if let Some(notes) = &item.notes {
            println!("  Notes: {}", notes);
        }
    }

    Ok(())
}

async fn cmd_watchlist_add(
    config: &Config,
    user: &UserId,
    tmdb_id: TmdbId,
    kind: TitleKind,
) -> anyhow::Result<()> {
    let service = watch_service(config).await?;

    match service.add_to_watchlist(user, tmdb_id, kind).await {
        Ok(item) => {
            let year = item
                .release_year
                .map(|y| format!(" ({})", y))
                .unwrap_or_default();
            println!("✓ Added '{}'{} to watchlist", item.title, year);
            Ok(())
        }
        Err(err) => report_or_bail(err),
    }
}

async fn cmd_watchlist_list(config: &Config, user: &UserId) -> anyhow::Result<()> {
    let service = watch_service(config).await?;
    let items = service.watchlist(user, None).await?;

    if items.is_empty() {
        println!("Watchlist is empty.");
        println!();
        println!("Find something with: watchnext search <query>");
        return Ok(());
    }

    println!("Watchlist ({} total)", items.len());
    println!("{:-<70}", "");

    for item in &items {
        let year = item
            .release_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        println!("• {}{} [{}]", item.title, year, item.kind);
        println!(
            "  added {} | ID: {}",
            format_date(&item.added_at),
            item.tmdb_id
        );
    }

    Ok(())
}

async fn cmd_watchlist_remove(
    config: &Config,
    user: &UserId,
    tmdb_id: TmdbId,
) -> anyhow::Result<()> {
    let service = watch_service(config).await?;

    match service.remove_from_watchlist(user, tmdb_id).await {
        Ok(()) => {
            println!("✓ Removed title {} from watchlist", tmdb_id);
            Ok(())
        }
        Err(err) => report_or_bail(err),
    }
}

async fn cmd_dismiss(
    config: &Config,
    user: &UserId,
    tmdb_id: TmdbId,
    kind: TitleKind,
) -> anyhow::Result<()> {
    let service = watch_service(config).await?;

    match service.dismiss(user, tmdb_id, kind).await {
        Ok(()) => {
            println!("✓ Dismissed title {}. It will stay out of recommendations.", tmdb_id);
            println!("  Changed your mind? watchnext undismiss {}", tmdb_id);
            Ok(())
        }
        Err(err) => report_or_bail(err),
    }
}

async fn cmd_undismiss(config: &Config, user: &UserId, tmdb_id: TmdbId) -> anyhow::Result<()> {
    let service = watch_service(config).await?;

    match service.undismiss(user, tmdb_id).await {
        Ok(()) => {
            println!("✓ Title {} can be recommended again", tmdb_id);
            Ok(())
        }
        Err(err) => report_or_bail(err),
    }
}

async fn cmd_dismissed(config: &Config, user: &UserId) -> anyhow::Result<()> {
    let service = watch_service(config).await?;
    let items = service.dismissed(user).await?;

    if items.is_empty() {
        println!("Nothing dismissed.");
        return Ok(());
    }

    println!("Dismissed Titles ({} total)", items.len());
    println!("{:-<70}", "");

    for item in &items {
        let year = item
            .release_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        println!("• {}{} [{}]", item.title, year, item.kind);
        println!(
            "  dismissed {} | ID: {}",
            format_date(&item.dismissed_at),
            item.tmdb_id
        );
    }

    println!();
    println!("Allow one again with: watchnext undismiss <tmdb_id>");

    Ok(())
}
