mod agenda;
mod clock;
mod notify;
mod prices;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;

use crate::agenda::form::FormSession;
use crate::agenda::model::{Category, Event, EventId, load_agenda, save_agenda};
use crate::agenda::store::EventStore;
use crate::clock::ClockTime;
use crate::notify::Notifier;
use crate::prices::{PollerConfig, PricePoller, Trend, format_price};
use crate::settings::{Settings, SettingsStore};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCategory {
    Work,
    Personal,
    Important,
}

impl From<CliCategory> for Category {
    fn from(value: CliCategory) -> Self {
        match value {
            CliCategory::Work => Category::Work,
            CliCategory::Personal => Category::Personal,
            CliCategory::Important => Category::Important,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "dayplan",
    version,
    about = "Daily agenda shell with webhook notifications"
)]
struct Cli {
    #[arg(long, default_value = "agenda.json")]
    agenda: PathBuf,

    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    #[arg(long)]
    notify_url: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        time: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        location: String,

        #[arg(long, value_enum, default_value_t = CliCategory::Work)]
        category: CliCategory,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Edit {
        id: EventId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        time: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long, value_enum)]
        category: Option<CliCategory>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Remove {
        id: EventId,
    },
    Seed {
        #[arg(long)]
        force: bool,
    },
    Prices {
        #[arg(long, default_value = prices::DEFAULT_TICKER_ENDPOINT)]
        endpoint: String,
    },
    Settings {
        #[arg(long)]
        dark_mode: Option<bool>,

        #[arg(long)]
        crypto_prices: Option<bool>,

        #[arg(long)]
        assistant: Option<bool>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let _logger = flexi_logger::Logger::try_with_env_or_str(&cli.log_level)
        .context("invalid log level")?
        .start()
        .context("failed to start logger")?;

    match cli.command {
        Command::List => cmd_list(&cli.agenda),
        Command::Add {
            ref title,
            ref time,
            ref description,
            ref location,
            category,
            date,
        } => cmd_add(
            &cli,
            title.clone(),
            time.clone(),
            description.clone(),
            location.clone(),
            category,
            date,
        ),
        Command::Edit {
            id,
            ref title,
            ref time,
            ref description,
            ref location,
            category,
            date,
        } => cmd_edit(
            &cli.agenda,
            id,
            title.clone(),
            time.clone(),
            description.clone(),
            location.clone(),
            category,
            date,
        ),
        Command::Remove { id } => cmd_remove(&cli.agenda, id),
        Command::Seed { force } => cmd_seed(&cli.agenda, force),
        Command::Prices { ref endpoint } => cmd_prices(&cli.settings, endpoint.clone()),
        Command::Settings {
            dark_mode,
            crypto_prices,
            assistant,
        } => cmd_settings(&cli.settings, dark_mode, crypto_prices, assistant),
    }
}

fn load_store(path: &Path) -> Result<EventStore> {
    let events =
        load_agenda(path).with_context(|| format!("failed to load {}", path.display()))?;
    Ok(EventStore::new(events))
}

fn cmd_list(agenda: &Path) -> Result<()> {
    let store = load_store(agenda)?;
    render_agenda(&store);
    Ok(())
}

fn cmd_add(
    cli: &Cli,
    title: String,
    time: String,
    description: String,
    location: String,
    category: CliCategory,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut store = load_store(&cli.agenda)?;
    let notifier = match &cli.notify_url {
        Some(url) => Some(Notifier::new(url.clone())?),
        None => None,
    };

    let mut session = FormSession::new();
    let draft = session.open_blank();
    draft.title = title;
    draft.time = time;
    draft.description = description;
    draft.location = location;
    draft.category = category.into();
    draft.date = date;

    let submission = session
        .submit(&mut store, notifier.as_ref())
        .context("could not add event")?;
    save_agenda(&cli.agenda, store.list())?;
    println!(
        "Added event {} at {}.",
        submission.event.id, submission.event.time
    );
    render_agenda(&store);

    if let Some(handle) = submission.notification {
        // The agenda is already saved; a webhook failure is only a warning.
        if let Err(err) = handle.outcome() {
            warn!("{err}");
            eprintln!("warning: {err}");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_edit(
    agenda: &Path,
    id: EventId,
    title: Option<String>,
    time: Option<String>,
    description: Option<String>,
    location: Option<String>,
    category: Option<CliCategory>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut store = load_store(agenda)?;
    let mut session = FormSession::new();
    let draft = session
        .open_edit(&store, id)
        .context("could not open event for editing")?;
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(time) = time {
        draft.time = time;
    }
    if let Some(description) = description {
        draft.description = description;
    }
    if let Some(location) = location {
        draft.location = location;
    }
    if let Some(category) = category {
        draft.category = category.into();
    }
    if let Some(date) = date {
        draft.date = Some(date);
    }

    let submission = session
        .submit(&mut store, None)
        .with_context(|| format!("could not update event {id}"))?;
    save_agenda(agenda, store.list())?;
    println!("Updated event {}.", submission.event.id);
    render_agenda(&store);
    Ok(())
}

fn cmd_remove(agenda: &Path, id: EventId) -> Result<()> {
    let mut store = load_store(agenda)?;
    let removed = store.remove(id)?;
    save_agenda(agenda, store.list())?;
    println!("Removed event {} ('{}').", removed.id, removed.title);
    render_agenda(&store);
    Ok(())
}

fn cmd_seed(agenda: &Path, force: bool) -> Result<()> {
    if agenda.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            agenda.display()
        );
    }
    let events = starter_events()?;
    save_agenda(agenda, &events)?;
    println!(
        "Wrote starter agenda with {} events to {}.",
        events.len(),
        agenda.display()
    );
    Ok(())
}

fn cmd_prices(settings: &Path, endpoint: String) -> Result<()> {
    let settings = SettingsStore::load(settings)?;
    if !settings.current().show_crypto_prices {
        println!(
            "Crypto prices are disabled; enable with `dayplan settings --crypto-prices true`."
        );
        return Ok(());
    }

    let poller = PricePoller::start(PollerConfig {
        endpoint,
        ..PollerConfig::default()
    })?;
    if !poller.wait_for_first_refresh(Duration::from_secs(10)) {
        bail!("no price snapshot arrived within 10 seconds");
    }
    for quote in poller.latest() {
        let marker = match quote.trend {
            Trend::Up => "^",
            Trend::Down => "v",
            Trend::Flat => " ",
        };
        println!(
            "{:<4} {:>12} {marker}",
            quote.symbol,
            format_price(quote.price)
        );
    }
    Ok(())
}

fn cmd_settings(
    path: &Path,
    dark_mode: Option<bool>,
    crypto_prices: Option<bool>,
    assistant: Option<bool>,
) -> Result<()> {
    let mut store = SettingsStore::load(path)?;
    if dark_mode.is_none() && crypto_prices.is_none() && assistant.is_none() {
        render_settings(&store.current());
        return Ok(());
    }

    store.subscribe(Box::new(|_| println!("Settings saved.")));
    let updated = store.update(|settings| {
        if let Some(value) = dark_mode {
            settings.dark_mode = value;
        }
        if let Some(value) = crypto_prices {
            settings.show_crypto_prices = value;
        }
        if let Some(value) = assistant {
            settings.enable_assistant = value;
        }
    })?;
    render_settings(&updated);
    Ok(())
}

fn render_settings(settings: &Settings) {
    println!("darkMode: {}", settings.dark_mode);
    println!("showCryptoPrices: {}", settings.show_crypto_prices);
    println!("enableAssistant: {}", settings.enable_assistant);
}

fn render_agenda(store: &EventStore) {
    if store.is_empty() {
        println!("No events scheduled.");
        return;
    }
    println!("Today's events ({}):", store.len());
    for event in store.list() {
        let mut line = format!(
            "  [{}] {:>8}  {} ({})",
            event.id,
            event.time.to_string(),
            event.title,
            event.category
        );
        if let Some(date) = event.date {
            line.push_str(&format!(" on {date}"));
        }
        if !event.location.is_empty() {
            line.push_str(&format!(" @ {}", event.location));
        }
        println!("{line}");
        if !event.description.is_empty() {
            println!("        {}", event.description);
        }
    }
}

fn starter_events() -> Result<Vec<Event>> {
    let entries = [
        (
            1,
            "09:00",
            "Team Standup Meeting",
            "Daily sync with development team",
            "Conference Room A",
            Category::Work,
        ),
        (
            2,
            "11:30",
            "Client Presentation",
            "Quarterly project proposal",
            "Virtual - Zoom",
            Category::Important,
        ),
        (
            3,
            "13:00",
            "Lunch Break",
            "Lunch with marketing team",
            "Office Cafeteria",
            Category::Personal,
        ),
        (
            4,
            "15:30",
            "Code Review Session",
            "Review pull requests and deployment",
            "Development Lab",
            Category::Work,
        ),
        (
            5,
            "18:00",
            "Gym Workout",
            "Upper body strength training",
            "Downtown Fitness Center",
            Category::Personal,
        ),
    ];

    let mut events = Vec::with_capacity(entries.len());
    for (id, time, title, description, location, category) in entries {
        events.push(Event {
            id,
            time: ClockTime::parse(time)?,
            title: title.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            category,
            date: None,
        });
    }
    Ok(events)
}
