use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};
use uuid::Uuid;

use vibechef::api::ApiService;
use vibechef::device::{DeviceCapabilities, Presenter};
use vibechef::recipes::FullRecipe;
use vibechef::state::{Diet, Flag};
use vibechef::swipe::SwipeEngine;
use vibechef::ui::{
    ComponentHost, DomEvent, Element, FatalErrorScreen, FatalErrorState, Mountable, VibeCard,
    APP_RELOAD,
};
use vibechef::{AppConfig, EventBus, RecipeFlow, Services, StateManager};

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
}

#[derive(Debug, thiserror::Error)]
#[error("input closed")]
struct InputClosed;

enum Exit {
    Quit,
    Restart,
}

enum AfterRecipe {
    Back,
    Restart,
    Quit,
}

struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(InputClosed.into()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "vibechef=debug".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    install_panic_hook();

    let config = AppConfig::from_env()?;
    info!(api = %config.api.base_url, "vibechef starting");

    let mut console = Console::new();
    loop {
        let session_config = config.clone();
        let session = tokio::spawn(async move {
            let result = run_session(&session_config, &mut console).await;
            (result, console)
        });

        let detail = match session.await {
            Ok((Ok(Exit::Quit), _)) => break,
            Ok((Ok(Exit::Restart), c)) => {
                console = c;
                continue;
            }
            Ok((Err(e), c)) => {
                console = c;
                if e.is::<InputClosed>() {
                    break;
                }
                error!(error = %e, "session failed");
                e.to_string()
            }
            Err(e) => {
                // the panic hook already logged it; stdin has to be reopened
                console = Console::new();
                e.to_string()
            }
        };

        match show_fatal(&mut console, detail).await {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) if e.is::<InputClosed>() => break,
            Err(e) => return Err(e),
        }
    }

    info!("bye");
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        error!(%location, panic = %payload, "unhandled panic");
    }));
}

/// Renders the fallback screen. Returns `true` when the user asked to reload.
async fn show_fatal(console: &mut Console, detail: String) -> anyhow::Result<bool> {
    let bus = EventBus::new();
    let reload = Arc::new(AtomicBool::new(false));
    let flag = reload.clone();
    bus.on(APP_RELOAD, move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let root = Element::new("app");
    let mut screen = ComponentHost::new(
        FatalErrorScreen,
        FatalErrorState {
            detail: Some(detail),
            ..FatalErrorState::generic()
        },
        bus,
    )
    .with_container(root.clone());
    screen.mount()?;
    println!("\n{}", to_text(&root.inner_html()));

    let answer = console.ask("[r] Reload  [q] Quit > ").await?;
    if answer.eq_ignore_ascii_case("r") {
        root.dispatch(&DomEvent::control("click", "action", "reload", 0.0));
    }
    Ok(reload.load(Ordering::SeqCst))
}

async fn run_session(config: &AppConfig, console: &mut Console) -> anyhow::Result<Exit> {
    let api = Arc::new(ApiService::new(&config.api)?);
    let state = StateManager::with_history_limit(EventBus::new(), config.state_history_limit);
    let caps = DeviceCapabilities::default();
    let presenter = Presenter::detect(&caps);
    let services = Services::from_api(api.clone());
    let mut flow = RecipeFlow::new(config.clone(), presenter, state, services);

    sign_in(&api, &flow, console).await?;
    if !swipe_vibes(&mut flow, &caps, console).await? {
        return Ok(Exit::Quit);
    }
    gather_context(&flow, console).await?;

    let mut list = fetch_suggestions(&mut flow).await;
    loop {
        println!();
        for s in &list {
            println!("  {}. {} - {}", s.index, s.title, s.description);
        }
        let answer = console
            .ask("Pick a number, [r] for new ideas, [q] to quit > ")
            .await?;
        let id = match answer.to_lowercase().as_str() {
            "q" => return Ok(Exit::Quit),
            "r" => {
                list = fetch_suggestions(&mut flow).await;
                continue;
            }
            n => match n
                .parse::<usize>()
                .ok()
                .and_then(|i| list.iter().find(|s| s.index == i))
            {
                Some(s) => s.id,
                None => {
                    println!("There is no suggestion {n}.");
                    continue;
                }
            },
        };

        let Some(full) = fetch_recipe(&mut flow, id, console).await? else {
            continue;
        };
        println!("\n{}", to_text(&full.formatted.html));

        match after_recipe(&flow, console).await? {
            AfterRecipe::Back => continue,
            AfterRecipe::Restart => return Ok(Exit::Restart),
            AfterRecipe::Quit => return Ok(Exit::Quit),
        }
    }
}

async fn sign_in(api: &ApiService, flow: &RecipeFlow, console: &mut Console) -> anyhow::Result<()> {
    let username = console.ask("Username (blank for guest) > ").await?;
    if username.is_empty() {
        println!("Continuing as guest.");
        return Ok(());
    }
    let password = console.ask("Password > ").await?;
    match api.login(&username, &password).await {
        Ok(()) => match flow.load_profile().await {
            Ok(()) => println!("Welcome back, {username}!"),
            Err(e) => warn!(error = %e, "profile load failed"),
        },
        Err(e) => {
            warn!(error = %e, "login failed");
            println!("Login failed ({e}); continuing as guest.");
        }
    }
    Ok(())
}

/// Returns `false` when the user quit mid-way.
async fn swipe_vibes(
    flow: &mut RecipeFlow,
    caps: &DeviceCapabilities,
    console: &mut Console,
) -> anyhow::Result<bool> {
    let card = Element::new("vibe-card");
    let document = Element::new("document");

    flow.start();
    flow.bind_swipes();
    let mut view = ComponentHost::new(VibeCard, flow.vibe_card_state(), flow.bus().clone())
        .with_container(card.clone());
    view.mount()?;
    let _engine = SwipeEngine::for_presenter(
        flow.presenter(),
        caps,
        card.clone(),
        &document,
        flow.bus().clone(),
    );

    let clock = Instant::now();
    while flow.current_vibe().is_some() {
        println!("\n{}", to_text(&card.inner_html()));
        let answer = console.ask("[y] like  [n] pass  [q] quit > ").await?;
        let dx = match answer.to_lowercase().as_str() {
            "y" | "yes" => 160.0,
            "n" | "no" => -160.0,
            "q" => return Ok(false),
            _ => {
                println!("Please answer y or n.");
                continue;
            }
        };
        drag(
            flow.presenter(),
            &card,
            &document,
            dx,
            clock.elapsed().as_secs_f64() * 1000.0,
        );
        flow.process_pending_swipes();
        let next = flow.vibe_card_state();
        view.set_state(|s| *s = next);
    }

    let liked = flow.state().with_state(|s| {
        s.vibe_profile
            .iter()
            .map(|v| format!("{} {}", v.emoji, v.name))
            .collect::<Vec<_>>()
    });
    if liked.is_empty() {
        println!("\nNo vibes liked. We'll keep it open-minded.");
    } else {
        println!("\nYour vibe: {}", liked.join(", "));
    }
    Ok(true)
}

/// Feeds a synthetic drag through the same input path a real device uses.
fn drag(presenter: Presenter, card: &Element, document: &Element, dx: f64, t0: f64) {
    match presenter {
        Presenter::Pointer => {
            card.dispatch(&DomEvent::mouse("mousedown", 0.0, 0.0, t0));
            document.dispatch(&DomEvent::mouse("mousemove", dx / 2.0, 0.0, t0 + 120.0));
            document.dispatch(&DomEvent::mouse("mouseup", dx, 0.0, t0 + 240.0));
        }
        Presenter::Touch => {
            card.dispatch(&DomEvent::touch("touchstart", 0.0, 0.0, t0));
            card.dispatch(&DomEvent::touch("touchmove", dx / 2.0, 0.0, t0 + 120.0));
            card.dispatch(&DomEvent::touch("touchend", dx, 0.0, t0 + 240.0));
        }
    }
}

async fn gather_context(flow: &RecipeFlow, console: &mut Console) -> anyhow::Result<()> {
    let raw = console
        .ask("Ingredients at home (comma separated, blank to skip) > ")
        .await?;
    let ingredients = flow.set_ingredients(&raw);
    if !ingredients.is_empty() {
        println!("Using: {ingredients}");
    }

    let mut prefs = flow.state().with_state(|s| s.preferences);
    let diet = console
        .ask(&format!(
            "Diet [{}] (None, Vegetarian, Vegan, Pescatarian, Gluten-Free, Dairy-Free, Keto) > ",
            prefs.diet.label()
        ))
        .await?;
    if !diet.is_empty() {
        match Diet::parse(&diet) {
            Some(d) => prefs.diet = d,
            None => println!("Unknown diet {diet:?}; keeping {}.", prefs.diet.label()),
        }
    }
    prefs.budget = yes_no(console, "Budget friendly?", prefs.budget).await?;
    prefs.seasonal_king =
        yes_no(console, "Seasonal ingredients first?", prefs.seasonal_king).await?;

    if let Err(e) = flow.set_preferences(prefs).await {
        println!("Couldn't sync your preferences ({e}); using them for now.");
    }
    Ok(())
}

async fn yes_no(console: &mut Console, question: &str, current: Flag) -> anyhow::Result<Flag> {
    let default = if current.is_set() { "Y/n" } else { "y/N" };
    let answer = console.ask(&format!("{question} [{default}] > ")).await?;
    Ok(match answer.to_lowercase().as_str() {
        "y" | "yes" => Flag::Yes,
        "n" | "no" => Flag::No,
        _ => current,
    })
}

async fn fetch_suggestions(flow: &mut RecipeFlow) -> Vec<vibechef::recipes::RecipeSuggestion> {
    println!("\nFinding recipes for your vibe...");
    flow.request_suggestions().await
}

/// `None` sends the user back to the suggestion list.
async fn fetch_recipe(
    flow: &mut RecipeFlow,
    id: Uuid,
    console: &mut Console,
) -> anyhow::Result<Option<FullRecipe>> {
    loop {
        println!("Cooking up the full recipe...");
        match flow.select_suggestion(id).await {
            Ok(full) => return Ok(Some(full)),
            Err(e) if e.is_retryable() => {
                println!("Couldn't get that recipe: {e}");
                let answer = console.ask("[t] Try Again  [b] Back > ").await?;
                if !answer.eq_ignore_ascii_case("t") {
                    return Ok(None);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn after_recipe(flow: &RecipeFlow, console: &mut Console) -> anyhow::Result<AfterRecipe> {
    loop {
        let answer = console
            .ask("\n[s] Save  [f] Favorites  [b] Back  [n] New vibes  [q] Quit > ")
            .await?;
        match answer.to_lowercase().as_str() {
            "s" => save(flow, console).await?,
            "f" => list_favorites(flow).await,
            "b" => return Ok(AfterRecipe::Back),
            "n" => return Ok(AfterRecipe::Restart),
            "q" => return Ok(AfterRecipe::Quit),
            _ => println!("Pick one of s, f, b, n or q."),
        }
    }
}

async fn save(flow: &RecipeFlow, console: &mut Console) -> anyhow::Result<()> {
    let rating = console.ask("Rating 1-5 (blank to skip) > ").await?;
    let rating = if rating.is_empty() {
        None
    } else {
        match rating.parse::<u8>() {
            Ok(r) => Some(r),
            Err(_) => {
                println!("Ratings are whole numbers from 1 to 5.");
                return Ok(());
            }
        }
    };
    let note = console.ask("Note (blank to skip) > ").await?;
    match flow.save_favorite(rating, Some(note)).await {
        Ok(saved) => {
            let total = flow.state().with_state(|s| s.favorites.len());
            println!("Saved \"{}\". You have {total} favorites.", saved.title);
        }
        Err(e) => println!("Couldn't save: {e}"),
    }
    Ok(())
}

async fn list_favorites(flow: &RecipeFlow) {
    match flow.load_favorites().await {
        Ok(favorites) if favorites.is_empty() => println!("No favorites yet."),
        Ok(favorites) => {
            for f in favorites {
                let stars = f.rating.map(|r| "*".repeat(r as usize)).unwrap_or_default();
                let note = f.note.map(|n| format!(" ({n})")).unwrap_or_default();
                println!("  {:<5} {}{note}", stars, f.title);
            }
        }
        Err(e) => println!("Couldn't load favorites: {e}"),
    }
}

fn to_text(html: &str) -> String {
    let html = html.replace("<li>", "\n- ");
    TAG_RE
        .replace_all(&html, "\n")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&"))
        .collect::<Vec<_>>()
        .join("\n")
}
