use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use pathshala::cancel::{AbortController, AbortSignal};
use pathshala::client::{AudioClip, Diagram, TutorClient};
use pathshala::config::Config;
use pathshala::curriculum::{ExamSession, ExamTerm, SummaryLength};
use pathshala::errors::ApiError;
use pathshala::notice::{empty_fallback, quota_prompt_text, route_error, Notice};
use pathshala::providers::{ApiKeyHandle, GeminiProvider};
use pathshala::remediation::{
    read_api_key, remediate_shared, save_api_key, KeyEntryFlow, RemediationOutcome, RemediationPrompt, SharedPrompt,
};
use pathshala::render;
use pathshala::session::{ChatMessage, StudySession, TurnOutcome};
use pathshala::settings::{Language, Settings, StorageWarning, Theme};
use pathshala::storage::{FileStore, KeyValueStore, MemoryStore};
use pathshala::utils::media::Attachment;
use pathshala::utils::paths;

#[derive(Parser)]
#[command(name = "pathshala")]
#[command(about = "WBBSE Hindi-medium study companion powered by Gemini")]
struct Args {
    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Path to config.toml")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a question, optionally with an attached file
    Solve {
        problem: Vec<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Interactive tutor chat
    Chat,
    /// Summarise a chapter
    Summary {
        title: String,
        #[arg(short, long)]
        subject: String,
        #[arg(short, long, default_value = "medium")]
        length: SummaryLength,
    },
    /// Board-style questions and answers for a chapter
    Questions {
        title: String,
        #[arg(short, long)]
        subject: String,
    },
    /// Timed multiple-choice practice exam
    Exam {
        subject: String,
        #[arg(short, long, default_value = "10")]
        level: String,
        #[arg(short, long, default_value = "Summative 1")]
        term: ExamTerm,
        #[arg(long, help = "Resume the saved exam")]
        resume: bool,
    },
    /// Generate a printable sample paper
    Paper {
        subject: String,
        #[arg(long = "class", default_value = "Class 10")]
        class_label: String,
        #[arg(short, long, default_value = "Summative 1")]
        term: ExamTerm,
        #[arg(long, help = "Include answers")]
        answers: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Translate text
    Translate {
        text: Vec<String>,
        #[arg(long, default_value = "Hindi")]
        to: String,
    },
    /// Synthesise speech into a WAV file
    Speak {
        text: Vec<String>,
        #[arg(long)]
        voice: Option<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate a labelled diagram
    Diagram {
        topic: Vec<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show or clear the search history
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Show or change settings
    Settings {
        #[arg(long)]
        lang: Option<Language>,
        #[arg(long, conflicts_with = "light")]
        dark: bool,
        #[arg(long)]
        light: bool,
    },
    /// Save a Gemini API key
    Login,
}

struct App {
    data_dir: PathBuf,
    settings: Settings,
    client: TutorClient,
    prompt: SharedPrompt,
    key_handle: ApiKeyHandle,
}

impl App {
    fn language(&self) -> Language {
        self.settings.language()
    }
}

/// Aborts the armed signal when Ctrl-C is pressed while a request is in flight.
struct CtrlC {
    signal: AbortSignal,
    watcher: tokio::task::JoinHandle<()>,
}

impl CtrlC {
    fn arm() -> Self {
        let controller = AbortController::new();
        let signal = controller.signal();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.abort();
            }
        });
        Self { signal, watcher }
    }

    fn signal(&self) -> &AbortSignal {
        &self.signal
    }
}

impl Drop for CtrlC {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = paths::resolve_data_dir(config.storage.data_dir.as_deref())?;

    // Keys saved by `login` live in the data-dir .env
    let env_path = paths::env_file(&data_dir);
    if env_path.exists() {
        dotenv::from_path(&env_path).ok();
        config.apply_env();
    }

    let command = match args.command {
        Some(Commands::Login) => return handle_login(&data_dir).await,
        Some(command) => command,
        None => Commands::Chat,
    };

    let mut app = build_app(config, data_dir)?;

    match command {
        Commands::Solve { problem, file } => handle_solve(&mut app, &problem.join(" "), file.as_deref()).await?,
        Commands::Chat => run_interactive_mode(&mut app).await?,
        Commands::Summary { title, subject, length } => handle_summary(&app, &title, &subject, length).await?,
        Commands::Questions { title, subject } => handle_questions(&app, &title, &subject).await?,
        Commands::Exam {
            subject,
            level,
            term,
            resume,
        } => run_exam(&mut app, &subject, &level, term, resume).await?,
        Commands::Paper {
            subject,
            class_label,
            term,
            answers,
            out,
        } => handle_paper(&app, &subject, &class_label, term, answers, out.as_deref()).await?,
        Commands::Translate { text, to } => handle_translate(&app, &text.join(" "), &to).await?,
        Commands::Speak { text, voice, out } => handle_speak(&app, &text.join(" "), voice, out).await?,
        Commands::Diagram { topic, out } => handle_diagram(&mut app, &topic.join(" "), out).await?,
        Commands::History { clear } => handle_history(&mut app, clear),
        Commands::Settings { lang, dark, light } => handle_settings(&mut app, lang, dark, light),
        Commands::Login => {}
    }

    Ok(())
}

fn build_app(config: Config, data_dir: PathBuf) -> Result<App> {
    let store: Box<dyn KeyValueStore> = match FileStore::open(paths::settings_file(&data_dir)) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("⚠️  Settings file unusable ({}), this session will not be saved", e);
            Box::new(MemoryStore::new())
        }
    };
    let settings = Settings::load(store);
    debug!("Loaded {:?}", settings);

    let provider = GeminiProvider::new(config.service.clone())?;
    let key_handle = provider.key_handle();
    let client = TutorClient::new(Arc::new(provider), &config);
    info!("✅ Using {} with model {}", config.service.name, config.service.text_model);

    Ok(App {
        data_dir,
        settings,
        client,
        prompt: RemediationPrompt::shared(),
        key_handle,
    })
}

async fn handle_login(data_dir: &Path) -> Result<()> {
    println!("\n🔐 Gemini Login");
    println!("════════════════════════");
    println!("1. Open {} and create an API key.", pathshala::remediation::KEY_PAGE_URL);
    println!("2. Paste it below.");

    if let Err(e) = open::that(pathshala::remediation::KEY_PAGE_URL) {
        debug!("Could not open browser: {}", e);
    }

    println!();
    let key = read_api_key()?;

    if key.is_empty() {
        println!("❌ No key provided. Aborting.");
        return Ok(());
    }

    let env_path = paths::env_file(data_dir);
    save_api_key(&env_path, &key)?;

    println!("\n✅ Gemini API Key saved successfully to {:?}", env_path);
    println!("You can now use 'pathshala chat' to start studying.");

    Ok(())
}

fn print_warning(warning: Option<StorageWarning>) {
    if let Some(warning) = warning {
        println!("⚠️  {}", warning);
    }
}

/// Routes a failed call: quota errors open the key prompt, everything else
/// is printed inline.
async fn report_error(app: &App, error: &ApiError) -> Result<()> {
    let notice = {
        let mut prompt = app.prompt.lock().await;
        route_error(error, &mut prompt, app.language())
    };
    show_notice(app, &notice).await
}

async fn show_notice(app: &App, notice: &Notice) -> Result<()> {
    match notice {
        Notice::GlobalPrompt => offer_remediation(app).await?,
        Notice::Inline { message, details, retry } => {
            println!("❌ {}", message);
            debug!("Details: {}", details);
            if *retry {
                println!(
                    "{}",
                    app.language().pick(
                        "   ↻ Type 'retry' in chat, or run the command again.",
                        "   ↻ चैट में 'retry' लिखें, या कमांड दोबारा चलाएँ।"
                    )
                );
            }
        }
        Notice::Silent => println!("⏹️  Cancelled"),
    }
    Ok(())
}

async fn offer_remediation(app: &App) -> Result<()> {
    let language = app.language();
    println!("\n🔑 {}", quota_prompt_text(language));

    let select = inquire::Confirm::new(language.pick("Select a different API key now?", "अभी दूसरी API कुंजी चुनें?"))
        .with_default(true)
        .prompt()
        .unwrap_or(false);

    {
        let mut prompt = app.prompt.lock().await;
        if !prompt.is_shown() {
            return Ok(());
        }
        if !select {
            prompt.dismiss()?;
            return Ok(());
        }
    }

    let flow = KeyEntryFlow::new(app.key_handle.clone(), &app.data_dir);
    match remediate_shared(&app.prompt, &flow).await? {
        RemediationOutcome::Completed => {
            println!("✅ {}", language.pick("Key updated. Try your request again.", "कुंजी अपडेट हो गई। अपना अनुरोध फिर से करें।"));
        }
        RemediationOutcome::Failed(reason) => {
            println!("❌ {}", reason);
            app.prompt.lock().await.dismiss()?;
        }
        RemediationOutcome::Unavailable => {
            println!("⚠️  Key selection is not available here. Run 'pathshala login' instead.");
        }
    }
    Ok(())
}

fn output_path(app: &App, requested: Option<PathBuf>, prefix: &str, extension: &str) -> Result<PathBuf> {
    if let Some(path) = requested {
        return Ok(path);
    }
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    Ok(paths::output_dir(&app.data_dir)?.join(format!("{}_{}.{}", prefix, timestamp, extension)))
}

fn save_audio(app: &App, clip: &AudioClip, requested: Option<PathBuf>) -> Result<PathBuf> {
    let path = output_path(app, requested, "speech", "wav")?;
    std::fs::write(&path, clip.to_wav())?;
    Ok(path)
}

fn save_diagram(app: &App, diagram: &Diagram, requested: Option<PathBuf>) -> Result<PathBuf> {
    let path = output_path(app, requested, "diagram", diagram.extension())?;
    std::fs::write(&path, &diagram.bytes)?;
    Ok(path)
}

fn print_reply(message: &ChatMessage) {
    println!("\n🎓 Tutor:");
    println!("{}", message.displayed_text());
    let sources: Vec<_> = message
        .grounding
        .iter()
        .filter_map(|g| g.uri.as_deref().map(|uri| (g.title.as_deref().unwrap_or(""), uri)))
        .collect();
    if !sources.is_empty() {
        println!("\n🔗 Sources:");
        for (title, uri) in sources {
            println!("   • {} {}", title, uri);
        }
    }
}

async fn handle_solve(app: &mut App, problem: &str, file: Option<&Path>) -> Result<()> {
    let attachment = file.map(Attachment::from_path).transpose()?;
    if problem.trim().is_empty() && attachment.is_none() {
        bail!("Nothing to solve: give a question or --file");
    }

    let mut session = StudySession::new(app.client.clone(), app.prompt.clone());
    let ctrl_c = CtrlC::arm();
    let outcome = session.ask(&mut app.settings, problem, attachment, ctrl_c.signal()).await;
    drop(ctrl_c);
    present_turn(app, outcome).await
}

async fn present_turn(app: &App, outcome: TurnOutcome) -> Result<()> {
    print_warning(outcome.warning);
    match (&outcome.notice, &outcome.reply) {
        (Some(notice), _) => show_notice(app, notice).await?,
        (None, Some(reply)) => {
            print_reply(reply);
            if let Some(diagram) = &reply.image {
                let path = save_diagram(app, diagram, None)?;
                println!("🖼️  Diagram saved to {:?}", path);
            }
        }
        (None, None) => {}
    }
    if let Some(clip) = &outcome.audio {
        let path = save_audio(app, clip, None)?;
        println!("🔊 Audio ({:.1}s) saved to {:?}", clip.duration().as_secs_f32(), path);
        if let Err(e) = open::that(&path) {
            debug!("Could not play audio: {}", e);
        }
    }
    Ok(())
}

async fn handle_summary(app: &App, title: &str, subject: &str, length: SummaryLength) -> Result<()> {
    let ctrl_c = CtrlC::arm();
    match app.client.summarize_chapter(title, subject, length, ctrl_c.signal()).await {
        Ok(summary) => {
            println!("\n📖 {} ({})", title, subject);
            println!("{}", summary.unwrap_or_else(|_| empty_fallback(app.language()).to_string()));
        }
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

async fn handle_questions(app: &App, title: &str, subject: &str) -> Result<()> {
    let ctrl_c = CtrlC::arm();
    match app.client.fetch_chapter_questions(title, subject, ctrl_c.signal()).await {
        Ok(questions) => {
            let questions = questions.unwrap_or_default();
            if questions.is_empty() {
                println!("⚠️  {}", app.language().pick("No questions could be generated.", "प्रश्न नहीं बन सके।"));
            }
            for (i, q) in questions.iter().enumerate() {
                println!("\n❓ {}. {}", i + 1, q.question);
                println!("   ✏️  {}", q.answer);
            }
        }
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

async fn handle_paper(
    app: &App,
    subject: &str,
    class_label: &str,
    term: ExamTerm,
    answers: bool,
    out: Option<&Path>,
) -> Result<()> {
    let ctrl_c = CtrlC::arm();
    match app.client.generate_sample_paper(subject, class_label, term, ctrl_c.signal()).await {
        Ok(paper) => match paper.value() {
            Some(paper) => {
                let text = render::render_sample_paper(&paper, answers);
                match out {
                    Some(path) => {
                        std::fs::write(path, text)?;
                        println!("✅ Paper saved to {:?} ({} questions)", path, paper.question_count());
                    }
                    None => println!("{}", text),
                }
            }
            None => println!(
                "⚠️  {}",
                app.language().pick(
                    "The paper could not be generated. Please try again.",
                    "प्रश्न-पत्र नहीं बन सका। कृपया फिर से प्रयास करें।"
                )
            ),
        },
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

async fn handle_translate(app: &App, text: &str, to: &str) -> Result<()> {
    let ctrl_c = CtrlC::arm();
    match app.client.translate(text, to, ctrl_c.signal()).await {
        // an empty translation falls back to the original text
        Ok(translated) => println!("{}", translated.unwrap_or_else(|_| text.to_string())),
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

async fn handle_speak(app: &App, text: &str, voice: Option<String>, out: Option<PathBuf>) -> Result<()> {
    let voice = voice.unwrap_or_else(|| {
        if pathshala::utils::media::contains_devanagari(text) {
            pathshala::session::HINDI_VOICE.to_string()
        } else {
            pathshala::session::ENGLISH_VOICE.to_string()
        }
    });
    let ctrl_c = CtrlC::arm();
    match app.client.generate_speech(text, &voice, ctrl_c.signal()).await {
        Ok(clip) => match clip.value() {
            Some(clip) => {
                let path = save_audio(app, &clip, out)?;
                println!("🔊 Saved {:.1}s of audio to {:?}", clip.duration().as_secs_f32(), path);
            }
            None => println!("⚠️  No audio was generated."),
        },
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

async fn handle_diagram(app: &mut App, topic: &str, out: Option<PathBuf>) -> Result<()> {
    print_warning(app.settings.record_search(topic));
    let ctrl_c = CtrlC::arm();
    match app.client.generate_diagram(topic, ctrl_c.signal()).await {
        Ok(diagram) => match diagram.value() {
            Some(diagram) => {
                let path = save_diagram(app, &diagram, out)?;
                println!("🖼️  Diagram saved to {:?}", path);
            }
            None => println!("⚠️  No diagram was generated."),
        },
        Err(e) => report_error(app, &e).await?,
    }
    Ok(())
}

fn handle_history(app: &mut App, clear: bool) {
    if clear {
        print_warning(app.settings.clear_history());
        println!("🧹 Search history cleared.");
        return;
    }
    if app.settings.history().is_empty() {
        println!("No recent searches.");
        return;
    }
    println!("\n🕘 Recent searches:");
    for item in app.settings.history() {
        println!("   {}  {}", item.timestamp.format("%Y-%m-%d %H:%M"), item.query);
    }
}

fn handle_settings(app: &mut App, lang: Option<Language>, dark: bool, light: bool) {
    if let Some(lang) = lang {
        print_warning(app.settings.set_language(lang));
    }
    if dark {
        print_warning(app.settings.set_theme(Theme::Dark));
    } else if light {
        print_warning(app.settings.set_theme(Theme::Light));
    }

    println!("\n⚙️  Settings");
    println!("════════════════════════");
    println!("🌐 Language: {}", app.settings.language().name());
    println!("🌙 Dark mode: {}", app.settings.theme().is_dark());
    println!("🕘 Saved searches: {}", app.settings.history().len());
    println!("📎 Uploaded files: {}", app.settings.uploads().len());
    println!("📝 Saved exam: {}", if app.settings.saved_exam().is_some() { "yes" } else { "no" });
    println!("📁 Data directory: {:?}", app.data_dir);
}

async fn run_exam(app: &mut App, subject: &str, level: &str, term: ExamTerm, resume: bool) -> Result<()> {
    let language = app.language();

    let saved = app.settings.saved_exam().cloned();
    let resume = match saved {
        Some(ref session) if !resume => inquire::Confirm::new(&format!(
            "Resume your saved {} exam ({}/{} answered)?",
            session.subject,
            session.answered(),
            session.questions.len()
        ))
        .with_default(true)
        .prompt()
        .unwrap_or(false),
        _ => resume,
    };

    let mut session = match (resume, saved) {
        (true, Some(mut session)) => {
            // a resumed exam restarts its clock with the time that was left
            let now = Utc::now();
            session.time_limit_secs = session.remaining_secs(now).max(60);
            session.started_at = now;
            session
        }
        (true, None) => bail!("There is no saved exam to resume"),
        (false, _) => {
            println!("⏳ {}", language.pick("Preparing your exam...", "आपकी परीक्षा तैयार हो रही है..."));
            let ctrl_c = CtrlC::arm();
            let questions = match app.client.fetch_exam_questions(subject, level, term, ctrl_c.signal()).await {
                Ok(parsed) => parsed.unwrap_or_default(),
                Err(e) => return report_error(app, &e).await,
            };
            if questions.is_empty() {
                println!("⚠️  {}", language.pick("No exam questions could be generated.", "परीक्षा प्रश्न नहीं बन सके।"));
                return Ok(());
            }
            ExamSession::new(subject, level, term, questions, Utc::now())
        }
    };

    loop {
        let now = Utc::now();
        if session.is_expired(now) {
            println!("\n⏰ {}", language.pick("Time is up!", "समय समाप्त!"));
            break;
        }
        let Some(question) = session.current_question().cloned() else {
            break;
        };

        println!("\n{}", render::render_timer(session.remaining_secs(now), language));
        println!("❓ {}/{}: {}", session.current + 1, session.questions.len(), question.question);

        let mut options = question.options.clone();
        let option_count = options.len();
        options.push("⬅️  Previous".to_string());
        options.push("➡️  Next".to_string());
        options.push("🏁 Submit".to_string());
        options.push("💾 Save and quit".to_string());

        let cursor = session.answers.get(session.current).copied().flatten().unwrap_or(0);
        let choice = match inquire::Select::new("Your answer:", options)
            .with_starting_cursor(cursor)
            .raw_prompt()
        {
            Ok(choice) => choice.index,
            Err(_) => option_count + 3,
        };

        match choice {
            i if i < option_count => {
                session.answer(session.current, i)?;
                print_warning(app.settings.save_exam(&session));
                if !session.next() {
                    println!("{}", language.pick("Last question reached.", "अंतिम प्रश्न।"));
                }
            }
            i if i == option_count => {
                session.previous();
            }
            i if i == option_count + 1 => {
                session.next();
            }
            i if i == option_count + 2 => break,
            _ => {
                print_warning(app.settings.save_exam(&session));
                println!("💾 {}", language.pick("Exam saved. Resume with --resume.", "परीक्षा सहेजी गई। --resume से जारी रखें।"));
                return Ok(());
            }
        }
    }

    let result = session.grade(language);
    println!("\n{}", render::render_exam_result(&result, language));
    print_warning(app.settings.clear_saved_exam());
    Ok(())
}

async fn run_interactive_mode(app: &mut App) -> Result<()> {
    let language = app.language();
    println!("\n🎓 Pathshala Tutor");
    println!("════════════════════════");
    println!("{}", language.pick("Ask any question. Type 'help' for commands.", "कोई भी प्रश्न पूछें। कमांड के लिए 'help' लिखें।"));

    let mut session = StudySession::new(app.client.clone(), app.prompt.clone());
    let mut attachment: Option<Attachment> = None;

    loop {
        print!("\n👤 You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();

        let outcome = match command.to_lowercase().as_str() {
            "exit" | "quit" | "q" => break,
            "help" | "h" => {
                show_help();
                continue;
            }
            "clear" | "cls" => {
                session.clear();
                print!("\x1B[2J\x1B[1;1H");
                continue;
            }
            "attach" => {
                match Attachment::from_path(rest) {
                    Ok(file) => {
                        println!("📎 Attached {} ({})", file.name, file.mime_type);
                        attachment = Some(file);
                    }
                    Err(e) => println!("❌ {}", e),
                }
                continue;
            }
            "share" => {
                match session.last_reply() {
                    Some(reply) => println!("\n{}", render::share_text(reply)),
                    None => println!("Nothing to share yet."),
                }
                continue;
            }
            "diagram" => {
                let ctrl_c = CtrlC::arm();
                session.diagram(&mut app.settings, rest, ctrl_c.signal()).await
            }
            "retry" => {
                if !session.can_retry() {
                    println!("Nothing to retry.");
                    continue;
                }
                let ctrl_c = CtrlC::arm();
                session.retry_last(&app.settings, ctrl_c.signal()).await
            }
            "translate" | "speak" => {
                let Some(id) = session.last_reply().map(|m| m.id.clone()) else {
                    println!("No tutor reply yet.");
                    continue;
                };
                let ctrl_c = CtrlC::arm();
                let outcome = if command.eq_ignore_ascii_case("translate") {
                    session.translate_message(&app.settings, &id, ctrl_c.signal()).await?
                } else {
                    session.speak_message(&app.settings, &id, ctrl_c.signal()).await?
                };
                if outcome.notice.is_none() && outcome.audio.is_none() {
                    if let Some(message) = session.message(&id) {
                        print_reply(message);
                    }
                }
                outcome
            }
            _ => {
                let ctrl_c = CtrlC::arm();
                session.ask(&mut app.settings, input, attachment.take(), ctrl_c.signal()).await
            }
        };

        present_turn(app, outcome).await?;
    }

    println!("👋 {}", language.pick("Goodbye! Keep studying.", "अलविदा! पढ़ाई जारी रखें।"));
    Ok(())
}

fn show_help() {
    println!("\n📚 Pathshala Help - Available Commands:");
    println!("══════════════════════════════════");
    println!("   • <question>          - Ask the tutor");
    println!("   • attach <path>       - Attach a file to the next question");
    println!("   • diagram <topic>     - Generate a labelled diagram");
    println!("   • translate           - Toggle translation of the last reply");
    println!("   • speak               - Read the last reply aloud");
    println!("   • share               - Print the last reply for copying");
    println!("   • retry               - Re-send the request that failed");
    println!("   • clear, cls          - Clear the conversation");
    println!("   • exit, quit, q       - Exit the program");
    println!("═══════════════════════════════════════════════════════════════════");
}
