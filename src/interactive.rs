use crate::config::Config;
use crate::synth::{RouteTable, SynthesisRoute};
use crate::translate::LANGUAGES;
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];

/// Where the video to dub comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Local(PathBuf),
    Url(String),
}

/// Where the timed translated text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    Subtitles(PathBuf),
    /// Edited segment table (CSV).
    Table(PathBuf),
    PlainText(PathBuf),
    /// Transcribe the source audio and translate the transcript.
    Automatic,
}

pub struct InteractiveResult {
    pub video: VideoSource,
    pub language_name: String,
    pub language_code: String,
    pub text: TextSource,
    pub output: PathBuf,
    pub config: Config,
}

pub fn run_interactive_wizard() -> anyhow::Result<InteractiveResult> {
    print_header();
    let config = Config::load().unwrap_or_default();

    // Step 1: Select video
    let video = select_video()?;

    // Step 2: Select target language
    let (language_name, language_code) = select_language()?;

    // Step 3: Select segment source
    let text = select_text_source()?;

    // Step 4: Check/Setup the API keys this dub needs
    let route = RouteTable::new(&config.direct_languages).route(language_code);
    let config = setup_api_keys(config, &required_keys(&text, route))?;

    let output = derive_output_path(&video, language_code);

    // Step 5: Confirm
    print_summary(&video, &output, language_name, language_code, &text);

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    println!();

    Ok(InteractiveResult {
        video,
        language_name: language_name.to_string(),
        language_code: language_code.to_string(),
        text,
        output,
        config,
    })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║            autodub - AI Video Dubber              ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

/// Hosted services the wizard may ask keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiKey {
    OpenAi,
    ElevenLabs,
    Google,
}

impl ApiKey {
    fn name(self) -> &'static str {
        match self {
            ApiKey::OpenAi => "OpenAI",
            ApiKey::ElevenLabs => "ElevenLabs",
            ApiKey::Google => "Google Cloud",
        }
    }

    fn hint(self) -> &'static str {
        match self {
            ApiKey::OpenAi => "https://platform.openai.com/api-keys",
            ApiKey::ElevenLabs => "https://elevenlabs.io/app/settings/api-keys",
            ApiKey::Google => "https://console.cloud.google.com/apis/credentials",
        }
    }

    fn slot(self, config: &mut Config) -> &mut Option<String> {
        match self {
            ApiKey::OpenAi => &mut config.openai_api_key,
            ApiKey::ElevenLabs => &mut config.elevenlabs_api_key,
            ApiKey::Google => &mut config.google_api_key,
        }
    }
}

/// Keys needed to dub from `text` over `route`.
fn required_keys(text: &TextSource, route: SynthesisRoute) -> Vec<ApiKey> {
    let mut keys = Vec::new();
    if *text == TextSource::Automatic {
        keys.push(ApiKey::OpenAi);
    }
    keys.push(ApiKey::ElevenLabs);
    if route == SynthesisRoute::Chain {
        keys.push(ApiKey::Google);
    }
    keys
}

fn setup_api_keys(mut config: Config, keys: &[ApiKey]) -> anyhow::Result<Config> {
    let mut changed = false;

    for &key in keys {
        let name = key.name();
        let slot = key.slot(&mut config);
        if slot.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            println!("{} {} API key configured", style("✓").green(), name);
            continue;
        }

        println!("{} {} API key not found", style("!").yellow(), name);
        println!("  Get one at: {}\n", key.hint());

        let api_key: String = Input::new()
            .with_prompt(format!("Enter your {} API key", name))
            .interact_text()?;
        if api_key.trim().is_empty() {
            anyhow::bail!("{} API key is required", name);
        }
        *slot = Some(api_key.trim().to_string());
        changed = true;
    }

    if config.voices.narrator_tts.is_empty() {
        let voice: String = Input::new()
            .with_prompt("Enter the narrator voice id (PVC_ID)")
            .interact_text()?;
        config.voices.narrator_tts = voice.trim().to_string();
        changed = true;
    }

    if changed
        && Confirm::new()
            .with_prompt("Save settings to config file?")
            .default(true)
            .interact()?
    {
        save_config(&config)?;
        println!("{} Settings saved to config\n", style("✓").green());
    }

    Ok(config)
}

fn save_config(config: &Config) -> anyhow::Result<()> {
    if let Some(config_dir) = dirs::config_dir() {
        let autodub_dir = config_dir.join("autodub");
        fs::create_dir_all(&autodub_dir)?;

        let config_path = autodub_dir.join("config.toml");
        let toml_content = toml::to_string_pretty(config)?;
        fs::write(config_path, toml_content)?;
    }
    Ok(())
}

fn select_video() -> anyhow::Result<VideoSource> {
    println!("\n{}", style("Select video:").bold());

    let files = scan_files(".", VIDEO_EXTENSIONS)?;

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());
    items.push("Download from URL...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a video")
        .items(&items)
        .default(0)
        .interact()?;

    if selection < files.len() {
        return Ok(VideoSource::Local(files[selection].clone()));
    }
    if selection == files.len() {
        return Ok(VideoSource::Local(prompt_existing_path("Enter video path")?));
    }

    let url: String = Input::new()
        .with_prompt("Enter video URL")
        .interact_text()?;
    if url.trim().is_empty() {
        anyhow::bail!("URL is required");
    }
    Ok(VideoSource::Url(url.trim().to_string()))
}

fn prompt_existing_path(prompt: &str) -> anyhow::Result<PathBuf> {
    let path: String = Input::new().with_prompt(prompt).interact_text()?;
    let path = PathBuf::from(path.trim());
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(path)
}

fn scan_files(dir: &str, extensions: &[&str]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.contains(&ext.to_lowercase().as_str()) {
                files.push(path);
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn select_language() -> anyhow::Result<(&'static str, &'static str)> {
    let items: Vec<String> = LANGUAGES
        .iter()
        .map(|(name, code)| format!("{} ({})", name, code))
        .collect();

    let selection = Select::new()
        .with_prompt("Select target language")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(LANGUAGES[selection])
}

fn select_text_source() -> anyhow::Result<TextSource> {
    let options = [
        "Subtitle file (SRT) - per-segment timing and speakers",
        "Segment table (CSV) - edited start, end, text and speaker",
        "Translated text file - spoken across the whole video",
        "Transcribe and translate automatically",
    ];

    let selection = Select::new()
        .with_prompt("What should be spoken?")
        .items(&options)
        .default(0)
        .interact()?;

    Ok(match selection {
        0 => TextSource::Subtitles(prompt_existing_path("Enter SRT path")?),
        1 => TextSource::Table(prompt_existing_path("Enter CSV path")?),
        2 => TextSource::PlainText(prompt_existing_path("Enter text file path")?),
        _ => TextSource::Automatic,
    })
}

/// `{stem}_{language}.mp4` next to a local video, or in the current directory.
pub fn derive_output_path(video: &VideoSource, language_code: &str) -> PathBuf {
    match video {
        VideoSource::Local(path) => {
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            path.with_file_name(format!("{}_{}.mp4", stem, language_code))
        }
        VideoSource::Url(_) => PathBuf::from(format!("dubbed_{}.mp4", language_code)),
    }
}

fn print_summary(
    video: &VideoSource,
    output: &Path,
    language_name: &str,
    language_code: &str,
    text: &TextSource,
) {
    println!("\n{}", style("═══ Summary ═══").bold());
    match video {
        VideoSource::Local(path) => println!("  Video:     {}", style(path.display()).cyan()),
        VideoSource::Url(url) => println!("  Video:     {}", style(url).cyan()),
    }
    println!("  Output:    {}", style(output.display()).cyan());
    println!("  Language:  {} ({})", language_name, language_code);
    match text {
        TextSource::Subtitles(path) => println!("  Subtitles: {}", path.display()),
        TextSource::Table(path) => println!("  Segments:  {}", path.display()),
        TextSource::PlainText(path) => println!("  Text:      {}", path.display()),
        TextSource::Automatic => println!("  Text:      transcribe + translate"),
    }
    println!();
}
