use anyhow::{Context, Result};
use autodub::ask::{
    ArticleIndex, Assistant, OpenAiAssistantClient, ReplierAssistant, ReplierChat, ReplierSettings,
};
use autodub::audio::{check_ffmpeg, download_video, extract_audio};
use autodub::config::{Config, Task};
use autodub::interactive::{self, TextSource, VideoSource};
use autodub::pipeline::{create_dubbed_video, print_summary, DubRequest, DubServices};
use autodub::segment::{load_segments, write_srt, write_table, Segment, SegmentSource};
use autodub::session::Session;
use autodub::synth::RouteTable;
use autodub::openai::ChatClient;
use autodub::transcribe::elevenlabs::speaker_transcript;
use autodub::transcribe::{ElevenLabsTranscriber, OpenAiTranscriber, Transcriber};
use autodub::translate::{language_code, language_name, OpenAiTranslator, Translator};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "autodub")]
#[command(version, about = "Automatic video dubbing using AI")]
#[command(
    long_about = "Dub videos into another language with ElevenLabs and Google voices, keeping every spoken segment aligned with the original timing."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Dub a video from subtitles, a segment table or translated text
    Dub(DubArgs),

    /// Transcribe an audio or video file to text
    Transcribe {
        /// Input audio or video file
        input: PathBuf,

        /// Output text file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Diarize with ElevenLabs and write timed segments (JSON) here
        #[arg(long)]
        segments: Option<PathBuf>,

        /// Spoken language code for diarized transcription (detected if omitted)
        #[arg(long, requires = "segments")]
        spoken_language: Option<String>,
    },

    /// Translate a text file
    Translate {
        /// Input text file
        input: PathBuf,

        /// Target language name or code (e.g. Bengali, te-IN)
        #[arg(short, long)]
        language: String,

        /// Output text file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the article assistant a question
    Ask {
        question: String,

        /// Assistant id (defaults to ASSISTANT_ID)
        #[arg(long)]
        assistant_id: Option<String>,

        /// JSON map of article file names to their metadata
        #[arg(long)]
        articles: Option<PathBuf>,

        /// Print the parsed answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reply to a comment through the article assistant or a chat model
    Reply {
        input: String,

        /// TOML file with `model`, `system_message` and `temperature`; uses the chat model
        #[arg(long, conflicts_with_all = ["assistant_id", "articles"])]
        chat: Option<PathBuf>,

        /// Assistant id (defaults to ASSISTANT_ID)
        #[arg(long)]
        assistant_id: Option<String>,

        /// JSON map of article file names to their metadata
        #[arg(long)]
        articles: Option<PathBuf>,
    },

    /// Convert between SRT subtitles and the editable segment table
    Segments {
        /// SRT file to convert into a CSV table
        #[arg(long, conflicts_with = "table", required_unless_present = "table")]
        srt: Option<PathBuf>,

        /// CSV table to convert into SRT
        #[arg(long)]
        table: Option<PathBuf>,

        /// Output file (defaults to the input name with the other extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Guided dubbing wizard
    Interactive,
}

#[derive(clap::Args)]
#[command(group(ArgGroup::new("video_input").required(true).args(["video", "url"])))]
#[command(group(ArgGroup::new("text_input").args(["srt", "table", "text", "auto"])))]
struct DubArgs {
    /// Input video file
    #[arg(short = 'i', long)]
    video: Option<PathBuf>,

    /// Download the input video from a URL with yt-dlp
    #[arg(long)]
    url: Option<String>,

    /// Translated subtitles (SRT) with per-cue timing and speaker tags
    #[arg(long)]
    srt: Option<PathBuf>,

    /// Edited segment table (CSV)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Translated text spoken across the whole video
    #[arg(long)]
    text: Option<PathBuf>,

    /// Transcribe and translate the source audio first
    #[arg(long)]
    auto: bool,

    /// Target language name or code (e.g. Hindi, te-IN)
    #[arg(short, long)]
    language: String,

    /// Reuse an existing session, keeping its cached segments
    #[arg(long)]
    session: Option<String>,

    /// Output video (defaults to `{input}_{language}.mp4`)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Everything needed to run one dub, from flags or the wizard.
struct DubJob {
    video: VideoSource,
    language_name: String,
    language_code: String,
    text: TextSource,
    session: Option<String>,
    output: PathBuf,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Accept either a display name or a synthesis code.
fn resolve_language(input: &str) -> Result<(&'static str, &'static str)> {
    if let Some(code) = language_code(input) {
        return Ok((language_name(code).unwrap_or(code), code));
    }
    if let Some(name) = language_name(input) {
        return Ok((name, language_code(name).unwrap_or_default()));
    }
    anyhow::bail!(
        "Unsupported language: {}. Supported: {}",
        input,
        autodub::translate::LANGUAGES
            .iter()
            .map(|(name, code)| format!("{name} ({code})"))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn with_extension_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.{}", stem.to_string_lossy(), extension));
    output
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("mp4" | "mkv" | "avi" | "mov" | "webm")
    )
}

fn transcriber(config: &Config) -> Result<OpenAiTranscriber> {
    config
        .validate(Task::Transcribe)
        .context("Configuration validation failed")?;
    let key = config.openai_api_key.clone().unwrap_or_default();
    let mut transcriber = OpenAiTranscriber::new(key);
    if let Some(model) = &config.transcription_model {
        transcriber = transcriber.with_model(model);
    }
    Ok(transcriber)
}

fn translator(config: &Config) -> Result<OpenAiTranslator> {
    config
        .validate(Task::Translate)
        .context("Configuration validation failed")?;
    let key = config.openai_api_key.clone().unwrap_or_default();
    let mut translator = OpenAiTranslator::new(key);
    if let Some(model) = &config.translation_model {
        translator = translator.with_model(model);
    }
    Ok(translator)
}

/// Segments of an SRT document, for writing the editable table.
fn srt_segments(content: &str) -> Result<Vec<Segment>> {
    Ok(SegmentSource::Subtitles(content.to_string()).build()?)
}

async fn run_dub(config: &Config, job: DubJob) -> Result<()> {
    let route = RouteTable::new(&config.direct_languages).route(&job.language_code);
    config
        .validate(Task::Dub(route))
        .context("Configuration validation failed")?;
    check_ffmpeg()?;

    let session = match &job.session {
        Some(id) => Session::open(&config.work_dir, id)?,
        None => Session::create(&config.work_dir)?,
    };

    info!("Session:  {}", session.id());
    info!("Language: {} ({})", job.language_name, job.language_code);
    info!("Route:    {:?}", route);

    match &job.video {
        VideoSource::Local(path) => {
            if !path.exists() {
                anyhow::bail!("Input file not found: {}", path.display());
            }
            std::fs::copy(path, session.input_video())
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        }
        VideoSource::Url(url) => download_video(url, &session.input_video()).await?,
    }

    if !session.input_audio().exists() {
        extract_audio(&session.input_video(), &session.input_audio()).await?;
    }

    let (subtitles, plain_text) = match &job.text {
        TextSource::Subtitles(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            std::fs::write(session.subtitles_srt(), &content)?;
            write_table(&session.subtitles_csv(), &srt_segments(&content)?)?;
            (Some(content), None)
        }
        TextSource::Table(path) => {
            let segments = load_segments(path)?;
            let content = write_srt(&segments);
            std::fs::write(session.subtitles_srt(), &content)?;
            write_table(&session.subtitles_csv(), &segments)?;
            (Some(content), None)
        }
        TextSource::PlainText(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            std::fs::write(session.translation(), &text)?;
            (None, Some(text))
        }
        TextSource::Automatic => {
            let translation = if session.translation().exists() {
                info!("Reusing translation from session");
                std::fs::read_to_string(session.translation())?
            } else {
                let transcript = transcriber(config)?
                    .transcribe(&session.input_audio())
                    .await?;
                std::fs::write(session.transcript(), &transcript)?;
                let translation = translator(config)?
                    .translate(&transcript, &job.language_name)
                    .await?;
                std::fs::write(session.translation(), &translation)?;
                translation
            };
            (None, Some(translation))
        }
    };

    let services = DubServices::from_config(config, session.dir())?;
    let request = DubRequest::for_session(&session, job.language_code.clone(), subtitles, plain_text);
    let mut result = create_dubbed_video(&request, &services)
        .await
        .context("Dubbing failed")?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }

    std::fs::copy(&result.output_path, &job.output)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;
    result.output_path = job.output;

    print_summary(&result);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Dub(args) => {
            let config = Config::load().context("Failed to load configuration")?;
            let (language_name, language_code) = resolve_language(&args.language)?;

            let video = match (args.video, args.url) {
                (Some(path), _) => VideoSource::Local(path),
                (None, Some(url)) => VideoSource::Url(url),
                (None, None) => anyhow::bail!("Pass --video or --url"),
            };
            let text = if let Some(path) = args.srt {
                TextSource::Subtitles(path)
            } else if let Some(path) = args.table {
                TextSource::Table(path)
            } else if let Some(path) = args.text {
                TextSource::PlainText(path)
            } else {
                TextSource::Automatic
            };
            let output = args
                .output
                .unwrap_or_else(|| interactive::derive_output_path(&video, language_code));

            run_dub(
                &config,
                DubJob {
                    video,
                    language_name: language_name.to_string(),
                    language_code: language_code.to_string(),
                    text,
                    session: args.session,
                    output,
                },
            )
            .await
        }

        Command::Interactive => {
            let wizard = interactive::run_interactive_wizard()?;
            run_dub(
                &wizard.config,
                DubJob {
                    video: wizard.video,
                    language_name: wizard.language_name,
                    language_code: wizard.language_code,
                    text: wizard.text,
                    session: None,
                    output: wizard.output,
                },
            )
            .await
        }

        Command::Transcribe {
            input,
            output,
            segments,
            spoken_language,
        } => {
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }
            let config = Config::load().context("Failed to load configuration")?;

            let temp = tempfile::tempdir()?;
            let audio = if is_video(&input) {
                let audio = temp.path().join("audio.mp3");
                extract_audio(&input, &audio).await?;
                audio
            } else {
                input.clone()
            };

            let transcript = match segments {
                Some(segments_path) => {
                    config
                        .validate(Task::SpeechToText)
                        .context("Configuration validation failed")?;
                    let mut scribe = ElevenLabsTranscriber::new(
                        config.elevenlabs_api_key.clone().unwrap_or_default(),
                    );
                    if let Some(code) = spoken_language {
                        scribe = scribe.with_language(code);
                    }
                    let records = scribe.transcribe_segments(&audio).await?;
                    std::fs::write(&segments_path, serde_json::to_string_pretty(&records)?)
                        .with_context(|| format!("Failed to write {}", segments_path.display()))?;
                    info!("Wrote {} segments to {}", records.len(), segments_path.display());
                    speaker_transcript(&records)
                }
                None => transcriber(&config)?.transcribe(&audio).await?,
            };
            write_or_print(output.as_deref(), &transcript)
        }

        Command::Translate {
            input,
            language,
            output,
        } => {
            let config = Config::load().context("Failed to load configuration")?;
            let (language_name, _) = resolve_language(&language)?;
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let translation = translator(&config)?.translate(&text, language_name).await?;
            write_or_print(output.as_deref(), &translation)
        }

        Command::Ask {
            question,
            assistant_id,
            articles,
            json,
        } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            if assistant_id.is_some() {
                config.assistant_id = assistant_id;
            }
            config
                .validate(Task::Ask)
                .context("Configuration validation failed")?;

            let articles = match articles {
                Some(path) => ArticleIndex::load(&path)?,
                None => ArticleIndex::default(),
            };
            let client = OpenAiAssistantClient::new(
                config.openai_api_key.clone().unwrap_or_default(),
                config.assistant_id.clone().unwrap_or_default(),
            );
            let answer = Assistant::new(Arc::new(client), articles)
                .interact(&question)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.header);
                for insight in &answer.insights {
                    println!();
                    println!("  \"{}\"", insight.quote);
                    if let (Some(title), Some(url)) = (&insight.article_title, &insight.article_url)
                    {
                        println!("  {} ({})", title, url);
                    }
                    if let Some(video) = &insight.video_url {
                        println!("  {}", video);
                    }
                }
                if !answer.footer.is_empty() {
                    println!();
                    println!("{}", answer.footer);
                }
            }
            Ok(())
        }

        Command::Reply {
            input,
            chat,
            assistant_id,
            articles,
        } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            let reply = match chat {
                Some(settings_path) => {
                    config
                        .validate(Task::Translate)
                        .context("Configuration validation failed")?;
                    let settings = ReplierSettings::load(&settings_path)?;
                    let chat = ChatClient::new(config.openai_api_key.clone().unwrap_or_default());
                    ReplierChat::new(chat, settings).reply(&input).await?
                }
                None => {
                    if assistant_id.is_some() {
                        config.assistant_id = assistant_id;
                    }
                    config
                        .validate(Task::Ask)
                        .context("Configuration validation failed")?;
                    let articles = match articles {
                        Some(path) => ArticleIndex::load(&path)?,
                        None => ArticleIndex::default(),
                    };
                    let client = OpenAiAssistantClient::new(
                        config.openai_api_key.clone().unwrap_or_default(),
                        config.assistant_id.clone().unwrap_or_default(),
                    );
                    ReplierAssistant::new(Arc::new(client), articles)
                        .reply(&input)
                        .await?
                }
            };
            println!("{}", reply);
            Ok(())
        }

        Command::Segments { srt, table, output } => {
            if let Some(path) = srt {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let output = output.unwrap_or_else(|| with_extension_path(&path, "csv"));
                write_table(&output, &srt_segments(&content)?)?;
                info!("Wrote {}", output.display());
            } else if let Some(path) = table {
                let segments = load_segments(&path)?;
                let output = output.unwrap_or_else(|| with_extension_path(&path, "srt"));
                write_or_print(Some(&output), &write_srt(&segments))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_extension_path() {
        let input = PathBuf::from("/path/to/subtitles.srt");
        assert_eq!(
            with_extension_path(&input, "csv"),
            PathBuf::from("/path/to/subtitles.csv")
        );
        assert_eq!(
            with_extension_path(&PathBuf::from("table.csv"), "srt"),
            PathBuf::from("table.srt")
        );
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(resolve_language("bengali").unwrap(), ("Bengali", "bn-IN"));
        assert_eq!(resolve_language("te-in").unwrap(), ("Telugu", "te-IN"));
        assert_eq!(resolve_language("hi").unwrap(), ("Hindi", "hi"));
        assert!(resolve_language("Klingon").is_err());
    }

    #[test]
    fn test_cli_requires_video_source() {
        assert!(Cli::try_parse_from(["autodub", "dub", "--language", "hi"]).is_err());
        assert!(Cli::try_parse_from([
            "autodub", "dub", "-i", "talk.mp4", "--url", "https://x", "--language", "hi"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "autodub", "dub", "-i", "talk.mp4", "--srt", "a.srt", "--language", "hi", "-v"
        ])
        .is_ok());
    }

    #[test]
    fn test_cli_transcribe_and_reply_flags() {
        assert!(Cli::try_parse_from([
            "autodub", "transcribe", "talk.mp3", "--segments", "talk_segments.json"
        ])
        .is_ok());
        assert!(
            Cli::try_parse_from(["autodub", "transcribe", "talk.mp3", "--spoken-language", "hi"])
                .is_err()
        );

        assert!(Cli::try_parse_from(["autodub", "reply", "accha laga", "--chat", "r.toml"]).is_ok());
        assert!(Cli::try_parse_from([
            "autodub", "reply", "accha laga", "--chat", "r.toml", "--articles", "a.json"
        ])
        .is_err());
    }

    #[test]
    fn test_srt_segments_keep_speakers() {
        let segments =
            srt_segments("1\n00:00:01,000 --> 00:00:02,500\n[MALE] Namaste\n").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_ms, 1000);
        assert_eq!(segments[0].text, "Namaste");
        assert_eq!(segments[0].speaker.tag(), "MALE");
    }
}
