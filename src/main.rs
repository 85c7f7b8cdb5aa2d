use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use jarvis::supervisor::SystemProbe;
use jarvis::voice::{
    AudioCapture, AudioPlayback, CloudSpeaker, ConsoleSpeaker, EndpointState,
    MicrophoneRecognizer, Speaker, SpeechEndpointer, SpeechToText, TextToSpeech,
    calculate_energy,
};
use jarvis::{
    AssistantContext, CommandRouter, Config, Error, InstanceLock, PhraseBook, ProcessSupervisor,
    Session, SupervisedProcess, WakeListener,
};

/// Jarvis - desktop voice assistant
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "JARVIS_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Disable voice features (console only)
    #[arg(long, env = "JARVIS_DISABLE_VOICE", global = true)]
    disable_voice: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background wake listener
    Listen,
    /// Run the main assistant session
    Session {
        /// Listen on the microphone instead of reading stdin
        #[arg(long)]
        voice: bool,
    },
    /// Dispatch one utterance and print the reply
    Ask {
        /// Utterance words
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },
    /// Terminate the main assistant process
    Stop,
    /// Show lifecycle and process status
    Status,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Good morning. Jarvis speech output is working.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to open log file: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => "info,jarvis=info",
        1 => "info,jarvis=debug",
        2 => "debug",
        _ => "trace",
    };
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter));

    let Some(path) = log_file else {
        builder.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log file path has no file name"))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    builder.with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Listen => cmd_listen(cli.disable_voice).await,
        Command::Session { voice } => cmd_session(voice, cli.disable_voice).await,
        Command::Ask { utterance } => cmd_ask(&utterance.join(" ")).await,
        Command::Stop => cmd_stop(),
        Command::Status => cmd_status(),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestTts { text } => test_tts(&text).await,
    }
}

/// Cloud speaker when voice is on and TTS is configured, console otherwise
fn build_speaker(config: &Config) -> Arc<dyn Speaker> {
    let label = PhraseBook::for_session(&config.assistant_name).display_name();
    if config.voice.enabled {
        match TextToSpeech::from_config(&config.voice, &config.api_keys) {
            Ok(tts) => return Arc::new(CloudSpeaker::new(label, tts)),
            Err(e) => tracing::warn!(error = %e, "TTS unavailable, replies will be printed"),
        }
    }
    Arc::new(ConsoleSpeaker::new(label))
}

fn build_recognizer(config: &Config) -> anyhow::Result<MicrophoneRecognizer> {
    if !config.voice.enabled {
        anyhow::bail!("voice is disabled; enable it in the config or drop --disable-voice");
    }
    let stt = SpeechToText::from_config(&config.voice, &config.api_keys)?;
    Ok(MicrophoneRecognizer::new(stt)?)
}

async fn cmd_listen(disable_voice: bool) -> anyhow::Result<()> {
    let config = Config::load_with_options(disable_voice)?;
    tracing::debug!(?config, "loaded configuration");

    let _lock = match InstanceLock::acquire(config.listener_lock_path(), &SystemProbe) {
        Ok(lock) => lock,
        Err(Error::AlreadyRunning { pid }) => {
            tracing::info!(pid, "wake listener already running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let supervisor = Arc::new(ProcessSupervisor::new(config.pid_path()));
    let main = Arc::new(SupervisedProcess::new(supervisor, config.launch_target()?));
    let recognizer = build_recognizer(&config)?;
    let speaker = build_speaker(&config);

    let ctx = AssistantContext::builder(config).speaker(speaker).build()?;
    let handle = WakeListener::from_context(&ctx, Box::new(recognizer), main).start();

    tracing::info!(
        name = %ctx.config.assistant_name,
        "wake listener ready - say \"wake up {}\"",
        ctx.config.assistant_name
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down wake listener");
    handle.stop().await;
    Ok(())
}

async fn cmd_session(voice: bool, disable_voice: bool) -> anyhow::Result<()> {
    let config = Config::load_with_options(disable_voice)?;
    tracing::debug!(?config, "loaded configuration");

    let timing = config.listener.clone();
    let calibration = config.voice.calibration;
    let mut recognizer = if voice {
        Some(build_recognizer(&config)?)
    } else {
        None
    };
    let speaker = build_speaker(&config);

    let ctx = Arc::new(AssistantContext::builder(config).speaker(speaker).build()?);
    let session = Session::new(CommandRouter::new(ctx));
    session.greet().await;

    tracing::info!(voice, "session started");
    match recognizer.as_mut() {
        Some(recognizer) => {
            tokio::select! {
                () = session.run_voice(recognizer, &timing, calibration) => {}
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            tokio::select! {
                result = session.run_console(stdin) => result?,
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
    }

    tracing::info!("session ended");
    Ok(())
}

async fn cmd_ask(utterance: &str) -> anyhow::Result<()> {
    let config = Config::load_with_options(true)?;
    let ctx = AssistantContext::from_config(config)?;
    let router = CommandRouter::new(Arc::new(ctx));

    let dispatch = router.dispatch(utterance).await;
    println!("{}", dispatch.reply.text);
    tracing::debug!(rule = %dispatch.rule, priority = dispatch.rule.priority(), "rule fired");

    // One-shot mode has no session left to deliver a reminder later
    match dispatch.reply.effect {
        Some(jarvis::SideEffect::ScheduleTimer { .. }) => {
            tracing::warn!("reminders need a running session; not scheduled");
        }
        Some(effect) => router.context().effects.run(effect).await,
        None => {}
    }
    Ok(())
}

fn cmd_stop() -> anyhow::Result<()> {
    let config = Config::load()?;
    let supervisor = ProcessSupervisor::new(config.pid_path());
    match supervisor.terminate()? {
        Some(pid) => println!("Stopped main assistant (pid {pid})"),
        None => println!("Main assistant is not running"),
    }
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = jarvis::PersistentStateStore::from_config(&config);
    let supervisor = ProcessSupervisor::new(config.pid_path());

    println!("Data directory: {}", config.data_dir.display());
    let lifecycle = if store.is_sleeping() {
        "sleeping"
    } else {
        "awake"
    };
    println!("Lifecycle:      {lifecycle}");
    println!("Known facts:    {}", store.facts().len());

    match supervisor.status()? {
        Some((record, true)) => println!(
            "Main process:   running (pid {}, since {})",
            record.pid,
            record.launched_at.to_rfc3339()
        ),
        Some((record, false)) => println!("Main process:   stale record (pid {})", record.pid),
        None => println!("Main process:   not running"),
    }

    let listener = if config.listener_lock_path().exists() {
        "lock held"
    } else {
        "not running"
    };
    println!("Wake listener:  {listener}");
    Ok(())
}

/// Calibrate like the listener does, then report what the endpointer hears
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut capture = AudioCapture::start()?;
    let mut endpointer = SpeechEndpointer::new();

    println!(
        "Stay quiet for {:?} while the ambient level is sampled",
        config.voice.calibration
    );
    capture.clear_buffer();
    tokio::time::sleep(config.voice.calibration).await;
    endpointer.calibrate(&capture.take_buffer());
    println!(
        "Speech threshold {:.4} at {} Hz",
        endpointer.threshold(),
        capture.sample_rate()
    );
    println!("Now say \"wake up {}\"", config.assistant_name);

    for second in 1..=duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let state = endpointer.process(&samples);
        let heard = if energy > endpointer.threshold() {
            "speech"
        } else {
            "quiet"
        };
        println!("{second:>3}s  rms {energy:.4}  {heard:<6}  {state:?}");

        if state == EndpointState::Complete {
            println!("      phrase of {:.1}s captured", endpointer.speech_secs());
            endpointer.reset();
        }
    }

    capture.stop();
    Ok(())
}

/// Speak `text` through the configured provider
async fn test_tts(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)?;

    let audio = tts.synthesize(text).await?;
    println!(
        "{} voice {}: {} bytes",
        config.voice.tts_provider,
        config.voice.tts_voice,
        audio.len()
    );

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3_blocking(&audio)).await??;
    Ok(())
}
